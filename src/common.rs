use alloc::string::String;

use crate::Tag;

/// Defines the direction in which text is to be read.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Initial, unset direction.
    #[default]
    Invalid,
    /// Text is set horizontally from left to right.
    LeftToRight,
    /// Text is set horizontally from right to left.
    RightToLeft,
    /// Text is set vertically from top to bottom.
    TopToBottom,
    /// Text is set vertically from bottom to top.
    BottomToTop,
}

impl Direction {
    /// Checks that direction is horizontal.
    #[inline]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }

    /// Checks that direction is vertical.
    #[inline]
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::TopToBottom | Direction::BottomToTop)
    }

    /// Checks that direction goes along the natural reading order of its axis.
    #[inline]
    pub fn is_forward(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::TopToBottom)
    }

    /// Checks that direction goes against the natural reading order of its axis.
    #[inline]
    pub fn is_backward(self) -> bool {
        matches!(self, Direction::RightToLeft | Direction::BottomToTop)
    }

    /// Returns the opposite direction on the same axis.
    #[inline]
    pub fn reverse(self) -> Self {
        match self {
            Direction::LeftToRight => Direction::RightToLeft,
            Direction::RightToLeft => Direction::LeftToRight,
            Direction::TopToBottom => Direction::BottomToTop,
            Direction::BottomToTop => Direction::TopToBottom,
            Direction::Invalid => Direction::Invalid,
        }
    }

    /// Returns the horizontal direction a script is written in.
    pub fn from_script(script: Script) -> Option<Self> {
        // https://docs.google.com/spreadsheets/d/1Y90M0Ie3MUJ6UVCRDOypOtijlMDLNNyyLk36T6iMu0o

        match script {
            // Unicode-1.1 additions
            script::ARABIC |
            script::HEBREW |

            // Unicode-3.0 additions
            script::SYRIAC |
            script::THAANA |

            // Unicode-4.0 additions
            script::CYPRIOT |

            // Unicode-4.1 additions
            script::KHAROSHTHI |

            // Unicode-5.0 additions
            script::PHOENICIAN |
            script::NKO |

            // Unicode-5.1 additions
            script::LYDIAN |

            // Unicode-5.2 additions
            script::AVESTAN |
            script::IMPERIAL_ARAMAIC |
            script::INSCRIPTIONAL_PAHLAVI |
            script::INSCRIPTIONAL_PARTHIAN |
            script::OLD_SOUTH_ARABIAN |
            script::OLD_TURKIC |
            script::SAMARITAN |

            // Unicode-6.0 additions
            script::MANDAIC |

            // Unicode-6.1 additions
            script::MEROITIC_CURSIVE |
            script::MEROITIC_HIEROGLYPHS |

            // Unicode-7.0 additions
            script::MANICHAEAN |
            script::MENDE_KIKAKUI |
            script::NABATAEAN |
            script::OLD_NORTH_ARABIAN |
            script::PALMYRENE |
            script::PSALTER_PAHLAVI |

            // Unicode-8.0 additions
            script::HATRAN |

            // Unicode-9.0 additions
            script::ADLAM |

            // Unicode-11.0 additions
            script::HANIFI_ROHINGYA |
            script::OLD_SOGDIAN |
            script::SOGDIAN |

            // Unicode-12.0 additions
            script::ELYMAIC |

            // Unicode-13.0 additions
            script::CHORASMIAN |
            script::YEZIDI |

            // Unicode-14.0 additions
            script::OLD_UYGHUR => {
                Some(Direction::RightToLeft)
            }

            // https://github.com/harfbuzz/harfbuzz/issues/1000
            script::OLD_HUNGARIAN |
            script::OLD_ITALIC |
            script::RUNIC |
            script::TIFINAGH => {
                None
            }

            _ => Some(Direction::LeftToRight),
        }
    }
}

impl core::str::FromStr for Direction {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("invalid direction");
        }

        // harfbuzz also matches only the first letter.
        match s.as_bytes()[0].to_ascii_lowercase() {
            b'l' => Ok(Direction::LeftToRight),
            b'r' => Ok(Direction::RightToLeft),
            b't' => Ok(Direction::TopToBottom),
            b'b' => Ok(Direction::BottomToTop),
            _ => Err("invalid direction"),
        }
    }
}

/// A text language.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Language(String);

impl Language {
    /// Returns the language as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Checks that the language matches a BCP 47 primary subtag.
    pub fn has_primary_subtag(&self, subtag: &str) -> bool {
        let primary = self.0.split('-').next().unwrap_or_default();
        primary == subtag
    }
}

impl core::str::FromStr for Language {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Err("invalid language")
        } else {
            Ok(Language(s.to_ascii_lowercase()))
        }
    }
}

// In harfbuzz, despite having `hb_script_t`, script can actually have any tag.
// So we're doing the same.
// The only difference is that `Script` cannot be set to `HB_SCRIPT_INVALID`.
/// A text script.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Script(pub(crate) Tag);

impl Script {
    pub(crate) const fn from_bytes(bytes: &[u8; 4]) -> Self {
        Script(Tag::from_bytes(bytes))
    }

    /// Converts an ISO 15924 script tag to a corresponding `Script`.
    pub fn from_iso15924_tag(tag: Tag) -> Option<Script> {
        if tag.is_null() {
            return None;
        }

        // Be lenient, adjust case (one capital letter followed by three small letters).
        let tag = Tag((tag.as_u32() & 0xDFDFDFDF) | 0x00202020);

        match &tag.to_bytes() {
            // These graduated from the 'Q' private-area codes, but
            // the old code is still aliased by Unicode, and the Qaai
            // one in use by ICU.
            b"Qaai" => return Some(script::INHERITED),
            b"Qaac" => return Some(script::COPTIC),

            // Script variants from https://unicode.org/iso15924/
            b"Cyrs" => return Some(script::CYRILLIC),
            b"Latf" | b"Latg" => return Some(script::LATIN),
            b"Syre" | b"Syrj" | b"Syrn" => return Some(script::SYRIAC),

            _ => {}
        }

        if tag.as_u32() & 0xE0E0E0E0 == 0x40606060 {
            Some(Script(tag))
        } else {
            Some(script::UNKNOWN)
        }
    }

    /// Returns script's tag.
    pub fn tag(&self) -> Tag {
        self.0
    }

    /// Checks that the script is shaped by the joining state machine.
    pub(crate) fn has_joining_behavior(&self) -> bool {
        matches!(
            *self,
            script::ARABIC
                | script::SYRIAC
                | script::MONGOLIAN
                | script::NKO
                | script::PHAGS_PA
                | script::MANDAIC
                | script::MANICHAEAN
                | script::PSALTER_PAHLAVI
                | script::ADLAM
                | script::HANIFI_ROHINGYA
                | script::SOGDIAN
                | script::CHORASMIAN
                | script::OLD_UYGHUR
        )
    }
}

impl core::str::FromStr for Script {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = Tag::from_bytes_lossy(s.as_bytes());
        Script::from_iso15924_tag(tag).ok_or("invalid script")
    }
}

/// Predefined scripts.
///
/// Only the scripts the engine treats specially are listed; any other
/// ISO 15924 tag is still a valid `Script`.
pub mod script {
    #![allow(missing_docs)]

    use crate::Script;

    pub const COMMON: Script                    = Script::from_bytes(b"Zyyy");
    pub const INHERITED: Script                 = Script::from_bytes(b"Zinh");
    pub const UNKNOWN: Script                   = Script::from_bytes(b"Zzzz"); // Script can be Unknown, but not Invalid.
    pub const ARABIC: Script                    = Script::from_bytes(b"Arab");
    pub const COPTIC: Script                    = Script::from_bytes(b"Copt");
    pub const CYRILLIC: Script                  = Script::from_bytes(b"Cyrl");
    pub const GREEK: Script                     = Script::from_bytes(b"Grek");
    pub const HEBREW: Script                    = Script::from_bytes(b"Hebr");
    pub const LATIN: Script                     = Script::from_bytes(b"Latn");
    pub const MONGOLIAN: Script                 = Script::from_bytes(b"Mong");
    pub const RUNIC: Script                     = Script::from_bytes(b"Runr");
    pub const SYRIAC: Script                    = Script::from_bytes(b"Syrc");
    pub const THAANA: Script                    = Script::from_bytes(b"Thaa");
    pub const OLD_ITALIC: Script                = Script::from_bytes(b"Ital");
    pub const CYPRIOT: Script                   = Script::from_bytes(b"Cprt");
    pub const KHAROSHTHI: Script                = Script::from_bytes(b"Khar");
    pub const TIFINAGH: Script                  = Script::from_bytes(b"Tfng");
    pub const NKO: Script                       = Script::from_bytes(b"Nkoo");
    pub const PHAGS_PA: Script                  = Script::from_bytes(b"Phag");
    pub const PHOENICIAN: Script                = Script::from_bytes(b"Phnx");
    pub const LYDIAN: Script                    = Script::from_bytes(b"Lydi");
    pub const AVESTAN: Script                   = Script::from_bytes(b"Avst");
    pub const IMPERIAL_ARAMAIC: Script          = Script::from_bytes(b"Armi");
    pub const INSCRIPTIONAL_PAHLAVI: Script     = Script::from_bytes(b"Phli");
    pub const INSCRIPTIONAL_PARTHIAN: Script    = Script::from_bytes(b"Prti");
    pub const OLD_SOUTH_ARABIAN: Script         = Script::from_bytes(b"Sarb");
    pub const OLD_TURKIC: Script                = Script::from_bytes(b"Orkh");
    pub const SAMARITAN: Script                 = Script::from_bytes(b"Samr");
    pub const MANDAIC: Script                   = Script::from_bytes(b"Mand");
    pub const MEROITIC_CURSIVE: Script          = Script::from_bytes(b"Merc");
    pub const MEROITIC_HIEROGLYPHS: Script      = Script::from_bytes(b"Mero");
    pub const MANICHAEAN: Script                = Script::from_bytes(b"Mani");
    pub const MENDE_KIKAKUI: Script             = Script::from_bytes(b"Mend");
    pub const NABATAEAN: Script                 = Script::from_bytes(b"Nbat");
    pub const OLD_NORTH_ARABIAN: Script         = Script::from_bytes(b"Narb");
    pub const PALMYRENE: Script                 = Script::from_bytes(b"Palm");
    pub const PSALTER_PAHLAVI: Script           = Script::from_bytes(b"Phlp");
    pub const HATRAN: Script                    = Script::from_bytes(b"Hatr");
    pub const OLD_HUNGARIAN: Script             = Script::from_bytes(b"Hung");
    pub const ADLAM: Script                     = Script::from_bytes(b"Adlm");
    pub const HANIFI_ROHINGYA: Script           = Script::from_bytes(b"Rohg");
    pub const OLD_SOGDIAN: Script               = Script::from_bytes(b"Sogo");
    pub const SOGDIAN: Script                   = Script::from_bytes(b"Sogd");
    pub const ELYMAIC: Script                   = Script::from_bytes(b"Elym");
    pub const CHORASMIAN: Script                = Script::from_bytes(b"Chrs");
    pub const YEZIDI: Script                    = Script::from_bytes(b"Yezi");
    pub const OLD_UYGHUR: Script                = Script::from_bytes(b"Ougr");
}

/// A feature request.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Feature {
    pub tag: Tag,
    pub value: u32,
    /// The first cluster the feature applies to.
    pub start: u32,
    /// The cluster after the last one the feature applies to.
    pub end: u32,
}

impl Feature {
    /// Creates a new `Feature`.
    pub fn new(tag: Tag, value: u32, range: impl core::ops::RangeBounds<u32>) -> Feature {
        use core::ops::Bound;

        let start = match range.start_bound() {
            Bound::Included(&n) => n,
            Bound::Excluded(&n) => n.saturating_add(1),
            Bound::Unbounded => 0,
        };

        let end = match range.end_bound() {
            Bound::Included(&n) => n.saturating_add(1),
            Bound::Excluded(&n) => n,
            Bound::Unbounded => u32::MAX,
        };

        Feature {
            tag,
            value,
            start,
            end,
        }
    }

    pub(crate) fn is_global(&self) -> bool {
        self.start == 0 && self.end == u32::MAX
    }
}

impl core::str::FromStr for Feature {
    type Err = &'static str;

    /// Parses a `Feature` from a string.
    ///
    /// Accepts an optional `+`/`-` prefix, a tag of up to four characters,
    /// an optional `[start:end]` cluster range and an optional `=value`
    /// suffix, where the value is a number or `on`/`off`.
    ///
    /// # Examples
    ///
    /// - `kern` -> `kern=1` for every cluster
    /// - `-kern` -> `kern=0`
    /// - `aalt=2`
    /// - `liga[3:5]` -> `liga=1` for clusters 3 and 4
    /// - `-liga[7:]` -> `liga=0` from cluster 7 on
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ERR: &str = "invalid feature";

        let s = s.trim();
        let (mut value, s) = match s.as_bytes().first() {
            Some(b'-') => (0, &s[1..]),
            Some(b'+') => (1, &s[1..]),
            Some(_) => (1, s),
            None => return Err(ERR),
        };

        let tag_len = s
            .bytes()
            .position(|b| b == b'[' || b == b'=')
            .unwrap_or(s.len());
        let tag_str = &s[..tag_len];
        if tag_str.is_empty() || tag_str.len() > 4 || !tag_str.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ERR);
        }

        let mut tag_bytes = [b' '; 4];
        tag_bytes[..tag_str.len()].copy_from_slice(tag_str.as_bytes());
        let tag = Tag::from_bytes(&tag_bytes);

        let mut rest = &s[tag_len..];
        let (mut start, mut end) = (0, u32::MAX);
        if let Some(range) = rest.strip_prefix('[') {
            let close = range.find(']').ok_or(ERR)?;
            let inner = &range[..close];
            rest = &range[close + 1..];

            let parse = |v: &str| v.trim().parse::<u32>().map_err(|_| ERR);
            match inner.split_once(':') {
                Some((a, b)) => {
                    if !a.trim().is_empty() {
                        start = parse(a)?;
                    }

                    if !b.trim().is_empty() {
                        end = parse(b)?;
                    }
                }
                None if inner.trim().is_empty() => {}
                None => {
                    start = parse(inner)?;
                    end = start.checked_add(1).ok_or(ERR)?;
                }
            }
        }

        if let Some(v) = rest.strip_prefix('=') {
            value = match v.trim() {
                "on" => 1,
                "off" => 0,
                v => v.parse::<u32>().map_err(|_| ERR)?,
            };
        } else if !rest.is_empty() {
            return Err(ERR);
        }

        Ok(Feature {
            tag,
            value,
            start,
            end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn direction_from_str() {
        assert_eq!(Direction::from_str("rtl"), Ok(Direction::RightToLeft));
        assert_eq!(Direction::from_str("TTB"), Ok(Direction::TopToBottom));
        assert!(Direction::from_str("").is_err());
        assert!(Direction::from_str("x").is_err());
    }

    #[test]
    fn script_tag_case_is_normalized() {
        assert_eq!(Script::from_str("arab"), Ok(script::ARABIC));
        assert_eq!(Script::from_str("SYRC"), Ok(script::SYRIAC));
        assert_eq!(Script::from_str("Syre"), Ok(script::SYRIAC));
    }

    #[test]
    fn script_direction() {
        assert_eq!(Direction::from_script(script::ARABIC), Some(Direction::RightToLeft));
        assert_eq!(Direction::from_script(script::LATIN), Some(Direction::LeftToRight));
        assert_eq!(Direction::from_script(script::OLD_ITALIC), None);
    }

    #[test]
    fn language_primary_subtag() {
        let lang = Language::from_str("SYR-x-foo").unwrap();
        assert!(lang.has_primary_subtag("syr"));
        assert!(!lang.has_primary_subtag("ar"));
    }

    #[test]
    fn feature_from_str() {
        let kern = Tag::from_bytes(b"kern");
        assert_eq!(Feature::from_str("kern"), Ok(Feature::new(kern, 1, ..)));
        assert_eq!(Feature::from_str("-kern"), Ok(Feature::new(kern, 0, ..)));
        assert_eq!(Feature::from_str("+kern=off"), Ok(Feature::new(kern, 0, ..)));
        assert_eq!(
            Feature::from_str("aalt=2"),
            Ok(Feature::new(Tag::from_bytes(b"aalt"), 2, ..))
        );
        assert_eq!(
            Feature::from_str("liga[3:5]"),
            Ok(Feature::new(Tag::from_bytes(b"liga"), 1, 3..5))
        );
        assert_eq!(
            Feature::from_str("-liga[7:]"),
            Ok(Feature::new(Tag::from_bytes(b"liga"), 0, 7..))
        );
        assert_eq!(
            Feature::from_str("liga[2]"),
            Ok(Feature::new(Tag::from_bytes(b"liga"), 1, 2..=2))
        );
        assert_eq!(
            Feature::from_str("cv1"),
            Ok(Feature::new(Tag::from_bytes(b"cv1 "), 1, ..))
        );
        assert!(Feature::from_str("").is_err());
        assert!(Feature::from_str("ligatures").is_err());
        assert!(Feature::from_str("liga[1:x]").is_err());
        assert!(Feature::from_str("liga=yes").is_err());
    }
}
