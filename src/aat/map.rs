use alloc::vec::Vec;

use crate::common::Feature;
use crate::tables::morx;
use crate::{Mask, Tag};

#[allow(missing_docs)]
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FeatureType {
    Ligatures = 1,
    LetterCase = 3,
    VerticalSubstitution = 4,
    NumberSpacing = 6,
    VerticalPosition = 10,
    Fractions = 11,
    TypographicExtras = 14,
    MathematicalExtras = 15,
    StyleOptions = 19,
    CharacterShape = 20,
    NumberCase = 21,
    TextSpacing = 22,
    Transliteration = 23,
    RubyKana = 28,
    ItalicCjkRoman = 32,
    CaseSensitiveLayout = 33,
    AlternateKana = 34,
    StylisticAlternatives = 35,
    ContextualAlternatives = 36,
    LowerCase = 37,
    UpperCase = 38,
}

impl From<FeatureType> for u16 {
    fn from(kind: FeatureType) -> Self {
        kind as u16
    }
}

// FeatureType::Ligatures
pub const REQUIRED_LIGATURES_ON: u16 = 0;
pub const REQUIRED_LIGATURES_OFF: u16 = 1;
pub const COMMON_LIGATURES_ON: u16 = 2;
pub const COMMON_LIGATURES_OFF: u16 = 3;
pub const RARE_LIGATURES_ON: u16 = 4;
pub const RARE_LIGATURES_OFF: u16 = 5;
pub const CONTEXTUAL_LIGATURES_ON: u16 = 18;
pub const CONTEXTUAL_LIGATURES_OFF: u16 = 19;
pub const HISTORICAL_LIGATURES_ON: u16 = 20;
pub const HISTORICAL_LIGATURES_OFF: u16 = 21;

// FeatureType::LetterCase
pub const SMALL_CAPS: u16 = 3; // deprecated

// FeatureType::VerticalSubstitution
pub const SUBSTITUTE_VERTICAL_FORMS_ON: u16 = 0;
pub const SUBSTITUTE_VERTICAL_FORMS_OFF: u16 = 1;

// FeatureType::NumberSpacing
pub const MONOSPACED_NUMBERS: u16 = 0;
pub const PROPORTIONAL_NUMBERS: u16 = 1;

// FeatureType::VerticalPosition
pub const NORMAL_POSITION: u16 = 0;
pub const SUPERIORS: u16 = 1;
pub const INFERIORS: u16 = 2;
pub const ORDINALS: u16 = 3;
pub const SCIENTIFIC_INFERIORS: u16 = 4;

// FeatureType::Fractions
pub const NO_FRACTIONS: u16 = 0;
pub const VERTICAL_FRACTIONS: u16 = 1;
pub const DIAGONAL_FRACTIONS: u16 = 2;

// FeatureType::TypographicExtras
pub const SLASHED_ZERO_ON: u16 = 4;
pub const SLASHED_ZERO_OFF: u16 = 5;

// FeatureType::MathematicalExtras
pub const MATHEMATICAL_GREEK_ON: u16 = 10;
pub const MATHEMATICAL_GREEK_OFF: u16 = 11;

// FeatureType::NumberCase
pub const LOWER_CASE_NUMBERS: u16 = 0;
pub const UPPER_CASE_NUMBERS: u16 = 1;

// FeatureType::CaseSensitiveLayout
pub const CASE_SENSITIVE_LAYOUT_ON: u16 = 0;
pub const CASE_SENSITIVE_LAYOUT_OFF: u16 = 1;

// FeatureType::StylisticAlternatives
pub const STYLISTIC_ALT_ONE_ON: u16 = 2;
pub const STYLISTIC_ALT_ONE_OFF: u16 = 3;
pub const STYLISTIC_ALT_TWO_ON: u16 = 4;
pub const STYLISTIC_ALT_TWO_OFF: u16 = 5;
pub const STYLISTIC_ALT_THREE_ON: u16 = 6;
pub const STYLISTIC_ALT_THREE_OFF: u16 = 7;

// FeatureType::ContextualAlternatives
pub const CONTEXTUAL_ALTERNATES_ON: u16 = 0;
pub const CONTEXTUAL_ALTERNATES_OFF: u16 = 1;
pub const SWASH_ALTERNATES_ON: u16 = 2;
pub const SWASH_ALTERNATES_OFF: u16 = 3;

// FeatureType::LowerCase
pub const DEFAULT_LOWER_CASE: u16 = 0;
pub const LOWER_CASE_SMALL_CAPS: u16 = 1;
pub const LOWER_CASE_PETITE_CAPS: u16 = 2;

// FeatureType::UpperCase
pub const DEFAULT_UPPER_CASE: u16 = 0;
pub const UPPER_CASE_SMALL_CAPS: u16 = 1;
pub const UPPER_CASE_PETITE_CAPS: u16 = 2;

/// An OpenType feature tag with its AAT feature type and selectors.
pub struct FeatureMapping {
    pub ot_feature_tag: Tag,
    pub aat_feature_type: FeatureType,
    pub selector_to_enable: u16,
    pub selector_to_disable: u16,
}

impl FeatureMapping {
    const fn new(
        ot_feature_tag: &[u8; 4],
        aat_feature_type: FeatureType,
        selector_to_enable: u16,
        selector_to_disable: u16,
    ) -> Self {
        FeatureMapping {
            ot_feature_tag: Tag::from_bytes(ot_feature_tag),
            aat_feature_type,
            selector_to_enable,
            selector_to_disable,
        }
    }

    /// Whether the selectors of this feature type pick one of many
    /// settings rather than toggle one on and off.
    ///
    /// On/off selectors come in even/odd pairs.
    fn is_exclusive(&self) -> bool {
        !(self.selector_to_enable % 2 == 0 && self.selector_to_disable == self.selector_to_enable + 1)
    }
}

/// Mapping from OpenType feature tags to AAT feature types and selectors,
/// sorted by tag.
#[rustfmt::skip]
pub const FEATURE_MAPPINGS: &[FeatureMapping] = &[
    FeatureMapping::new(b"afrc", FeatureType::Fractions, VERTICAL_FRACTIONS, NO_FRACTIONS),
    FeatureMapping::new(b"c2pc", FeatureType::UpperCase, UPPER_CASE_PETITE_CAPS, DEFAULT_UPPER_CASE),
    FeatureMapping::new(b"c2sc", FeatureType::UpperCase, UPPER_CASE_SMALL_CAPS, DEFAULT_UPPER_CASE),
    FeatureMapping::new(b"calt", FeatureType::ContextualAlternatives, CONTEXTUAL_ALTERNATES_ON, CONTEXTUAL_ALTERNATES_OFF),
    FeatureMapping::new(b"case", FeatureType::CaseSensitiveLayout, CASE_SENSITIVE_LAYOUT_ON, CASE_SENSITIVE_LAYOUT_OFF),
    FeatureMapping::new(b"clig", FeatureType::Ligatures, CONTEXTUAL_LIGATURES_ON, CONTEXTUAL_LIGATURES_OFF),
    FeatureMapping::new(b"dlig", FeatureType::Ligatures, RARE_LIGATURES_ON, RARE_LIGATURES_OFF),
    FeatureMapping::new(b"frac", FeatureType::Fractions, DIAGONAL_FRACTIONS, NO_FRACTIONS),
    FeatureMapping::new(b"hlig", FeatureType::Ligatures, HISTORICAL_LIGATURES_ON, HISTORICAL_LIGATURES_OFF),
    FeatureMapping::new(b"liga", FeatureType::Ligatures, COMMON_LIGATURES_ON, COMMON_LIGATURES_OFF),
    FeatureMapping::new(b"lnum", FeatureType::NumberCase, UPPER_CASE_NUMBERS, 2),
    FeatureMapping::new(b"mgrk", FeatureType::MathematicalExtras, MATHEMATICAL_GREEK_ON, MATHEMATICAL_GREEK_OFF),
    FeatureMapping::new(b"onum", FeatureType::NumberCase, LOWER_CASE_NUMBERS, 2),
    FeatureMapping::new(b"ordn", FeatureType::VerticalPosition, ORDINALS, NORMAL_POSITION),
    FeatureMapping::new(b"pcap", FeatureType::LowerCase, LOWER_CASE_PETITE_CAPS, DEFAULT_LOWER_CASE),
    FeatureMapping::new(b"pnum", FeatureType::NumberSpacing, PROPORTIONAL_NUMBERS, 4),
    FeatureMapping::new(b"rlig", FeatureType::Ligatures, REQUIRED_LIGATURES_ON, REQUIRED_LIGATURES_OFF),
    FeatureMapping::new(b"sinf", FeatureType::VerticalPosition, SCIENTIFIC_INFERIORS, NORMAL_POSITION),
    FeatureMapping::new(b"smcp", FeatureType::LowerCase, LOWER_CASE_SMALL_CAPS, DEFAULT_LOWER_CASE),
    FeatureMapping::new(b"ss01", FeatureType::StylisticAlternatives, STYLISTIC_ALT_ONE_ON, STYLISTIC_ALT_ONE_OFF),
    FeatureMapping::new(b"ss02", FeatureType::StylisticAlternatives, STYLISTIC_ALT_TWO_ON, STYLISTIC_ALT_TWO_OFF),
    FeatureMapping::new(b"ss03", FeatureType::StylisticAlternatives, STYLISTIC_ALT_THREE_ON, STYLISTIC_ALT_THREE_OFF),
    FeatureMapping::new(b"subs", FeatureType::VerticalPosition, INFERIORS, NORMAL_POSITION),
    FeatureMapping::new(b"sups", FeatureType::VerticalPosition, SUPERIORS, NORMAL_POSITION),
    FeatureMapping::new(b"swsh", FeatureType::ContextualAlternatives, SWASH_ALTERNATES_ON, SWASH_ALTERNATES_OFF),
    FeatureMapping::new(b"tnum", FeatureType::NumberSpacing, MONOSPACED_NUMBERS, 4),
    FeatureMapping::new(b"vert", FeatureType::VerticalSubstitution, SUBSTITUTE_VERTICAL_FORMS_ON, SUBSTITUTE_VERTICAL_FORMS_OFF),
    FeatureMapping::new(b"vrt2", FeatureType::VerticalSubstitution, SUBSTITUTE_VERTICAL_FORMS_ON, SUBSTITUTE_VERTICAL_FORMS_OFF),
    FeatureMapping::new(b"zero", FeatureType::TypographicExtras, SLASHED_ZERO_ON, SLASHED_ZERO_OFF),
];

/// The first cluster of a feature that covers the whole buffer.
pub const FEATURE_GLOBAL_START: u32 = 0;
/// The last cluster of a feature that covers the whole buffer.
pub const FEATURE_GLOBAL_END: u32 = u32::MAX;

/// Feature flags of one chain over a cluster range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeFlags {
    pub flags: Mask,
    pub cluster_first: u32,
    pub cluster_last: u32,
}

/// Compiled `morx` feature flags, one list of ranges per chain.
#[derive(Clone, Debug, Default)]
pub struct Map {
    pub chain_flags: Vec<Vec<RangeFlags>>,
}

#[derive(Clone, Copy, Debug)]
struct FeatureInfo {
    kind: u16,
    setting: u16,
    is_exclusive: bool,
    // Request order. Keeps sorting stable.
    seq: usize,
}

impl FeatureInfo {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        if self.kind != other.kind {
            self.kind.cmp(&other.kind)
        } else if !self.is_exclusive && (self.setting & !1) != (other.setting & !1) {
            self.setting.cmp(&other.setting)
        } else {
            self.seq.cmp(&other.seq)
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct FeatureRange {
    info: FeatureInfo,
    start: u32,
    end: u32,
}

#[derive(Clone, Copy, Debug)]
struct FeatureEvent {
    index: u32,
    start: bool,
    feature: FeatureInfo,
}

/// Collects feature requests and compiles them into a [`Map`].
#[derive(Default)]
pub struct MapBuilder {
    features: Vec<FeatureRange>,
}

impl MapBuilder {
    pub fn new() -> Self {
        MapBuilder::default()
    }

    /// Requests a feature setting for the clusters in `start..end`.
    ///
    /// Pass `FEATURE_GLOBAL_START..FEATURE_GLOBAL_END` for the whole buffer.
    pub fn add_feature(&mut self, kind: u16, setting: u16, is_exclusive: bool, start: u32, end: u32) {
        let seq = self.features.len();
        self.features.push(FeatureRange {
            info: FeatureInfo {
                kind,
                setting,
                is_exclusive,
                seq,
            },
            start,
            end,
        });
    }

    /// Requests the AAT counterpart of an OpenType feature.
    ///
    /// Returns `false` for tags without a counterpart.
    pub fn add_ot_feature(&mut self, feature: &Feature) -> bool {
        let mapping = match FEATURE_MAPPINGS.binary_search_by(|m| m.ot_feature_tag.cmp(&feature.tag)) {
            Ok(idx) => &FEATURE_MAPPINGS[idx],
            Err(_) => return false,
        };

        let setting = if feature.value != 0 {
            mapping.selector_to_enable
        } else {
            mapping.selector_to_disable
        };

        self.add_feature(
            u16::from(mapping.aat_feature_type),
            setting,
            mapping.is_exclusive(),
            feature.start,
            feature.end,
        );

        true
    }

    pub fn compile(&self, morx: Option<&morx::Table>) -> Map {
        let mut map = Map::default();
        let morx = match morx {
            Some(v) => v,
            None => return map,
        };

        if self.features.is_empty() {
            compile_flags(morx, &[], FEATURE_GLOBAL_START, FEATURE_GLOBAL_END, &mut map);
            return map;
        }

        // Sort features by start/end events.
        let mut events = Vec::with_capacity(self.features.len() * 2 + 1);
        for feature in &self.features {
            if feature.start == feature.end {
                continue;
            }

            events.push(FeatureEvent {
                index: feature.start,
                start: true,
                feature: feature.info,
            });
            events.push(FeatureEvent {
                index: feature.end,
                start: false,
                feature: feature.info,
            });
        }

        events.sort_by(|a, b| {
            a.index
                .cmp(&b.index)
                .then(a.start.cmp(&b.start))
                .then_with(|| a.feature.cmp(&b.feature))
        });

        // A strategic final event closing the last range.
        events.push(FeatureEvent {
            index: FEATURE_GLOBAL_END,
            start: false,
            feature: FeatureInfo {
                kind: 0,
                setting: 0,
                is_exclusive: false,
                seq: self.features.len() + 1,
            },
        });

        // Scan events and save features for each range.
        let mut active_features: Vec<FeatureInfo> = Vec::new();
        let mut last_index = 0;
        for event in &events {
            if event.index != last_index {
                // Save a snapshot of active features and the range.
                let current = merge_duplicates(active_features.clone());
                compile_flags(morx, &current, last_index, event.index.wrapping_sub(1), &mut map);
                last_index = event.index;
            }

            if event.start {
                active_features.push(event.feature);
            } else if let Some(pos) = active_features.iter().position(|f| f.seq == event.feature.seq) {
                active_features.remove(pos);
            }
        }

        for chain_flags in &mut map.chain_flags {
            if let Some(last) = chain_flags.last_mut() {
                last.cluster_last = FEATURE_GLOBAL_END;
            }
        }

        map
    }
}

fn merge_duplicates(mut features: Vec<FeatureInfo>) -> Vec<FeatureInfo> {
    if features.is_empty() {
        return features;
    }

    features.sort_by(FeatureInfo::cmp);

    let mut j = 0;
    for i in 1..features.len() {
        // Nonexclusive feature selectors come in even/odd pairs to turn a setting on/off
        // respectively, so we mask out the low-order bit when checking for "duplicates"
        // (selectors referring to the same feature setting) here.
        let non_exclusive = !features[i].is_exclusive
            && (features[i].setting & !1) != (features[j].setting & !1);

        if features[i].kind != features[j].kind || non_exclusive {
            j += 1;
            features[j] = features[i];
        }
    }
    features.truncate(j + 1);

    features
}

// Chain::compile_flags in harfbuzz
fn compile_flags(
    morx: &morx::Table,
    features: &[FeatureInfo],
    range_first: u32,
    range_last: u32,
    map: &mut Map,
) {
    let has_feature = |kind: u16, setting: u16| {
        features
            .iter()
            .any(|probe| probe.kind == kind && probe.setting == setting)
    };

    map.chain_flags.resize(morx.chains.len(), Vec::new());

    for (chain, chain_flags) in morx.chains.iter().zip(map.chain_flags.iter_mut()) {
        let mut flags = chain.default_flags;
        for feature in &chain.features {
            // Check whether this type/setting pair was requested in the map,
            // and if so, apply its flags.
            if has_feature(feature.kind, feature.setting) {
                flags &= feature.disable_flags;
                flags |= feature.enable_flags;
            } else if feature.kind == u16::from(FeatureType::LetterCase)
                && feature.setting == SMALL_CAPS
            {
                // Deprecated. https://github.com/harfbuzz/harfbuzz/issues/1342
                if has_feature(u16::from(FeatureType::LowerCase), LOWER_CASE_SMALL_CAPS) {
                    flags &= feature.disable_flags;
                    flags |= feature.enable_flags;
                }
            }
        }

        chain_flags.push(RangeFlags {
            flags,
            cluster_first: range_first,
            cluster_last: range_last,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::morx::{Chain, Feature};
    use alloc::vec;

    fn morx() -> morx::Table {
        morx::Table {
            chains: vec![Chain {
                default_flags: 0b0011,
                features: vec![
                    // Common ligatures off clears bit 0.
                    Feature { kind: 1, setting: 3, enable_flags: 0, disable_flags: !0b0001 },
                    // Rare ligatures on sets bit 2.
                    Feature { kind: 1, setting: 4, enable_flags: 0b0100, disable_flags: !0 },
                    // Deprecated small caps sets bit 3.
                    Feature { kind: 3, setting: 3, enable_flags: 0b1000, disable_flags: !0 },
                ],
                subtables: vec![],
            }],
        }
    }

    #[test]
    fn defaults_without_requests() {
        let map = MapBuilder::new().compile(Some(&morx()));
        assert_eq!(
            map.chain_flags,
            vec![vec![RangeFlags {
                flags: 0b0011,
                cluster_first: FEATURE_GLOBAL_START,
                cluster_last: FEATURE_GLOBAL_END,
            }]]
        );
    }

    #[test]
    fn global_feature() {
        let mut builder = MapBuilder::new();
        builder.add_feature(1, COMMON_LIGATURES_OFF, false, FEATURE_GLOBAL_START, FEATURE_GLOBAL_END);
        let map = builder.compile(Some(&morx()));
        assert_eq!(map.chain_flags[0].len(), 1);
        assert_eq!(map.chain_flags[0][0].flags, 0b0010);
    }

    #[test]
    fn ranged_feature_splits_chain_flags() {
        let mut builder = MapBuilder::new();
        builder.add_feature(1, RARE_LIGATURES_ON, false, 2, 5);
        let map = builder.compile(Some(&morx()));
        assert_eq!(
            map.chain_flags[0],
            vec![
                RangeFlags { flags: 0b0011, cluster_first: 0, cluster_last: 1 },
                RangeFlags { flags: 0b0111, cluster_first: 2, cluster_last: 4 },
                RangeFlags { flags: 0b0011, cluster_first: 5, cluster_last: FEATURE_GLOBAL_END },
            ]
        );
    }

    #[test]
    fn lower_case_small_caps_falls_back_to_letter_case() {
        let mut builder = MapBuilder::new();
        builder.add_feature(
            u16::from(FeatureType::LowerCase),
            LOWER_CASE_SMALL_CAPS,
            true,
            FEATURE_GLOBAL_START,
            FEATURE_GLOBAL_END,
        );
        let map = builder.compile(Some(&morx()));
        assert_eq!(map.chain_flags[0][0].flags, 0b1011);
    }

    #[test]
    fn mappings_are_sorted() {
        assert!(FEATURE_MAPPINGS
            .windows(2)
            .all(|w| w[0].ot_feature_tag < w[1].ot_feature_tag));
    }

    #[test]
    fn ot_features_map_to_selectors() {
        use core::str::FromStr;

        let mut builder = MapBuilder::new();
        assert!(builder.add_ot_feature(&crate::common::Feature::from_str("-liga").unwrap()));
        assert!(!builder.add_ot_feature(&crate::common::Feature::from_str("kern").unwrap()));
        let map = builder.compile(Some(&morx()));
        assert_eq!(map.chain_flags[0][0].flags, 0b0010);

        let mut builder = MapBuilder::new();
        builder.add_ot_feature(&crate::common::Feature::from_str("dlig[1:3]").unwrap());
        let map = builder.compile(Some(&morx()));
        assert_eq!(map.chain_flags[0][1], RangeFlags { flags: 0b0111, cluster_first: 1, cluster_last: 2 });
    }

    #[test]
    fn on_off_pairs_are_not_exclusive() {
        let find = |tag: &[u8; 4]| {
            FEATURE_MAPPINGS
                .iter()
                .find(|m| m.ot_feature_tag == Tag::from_bytes(tag))
                .map(|m| m.is_exclusive())
        };
        assert_eq!(find(b"liga"), Some(false));
        assert_eq!(find(b"vert"), Some(false));
        assert_eq!(find(b"sups"), Some(true));
        assert_eq!(find(b"smcp"), Some(true));
    }

    #[test]
    fn no_morx_no_chains() {
        assert!(MapBuilder::new().compile(None).chain_flags.is_empty());
    }
}
