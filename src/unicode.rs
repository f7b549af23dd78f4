use bitflags::bitflags;
pub use unicode_properties::GeneralCategory;

use crate::{script, Script, Tag};

bitflags! {
    /// Per-character properties packed into `GlyphInfo::unicode_props`.
    ///
    /// The low five bits hold the general category, the high byte holds the
    /// modified combining class.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct UnicodeProps: u16 {
        const GENERAL_CATEGORY  = 0x001F;
        const IGNORABLE         = 0x0020;
        // MONGOLIAN FREE VARIATION SELECTOR 1..4, or TAG characters
        const HIDDEN            = 0x0040;
        const CONTINUATION      = 0x0080;
    }
}

pub trait GeneralCategoryExt {
    fn to_rb(&self) -> u8;
    fn is_mark(&self) -> bool;
}

impl GeneralCategoryExt for GeneralCategory {
    fn to_rb(&self) -> u8 {
        match *self {
            GeneralCategory::Control => 0,
            GeneralCategory::Format => 1,
            GeneralCategory::Unassigned => 2,
            GeneralCategory::PrivateUse => 3,
            GeneralCategory::Surrogate => 4,
            GeneralCategory::LowercaseLetter => 5,
            GeneralCategory::ModifierLetter => 6,
            GeneralCategory::OtherLetter => 7,
            GeneralCategory::TitlecaseLetter => 8,
            GeneralCategory::UppercaseLetter => 9,
            GeneralCategory::SpacingMark => 10,
            GeneralCategory::EnclosingMark => 11,
            GeneralCategory::NonspacingMark => 12,
            GeneralCategory::DecimalNumber => 13,
            GeneralCategory::LetterNumber => 14,
            GeneralCategory::OtherNumber => 15,
            GeneralCategory::ConnectorPunctuation => 16,
            GeneralCategory::DashPunctuation => 17,
            GeneralCategory::ClosePunctuation => 18,
            GeneralCategory::FinalPunctuation => 19,
            GeneralCategory::InitialPunctuation => 20,
            GeneralCategory::OtherPunctuation => 21,
            GeneralCategory::OpenPunctuation => 22,
            GeneralCategory::CurrencySymbol => 23,
            GeneralCategory::ModifierSymbol => 24,
            GeneralCategory::MathSymbol => 25,
            GeneralCategory::OtherSymbol => 26,
            GeneralCategory::LineSeparator => 27,
            GeneralCategory::ParagraphSeparator => 28,
            GeneralCategory::SpaceSeparator => 29,
        }
    }

    fn is_mark(&self) -> bool {
        matches!(
            *self,
            GeneralCategory::SpacingMark
                | GeneralCategory::EnclosingMark
                | GeneralCategory::NonspacingMark
        )
    }
}

/// The packed general category of a non-spacing mark.
pub const NON_SPACING_MARK: u8 = 12;

pub trait CharExt {
    fn general_category(self) -> GeneralCategory;
    fn modified_combining_class(self) -> u8;
    fn is_default_ignorable(self) -> bool;
    fn script(self) -> Script;
}

impl CharExt for char {
    fn general_category(self) -> GeneralCategory {
        unicode_properties::UnicodeGeneralCategory::general_category(self)
    }

    fn modified_combining_class(self) -> u8 {
        // Reorder SAKOT to ensure it comes after any tone marks.
        if self == '\u{1A60}' {
            return 254;
        }

        // Reorder PADMA to ensure it comes after any vowel marks.
        if self == '\u{0FC6}' {
            return 254;
        }

        // Reorder TSA -PHRU to reorder before U+0F74
        if self == '\u{0F39}' {
            return 127;
        }

        let ccc = unicode_ccc::get_canonical_combining_class(self) as u8;
        modified_combining_class(ccc)
    }

    // Default_Ignorable codepoints:
    //
    // Note: While U+115F, U+1160, U+3164 and U+FFA0 are Default_Ignorable,
    // we do NOT want to hide them, as the way Uniscribe has implemented them
    // is with regular spacing glyphs, and that's the way fonts are made to work.
    // As such, we make exceptions for those four.
    // Also ignoring U+1BCA0..1BCA3. https://github.com/harfbuzz/harfbuzz/issues/503
    fn is_default_ignorable(self) -> bool {
        let ch = u32::from(self);
        let plane = ch >> 16;
        if plane == 0 {
            // BMP
            let page = ch >> 8;
            match page {
                0x00 => ch == 0x00AD,
                0x03 => ch == 0x034F,
                0x06 => ch == 0x061C,
                0x17 => (0x17B4..=0x17B5).contains(&ch),
                0x18 => (0x180B..=0x180F).contains(&ch),
                0x20 => {
                    (0x200B..=0x200F).contains(&ch)
                        || (0x202A..=0x202E).contains(&ch)
                        || (0x2060..=0x206F).contains(&ch)
                }
                0xFE => (0xFE00..=0xFE0F).contains(&ch) || ch == 0xFEFF,
                0xFF => (0xFFF0..=0xFFF8).contains(&ch),
                _ => false,
            }
        } else {
            // Other planes
            match plane {
                0x01 => (0x1D173..=0x1D17A).contains(&ch),
                0x0E => (0xE0000..=0xE0FFF).contains(&ch),
                _ => false,
            }
        }
    }

    fn script(self) -> Script {
        let name = unicode_script::UnicodeScript::script(&self).short_name();
        Script::from_iso15924_tag(Tag::from_bytes_lossy(name.as_bytes()))
            .unwrap_or(script::UNKNOWN)
    }
}

/// Permutes canonical combining classes so that marks sort the way fonts
/// expect them to.
fn modified_combining_class(ccc: u8) -> u8 {
    match ccc {
        // Hebrew
        //
        // We permute the "fixed-position" classes 10-26 into the order
        // described in the SBL Hebrew manual:
        //
        // https://www.sbl-site.org/Fonts/SBLHebrewUserManual1.5x.pdf
        10 => 22, // sheva
        11 => 15, // hataf segol
        12 => 16, // hataf patah
        13 => 17, // hataf qamats
        14 => 23, // hiriq
        15 => 18, // tsere
        16 => 19, // segol
        17 => 20, // patah
        18 => 21, // qamats
        19 => 14, // holam
        20 => 24, // qubuts
        21 => 12, // dagesh
        22 => 25, // meteg
        23 => 13, // rafe
        24 => 10, // shin dot
        25 => 11, // sin dot

        // Arabic
        //
        // Modify to move Shadda (ccc=33) before other marks. See:
        // https://unicode.org/faq/normalization.html#8
        // https://unicode.org/faq/normalization.html#9
        27 => 28, // fathatan
        28 => 29, // dammatan
        29 => 30, // kasratan
        30 => 31, // fatha
        31 => 32, // damma
        32 => 33, // kasra
        33 => 27, // shadda

        // Telugu length marks.
        84 | 91 => 0,

        // Thai sara u / sara uu.
        103 => 3,

        // Tibetan sign i / sign u.
        130 => 132,
        132 => 131,

        _ => ccc,
    }
}

/// The joining behavior of a character, as seen by the joining machine.
///
/// The two Syriac groups join like `R` but select special final forms
/// after certain letters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum JoiningType {
    U,
    L,
    R,
    D,
    Alaph,
    DalathRish,
    T,
}

pub(crate) fn joining_type(c: char) -> JoiningType {
    use unicode_joining_type::JoiningType as Type;

    match u32::from(c) {
        0x0710 => return JoiningType::Alaph,
        0x0715 | 0x0716 | 0x072A | 0x072F => return JoiningType::DalathRish,
        _ => {}
    }

    match unicode_joining_type::get_joining_type(c) {
        Type::LeftJoining => JoiningType::L,
        Type::RightJoining => JoiningType::R,
        // Join-causing characters behave as dual-joining ones.
        Type::DualJoining | Type::JoinCausing => JoiningType::D,
        Type::Transparent => JoiningType::T,
        _ if matches!(
            c.general_category(),
            GeneralCategory::NonspacingMark | GeneralCategory::EnclosingMark
        ) =>
        {
            JoiningType::T
        }
        _ => JoiningType::U,
    }
}

/// Computes the packed `UnicodeProps` value for a character.
pub(crate) fn props_for(c: char) -> u16 {
    let gc = c.general_category();
    let mut props = u16::from(gc.to_rb());

    if u32::from(c) >= 0x80 {
        if c.is_default_ignorable() {
            props |= UnicodeProps::IGNORABLE.bits();

            // Mongolian free variation selectors and TAG characters stay
            // visible to shaping but never render.
            if matches!(u32::from(c), 0x180B..=0x180D | 0x180F | 0xE0020..=0xE007F) {
                props |= UnicodeProps::HIDDEN.bits();
            }
        }

        if gc.is_mark() {
            props |= UnicodeProps::CONTINUATION.bits();
            props |= u16::from(c.modified_combining_class()) << 8;
        }
    }

    props
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadda_sorts_first() {
        assert_eq!('\u{0651}'.modified_combining_class(), 27);
        assert_eq!('\u{064E}'.modified_combining_class(), 31);
    }

    #[test]
    fn mongolian_fvs_is_hidden() {
        let props = props_for('\u{180B}');
        assert_ne!(props & UnicodeProps::IGNORABLE.bits(), 0);
        assert_ne!(props & UnicodeProps::HIDDEN.bits(), 0);
    }

    #[test]
    fn marks_carry_combining_class() {
        let props = props_for('\u{0301}');
        assert_eq!(props as u8 & 0x1F, NON_SPACING_MARK);
        assert_eq!(props >> 8, 230);
    }

    #[test]
    fn joining_types() {
        assert_eq!(joining_type('\u{0627}'), JoiningType::R); // alef
        assert_eq!(joining_type('\u{0644}'), JoiningType::D); // lam
        assert_eq!(joining_type('\u{064E}'), JoiningType::T); // fatha
        assert_eq!(joining_type('\u{200D}'), JoiningType::D); // zwj
        assert_eq!(joining_type('\u{200C}'), JoiningType::U); // zwnj
        assert_eq!(joining_type('\u{0710}'), JoiningType::Alaph);
        assert_eq!(joining_type('\u{072A}'), JoiningType::DalathRish);
        assert_eq!(joining_type('a'), JoiningType::U);
    }

    #[test]
    fn scripts() {
        assert_eq!('a'.script(), script::LATIN);
        assert_eq!('\u{0628}'.script(), script::ARABIC);
        assert_eq!(' '.script(), script::COMMON);
    }
}
