pub mod arabic;

use crate::buffer::Buffer;
use crate::plan::{ShapePlan, ShapePlanner};
use crate::Script;

pub use arabic::ARABIC_SHAPER;

/// Script-specific hooks run around the AAT tables.
pub struct ComplexShaper {
    /// Allocates the script's feature masks.
    pub collect_features: Option<fn(&mut ShapePlanner)>,
    /// Sets per-glyph masks before substitution.
    pub setup_masks: Option<fn(&ShapePlan, &mut Buffer)>,
}

pub static DEFAULT_SHAPER: ComplexShaper = ComplexShaper {
    collect_features: None,
    setup_masks: None,
};

impl core::fmt::Debug for ComplexShaper {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ComplexShaper")
            .field("collect_features", &self.collect_features.is_some())
            .field("setup_masks", &self.setup_masks.is_some())
            .finish()
    }
}

pub fn complex_categorize(script: Script) -> &'static ComplexShaper {
    if script.has_joining_behavior() {
        &ARABIC_SHAPER
    } else {
        &DEFAULT_SHAPER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script;

    #[test]
    fn joining_scripts_get_arabic_shaper() {
        for s in [script::ARABIC, script::SYRIAC, script::MONGOLIAN, script::NKO] {
            assert!(core::ptr::eq(complex_categorize(s), &ARABIC_SHAPER));
        }

        for s in [script::LATIN, script::HEBREW, script::COMMON] {
            assert!(core::ptr::eq(complex_categorize(s), &DEFAULT_SHAPER));
        }
    }
}
