use alloc::vec::Vec;

use crate::aat;
use crate::buffer::{Buffer, GLOBAL_MASK};
use crate::common::Feature;
use crate::complex::arabic::ArabicShapePlan;
use crate::complex::{complex_categorize, ComplexShaper, DEFAULT_SHAPER};
use crate::tables::morx;
use crate::{Direction, Face, Mask, Script, Tag};

const KERNING: Tag = Tag::from_bytes(b"kern");
const VERTICAL_KERNING: Tag = Tag::from_bytes(b"vkrn");

// Bits 0..3 hold glyph flags and the global mask.
const FIRST_FEATURE_BIT: u32 = 4;

/// A feature mask applied to a cluster range only.
#[derive(Clone, Copy, Debug)]
struct RangedMask {
    mask: Mask,
    enable: bool,
    start: u32,
    end: u32,
}

/// Everything decided once per face, direction, script and feature list.
///
/// A plan is immutable while shaping and can be reused for any number of
/// buffers with the same segment properties.
#[derive(Debug)]
pub struct ShapePlan {
    pub(crate) direction: Direction,
    pub(crate) script: Option<Script>,
    pub(crate) shaper: &'static ComplexShaper,
    pub(crate) aat_map: aat::Map,
    pub(crate) kern_mask: Mask,
    pub(crate) requested_kerning: bool,
    pub(crate) arabic: Option<ArabicShapePlan>,
    pub(crate) remove_deleted_glyphs: bool,
    global_mask: Mask,
    feature_masks: Vec<(Tag, Mask)>,
    ranged_masks: Vec<RangedMask>,
}

impl ShapePlan {
    /// Plans shaping of `direction`/`script` text with `face`.
    ///
    /// Features with an AAT counterpart are compiled into the `morx` flags.
    /// `kern`/`vkrn` toggle kerning, globally or over a cluster range.
    pub fn new(
        face: &Face,
        direction: Direction,
        script: Option<Script>,
        user_features: &[Feature],
    ) -> Self {
        let direction = if direction == Direction::Invalid {
            Direction::LeftToRight
        } else {
            direction
        };

        let mut planner = ShapePlanner::new(direction, script);
        planner.add_user_features(user_features);
        planner.compile(face.tables.morx.as_ref())
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn script(&self) -> Option<Script> {
        self.script
    }

    /// Checks that pair kerning is enabled somewhere in the text.
    #[inline]
    pub fn requested_kerning(&self) -> bool {
        self.requested_kerning
    }

    /// Returns the mask allocated to a feature, or zero.
    pub fn feature_mask(&self, tag: Tag) -> Mask {
        self.feature_masks
            .iter()
            .find(|(t, _)| *t == tag)
            .map_or(0, |(_, m)| *m)
    }

    /// Replaces the mask of an allocated feature.
    ///
    /// For callers that manage mask bits themselves. Unknown tags are ignored.
    pub fn set_feature_mask(&mut self, tag: Tag, mask: Mask) {
        let old = match self.feature_masks.iter_mut().find(|(t, _)| *t == tag) {
            Some(entry) => core::mem::replace(&mut entry.1, mask),
            None => return,
        };

        if self.kern_mask == old && old != 0 {
            self.kern_mask = mask;
        }

        if let Some(ref mut arabic) = self.arabic {
            for m in &mut arabic.mask_array {
                if *m == old && old != 0 {
                    *m = mask;
                }
            }
        }

        if self.global_mask & old != 0 {
            self.global_mask = (self.global_mask & !old) | mask;
        }

        for ranged in &mut self.ranged_masks {
            if ranged.mask == old {
                ranged.mask = mask;
            }
        }
    }

    /// Keeps `DELETED_GLYPH` entries in the output, with zero advance,
    /// instead of removing them.
    pub fn set_remove_deleted_glyphs(&mut self, remove: bool) {
        self.remove_deleted_glyphs = remove;
    }

    /// Sets the global mask on every glyph, then applies ranged features.
    pub(crate) fn setup_masks(&self, buffer: &mut Buffer) {
        buffer.reset_masks(self.global_mask);
        for ranged in &self.ranged_masks {
            let value = if ranged.enable { ranged.mask } else { 0 };
            buffer.set_masks(value, ranged.mask, ranged.start, ranged.end);
        }

        if let Some(func) = self.shaper.setup_masks {
            func(self, buffer);
        }
    }
}

impl Default for ShapePlan {
    /// A left-to-right plan with kerning on and no `morx` flags.
    fn default() -> Self {
        ShapePlanner::new(Direction::LeftToRight, None).compile(None)
    }
}

/// Collects feature requests before a [`ShapePlan`] is compiled.
pub struct ShapePlanner {
    pub direction: Direction,
    pub script: Option<Script>,
    pub shaper: &'static ComplexShaper,
    pub aat_map: aat::MapBuilder,
    pub arabic: Option<ArabicShapePlan>,
    kern_tag: Tag,
    next_bit: u32,
    feature_masks: Vec<(Tag, Mask)>,
    kerning_on: bool,
    ranged_masks: Vec<RangedMask>,
}

impl ShapePlanner {
    pub fn new(direction: Direction, script: Option<Script>) -> Self {
        let shaper = match script {
            Some(script) => complex_categorize(script),
            None => &DEFAULT_SHAPER,
        };

        let kern_tag = if direction.is_horizontal() { KERNING } else { VERTICAL_KERNING };

        let mut planner = ShapePlanner {
            direction,
            script,
            shaper,
            aat_map: aat::MapBuilder::new(),
            arabic: None,
            kern_tag,
            next_bit: FIRST_FEATURE_BIT,
            feature_masks: Vec::new(),
            kerning_on: true,
            ranged_masks: Vec::new(),
        };

        planner.allocate_mask(kern_tag);

        if let Some(func) = shaper.collect_features {
            func(&mut planner);
        }

        planner
    }

    /// Returns the mask bit of `tag`, allocating one on first use.
    ///
    /// Returns zero once all mask bits are taken.
    pub fn allocate_mask(&mut self, tag: Tag) -> Mask {
        if let Some((_, mask)) = self.feature_masks.iter().find(|(t, _)| *t == tag) {
            return *mask;
        }

        if self.next_bit >= Mask::BITS {
            log::debug!("no mask bit left for {}", tag);
            return 0;
        }

        let mask = 1 << self.next_bit;
        self.next_bit += 1;
        self.feature_masks.push((tag, mask));
        mask
    }

    fn mask(&self, tag: Tag) -> Option<Mask> {
        self.feature_masks.iter().find(|(t, _)| *t == tag).map(|(_, m)| *m)
    }

    pub fn add_user_features(&mut self, features: &[Feature]) {
        for feature in features {
            self.aat_map.add_ot_feature(feature);

            if feature.tag != self.kern_tag {
                continue;
            }

            if feature.is_global() {
                self.kerning_on = feature.value != 0;
            } else if let Some(mask) = self.mask(feature.tag) {
                self.ranged_masks.push(RangedMask {
                    mask,
                    enable: feature.value != 0,
                    start: feature.start,
                    end: feature.end,
                });
            }
        }
    }

    pub fn compile(self, morx: Option<&morx::Table>) -> ShapePlan {
        let kern_bit = self.mask(self.kern_tag).unwrap_or(0);
        let requested_kerning = self.kerning_on || self.ranged_masks.iter().any(|r| r.enable);
        let kern_mask = if requested_kerning { kern_bit } else { 0 };

        let mut global_mask = GLOBAL_MASK;
        if self.kerning_on {
            global_mask |= kern_mask;
        }

        let ranged_masks = self
            .ranged_masks
            .into_iter()
            .filter(|r| r.mask & kern_mask != 0)
            .collect();

        ShapePlan {
            direction: self.direction,
            script: self.script,
            shaper: self.shaper,
            aat_map: self.aat_map.compile(morx),
            kern_mask,
            requested_kerning,
            arabic: self.arabic,
            remove_deleted_glyphs: true,
            global_mask,
            feature_masks: self.feature_masks,
            ranged_masks,
        }
    }
}
