/*!
A collection of [Apple Advanced Typography](
https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6AATIntro.html)
related types.

The font parsing layer hands tables over already decoded. Values inside them
are untrusted: every accessor returns `Option` and a missing value means
"no effect".
*/

use alloc::vec::Vec;

use ttf_parser::GlyphId;

use crate::int_set::IntSet;

/// Predefined classes.
pub mod class {
    pub const END_OF_TEXT: u16 = 0;
    pub const OUT_OF_BOUNDS: u16 = 1;
    pub const DELETED_GLYPH: u16 = 2;
    pub const END_OF_LINE: u16 = 3;
}

pub const START_OF_TEXT: u16 = 0;

/// A range of glyphs sharing one value.
#[derive(Clone, Copy, Debug)]
pub struct LookupSegment {
    pub first: u16,
    pub last: u16,
    pub value: u16,
}

/// A range of glyphs with a value per glyph.
#[derive(Clone, Debug)]
pub struct LookupSegmentArray {
    pub first: u16,
    pub last: u16,
    pub values: Vec<u16>,
}

/// A glyph with its value.
#[derive(Clone, Copy, Debug)]
pub struct LookupSingle {
    pub glyph: u16,
    pub value: u16,
}

/// An [AAT lookup table](
/// https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6Tables.html).
#[derive(Clone, Debug)]
pub enum Lookup {
    /// Format 0. One value per glyph, indexed by glyph id.
    Simple(Vec<u16>),
    /// Format 2. Segments sorted by glyph.
    SegmentSingle(Vec<LookupSegment>),
    /// Format 4. Segments sorted by glyph.
    SegmentArray(Vec<LookupSegmentArray>),
    /// Format 6. Glyphs sorted by id.
    SingleTable(Vec<LookupSingle>),
    /// Format 8.
    Trimmed { first_glyph: u16, values: Vec<u16> },
}

impl Lookup {
    pub fn value(&self, glyph_id: GlyphId) -> Option<u16> {
        let glyph = glyph_id.0;
        match self {
            Lookup::Simple(values) => values.get(usize::from(glyph)).copied(),
            Lookup::SegmentSingle(segments) => {
                let idx = segments
                    .binary_search_by(|s| segment_order(s.first, s.last, glyph))
                    .ok()?;
                Some(segments[idx].value)
            }
            Lookup::SegmentArray(segments) => {
                let idx = segments
                    .binary_search_by(|s| segment_order(s.first, s.last, glyph))
                    .ok()?;
                let segment = &segments[idx];
                segment.values.get(usize::from(glyph - segment.first)).copied()
            }
            Lookup::SingleTable(singles) => {
                let idx = singles.binary_search_by(|s| s.glyph.cmp(&glyph)).ok()?;
                Some(singles[idx].value)
            }
            Lookup::Trimmed { first_glyph, values } => {
                let idx = glyph.checked_sub(*first_glyph)?;
                values.get(usize::from(idx)).copied()
            }
        }
    }

    /// Adds every glyph that has a value to `set`.
    pub fn collect_glyphs(&self, set: &mut IntSet, number_of_glyphs: u16) {
        self.collect_glyphs_filtered(set, number_of_glyphs, |_| true);
    }

    /// Adds every glyph whose value passes `filter` to `set`.
    ///
    /// Glyph ids at or above `number_of_glyphs` are never added.
    pub fn collect_glyphs_filtered(
        &self,
        set: &mut IntSet,
        number_of_glyphs: u16,
        filter: impl Fn(u16) -> bool,
    ) {
        let limit = u32::from(number_of_glyphs);
        let add_range = |first: u16, last: u16, set: &mut IntSet| {
            let first = u32::from(first);
            let last = u32::from(last).min(limit.saturating_sub(1));
            if first <= last && first < limit {
                set.insert_range(first..=last);
            }
        };

        match self {
            Lookup::Simple(values) => {
                for (glyph, value) in values.iter().enumerate().take(usize::from(number_of_glyphs)) {
                    if filter(*value) {
                        set.insert(glyph as u32);
                    }
                }
            }
            Lookup::SegmentSingle(segments) => {
                for segment in segments {
                    if segment.first == 0xFFFF || !filter(segment.value) {
                        continue;
                    }

                    add_range(segment.first, segment.last, set);
                }
            }
            Lookup::SegmentArray(segments) => {
                for segment in segments {
                    if segment.first == 0xFFFF {
                        continue;
                    }

                    for (glyph, value) in (segment.first..=segment.last).zip(&segment.values) {
                        if u32::from(glyph) < limit && filter(*value) {
                            set.insert(u32::from(glyph));
                        }
                    }
                }
            }
            Lookup::SingleTable(singles) => {
                for single in singles {
                    if single.glyph != 0xFFFF && u32::from(single.glyph) < limit && filter(single.value) {
                        set.insert(u32::from(single.glyph));
                    }
                }
            }
            Lookup::Trimmed { first_glyph, values } => {
                for (i, value) in values.iter().enumerate() {
                    let glyph = u32::from(*first_glyph) + i as u32;
                    if glyph < limit && filter(*value) {
                        set.insert(glyph);
                    }
                }
            }
        }
    }
}

fn segment_order(first: u16, last: u16, glyph: u16) -> core::cmp::Ordering {
    use core::cmp::Ordering;

    if glyph < first {
        Ordering::Greater
    } else if glyph > last {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

/// A state table entry.
#[derive(Clone, Copy, Debug, Default)]
pub struct StateEntry<T> {
    pub new_state: u16,
    pub flags: u16,
    pub extra: T,
}

/// An [extended state table](
/// https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6Tables.html).
///
/// `states[state][class]` is an index into `entries`.
#[derive(Clone, Debug)]
pub struct ExtendedStateTable<T> {
    pub number_of_classes: u16,
    pub classes: Lookup,
    pub states: Vec<Vec<u16>>,
    pub entries: Vec<StateEntry<T>>,
}

impl<T: Copy> ExtendedStateTable<T> {
    /// Returns a glyph class.
    #[inline]
    pub fn class(&self, glyph_id: GlyphId) -> Option<u16> {
        if glyph_id.0 == 0xFFFF {
            return Some(class::DELETED_GLYPH);
        }

        self.classes.value(glyph_id)
    }

    /// Returns a class entry.
    #[inline]
    pub fn entry(&self, state: u16, mut class: u16) -> Option<StateEntry<T>> {
        if class >= self.number_of_classes {
            class = class::OUT_OF_BOUNDS;
        }

        let entry_idx = *self.states.get(usize::from(state))?.get(usize::from(class))?;
        self.entries.get(usize::from(entry_idx)).copied()
    }

    #[inline]
    pub fn number_of_states(&self) -> usize {
        self.states.len()
    }
}
