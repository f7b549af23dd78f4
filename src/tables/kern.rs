// https://docs.microsoft.com/en-us/typography/opentype/spec/kern
// https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6kern.html

use alloc::vec::Vec;

use ttf_parser::GlyphId;

use crate::tables::kerx::{ClassTable, Coverage, PairTable, StateMachineTable};

/// A classic kerning table, in either the OpenType or the Apple flavor.
///
/// Coverage is normalized to the Apple bit layout.
#[derive(Clone, Debug, Default)]
pub struct Table {
    pub subtables: Vec<Subtable>,
}

#[derive(Clone, Debug)]
pub struct Subtable {
    pub coverage: Coverage,
    pub format: Format,
}

#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub enum Format {
    Format0(PairTable),
    Format1(StateMachineTable),
    Format2(ClassTable),
    Format3(Format3Table),
}

impl Format {
    /// Whether the subtable kerns glyph pairs rather than running a state machine.
    pub fn is_pair(&self) -> bool {
        matches!(self, Format::Format0(_) | Format::Format2(_) | Format::Format3(_))
    }
}

/// A compact class-based kerning matrix.
#[derive(Clone, Debug, Default)]
pub struct Format3Table {
    pub glyph_count: u16,
    pub kern_values: Vec<i16>,
    pub left_classes: Vec<u8>,
    pub right_classes: Vec<u8>,
    pub right_class_count: u8,
    pub indices: Vec<u8>,
}

impl Format3Table {
    pub fn glyphs_kerning(&self, left: GlyphId, right: GlyphId) -> Option<i16> {
        if left.0 >= self.glyph_count || right.0 >= self.glyph_count {
            return None;
        }

        let left_class = usize::from(*self.left_classes.get(usize::from(left.0))?);
        let right_class = usize::from(*self.right_classes.get(usize::from(right.0))?);
        if right_class >= usize::from(self.right_class_count) {
            return None;
        }

        let idx = left_class * usize::from(self.right_class_count) + right_class;
        let value_idx = usize::from(*self.indices.get(idx)?);
        self.kern_values.get(value_idx).copied()
    }
}
