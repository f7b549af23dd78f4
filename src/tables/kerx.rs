// https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6kerx.html

use alloc::vec::Vec;

use ttf_parser::GlyphId;

use crate::tables::aat::{ExtendedStateTable, Lookup};

/// An extended kerning table.
#[derive(Clone, Debug, Default)]
pub struct Table {
    pub subtables: Vec<Subtable>,
}

/// The coverage byte of a kerning subtable.
///
/// Shared with `kern`, whose Apple variant uses the same bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Coverage(pub u8);

#[rustfmt::skip]
impl Coverage {
    pub const VERTICAL: u8 = 0x80;
    pub const CROSS_STREAM: u8 = 0x40;
    pub const VARIATION: u8 = 0x20;
    pub const BACKWARDS: u8 = 0x10;

    #[inline] pub fn is_horizontal(self) -> bool { self.0 & Self::VERTICAL == 0 }
    #[inline] pub fn has_cross_stream(self) -> bool { self.0 & Self::CROSS_STREAM != 0 }
    #[inline] pub fn is_variable(self) -> bool { self.0 & Self::VARIATION != 0 }
    #[inline] pub fn is_backwards(self) -> bool { self.0 & Self::BACKWARDS != 0 }
}

#[derive(Clone, Debug)]
pub struct Subtable {
    pub coverage: Coverage,
    pub tuple_count: u32,
    pub format: Format,
}

#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub enum Format {
    Format0(PairTable),
    Format1(StateMachineTable),
    Format2(ClassTable),
    Format4(AnchorTable),
    Format6(ClassTable),
}

impl Format {
    /// Whether the subtable kerns glyph pairs rather than running a state machine.
    pub fn is_pair(&self) -> bool {
        matches!(self, Format::Format0(_) | Format::Format2(_) | Format::Format6(_))
    }
}

/// A kerning pair.
#[derive(Clone, Copy, Debug)]
pub struct KerningPair {
    pub left: GlyphId,
    pub right: GlyphId,
    pub value: i16,
}

/// A list of kerning pairs, sorted by `(left, right)`.
#[derive(Clone, Debug, Default)]
pub struct PairTable {
    pub pairs: Vec<KerningPair>,
}

impl PairTable {
    pub fn glyphs_kerning(&self, left: GlyphId, right: GlyphId) -> Option<i16> {
        let needle = (left.0, right.0);
        let idx = self
            .pairs
            .binary_search_by(|pair| (pair.left.0, pair.right.0).cmp(&needle))
            .ok()?;
        Some(self.pairs[idx].value)
    }
}

/// A kerning matrix indexed by a left and a right glyph class.
///
/// A glyph without a class does not kern.
#[derive(Clone, Debug)]
pub struct ClassTable {
    pub left: Lookup,
    pub right: Lookup,
    pub column_count: u16,
    pub values: Vec<i16>,
}

impl ClassTable {
    pub fn glyphs_kerning(&self, left: GlyphId, right: GlyphId) -> Option<i16> {
        let row = usize::from(self.left.value(left)?);
        let column = usize::from(self.right.value(right)?);
        if column >= usize::from(self.column_count) {
            return None;
        }

        self.values.get(row * usize::from(self.column_count) + column).copied()
    }
}

/// A contextual kerning state machine.
///
/// Entry data is an index into `values`, `0xFFFF` for no action.
#[derive(Clone, Debug)]
pub struct StateMachineTable {
    pub state: ExtendedStateTable<u16>,
    pub values: Vec<i16>,
}

impl StateMachineTable {
    #[inline]
    pub fn kerning(&self, index: u16) -> Option<i16> {
        self.values.get(usize::from(index)).copied()
    }
}

/// How the points of an anchor action are encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionType {
    /// Two contour point indices, mark then current.
    ControlPointActions,
    /// Two `ankr` anchor indices, mark then current.
    AnchorPointActions,
    /// Literal coordinates: mark x, mark y, current x, current y.
    ControlPointCoordinateActions,
}

/// An anchor-based attachment state machine.
///
/// Entry data is an action index, `0xFFFF` for no action. Actions index
/// `points` with a stride of two for point actions and four for coordinate
/// actions.
#[derive(Clone, Debug)]
pub struct AnchorTable {
    pub state: ExtendedStateTable<u16>,
    pub action_type: ActionType,
    pub points: Vec<u16>,
}

impl AnchorTable {
    pub(crate) fn point_pair(&self, action_index: u16) -> Option<(u16, u16)> {
        let offset = usize::from(action_index) * 2;
        let data = self.points.get(offset..offset + 2)?;
        Some((data[0], data[1]))
    }

    pub(crate) fn coordinates(&self, action_index: u16) -> Option<[i16; 4]> {
        let offset = usize::from(action_index) * 4;
        let data = self.points.get(offset..offset + 4)?;
        Some([data[0] as i16, data[1] as i16, data[2] as i16, data[3] as i16])
    }
}
