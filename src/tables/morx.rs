// https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6morx.html

use alloc::vec::Vec;

use ttf_parser::GlyphId;

use crate::tables::aat::{ExtendedStateTable, Lookup};
use crate::Mask;

/// An extended glyph metamorphosis table.
#[derive(Clone, Debug, Default)]
pub struct Table {
    pub chains: Vec<Chain>,
}

/// A chain of subtables sharing one set of feature flags.
#[derive(Clone, Debug, Default)]
pub struct Chain {
    pub default_flags: Mask,
    pub features: Vec<Feature>,
    pub subtables: Vec<Subtable>,
}

/// A feature entry of a chain.
#[derive(Clone, Copy, Debug)]
pub struct Feature {
    pub kind: u16,
    pub setting: u16,
    pub enable_flags: Mask,
    pub disable_flags: Mask,
}

/// The coverage byte of a subtable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Coverage(pub u8);

#[rustfmt::skip]
impl Coverage {
    /// If true, this subtable will process glyphs in logical order
    /// (or reverse logical order if [`is_backwards`](Self::is_backwards) is also true).
    #[inline] pub fn is_logical(self) -> bool { self.0 & 0x10 != 0 }
    /// If true, this subtable will be applied to both horizontal and vertical text
    /// ([`is_vertical`](Self::is_vertical) should be ignored).
    #[inline] pub fn is_all_directions(self) -> bool { self.0 & 0x20 != 0 }
    /// If true, this subtable will process glyphs in descending order.
    #[inline] pub fn is_backwards(self) -> bool { self.0 & 0x40 != 0 }
    /// If true, this subtable will only be applied to vertical text.
    #[inline] pub fn is_vertical(self) -> bool { self.0 & 0x80 != 0 }
}

/// A metamorphosis subtable.
#[derive(Clone, Debug)]
pub struct Subtable {
    pub kind: SubtableKind,
    pub coverage: Coverage,
    pub feature_flags: Mask,
}

/// A subtable kind.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub enum SubtableKind {
    Rearrangement(ExtendedStateTable<()>),
    Contextual(ContextualSubtable),
    Ligature(LigatureSubtable),
    NonContextual(Lookup),
    Insertion(InsertionSubtable),
}

/// Per-entry data of a contextual subtable.
///
/// `0xFFFF` stands for "no substitution".
#[derive(Clone, Copy, Debug, Default)]
pub struct ContextualEntryData {
    pub mark_index: u16,
    pub current_index: u16,
}

#[derive(Clone, Debug)]
pub struct ContextualSubtable {
    pub state: ExtendedStateTable<ContextualEntryData>,
    pub lookups: Vec<Lookup>,
}

impl ContextualSubtable {
    pub fn lookup(&self, index: u16) -> Option<&Lookup> {
        self.lookups.get(usize::from(index))
    }
}

/// The state table of a ligature subtable carries the index of the first
/// ligature action as entry data.
#[derive(Clone, Debug)]
pub struct LigatureSubtable {
    pub state: ExtendedStateTable<u16>,
    pub ligature_actions: Vec<u32>,
    pub components: Vec<u16>,
    pub ligatures: Vec<GlyphId>,
}

/// Per-entry data of an insertion subtable.
///
/// `0xFFFF` stands for "nothing to insert".
#[derive(Clone, Copy, Debug, Default)]
pub struct InsertionEntryData {
    pub current_insert_index: u16,
    pub marked_insert_index: u16,
}

#[derive(Clone, Debug)]
pub struct InsertionSubtable {
    pub state: ExtendedStateTable<InsertionEntryData>,
    pub glyphs: Vec<GlyphId>,
}
