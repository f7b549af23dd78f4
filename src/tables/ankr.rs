// https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6ankr.html

use alloc::vec::Vec;

use ttf_parser::GlyphId;

use super::aat;

/// An anchor point table.
///
/// `lookup` maps a glyph to an index into `anchors`.
#[derive(Clone, Debug)]
pub struct Table {
    pub lookup: aat::Lookup,
    pub anchors: Vec<Vec<Anchor>>,
}

impl Table {
    pub fn anchor(&self, glyph_id: GlyphId, idx: u16) -> Option<Anchor> {
        let list = self.lookup.value(glyph_id)?;
        self.anchors.get(usize::from(list))?.get(usize::from(idx)).copied()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Anchor {
    pub x: i16,
    pub y: i16,
}

/// Outline points of every glyph, indexed by glyph id.
#[derive(Clone, Debug, Default)]
pub struct ContourPoints {
    pub glyphs: Vec<Vec<Anchor>>,
}

impl ContourPoints {
    pub fn point(&self, glyph_id: GlyphId, idx: u16) -> Option<Anchor> {
        self.glyphs
            .get(usize::from(glyph_id.0))?
            .get(usize::from(idx))
            .copied()
    }
}
