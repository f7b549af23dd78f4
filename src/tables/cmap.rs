use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use ttf_parser::GlyphId;

/// A decoded character to glyph mapping.
#[derive(Clone, Debug, Default)]
pub struct CharacterMap {
    map: BTreeMap<u32, GlyphId>,
}

impl CharacterMap {
    pub fn new() -> Self {
        CharacterMap::default()
    }

    pub fn insert(&mut self, c: char, glyph_id: GlyphId) {
        self.map.insert(u32::from(c), glyph_id);
    }

    pub fn glyph_index(&self, c: u32) -> Option<GlyphId> {
        self.map.get(&c).copied()
    }
}

impl FromIterator<(char, GlyphId)> for CharacterMap {
    fn from_iter<T: IntoIterator<Item = (char, GlyphId)>>(iter: T) -> Self {
        let mut cmap = CharacterMap::new();
        for (c, glyph_id) in iter {
            cmap.insert(c, glyph_id);
        }
        cmap
    }
}

/// Advance widths and heights in font units, indexed by glyph id.
///
/// Glyphs past the end of `advances` use the last entry, like `hmtx` does.
/// Without vertical advances every glyph advances by one em.
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    pub advances: Vec<u16>,
    pub vertical_advances: Vec<u16>,
}

impl Metrics {
    pub fn advance(&self, glyph_id: GlyphId) -> u16 {
        self.advances
            .get(usize::from(glyph_id.0))
            .or_else(|| self.advances.last())
            .copied()
            .unwrap_or(0)
    }

    pub fn vertical_advance(&self, glyph_id: GlyphId, units_per_em: u16) -> u16 {
        self.vertical_advances
            .get(usize::from(glyph_id.0))
            .or_else(|| self.vertical_advances.last())
            .copied()
            .unwrap_or(units_per_em)
    }
}
