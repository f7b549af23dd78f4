use ttf_parser::GlyphId;

use crate::aat::cache::AatCache;
use crate::tables::Tables;

/// A font face: metrics, decoded layout tables and their accelerators.
///
/// Accelerators are built once here and then only read, so a face can be
/// shared by any number of shaping calls.
pub struct Face {
    units_per_em: u16,
    number_of_glyphs: u16,
    scale: (i32, i32),
    pub(crate) tables: Tables,
    pub(crate) aat_cache: AatCache,
}

impl Face {
    /// Creates a new `Face` from already decoded tables.
    ///
    /// Positions are reported in font units until [`set_scale`](Self::set_scale)
    /// is called.
    pub fn new(units_per_em: u16, number_of_glyphs: u16, tables: Tables) -> Self {
        let units_per_em = units_per_em.max(1);
        let aat_cache = AatCache::new(&tables, number_of_glyphs);
        Face {
            units_per_em,
            number_of_glyphs,
            scale: (i32::from(units_per_em), i32::from(units_per_em)),
            tables,
            aat_cache,
        }
    }

    /// Creates a new `Face` from font data.
    ///
    /// Reads the units per em, the glyph count, the Unicode character maps
    /// and the advances. Layout tables are added with
    /// [`set_tables`](Self::set_tables).
    pub fn from_slice(data: &[u8], face_index: u32) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, face_index).ok()?;
        let number_of_glyphs = face.number_of_glyphs();

        let mut tables = Tables::default();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }

                // Earlier subtables win.
                subtable.codepoints(|c| {
                    if tables.cmap.glyph_index(c).is_some() {
                        return;
                    }

                    if let (Some(c), Some(glyph_id)) = (char::from_u32(c), subtable.glyph_index(c)) {
                        tables.cmap.insert(c, glyph_id);
                    }
                });
            }
        }

        tables.metrics.advances = (0..number_of_glyphs)
            .map(|g| face.glyph_hor_advance(GlyphId(g)).unwrap_or(0))
            .collect();

        if face.tables().vmtx.is_some() {
            tables.metrics.vertical_advances = (0..number_of_glyphs)
                .map(|g| face.glyph_ver_advance(GlyphId(g)).unwrap_or(0))
                .collect();
        }

        log::debug!(
            "loaded a face with {} glyphs and {} units per em",
            number_of_glyphs,
            face.units_per_em()
        );

        Some(Face::new(face.units_per_em(), number_of_glyphs, tables))
    }

    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Face::new(1000, 0, Tables::default())
    }

    /// Replaces the decoded tables and rebuilds their accelerators.
    pub fn set_tables(&mut self, f: impl FnOnce(&mut Tables)) {
        f(&mut self.tables);
        self.aat_cache = AatCache::new(&self.tables, self.number_of_glyphs);
    }

    #[inline]
    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    #[inline]
    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    #[inline]
    pub fn number_of_glyphs(&self) -> u16 {
        self.number_of_glyphs
    }

    /// Sets the output scale, in units per em.
    #[inline]
    pub fn set_scale(&mut self, x: i32, y: i32) {
        self.scale = (x, y);
    }

    #[inline]
    pub(crate) fn em_scale_x(&self, v: i16) -> i32 {
        self.em_scale(v, self.scale.0)
    }

    #[inline]
    pub(crate) fn em_scale_y(&self, v: i16) -> i32 {
        self.em_scale(v, self.scale.1)
    }

    fn em_scale(&self, v: i16, scale: i32) -> i32 {
        let upem = i64::from(self.units_per_em);
        let n = i64::from(v) * i64::from(scale);
        let rounded = if n >= 0 { (n + upem / 2) / upem } else { (n - upem / 2) / upem };
        i32::try_from(rounded).unwrap_or(if n >= 0 { i32::MAX } else { i32::MIN })
    }

    pub(crate) fn glyph_index(&self, c: u32) -> Option<GlyphId> {
        self.tables.cmap.glyph_index(c)
    }

    pub(crate) fn glyph_h_advance(&self, glyph_id: GlyphId) -> i32 {
        let advance = self.tables.metrics.advance(glyph_id);
        self.em_scale_x(i16::try_from(advance).unwrap_or(i16::MAX))
    }

    pub(crate) fn glyph_v_advance(&self, glyph_id: GlyphId) -> i32 {
        let advance = self.tables.metrics.vertical_advance(glyph_id, self.units_per_em);
        // Y grows upwards, vertical pen movement goes down.
        -self.em_scale_y(i16::try_from(advance).unwrap_or(i16::MAX))
    }
}

impl core::fmt::Debug for Face {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Face")
            .field("units_per_em", &self.units_per_em)
            .field("number_of_glyphs", &self.number_of_glyphs)
            .field("scale", &self.scale)
            .finish()
    }
}
