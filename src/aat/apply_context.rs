use super::cache::SubtableCache;
use super::map::RangeFlags;
use crate::buffer::Buffer;
use crate::int_set::IntSet;
use crate::plan::ShapePlan;
use crate::set_digest::SetDigest;
use crate::{Face, Mask};

/// State shared by every subtable applied to one buffer.
pub struct ApplyContext<'a> {
    pub plan: &'a ShapePlan,
    pub face: &'a Face,
    pub buffer: &'a mut Buffer,
    /// Feature ranges of the current chain.
    pub range_flags: Option<&'a [RangeFlags]>,
    /// Feature flags of the current subtable.
    pub subtable_flags: Mask,
    /// Whether the buffer is currently in reverse processing order.
    pub buffer_is_reversed: bool,
    buffer_digest: SetDigest,
    buffer_glyph_set: IntSet,
}

impl<'a> ApplyContext<'a> {
    pub fn new(plan: &'a ShapePlan, face: &'a Face, buffer: &'a mut Buffer) -> Self {
        ApplyContext {
            plan,
            face,
            buffer,
            range_flags: None,
            subtable_flags: 0,
            buffer_is_reversed: false,
            buffer_digest: SetDigest::new(),
            buffer_glyph_set: IntSet::new(),
        }
    }

    /// Collects the glyphs currently in the buffer.
    pub fn setup_buffer_glyph_set(&mut self) {
        self.buffer_glyph_set.clear();
        self.buffer_digest.clear();
        for info in self.buffer.info_slice() {
            self.buffer_glyph_set.insert(info.glyph_id);
            self.buffer_digest.add(info.glyph_id);
        }
    }

    /// Checks that the buffer holds a glyph the subtable can react to.
    ///
    /// The digest answers most negative cases, the exact set settles the rest.
    pub fn buffer_intersects_machine(&self, cache: &SubtableCache) -> bool {
        if !self.buffer_digest.may_intersect(&cache.digest) {
            return false;
        }

        self.buffer_glyph_set.intersects(&cache.glyph_set)
    }

    /// Checks that the buffer holds both sides of a possible kerning pair.
    pub fn buffer_intersects_pairs(&self, cache: &SubtableCache) -> bool {
        self.buffer_intersects_machine(cache) && self.buffer_glyph_set.intersects(&cache.second_set)
    }

    pub fn reverse_buffer(&mut self) {
        self.buffer.reverse();
        self.buffer_is_reversed = !self.buffer_is_reversed;
    }
}
