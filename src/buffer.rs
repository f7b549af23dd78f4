use alloc::string::String;
use alloc::vec::Vec;

use bitflags::bitflags;
use smallvec::SmallVec;
use ttf_parser::GlyphId;

use crate::unicode::{self, CharExt, UnicodeProps};
use crate::{script, Direction, Language, Mask, Script};

const CONTEXT_LENGTH: usize = 5;

/// The glyph id a deleted glyph is replaced with until it is swept.
pub const DELETED_GLYPH: u32 = 0xFFFF;

pub mod glyph_flag {
    /// Indicates that if input text is broken at the
    /// beginning of the cluster this glyph is part of,
    /// then both sides need to be re-shaped, as the
    /// result might be different.
    ///
    /// On the flip side, it means that when this
    /// flag is not present, then it is safe to break
    /// the glyph-run at the beginning of this
    /// cluster, and the two sides will represent the
    /// exact same result one would get if breaking
    /// input text at the beginning of this cluster
    /// and shaping the two sides separately.
    pub const UNSAFE_TO_BREAK: u32 = 0x00000001;
    /// Indicates that if input text is changed on one
    /// side of the beginning of the cluster this glyph
    /// is part of, then the shaping results for the
    /// other side might change.
    ///
    /// Note that the absence of this flag will NOT by
    /// itself mean that it IS safe to concat text.
    /// Only two pieces of text both of which clear of
    /// this flag can be concatenated safely.
    pub const UNSAFE_TO_CONCAT: u32 = 0x00000002;
    /// In scripts that use elongation (Arabic,
    /// Mongolian, Syriac, etc.), this flag signifies
    /// that it is safe to insert a U+0640 TATWEEL
    /// character before this cluster for elongation.
    pub const SAFE_TO_INSERT_TATWEEL: u32 = 0x00000004;
    /// All the currently defined flags.
    pub const DEFINED: u32 = 0x00000007; // OR of all defined flags
}

/// The mask bit reserved for features that apply to the whole buffer.
pub(crate) const GLOBAL_MASK: Mask = 1 << 3;

/// Holds the positions of the glyph in both horizontal and vertical directions.
///
/// All positions are relative to the current point.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct GlyphPosition {
    /// How much the line advances after drawing this glyph when setting text in
    /// horizontal direction.
    pub x_advance: i32,
    /// How much the line advances after drawing this glyph when setting text in
    /// vertical direction.
    pub y_advance: i32,
    /// How much the glyph moves on the X-axis before drawing it, this should not
    /// affect how much the line advances.
    pub x_offset: i32,
    /// How much the glyph moves on the Y-axis before drawing it, this should
    /// not affect how much the line advances.
    pub y_offset: i32,
    attach_chain: i16,
    attach_type: u8,
}

impl GlyphPosition {
    #[inline]
    pub(crate) fn attach_chain(&self) -> i16 {
        self.attach_chain
    }

    #[inline]
    pub(crate) fn set_attach_chain(&mut self, n: i16) {
        self.attach_chain = n;
    }

    #[inline]
    pub(crate) fn attach_type(&self) -> u8 {
        self.attach_type
    }

    #[inline]
    pub(crate) fn set_attach_type(&mut self, n: u8) {
        self.attach_type = n;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct GlyphPropsFlags: u16 {
        // The following three match LookupFlags::Ignore* numbers.
        const BASE_GLYPH    = 0x02;
        const LIGATURE      = 0x04;
        const MARK          = 0x08;
        const CLASS_MASK    = Self::BASE_GLYPH.bits() | Self::LIGATURE.bits() | Self::MARK.bits();

        // The following are used internally; not derived from GDEF.
        const SUBSTITUTED   = 0x10;
        const LIGATED       = 0x20;
        const MULTIPLIED    = 0x40;
    }
}

/// A glyph info.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct GlyphInfo {
    /// The Unicode codepoint this glyph was produced from.
    ///
    /// Glyphs inserted by the font inherit the codepoint of the glyph they
    /// were inserted next to.
    pub codepoint: u32,
    /// The glyph id.
    pub glyph_id: u32,
    /// An index to the start of the grapheme cluster in the original string.
    pub cluster: u32,
    pub(crate) mask: Mask,
    pub(crate) unicode_props: u16,
    pub(crate) glyph_props: u16,
    pub(crate) joining_action: u8,
}

impl GlyphInfo {
    /// Indicates that if input text is broken at the beginning of the cluster
    /// this glyph is part of, then both sides need to be re-shaped.
    pub fn unsafe_to_break(&self) -> bool {
        self.mask & glyph_flag::UNSAFE_TO_BREAK != 0
    }

    /// Indicates that if input text is changed on one side of the beginning
    /// of the cluster this glyph is part of, then the other side might change.
    pub fn unsafe_to_concat(&self) -> bool {
        self.mask & glyph_flag::UNSAFE_TO_CONCAT != 0
    }

    /// Indicates that a TATWEEL can be inserted before this cluster.
    pub fn safe_to_insert_tatweel(&self) -> bool {
        self.mask & glyph_flag::SAFE_TO_INSERT_TATWEEL != 0
    }

    #[inline]
    pub(crate) fn as_glyph(&self) -> GlyphId {
        debug_assert!(self.glyph_id <= u32::from(u16::MAX));
        GlyphId(self.glyph_id as u16)
    }

    #[inline]
    pub(crate) fn as_char(&self) -> char {
        char::try_from(self.codepoint).unwrap_or('\u{FFFD}')
    }

    #[inline]
    pub(crate) fn glyph_flags(&self) -> u32 {
        self.mask & glyph_flag::DEFINED
    }

    #[inline]
    pub(crate) fn general_category(&self) -> u8 {
        (self.unicode_props & UnicodeProps::GENERAL_CATEGORY.bits()) as u8
    }

    #[inline]
    pub(crate) fn modified_combining_class(&self) -> u8 {
        (self.unicode_props >> 8) as u8
    }

    #[inline]
    pub(crate) fn is_default_ignorable(&self) -> bool {
        self.unicode_props & UnicodeProps::IGNORABLE.bits() != 0
    }

    #[inline]
    pub(crate) fn is_default_ignorable_and_not_hidden(&self) -> bool {
        let props = UnicodeProps::IGNORABLE.bits() | UnicodeProps::HIDDEN.bits();
        self.unicode_props & props == UnicodeProps::IGNORABLE.bits()
    }

    #[inline]
    pub(crate) fn set_default_ignorable(&mut self) {
        self.unicode_props |= UnicodeProps::IGNORABLE.bits();
    }

    #[inline]
    pub(crate) fn is_mark(&self) -> bool {
        self.glyph_props & GlyphPropsFlags::MARK.bits() != 0
    }

    #[inline]
    pub(crate) fn is_deleted(&self) -> bool {
        self.glyph_id == DELETED_GLYPH
    }
}

/// A cluster level.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BufferClusterLevel {
    #[default]
    MonotoneGraphemes,
    MonotoneCharacters,
    Characters,
}

bitflags! {
    /// Flags for buffers.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct BufferFlags: u32 {
        /// Derive the unsafe-to-concat flag for glyphs.
        const PRODUCE_UNSAFE_TO_CONCAT          = 0x00000040;
        /// Derive the safe-to-insert-tatweel flag for glyphs.
        const PRODUCE_SAFE_TO_INSERT_TATWEEL    = 0x00000080;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct BufferScratchFlags: u32 {
        const HAS_NON_ASCII             = 0x00000001;
        const HAS_DEFAULT_IGNORABLES    = 0x00000002;
        const HAS_GPOS_ATTACHMENT       = 0x00000004;
        const HAS_GLYPH_FLAGS           = 0x00000008;
        const HAS_DELETED_GLYPHS        = 0x00000010;
    }
}

// Operation limits. A shaping call gets `len * factor` of each, never less
// than the minimum, so that malformed tables cannot loop or grow forever.
const MAX_LEN_FACTOR: usize = 64;
const MAX_LEN_MIN: usize = 16384;
// Shaping more than a billion chars? Let us know!
const MAX_LEN_DEFAULT: usize = 0x3FFFFFFF;

const MAX_OPS_FACTOR: i32 = 64;
const MAX_OPS_MIN: i32 = 16384;
const MAX_OPS_DEFAULT: i32 = 0x1FFFFFFF;

/// The engine-side glyph buffer.
///
/// `info[..len]` is the input. Subtables that change the glyph count write
/// into `out_info[..out_len]` while consuming the input from `idx`, and
/// `sync` makes the output the new input.
pub struct Buffer {
    // Information about how the text in the buffer should be treated.
    pub flags: BufferFlags,
    pub cluster_level: BufferClusterLevel,

    // Buffer contents.
    pub direction: Direction,
    pub script: Option<Script>,
    pub language: Option<Language>,

    /// Allocations successful.
    pub successful: bool,
    /// Whether we have an output buffer going on.
    pub(crate) have_output: bool,
    pub(crate) have_positions: bool,

    pub idx: usize,
    pub len: usize,
    pub out_len: usize,

    pub info: Vec<GlyphInfo>,
    pub pos: Vec<GlyphPosition>,
    out_info: Vec<GlyphInfo>,

    /// Text before and after the shaped run, closest character first.
    pub context: [SmallVec<[char; CONTEXT_LENGTH]>; 2],

    pub(crate) scratch_flags: BufferScratchFlags,
    /// Maximum allowed len.
    pub max_len: usize,
    /// Maximum allowed operations.
    pub max_ops: i32,
}

impl Buffer {
    pub fn new() -> Self {
        Buffer {
            flags: BufferFlags::empty(),
            cluster_level: BufferClusterLevel::default(),
            direction: Direction::Invalid,
            script: None,
            language: None,
            successful: true,
            have_output: false,
            have_positions: false,
            idx: 0,
            len: 0,
            out_len: 0,
            info: Vec::new(),
            pos: Vec::new(),
            out_info: Vec::new(),
            context: [SmallVec::new(), SmallVec::new()],
            scratch_flags: BufferScratchFlags::empty(),
            max_len: MAX_LEN_DEFAULT,
            max_ops: MAX_OPS_DEFAULT,
        }
    }

    #[inline]
    pub fn info_slice(&self) -> &[GlyphInfo] {
        &self.info[..self.len]
    }

    #[inline]
    pub fn info_slice_mut(&mut self) -> &mut [GlyphInfo] {
        &mut self.info[..self.len]
    }

    #[inline]
    pub fn pos_slice(&self) -> &[GlyphPosition] {
        &self.pos[..self.len]
    }

    #[inline]
    pub fn pos_slice_mut(&mut self) -> &mut [GlyphPosition] {
        &mut self.pos[..self.len]
    }

    #[inline]
    pub fn cur(&self, i: usize) -> &GlyphInfo {
        &self.info[self.idx + i]
    }

    #[inline]
    pub fn cur_mut(&mut self, i: usize) -> &mut GlyphInfo {
        let idx = self.idx + i;
        &mut self.info[idx]
    }

    #[inline]
    pub fn cur_pos_mut(&mut self) -> &mut GlyphPosition {
        let i = self.idx;
        &mut self.pos[i]
    }

    #[inline]
    pub fn backtrack_len(&self) -> usize {
        if self.have_output {
            self.out_len
        } else {
            self.idx
        }
    }

    pub fn clear(&mut self) {
        self.direction = Direction::Invalid;
        self.script = None;
        self.language = None;

        self.successful = true;
        self.have_output = false;
        self.have_positions = false;

        self.idx = 0;
        self.info.clear();
        self.pos.clear();
        self.out_info.clear();
        self.len = 0;
        self.out_len = 0;

        self.context = [SmallVec::new(), SmallVec::new()];
        self.scratch_flags = BufferScratchFlags::empty();
    }

    pub fn add(&mut self, codepoint: u32, cluster: u32) {
        if !self.ensure(self.len + 1) {
            return;
        }

        self.info[self.len] = GlyphInfo {
            codepoint,
            cluster,
            ..GlyphInfo::default()
        };
        self.len += 1;
    }

    /// Prepares the buffer for a shaping call and sizes its operation limits.
    pub fn enter(&mut self) {
        self.serial_reset();
        self.scratch_flags = BufferScratchFlags::empty();

        self.max_len = self
            .len
            .checked_mul(MAX_LEN_FACTOR)
            .map_or(MAX_LEN_DEFAULT, |n| n.max(MAX_LEN_MIN));

        self.max_ops = i32::try_from(self.len)
            .ok()
            .and_then(|n| n.checked_mul(MAX_OPS_FACTOR))
            .map_or(MAX_OPS_DEFAULT, |n| n.max(MAX_OPS_MIN));
    }

    /// Restores the default limits after a shaping call.
    pub fn leave(&mut self) {
        self.max_len = MAX_LEN_DEFAULT;
        self.max_ops = MAX_OPS_DEFAULT;
    }

    fn serial_reset(&mut self) {
        self.successful = true;
        self.have_output = false;
        self.idx = 0;
        self.out_len = 0;
    }

    pub fn reverse_range(&mut self, start: usize, end: usize) {
        if end - start < 2 {
            return;
        }

        self.info[start..end].reverse();
        self.pos[start..end].reverse();
    }

    pub fn reverse(&mut self) {
        if self.is_empty() {
            return;
        }

        self.reverse_range(0, self.len);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grows the input storage to hold `size` glyphs.
    fn ensure(&mut self, size: usize) -> bool {
        if !self.successful {
            return false;
        }

        if size > self.max_len {
            log::debug!("buffer growth to {} refused, limit is {}", size, self.max_len);
            self.successful = false;
            return false;
        }

        if self.info.len() < size {
            self.info.resize(size, GlyphInfo::default());
            self.pos.resize(size, GlyphPosition::default());
        }

        true
    }

    /// Grows the output storage to hold `size` glyphs.
    fn ensure_out(&mut self, size: usize) -> bool {
        if !self.successful {
            return false;
        }

        if size > self.max_len {
            log::debug!("output growth to {} refused, limit is {}", size, self.max_len);
            self.successful = false;
            return false;
        }

        if self.out_info.len() < size {
            self.out_info.resize(size, GlyphInfo::default());
        }

        true
    }

    fn shift_forward(&mut self, count: usize) -> bool {
        if !self.ensure(self.len + count) {
            return false;
        }

        self.info.copy_within(self.idx..self.len, self.idx + count);
        if self.idx + count > self.len {
            for info in &mut self.info[self.len..self.idx + count] {
                *info = GlyphInfo::default();
            }
        }

        self.len += count;
        self.idx += count;

        true
    }

    pub fn clear_output(&mut self) {
        self.have_output = true;
        self.have_positions = false;

        self.idx = 0;
        self.out_len = 0;
    }

    pub fn clear_positions(&mut self) {
        self.have_output = false;
        self.have_positions = true;

        self.out_len = 0;

        for pos in &mut self.pos[..self.len] {
            *pos = GlyphPosition::default();
        }
    }

    /// Makes the output the new input.
    ///
    /// Unconsumed input glyphs are carried over first. When the buffer ran
    /// out of room during the pass, the output is discarded instead.
    pub fn sync(&mut self) {
        debug_assert!(self.have_output);
        debug_assert!(self.idx <= self.len);

        if self.successful && self.next_glyphs(self.len - self.idx) {
            core::mem::swap(&mut self.info, &mut self.out_info);
            self.len = self.out_len;
            self.pos.resize(self.info.len(), GlyphPosition::default());
        }

        self.have_output = false;
        self.out_len = 0;
        self.idx = 0;
    }

    /// Copies the current glyph to the output and advances.
    pub fn next_glyph(&mut self) {
        if self.have_output {
            if !self.ensure_out(self.out_len + 1) {
                return;
            }

            self.out_info[self.out_len] = self.info[self.idx];
            self.out_len += 1;
        }

        self.idx += 1;
    }

    fn next_glyphs(&mut self, n: usize) -> bool {
        if self.have_output {
            if !self.ensure_out(self.out_len + n) {
                return false;
            }

            self.out_info[self.out_len..self.out_len + n]
                .copy_from_slice(&self.info[self.idx..self.idx + n]);
            self.out_len += n;
        }

        self.idx += n;
        true
    }

    /// Copies the current glyph to the output without advancing.
    pub fn copy_glyph(&mut self) {
        if !self.ensure_out(self.out_len + 1) {
            return;
        }

        self.out_info[self.out_len] = self.info[self.idx];
        self.out_len += 1;
    }

    /// Advances past the current glyph without outputting it.
    pub fn skip_glyph(&mut self) {
        self.idx += 1;
    }

    /// Outputs a new glyph that inherits the properties of the current
    /// glyph (or of the last output glyph at the end of the buffer).
    pub fn output_glyph(&mut self, glyph_id: u32) {
        if self.idx == self.len && self.out_len == 0 {
            return;
        }

        if !self.ensure_out(self.out_len + 1) {
            return;
        }

        let out_len = self.out_len;
        self.out_info[out_len] = if self.idx < self.len {
            self.info[self.idx]
        } else {
            self.out_info[out_len - 1]
        };
        self.out_info[out_len].glyph_id = glyph_id;

        self.out_len += 1;
    }

    /// Outputs the current glyph with a new glyph id and advances.
    pub fn replace_glyph(&mut self, glyph_id: u32) {
        if self.idx >= self.len || !self.ensure_out(self.out_len + 1) {
            return;
        }

        self.out_info[self.out_len] = self.info[self.idx];
        self.out_info[self.out_len].glyph_id = glyph_id;

        self.idx += 1;
        self.out_len += 1;
    }

    /// Replaces the current glyph with the deleted-glyph sentinel and
    /// advances. Deleted glyphs are swept once the whole layer is done.
    pub fn mark_glyph_deleted(&mut self) {
        if self.idx >= self.len {
            return;
        }

        self.cur_mut(0).set_default_ignorable();
        self.replace_glyph(DELETED_GLYPH);
        self.scratch_flags |= BufferScratchFlags::HAS_DELETED_GLYPHS;
    }

    /// Moves the cursor so that exactly `i` glyphs precede it in the output.
    pub fn move_to(&mut self, i: usize) -> bool {
        if !self.have_output {
            debug_assert!(i <= self.len);
            self.idx = i.min(self.len);
            return true;
        }

        if !self.successful {
            return false;
        }

        if i > self.out_len + (self.len - self.idx) {
            return false;
        }

        if self.out_len < i {
            let count = i - self.out_len;
            if !self.ensure_out(i) {
                return false;
            }

            self.out_info[self.out_len..i].copy_from_slice(&self.info[self.idx..self.idx + count]);
            self.idx += count;
            self.out_len += count;
        } else if self.out_len > i {
            // Tricky part: rewinding...
            let count = self.out_len - i;

            // This will blow in our face if memory allocation fails later
            // in this same lookup...
            //
            // We used to shift with extra 32 items.
            // But that would leave empty slots in the buffer in case of allocation
            // failures. See comments in shift_forward(). This can cause O(N^2)
            // behavior more severely than adding 32 empty slots can...
            if self.idx < count && !self.shift_forward(count - self.idx) {
                return false;
            }

            debug_assert!(self.idx >= count);

            self.idx -= count;
            self.out_len -= count;

            let (idx, out_len) = (self.idx, self.out_len);
            self.info[idx..idx + count].copy_from_slice(&self.out_info[out_len..out_len + count]);
        }

        true
    }

    fn set_cluster(info: &mut GlyphInfo, cluster: u32, mask: Mask) {
        if info.cluster != cluster {
            info.mask = (info.mask & !glyph_flag::DEFINED) | (mask & glyph_flag::DEFINED);
        }

        info.cluster = cluster;
    }

    /// Gives `[start, end)` of the input a single cluster value, the minimum
    /// among them, extending the range to whole clusters.
    pub fn merge_clusters(&mut self, start: usize, end: usize) {
        if end - start < 2 {
            return;
        }

        self.merge_clusters_impl(start, end);
    }

    fn merge_clusters_impl(&mut self, mut start: usize, mut end: usize) {
        if self.cluster_level == BufferClusterLevel::Characters {
            self.unsafe_to_break(Some(start), Some(end));
            return;
        }

        let mut cluster = self.info[start].cluster;

        for i in start + 1..end {
            cluster = core::cmp::min(cluster, self.info[i].cluster);
        }

        // Extend end
        if cluster != self.info[end - 1].cluster {
            while end < self.len && self.info[end - 1].cluster == self.info[end].cluster {
                end += 1;
            }
        }

        // Extend start
        if cluster != self.info[start].cluster {
            while self.idx < start && self.info[start - 1].cluster == self.info[start].cluster {
                start -= 1;
            }
        }

        // If we hit the start of buffer, continue in out-buffer.
        if self.idx == start && self.info[start].cluster != cluster {
            let mut i = self.out_len;
            while i != 0 && self.out_info[i - 1].cluster == self.info[start].cluster {
                Self::set_cluster(&mut self.out_info[i - 1], cluster, 0);
                i -= 1;
            }
        }

        for info in &mut self.info[start..end] {
            Self::set_cluster(info, cluster, 0);
        }
    }

    /// Same as `merge_clusters`, but over `[start, end)` of the output.
    pub fn merge_out_clusters(&mut self, mut start: usize, mut end: usize) {
        if self.cluster_level == BufferClusterLevel::Characters {
            return;
        }

        if end - start < 2 {
            return;
        }

        let mut cluster = self.out_info[start].cluster;

        for i in start + 1..end {
            cluster = core::cmp::min(cluster, self.out_info[i].cluster);
        }

        // Extend start
        while start != 0 && self.out_info[start - 1].cluster == self.out_info[start].cluster {
            start -= 1;
        }

        // Extend end
        while end < self.out_len && self.out_info[end - 1].cluster == self.out_info[end].cluster {
            end += 1;
        }

        // If we hit the end of out-buffer, continue in buffer.
        if end == self.out_len {
            let mut i = self.idx;
            while i < self.len && self.info[i].cluster == self.out_info[end - 1].cluster {
                Self::set_cluster(&mut self.info[i], cluster, 0);
                i += 1;
            }
        }

        for info in &mut self.out_info[start..end] {
            Self::set_cluster(info, cluster, 0);
        }
    }

    pub fn unsafe_to_break(&mut self, start: Option<usize>, end: Option<usize>) {
        self.set_glyph_flags(
            glyph_flag::UNSAFE_TO_BREAK | glyph_flag::UNSAFE_TO_CONCAT,
            start,
            end,
            Some(true),
            None,
        );
    }

    pub fn unsafe_to_concat(&mut self, start: Option<usize>, end: Option<usize>) {
        if !self.flags.contains(BufferFlags::PRODUCE_UNSAFE_TO_CONCAT) {
            return;
        }

        self.set_glyph_flags(glyph_flag::UNSAFE_TO_CONCAT, start, end, Some(true), None);
    }

    pub fn unsafe_to_break_from_outbuffer(&mut self, start: Option<usize>, end: Option<usize>) {
        self.set_glyph_flags(
            glyph_flag::UNSAFE_TO_BREAK | glyph_flag::UNSAFE_TO_CONCAT,
            start,
            end,
            Some(true),
            Some(true),
        );
    }

    pub fn unsafe_to_concat_from_outbuffer(&mut self, start: Option<usize>, end: Option<usize>) {
        if !self.flags.contains(BufferFlags::PRODUCE_UNSAFE_TO_CONCAT) {
            return;
        }

        self.set_glyph_flags(glyph_flag::UNSAFE_TO_CONCAT, start, end, Some(false), Some(true));
    }

    pub fn safe_to_insert_tatweel(&mut self, start: Option<usize>, end: Option<usize>) {
        if !self.flags.contains(BufferFlags::PRODUCE_SAFE_TO_INSERT_TATWEEL) {
            self.unsafe_to_break(start, end);
            return;
        }

        self.set_glyph_flags(glyph_flag::SAFE_TO_INSERT_TATWEEL, start, end, Some(true), None);
    }

    fn set_glyph_flags(
        &mut self,
        mask: Mask,
        start: Option<usize>,
        end: Option<usize>,
        interior: Option<bool>,
        from_out_buffer: Option<bool>,
    ) {
        let start = start.unwrap_or(0);
        let end = core::cmp::min(end.unwrap_or(self.len), self.len);
        let interior = interior.unwrap_or(false);
        let from_out_buffer = from_out_buffer.unwrap_or(false);

        if interior && !from_out_buffer && end.saturating_sub(start) < 2 {
            return;
        }

        self.scratch_flags |= BufferScratchFlags::HAS_GLYPH_FLAGS;

        if !from_out_buffer || !self.have_output {
            if start >= end {
                return;
            }

            if !interior {
                for info in &mut self.info[start..end] {
                    info.mask |= mask;
                }
            } else {
                let cluster = Self::find_min_cluster(self.cluster_level, &self.info, start, end, None);
                self.infos_set_glyph_flags(false, start, end, cluster, mask);
            }
        } else {
            if start > self.out_len || self.idx > end {
                return;
            }

            if !interior {
                for info in &mut self.out_info[start..self.out_len] {
                    info.mask |= mask;
                }

                for info in &mut self.info[self.idx..end] {
                    info.mask |= mask;
                }
            } else {
                let mut cluster =
                    Self::find_min_cluster(self.cluster_level, &self.info, self.idx, end, None);
                cluster = Self::find_min_cluster(
                    self.cluster_level,
                    &self.out_info,
                    start,
                    self.out_len,
                    Some(cluster),
                );

                let out_len = self.out_len;
                self.infos_set_glyph_flags(true, start, out_len, cluster, mask);
                let idx = self.idx;
                self.infos_set_glyph_flags(false, idx, end, cluster, mask);
            }
        }
    }

    fn find_min_cluster(
        cluster_level: BufferClusterLevel,
        infos: &[GlyphInfo],
        start: usize,
        end: usize,
        cluster: Option<u32>,
    ) -> u32 {
        let mut cluster = cluster.unwrap_or(u32::MAX);

        if start == end {
            return cluster;
        }

        if cluster_level == BufferClusterLevel::Characters {
            for info in &infos[start..end] {
                cluster = core::cmp::min(cluster, info.cluster);
            }

            return cluster;
        }

        cluster.min(infos[start].cluster.min(infos[end - 1].cluster))
    }

    fn infos_set_glyph_flags(
        &mut self,
        out_info: bool,
        start: usize,
        end: usize,
        cluster: u32,
        mask: Mask,
    ) {
        if start == end {
            return;
        }

        let cluster_level = self.cluster_level;
        let infos = if out_info {
            &mut self.out_info
        } else {
            &mut self.info
        };

        let cluster_first = infos[start].cluster;
        let cluster_last = infos[end - 1].cluster;

        if cluster_level == BufferClusterLevel::Characters
            || (cluster != cluster_first && cluster != cluster_last)
        {
            for info in &mut infos[start..end] {
                if info.cluster != cluster {
                    info.mask |= mask;
                }
            }

            return;
        }

        // Monotone clusters
        if cluster == cluster_first {
            let mut i = end;
            while start != i && infos[i - 1].cluster != cluster_first {
                infos[i - 1].mask |= mask;
                i -= 1;
            }
        } else {
            let mut i = start;
            while i != end && infos[i].cluster != cluster_last {
                infos[i].mask |= mask;
                i += 1;
            }
        }
    }

    /// Removes, in place, every glyph `filter` accepts, handing its cluster
    /// over to a neighbour so no cluster value disappears.
    pub fn delete_glyphs_inplace(&mut self, filter: impl Fn(&GlyphInfo) -> bool) {
        // Merge clusters and delete filtered glyphs.
        // NOTE! We can't use out-buffer as we have positioning data.
        let mut j = 0;

        for i in 0..self.len {
            if filter(&self.info[i]) {
                // Merge clusters.
                // Same logic as delete_glyph(), but for in-place removal.

                let cluster = self.info[i].cluster;
                if i + 1 < self.len && cluster == self.info[i + 1].cluster {
                    // Cluster survives; do nothing.
                    continue;
                }

                if j != 0 {
                    // Merge cluster backward.
                    if cluster < self.info[j - 1].cluster {
                        let mask = self.info[i].mask;
                        let old_cluster = self.info[j - 1].cluster;

                        let mut k = j;
                        while k > 0 && self.info[k - 1].cluster == old_cluster {
                            Self::set_cluster(&mut self.info[k - 1], cluster, mask);
                            k -= 1;
                        }
                    }
                    continue;
                }

                if i + 1 < self.len {
                    // Merge cluster forward.
                    self.merge_clusters(i, i + 2);
                }

                continue;
            }

            if j != i {
                self.info[j] = self.info[i];
                self.pos[j] = self.pos[i];
            }

            j += 1;
        }

        self.len = j;
    }

    /// Guesses the script and direction from the buffer contents, where unset.
    pub fn guess_segment_properties(&mut self) {
        if self.script.is_none() {
            for info in &self.info[..self.len] {
                let s = info.as_char().script();
                if s != script::COMMON && s != script::INHERITED && s != script::UNKNOWN {
                    self.script = Some(s);
                    break;
                }
            }
        }

        // If direction is set to INVALID, guess from script.
        if self.direction == Direction::Invalid {
            if let Some(script) = self.script {
                self.direction = Direction::from_script(script).unwrap_or_default();
            }

            if self.direction == Direction::Invalid {
                self.direction = Direction::LeftToRight;
            }
        }
    }

    /// Fills in the packed Unicode properties of every glyph.
    pub(crate) fn set_unicode_props(&mut self) {
        for i in 0..self.len {
            let c = self.info[i].as_char();
            let props = unicode::props_for(c);

            if u32::from(c) >= 0x80 {
                self.scratch_flags |= BufferScratchFlags::HAS_NON_ASCII;
            }

            if props & UnicodeProps::IGNORABLE.bits() != 0 {
                self.scratch_flags |= BufferScratchFlags::HAS_DEFAULT_IGNORABLES;
            }

            self.info[i].unicode_props = props;
        }
    }

    pub(crate) fn reset_masks(&mut self, mask: Mask) {
        for info in &mut self.info[..self.len] {
            info.mask = mask;
        }
    }

    /// Replaces the `mask` bits with `value` on glyphs whose cluster is in
    /// `cluster_start..cluster_end`.
    pub(crate) fn set_masks(&mut self, mut value: Mask, mask: Mask, cluster_start: u32, cluster_end: u32) {
        if mask == 0 {
            return;
        }

        value &= mask;
        let not_mask = !mask;

        if cluster_start == 0 && cluster_end == u32::MAX {
            for info in &mut self.info[..self.len] {
                info.mask = (info.mask & not_mask) | value;
            }

            return;
        }

        for info in &mut self.info[..self.len] {
            if cluster_start <= info.cluster && info.cluster < cluster_end {
                info.mask = (info.mask & not_mask) | value;
            }
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new()
    }
}

impl core::fmt::Debug for Buffer {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt.debug_struct("Buffer")
            .field("direction", &self.direction)
            .field("language", &self.language)
            .field("script", &self.script)
            .field("len", &self.len)
            .finish()
    }
}

/// A buffer that contains an input string ready for shaping.
pub struct UnicodeBuffer(pub(crate) Buffer);

impl UnicodeBuffer {
    /// Create a new `UnicodeBuffer`.
    #[inline]
    pub fn new() -> UnicodeBuffer {
        UnicodeBuffer(Buffer::new())
    }

    /// Returns the length of the data of the buffer.
    ///
    /// This corresponds to the number of unicode codepoints contained in the
    /// buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len
    }

    /// Returns `true` if the buffer contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pushes a string to a buffer.
    ///
    /// Each character gets its byte offset as cluster.
    pub fn push_str(&mut self, str: &str) {
        for (i, c) in str.char_indices() {
            self.add(c, i as u32);
        }
    }

    /// Appends a character to a buffer with the given cluster value.
    #[inline]
    pub fn add(&mut self, codepoint: char, cluster: u32) {
        self.0.add(u32::from(codepoint), cluster);
    }

    /// Sets the text that precedes the buffer contents.
    ///
    /// Only the last five characters are kept.
    pub fn set_pre_context(&mut self, str: &str) {
        self.0.context[0] = str.chars().rev().take(CONTEXT_LENGTH).collect();
    }

    /// Sets the text that follows the buffer contents.
    ///
    /// Only the first five characters are kept.
    pub fn set_post_context(&mut self, str: &str) {
        self.0.context[1] = str.chars().take(CONTEXT_LENGTH).collect();
    }

    /// Set the text direction of the `Buffer`'s contents.
    #[inline]
    pub fn set_direction(&mut self, direction: Direction) {
        self.0.direction = direction;
    }

    /// Returns the `Buffer`'s text direction.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.0.direction
    }

    /// Set the script from an ISO15924 tag.
    #[inline]
    pub fn set_script(&mut self, script: Script) {
        self.0.script = Some(script);
    }

    /// Get the ISO15924 script tag.
    pub fn script(&self) -> Script {
        self.0.script.unwrap_or(script::UNKNOWN)
    }

    /// Set the buffer language.
    #[inline]
    pub fn set_language(&mut self, lang: Language) {
        self.0.language = Some(lang);
    }

    /// Get the buffer language.
    #[inline]
    pub fn language(&self) -> Option<Language> {
        self.0.language.clone()
    }

    /// Guess the segment properties (direction, language, script) for the
    /// current buffer.
    #[inline]
    pub fn guess_segment_properties(&mut self) {
        self.0.guess_segment_properties();
    }

    /// Set the flags for this buffer.
    #[inline]
    pub fn set_flags(&mut self, flags: BufferFlags) {
        self.0.flags = flags;
    }

    /// Get the flags for this buffer.
    #[inline]
    pub fn flags(&self) -> BufferFlags {
        self.0.flags
    }

    /// Set the cluster level of the buffer.
    #[inline]
    pub fn set_cluster_level(&mut self, cluster_level: BufferClusterLevel) {
        self.0.cluster_level = cluster_level;
    }

    /// Retrieve the cluster level of the buffer.
    #[inline]
    pub fn cluster_level(&self) -> BufferClusterLevel {
        self.0.cluster_level
    }

    /// Clear the contents of the buffer.
    #[inline]
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl Default for UnicodeBuffer {
    fn default() -> UnicodeBuffer {
        UnicodeBuffer::new()
    }
}

impl core::fmt::Debug for UnicodeBuffer {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt.debug_struct("UnicodeBuffer")
            .field("direction", &self.direction())
            .field("language", &self.language())
            .field("script", &self.script())
            .field("cluster_level", &self.cluster_level())
            .finish()
    }
}

bitflags! {
    /// Flags used for serialization with a `BufferSerializer`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SerializeFlags: u8 {
        /// Do not serialize glyph cluster.
        const NO_CLUSTERS = 0b00000001;
        /// Do not serialize glyph position information.
        const NO_POSITIONS = 0b00000010;
        /// Serialize glyph flags.
        const GLYPH_FLAGS = 0b00000100;
        /// Do not serialize glyph advances, glyph offsets will reflect absolute
        /// glyph positions.
        const NO_ADVANCES = 0b00001000;
    }
}

/// A buffer that contains the results of the shaping process.
pub struct GlyphBuffer(pub(crate) Buffer);

impl GlyphBuffer {
    /// Returns the length of the data of the buffer.
    ///
    /// When called before shaping this is the number of unicode codepoints
    /// contained in the buffer. When called after shaping it returns the number
    /// of glyphs stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len
    }

    /// Returns `true` if the buffer contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the glyph infos.
    #[inline]
    pub fn glyph_infos(&self) -> &[GlyphInfo] {
        self.0.info_slice()
    }

    /// Get the glyph positions.
    #[inline]
    pub fn glyph_positions(&self) -> &[GlyphPosition] {
        self.0.pos_slice()
    }

    /// Clears the content of the glyph buffer and returns an empty
    /// `UnicodeBuffer` reusing the existing allocation.
    #[inline]
    pub fn clear(mut self) -> UnicodeBuffer {
        self.0.clear();
        UnicodeBuffer(self.0)
    }

    /// Converts the glyph buffer content into a string.
    ///
    /// Glyphs are separated by `|` and written as
    /// `gid=cluster@x_offset,y_offset+x_advance,y_advance#flags`,
    /// omitting zero offsets, a zero vertical advance and empty flags.
    pub fn serialize(&self, flags: SerializeFlags) -> String {
        self.serialize_impl(flags).unwrap_or_default()
    }

    fn serialize_impl(&self, flags: SerializeFlags) -> Result<String, core::fmt::Error> {
        use core::fmt::Write;

        let mut s = String::with_capacity(64);

        let info = self.glyph_infos();
        let pos = self.glyph_positions();
        let mut x = 0;
        let mut y = 0;
        for (info, pos) in info.iter().zip(pos) {
            write!(&mut s, "{}", info.glyph_id)?;

            if !flags.contains(SerializeFlags::NO_CLUSTERS) {
                write!(&mut s, "={}", info.cluster)?;
            }

            if !flags.contains(SerializeFlags::NO_POSITIONS) {
                if x + pos.x_offset != 0 || y + pos.y_offset != 0 {
                    write!(&mut s, "@{},{}", x + pos.x_offset, y + pos.y_offset)?;
                }

                if !flags.contains(SerializeFlags::NO_ADVANCES) {
                    write!(&mut s, "+{}", pos.x_advance)?;
                    if pos.y_advance != 0 {
                        write!(&mut s, ",{}", pos.y_advance)?;
                    }
                }
            }

            if flags.contains(SerializeFlags::GLYPH_FLAGS) && info.glyph_flags() != 0 {
                write!(&mut s, "#{:X}", info.glyph_flags())?;
            }

            if flags.contains(SerializeFlags::NO_ADVANCES) {
                x += pos.x_advance;
                y += pos.y_advance;
            }

            s.push('|');
        }

        // Remove last `|`.
        if !s.is_empty() {
            s.pop();
        }

        Ok(s)
    }
}

impl core::fmt::Debug for GlyphBuffer {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt.debug_struct("GlyphBuffer")
            .field("glyph_positions", &self.glyph_positions())
            .field("glyph_infos", &self.glyph_infos())
            .finish()
    }
}
