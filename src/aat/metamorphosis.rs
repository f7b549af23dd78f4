//! Extended glyph metamorphosis (`morx`) application.

use ttf_parser::GlyphId;

use super::apply_context::ApplyContext;
use super::cache::SubtableCache;
use super::driver::{drive, Driver, DONT_ADVANCE};
use crate::buffer::{Buffer, BufferScratchFlags, GlyphInfo, DELETED_GLYPH};
use crate::tables::aat::StateEntry;
use crate::tables::morx;

/// Longest window a rearrangement may reorder.
const MAX_CONTEXT_LENGTH: usize = 64;

// Chain::apply in harfbuzz
pub fn apply(c: &mut ApplyContext) -> Option<()> {
    c.buffer.unsafe_to_concat(None, None);

    let face = c.face;
    let plan = c.plan;
    let morx = face.tables.morx.as_ref()?;

    c.setup_buffer_glyph_set();

    for (chain_index, chain) in morx.chains.iter().enumerate() {
        c.range_flags = plan.aat_map.chain_flags.get(chain_index).map(|v| v.as_slice());

        let caches = face.aat_cache.morx.get(chain_index);
        for (subtable_index, subtable) in chain.subtables.iter().enumerate() {
            let cache = match caches.and_then(|v| v.get(subtable_index)) {
                Some(v) => v,
                None => continue,
            };

            if let Some(range_flags) = c.range_flags {
                if range_flags.len() == 1 && subtable.feature_flags & range_flags[0].flags == 0 {
                    log::trace!("morx {}:{} skipped by feature flags", chain_index, subtable_index);
                    continue;
                }
            }

            c.subtable_flags = subtable.feature_flags;

            if !subtable.coverage.is_all_directions()
                && c.buffer.direction.is_vertical() != subtable.coverage.is_vertical()
            {
                log::trace!("morx {}:{} skipped by direction", chain_index, subtable_index);
                continue;
            }

            if !c.buffer_intersects_machine(cache) {
                log::trace!("morx {}:{} cannot match the buffer", chain_index, subtable_index);
                continue;
            }

            // Buffer contents is always in logical direction. Bits 28 and 30
            // of the coverage field select between layout and logical order
            // and between forward and backward processing.
            //
            // Bit 30   Bit 28   Interpretation for Horizontal Text
            //      0        0   The subtable is processed in layout order
            //                   (the same order as the glyphs, which is
            //                   always left-to-right).
            //      1        0   The subtable is processed in reverse layout order
            //                   (the order opposite that of the glyphs, which is
            //                   always right-to-left).
            //      0        1   The subtable is processed in logical order
            //                   (the same order as the characters, which may be
            //                   left-to-right or right-to-left).
            //      1        1   The subtable is processed in reverse logical order
            //                   (the order opposite that of the characters, which
            //                   may be right-to-left or left-to-right).
            let reverse = if subtable.coverage.is_logical() {
                subtable.coverage.is_backwards()
            } else {
                subtable.coverage.is_backwards() != c.buffer.direction.is_backward()
            };

            if reverse != c.buffer_is_reversed {
                log::trace!("morx {}:{} reverses the buffer", chain_index, subtable_index);
                c.reverse_buffer();
            }

            apply_subtable(&subtable.kind, cache, c);

            c.setup_buffer_glyph_set();
        }

        if c.buffer_is_reversed {
            c.reverse_buffer();
        }
    }

    Some(())
}

fn apply_subtable(kind: &morx::SubtableKind, cache: &SubtableCache, ac: &mut ApplyContext) {
    match kind {
        morx::SubtableKind::Rearrangement(ref table) => {
            let mut c = RearrangementCtx { start: 0, end: 0 };
            drive::<()>(table, &mut c, ac, &cache.class_cache);
        }
        morx::SubtableKind::Contextual(ref table) => {
            let mut c = ContextualCtx {
                mark_set: false,
                mark: 0,
                table,
            };
            drive::<morx::ContextualEntryData>(&table.state, &mut c, ac, &cache.class_cache);
        }
        morx::SubtableKind::Ligature(ref table) => {
            let mut c = LigatureCtx {
                table,
                match_length: 0,
                match_positions: [0; LIGATURE_MAX_MATCHES],
            };
            drive::<u16>(&table.state, &mut c, ac, &cache.class_cache);
        }
        morx::SubtableKind::NonContextual(ref lookup) => {
            apply_noncontextual(lookup, ac);
        }
        morx::SubtableKind::Insertion(ref table) => {
            let mut c = InsertionCtx {
                mark: 0,
                glyphs: &table.glyphs,
            };
            drive::<morx::InsertionEntryData>(&table.state, &mut c, ac, &cache.class_cache);
        }
    }
}

fn apply_noncontextual(lookup: &crate::tables::aat::Lookup, ac: &mut ApplyContext) {
    let mut last_range = ac.range_flags.and_then(|rf| {
        if rf.len() > 1 {
            Some(0usize)
        } else {
            // If there's only one range, we already checked the flag.
            None
        }
    });

    for i in 0..ac.buffer.len {
        // This block is shared with the driver. Keep in sync.
        if let (Some(range_flags), Some(last_range)) = (ac.range_flags, last_range.as_mut()) {
            let mut range = *last_range;
            let cluster = ac.buffer.info[i].cluster;
            while range > 0 && cluster < range_flags[range].cluster_first {
                range -= 1;
            }

            while range + 1 < range_flags.len() && cluster > range_flags[range].cluster_last {
                range += 1;
            }

            *last_range = range;

            if range_flags[range].flags & ac.subtable_flags == 0 {
                continue;
            }
        }

        let glyph = ac.buffer.info[i].as_glyph();
        if let Some(replacement) = lookup.value(glyph) {
            set_glyph(ac.buffer, i, replacement);
        }
    }
}

/// Substitutes the glyph at `idx` in place.
fn set_glyph(buffer: &mut Buffer, idx: usize, glyph_id: u16) {
    if u32::from(glyph_id) == DELETED_GLYPH {
        buffer.scratch_flags |= BufferScratchFlags::HAS_DELETED_GLYPHS;
    }

    buffer.info[idx].glyph_id = u32::from(glyph_id);
}

pub(crate) struct RearrangementCtx {
    start: usize,
    end: usize,
}

impl RearrangementCtx {
    pub(crate) const MARK_FIRST: u16 = 0x8000;
    pub(crate) const MARK_LAST: u16 = 0x2000;
    pub(crate) const VERB: u16 = 0x000F;
}

impl Driver<()> for RearrangementCtx {
    fn in_place(&self) -> bool {
        true
    }

    fn is_actionable(&self, entry: &StateEntry<()>, _: &Buffer) -> bool {
        entry.flags & Self::VERB != 0 && self.start < self.end
    }

    fn transition(&mut self, entry: &StateEntry<()>, buffer: &mut Buffer) -> Option<()> {
        let flags = entry.flags;

        if flags & Self::MARK_FIRST != 0 {
            self.start = buffer.idx;
        }

        if flags & Self::MARK_LAST != 0 {
            self.end = (buffer.idx + 1).min(buffer.len);
        }

        if flags & Self::VERB == 0 || self.start >= self.end {
            return Some(());
        }

        // Two nibbles, for start-side and end-side. Values of 0,1,2 mean
        // move that many to the other side. Value of 3 means move 2 and
        // flip them.
        const MAP: [u8; 16] = [
            0x00, // 0  no change
            0x10, // 1  Ax => xA
            0x01, // 2  xD => Dx
            0x11, // 3  AxD => DxA
            0x20, // 4  ABx => xAB
            0x30, // 5  ABx => xBA
            0x02, // 6  xCD => CDx
            0x03, // 7  xCD => DCx
            0x12, // 8  AxCD => CDxA
            0x13, // 9  AxCD => DCxA
            0x21, // 10 ABxD => DxAB
            0x31, // 11 ABxD => DxBA
            0x22, // 12 ABxCD => CDxAB
            0x32, // 13 ABxCD => CDxBA
            0x23, // 14 ABxCD => DCxAB
            0x33, // 15 ABxCD => DCxBA
        ];

        let m = MAP[usize::from(flags & Self::VERB)];
        let l = 2.min(m >> 4) as usize;
        let r = 2.min(m & 0x0F) as usize;
        let reverse_l = m >> 4 == 3;
        let reverse_r = m & 0x0F == 3;

        let (start, end) = (self.start, self.end);
        if end - start < l + r || end - start > MAX_CONTEXT_LENGTH {
            return Some(());
        }

        buffer.merge_clusters(start, (buffer.idx + 1).min(buffer.len));
        buffer.merge_clusters(start, end);

        let mut buf = [GlyphInfo::default(); 4];
        buf[..l].copy_from_slice(&buffer.info[start..start + l]);
        buf[2..2 + r].copy_from_slice(&buffer.info[end - r..end]);

        if l != r {
            buffer.info.copy_within(start + l..end - r, start + r);
        }

        buffer.info[start..start + r].copy_from_slice(&buf[2..2 + r]);
        buffer.info[end - l..end].copy_from_slice(&buf[..l]);

        if reverse_l {
            buffer.info.swap(end - 1, end - 2);
        }

        if reverse_r {
            buffer.info.swap(start, start + 1);
        }

        Some(())
    }
}

pub(crate) struct ContextualCtx<'a> {
    mark_set: bool,
    mark: usize,
    table: &'a morx::ContextualSubtable,
}

impl ContextualCtx<'_> {
    pub(crate) const SET_MARK: u16 = 0x8000;

    fn substitute(&self, index: u16, glyph: GlyphId) -> Option<u16> {
        if index == 0xFFFF {
            return None;
        }

        self.table.lookup(index)?.value(glyph)
    }
}

impl Driver<morx::ContextualEntryData> for ContextualCtx<'_> {
    fn in_place(&self) -> bool {
        true
    }

    fn is_actionable(&self, entry: &StateEntry<morx::ContextualEntryData>, buffer: &Buffer) -> bool {
        if buffer.idx == buffer.len && !self.mark_set {
            return false;
        }

        entry.extra.mark_index != 0xFFFF || entry.extra.current_index != 0xFFFF
    }

    fn transition(
        &mut self,
        entry: &StateEntry<morx::ContextualEntryData>,
        buffer: &mut Buffer,
    ) -> Option<()> {
        // CoreText applies neither mark nor current substitution at
        // end-of-text if the mark was never set.
        if buffer.idx == buffer.len && !self.mark_set {
            return Some(());
        }

        if self.mark < buffer.len {
            let mark_glyph = buffer.info[self.mark].as_glyph();
            if let Some(replacement) = self.substitute(entry.extra.mark_index, mark_glyph) {
                buffer.unsafe_to_break(Some(self.mark), Some((buffer.idx + 1).min(buffer.len)));
                set_glyph(buffer, self.mark, replacement);
            }
        }

        if buffer.len != 0 {
            let idx = buffer.idx.min(buffer.len - 1);
            let glyph = buffer.info[idx].as_glyph();
            if let Some(replacement) = self.substitute(entry.extra.current_index, glyph) {
                set_glyph(buffer, idx, replacement);
            }
        }

        if entry.flags & Self::SET_MARK != 0 {
            self.mark_set = true;
            self.mark = buffer.idx;
        }

        Some(())
    }
}

pub(crate) struct InsertionCtx<'a> {
    mark: usize,
    glyphs: &'a [GlyphId],
}

impl InsertionCtx<'_> {
    pub(crate) const SET_MARK: u16 = 0x8000;
    const CURRENT_INSERT_BEFORE: u16 = 0x0800;
    const MARKED_INSERT_BEFORE: u16 = 0x0400;
    const CURRENT_INSERT_COUNT: u16 = 0x03E0;
    const MARKED_INSERT_COUNT: u16 = 0x001F;

    pub(crate) fn has_insertion(entry: &StateEntry<morx::InsertionEntryData>) -> bool {
        entry.flags & (Self::CURRENT_INSERT_COUNT | Self::MARKED_INSERT_COUNT) != 0
            && (entry.extra.current_insert_index != 0xFFFF
                || entry.extra.marked_insert_index != 0xFFFF)
    }

    /// Returns the glyphs of an insertion action, or nothing when the action
    /// points outside the glyph list.
    fn action_glyphs(&self, start: u16, count: u16) -> &[GlyphId] {
        let start = usize::from(start);
        self.glyphs.get(start..start + usize::from(count)).unwrap_or(&[])
    }

    fn insert(&self, buffer: &mut Buffer, glyphs: &[GlyphId], before: bool) {
        if buffer.idx < buffer.len && !before {
            buffer.copy_glyph();
        }

        // KashidaLike insertions are not told apart from split vowels.
        for glyph in glyphs {
            buffer.output_glyph(u32::from(glyph.0));
        }

        if buffer.idx < buffer.len && !before {
            buffer.skip_glyph();
        }
    }
}

impl Driver<morx::InsertionEntryData> for InsertionCtx<'_> {
    fn in_place(&self) -> bool {
        false
    }

    fn is_actionable(&self, entry: &StateEntry<morx::InsertionEntryData>, _: &Buffer) -> bool {
        Self::has_insertion(entry)
    }

    fn transition(
        &mut self,
        entry: &StateEntry<morx::InsertionEntryData>,
        buffer: &mut Buffer,
    ) -> Option<()> {
        let flags = entry.flags;
        let mark_loc = buffer.out_len;

        if entry.extra.marked_insert_index != 0xFFFF {
            let count = flags & Self::MARKED_INSERT_COUNT;
            buffer.max_ops -= i32::from(count);
            if buffer.max_ops <= 0 {
                return Some(());
            }

            let glyphs = self.action_glyphs(entry.extra.marked_insert_index, count);
            let before = flags & Self::MARKED_INSERT_BEFORE != 0;

            let end = buffer.out_len;
            buffer.move_to(self.mark);
            self.insert(buffer, glyphs, before);
            buffer.move_to(end + glyphs.len());

            buffer.unsafe_to_break_from_outbuffer(
                Some(self.mark),
                Some((buffer.idx + 1).min(buffer.len)),
            );
        }

        if flags & Self::SET_MARK != 0 {
            self.mark = mark_loc;
        }

        if entry.extra.current_insert_index != 0xFFFF {
            let count = (flags & Self::CURRENT_INSERT_COUNT) >> 5;
            buffer.max_ops -= i32::from(count);
            if buffer.max_ops < 0 {
                return Some(());
            }

            let glyphs = self.action_glyphs(entry.extra.current_insert_index, count);
            let before = flags & Self::CURRENT_INSERT_BEFORE != 0;

            let end = buffer.out_len;
            self.insert(buffer, glyphs, before);

            // Without DontAdvance the inserted glyphs are skipped over. With
            // it, they become the next glyphs the state machine sees.
            //
            // https://github.com/harfbuzz/harfbuzz/issues/1224#issuecomment-427691417
            buffer.move_to(if flags & DONT_ADVANCE != 0 {
                end
            } else {
                end + glyphs.len()
            });
        }

        Some(())
    }
}

const LIGATURE_MAX_MATCHES: usize = 64;

pub(crate) struct LigatureCtx<'a> {
    table: &'a morx::LigatureSubtable,
    match_length: usize,
    match_positions: [usize; LIGATURE_MAX_MATCHES],
}

impl LigatureCtx<'_> {
    pub(crate) const SET_COMPONENT: u16 = 0x8000;
    pub(crate) const PERFORM_ACTION: u16 = 0x2000;

    const LIG_ACTION_LAST: u32 = 0x80000000;
    const LIG_ACTION_STORE: u32 = 0x40000000;
    const LIG_ACTION_OFFSET: u32 = 0x3FFFFFFF;

    fn position(&self, n: usize) -> usize {
        self.match_positions[n % LIGATURE_MAX_MATCHES]
    }

    /// Runs the ligature action program starting at `action_index`.
    ///
    /// Leaves the cursor wherever the program stopped.
    fn perform_actions(&mut self, mut action_index: u16, buffer: &mut Buffer) {
        let mut cursor = self.match_length;
        let mut ligature_index: u32 = 0;
        loop {
            if cursor == 0 {
                // Stack underflow. Clear the stack.
                self.match_length = 0;
                break;
            }

            cursor -= 1;
            buffer.move_to(self.position(cursor));

            let action = match self.table.ligature_actions.get(usize::from(action_index)) {
                Some(v) => *v,
                None => break,
            };

            let mut uoffset = action & Self::LIG_ACTION_OFFSET;
            if uoffset & 0x20000000 != 0 {
                uoffset |= 0xC0000000; // Sign-extend.
            }

            let offset = uoffset as i32;
            let component_index = i64::from(buffer.cur(0).glyph_id) + i64::from(offset);
            let component = match usize::try_from(component_index)
                .ok()
                .and_then(|i| self.table.components.get(i))
            {
                Some(v) => *v,
                None => break,
            };
            ligature_index = ligature_index.wrapping_add(u32::from(component));

            if action & (Self::LIG_ACTION_STORE | Self::LIG_ACTION_LAST) != 0 {
                let ligature = match usize::try_from(ligature_index)
                    .ok()
                    .and_then(|i| self.table.ligatures.get(i))
                {
                    Some(v) => *v,
                    None => break,
                };

                buffer.replace_glyph(u32::from(ligature.0));

                let ligature_end = self.position(self.match_length - 1) + 1;

                // Now go and delete all subsequent components.
                while self.match_length - 1 > cursor {
                    self.match_length -= 1;
                    buffer.move_to(self.position(self.match_length));
                    buffer.mark_glyph_deleted();
                }

                buffer.move_to(ligature_end);
                buffer.merge_out_clusters(self.position(cursor), buffer.out_len);
            }

            action_index = action_index.wrapping_add(1);

            if action & Self::LIG_ACTION_LAST != 0 {
                break;
            }
        }
    }
}

impl Driver<u16> for LigatureCtx<'_> {
    fn in_place(&self) -> bool {
        false
    }

    fn is_actionable(&self, entry: &StateEntry<u16>, _: &Buffer) -> bool {
        entry.flags & Self::PERFORM_ACTION != 0
    }

    fn transition(&mut self, entry: &StateEntry<u16>, buffer: &mut Buffer) -> Option<()> {
        if entry.flags & Self::SET_COMPONENT != 0 {
            // Never mark same index twice, in case DONT_ADVANCE was used...
            if self.match_length != 0 && self.position(self.match_length - 1) == buffer.out_len {
                self.match_length -= 1;
            }

            self.match_positions[self.match_length % LIGATURE_MAX_MATCHES] = buffer.out_len;
            self.match_length += 1;
        }

        if entry.flags & Self::PERFORM_ACTION != 0 {
            if self.match_length == 0 || buffer.idx >= buffer.len {
                return Some(());
            }

            let end = buffer.out_len;
            self.perform_actions(entry.extra, buffer);
            buffer.move_to(end);
        }

        Some(())
    }
}
