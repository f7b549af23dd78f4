//! Extended kerning (`kerx`) application.
//!
//! The pair kerning routine and the format 1 driver are shared with the
//! classic `kern` table.

use ttf_parser::GlyphId;

use super::apply_context::ApplyContext;
use super::attach_type;
use super::cache::SubtableCache;
use super::driver::{drive, Driver};
use crate::buffer::{Buffer, BufferScratchFlags};
use crate::tables::aat::StateEntry;
use crate::tables::kerx;
use crate::{Face, Mask};

pub fn apply(c: &mut ApplyContext) -> Option<()> {
    let face = c.face;
    let plan = c.plan;
    let kerx = face.tables.kerx.as_ref()?;

    c.buffer.unsafe_to_concat(None, None);
    c.setup_buffer_glyph_set();

    let mut seen_cross_stream = false;
    for (index, subtable) in kerx.subtables.iter().enumerate() {
        let cache = match face.aat_cache.kerx.get(index) {
            Some(v) => v,
            None => continue,
        };

        let coverage = subtable.coverage;
        if coverage.is_variable() {
            log::trace!("kerx {} is variable, skipped", index);
            continue;
        }

        if c.buffer.direction.is_horizontal() != coverage.is_horizontal() {
            log::trace!("kerx {} skipped by direction", index);
            continue;
        }

        let intersects = if subtable.format.is_pair() {
            c.buffer_intersects_pairs(cache)
        } else {
            c.buffer_intersects_machine(cache)
        };

        if !intersects {
            log::trace!("kerx {} cannot match the buffer", index);
            continue;
        }

        let reverse = c.buffer.direction.is_backward();

        if !seen_cross_stream && coverage.has_cross_stream() {
            seen_cross_stream = true;
            attach_into_chain(c.buffer);
        }

        if reverse != c.buffer_is_reversed {
            c.reverse_buffer();
        }

        match subtable.format {
            kerx::Format::Format0(ref table) => {
                if plan.requested_kerning && !coverage.is_backwards() {
                    apply_simple_kerning(coverage, cache, plan.kern_mask, face, c.buffer, |a, b| {
                        table.glyphs_kerning(a, b)
                    });
                }
            }
            kerx::Format::Format1(ref table) => {
                if plan.requested_kerning || coverage.has_cross_stream() {
                    let mut driver = Driver1::new(table, face, coverage, plan.kern_mask, true);
                    driver.tuple_count = subtable.tuple_count;
                    drive::<u16>(&table.state, &mut driver, c, &cache.class_cache);
                }
            }
            kerx::Format::Format2(ref table) => {
                if plan.requested_kerning && !coverage.is_backwards() {
                    c.buffer.unsafe_to_concat(None, None);
                    apply_simple_kerning(coverage, cache, plan.kern_mask, face, c.buffer, |a, b| {
                        table.glyphs_kerning(a, b)
                    });
                }
            }
            kerx::Format::Format4(ref table) => {
                let mut driver = Driver4 {
                    table,
                    face,
                    mark_set: false,
                    mark: 0,
                };
                drive::<u16>(&table.state, &mut driver, c, &cache.class_cache);
            }
            kerx::Format::Format6(ref table) => {
                if plan.requested_kerning && !coverage.is_backwards() {
                    apply_simple_kerning(coverage, cache, plan.kern_mask, face, c.buffer, |a, b| {
                        table.glyphs_kerning(a, b)
                    });
                }
            }
        }
    }

    if c.buffer_is_reversed {
        c.reverse_buffer();
    }

    Some(())
}

/// Attaches every glyph to its predecessor in logical order.
pub(crate) fn attach_into_chain(buffer: &mut Buffer) {
    let chain = if buffer.direction.is_forward() { -1 } else { 1 };
    for pos in buffer.pos_slice_mut() {
        pos.set_attach_type(attach_type::CURSIVE);
        pos.set_attach_chain(chain);
    }
}

/// Finds the glyph following `i` that pair kerning may look at.
///
/// Marks and visible default-ignorables are skipped. On failure returns the
/// end of the range that was looked at.
fn next_kerning_glyph(buffer: &Buffer, i: usize, kern_mask: Mask) -> Result<usize, usize> {
    for k in i + 1..buffer.len {
        let info = &buffer.info[k];
        if info.is_mark() || info.is_default_ignorable_and_not_hidden() {
            continue;
        }

        if info.mask & kern_mask != 0 {
            return Ok(k);
        }

        return Err(k + 1);
    }

    Err(buffer.len)
}

/// Applies a pair kerning subtable to the buffer.
pub(crate) fn apply_simple_kerning(
    coverage: kerx::Coverage,
    cache: &SubtableCache,
    kern_mask: Mask,
    face: &Face,
    buffer: &mut Buffer,
    kerning: impl Fn(GlyphId, GlyphId) -> Option<i16>,
) {
    let horizontal = buffer.direction.is_horizontal();
    let cross_stream = coverage.has_cross_stream();

    let mut i = 0;
    while i < buffer.len {
        if buffer.info[i].mask & kern_mask == 0 {
            i += 1;
            continue;
        }

        let j = match next_kerning_glyph(buffer, i, kern_mask) {
            Ok(j) => j,
            Err(unsafe_to) => {
                buffer.unsafe_to_concat(Some(i), Some(unsafe_to));
                i += 1;
                continue;
            }
        };

        let left = buffer.info[i].glyph_id;
        let right = buffer.info[j].glyph_id;
        let kern = if cache.glyph_set.contains(left) && cache.second_set.contains(right) {
            kerning(buffer.info[i].as_glyph(), buffer.info[j].as_glyph()).unwrap_or(0)
        } else {
            0
        };

        if kern != 0 {
            let pos = &mut buffer.pos;
            if horizontal {
                let kern = face.em_scale_x(kern);
                if cross_stream {
                    pos[j].y_offset = kern;
                    buffer.scratch_flags |= BufferScratchFlags::HAS_GPOS_ATTACHMENT;
                } else {
                    let kern1 = kern >> 1;
                    let kern2 = kern - kern1;
                    pos[i].x_advance += kern1;
                    pos[j].x_advance += kern2;
                    pos[j].x_offset += kern2;
                }
            } else {
                let kern = face.em_scale_y(kern);
                if cross_stream {
                    pos[j].x_offset = kern;
                    buffer.scratch_flags |= BufferScratchFlags::HAS_GPOS_ATTACHMENT;
                } else {
                    let kern1 = kern >> 1;
                    let kern2 = kern - kern1;
                    pos[i].y_advance += kern1;
                    pos[j].y_advance += kern2;
                    pos[j].y_offset += kern2;
                }
            }

            buffer.unsafe_to_break(Some(i), Some(j + 1));
        }

        i = j;
    }
}

/// The kerning stack machine of `kerx` format 1 and `kern` format 1.
pub(crate) struct Driver1<'a> {
    table: &'a kerx::StateMachineTable,
    face: &'a Face,
    stack: [usize; 8],
    depth: usize,
    tuple_count: u32,
    cross_stream: bool,
    // Only the extended flavor knows the reset flag.
    extended: bool,
    kern_mask: Mask,
}

impl<'a> Driver1<'a> {
    pub(crate) const PUSH: u16 = 0x8000;
    const RESET: u16 = 0x2000;

    pub(crate) fn new(
        table: &'a kerx::StateMachineTable,
        face: &'a Face,
        coverage: kerx::Coverage,
        kern_mask: Mask,
        extended: bool,
    ) -> Self {
        Driver1 {
            table,
            face,
            stack: [0; 8],
            depth: 0,
            tuple_count: 0,
            cross_stream: coverage.has_cross_stream(),
            extended,
            kern_mask,
        }
    }

    fn push(&mut self, idx: usize) {
        if self.depth < self.stack.len() {
            self.stack[self.depth] = idx;
            self.depth += 1;
        } else {
            // Probably not what CoreText does, but better?
            self.depth = 0;
        }
    }

    fn apply_value(&self, buffer: &mut Buffer, idx: usize, v: i32) {
        let mut has_gpos_attachment = false;
        let glyph_mask = buffer.info[idx].mask;
        let pos = &mut buffer.pos[idx];
        let v = i16::try_from(v).unwrap_or(if v < 0 { i16::MIN } else { i16::MAX });

        if buffer.direction.is_horizontal() {
            if self.cross_stream {
                // Undocumented, but used by the 'kern' table example.
                if v == i16::MIN {
                    pos.set_attach_type(0);
                    pos.set_attach_chain(0);
                    pos.y_offset = 0;
                } else if pos.attach_type() != 0 {
                    pos.y_offset += self.face.em_scale_y(v);
                    has_gpos_attachment = true;
                }
            } else if glyph_mask & self.kern_mask != 0 {
                pos.x_advance += self.face.em_scale_x(v);
                pos.x_offset += self.face.em_scale_x(v);
            }
        } else if self.cross_stream {
            // CoreText doesn't do crossStream kerning in vertical. We do.
            if v == i16::MIN {
                pos.set_attach_type(0);
                pos.set_attach_chain(0);
                pos.x_offset = 0;
            } else if pos.attach_type() != 0 {
                pos.x_offset += self.face.em_scale_x(v);
                has_gpos_attachment = true;
            }
        } else if glyph_mask & self.kern_mask != 0 && pos.y_offset == 0 {
            // CoreText does not accumulate vertical kerning across subtables.
            pos.y_advance += self.face.em_scale_y(v);
            pos.y_offset += self.face.em_scale_y(v);
        }

        if has_gpos_attachment {
            buffer.scratch_flags |= BufferScratchFlags::HAS_GPOS_ATTACHMENT;
        }
    }
}

impl Driver<u16> for Driver1<'_> {
    fn in_place(&self) -> bool {
        true
    }

    fn is_actionable(&self, entry: &StateEntry<u16>, _: &Buffer) -> bool {
        entry.extra != 0xFFFF
    }

    fn transition(&mut self, entry: &StateEntry<u16>, buffer: &mut Buffer) -> Option<()> {
        if self.extended && entry.flags & Self::RESET != 0 {
            self.depth = 0;
        }

        if entry.flags & Self::PUSH != 0 {
            self.push(buffer.idx);
        }

        if entry.extra == 0xFFFF || self.depth == 0 {
            return Some(());
        }

        let tuple_count = usize::try_from(self.tuple_count.max(1)).ok()?;
        let mut action_index = usize::from(entry.extra);

        // Every glyph on the stack must have a value, or none is applied.
        let needed = self.depth.checked_mul(tuple_count).and_then(|n| n.checked_add(action_index));
        if needed.map_or(true, |n| n > self.table.values.len()) {
            self.depth = 0;
            return Some(());
        }

        // Each value pops one glyph from the kerning stack and applies to it.
        // The end of the list is marked by an odd value.
        let mut last = false;
        while !last && self.depth != 0 {
            self.depth -= 1;
            let idx = self.stack[self.depth];
            let mut v = i32::from(u16::try_from(action_index).ok().and_then(|i| self.table.kerning(i))?);
            action_index += tuple_count;

            if idx >= buffer.len {
                continue;
            }

            last = v & 1 != 0;
            v &= !1;

            self.apply_value(buffer, idx, v);
        }

        Some(())
    }
}

/// The anchor attachment machine of `kerx` format 4.
pub(crate) struct Driver4<'a> {
    table: &'a kerx::AnchorTable,
    face: &'a Face,
    mark_set: bool,
    mark: usize,
}

impl Driver4<'_> {
    pub(crate) const MARK: u16 = 0x8000;

    /// Returns the offset that puts the current glyph onto the marked one.
    fn offset(&self, action_index: u16, buffer: &Buffer) -> Option<(i32, i32)> {
        let mark_glyph = buffer.info_slice().get(self.mark)?.as_glyph();
        let curr_glyph = buffer.cur(0).as_glyph();

        match self.table.action_type {
            kerx::ActionType::ControlPointActions => {
                let (mark_point, curr_point) = self.table.point_pair(action_index)?;
                let points = self.face.tables.contour_points.as_ref()?;
                let mark = points.point(mark_glyph, mark_point)?;
                let curr = points.point(curr_glyph, curr_point)?;
                Some((
                    self.face.em_scale_x(mark.x) - self.face.em_scale_x(curr.x),
                    self.face.em_scale_y(mark.y) - self.face.em_scale_y(curr.y),
                ))
            }
            kerx::ActionType::AnchorPointActions => {
                let (mark_point, curr_point) = self.table.point_pair(action_index)?;
                let ankr = self.face.tables.ankr.as_ref();
                let mark = ankr.and_then(|t| t.anchor(mark_glyph, mark_point)).unwrap_or_default();
                let curr = ankr.and_then(|t| t.anchor(curr_glyph, curr_point)).unwrap_or_default();
                Some((
                    self.face.em_scale_x(mark.x) - self.face.em_scale_x(curr.x),
                    self.face.em_scale_y(mark.y) - self.face.em_scale_y(curr.y),
                ))
            }
            kerx::ActionType::ControlPointCoordinateActions => {
                let [mark_x, mark_y, curr_x, curr_y] = self.table.coordinates(action_index)?;
                Some((
                    self.face.em_scale_x(mark_x) - self.face.em_scale_x(curr_x),
                    self.face.em_scale_y(mark_y) - self.face.em_scale_y(curr_y),
                ))
            }
        }
    }
}

impl Driver<u16> for Driver4<'_> {
    fn in_place(&self) -> bool {
        true
    }

    fn is_actionable(&self, entry: &StateEntry<u16>, _: &Buffer) -> bool {
        entry.extra != 0xFFFF
    }

    fn transition(&mut self, entry: &StateEntry<u16>, buffer: &mut Buffer) -> Option<()> {
        if self.mark_set && entry.extra != 0xFFFF && buffer.idx < buffer.len {
            let chain = i16::try_from(self.mark as isize - buffer.idx as isize).ok();
            if let (Some((x, y)), Some(chain)) = (self.offset(entry.extra, buffer), chain) {
                let pos = buffer.cur_pos_mut();
                pos.x_offset = x;
                pos.y_offset = y;
                pos.set_attach_type(attach_type::MARK);
                pos.set_attach_chain(chain);
                buffer.scratch_flags |= BufferScratchFlags::HAS_GPOS_ATTACHMENT;
            }
        }

        if entry.flags & Self::MARK != 0 {
            self.mark_set = true;
            self.mark = buffer.idx;
        }

        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aat::cache::ClassCache;
    use crate::common::Direction;
    use crate::plan::ShapePlan;
    use crate::tables::aat::{ExtendedStateTable, Lookup};
    use crate::tables::{ankr, Tables};
    use alloc::vec;
    use alloc::vec::Vec;

    const KERN: Mask = 1 << 4;

    fn buffer(glyphs: &[u32], direction: Direction) -> Buffer {
        let mut buffer = Buffer::new();
        for (i, g) in glyphs.iter().enumerate() {
            buffer.add(0x61, i as u32);
            buffer.info[i].glyph_id = *g;
            buffer.info[i].mask = KERN;
        }
        buffer.direction = direction;
        buffer.enter();
        buffer.clear_positions();
        buffer
    }

    fn pair_cache(first: &[u32], second: &[u32]) -> SubtableCache {
        let mut cache = SubtableCache::default();
        cache.glyph_set.extend(first.iter().copied());
        cache.second_set.extend(second.iter().copied());
        cache
    }

    fn x_advances(buffer: &Buffer) -> Vec<i32> {
        buffer.pos_slice().iter().map(|p| p.x_advance).collect()
    }

    #[test]
    fn pair_kerning_splits_value() {
        let face = Face::empty();
        let mut buffer = buffer(&[1, 2], Direction::LeftToRight);
        let cache = pair_cache(&[1], &[2]);
        apply_simple_kerning(kerx::Coverage(0), &cache, KERN, &face, &mut buffer, |a, b| {
            if (a.0, b.0) == (1, 2) { Some(-51) } else { None }
        });

        assert_eq!(x_advances(&buffer), vec![-26, -25]);
        assert_eq!(buffer.pos[1].x_offset, -25);
        assert!(buffer.info[1].unsafe_to_break());
    }

    #[test]
    fn pair_kerning_skips_marks() {
        let face = Face::empty();
        let mut buffer = buffer(&[1, 3, 2], Direction::LeftToRight);
        buffer.info[1].glyph_props = crate::buffer::GlyphPropsFlags::MARK.bits();
        let cache = pair_cache(&[1], &[2]);
        apply_simple_kerning(kerx::Coverage(0), &cache, KERN, &face, &mut buffer, |_, _| Some(10));
        assert_eq!(x_advances(&buffer), vec![5, 0, 5]);
    }

    #[test]
    fn pair_kerning_skips_default_ignorables() {
        let face = Face::empty();
        let mut buffer = buffer(&[1, 3, 2], Direction::LeftToRight);
        buffer.info[1].set_default_ignorable();
        let cache = pair_cache(&[1], &[2]);
        apply_simple_kerning(kerx::Coverage(0), &cache, KERN, &face, &mut buffer, |_, _| Some(10));
        assert_eq!(x_advances(&buffer), vec![5, 0, 5]);
        assert_eq!(buffer.pos[2].x_offset, 5);
    }

    #[test]
    fn pair_kerning_respects_mask() {
        let face = Face::empty();
        let mut buffer = buffer(&[1, 2], Direction::LeftToRight);
        buffer.info[1].mask = 0;
        let cache = pair_cache(&[1], &[2]);
        apply_simple_kerning(kerx::Coverage(0), &cache, KERN, &face, &mut buffer, |_, _| Some(10));
        assert_eq!(x_advances(&buffer), vec![0, 0]);
    }

    #[test]
    fn cross_stream_pair_kerning_moves_offset() {
        let face = Face::empty();
        let mut buffer = buffer(&[1, 2], Direction::LeftToRight);
        let cache = pair_cache(&[1], &[2]);
        apply_simple_kerning(
            kerx::Coverage(kerx::Coverage::CROSS_STREAM),
            &cache,
            KERN,
            &face,
            &mut buffer,
            |_, _| Some(30),
        );
        assert_eq!(buffer.pos[1].y_offset, 30);
        assert_eq!(x_advances(&buffer), vec![0, 0]);
        assert!(buffer.scratch_flags.contains(BufferScratchFlags::HAS_GPOS_ATTACHMENT));
    }

    /// Glyph 1 pushes itself, glyph 2 pushes itself and pops both.
    fn format1_table(values: Vec<i16>) -> kerx::StateMachineTable {
        kerx::StateMachineTable {
            state: ExtendedStateTable {
                number_of_classes: 6,
                classes: Lookup::Simple(vec![0, 4, 5]),
                states: vec![vec![0, 0, 0, 0, 1, 0], vec![0, 0, 0, 0, 1, 2]],
                entries: vec![
                    StateEntry { new_state: 0, flags: 0, extra: 0xFFFF },
                    StateEntry { new_state: 1, flags: Driver1::PUSH, extra: 0xFFFF },
                    StateEntry { new_state: 0, flags: Driver1::PUSH, extra: 0 },
                ],
            },
            values,
        }
    }

    fn run_format1(table: &kerx::StateMachineTable, face: &Face, buffer: &mut Buffer, coverage: u8) {
        let plan = ShapePlan::default();
        let mut ac = ApplyContext::new(&plan, face, buffer);
        let mut driver = Driver1::new(table, face, kerx::Coverage(coverage), KERN, true);
        drive(&table.state, &mut driver, &mut ac, &ClassCache::new());
    }

    #[test]
    fn format1_pops_values() {
        let face = Face::empty();
        // Popped in reverse: glyph 2 gets 20, glyph 1 gets -40 and ends the list.
        let table = format1_table(vec![20, -39]);
        let mut buffer = buffer(&[1, 2], Direction::LeftToRight);
        run_format1(&table, &face, &mut buffer, 0);
        assert_eq!(x_advances(&buffer), vec![-40, 20]);
        assert_eq!(buffer.pos[1].x_offset, 20);
    }

    #[test]
    fn format1_values_are_scaled() {
        let mut face = Face::empty();
        face.set_scale(2000, 2000);
        let table = format1_table(vec![20, -39]);
        let mut buffer = buffer(&[1, 2], Direction::LeftToRight);
        run_format1(&table, &face, &mut buffer, 0);
        assert_eq!(x_advances(&buffer), vec![-80, 40]);
    }

    #[test]
    fn format1_odd_value_stops_popping() {
        let face = Face::empty();
        let table = format1_table(vec![21, 100]);
        let mut buffer = buffer(&[1, 2], Direction::LeftToRight);
        run_format1(&table, &face, &mut buffer, 0);
        assert_eq!(x_advances(&buffer), vec![0, 20]);
    }

    #[test]
    fn format1_short_value_list_applies_nothing() {
        let face = Face::empty();
        // Two glyphs are on the stack but only one value follows the action.
        let table = format1_table(vec![20]);
        let mut buffer = buffer(&[1, 2], Direction::LeftToRight);
        run_format1(&table, &face, &mut buffer, 0);
        assert_eq!(x_advances(&buffer), vec![0, 0]);
        assert_eq!(buffer.pos[1].x_offset, 0);
    }

    #[test]
    fn format1_missing_value_clears_stack() {
        let face = Face::empty();
        let table = format1_table(vec![]);
        let mut buffer = buffer(&[1, 2], Direction::LeftToRight);
        run_format1(&table, &face, &mut buffer, 0);
        assert_eq!(x_advances(&buffer), vec![0, 0]);
    }

    #[test]
    fn format1_cross_stream_reset() {
        let face = Face::empty();
        let table = format1_table(vec![i16::MIN, 0]);
        let mut buffer = buffer(&[1, 2], Direction::LeftToRight);
        attach_into_chain(&mut buffer);
        buffer.pos[1].y_offset = 7;
        run_format1(&table, &face, &mut buffer, kerx::Coverage::CROSS_STREAM);
        assert_eq!(buffer.pos[1].attach_type(), 0);
        assert_eq!(buffer.pos[1].y_offset, 0);
        assert_eq!(buffer.pos[0].attach_type(), attach_type::CURSIVE);
    }

    #[test]
    fn format4_attaches_to_anchor() {
        let mut tables = Tables::default();
        tables.ankr = Some(ankr::Table {
            lookup: Lookup::Simple(vec![0, 0, 1]),
            anchors: vec![vec![ankr::Anchor { x: 300, y: 400 }], vec![ankr::Anchor { x: 50, y: 20 }]],
        });
        let face = Face::new(1000, 3, tables);

        // Glyph 1 is the mark target, glyph 2 attaches to it.
        let table = kerx::AnchorTable {
            state: ExtendedStateTable {
                number_of_classes: 6,
                classes: Lookup::Simple(vec![0, 4, 5]),
                states: vec![vec![0, 0, 0, 0, 1, 0], vec![0, 0, 0, 0, 1, 2]],
                entries: vec![
                    StateEntry { new_state: 0, flags: 0, extra: 0xFFFF },
                    StateEntry { new_state: 1, flags: Driver4::MARK, extra: 0xFFFF },
                    StateEntry { new_state: 0, flags: 0, extra: 0 },
                ],
            },
            action_type: kerx::ActionType::AnchorPointActions,
            points: vec![0, 0],
        };

        let plan = ShapePlan::default();
        let mut buffer = buffer(&[1, 2], Direction::LeftToRight);
        let mut ac = ApplyContext::new(&plan, &face, &mut buffer);
        let mut driver = Driver4 { table: &table, face: &face, mark_set: false, mark: 0 };
        drive(&table.state, &mut driver, &mut ac, &ClassCache::new());

        assert_eq!(buffer.pos[1].x_offset, 250);
        assert_eq!(buffer.pos[1].y_offset, 380);
        assert_eq!(buffer.pos[1].attach_type(), attach_type::MARK);
        assert_eq!(buffer.pos[1].attach_chain(), -1);
    }

    #[test]
    fn format4_coordinates() {
        let face = Face::empty();
        let table = kerx::AnchorTable {
            state: ExtendedStateTable {
                number_of_classes: 6,
                classes: Lookup::Simple(vec![0, 4, 5]),
                states: vec![vec![0, 0, 0, 0, 1, 0], vec![0, 0, 0, 0, 1, 2]],
                entries: vec![
                    StateEntry { new_state: 0, flags: 0, extra: 0xFFFF },
                    StateEntry { new_state: 1, flags: Driver4::MARK, extra: 0xFFFF },
                    StateEntry { new_state: 0, flags: 0, extra: 1 },
                ],
            },
            action_type: kerx::ActionType::ControlPointCoordinateActions,
            points: vec![0, 0, 0, 0, 10, 20, 3, (-4i16) as u16],
        };

        let plan = ShapePlan::default();
        let mut buffer = buffer(&[1, 2], Direction::LeftToRight);
        let mut ac = ApplyContext::new(&plan, &face, &mut buffer);
        let mut driver = Driver4 { table: &table, face: &face, mark_set: false, mark: 0 };
        drive(&table.state, &mut driver, &mut ac, &ClassCache::new());

        assert_eq!((buffer.pos[1].x_offset, buffer.pos[1].y_offset), (7, 24));
    }
}
