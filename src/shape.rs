use crate::buffer::{glyph_flag, Buffer, BufferScratchFlags, GlyphPropsFlags};
use crate::plan::ShapePlan;
use crate::unicode::NON_SPACING_MARK;
use crate::{aat, Face, Feature, GlyphBuffer, UnicodeBuffer};

/// Shapes the buffer content using a prepared plan.
///
/// The plan's direction wins over the buffer's. Consumes the buffer; run
/// [`GlyphBuffer::clear`] to get the `UnicodeBuffer` back without
/// allocating a new one.
pub fn shape_with_plan(face: &Face, plan: &ShapePlan, buffer: UnicodeBuffer) -> GlyphBuffer {
    let mut buffer = buffer.0;
    buffer.guess_segment_properties();

    if buffer.direction != plan.direction {
        log::debug!(
            "buffer direction {:?} replaced by the plan's {:?}",
            buffer.direction,
            plan.direction
        );
        buffer.direction = plan.direction;
    }

    if buffer.len > 0 {
        shape_internal(&mut ShapeContext { plan, face, buffer: &mut buffer });
    }

    GlyphBuffer(buffer)
}

/// Shapes the buffer content using provided font and features.
///
/// Builds a one-off [`ShapePlan`] from the buffer's segment properties.
pub fn shape(face: &Face, features: &[Feature], mut buffer: UnicodeBuffer) -> GlyphBuffer {
    buffer.guess_segment_properties();
    let plan = ShapePlan::new(face, buffer.0.direction, buffer.0.script, features);
    shape_with_plan(face, &plan, buffer)
}

struct ShapeContext<'a> {
    plan: &'a ShapePlan,
    face: &'a Face,
    buffer: &'a mut Buffer,
}

// Pull it all together!
fn shape_internal(ctx: &mut ShapeContext) {
    ctx.buffer.enter();

    ctx.buffer.set_unicode_props();
    ctx.plan.setup_masks(ctx.buffer);

    substitute(ctx);
    position(ctx);

    propagate_flags(ctx.buffer);

    if !ctx.buffer.successful {
        log::debug!("buffer ran out of room while shaping");
    }

    ctx.buffer.leave();
}

fn substitute(ctx: &mut ShapeContext) {
    map_glyphs(ctx.face, ctx.buffer);
    synthesize_glyph_classes(ctx.buffer);

    aat::substitute(ctx.plan, ctx.face, ctx.buffer);

    if ctx.plan.remove_deleted_glyphs {
        aat::remove_deleted_glyphs(ctx.buffer);
    }
}

fn position(ctx: &mut ShapeContext) {
    ctx.buffer.clear_positions();
    position_default(ctx);

    zero_width_default_ignorables(ctx.buffer);
    aat::zero_width_deleted_glyphs(ctx.buffer);

    aat::position(ctx.plan, ctx.face, ctx.buffer);
    aat::propagate_attachment_offsets(ctx.buffer);

    if ctx.buffer.direction.is_backward() {
        ctx.buffer.reverse();
    }
}

fn map_glyphs(face: &Face, buffer: &mut Buffer) {
    for info in buffer.info_slice_mut() {
        info.glyph_id = face.glyph_index(info.codepoint).map_or(0, |g| u32::from(g.0));
    }
}

fn synthesize_glyph_classes(buffer: &mut Buffer) {
    for info in buffer.info_slice_mut() {
        // Default-ignorables are never marks. Mongolian variation
        // selectors rely on this.
        let class = if info.general_category() == NON_SPACING_MARK
            && !info.is_default_ignorable()
        {
            GlyphPropsFlags::MARK
        } else {
            GlyphPropsFlags::BASE_GLYPH
        };

        info.glyph_props = class.bits();
    }
}

fn position_default(ctx: &mut ShapeContext) {
    let len = ctx.buffer.len;
    let horizontal = ctx.buffer.direction.is_horizontal();
    for (info, pos) in ctx.buffer.info[..len].iter().zip(&mut ctx.buffer.pos[..len]) {
        if info.is_deleted() {
            continue;
        }

        if horizontal {
            pos.x_advance = ctx.face.glyph_h_advance(info.as_glyph());
        } else {
            pos.y_advance = ctx.face.glyph_v_advance(info.as_glyph());
        }
    }
}

fn zero_width_default_ignorables(buffer: &mut Buffer) {
    if !buffer.scratch_flags.contains(BufferScratchFlags::HAS_DEFAULT_IGNORABLES) {
        return;
    }

    let len = buffer.len;
    for (info, pos) in buffer.info[..len].iter().zip(&mut buffer.pos[..len]) {
        if info.is_default_ignorable() {
            pos.x_advance = 0;
            pos.y_advance = 0;
            pos.x_offset = 0;
            pos.y_offset = 0;
        }
    }
}

fn propagate_flags(buffer: &mut Buffer) {
    // Make cluster-level glyph flags the same on all glyphs of a cluster.
    if !buffer.scratch_flags.contains(BufferScratchFlags::HAS_GLYPH_FLAGS) {
        return;
    }

    let len = buffer.len;
    let mut start = 0;
    while start < len {
        let cluster = buffer.info[start].cluster;
        let end = buffer.info[start..len]
            .iter()
            .position(|info| info.cluster != cluster)
            .map_or(len, |n| start + n);

        let mut mask = 0;
        for info in &buffer.info[start..end] {
            mask |= info.mask & glyph_flag::DEFINED;
        }

        if mask & glyph_flag::UNSAFE_TO_BREAK != 0 {
            mask |= glyph_flag::UNSAFE_TO_CONCAT;
        }

        if mask != 0 {
            for info in &mut buffer.info[start..end] {
                info.mask |= mask;
            }
        }

        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Tables;
    use crate::Direction;
    use alloc::vec;
    use alloc::vec::Vec;

    fn face() -> Face {
        let mut tables = Tables::default();
        tables.cmap.insert('a', ttf_parser::GlyphId(1));
        tables.cmap.insert('b', ttf_parser::GlyphId(2));
        tables.metrics.advances = vec![0, 500, 600];
        Face::new(1000, 3, tables)
    }

    #[test]
    fn maps_and_advances() {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str("abz");
        let glyphs = shape(&face(), &[], buffer);
        let ids: Vec<u32> = glyphs.glyph_infos().iter().map(|i| i.glyph_id).collect();
        let advances: Vec<i32> = glyphs.glyph_positions().iter().map(|p| p.x_advance).collect();
        assert_eq!(ids, vec![1, 2, 0]);
        assert_eq!(advances, vec![500, 600, 0]);
    }

    #[test]
    fn backward_text_is_reversed() {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str("ab");
        buffer.set_direction(Direction::RightToLeft);
        let face = face();
        let plan = ShapePlan::new(&face, Direction::RightToLeft, None, &[]);
        let glyphs = shape_with_plan(&face, &plan, buffer);
        let clusters: Vec<u32> = glyphs.glyph_infos().iter().map(|i| i.cluster).collect();
        assert_eq!(clusters, vec![1, 0]);
    }

    #[test]
    fn vertical_text_advances_down() {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str("a");
        let face = face();
        let plan = ShapePlan::new(&face, Direction::TopToBottom, None, &[]);
        let glyphs = shape_with_plan(&face, &plan, buffer);
        assert_eq!(glyphs.glyph_positions()[0].x_advance, 0);
        assert_eq!(glyphs.glyph_positions()[0].y_advance, -1000);
    }

    #[test]
    fn cluster_flags_are_shared() {
        let mut buffer = Buffer::new();
        buffer.add(0x61, 0);
        buffer.add(0x62, 0);
        buffer.add(0x63, 1);
        buffer.enter();
        buffer.info[1].mask |= glyph_flag::UNSAFE_TO_BREAK;
        buffer.scratch_flags |= BufferScratchFlags::HAS_GLYPH_FLAGS;
        propagate_flags(&mut buffer);
        assert!(buffer.info[0].unsafe_to_break());
        assert!(buffer.info[0].unsafe_to_concat());
        assert!(!buffer.info[2].unsafe_to_break());
    }
}
