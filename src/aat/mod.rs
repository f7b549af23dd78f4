/*!
Apple Advanced Typography layout: `morx` substitution, `kerx`/`kern`
positioning and the glyph fixups around them.
*/

pub mod apply_context;
pub mod cache;
pub mod driver;
pub mod extended_kerning;
pub mod kerning;
mod map;
pub mod metamorphosis;

pub use map::*;

use smallvec::SmallVec;

use crate::buffer::{Buffer, BufferScratchFlags, GlyphPosition};
use crate::plan::ShapePlan;
use crate::{Direction, Face};
use apply_context::ApplyContext;

/// How a glyph position is attached to another one.
pub(crate) mod attach_type {
    pub const MARK: u8 = 1;
    pub const CURSIVE: u8 = 2;
}

/// Runs every `morx` chain over the buffer.
///
/// Deleted glyphs are left in place as `DELETED_GLYPH`.
pub fn substitute(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    let mut c = ApplyContext::new(plan, face, buffer);
    metamorphosis::apply(&mut c);
}

/// Applies `kerx`, or `kern` when the face has no `kerx`.
pub fn position(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    for pos in buffer.pos_slice_mut() {
        pos.set_attach_chain(0);
        pos.set_attach_type(0);
    }

    let mut c = ApplyContext::new(plan, face, buffer);
    if face.tables.kerx.is_some() {
        extended_kerning::apply(&mut c);
    } else if face.tables.kern.is_some() {
        kerning::apply(&mut c);
    }
}

pub fn zero_width_deleted_glyphs(buffer: &mut Buffer) {
    for i in 0..buffer.len {
        if buffer.info[i].is_deleted() {
            buffer.pos[i] = GlyphPosition::default();
        }
    }
}

pub fn remove_deleted_glyphs(buffer: &mut Buffer) {
    if !buffer.scratch_flags.contains(BufferScratchFlags::HAS_DELETED_GLYPHS) {
        return;
    }

    buffer.delete_glyphs_inplace(|info| info.is_deleted());
}

/// Folds the offsets of attachment targets into the glyphs attached to them.
pub fn propagate_attachment_offsets(buffer: &mut Buffer) {
    if !buffer.scratch_flags.contains(BufferScratchFlags::HAS_GPOS_ATTACHMENT) {
        return;
    }

    let len = buffer.len;
    let direction = buffer.direction;
    for i in 0..len {
        propagate_chain(&mut buffer.pos, len, i, direction);
    }
}

fn propagate_chain(pos: &mut [GlyphPosition], len: usize, start: usize, direction: Direction) {
    // Walk the chain first, then resolve it from its root. Every visited link
    // is cut, so a cycle ends the walk.
    let mut links: SmallVec<[(usize, usize, u8); 8]> = SmallVec::new();
    let mut i = start;
    loop {
        let chain = pos[i].attach_chain();
        if chain == 0 {
            break;
        }

        pos[i].set_attach_chain(0);

        let j = i as isize + isize::from(chain);
        if j < 0 || j as usize >= len {
            break;
        }

        let j = j as usize;
        links.push((i, j, pos[i].attach_type()));
        i = j;
    }

    for &(i, j, kind) in links.iter().rev() {
        resolve_link(pos, i, j, kind, direction);
    }
}

fn resolve_link(pos: &mut [GlyphPosition], i: usize, j: usize, kind: u8, direction: Direction) {
    match kind {
        attach_type::MARK => {
            pos[i].x_offset += pos[j].x_offset;
            pos[i].y_offset += pos[j].y_offset;

            let (mut dx, mut dy) = (0, 0);
            if j < i {
                let range = if direction.is_forward() { j..i } else { j + 1..i + 1 };
                for k in range {
                    dx += pos[k].x_advance;
                    dy += pos[k].y_advance;
                }

                if direction.is_forward() {
                    dx = -dx;
                    dy = -dy;
                }
            } else {
                let range = if direction.is_forward() { i..j } else { i + 1..j + 1 };
                for k in range {
                    dx += pos[k].x_advance;
                    dy += pos[k].y_advance;
                }

                if direction.is_backward() {
                    dx = -dx;
                    dy = -dy;
                }
            }

            pos[i].x_offset += dx;
            pos[i].y_offset += dy;
        }
        attach_type::CURSIVE => {
            if direction.is_horizontal() {
                pos[i].y_offset += pos[j].y_offset;
            } else {
                pos[i].x_offset += pos[j].x_offset;
            }
        }
        _ => {}
    }
}
