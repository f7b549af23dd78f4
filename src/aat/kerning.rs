//! Classic kerning (`kern`) application, used when a face has no `kerx`.

use super::apply_context::ApplyContext;
use super::driver::drive;
use super::extended_kerning::{apply_simple_kerning, attach_into_chain, Driver1};
use crate::tables::kern;

pub fn apply(c: &mut ApplyContext) -> Option<()> {
    let face = c.face;
    let plan = c.plan;
    let kern = face.tables.kern.as_ref()?;

    c.buffer.unsafe_to_concat(None, None);
    c.setup_buffer_glyph_set();

    let mut seen_cross_stream = false;
    for (index, subtable) in kern.subtables.iter().enumerate() {
        let cache = match face.aat_cache.kern.get(index) {
            Some(v) => v,
            None => continue,
        };

        let coverage = subtable.coverage;
        if coverage.is_variable() {
            continue;
        }

        if c.buffer.direction.is_horizontal() != coverage.is_horizontal() {
            log::trace!("kern {} skipped by direction", index);
            continue;
        }

        let intersects = if subtable.format.is_pair() {
            c.buffer_intersects_pairs(cache)
        } else {
            c.buffer_intersects_machine(cache)
        };

        if !intersects {
            log::trace!("kern {} cannot match the buffer", index);
            continue;
        }

        if !seen_cross_stream && coverage.has_cross_stream() {
            seen_cross_stream = true;
            attach_into_chain(c.buffer);
        }

        let reverse = c.buffer.direction.is_backward();
        if reverse != c.buffer_is_reversed {
            c.reverse_buffer();
        }

        let pairs_allowed = plan.requested_kerning && !coverage.is_backwards();
        match subtable.format {
            kern::Format::Format0(ref table) => {
                if pairs_allowed {
                    apply_simple_kerning(coverage, cache, plan.kern_mask, face, c.buffer, |a, b| {
                        table.glyphs_kerning(a, b)
                    });
                }
            }
            kern::Format::Format1(ref table) => {
                if plan.requested_kerning || coverage.has_cross_stream() {
                    let mut driver = Driver1::new(table, face, coverage, plan.kern_mask, false);
                    drive::<u16>(&table.state, &mut driver, c, &cache.class_cache);
                }
            }
            kern::Format::Format2(ref table) => {
                if pairs_allowed {
                    c.buffer.unsafe_to_concat(None, None);
                    apply_simple_kerning(coverage, cache, plan.kern_mask, face, c.buffer, |a, b| {
                        table.glyphs_kerning(a, b)
                    });
                }
            }
            kern::Format::Format3(ref table) => {
                if pairs_allowed {
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
