use super::apply_context::ApplyContext;
use super::cache::ClassCache;
use crate::buffer::Buffer;
use crate::tables::aat::{class, ExtendedStateTable, StateEntry, START_OF_TEXT};

/// The glyph-advancing flag shared by every AAT state table kind.
pub const DONT_ADVANCE: u16 = 0x4000;

/// What a subtable kind does on each state machine transition.
pub trait Driver<T> {
    /// Whether the subtable only touches existing glyphs, without the
    /// output buffer.
    fn in_place(&self) -> bool;

    fn can_advance(&self, entry: &StateEntry<T>) -> bool {
        entry.flags & DONT_ADVANCE == 0
    }

    /// Whether the transition has an effect besides the state change.
    fn is_actionable(&self, entry: &StateEntry<T>, buffer: &Buffer) -> bool;

    fn transition(&mut self, entry: &StateEntry<T>, buffer: &mut Buffer) -> Option<()>;
}

/// Runs `machine` over the whole buffer.
pub fn drive<T: Copy>(
    machine: &ExtendedStateTable<T>,
    c: &mut dyn Driver<T>,
    ac: &mut ApplyContext,
    class_cache: &ClassCache,
) {
    if !c.in_place() {
        ac.buffer.clear_output();
    }

    let mut state = START_OF_TEXT;
    let mut last_range = ac.range_flags.as_ref().and_then(|rf| {
        if rf.len() > 1 {
            Some(0usize)
        } else {
            // If there's only one range, we already checked the flag.
            None
        }
    });

    // With a silent end-of-text entry in the start state, null transitions
    // out of the start state are always safe to break at.
    let start_state_safe_to_break_eot = match machine.entry(START_OF_TEXT, class::END_OF_TEXT) {
        Some(entry) => !c.is_actionable(&entry, ac.buffer),
        None => false,
    };

    ac.buffer.idx = 0;
    loop {
        // This block is shared with the noncontextual subtable. Keep in sync.
        if let (Some(range_flags), Some(last_range)) = (ac.range_flags, last_range.as_mut()) {
            let mut range = *last_range;
            if ac.buffer.idx < ac.buffer.len {
                let cluster = ac.buffer.cur(0).cluster;
                while range > 0 && cluster < range_flags[range].cluster_first {
                    range -= 1;
                }

                while range + 1 < range_flags.len() && cluster > range_flags[range].cluster_last {
                    range += 1;
                }

                *last_range = range;
            }

            if range_flags[range].flags & ac.subtable_flags == 0 {
                if ac.buffer.idx == ac.buffer.len || !ac.buffer.successful {
                    break;
                }

                state = START_OF_TEXT;
                ac.buffer.next_glyph();
                continue;
            }
        }

        let class = if ac.buffer.idx < ac.buffer.len {
            class_cache.get_class(machine, ac.buffer.cur(0).as_glyph())
        } else {
            class::END_OF_TEXT
        };

        let entry = match machine.entry(state, class) {
            Some(v) => v,
            None => break,
        };

        let next_state = entry.new_state;

        let null_transition = state == START_OF_TEXT
            && next_state == START_OF_TEXT
            && last_range.is_none()
            && start_state_safe_to_break_eot
            && c.can_advance(&entry)
            && !c.is_actionable(&entry, ac.buffer);

        // Conditions under which it's guaranteed safe-to-break before current glyph:
        //
        // 1. There was no action in this transition; and
        //
        // 2. If we break before current glyph, the results will be the same. That
        //    is guaranteed if:
        //
        //    2a. We were already in start-of-text state; or
        //
        //    2b. We are epsilon-transitioning to start-of-text state; or
        //
        //    2c. Starting from start-of-text state seeing current glyph:
        //
        //        2c'. There won't be any actions; and
        //
        //        2c". We would end up in the same state that we were going to end up
        //             in now, including whether epsilon-transitioning.
        //
        //    and
        //
        // 3. If we break before current glyph, there won't be any end-of-text action
        //    after previous glyph.
        //
        // This triples the transitions we need to look up, but is worth returning
        // granular unsafe-to-break results. See eg.:
        //
        //   https://github.com/harfbuzz/harfbuzz/issues/2860
        if !null_transition
            && !is_safe_to_break(machine, &*c, ac.buffer, state, class, &entry)
            && ac.buffer.backtrack_len() > 0
            && ac.buffer.idx < ac.buffer.len
        {
            ac.buffer.unsafe_to_break_from_outbuffer(
                Some(ac.buffer.backtrack_len() - 1),
                Some(ac.buffer.idx + 1),
            );
        }

        c.transition(&entry, ac.buffer);

        state = next_state;

        if ac.buffer.idx >= ac.buffer.len || !ac.buffer.successful {
            break;
        }

        if c.can_advance(&entry) {
            ac.buffer.next_glyph();
        } else {
            if ac.buffer.max_ops <= 0 {
                log::debug!("operation budget exhausted at glyph {}, advancing", ac.buffer.idx);
                ac.buffer.next_glyph();
            }
            ac.buffer.max_ops -= 1;
        }
    }

    if !c.in_place() {
        ac.buffer.sync();
    }
}

fn is_safe_to_break<T: Copy>(
    machine: &ExtendedStateTable<T>,
    c: &dyn Driver<T>,
    buffer: &Buffer,
    state: u16,
    class: u16,
    entry: &StateEntry<T>,
) -> bool {
    // 1
    if c.is_actionable(entry, buffer) {
        return false;
    }

    // 2
    let ok = state == START_OF_TEXT
        || (!c.can_advance(entry) && entry.new_state == START_OF_TEXT)
        || is_safe_to_break_extra(machine, c, buffer, class, entry);
    if !ok {
        return false;
    }

    // 3
    match machine.entry(state, class::END_OF_TEXT) {
        Some(end_entry) => !c.is_actionable(&end_entry, buffer),
        None => false,
    }
}

fn is_safe_to_break_extra<T: Copy>(
    machine: &ExtendedStateTable<T>,
    c: &dyn Driver<T>,
    buffer: &Buffer,
    class: u16,
    entry: &StateEntry<T>,
) -> bool {
    // 2c
    let wouldbe_entry = match machine.entry(START_OF_TEXT, class) {
        Some(v) => v,
        None => return false,
    };

    // 2c'
    if c.is_actionable(&wouldbe_entry, buffer) {
        return false;
    }

    // 2c"
    entry.new_state == wouldbe_entry.new_state && c.can_advance(entry) == c.can_advance(&wouldbe_entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aat::cache::ClassCache;
    use crate::buffer::Buffer;
    use crate::plan::ShapePlan;
    use crate::tables::aat::{Lookup, StateEntry};
    use crate::Face;
    use alloc::vec;
    use alloc::vec::Vec;

    /// Records every transition it sees.
    struct Recorder {
        seen: Vec<(usize, u16)>,
        in_place: bool,
    }

    impl Driver<u16> for Recorder {
        fn in_place(&self) -> bool {
            self.in_place
        }

        fn is_actionable(&self, entry: &StateEntry<u16>, _: &Buffer) -> bool {
            entry.extra != 0xFFFF
        }

        fn transition(&mut self, entry: &StateEntry<u16>, buffer: &mut Buffer) -> Option<()> {
            self.seen.push((buffer.idx, entry.extra));
            Some(())
        }
    }

    fn buffer(glyphs: &[u32]) -> Buffer {
        let mut buffer = Buffer::new();
        for (i, g) in glyphs.iter().enumerate() {
            buffer.add(0x61, i as u32);
            buffer.info[i].glyph_id = *g;
        }
        buffer.enter();
        buffer
    }

    fn machine(flags: u16) -> ExtendedStateTable<u16> {
        ExtendedStateTable {
            number_of_classes: 5,
            classes: Lookup::Simple(vec![4; 10]),
            states: vec![vec![0, 0, 0, 0, 1]],
            entries: vec![
                StateEntry { new_state: 0, flags: 0, extra: 0xFFFF },
                StateEntry { new_state: 0, flags, extra: 7 },
            ],
        }
    }

    #[test]
    fn empty_buffer_runs_end_of_text_once() {
        let face = Face::empty();
        let plan = ShapePlan::default();
        let mut buffer = buffer(&[]);
        let mut ac = ApplyContext::new(&plan, &face, &mut buffer);
        let mut recorder = Recorder { seen: Vec::new(), in_place: true };
        drive(&machine(0), &mut recorder, &mut ac, &ClassCache::new());
        assert_eq!(recorder.seen, vec![(0, 0xFFFF)]);
    }

    #[test]
    fn visits_every_glyph_and_end_of_text() {
        let face = Face::empty();
        let plan = ShapePlan::default();
        let mut buffer = buffer(&[1, 2, 3]);
        let mut ac = ApplyContext::new(&plan, &face, &mut buffer);
        let mut recorder = Recorder { seen: Vec::new(), in_place: false };
        drive(&machine(0), &mut recorder, &mut ac, &ClassCache::new());
        assert_eq!(recorder.seen, vec![(0, 7), (1, 7), (2, 7), (3, 0xFFFF)]);
        assert_eq!(buffer.len, 3);
    }

    #[test]
    fn dont_advance_loop_terminates() {
        let face = Face::empty();
        let plan = ShapePlan::default();
        let mut buffer = buffer(&[1, 2, 3, 4]);
        let mut ac = ApplyContext::new(&plan, &face, &mut buffer);
        let mut recorder = Recorder { seen: Vec::new(), in_place: true };
        drive(&machine(DONT_ADVANCE), &mut recorder, &mut ac, &ClassCache::new());

        // The budget is 16384 operations for a short buffer. The first glyph
        // spends all of it, every later glyph is advanced past at once.
        assert_eq!(recorder.seen.len(), 16385 + 3 + 1);
        assert_eq!(recorder.seen.last(), Some(&(4, 0xFFFF)));
        assert!(buffer.max_ops < 0);
    }

    #[test]
    fn actions_make_glyphs_unsafe_to_break() {
        let face = Face::empty();
        let plan = ShapePlan::default();
        let mut buffer = buffer(&[1, 2, 3]);
        let mut ac = ApplyContext::new(&plan, &face, &mut buffer);
        let mut recorder = Recorder { seen: Vec::new(), in_place: true };
        drive(&machine(0), &mut recorder, &mut ac, &ClassCache::new());
        assert!(!buffer.info[0].unsafe_to_break());
        assert!(buffer.info[1].unsafe_to_break());
        assert!(buffer.info[2].unsafe_to_break());
    }

    #[test]
    fn null_transitions_stay_safe_to_break() {
        let face = Face::empty();
        let plan = ShapePlan::default();
        let mut buffer = buffer(&[1, 2, 3]);
        let machine = ExtendedStateTable {
            number_of_classes: 5,
            classes: Lookup::Simple(vec![4; 10]),
            states: vec![vec![0, 0, 0, 0, 0]],
            entries: vec![StateEntry { new_state: 0, flags: 0, extra: 0xFFFFu16 }],
        };
        let mut ac = ApplyContext::new(&plan, &face, &mut buffer);
        let mut recorder = Recorder { seen: Vec::new(), in_place: true };
        drive(&machine, &mut recorder, &mut ac, &ClassCache::new());
        assert_eq!(recorder.seen.len(), 4);
        assert!(buffer.info_slice().iter().all(|i| !i.unsafe_to_break()));
    }
}
