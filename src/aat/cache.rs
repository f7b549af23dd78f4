//! Per-face accelerators for AAT subtables.
//!
//! Built once when a face is created and only read afterwards, apart from
//! the class caches which fill up lazily.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use ttf_parser::GlyphId;

use super::extended_kerning::{Driver1, Driver4};
use super::metamorphosis::{ContextualCtx, InsertionCtx, LigatureCtx, RearrangementCtx};
use crate::int_set::IntSet;
use crate::set_digest::SetDigest;
use crate::tables::aat::{class, ExtendedStateTable, StateEntry, START_OF_TEXT};
use crate::tables::{kern, kerx, morx, Tables};

const CACHE_SIZE: usize = 256;
const KEY_BITS: u32 = 16;
const VALUE_BITS: u32 = 8;
const VALUE_MASK: u32 = (1 << VALUE_BITS) - 1;
const INVALID: u32 = u32::MAX;

/// A direct-mapped glyph class cache.
///
/// Each slot packs a glyph id and its class. Classes that do not fit into
/// eight bits are never cached.
pub struct ClassCache {
    slots: [AtomicU32; CACHE_SIZE],
}

impl ClassCache {
    pub fn new() -> Self {
        ClassCache {
            slots: core::array::from_fn(|_| AtomicU32::new(INVALID)),
        }
    }

    #[inline]
    pub fn get(&self, glyph: u16) -> Option<u16> {
        let v = self.slots[usize::from(glyph) % CACHE_SIZE].load(Ordering::Relaxed);
        if v == INVALID || (v >> VALUE_BITS) != u32::from(glyph) {
            return None;
        }

        Some((v & VALUE_MASK) as u16)
    }

    #[inline]
    pub fn set(&self, glyph: u16, value: u16) {
        debug_assert!(u32::from(glyph) < 1 << KEY_BITS);
        if u32::from(value) > VALUE_MASK {
            return;
        }

        let v = (u32::from(glyph) << VALUE_BITS) | u32::from(value);
        self.slots[usize::from(glyph) % CACHE_SIZE].store(v, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        for slot in &self.slots {
            slot.store(INVALID, Ordering::Relaxed);
        }
    }

    /// Returns the class of `glyph_id` in `machine`, consulting the cache first.
    pub(crate) fn get_class<T: Copy>(
        &self,
        machine: &ExtendedStateTable<T>,
        glyph_id: GlyphId,
    ) -> u16 {
        if glyph_id.0 == 0xFFFF {
            return class::DELETED_GLYPH;
        }

        if let Some(v) = self.get(glyph_id.0) {
            return v;
        }

        let v = machine.class(glyph_id).unwrap_or(class::OUT_OF_BOUNDS);
        self.set(glyph_id.0, v);
        v
    }
}

impl Default for ClassCache {
    fn default() -> Self {
        ClassCache::new()
    }
}

impl core::fmt::Debug for ClassCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClassCache").finish()
    }
}

/// Accelerators of a single subtable.
#[derive(Debug, Default)]
pub struct SubtableCache {
    /// Glyphs that can start a non-trivial transition, or left-hand glyphs
    /// of a pair kerning subtable.
    pub glyph_set: IntSet,
    /// Right-hand glyphs of a pair kerning subtable.
    pub second_set: IntSet,
    pub digest: SetDigest,
    pub class_cache: ClassCache,
}

impl SubtableCache {
    fn new(glyph_set: IntSet) -> Self {
        let digest = glyph_set.iter().collect();
        SubtableCache {
            glyph_set,
            second_set: IntSet::new(),
            digest,
            class_cache: ClassCache::new(),
        }
    }

    fn pairs(first_set: IntSet, second_set: IntSet) -> Self {
        SubtableCache {
            second_set,
            ..SubtableCache::new(first_set)
        }
    }
}

/// Accelerators for every AAT subtable of a face.
#[derive(Debug, Default)]
pub struct AatCache {
    pub morx: Vec<Vec<SubtableCache>>,
    pub kerx: Vec<SubtableCache>,
    pub kern: Vec<SubtableCache>,
}

impl AatCache {
    pub fn new(tables: &Tables, number_of_glyphs: u16) -> Self {
        let mut cache = AatCache::default();

        if let Some(ref morx) = tables.morx {
            for chain in &morx.chains {
                let subtables = chain
                    .subtables
                    .iter()
                    .map(|subtable| morx_subtable_cache(&subtable.kind, number_of_glyphs))
                    .collect();
                cache.morx.push(subtables);
            }
        }

        if let Some(ref kerx) = tables.kerx {
            cache.kerx = kerx
                .subtables
                .iter()
                .map(|subtable| kerx_subtable_cache(&subtable.format, number_of_glyphs))
                .collect();
        }

        if let Some(ref kern) = tables.kern {
            cache.kern = kern
                .subtables
                .iter()
                .map(|subtable| kern_subtable_cache(&subtable.format, number_of_glyphs))
                .collect();
        }

        log::trace!(
            "built accelerators for {} morx chains, {} kerx and {} kern subtables",
            cache.morx.len(),
            cache.kerx.len(),
            cache.kern.len()
        );

        cache
    }
}

fn morx_subtable_cache(kind: &morx::SubtableKind, number_of_glyphs: u16) -> SubtableCache {
    let mut set = IntSet::new();
    match kind {
        morx::SubtableKind::Rearrangement(table) => {
            collect_initial_glyphs(table, &mut set, number_of_glyphs, |entry| {
                entry.flags & (RearrangementCtx::MARK_FIRST | RearrangementCtx::VERB) != 0
            });
        }
        morx::SubtableKind::Contextual(table) => {
            collect_initial_glyphs(&table.state, &mut set, number_of_glyphs, |entry| {
                entry.flags & ContextualCtx::SET_MARK != 0
                    || entry.extra.mark_index != 0xFFFF
                    || entry.extra.current_index != 0xFFFF
            });
        }
        morx::SubtableKind::Ligature(table) => {
            collect_initial_glyphs(&table.state, &mut set, number_of_glyphs, |entry| {
                entry.flags & (LigatureCtx::SET_COMPONENT | LigatureCtx::PERFORM_ACTION) != 0
            });
        }
        morx::SubtableKind::NonContextual(lookup) => {
            lookup.collect_glyphs(&mut set, number_of_glyphs);
        }
        morx::SubtableKind::Insertion(table) => {
            collect_initial_glyphs(&table.state, &mut set, number_of_glyphs, |entry| {
                entry.flags & InsertionCtx::SET_MARK != 0 || InsertionCtx::has_insertion(entry)
            });
        }
    }

    SubtableCache::new(set)
}

fn kerx_subtable_cache(format: &kerx::Format, number_of_glyphs: u16) -> SubtableCache {
    match format {
        kerx::Format::Format0(table) => pair_table_cache(table),
        kerx::Format::Format1(table) => state_machine_cache(&table.state, Driver1::PUSH, number_of_glyphs),
        kerx::Format::Format2(table) | kerx::Format::Format6(table) => {
            class_table_cache(table, number_of_glyphs)
        }
        kerx::Format::Format4(table) => state_machine_cache(&table.state, Driver4::MARK, number_of_glyphs),
    }
}

fn kern_subtable_cache(format: &kern::Format, number_of_glyphs: u16) -> SubtableCache {
    match format {
        kern::Format::Format0(table) => pair_table_cache(table),
        kern::Format::Format1(table) => state_machine_cache(&table.state, Driver1::PUSH, number_of_glyphs),
        kern::Format::Format2(table) => class_table_cache(table, number_of_glyphs),
        kern::Format::Format3(table) => {
            let mut set = IntSet::new();
            let count = table.glyph_count.min(number_of_glyphs);
            if count != 0 {
                set.insert_range(0..=u32::from(count) - 1);
            }
            SubtableCache::pairs(set.clone(), set)
        }
    }
}

fn pair_table_cache(table: &kerx::PairTable) -> SubtableCache {
    let first = table.pairs.iter().map(|pair| u32::from(pair.left.0)).collect();
    let second = table.pairs.iter().map(|pair| u32::from(pair.right.0)).collect();
    SubtableCache::pairs(first, second)
}

fn class_table_cache(table: &kerx::ClassTable, number_of_glyphs: u16) -> SubtableCache {
    let mut first = IntSet::new();
    let mut second = IntSet::new();
    table.left.collect_glyphs(&mut first, number_of_glyphs);
    table.right.collect_glyphs(&mut second, number_of_glyphs);
    SubtableCache::pairs(first, second)
}

fn state_machine_cache(
    machine: &ExtendedStateTable<u16>,
    initiable_flag: u16,
    number_of_glyphs: u16,
) -> SubtableCache {
    let mut set = IntSet::new();
    collect_initial_glyphs(machine, &mut set, number_of_glyphs, |entry| {
        entry.flags & initiable_flag != 0 || entry.extra != 0xFFFF
    });
    SubtableCache::new(set)
}

/// Adds to `set` every glyph whose class leaves the start-of-text state in a
/// way that matters: into another state, or with an action.
fn collect_initial_glyphs<T: Copy>(
    machine: &ExtendedStateTable<T>,
    set: &mut IntSet,
    number_of_glyphs: u16,
    interesting: impl Fn(&StateEntry<T>) -> bool,
) {
    let mut filter = IntSet::new();
    for class in 0..machine.number_of_classes {
        let entry = match machine.entry(START_OF_TEXT, class) {
            Some(v) => v,
            None => continue,
        };

        if entry.new_state == START_OF_TEXT && !interesting(&entry) {
            continue;
        }

        filter.insert(u32::from(class));
    }

    if filter.contains(u32::from(class::DELETED_GLYPH)) {
        set.insert(0xFFFF);
    }

    machine
        .classes
        .collect_glyphs_filtered(set, number_of_glyphs, |class| filter.contains(u32::from(class)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::aat::{Lookup, LookupSegment};
    use alloc::vec;

    #[test]
    fn class_cache_round_trip() {
        let cache = ClassCache::new();
        assert_eq!(cache.get(5), None);
        cache.set(5, 7);
        assert_eq!(cache.get(5), Some(7));
        // Same slot, different glyph.
        assert_eq!(cache.get(5 + CACHE_SIZE as u16), None);
        cache.set(5 + CACHE_SIZE as u16, 1);
        assert_eq!(cache.get(5), None);
        // Too wide to cache.
        cache.set(9, 300);
        assert_eq!(cache.get(9), None);
        cache.clear();
        assert_eq!(cache.get(5 + CACHE_SIZE as u16), None);
    }

    #[test]
    fn initial_glyphs() {
        // Class 4 moves to state 1, class 5 stays in state 0 silently,
        // class 6 stays in state 0 but has an action.
        let machine = ExtendedStateTable {
            number_of_classes: 7,
            classes: Lookup::SegmentSingle(vec![
                LookupSegment { first: 10, last: 11, value: 4 },
                LookupSegment { first: 20, last: 21, value: 5 },
                LookupSegment { first: 30, last: 30, value: 6 },
            ]),
            states: vec![vec![0, 0, 0, 0, 1, 0, 2], vec![0, 0, 0, 0, 0, 0, 0]],
            entries: vec![
                StateEntry { new_state: 0, flags: 0, extra: 0xFFFFu16 },
                StateEntry { new_state: 1, flags: 0, extra: 0xFFFF },
                StateEntry { new_state: 0, flags: 0, extra: 3 },
            ],
        };

        let mut set = IntSet::new();
        collect_initial_glyphs(&machine, &mut set, 100, |entry| entry.extra != 0xFFFF);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![10, 11, 30]);
    }

    #[test]
    fn deleted_glyph_class_adds_sentinel() {
        let machine = ExtendedStateTable {
            number_of_classes: 4,
            classes: Lookup::Simple(vec![]),
            states: vec![vec![0, 0, 1, 0]],
            entries: vec![
                StateEntry { new_state: 0, flags: 0, extra: () },
                StateEntry { new_state: 1, flags: 0, extra: () },
            ],
        };

        let mut set = IntSet::new();
        collect_initial_glyphs(&machine, &mut set, 100, |_| false);
        assert!(set.contains(0xFFFF));
        assert_eq!(set.len(), 1);
    }
}
