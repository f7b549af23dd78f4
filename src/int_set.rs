//! A sparse set of `u32` values, used to describe which glyphs a subtable
//! can react to.
//!
//! Values are grouped into 256-bit pages keyed by `value >> 8`. Pages are
//! kept sorted by key so lookups are a binary search and set algebra is a
//! merge over populated pages only.

use alloc::vec::Vec;
use core::ops::RangeInclusive;

// the integer type underlying a page
type Element = u64;

// the number of elements in a page
const PAGE_SIZE: u32 = 4;
// the length of an element in bits
const ELEM_BITS: u32 = Element::BITS;
// mask out bits of a value not used to index into an element
const ELEM_MASK: u32 = ELEM_BITS - 1;
// the number of bits in a page
const PAGE_BITS: u32 = ELEM_BITS * PAGE_SIZE;
// mask out the bits of a value not used to index into a page
const PAGE_MASK: u32 = PAGE_BITS - 1;
const PAGE_SHIFT: u32 = PAGE_BITS.trailing_zeros();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Page {
    major: u32,
    storage: [Element; PAGE_SIZE as usize],
}

impl Page {
    fn new(major: u32) -> Self {
        Page {
            major,
            storage: [0; PAGE_SIZE as usize],
        }
    }

    #[inline]
    fn contains(&self, val: u32) -> bool {
        self.storage[elem_index(val)] & elem_bit_mask(val) != 0
    }

    #[inline]
    fn insert(&mut self, val: u32) {
        self.storage[elem_index(val)] |= elem_bit_mask(val);
    }

    #[inline]
    fn remove(&mut self, val: u32) {
        self.storage[elem_index(val)] &= !elem_bit_mask(val);
    }

    /// Sets every bit in `[first, last]`, both taken modulo the page width.
    fn insert_range(&mut self, first: u32, last: u32) {
        let first_elem = elem_index(first);
        let last_elem = elem_index(last);

        // Inclusive masks: every bit at or above `first`, every bit at or below `last`.
        let low = Element::MAX << (first & ELEM_MASK);
        let high = Element::MAX >> (ELEM_MASK - (last & ELEM_MASK));

        if first_elem == last_elem {
            self.storage[first_elem] |= low & high;
            return;
        }

        self.storage[first_elem] |= low;
        for elem in &mut self.storage[first_elem + 1..last_elem] {
            *elem = Element::MAX;
        }
        self.storage[last_elem] |= high;
    }

    fn len(&self) -> usize {
        self.storage.iter().map(|e| e.count_ones() as usize).sum()
    }

    fn is_empty(&self) -> bool {
        self.storage.iter().all(|e| *e == 0)
    }

    fn includes(&self, other: &Page) -> bool {
        self.storage
            .iter()
            .zip(other.storage.iter())
            .all(|(a, b)| b & !a == 0)
    }

    fn intersects(&self, other: &Page) -> bool {
        self.storage
            .iter()
            .zip(other.storage.iter())
            .any(|(a, b)| a & b != 0)
    }

    fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let base = self.major << PAGE_SHIFT;
        self.storage
            .iter()
            .enumerate()
            .filter(|(_, elem)| **elem != 0)
            .flat_map(move |(i, elem)| {
                let base = base + i as u32 * ELEM_BITS;
                BitIter(*elem).map(move |bit| base + bit)
            })
    }
}

struct BitIter(Element);

impl Iterator for BitIter {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.0 == 0 {
            return None;
        }

        let bit = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Some(bit)
    }
}

#[inline]
fn elem_index(val: u32) -> usize {
    ((val & PAGE_MASK) / ELEM_BITS) as usize
}

#[inline]
fn elem_bit_mask(val: u32) -> Element {
    1 << (val & ELEM_MASK)
}

#[inline]
fn major_value(val: u32) -> u32 {
    val >> PAGE_SHIFT
}

/// A sparse set of `u32` values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntSet {
    pages: Vec<Page>,
}

impl IntSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        IntSet::default()
    }

    /// Adds `val` to the set.
    pub fn insert(&mut self, val: u32) {
        let idx = self.ensure_page(major_value(val));
        self.pages[idx].insert(val);
    }

    /// Adds every value in `range` to the set.
    ///
    /// The first and last pages receive partial masks, pages in between are
    /// filled completely.
    pub fn insert_range(&mut self, range: RangeInclusive<u32>) {
        let (first, last) = (*range.start(), *range.end());
        if first > last {
            return;
        }

        let major_first = major_value(first);
        let major_last = major_value(last);

        if major_first == major_last {
            let idx = self.ensure_page(major_first);
            self.pages[idx].insert_range(first, last);
            return;
        }

        let idx = self.ensure_page(major_first);
        self.pages[idx].insert_range(first, PAGE_MASK);

        for major in major_first + 1..major_last {
            let idx = self.ensure_page(major);
            self.pages[idx].storage = [Element::MAX; PAGE_SIZE as usize];
        }

        let idx = self.ensure_page(major_last);
        self.pages[idx].insert_range(0, last);
    }

    /// Removes `val` from the set.
    pub fn remove(&mut self, val: u32) {
        if let Ok(idx) = self.page_index(major_value(val)) {
            self.pages[idx].remove(val);
            if self.pages[idx].is_empty() {
                self.pages.remove(idx);
            }
        }
    }

    /// Checks that `val` is a member of the set.
    #[inline]
    pub fn contains(&self, val: u32) -> bool {
        match self.page_index(major_value(val)) {
            Ok(idx) => self.pages[idx].contains(val),
            Err(_) => false,
        }
    }

    /// Checks that every member of `other` is also a member of `self`.
    pub fn includes(&self, other: &IntSet) -> bool {
        let mut a = self.pages.iter().peekable();
        for page in other.pages.iter().filter(|p| !p.is_empty()) {
            loop {
                match a.peek() {
                    Some(p) if p.major < page.major => {
                        a.next();
                    }
                    Some(p) if p.major == page.major => {
                        if !p.includes(page) {
                            return false;
                        }
                        break;
                    }
                    _ => return false,
                }
            }
        }

        true
    }

    /// Checks that the two sets share at least one member.
    pub fn intersects(&self, other: &IntSet) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.pages.len() && j < other.pages.len() {
            let (a, b) = (&self.pages[i], &other.pages[j]);
            match a.major.cmp(&b.major) {
                core::cmp::Ordering::Less => i += 1,
                core::cmp::Ordering::Greater => j += 1,
                core::cmp::Ordering::Equal => {
                    if a.intersects(b) {
                        return true;
                    }
                    i += 1;
                    j += 1;
                }
            }
        }

        false
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    /// Checks that the set has no members.
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(Page::is_empty)
    }

    /// Removes all members.
    pub fn clear(&mut self) {
        self.pages.clear();
    }

    /// Iterates over the members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.iter().flat_map(Page::iter)
    }

    fn page_index(&self, major: u32) -> Result<usize, usize> {
        self.pages.binary_search_by(|p| p.major.cmp(&major))
    }

    fn ensure_page(&mut self, major: u32) -> usize {
        match self.page_index(major) {
            Ok(idx) => idx,
            Err(idx) => {
                self.pages.insert(idx, Page::new(major));
                idx
            }
        }
    }
}

impl Extend<u32> for IntSet {
    fn extend<T: IntoIterator<Item = u32>>(&mut self, iter: T) {
        for v in iter {
            self.insert(v);
        }
    }
}

impl FromIterator<u32> for IntSet {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        let mut set = IntSet::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeSet;
    use alloc::vec;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn insert_and_contains() {
        let mut set = IntSet::new();
        set.insert(3);
        set.insert(0xFFFF);
        set.insert(u32::MAX);
        assert!(set.contains(3));
        assert!(set.contains(0xFFFF));
        assert!(set.contains(u32::MAX));
        assert!(!set.contains(4));
        assert_eq!(set.len(), 3);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 0xFFFF, u32::MAX]);
    }

    #[test]
    fn remove_drops_empty_pages() {
        let mut set = IntSet::new();
        set.insert(700);
        set.remove(700);
        assert!(set.is_empty());
        assert_eq!(set, IntSet::new());
    }

    #[test]
    fn insert_range_within_one_element() {
        let mut set = IntSet::new();
        set.insert_range(5..=9);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn insert_range_across_pages() {
        let mut set = IntSet::new();
        set.insert_range(250..=1030);
        assert_eq!(set.len(), 781);
        assert!(!set.contains(249));
        assert!(set.contains(250));
        assert!(set.contains(255));
        assert!(set.contains(256));
        assert!(set.contains(767));
        assert!(set.contains(1030));
        assert!(!set.contains(1031));
    }

    #[test]
    fn insert_range_page_boundaries() {
        let mut set = IntSet::new();
        set.insert_range(256..=511);
        assert_eq!(set.len(), 256);
        assert!(!set.contains(255));
        assert!(!set.contains(512));

        let mut set = IntSet::new();
        set.insert_range(63..=64);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![63, 64]);

        let mut set = IntSet::new();
        set.insert_range(u32::MAX - 1..=u32::MAX);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn ranges_match_reference() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        for _ in 0..200 {
            let a = rng.gen_range(0..5000u32);
            let b = a + rng.gen_range(0..2000u32);
            let mut set = IntSet::new();
            set.insert_range(a..=b);
            for v in a.saturating_sub(300)..b + 300 {
                assert_eq!(set.contains(v), (a..=b).contains(&v), "{} in {}..={}", v, a, b);
            }
            assert_eq!(set.len(), (b - a + 1) as usize);
        }
    }

    #[test]
    fn includes_matches_reference() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..300 {
            let big: BTreeSet<u32> = (0..rng.gen_range(0..60))
                .map(|_| rng.gen_range(0..2048))
                .collect();
            let small: BTreeSet<u32> = if rng.gen_bool(0.5) {
                big.iter().copied().filter(|_| rng.gen_bool(0.5)).collect()
            } else {
                (0..rng.gen_range(0..10)).map(|_| rng.gen_range(0..2048)).collect()
            };

            let a: IntSet = big.iter().copied().collect();
            let b: IntSet = small.iter().copied().collect();

            assert_eq!(a.includes(&b), small.is_subset(&big));
            assert_eq!(a.intersects(&b), !small.is_disjoint(&big));
        }
    }

    #[test]
    fn empty_is_included_everywhere() {
        let a = IntSet::new();
        let mut b = IntSet::new();
        assert!(a.includes(&b));
        b.insert(1);
        assert!(b.includes(&a));
        assert!(!a.includes(&b));
        assert!(!a.intersects(&b));
    }
}
