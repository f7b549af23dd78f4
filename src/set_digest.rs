// A set digest is a lossy, one-sided membership filter: `may_have` returning
// `false` proves absence, returning `true` proves nothing. Each mask records
// one bit per value under a different shift of that value.

type Mask = u64;

const SHIFTS: [u32; 3] = [4, 0, 6];
const N: usize = SHIFTS.len();
const MASK_BITS: u32 = Mask::BITS;
const MB1: u32 = MASK_BITS - 1;
const ONE: Mask = 1;
const ALL: Mask = Mask::MAX;

/// An approximate set of glyph ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetDigest {
    masks: [Mask; N],
}

impl Default for SetDigest {
    fn default() -> Self {
        Self::new()
    }
}

impl SetDigest {
    /// Creates a digest that rejects everything.
    pub const fn new() -> Self {
        SetDigest { masks: [0; N] }
    }

    /// Creates a digest that accepts everything.
    pub const fn full() -> Self {
        SetDigest { masks: [ALL; N] }
    }

    pub fn clear(&mut self) {
        self.masks = [0; N];
    }

    pub fn union(&mut self, other: &Self) {
        for (a, b) in self.masks.iter_mut().zip(other.masks.iter()) {
            *a |= *b;
        }
    }

    pub fn add(&mut self, g: u32) {
        for (mask, shift) in self.masks.iter_mut().zip(SHIFTS) {
            *mask |= ONE << ((g >> shift) & MB1);
        }
    }

    pub fn add_array(&mut self, array: impl IntoIterator<Item = u32>) {
        for g in array {
            self.add(g);
        }
    }

    /// Adds the inclusive range `a..=b`.
    ///
    /// Returns `false` when nothing could change, which is the case once
    /// every mask is saturated.
    pub fn add_range(&mut self, a: u32, b: u32) -> bool {
        if self.is_saturated() {
            return false;
        }

        let a = Mask::from(a);
        let b = Mask::from(b);

        let mut changed = false;
        for (mask, shift) in self.masks.iter_mut().zip(SHIFTS) {
            let shift = Mask::from(shift);
            if (b >> shift).wrapping_sub(a >> shift) >= Mask::from(MB1) {
                *mask = ALL;
            } else {
                let ma = ONE << ((a >> shift) & Mask::from(MB1));
                let mb = ONE << ((b >> shift) & Mask::from(MB1));
                *mask |= mb.wrapping_add(mb.wrapping_sub(ma)).wrapping_sub(Mask::from(mb < ma));
                changed = true;
            }
        }

        changed
    }

    /// Checks that every mask has all of its bits set.
    #[inline]
    pub fn is_saturated(&self) -> bool {
        self.masks.iter().all(|m| *m == ALL)
    }

    #[inline]
    pub fn may_have(&self, g: u32) -> bool {
        self.masks
            .iter()
            .zip(SHIFTS)
            .all(|(mask, shift)| mask & (ONE << ((g >> shift) & MB1)) != 0)
    }

    #[inline]
    pub fn may_intersect(&self, other: &Self) -> bool {
        self.masks
            .iter()
            .zip(other.masks.iter())
            .all(|(a, b)| a & b != 0)
    }
}

impl FromIterator<u32> for SetDigest {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        let mut digest = SetDigest::new();
        digest.add_array(iter);
        digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn single() {
        let mut set = SetDigest::new();
        set.add(2);
        assert!(set.may_have(2));
        assert!(!SetDigest::new().may_have(2));
    }

    #[test]
    fn multiple() {
        let mut set = SetDigest::new();
        set.add(245);
        set.add(1060);
        set.add(300);
        set.add(599);
        assert!(set.may_have(245));
        assert!(set.may_have(1060));
        assert!(set.may_have(300));
        assert!(set.may_have(599));
    }

    #[test]
    fn reversed_range_floods() {
        let mut set = SetDigest::new();
        set.add_range(20, 15);
        for gid in 0..=100 {
            assert!(set.may_have(gid));
        }
    }

    #[test]
    fn ranges_are_sound() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let a = rng.gen_range(0..0x10000u32);
            let b = a + rng.gen_range(0..200u32);
            let mut set = SetDigest::new();
            set.add_range(a, b);
            for g in a..=b {
                assert!(set.may_have(g), "{} in {}..={}", g, a, b);
            }
        }
    }

    #[test]
    fn saturated_range_is_noop() {
        let mut set = SetDigest::new();
        assert!(set.add_range(0, 10));
        set.add_range(0, 0xFFFF);
        assert!(set.is_saturated());

        let before = set;
        assert!(!set.add_range(5, 6));
        assert_eq!(set, before);
    }

    #[test]
    fn intersect() {
        let mut a = SetDigest::new();
        let mut b = SetDigest::new();

        a.add(123);
        b.add(456);
        assert!(!a.may_intersect(&b));

        b.add(123);
        assert!(a.may_intersect(&b));
        assert!(SetDigest::full().may_intersect(&a));
    }
}
