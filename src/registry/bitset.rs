//! Dynamic sized bit-set used as per-entity component masks.

const BITS: usize = 64;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DynamicBitSet {
    bits: Vec<u64>,
}

impl DynamicBitSet {
    pub fn new() -> Self {
        DynamicBitSet { bits: Vec::new() }
    }

    /// Adds a value to the set.
    #[inline]
    pub fn insert(&mut self, index: usize) {
        let (index, bit_index) = Self::split(index);

        if self.bits.len() <= index {
            self.bits.resize(index + 1, 0);
        }

        self.bits[index] |= 1 << bit_index;
    }

    /// Removes a value from the set.
    #[inline]
    pub fn remove(&mut self, index: usize) {
        let (index, bit_index) = Self::split(index);

        if self.bits.len() <= index {
            return;
        }

        self.bits[index] &= !(1 << bit_index);
    }

    /// Returns `true` if this set contains the specified integer.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        let (index, bit_index) = Self::split(index);

        if self.bits.len() <= index {
            return false;
        }

        ((1 << bit_index) & self.bits[index]) > 0
    }

    /// Returns `true` if every value of `other` is also in this set.
    #[inline]
    pub fn is_superset(&self, other: &DynamicBitSet) -> bool {
        other.bits.iter().enumerate().all(|(i, rhs)| {
            let lhs = self.bits.get(i).cloned().unwrap_or(0);
            lhs & rhs == *rhs
        })
    }

    /// Clears all bits in this set.
    #[inline]
    pub fn clear(&mut self) {
        self.bits.clear();
    }

    /// Returns whether there are no bits set in this set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|v| *v == 0)
    }

    /// Returns an iterator over the values of this set, in ascending order.
    #[inline]
    pub fn iter(&self) -> DynamicBitSetIter {
        DynamicBitSetIter {
            bitset: self,
            cursor: 0,
        }
    }

    #[inline]
    fn split(index: usize) -> (usize, usize) {
        (index / BITS, index % BITS)
    }
}

pub struct DynamicBitSetIter<'a> {
    bitset: &'a DynamicBitSet,
    cursor: usize,
}

impl<'a> Iterator for DynamicBitSetIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.bitset.bits.len() * BITS;

        while self.cursor < len {
            self.cursor += 1;

            if self.bitset.contains(self.cursor - 1) {
                return Some(self.cursor - 1);
            }
        }

        None
    }
}
