use std::fmt;

/// `HandleIndex` type is arbitrary. Keeping it 32-bits allows for
/// a single 64-bits word per `EntityId`.
pub type HandleIndex = u32;

/// `EntityId` is made up of two field, `index` and `version`. `index` is used
/// to address the slot of an entity in the registry. This value is recycled
/// when an entity is destroyed, which means that you could end up with two
/// different `EntityId`s with identical indices. We solve this by introducing
/// `version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId {
    index: HandleIndex,
    version: HandleIndex,
}

impl EntityId {
    /// The reserved sentinel, all bits set. It is never issued by the registry.
    pub const INVALID: EntityId = EntityId {
        index: HandleIndex::max_value(),
        version: HandleIndex::max_value(),
    };

    /// Constructs a new `EntityId`.
    #[inline]
    pub fn new(index: HandleIndex, version: HandleIndex) -> Self {
        EntityId { index, version }
    }

    /// Returns true if this is the reserved invalid sentinel.
    #[inline]
    pub fn is_invalid(self) -> bool {
        self == EntityId::INVALID
    }

    /// Returns index value.
    #[inline]
    pub fn index(self) -> HandleIndex {
        self.index
    }

    /// Returns version value.
    #[inline]
    pub fn version(self) -> HandleIndex {
        self.version
    }

    /// Packs this id into a single 64-bits word, version in the high half.
    #[inline]
    pub fn to_bits(self) -> u64 {
        (u64::from(self.version) << 32) | u64::from(self.index)
    }

    /// Unpacks an id produced by `to_bits`.
    #[inline]
    pub fn from_bits(bits: u64) -> Self {
        EntityId {
            index: bits as HandleIndex,
            version: (bits >> 32) as HandleIndex,
        }
    }
}

impl Default for EntityId {
    fn default() -> Self {
        EntityId::INVALID
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "EntityId (invalid)")
        } else {
            write!(f, "EntityId ({}, {})", self.index, self.version)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn basic() {
        let h2 = EntityId::new(2, 4);
        assert_eq!(h2.index(), 2);
        assert_eq!(h2.version(), 4);
        assert!(!h2.is_invalid());

        let nil = EntityId::default();
        assert!(nil.is_invalid());
        assert_eq!(nil.to_bits(), u64::max_value());
        assert_eq!(EntityId::from_bits(h2.to_bits()), h2);
    }

    #[test]
    fn container() {
        let h1 = EntityId::new(1, 1);
        let h2 = EntityId::new(1, 3);
        let h3 = EntityId::new(2, 3);
        let h4 = EntityId::new(1, 1);

        let mut set = HashSet::new();
        assert_eq!(set.insert(h1), true);
        assert_eq!(set.contains(&h1), true);
        assert_eq!(set.insert(h4), false);
        assert_eq!(set.contains(&h4), true);
        assert_eq!(set.insert(h2), true);
        assert_eq!(set.insert(h3), true);
    }
}
