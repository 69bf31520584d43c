use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use super::bitset::DynamicBitSet;
use super::sparse_set::SparseSet;
use crate::utils::Family;

/// Sorted, deduplicated families of a multi-component query.
pub type Signature = SmallVec<[Family; 4]>;

/// A persistent group is the standing set of entities that hold every
/// component of its signature. It is kept up to date on each assign and
/// remove, so iterating it costs only the number of matching entities.
pub(crate) struct Group {
    pub signature: Signature,
    pub mask: DynamicBitSet,
    pub set: Rc<RefCell<SparseSet<()>>>,
}

impl Group {
    pub fn new(signature: Signature) -> Self {
        let mut mask = DynamicBitSet::new();
        for family in &signature {
            mask.insert(*family);
        }

        Group {
            signature,
            mask,
            set: Rc::new(RefCell::new(SparseSet::new())),
        }
    }

    #[inline]
    pub fn watches(&self, family: Family) -> bool {
        self.mask.contains(family)
    }
}

/// Normalizes a family list into a group signature.
pub fn signature(families: &[Family]) -> Signature {
    let mut signature: Signature = families.iter().cloned().collect();
    signature.sort();
    signature.dedup();
    signature
}
