//! Packed storage of values keyed by `EntityId`.

use crate::utils::EntityId;

const NONE: u32 = u32::max_value();

/// `SparseSet` keeps its values densely packed, so enumerating a component
/// type is proportional to the number of entities that actually have it.
///
/// The sparse array maps an entity index to the position of its value in the
/// packed arrays. Removal swaps the last element into the hole.
#[derive(Debug)]
pub struct SparseSet<T> {
    sparse: Vec<u32>,
    dense: Vec<EntityId>,
    values: Vec<T>,
}

impl<T> SparseSet<T> {
    pub fn new() -> Self {
        SparseSet::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SparseSet {
            sparse: Vec::new(),
            dense: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of values.
    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Returns true if `id`, with this exact version, has a value.
    #[inline]
    pub fn contains(&self, id: EntityId) -> bool {
        self.position(id).is_some()
    }

    /// Returns the packed ids in storage order.
    #[inline]
    pub fn ids(&self) -> &[EntityId] {
        &self.dense
    }

    /// Returns the id stored at packed position `pos`.
    #[inline]
    pub fn id_at(&self, pos: usize) -> Option<EntityId> {
        self.dense.get(pos).cloned()
    }

    /// Returns a reference to the value corresponding to `id`.
    #[inline]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.position(id).map(move |pos| &self.values[pos])
    }

    /// Returns a mutable reference to the value corresponding to `id`.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        match self.position(id) {
            Some(pos) => Some(&mut self.values[pos]),
            None => None,
        }
    }

    /// Inserts new data for a given `id`. If the set already had a value for
    /// `id`, the value is replaced in place and the old one is returned.
    pub fn insert(&mut self, id: EntityId, value: T) -> Option<T> {
        if let Some(pos) = self.position(id) {
            return Some(::std::mem::replace(&mut self.values[pos], value));
        }

        let index = id.index() as usize;
        if self.sparse.len() <= index {
            self.sparse.resize(index + 1, NONE);
        }

        self.sparse[index] = self.dense.len() as u32;
        self.dense.push(id);
        self.values.push(value);
        None
    }

    /// Removes and returns the data associated with `id`.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let pos = self.position(id)?;
        let last = self.dense.len() - 1;

        if pos != last {
            let moved = self.dense[last];
            self.sparse[moved.index() as usize] = pos as u32;
        }

        self.sparse[id.index() as usize] = NONE;
        self.dense.swap_remove(pos);
        Some(self.values.swap_remove(pos))
    }

    /// Removes all values.
    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
        self.values.clear();
    }

    #[inline]
    fn position(&self, id: EntityId) -> Option<usize> {
        let pos = *self.sparse.get(id.index() as usize)?;
        if pos != NONE && self.dense[pos as usize] == id {
            Some(pos as usize)
        } else {
            None
        }
    }
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        SparseSet::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{Arc, RwLock};

    #[derive(Debug)]
    struct Reference {
        value: Arc<RwLock<usize>>,
    }

    impl Drop for Reference {
        fn drop(&mut self) {
            *self.value.write().unwrap() += 1;
        }
    }

    #[test]
    fn basic() {
        let mut set = SparseSet::new();
        let e1 = EntityId::new(3, 1);
        let e2 = EntityId::new(0, 1);

        assert_eq!(set.insert(e1, 'a'), None);
        assert_eq!(set.insert(e2, 'b'), None);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(e1), Some(&'a'));
        assert_eq!(set.ids(), &[e1, e2]);

        assert_eq!(set.insert(e1, 'c'), Some('a'));
        assert_eq!(set.len(), 2);

        *set.get_mut(e2).unwrap() = 'd';
        assert_eq!(set.remove(e1), Some('c'));
        assert_eq!(set.remove(e1), None);
        assert_eq!(set.ids(), &[e2]);
        assert_eq!(set.get(e2), Some(&'d'));
        assert_eq!(set.id_at(1), None);
    }

    #[test]
    fn stale_version() {
        let mut set = SparseSet::new();
        set.insert(EntityId::new(1, 1), 1);

        let recycled = EntityId::new(1, 3);
        assert!(!set.contains(recycled));
        assert_eq!(set.remove(recycled), None);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn drops() {
        let rc = Arc::new(RwLock::new(0));
        let mut set = SparseSet::new();

        for i in 0..10 {
            let value = Reference { value: rc.clone() };
            set.insert(EntityId::new(i, 1), value);
        }

        set.remove(EntityId::new(4, 1));
        assert_eq!(*rc.read().unwrap(), 1);

        set.insert(EntityId::new(5, 1), Reference { value: rc.clone() });
        assert_eq!(*rc.read().unwrap(), 2);

        drop(set);
        assert_eq!(*rc.read().unwrap(), 11);
    }
}
