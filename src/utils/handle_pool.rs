use std::cmp::Reverse;
use std::collections::binary_heap::BinaryHeap;

use super::{EntityId, HandleIndex};

/// `HandlePool` manages the manipulations of an `EntityId` collection, which are
/// created with a continuous `index` field. It also have the ability to find
/// out the current status of a specified `EntityId`.
///
/// An odd version marks a slot as alive, an even one as free.
pub struct HandlePool {
    versions: Vec<HandleIndex>,
    frees: BinaryHeap<Reverse<HandleIndex>>,
}

impl HandlePool {
    /// Constructs a new, empty `HandlePool`.
    pub fn new() -> HandlePool {
        HandlePool {
            versions: Vec::new(),
            frees: BinaryHeap::new(),
        }
    }

    /// Constructs a new `HandlePool` with the specified capacity.
    pub fn with_capacity(capacity: usize) -> HandlePool {
        HandlePool {
            versions: Vec::with_capacity(capacity),
            frees: BinaryHeap::with_capacity(capacity),
        }
    }

    /// Creates a unused `EntityId`. Freed indices are reused lowest first.
    pub fn create(&mut self) -> EntityId {
        if let Some(Reverse(index)) = self.frees.pop() {
            let version = &mut self.versions[index as usize];
            *version = version.wrapping_add(1);
            EntityId::new(index, *version)
        } else {
            self.versions.push(1);
            EntityId::new(self.versions.len() as HandleIndex - 1, 1)
        }
    }

    /// Returns true if this `EntityId` was created by `HandlePool`, and has not been
    /// freed yet.
    pub fn is_alive(&self, id: EntityId) -> bool {
        let index = id.index() as usize;
        self.is_alive_at(index) && (self.versions[index] == id.version())
    }

    #[inline(always)]
    fn is_alive_at(&self, index: usize) -> bool {
        (index < self.versions.len()) && ((self.versions[index] & 0x1) == 1)
    }

    /// Recycles the `EntityId` index, and mark its version as dead.
    pub fn free(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            false
        } else {
            let index = id.index();
            self.versions[index as usize] = id.version().wrapping_add(1);
            self.frees.push(Reverse(index));
            true
        }
    }

    /// Returns the total number of alive ids in this `HandlePool`.
    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len() - self.frees.len()
    }

    /// Returns true if there are no alive ids.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over the alive ids of this `HandlePool`.
    #[inline]
    pub fn iter(&self) -> HandleIter {
        HandleIter {
            versions: &self.versions,
            start: 0,
        }
    }
}

impl Default for HandlePool {
    fn default() -> Self {
        HandlePool::new()
    }
}

/// Immutable `HandlePool` iterator, this struct is created by `iter` method on `HandlePool`.
#[derive(Copy, Clone)]
pub struct HandleIter<'a> {
    versions: &'a [HandleIndex],
    start: usize,
}

impl<'a> Iterator for HandleIter<'a> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        while self.start < self.versions.len() {
            let i = self.start;
            self.start += 1;

            let v = self.versions[i];
            if v & 0x1 == 1 {
                return Some(EntityId::new(i as HandleIndex, v));
            }
        }

        None
    }
}
