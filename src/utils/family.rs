//! Explicit registry of per-type family ids.

use std::any::{self, Any, TypeId};
use std::collections::HashMap;

/// Stable integer identifying a distinct type within one `FamilyRegistry`.
pub type Family = usize;

/// Assigns each distinct type the next free `Family` on first use. Ids are
/// dense, start from zero and are never reused for the lifetime of the registry.
#[derive(Debug, Default)]
pub struct FamilyRegistry {
    families: HashMap<TypeId, Family>,
    names: Vec<&'static str>,
}

impl FamilyRegistry {
    /// Creates a new and empty `FamilyRegistry`.
    pub fn new() -> Self {
        FamilyRegistry::default()
    }

    /// Returns the family of `T`, assigning one if `T` has never been seen.
    pub fn family<T: Any>(&mut self) -> Family {
        let names = &mut self.names;
        *self.families.entry(TypeId::of::<T>()).or_insert_with(|| {
            names.push(any::type_name::<T>());
            names.len() - 1
        })
    }

    /// Returns the family of `T` if it has been assigned.
    #[inline]
    pub fn get<T: Any>(&self) -> Option<Family> {
        self.families.get(&TypeId::of::<T>()).cloned()
    }

    /// Returns the type name a family was assigned for.
    #[inline]
    pub fn name(&self, family: Family) -> Option<&'static str> {
        self.names.get(family).cloned()
    }

    /// Returns the number of families assigned so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
