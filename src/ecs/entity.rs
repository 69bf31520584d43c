//! `Entity` and `ComponentHandle`, the non-owning views into a `Registry`.

use std::any;
use std::cell::{Ref, RefMut};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use super::component::Component;
use crate::errors::{Error, Result};
use crate::registry::{Pool, Registry};
use crate::utils::EntityId;

/// A lightweight identity of a bundle of components.
///
/// `Entity` pairs the raw id with a weak reference to the registry that issued
/// it. Validity is never cached: ids are recycled after destruction, so every
/// call re-queries the registry. All per-component operations on an invalid
/// entity are no-ops.
#[derive(Clone)]
pub struct Entity {
    id: EntityId,
    registry: Weak<Registry>,
}

impl Entity {
    /// The reserved id of entities that never refer to anything.
    pub const INVALID: EntityId = EntityId::INVALID;

    pub(crate) fn new(id: EntityId, registry: &Rc<Registry>) -> Self {
        Entity {
            id,
            registry: Rc::downgrade(registry),
        }
    }

    /// Returns the raw id.
    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns true if the owning manager is alive and the id has not been
    /// destroyed.
    #[inline]
    pub fn valid(&self) -> bool {
        self.live().is_some()
    }

    /// Assigns a component, replacing the current one if there is. Returns an
    /// invalid handle if this entity is invalid.
    pub fn assign<C: Component>(&self, value: C) -> ComponentHandle<C> {
        match self.live() {
            Some(registry) => {
                registry.assign(self.id, value);
                ComponentHandle::new(self.id, &registry)
            }
            None => ComponentHandle::default(),
        }
    }

    /// Assigns the default value of component `C`.
    #[inline]
    pub fn assign_default<C: Component + Default>(&self) -> ComponentHandle<C> {
        self.assign(C::default())
    }

    /// Returns a handle to component `C`. The handle is only valid while this
    /// entity has a `C`.
    pub fn component<C: Component>(&self) -> ComponentHandle<C> {
        match self.live() {
            Some(registry) => ComponentHandle::new(self.id, &registry),
            None => ComponentHandle::default(),
        }
    }

    /// Returns a copy of component `C`.
    pub fn get<C: Component + Clone>(&self) -> Option<C> {
        self.live()?.get::<C>(self.id)
    }

    /// Removes component `C`.
    pub fn remove<C: Component>(&self) {
        if let Some(registry) = self.live() {
            registry.remove::<C>(self.id);
        }
    }

    /// Returns true if this entity is valid and has component `C`.
    pub fn has_component<C: Component>(&self) -> bool {
        match self.live() {
            Some(registry) => registry.has::<C>(self.id),
            None => false,
        }
    }

    /// Destroys this entity and all of its components.
    pub fn destroy(&self) {
        if let Some(registry) = self.live() {
            registry.destroy(self.id);
        }
    }

    pub(crate) fn belongs_to(&self, registry: &Rc<Registry>) -> bool {
        self.registry.as_ptr() == Rc::as_ptr(registry)
    }

    fn live(&self) -> Option<Rc<Registry>> {
        if self.id.is_invalid() {
            return None;
        }

        let registry = self.registry.upgrade()?;
        if registry.valid(self.id) {
            Some(registry)
        } else {
            None
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Entity {
            id: EntityId::INVALID,
            registry: Weak::new(),
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.registry, &other.registry)
    }
}

impl Eq for Entity {}

impl PartialOrd for Entity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entity {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.registry.as_ptr() as usize;
        let rhs = other.registry.as_ptr() as usize;
        self.id.cmp(&other.id).then(lhs.cmp(&rhs))
    }
}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        (self.registry.as_ptr() as usize).hash(state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Entity({})", self.id)
    }
}

/// A typed accessor of component `C` of one entity.
///
/// The handle carries no copy of the value, each dereference resolves through
/// the storage again after checking that the entity is still alive and still
/// has a `C`. Two handles are equal if they refer to the same entity of the
/// same registry, whatever the values are.
pub struct ComponentHandle<C: Component> {
    id: EntityId,
    registry: Weak<Registry>,
    pool: Option<Rc<Pool<C>>>,
}

impl<C: Component> ComponentHandle<C> {
    pub(crate) fn new(id: EntityId, registry: &Rc<Registry>) -> Self {
        ComponentHandle {
            id,
            registry: Rc::downgrade(registry),
            pool: Some(registry.pool::<C>()),
        }
    }

    /// Returns the raw id of the owning entity.
    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns true if the entity is alive and has a `C`.
    pub fn valid(&self) -> bool {
        self.live().is_some()
    }

    /// Immutably borrows the component.
    ///
    /// The borrow lasts until the returned `Ref` exits scope. Fails if the
    /// handle is invalid or the component is mutably borrowed.
    pub fn get(&self) -> Result<Ref<C>> {
        let pool = self.pool()?;
        let set = pool.try_borrow().map_err(|_| self.borrowed())?;
        let id = self.id;
        Ref::filter_map(set, |v| v.get(id)).map_err(|_| Error::InvalidHandle(id))
    }

    /// Mutably borrows the component.
    ///
    /// The component of every other entity of the same type could not be
    /// borrowed until the returned `RefMut` exits scope.
    pub fn get_mut(&self) -> Result<RefMut<C>> {
        let pool = self.pool()?;
        let set = pool.try_borrow_mut().map_err(|_| self.borrowed())?;
        let id = self.id;
        RefMut::filter_map(set, |v| v.get_mut(id)).map_err(|_| Error::InvalidHandle(id))
    }

    /// Removes the component from its entity.
    pub fn remove(&self) -> Result<()> {
        let registry = self.live().ok_or(Error::InvalidHandle(self.id))?;
        registry.remove::<C>(self.id);
        Ok(())
    }

    /// Returns the owning entity.
    pub fn entity(&self) -> Result<Entity> {
        let registry = self.live().ok_or(Error::InvalidHandle(self.id))?;
        Ok(Entity::new(self.id, &registry))
    }

    fn pool(&self) -> Result<&Rc<Pool<C>>> {
        if self.live().is_none() {
            return Err(Error::InvalidHandle(self.id));
        }

        self.pool.as_ref().ok_or(Error::InvalidHandle(self.id))
    }

    fn borrowed(&self) -> Error {
        Error::ComponentBorrowed {
            id: self.id,
            component: any::type_name::<C>(),
        }
    }

    fn live(&self) -> Option<Rc<Registry>> {
        let registry = self.registry.upgrade()?;
        if registry.has::<C>(self.id) {
            Some(registry)
        } else {
            None
        }
    }
}

impl<C: Component> Default for ComponentHandle<C> {
    fn default() -> Self {
        ComponentHandle {
            id: EntityId::INVALID,
            registry: Weak::new(),
            pool: None,
        }
    }
}

impl<C: Component> Clone for ComponentHandle<C> {
    fn clone(&self) -> Self {
        ComponentHandle {
            id: self.id,
            registry: self.registry.clone(),
            pool: self.pool.clone(),
        }
    }
}

impl<C: Component> PartialEq for ComponentHandle<C> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.registry, &other.registry)
    }
}

impl<C: Component> Eq for ComponentHandle<C> {}

impl<C: Component> fmt::Debug for ComponentHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ComponentHandle<{}>({})", any::type_name::<C>(), self.id)
    }
}
