//! The component storage engine.
//!
//! `Registry` owns entity ids, one packed `SparseSet` per component type,
//! per-entity component masks and the persistent groups used by multi-component
//! views. It is the only place that mutates storage, and it publishes the
//! construction/destruction signals of a component type synchronously from the
//! mutating call, never while holding a borrow of its own storage.
//!
//! All methods take `&self`, storage is guarded by `RefCell`s. Mutating a
//! component pool while a guard into that pool is still alive panics.

pub mod bitset;
pub mod group;
pub mod signal;
pub mod sparse_set;

pub use self::signal::{Lifecycle, Listener, ListenerId, Sink};
pub use self::sparse_set::SparseSet;

use std::any::{self, Any};
use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use self::bitset::DynamicBitSet;
use self::group::Group;
use self::signal::Signals;
use crate::ecs::Component;
use crate::utils::{EntityId, Family, FamilyRegistry, HandlePool};

/// Packed storage of component `T`, shared with component handles.
pub type Pool<T> = RefCell<SparseSet<T>>;

/// Type-erased access to a packed id set, used for destruction and enumeration.
#[doc(hidden)]
pub trait ErasedPool {
    /// Drops the value of `id`, returns false if there was none.
    fn erase(&self, id: EntityId) -> bool;
    fn len(&self) -> usize;
    fn id_at(&self, pos: usize) -> Option<EntityId>;
}

impl<T: 'static> ErasedPool for Pool<T> {
    fn erase(&self, id: EntityId) -> bool {
        let removed = mutate(self, any::type_name::<T>()).remove(id);
        removed.is_some()
    }

    #[inline]
    fn len(&self) -> usize {
        self.borrow().len()
    }

    #[inline]
    fn id_at(&self, pos: usize) -> Option<EntityId> {
        self.borrow().id_at(pos)
    }
}

fn mutate<'a, T>(pool: &'a Pool<T>, name: &str) -> RefMut<'a, SparseSet<T>> {
    match pool.try_borrow_mut() {
        Ok(v) => v,
        Err(_) => panic!(
            "Tried to mutate the storage of {} while one of its components is borrowed.",
            name
        ),
    }
}

struct PoolEntry {
    typed: Rc<dyn Any>,
    erased: Rc<dyn ErasedPool>,
}

/// The storage engine: entity ids, packed component pools and lifecycle signals.
pub struct Registry {
    entities: RefCell<HandlePool>,
    masks: RefCell<Vec<DynamicBitSet>>,
    families: RefCell<FamilyRegistry>,
    pools: RefCell<Vec<PoolEntry>>,
    groups: RefCell<Vec<Group>>,
    construction: Signals,
    destruction: Signals,
    component_capacity: usize,
}

impl Registry {
    /// Constructs a new empty `Registry`.
    pub fn new() -> Self {
        Registry::with_capacity(0, 0)
    }

    /// Constructs a new empty `Registry`, reserving room for `entities` ids and
    /// `components` values in every component pool.
    pub fn with_capacity(entities: usize, components: usize) -> Self {
        Registry {
            entities: RefCell::new(HandlePool::with_capacity(entities)),
            masks: RefCell::new(Vec::with_capacity(entities)),
            families: RefCell::new(FamilyRegistry::new()),
            pools: RefCell::new(Vec::new()),
            groups: RefCell::new(Vec::new()),
            construction: Signals::default(),
            destruction: Signals::default(),
            component_capacity: components,
        }
    }

    /// Creates and returns a unused entity id.
    pub fn create(&self) -> EntityId {
        let id = self.entities.borrow_mut().create();

        let mut masks = self.masks.borrow_mut();
        let index = id.index() as usize;
        if masks.len() <= index {
            masks.resize(index + 1, DynamicBitSet::new());
        }

        trace!("[Registry] creates {}.", id);
        id
    }

    /// Returns true if `id` was created by this registry and has not been
    /// destroyed yet.
    #[inline]
    pub fn valid(&self, id: EntityId) -> bool {
        !id.is_invalid() && self.entities.borrow().is_alive(id)
    }

    /// Returns the number of alive entities.
    #[inline]
    pub fn size(&self) -> usize {
        self.entities.borrow().len()
    }

    /// Returns the ids of all alive entities.
    pub fn entities(&self) -> Vec<EntityId> {
        self.entities.borrow().iter().collect()
    }

    /// Destroys `id` and recycles its index. Components are removed one by one
    /// in ascending family order, each publishing its destruction signal before
    /// the value is dropped.
    pub fn destroy(&self, id: EntityId) {
        if !self.valid(id) {
            return;
        }

        let families: Vec<Family> = self.masks.borrow()[id.index() as usize].iter().collect();
        for family in families {
            self.erase(family, id, true);
        }

        if !self.entities.borrow_mut().free(id) {
            // A destruction listener has destroyed it already.
            return;
        }

        // Anything assigned by a listener while tearing down is dropped silently.
        let leftovers: Vec<Family> = self.masks.borrow()[id.index() as usize].iter().collect();
        for family in leftovers {
            self.erase(family, id, false);
        }

        trace!("[Registry] destroys {}.", id);
    }

    /// Returns the family of component `C`, registering a pool on first use.
    pub fn family<C: Component>(&self) -> Family {
        if let Some(family) = self.families.borrow().get::<C>() {
            return family;
        }

        let family = self.families.borrow_mut().family::<C>();
        let pool: Rc<Pool<C>> = Rc::new(RefCell::new(SparseSet::with_capacity(
            self.component_capacity,
        )));

        self.pools.borrow_mut().push(PoolEntry {
            typed: pool.clone(),
            erased: pool,
        });

        self.construction.reserve(family);
        self.destruction.reserve(family);

        debug!(
            "[Registry] registers component {} as family {}.",
            any::type_name::<C>(),
            family
        );

        family
    }

    /// Returns the packed storage of component `C`.
    pub fn pool<C: Component>(&self) -> Rc<Pool<C>> {
        let family = self.family::<C>();
        let typed = self.pools.borrow()[family].typed.clone();
        match typed.downcast::<Pool<C>>() {
            Ok(pool) => pool,
            Err(_) => unreachable!("family {} is not a pool of {}", family, any::type_name::<C>()),
        }
    }

    /// Adds component to entity. If the entity already had a `C`, the value is
    /// replaced in place and the old value is returned, no signal is published.
    /// Otherwise the construction signal of `C` is published once the value is
    /// stored.
    pub fn assign<C: Component>(&self, id: EntityId, value: C) -> Option<C> {
        if !self.valid(id) {
            debug!("[Registry] ignores assignment to dead {}.", id);
            return None;
        }

        let family = self.family::<C>();
        let pool = self.pool::<C>();
        let replaced = mutate(&pool, any::type_name::<C>()).insert(id, value);
        if replaced.is_some() {
            return replaced;
        }

        self.attach(family, id);
        self.construction.publish(family, id);
        None
    }

    /// Removes component `C` of entity, publishing the destruction signal of `C`
    /// before the value is taken out of storage.
    pub fn remove<C: Component>(&self, id: EntityId) -> Option<C> {
        if !self.has::<C>(id) {
            return None;
        }

        let family = self.family::<C>();
        self.destruction.publish(family, id);

        if !self.has_family(id, family) {
            return None;
        }

        self.detach(family, id);
        let pool = self.pool::<C>();
        let removed = mutate(&pool, any::type_name::<C>()).remove(id);
        removed
    }

    /// Returns true if entity is alive and has component `C`.
    #[inline]
    pub fn has<C: Component>(&self, id: EntityId) -> bool {
        let family = self.families.borrow().get::<C>();
        match family {
            Some(family) => self.has_family(id, family),
            None => false,
        }
    }

    /// Returns a copy of component `C` of entity.
    pub fn get<C: Component + Clone>(&self, id: EntityId) -> Option<C> {
        if !self.has::<C>(id) {
            return None;
        }

        let pool = self.pool::<C>();
        let set = pool.try_borrow().ok()?;
        set.get(id).cloned()
    }

    /// Returns the sink of the construction signal of `C`.
    pub fn construction<C: Component>(&self) -> Sink {
        self.sink::<C>(Lifecycle::Construction)
    }

    /// Returns the sink of the destruction signal of `C`.
    pub fn destruction<C: Component>(&self) -> Sink {
        self.sink::<C>(Lifecycle::Destruction)
    }

    /// Returns the sink of `C` for the given side of its lifetime.
    pub fn sink<C: Component>(&self, lifecycle: Lifecycle) -> Sink {
        let family = self.family::<C>();
        let signals = match lifecycle {
            Lifecycle::Construction => &self.construction,
            Lifecycle::Destruction => &self.destruction,
        };

        Sink { signals, family }
    }

    /// Returns the persistent set of entities holding every family of
    /// `families`, creating and seeding it on first request. A family that has
    /// not been registered yet matches no entity until it is.
    pub fn persistent(&self, families: &[Family]) -> Rc<Pool<()>> {
        let signature = group::signature(families);
        if let Some(group) = self
            .groups
            .borrow()
            .iter()
            .find(|v| v.signature == signature)
        {
            return group.set.clone();
        }

        let group = Group::new(signature);
        {
            let masks = self.masks.borrow();
            let pools = self.pools.borrow();
            let mut set = group.set.borrow_mut();

            let sources: Option<Vec<_>> = group
                .signature
                .iter()
                .map(|v| pools.get(*v).map(|p| &p.erased))
                .collect();

            let smallest = sources.and_then(|v| v.into_iter().min_by_key(|p| p.len()));
            if let Some(pool) = smallest {
                for pos in 0..pool.len() {
                    if let Some(id) = pool.id_at(pos) {
                        if masks[id.index() as usize].is_superset(&group.mask) {
                            set.insert(id, ());
                        }
                    }
                }
            }
        }

        debug!(
            "[Registry] creates persistent group {:?} with {} entities.",
            &group.signature[..],
            group.set.borrow().len()
        );

        let set = group.set.clone();
        self.groups.borrow_mut().push(group);
        set
    }

    pub(crate) fn enumerate<C: Component>(&self) -> Rc<dyn ErasedPool> {
        let family = self.family::<C>();
        self.pools.borrow()[family].erased.clone()
    }

    pub(crate) fn enumerate_persistent(&self, families: &[Family]) -> Rc<dyn ErasedPool> {
        self.persistent(families)
    }

    #[inline]
    fn has_family(&self, id: EntityId, family: Family) -> bool {
        self.valid(id) && self.masks.borrow()[id.index() as usize].contains(family)
    }

    fn erase(&self, family: Family, id: EntityId, publish: bool) {
        if !self.masks.borrow()[id.index() as usize].contains(family) {
            return;
        }

        if publish {
            self.destruction.publish(family, id);
            if !self.has_family(id, family) {
                return;
            }
        }

        self.detach(family, id);
        let pool = self.pools.borrow()[family].erased.clone();
        pool.erase(id);
    }

    fn attach(&self, family: Family, id: EntityId) {
        let mut masks = self.masks.borrow_mut();
        let mask = &mut masks[id.index() as usize];
        mask.insert(family);

        for group in self.groups.borrow().iter() {
            if group.watches(family) && mask.is_superset(&group.mask) {
                group.set.borrow_mut().insert(id, ());
            }
        }
    }

    fn detach(&self, family: Family, id: EntityId) {
        self.masks.borrow_mut()[id.index() as usize].remove(family);

        for group in self.groups.borrow().iter() {
            if group.watches(family) {
                group.set.borrow_mut().remove(id);
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity {
        x: i32,
        y: i32,
    }

    declare_component!(Position, Velocity);

    #[test]
    fn basic() {
        let registry = Registry::new();
        let e1 = registry.create();
        assert!(registry.valid(e1));
        assert!(!registry.has::<Position>(e1));

        assert_eq!(registry.assign(e1, Position { x: 1, y: 2 }), None);
        assert!(registry.has::<Position>(e1));
        assert_eq!(registry.get::<Position>(e1), Some(Position { x: 1, y: 2 }));

        assert_eq!(
            registry.assign(e1, Position { x: 2, y: 4 }),
            Some(Position { x: 1, y: 2 })
        );

        assert_eq!(registry.remove::<Position>(e1), Some(Position { x: 2, y: 4 }));
        assert!(!registry.has::<Position>(e1));
        assert_eq!(registry.remove::<Position>(e1), None);
    }

    #[test]
    fn destroy() {
        let registry = Registry::new();
        let e1 = registry.create();
        registry.assign(e1, Position { x: 1, y: 2 });
        registry.assign(e1, Velocity { x: 1, y: 2 });

        registry.destroy(e1);
        assert!(!registry.valid(e1));
        assert!(!registry.has::<Position>(e1));
        assert_eq!(registry.pool::<Position>().borrow().len(), 0);
        assert_eq!(registry.pool::<Velocity>().borrow().len(), 0);

        let e2 = registry.create();
        assert_eq!(e2.index(), e1.index());
        assert!(!registry.has::<Position>(e2));
        assert_eq!(registry.assign(e1, Position { x: 0, y: 0 }), None);
        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn signals() {
        let registry = Registry::new();
        let added = Rc::new(Cell::new(0));
        let removed = Rc::new(Cell::new(0));

        let a = added.clone();
        let id = registry.construction::<Position>().connect(move |_| a.set(a.get() + 1));
        let r = removed.clone();
        registry.destruction::<Position>().connect(move |_| r.set(r.get() + 1));

        let e1 = registry.create();
        registry.assign(e1, Position { x: 1, y: 2 });
        registry.assign(e1, Position { x: 1, y: 2 });
        assert_eq!(added.get(), 1);

        registry.destroy(e1);
        assert_eq!(removed.get(), 1);

        assert!(registry.construction::<Position>().disconnect(id));
        let e2 = registry.create();
        registry.assign(e2, Position { x: 1, y: 2 });
        assert_eq!(added.get(), 1);
    }

    #[test]
    fn destruction_sees_value() {
        let registry = Rc::new(Registry::new());
        let seen = Rc::new(Cell::new(None));

        let (r, s) = (Rc::downgrade(&registry), seen.clone());
        registry.destruction::<Position>().connect(move |id| {
            let registry = r.upgrade().unwrap();
            s.set(registry.get::<Position>(id));
        });

        let e1 = registry.create();
        registry.assign(e1, Position { x: 3, y: 4 });
        registry.remove::<Position>(e1);
        assert_eq!(seen.get(), Some(Position { x: 3, y: 4 }));
    }

    #[test]
    fn persistent() {
        let registry = Registry::new();
        let fp = registry.family::<Position>();
        let fv = registry.family::<Velocity>();

        let e1 = registry.create();
        registry.assign(e1, Velocity { x: 1, y: 1 });
        registry.assign(e1, Position { x: 0, y: 0 });
        let e2 = registry.create();
        registry.assign(e2, Position { x: 5, y: 5 });

        let set = registry.persistent(&[fp, fv]);
        assert_eq!(set.borrow().ids(), &[e1]);
        assert!(Rc::ptr_eq(&set, &registry.persistent(&[fv, fp])));

        registry.assign(e2, Velocity { x: 1, y: 1 });
        assert_eq!(set.borrow().len(), 2);

        registry.remove::<Velocity>(e1);
        assert_eq!(set.borrow().ids(), &[e2]);

        registry.destroy(e2);
        assert!(set.borrow().is_empty());
    }

    #[test]
    fn persistent_unregistered() {
        let registry = Registry::new();
        let fp = registry.family::<Position>();

        let e1 = registry.create();
        registry.assign(e1, Position { x: 0, y: 0 });

        let set = registry.persistent(&[fp, fp + 1]);
        assert!(set.borrow().is_empty());

        let fv = registry.family::<Velocity>();
        assert_eq!(fv, fp + 1);
        registry.assign(e1, Velocity { x: 1, y: 1 });
        assert_eq!(set.borrow().ids(), &[e1]);
        assert!(Rc::ptr_eq(&set, &registry.persistent(&[fv, fp])));
    }

    #[test]
    #[should_panic]
    fn mutate_while_borrowed() {
        let registry = Registry::new();
        let e1 = registry.create();
        registry.assign(e1, Position { x: 1, y: 2 });

        let pool = registry.pool::<Position>();
        let _guard = pool.borrow();
        let e2 = registry.create();
        registry.assign(e2, Position { x: 1, y: 2 });
    }
}
