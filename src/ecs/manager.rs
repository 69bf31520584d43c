//! The `EntityManager`, sole authority over entities and their components.

use std::any::{self, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::component::Component;
use super::entity::{ComponentHandle, Entity};
use super::event::{EventManager, LifecycleEvent, Receiver};
use super::view::{ComponentSet, ComponentView, View};
use crate::registry::{ListenerId, Registry};
use crate::settings::Settings;
use crate::utils::EntityId;

/// Creates and destroys entities, attaches and detaches components, builds
/// views and turns storage lifecycle signals into typed events.
pub struct EntityManager {
    registry: Rc<Registry>,
    events: Rc<EventManager>,
    bridges: RefCell<HashMap<TypeId, ListenerId>>,
}

impl EntityManager {
    /// Creates a new `EntityManager` publishing lifecycle events on `events`.
    pub fn new(events: Rc<EventManager>) -> Self {
        EntityManager::with_settings(events, &Settings::default())
    }

    /// Creates a new `EntityManager` with pre-sized storage.
    pub fn with_settings(events: Rc<EventManager>, settings: &Settings) -> Self {
        EntityManager {
            registry: Rc::new(Registry::with_capacity(
                settings.entity_capacity,
                settings.component_capacity,
            )),
            events,
            bridges: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the underlying storage engine.
    #[inline]
    pub fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    /// Returns the event bus lifecycle events are published on.
    #[inline]
    pub fn events(&self) -> &Rc<EventManager> {
        &self.events
    }

    /// Creates and returns a new entity.
    pub fn create_entity(&self) -> Entity {
        let id = self.registry.create();
        Entity::new(id, &self.registry)
    }

    /// Starts building a new entity with components.
    pub fn build(&self) -> EntityBuilder {
        EntityBuilder {
            entity: self.create_entity(),
        }
    }

    /// Wraps a raw id without checking it, call `valid` afterwards.
    #[inline]
    pub fn get_entity(&self, id: EntityId) -> Entity {
        Entity::new(id, &self.registry)
    }

    /// Returns true if `entity` was created by this manager and is alive.
    pub fn valid(&self, entity: &Entity) -> bool {
        self.owns(entity) && entity.valid()
    }

    /// Returns the number of alive entities.
    #[inline]
    pub fn size(&self) -> usize {
        self.registry.size()
    }

    /// Returns all alive entities.
    pub fn entities(&self) -> Vec<Entity> {
        self.registry
            .entities()
            .into_iter()
            .map(|id| Entity::new(id, &self.registry))
            .collect()
    }

    /// Assigns a component to `entity`, see `Entity::assign`.
    pub fn assign<C: Component>(&self, entity: &Entity, value: C) -> ComponentHandle<C> {
        if !self.owns(entity) {
            return ComponentHandle::default();
        }

        entity.assign(value)
    }

    /// Removes component `C` from `entity`.
    pub fn remove<C: Component>(&self, entity: &Entity) {
        if self.owns(entity) {
            entity.remove::<C>();
        }
    }

    /// Returns true if `entity` is alive and has a `C`.
    pub fn has_component<C: Component>(&self, entity: &Entity) -> bool {
        self.owns(entity) && entity.has_component::<C>()
    }

    /// Returns a handle to component `C` of `entity`.
    pub fn component<C: Component>(&self, entity: &Entity) -> ComponentHandle<C> {
        if !self.owns(entity) {
            return ComponentHandle::default();
        }

        entity.component::<C>()
    }

    /// Destroys `entity` and all of its components. Every component publishes
    /// its removal in ascending order of the first use of its type; do not rely
    /// on that order across component types.
    pub fn destroy(&self, entity: &Entity) {
        if self.owns(entity) {
            entity.destroy();
        }
    }

    /// Returns a view over the entities that have every component of `Q`.
    ///
    /// ```
    /// # #[macro_use] extern crate entwrap;
    /// # use entwrap::prelude::*;
    /// # #[derive(Clone, Copy)] struct Position(f32);
    /// # #[derive(Clone, Copy)] struct Velocity(f32);
    /// # declare_component!(Position, Velocity);
    /// # fn main() {
    /// let ecs = EntityX::new();
    /// let e = ecs.entities.create_entity();
    /// e.assign(Position(0.0));
    /// e.assign(Velocity(1.0));
    ///
    /// for entity in ecs.entities.entities_with_components::<(Position, Velocity)>() {
    ///     assert_eq!(entity, e);
    /// }
    /// # }
    /// ```
    pub fn entities_with_components<Q: ComponentSet>(&self) -> View<Q> {
        View::new(&self.registry)
    }

    /// Returns a view that also yields the handles of `Q` of every matched
    /// entity, resolved again at every step.
    pub fn entities_with_handles<Q: ComponentSet>(&self) -> ComponentView<Q> {
        View::new(&self.registry).with_handles()
    }

    /// Subscribes `receiver` to a component lifecycle event, installing the
    /// storage callback that produces it if needed. Only mutations made after
    /// this call are notified.
    pub fn subscribe<E, R>(&self, receiver: &Rc<RefCell<R>>)
    where
        E: LifecycleEvent,
        R: Receiver<E> + 'static,
    {
        self.events.subscribe::<E, R>(receiver);

        let mut bridges = self.bridges.borrow_mut();
        if bridges.contains_key(&TypeId::of::<E>()) {
            return;
        }

        let registry = Rc::downgrade(&self.registry);
        let events = Rc::downgrade(&self.events);
        let listener = self
            .registry
            .sink::<E::Component>(E::LIFECYCLE)
            .connect(move |id| {
                if let (Some(registry), Some(events)) = (registry.upgrade(), events.upgrade()) {
                    let entity = Entity::new(id, &registry);
                    let component = ComponentHandle::<E::Component>::new(id, &registry);
                    events.emit(E::new(entity, component));
                }
            });

        debug!(
            "[EntityManager] bridges {:?} of {} into {}.",
            E::LIFECYCLE,
            any::type_name::<E::Component>(),
            any::type_name::<E>()
        );

        bridges.insert(TypeId::of::<E>(), listener);
    }

    /// Unsubscribes `receiver` from a component lifecycle event. The storage
    /// callback is removed once the event has no receivers left.
    pub fn unsubscribe<E, R>(&self, receiver: &Rc<RefCell<R>>)
    where
        E: LifecycleEvent,
        R: Receiver<E> + 'static,
    {
        self.events.unsubscribe::<E, R>(receiver);
        if self.events.subscribers::<E>() > 0 {
            return;
        }

        if let Some(listener) = self.bridges.borrow_mut().remove(&TypeId::of::<E>()) {
            self.registry
                .sink::<E::Component>(E::LIFECYCLE)
                .disconnect(listener);

            debug!(
                "[EntityManager] removes the bridge of {}.",
                any::type_name::<E>()
            );
        }
    }

    #[inline]
    fn owns(&self, entity: &Entity) -> bool {
        entity.belongs_to(&self.registry)
    }
}

/// Help to create entity with components.
pub struct EntityBuilder {
    entity: Entity,
}

impl EntityBuilder {
    /// Assigns a component.
    pub fn with<C: Component>(self, value: C) -> Self {
        self.entity.assign(value);
        self
    }

    /// Assigns the default value of a component.
    pub fn with_default<C: Component + Default>(self) -> Self {
        self.entity.assign_default::<C>();
        self
    }

    /// Returns the built entity.
    pub fn finish(self) -> Entity {
        self.entity
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecs::event::{ComponentAddedEvent, ComponentRemovedEvent};

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }

    declare_component!(Position);

    #[derive(Default)]
    struct Counter {
        added: usize,
        removed: usize,
    }

    impl Receiver<ComponentAddedEvent<Position>> for Counter {
        fn receive(&mut self, _: &ComponentAddedEvent<Position>) {
            self.added += 1;
        }
    }

    impl Receiver<ComponentRemovedEvent<Position>> for Counter {
        fn receive(&mut self, _: &ComponentRemovedEvent<Position>) {
            self.removed += 1;
        }
    }

    #[test]
    fn foreign_entity() {
        let m1 = EntityManager::new(Rc::new(EventManager::new()));
        let m2 = EntityManager::new(Rc::new(EventManager::new()));

        let e = m1.create_entity();
        assert!(m1.valid(&e));
        assert!(!m2.valid(&e));
        assert!(!m2.assign(&e, Position::default()).valid());
        assert!(!e.has_component::<Position>());

        m2.destroy(&e);
        assert!(e.valid());
    }

    #[test]
    fn bridges() {
        let entities = EntityManager::new(Rc::new(EventManager::new()));
        let c1 = Rc::new(RefCell::new(Counter::default()));
        let c2 = Rc::new(RefCell::new(Counter::default()));

        entities.subscribe::<ComponentAddedEvent<Position>, _>(&c1);
        entities.subscribe::<ComponentAddedEvent<Position>, _>(&c2);
        assert_eq!(entities.registry().construction::<Position>().len(), 1);

        entities.build().with_default::<Position>().finish();
        assert_eq!(c1.borrow().added, 1);
        assert_eq!(c2.borrow().added, 1);

        entities.unsubscribe::<ComponentAddedEvent<Position>, _>(&c1);
        assert_eq!(entities.registry().construction::<Position>().len(), 1);
        entities.unsubscribe::<ComponentAddedEvent<Position>, _>(&c2);
        assert!(entities.registry().construction::<Position>().is_empty());

        entities.subscribe::<ComponentRemovedEvent<Position>, _>(&c1);
        let e = entities.build().with_default::<Position>().finish();
        entities.destroy(&e);
        assert_eq!(c1.borrow().added, 1);
        assert_eq!(c1.borrow().removed, 1);
    }

    #[test]
    fn entities() {
        let entities = EntityManager::with_settings(
            Rc::new(EventManager::new()),
            &Settings {
                entity_capacity: 16,
                component_capacity: 16,
            },
        );

        let v: Vec<_> = (0..4).map(|_| entities.create_entity()).collect();
        v[1].destroy();
        assert_eq!(entities.size(), 3);
        assert_eq!(entities.entities(), vec![v[0].clone(), v[2].clone(), v[3].clone()]);
        assert_eq!(entities.get_entity(v[2].id()), v[2]);
        assert!(!entities.get_entity(v[1].id()).valid());
    }
}
