//! Systems, the per-frame logic running over entities and events.

use std::any::{self, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use failure;

use super::event::EventManager;
use super::manager::EntityManager;
use crate::errors::*;
use crate::utils::{Family, FamilyRegistry};

/// The frame time delta, in seconds.
pub type TimeDelta = f64;

/// A unit of logic identified by its type. Systems hold no entity state of
/// their own, they receive the shared managers on every call.
pub trait System: Any {
    /// Invoked exactly once, either by `SystemManager::configure` or on
    /// registration into an already configured manager.
    fn configure(
        &mut self,
        _: &EntityManager,
        _: &EventManager,
    ) -> ::std::result::Result<(), failure::Error> {
        Ok(())
    }

    /// Invoked once per frame.
    fn update(
        &mut self,
        entities: &EntityManager,
        events: &EventManager,
        dt: TimeDelta,
    ) -> ::std::result::Result<(), failure::Error>;
}

struct SystemEntry {
    name: &'static str,
    system: Rc<RefCell<dyn System>>,
    typed: Rc<dyn Any>,
    configured: bool,
}

/// Holds at most one system of each type, and drives them in registration
/// order.
pub struct SystemManager {
    entities: Rc<EntityManager>,
    events: Rc<EventManager>,
    families: FamilyRegistry,
    systems: Vec<SystemEntry>,
    lookup: HashMap<Family, usize>,
    initialized: bool,
}

impl SystemManager {
    /// Creates a new `SystemManager` driving systems over the given managers.
    pub fn new(entities: Rc<EntityManager>, events: Rc<EventManager>) -> Self {
        SystemManager {
            entities,
            events,
            families: FamilyRegistry::new(),
            systems: Vec::new(),
            lookup: HashMap::new(),
            initialized: false,
        }
    }

    /// Stores `system` and returns a shared reference to it.
    pub fn add<S: System>(&mut self, system: S) -> Result<Rc<RefCell<S>>> {
        self.adopt(Rc::new(RefCell::new(system)))
    }

    /// Stores an existing system instance. If the manager has been configured
    /// already, the system is configured right away.
    pub fn adopt<S: System>(&mut self, system: Rc<RefCell<S>>) -> Result<Rc<RefCell<S>>> {
        let name = any::type_name::<S>();
        let family = self.families.family::<S>();
        if self.lookup.contains_key(&family) {
            return Err(Error::SystemExists(name));
        }

        let mut entry = SystemEntry {
            name,
            system: system.clone(),
            typed: system.clone(),
            configured: false,
        };

        if self.initialized {
            self.configure_entry(&mut entry)?;
        }

        info!("[SystemManager] adds system {}.", name);
        self.lookup.insert(family, self.systems.len());
        self.systems.push(entry);
        Ok(system)
    }

    /// Returns the system of type `S`.
    pub fn system<S: System>(&self) -> Result<Rc<RefCell<S>>> {
        let name = any::type_name::<S>();
        let entry = self.entry::<S>().ok_or(Error::SystemNotFound(name))?;
        entry
            .typed
            .clone()
            .downcast::<RefCell<S>>()
            .map_err(|_| Error::SystemNotFound(name))
    }

    /// Configures every system in registration order. A failing system stops
    /// the pass, calling `configure` again resumes from it.
    pub fn configure(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyConfigured);
        }

        let mut systems = ::std::mem::replace(&mut self.systems, Vec::new());
        let result = systems
            .iter_mut()
            .filter(|v| !v.configured)
            .map(|v| self.configure_entry(v))
            .collect::<Result<Vec<_>>>();
        self.systems = systems;

        result?;
        self.initialized = true;
        info!("[SystemManager] configured {} systems.", self.systems.len());
        Ok(())
    }

    /// Returns true if `configure` has completed.
    #[inline]
    pub fn is_configured(&self) -> bool {
        self.initialized
    }

    /// Updates the system of type `S`.
    pub fn update<S: System>(&self, dt: TimeDelta) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotConfigured);
        }

        let entry = self
            .entry::<S>()
            .ok_or_else(|| Error::SystemNotFound(any::type_name::<S>()))?;
        self.run(entry, dt)
    }

    /// Updates every system in registration order. The first failure aborts
    /// the pass.
    pub fn update_all(&self, dt: TimeDelta) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotConfigured);
        }

        for entry in &self.systems {
            self.run(entry, dt)?;
        }

        Ok(())
    }

    /// Returns the number of registered systems.
    #[inline]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    fn entry<S: System>(&self) -> Option<&SystemEntry> {
        let family = self.families.get::<S>()?;
        let index = *self.lookup.get(&family)?;
        self.systems.get(index)
    }

    fn configure_entry(&self, entry: &mut SystemEntry) -> Result<()> {
        let name = entry.name;
        let mut system = entry
            .system
            .try_borrow_mut()
            .map_err(|_| Error::SystemBusy(name))?;

        system
            .configure(&self.entities, &self.events)
            .map_err(|error| Error::System { name, error })?;

        drop(system);
        entry.configured = true;
        debug!("[SystemManager] configured system {}.", name);
        Ok(())
    }

    fn run(&self, entry: &SystemEntry, dt: TimeDelta) -> Result<()> {
        let name = entry.name;
        let mut system = entry
            .system
            .try_borrow_mut()
            .map_err(|_| Error::SystemBusy(name))?;

        trace!("[SystemManager] updates system {}.", name);
        system
            .update(&self.entities, &self.events, dt)
            .map_err(|error| Error::System { name, error })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    struct Position(f64);

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    struct Velocity(f64);

    declare_component!(Position, Velocity);

    #[derive(Debug, Default)]
    struct Movement {
        configured: usize,
        updated: usize,
    }

    impl System for Movement {
        fn configure(
            &mut self,
            _: &EntityManager,
            _: &EventManager,
        ) -> ::std::result::Result<(), failure::Error> {
            self.configured += 1;
            Ok(())
        }

        fn update(
            &mut self,
            entities: &EntityManager,
            _: &EventManager,
            dt: TimeDelta,
        ) -> ::std::result::Result<(), failure::Error> {
            for (_, (p, v)) in entities.entities_with_handles::<(Position, Velocity)>() {
                let v = *v.get()?;
                p.get_mut()?.0 += v.0 * dt;
            }

            self.updated += 1;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl System for Broken {
        fn update(
            &mut self,
            _: &EntityManager,
            _: &EventManager,
            _: TimeDelta,
        ) -> ::std::result::Result<(), failure::Error> {
            Err(format_err!("broken"))
        }
    }

    fn managers() -> (Rc<EntityManager>, SystemManager) {
        let events = Rc::new(EventManager::new());
        let entities = Rc::new(EntityManager::new(events.clone()));
        let systems = SystemManager::new(entities.clone(), events);
        (entities, systems)
    }

    #[test]
    fn basic() {
        let (entities, mut systems) = managers();
        let e = entities
            .build()
            .with(Position(1.0))
            .with(Velocity(2.0))
            .finish();

        let movement = systems.add(Movement::default()).unwrap();
        assert_eq!(systems.len(), 1);

        match systems.update_all(0.5) {
            Err(Error::NotConfigured) => {}
            _ => panic!("update before configure must fail"),
        }

        systems.configure().unwrap();
        match systems.configure() {
            Err(Error::AlreadyConfigured) => {}
            _ => panic!("configure twice must fail"),
        }

        systems.update::<Movement>(0.5).unwrap();
        systems.update_all(0.5).unwrap();
        assert_eq!(e.get::<Position>(), Some(Position(3.0)));
        assert_eq!(movement.borrow().configured, 1);
        assert_eq!(movement.borrow().updated, 2);
        assert!(Rc::ptr_eq(&movement, &systems.system::<Movement>().unwrap()));
    }

    #[test]
    fn registration() {
        let (_, mut systems) = managers();
        systems.add(Movement::default()).unwrap();

        match systems.add(Movement::default()) {
            Err(Error::SystemExists(_)) => {}
            _ => panic!("duplicated system must be rejected"),
        }

        match systems.system::<Broken>() {
            Err(Error::SystemNotFound(_)) => {}
            _ => panic!("missing system must not be found"),
        }

        systems.configure().unwrap();
        match systems.update::<Broken>(0.0) {
            Err(Error::SystemNotFound(_)) => {}
            _ => panic!("missing system must not be updated"),
        }

        let late = Rc::new(RefCell::new(Movement::default()));
        systems.adopt(late.clone()).unwrap_err();

        let (_, mut systems) = managers();
        systems.configure().unwrap();
        systems.adopt(late.clone()).unwrap();
        assert_eq!(late.borrow().configured, 1);
    }

    #[test]
    fn aborts() {
        let (_, mut systems) = managers();
        systems.add(Broken).unwrap();
        let movement = systems.add(Movement::default()).unwrap();
        systems.configure().unwrap();

        match systems.update_all(0.0) {
            Err(Error::System { .. }) => {}
            _ => panic!("failing system must abort the update"),
        }

        assert_eq!(movement.borrow().updated, 0);
    }

    #[test]
    fn busy() {
        let (_, mut systems) = managers();
        let movement = systems.add(Movement::default()).unwrap();
        systems.configure().unwrap();

        let _guard = movement.borrow_mut();
        match systems.update::<Movement>(0.0) {
            Err(Error::SystemBusy(_)) => {}
            _ => panic!("borrowed system must not be updated"),
        };
    }
}
