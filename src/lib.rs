//! A thin, type-safe entity component system.
//!
//! Entities are bags of components, `View`s enumerate the entities holding a
//! set of component types, events are delivered synchronously or through a
//! deferred queue, and systems run per-frame logic over both.
//!
//! ```
//! # #[macro_use] extern crate entwrap;
//! use entwrap::prelude::*;
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! struct Position(f32, f32);
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! struct Velocity(f32, f32);
//!
//! declare_component!(Position, Velocity);
//!
//! # fn main() {
//! let ecs = EntityX::new();
//! let e = ecs
//!     .entities
//!     .build()
//!     .with(Position(0.0, 0.0))
//!     .with(Velocity(1.0, 2.0))
//!     .finish();
//!
//! for (_, (p, v)) in ecs.entities.entities_with_handles::<(Position, Velocity)>() {
//!     let v = *v.get().unwrap();
//!     let mut p = p.get_mut().unwrap();
//!     p.0 += v.0;
//!     p.1 += v.1;
//! }
//!
//! assert_eq!(e.get::<Position>(), Some(Position(1.0, 2.0)));
//! # }
//! ```

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

#[macro_use]
pub mod ecs;
pub mod errors;
pub mod prelude;
pub mod registry;
pub mod settings;
pub mod utils;

use std::rc::Rc;

use self::ecs::{EntityManager, EventManager, SystemManager};
use self::settings::Settings;

/// Aggregates the three managers of a world, sharing one `EventManager` and
/// one `EntityManager` between them.
pub struct EntityX {
    pub events: Rc<EventManager>,
    pub entities: Rc<EntityManager>,
    pub systems: SystemManager,
}

impl EntityX {
    pub fn new() -> Self {
        EntityX::with_settings(&Settings::default())
    }

    pub fn with_settings(settings: &Settings) -> Self {
        let events = Rc::new(EventManager::new());
        let entities = Rc::new(EntityManager::with_settings(events.clone(), settings));
        let systems = SystemManager::new(entities.clone(), events.clone());

        info!("[EntityX] creates with {:?}.", settings);
        EntityX {
            events,
            entities,
            systems,
        }
    }
}

impl Default for EntityX {
    fn default() -> Self {
        EntityX::new()
    }
}
