//! Entity Component System (ECS)
//!
//! The `EntityManager` owns entities and their components, `View`s enumerate
//! the entities holding a set of components, the `EventManager` carries typed
//! events (including component lifecycle events) and the `SystemManager`
//! drives per-frame logic.

#[macro_use]
pub mod component;
pub mod entity;
pub mod event;
pub mod manager;
pub mod system;
pub mod view;

pub use self::component::Component;
pub use self::entity::{ComponentHandle, Entity};
pub use self::event::{
    ComponentAddedEvent, ComponentRemovedEvent, EventManager, LifecycleEvent, Receiver,
};
pub use self::manager::{EntityBuilder, EntityManager};
pub use self::system::{System, SystemManager, TimeDelta};
pub use self::view::{ComponentIter, ComponentSet, ComponentView, EntityIter, View};
