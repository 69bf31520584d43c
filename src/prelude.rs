pub use crate::ecs::{
    Component, ComponentAddedEvent, ComponentHandle, ComponentRemovedEvent, Entity,
    EntityManager, EventManager, Receiver, System, SystemManager, TimeDelta,
};
pub use crate::errors::Error;
pub use crate::settings::Settings;
pub use crate::utils::EntityId;
pub use crate::EntityX;
