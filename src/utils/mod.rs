//! Commonly used utilities like ids, id pools and family registries.

pub mod family;
pub mod handle;
pub mod handle_pool;

pub use self::family::{Family, FamilyRegistry};
pub use self::handle::{EntityId, HandleIndex};
pub use self::handle_pool::HandlePool;
