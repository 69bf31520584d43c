use crate::utils::EntityId;

/// Errors of control-plane misuse. Operations on invalid entities never fail,
/// they are silent no-ops.
#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "Component handle of {} is invalid.", _0)]
    InvalidHandle(EntityId),
    #[fail(display = "Component {} of {} is already borrowed.", component, id)]
    ComponentBorrowed {
        id: EntityId,
        component: &'static str,
    },
    #[fail(display = "System {} has not been added.", _0)]
    SystemNotFound(&'static str),
    #[fail(display = "System {} has already been added.", _0)]
    SystemExists(&'static str),
    #[fail(display = "System {} is already running.", _0)]
    SystemBusy(&'static str),
    #[fail(display = "SystemManager::configure() not called.")]
    NotConfigured,
    #[fail(display = "SystemManager::configure() has already been called.")]
    AlreadyConfigured,
    #[fail(display = "System {} failed: {}", name, error)]
    System {
        name: &'static str,
        error: failure::Error,
    },
}

pub type Result<T> = ::std::result::Result<T, Error>;
