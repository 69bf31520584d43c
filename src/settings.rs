//! Storage configuration.

/// A structure containing the capacity hints used to pre-size the storage.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// The number of entity slots reserved up front.
    pub entity_capacity: usize,
    /// The number of slots reserved in every component pool on its creation.
    pub component_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            entity_capacity: 1024,
            component_capacity: 256,
        }
    }
}
