//! Registry configuration.

use knell_core::{ConfigError, EntityId};

/// Configuration for a [`Registry`](crate::Registry).
///
/// The id space is split at `first_dynamic_id`: ids below the watermark
/// form the well-known pool assigned via
/// [`register_with_id`](crate::Registry::register_with_id), ids at or
/// above it are handed out by the dynamic allocator and never reused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Id of the root container. Must be in the well-known pool.
    pub root_id: EntityId,
    /// Name assigned to the root container.
    pub root_name: String,
    /// First id the dynamic allocator hands out.
    pub first_dynamic_id: EntityId,
}

impl RegistryConfig {
    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.first_dynamic_id.get() == 0 {
            return Err(ConfigError::ZeroDynamicWatermark);
        }
        if self.root_id >= self.first_dynamic_id {
            return Err(ConfigError::RootInDynamicRange {
                root: self.root_id,
                first_dynamic: self.first_dynamic_id,
            });
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    /// Root container at id 1, dynamic ids from 4096 up.
    fn default() -> Self {
        Self {
            root_id: EntityId(1),
            root_name: "root".to_owned(),
            first_dynamic_id: EntityId(4096),
        }
    }
}
