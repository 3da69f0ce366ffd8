//! Kernel configuration.

use knell_core::{ConfigError, VirtualTime};
use knell_registry::RegistryConfig;

/// Configuration for a [`Kernel`](crate::Kernel).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelConfig {
    /// Registry configuration (root container, id watermark).
    pub registry: RegistryConfig,
    /// Initial virtual time. Non-zero when resuming a recorded run
    /// mid-stream.
    pub start_time: VirtualTime,
    /// First sequence number handed out. Must be at least 1; raise it
    /// when continuing from a run whose counter had advanced.
    pub first_sequence: u64,
}

impl KernelConfig {
    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.registry.validate()?;
        if self.first_sequence == 0 {
            return Err(ConfigError::ZeroFirstSequence);
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            start_time: VirtualTime::ZERO,
            first_sequence: 1,
        }
    }
}
