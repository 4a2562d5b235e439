//! Engine timeouts.

use std::time::Duration;

use serde::Deserialize;

/// Deadlines for collaborator calls.
///
/// An expired deadline is treated exactly like a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deadline for each validation call (overlap check, building
    /// detection), in milliseconds.
    pub validation_timeout_ms: u64,
    /// Deadline for a create/update call, in milliseconds.
    pub save_timeout_ms: u64,
}

impl EngineConfig {
    /// Validation call deadline.
    #[must_use]
    pub const fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }

    /// Save call deadline.
    #[must_use]
    pub const fn save_timeout(&self) -> Duration {
        Duration::from_millis(self.save_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validation_timeout_ms: 20_000,
            save_timeout_ms: 30_000,
        }
    }
}
