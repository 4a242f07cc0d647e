//! Health status types for the relay.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the compiler bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Health {
    /// Compiler not spawned yet
    #[default]
    Starting,
    /// Compiler running, accepting submissions
    Ready,
    /// Compiler exited or its stdin broke; no restart is attempted
    Defunct,
}

/// Response-only health status (includes the transient BUSY state).
/// Used in HTTP responses but not stored as internal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthResponse {
    Starting,
    Ready,
    /// Ready, but a submission is in flight and new ones will queue
    Busy,
    Defunct,
}

impl From<Health> for HealthResponse {
    fn from(health: Health) -> Self {
        match health {
            Health::Starting => HealthResponse::Starting,
            Health::Ready => HealthResponse::Ready,
            Health::Defunct => HealthResponse::Defunct,
        }
    }
}
