//! Conventions of the compiler's stdin/stdout/stderr protocol.
//!
//! The compiler is addressed purely through its standard streams:
//! - **stdin**: one submission per line (see [`SubmissionCodec`](super::codec::SubmissionCodec))
//! - **stdout / stderr**: free text, captured as it arrives
//!
//! Nothing in the output identifies which submission produced it, so the
//! bridge correlates by time: output is attributed to the submission whose
//! capture window is open when the output arrives.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Body returned when a submission captured nothing.
pub const NO_OUTPUT_SENTINEL: &str = "No output produced";

/// How long a submission collects output when no end marker is configured.
pub const DEFAULT_WAIT_WINDOW: Duration = Duration::from_millis(500);

/// Unique identifier for a single submission.
///
/// Only used on our side for log correlation; the compiler never sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(uuid::Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which compiler stream a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    Stdout,
    Stderr,
}
