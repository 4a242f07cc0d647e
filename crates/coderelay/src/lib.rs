//! coderelay: HTTP front end for a long-lived, line-oriented compiler process.

mod health;
mod version;

pub mod bridge;
pub mod capture;
pub mod compiler;
pub mod service;
pub mod transport;

pub use bridge::protocol::{DEFAULT_WAIT_WINDOW, NO_OUTPUT_SENTINEL, SubmissionId};
pub use capture::CompileResult;
pub use compiler::{
    BridgeConfig, BridgeError, BridgeStatus, CommandSpawner, Compiler, CompilerHandle,
    CompilerSpawner, SpawnError, spawn_compiler,
};
pub use health::{Health, HealthResponse};
pub use service::{CompileService, HealthSnapshot, SubmitError};
pub use version::{CODERELAY_VERSION, VersionInfo};
