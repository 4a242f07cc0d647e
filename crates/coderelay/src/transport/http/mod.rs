//! HTTP transport: routes and server.

mod routes;
mod server;

pub use routes::{CompileRequest, HealthCheckResponse, routes};
pub use server::{ServerConfig, serve};
