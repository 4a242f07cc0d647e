//! Listener setup and process-signal handling for the relay.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::service::CompileService;

use super::routes::routes;

/// Where the relay listens. Defaults to every interface on port 8000.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Bind the listener and answer compile requests until SIGINT or SIGTERM.
///
/// In-flight requests finish before this returns; the compiler subprocess is
/// terminated last.
pub async fn serve(config: ServerConfig, service: Arc<CompileService>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Server is running");

    axum::serve(listener, routes(Arc::clone(&service)))
        .with_graceful_shutdown(termination_requested())
        .await?;

    info!("Listener closed, stopping compiler");
    service.shutdown().await;

    Ok(())
}

/// Resolves on the first SIGINT, or SIGTERM on unix.
///
/// # Panics
///
/// If the signal handlers cannot be installed. That only happens with a
/// misconfigured runtime, and startup should abort in that case.
async fn termination_requested() {
    let interrupt = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    };
    info!(signal, "Shutdown requested, draining requests");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listens_on_all_interfaces_port_8000() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
    }

    #[tokio::test]
    async fn invalid_host_is_an_error() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            port: 8000,
        };
        let result = serve(config, Arc::new(CompileService::new_no_compiler())).await;
        assert!(result.is_err());
    }
}
