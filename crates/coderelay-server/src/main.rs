//! coderelay server binary.

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use coderelay::{CompileService, VersionInfo, spawn_compiler, transport};

use crate::config::Args;

/// Initialize tracing with CODERELAY_LOG and LOG_FORMAT support.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let base_level = match std::env::var("CODERELAY_LOG").as_deref() {
            Ok("debug") => "debug",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };

        EnvFilter::new(format!(
            "coderelay={level},coderelay_server={level}",
            level = base_level
        ))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    tracing::info!(
        version = coderelay::CODERELAY_VERSION,
        host = %args.host,
        port = args.port,
        compiler = %args.compiler.display(),
        compiler_args = ?args.compiler_args,
        wait_ms = args.wait_ms,
        end_marker = ?args.end_marker,
        landing_page = ?args.landing_page,
        "Starting coderelay"
    );

    let mut service = CompileService::new_no_compiler()
        .with_version(VersionInfo::new().with_compiler(args.compiler.display().to_string()));

    if let Some(path) = &args.landing_page {
        let html = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read landing page {}", path.display()))?;
        service = service.with_landing_page(html);
    }

    let compiler = spawn_compiler(args.bridge_config())
        .await
        .with_context(|| format!("failed to start compiler {}", args.compiler.display()))?;

    let service = Arc::new(service);
    service.set_compiler(Arc::new(compiler)).await;

    transport::serve(args.server_config(), service).await
}
