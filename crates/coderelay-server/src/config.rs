//! Command-line configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use coderelay::BridgeConfig;
use coderelay::transport::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "coderelay")]
#[command(about = "Expose an interactive compiler process over HTTP", version)]
pub struct Args {
    /// Address to bind
    #[arg(long, env = "CODERELAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "CODERELAY_PORT", default_value = "8000")]
    pub port: u16,

    /// Compiler executable, relative to the working directory unless absolute
    #[arg(long, env = "CODERELAY_COMPILER", default_value = "./compiler")]
    pub compiler: PathBuf,

    /// Extra argument passed to the compiler (repeatable)
    #[arg(long = "compiler-arg", allow_hyphen_values = true)]
    pub compiler_args: Vec<String>,

    /// How long each submission collects output, in milliseconds
    #[arg(long, env = "CODERELAY_WAIT_MS", default_value = "500")]
    pub wait_ms: u64,

    /// Text the compiler prints when it has finished answering
    #[arg(long, env = "CODERELAY_END_MARKER")]
    pub end_marker: Option<String>,

    /// HTML file served on `GET /` instead of the built-in page
    #[arg(long, env = "CODERELAY_LANDING_PAGE")]
    pub landing_page: Option<PathBuf>,
}

impl Args {
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig::new(&self.compiler)
            .with_args(self.compiler_args.iter().cloned())
            .with_wait_window(Duration::from_millis(self.wait_ms))
            .with_end_marker(self.end_marker.clone())
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
        }
    }
}
