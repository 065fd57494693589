//! Daemon AI CLI
//!
//! `daemon-ai serve` runs the backend; `daemon-ai edit <file>` reviews a
//! document against it.

mod cli;

use clap::{Parser, Subcommand};
use daemon_ai_core::{config::AppConfig, error::Result};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "daemon-ai")]
#[command(about = "Span-anchored writing suggestions from concurrent AI daemons", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level (RUST_LOG takes precedence when set)
    #[arg(short, long, env = "DAEMON_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon backend HTTP server
    Serve {
        /// Listen address (overrides DAEMON_SERVER_ADDR)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Review a document with daemons served by the backend
    Edit {
        /// Document to review (created on 'write' if missing)
        file: PathBuf,

        /// Backend base URL (overrides DAEMON_API_BASE)
        #[arg(long)]
        api_base: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Our crates at the requested level, HTTP internals at WARN
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!(
            "daemon_ai={level},daemon_ai_core={level},tower_http=warn,hyper=warn,reqwest=warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Daemon AI v{} starting...", env!("CARGO_PKG_VERSION"));
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Serve { addr } => {
            let config = config.with_overrides(None, addr)?;
            cli::serve::handle(config).await
        }
        Commands::Edit { file, api_base } => {
            let config = config.with_overrides(api_base, None)?;
            cli::edit::run(file, config).await
        }
    }
}
