//! tether - self-updating CLI supervisor
//!
//! Installs the configured CLI, runs it with this process's arguments, and
//! hot-swaps it whenever a newer release is published.

mod cli;
mod signals;

use std::process::ExitCode;
use std::sync::Arc;
use tether_core::{ConfigLoader, HealthMarker};
use tether_supervisor::{OutputSinks, Supervisor, SupervisorError};
use tether_update::GithubReleaseProvider;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

/// Environment variable holding a full tracing filter directive
const LOG_ENV: &str = "TETHER_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    // This must be done before any TLS operations
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse_forwarding();

    init_tracing(verbosity(), env_flag("TETHER_QUIET"));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("execution error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), SupervisorError> {
    let config = ConfigLoader::new().load()?;

    let sinks = OutputSinks::open(&config.supervisor).map_err(|e| {
        tether_core::Error::invalid_config(format!("cannot open output file: {}", e))
    })?;

    let health = Arc::new(HealthMarker::from_config(&config.supervisor));
    let provider = GithubReleaseProvider::new(&config).map_err(SupervisorError::install)?;

    let supervisor = Supervisor::builder(Arc::new(provider))
        .config(&config.supervisor)?
        .health(health.clone())
        .output(sinks)
        .args(cli.args)
        .build();

    let cancel = CancellationToken::new();
    signals::cancel_on_shutdown(cancel.clone());

    let result = supervisor.run(cancel).await;
    health.cleanup();
    result
}

/// `TETHER_VERBOSE` as a level: 0 = info, 1 = debug, 2+ = trace
fn verbosity() -> u8 {
    std::env::var("TETHER_VERBOSE")
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Initialize tracing with appropriate verbosity
///
/// Logs go to stderr so they never mix with a child writing to stdout.
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("info"),
                1 => EnvFilter::new("debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
