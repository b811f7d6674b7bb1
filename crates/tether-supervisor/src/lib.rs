//! # tether-supervisor
//!
//! Keeps one externally released CLI binary running and moves it onto newer
//! releases as they are published:
//!
//! - The run loop launches the child in its own process group, waits for it,
//!   and relaunches it when it exits with the restart signal
//! - A cron-scheduled update check installs a newer release, signals the
//!   child's process group, and waits for the run loop to confirm the
//!   restart before removing the old binary
//! - The final [`RunOutcome`] becomes the host process's exit status
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tether_core::RuntimeConfig;
//! use tether_supervisor::Supervisor;
//! use tether_update::GithubReleaseProvider;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RuntimeConfig::default();
//! let provider = Arc::new(GithubReleaseProvider::new(&config)?);
//!
//! let supervisor = Supervisor::builder(provider)
//!     .config(&config.supervisor)?
//!     .args(["run", "--verbose"])
//!     .build();
//!
//! supervisor.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handoff;
pub mod outcome;
pub mod output;
pub mod process;
mod run_loop;
pub mod schedule;
pub mod state;
pub mod supervisor;
pub mod update_check;

pub use error::{Result, SupervisorError};
pub use outcome::RunOutcome;
pub use output::{OutputSink, OutputSinks};
pub use process::{ChildExit, RESTART_SIGNAL};
pub use schedule::CronTrigger;
pub use supervisor::{Supervisor, SupervisorBuilder};
pub use update_check::UpdateStatus;
