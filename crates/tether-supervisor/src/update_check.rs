//! Scheduled update check and the stop-and-handoff protocol

use semver::Version;
use std::fs;
use std::io::ErrorKind;
use tether_update::{InstallTarget, InstalledBinary};
use tracing::{debug, error, info, warn};

use crate::error::{Result, SupervisorError};
use crate::handoff::HandoffNotice;
use crate::process::{ChildExit, ProcessHandle, RESTART_SIGNAL};
use crate::supervisor::Inner;

/// What an update check did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The installed version is the latest one
    UpToDate { current: Version },
    /// A newer version was installed and the child restarted on it
    Updated { from: Version, to: Version },
}

impl Inner {
    /// Install a newer release if one exists and move the child onto it
    ///
    /// The version lookup and the download happen without the state lock.
    /// The swap, the handoff and the removal of the old binary happen under
    /// it, so the run loop never relaunches from a half-updated state.
    pub(crate) async fn check_for_update(&self) -> Result<UpdateStatus> {
        let _serial = self.checks.lock().await;
        info!("Checking for CLI update");

        let latest = self
            .provider
            .get_latest()
            .await
            .map_err(SupervisorError::latest_version)?;

        let current = self
            .state
            .lock()
            .await
            .installed
            .as_ref()
            .map(|b| b.version.clone())
            .ok_or(SupervisorError::NoExecutionLocation)?;

        if latest <= current {
            info!("CLI version {} is up to date", current);
            return Ok(UpdateStatus::UpToDate { current });
        }

        info!("Found new CLI version {}", latest);
        let fresh = self
            .provider
            .install(&InstallTarget::Latest, &self.install_dir)
            .await
            .map_err(SupervisorError::install)?;

        let mut state = self.state.lock().await;
        let previous = match state.installed.clone() {
            Some(previous) if fresh.version > previous.version => previous,
            Some(previous) => {
                // The release moved between lookup and download
                info!(
                    "Installed release {} is not newer than {}; keeping it",
                    fresh.version, previous.version
                );
                if fresh.path != previous.path {
                    remove_binary(&fresh);
                }
                return Ok(UpdateStatus::UpToDate {
                    current: previous.version,
                });
            }
            None => return Err(SupervisorError::NoExecutionLocation),
        };

        state.installed = Some(fresh.clone());
        let updated = UpdateStatus::Updated {
            from: previous.version.clone(),
            to: fresh.version.clone(),
        };

        let Some(process) = state.process.clone() else {
            debug!("No CLI running; next launch uses {}", fresh.path.display());
            if previous.path != fresh.path {
                remove_binary(&previous);
            }
            return Ok(updated);
        };

        debug!("Stop previous runner");
        match stop_and_handoff(&process).await {
            Ok(()) => {
                debug!("Process is stopped");
                if previous.path != fresh.path {
                    debug!("Remove previous runner");
                    remove_binary(&previous);
                }
                info!("Updated CLI from {} to {}", previous.version, fresh.version);
                Ok(updated)
            }
            Err(e @ SupervisorError::Signal { .. }) => {
                error!("{}; keeping CLI version {}", e, previous.version);
                if previous.path != fresh.path {
                    remove_binary(&fresh);
                }
                state.installed = Some(previous);
                Err(e)
            }
            Err(e) => {
                warn!(
                    "{}; CLI version {} stays installed for the next launch",
                    e, fresh.version
                );
                Err(e)
            }
        }
    }
}

/// Ask the running child to restart and wait until the run loop confirms it
///
/// Must be called with the state lock held. The wait itself never needs a
/// lock the run loop takes before notifying.
async fn stop_and_handoff(process: &ProcessHandle) -> Result<()> {
    let notice = process.handoff().arm();

    // The run loop records the exit before it looks at the slot, so a child
    // reaped before arming is seen here and one reaped after gets the notice
    match process.exit() {
        Some(ChildExit::RestartRequested) => {
            debug!(pid = process.pid(), "CLI already restarting; no signal needed");
            return Ok(());
        }
        Some(_) => return Err(SupervisorError::HandoffInterrupted),
        None => {}
    }

    process.signal_group(RESTART_SIGNAL)?;

    debug!("Wait for process to stop...");
    match notice.await {
        Ok(HandoffNotice::RestartAcknowledged) => Ok(()),
        Ok(HandoffNotice::Terminated) | Err(_) => Err(SupervisorError::HandoffInterrupted),
    }
}

fn remove_binary(binary: &InstalledBinary) {
    match fs::remove_file(&binary.path) {
        Ok(()) => debug!("Removed {}", binary.path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove {}: {}", binary.path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn handle(exit: Option<ChildExit>) -> ProcessHandle {
        let binary = InstalledBinary::new(Version::new(1, 2, 0), PathBuf::from("/opt/cli-1.2.0"));
        // Above the kernel's pid limit, so no such process group exists
        let handle = ProcessHandle::new(i32::MAX as u32, binary);
        if let Some(exit) = exit {
            handle.mark_exited(exit);
        }
        handle
    }

    #[tokio::test]
    async fn test_handoff_after_restart_exit() {
        let process = handle(Some(ChildExit::RestartRequested));
        assert!(stop_and_handoff(&process).await.is_ok());
    }

    #[tokio::test]
    async fn test_handoff_after_crash_is_interrupted() {
        let process = handle(Some(ChildExit::Failed {
            code: Some(3),
            signal: None,
        }));
        let err = stop_and_handoff(&process).await.unwrap_err();
        assert!(matches!(err, SupervisorError::HandoffInterrupted));
    }

    #[tokio::test]
    async fn test_handoff_after_clean_exit_is_interrupted() {
        let process = handle(Some(ChildExit::Success));
        let err = stop_and_handoff(&process).await.unwrap_err();
        assert!(matches!(err, SupervisorError::HandoffInterrupted));
    }

    #[tokio::test]
    async fn test_handoff_signal_failure() {
        let process = handle(None);
        let err = stop_and_handoff(&process).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Signal { .. }));
    }
}
