//! Child process supervision loop

use std::sync::Arc;
use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SupervisorError};
use crate::handoff::HandoffNotice;
use crate::outcome::RunOutcome;
use crate::process::{self, ChildExit, ProcessHandle, SHUTDOWN_SIGNAL};
use crate::supervisor::Inner;

impl Inner {
    /// Launch, wait for, and relaunch the child until the run ends
    ///
    /// Cancellation stops further launches. A running child is waited for,
    /// or sent SIGTERM first when shutdown forwarding is enabled. The state
    /// lock is held only while launching. Waiting happens without
    /// it, and the handoff notice goes out before the lock is taken again, so
    /// an update check holding the lock during a handoff can always finish.
    pub(crate) async fn run_loop(&self, cancel: CancellationToken) {
        let outcome = self.supervise(&cancel).await;

        match &outcome {
            RunOutcome::Cancelled => info!("CLI supervision cancelled"),
            RunOutcome::ChildExitedCleanly => info!("Finished executing CLI"),
            RunOutcome::ChildCrashed(e) | RunOutcome::Failed(e) => {
                error!("error while running CLI: {}", e);
                if let Err(e) = self.health.remove_liveness_mark() {
                    warn!("failed to remove liveness mark: {}", e);
                }
            }
        }

        self.outcome.set(outcome);
    }

    async fn supervise(&self, cancel: &CancellationToken) -> RunOutcome {
        let mut ready = false;

        loop {
            if cancel.is_cancelled() {
                return RunOutcome::Cancelled;
            }

            let (handle, mut child) = match self.launch().await {
                Ok(launched) => launched,
                Err(e) => return RunOutcome::Failed(e),
            };

            if !ready {
                ready = true;
                if let Err(e) = self.health.mark_readiness() {
                    warn!("failed to mark readiness: {}", e);
                }
            }

            let exited = tokio::select! {
                status = child.wait() => Some(status),
                _ = cancel.cancelled() => None,
            };

            let forwarded = exited.is_none() && self.forward_shutdown;
            let status = match exited {
                Some(status) => status,
                None => {
                    if self.forward_shutdown {
                        info!(pid = handle.pid(), "Forwarding shutdown to CLI");
                        if let Err(e) = handle.signal_group(SHUTDOWN_SIGNAL) {
                            warn!("failed to forward shutdown: {}", e);
                        }
                    } else {
                        info!(pid = handle.pid(), "Shutdown requested; waiting for CLI to exit");
                    }
                    child.wait().await
                }
            };

            let status = match status {
                Ok(status) => status,
                Err(e) => {
                    handle.mark_exited(ChildExit::Failed {
                        code: None,
                        signal: None,
                    });
                    self.release(&handle, HandoffNotice::Terminated).await;
                    return RunOutcome::Failed(SupervisorError::Io(e));
                }
            };
            debug!(pid = handle.pid(), %status, "CLI exited");

            let exit = ChildExit::classify(status);
            handle.mark_exited(exit);

            if forwarded {
                self.release(&handle, HandoffNotice::Terminated).await;
                return RunOutcome::Cancelled;
            }

            match exit {
                ChildExit::RestartRequested => {
                    info!("Restart CLI");
                    self.release(&handle, HandoffNotice::RestartAcknowledged)
                        .await;
                }
                ChildExit::Success => {
                    self.release(&handle, HandoffNotice::Terminated).await;
                    return RunOutcome::ChildExitedCleanly;
                }
                ChildExit::Failed { code, signal } => {
                    self.release(&handle, HandoffNotice::Terminated).await;
                    return RunOutcome::ChildCrashed(SupervisorError::ChildCrashed { code, signal });
                }
            }
        }
    }

    /// Start the child from the currently installed binary
    async fn launch(&self) -> Result<(Arc<ProcessHandle>, Child)> {
        let mut state = self.state.lock().await;

        let binary = state
            .installed
            .clone()
            .filter(|b| !b.path.as_os_str().is_empty())
            .ok_or(SupervisorError::NoExecutionLocation)?;

        info!(
            "Executing CLI version {} with command: {} {}",
            binary.version,
            binary.path.display(),
            self.args
                .iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let child = process::spawn(&binary, &self.args, &self.sinks)?;
        let pid = child.id().ok_or_else(|| {
            SupervisorError::spawn(
                binary.path.display().to_string(),
                std::io::Error::other("child exited before its pid was read"),
            )
        })?;

        let handle = Arc::new(ProcessHandle::new(pid, binary));
        state.process = Some(handle.clone());
        Ok((handle, child))
    }

    /// Notify any waiting handoff, then drop the handle from shared state
    async fn release(&self, handle: &Arc<ProcessHandle>, notice: HandoffNotice) {
        if handle.handoff().notify(notice) {
            debug!(?notice, "Handoff notified");
        }
        self.state.lock().await.clear_process(handle);
    }
}
