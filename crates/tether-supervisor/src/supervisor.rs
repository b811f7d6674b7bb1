//! Supervisor lifecycle
//!
//! [`Supervisor::run`] installs the initial binary, schedules update checks,
//! runs the child until the run ends, and reports how it ended.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use semver::Version;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use tether_core::types::{SupervisorConfig, DEFAULT_UPDATE_CRON};
use tether_core::HealthMarker;
use tether_update::{InstallTarget, InstalledBinary, ReleaseProvider};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{Result, SupervisorError};
use crate::outcome::{OutcomeSlot, RunOutcome};
use crate::output::OutputSinks;
use crate::schedule::{CronTrigger, JobCallback};
use crate::state::SupervisorState;
use crate::update_check::UpdateStatus;

/// Shared internals; the run loop and update checks are implemented on this
pub(crate) struct Inner {
    pub(crate) provider: Arc<dyn ReleaseProvider>,
    pub(crate) install_dir: PathBuf,
    pub(crate) pinned: Option<Version>,
    pub(crate) update_cron: Option<String>,
    pub(crate) forward_shutdown: bool,
    pub(crate) health: Arc<HealthMarker>,
    pub(crate) sinks: OutputSinks,
    pub(crate) args: Vec<OsString>,
    pub(crate) state: Mutex<SupervisorState>,
    pub(crate) checks: Mutex<()>,
    pub(crate) outcome: OutcomeSlot,
    pub(crate) trigger: CronTrigger,
}

/// Builder for [`Supervisor`]
pub struct SupervisorBuilder {
    provider: Arc<dyn ReleaseProvider>,
    install_dir: PathBuf,
    pinned: Option<Version>,
    update_cron: Option<String>,
    forward_shutdown: bool,
    health: Arc<HealthMarker>,
    sinks: OutputSinks,
    args: Vec<OsString>,
}

impl SupervisorBuilder {
    /// Apply the supervisor section of the runtime configuration
    pub fn config(mut self, config: &SupervisorConfig) -> Result<Self> {
        self.pinned = config.pinned_version()?;
        self.update_cron = config.explicit_cron().map(str::to_string);
        self.install_dir = config.working_dir.clone().into_std_path_buf();
        self.forward_shutdown = config.forward_shutdown;
        Ok(self)
    }

    /// Directory binaries are installed into
    pub fn install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = dir.into();
        self
    }

    /// Run this version forever instead of following the latest release
    pub fn pinned_version(mut self, version: Option<Version>) -> Self {
        self.pinned = version;
        self
    }

    /// Cron expression for update checks; `None` uses the daily default
    pub fn update_cron(mut self, cron: Option<String>) -> Self {
        self.update_cron = cron;
        self
    }

    /// Send SIGTERM to a running child on cancellation instead of waiting
    /// for it to exit
    pub fn forward_shutdown(mut self, forward: bool) -> Self {
        self.forward_shutdown = forward;
        self
    }

    pub fn health(mut self, health: Arc<HealthMarker>) -> Self {
        self.health = health;
        self
    }

    pub fn output(mut self, sinks: OutputSinks) -> Self {
        self.sinks = sinks;
        self
    }

    /// Arguments passed verbatim to every child invocation
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Supervisor {
        Supervisor {
            inner: Arc::new(Inner {
                provider: self.provider,
                install_dir: self.install_dir,
                pinned: self.pinned,
                update_cron: self.update_cron,
                forward_shutdown: self.forward_shutdown,
                health: self.health,
                sinks: self.sinks,
                args: self.args,
                state: Mutex::new(SupervisorState::default()),
                checks: Mutex::new(()),
                outcome: OutcomeSlot::new(),
                trigger: CronTrigger::new(),
            }),
        }
    }
}

/// Keeps one child running and moves it onto newer releases
///
/// Cloning yields another handle to the same supervisor.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    pub fn builder(provider: Arc<dyn ReleaseProvider>) -> SupervisorBuilder {
        SupervisorBuilder {
            provider,
            install_dir: PathBuf::from("./"),
            pinned: None,
            update_cron: None,
            forward_shutdown: false,
            health: Arc::new(HealthMarker::disabled()),
            sinks: OutputSinks::inherit(),
            args: Vec::new(),
        }
    }

    /// Run until the child exits for good or `cancel` fires
    ///
    /// Once `cancel` fires no new child is launched; a running child is
    /// waited for (see [`SupervisorBuilder::forward_shutdown`]). Install
    /// errors are fatal. A child crash is returned as
    /// [`SupervisorError::ChildCrashed`]; a clean exit or cancellation is
    /// `Ok(())`. Scheduled checks are stopped before this returns. Call it
    /// once per supervisor.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let inner = &self.inner;

        let target = InstallTarget::from_pinned(inner.pinned.clone());
        info!("Installing CLI version {}", target);
        let installed = inner
            .provider
            .install(&target, &inner.install_dir)
            .await
            .map_err(SupervisorError::install)?;
        info!(
            "Installed CLI version {} at {}",
            installed.version,
            installed.path.display()
        );
        inner.state.lock().await.installed = Some(installed);

        inner.health.mark_liveness().map_err(SupervisorError::Health)?;

        match &inner.pinned {
            Some(version) => info!("CLI pinned to version {}; automatic updates disabled", version),
            None => inner.trigger.schedule(&self.cron_spec(), self.update_job())?,
        }

        let runner = tokio::spawn({
            let inner = inner.clone();
            async move { inner.run_loop(cancel).await }
        });

        inner.trigger.start();
        self.log_next_update_check();

        if let Err(e) = runner.await {
            inner
                .outcome
                .set(RunOutcome::Failed(SupervisorError::RunLoopAborted(e.to_string())));
        }

        inner.trigger.stop().await;

        inner
            .outcome
            .take()
            .map(RunOutcome::into_result)
            .unwrap_or(Ok(()))
    }

    /// Check for a newer release now, swapping the binary if there is one
    pub async fn check_for_update(&self) -> Result<UpdateStatus> {
        self.inner.check_for_update().await
    }

    /// The cron expression update checks run on
    pub fn cron_spec(&self) -> String {
        match &self.inner.update_cron {
            Some(cron) => cron.clone(),
            None => {
                info!("Checking for updates every day at 2:00");
                DEFAULT_UPDATE_CRON.to_string()
            }
        }
    }

    /// When the next scheduled update check fires
    pub fn next_update_check(&self) -> Option<DateTime<Utc>> {
        self.inner.trigger.next_firing()
    }

    pub fn log_next_update_check(&self) {
        match self.next_update_check() {
            Some(at) => info!("Next update check at {}", at.to_rfc2822()),
            None => info!("No jobs scheduled"),
        }
    }

    /// The binary the next launch will use
    pub async fn installed(&self) -> Option<InstalledBinary> {
        self.inner.state.lock().await.installed.clone()
    }

    /// Process id of the running child
    pub async fn current_pid(&self) -> Option<u32> {
        self.inner
            .state
            .lock()
            .await
            .process
            .as_ref()
            .map(|p| p.pid())
    }

    fn update_job(&self) -> JobCallback {
        let supervisor = self.clone();
        Arc::new(move || {
            let supervisor = supervisor.clone();
            async move { supervisor.scheduled_check().await }.boxed()
        })
    }

    /// A check run by the trigger; failures never reach the running child
    async fn scheduled_check(&self) {
        if let Err(e) = self.check_for_update().await {
            error!("Update check failed: {}", e);
        }
        self.log_next_update_check();
    }
}
