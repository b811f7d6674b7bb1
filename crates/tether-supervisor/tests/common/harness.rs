//! Background supervisor runs

use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tether_core::HealthMarker;
use tether_supervisor::{Result, Supervisor, SupervisorBuilder};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::provider::FakeProvider;

/// Upper bound for anything a test waits on
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

pub const CHILD_ARGS: [&str; 3] = ["run", "--frequency", "60"];

/// Scratch directories and the fake provider for one test
pub struct Fixture {
    pub temp: TempDir,
    pub provider: Arc<FakeProvider>,
}

impl Fixture {
    pub fn new(latest: &str) -> Self {
        Self::with_provider(|log| FakeProvider::new(latest, log))
    }

    pub fn with_provider(build: impl FnOnce(PathBuf) -> FakeProvider) -> Self {
        let temp = TempDir::new().unwrap();
        let provider = Arc::new(build(temp.path().join("launches.log")));
        Self { temp, provider }
    }

    pub fn install_dir(&self) -> PathBuf {
        self.temp.path().join("bin")
    }

    pub fn liveness_file(&self) -> PathBuf {
        self.temp.path().join("alive")
    }

    pub fn readiness_file(&self) -> PathBuf {
        self.temp.path().join("ready")
    }

    /// A builder with install dir, health markers and child args set
    ///
    /// Shutdown forwarding is on so [`Running::shutdown`] stops serving
    /// children.
    pub fn builder(&self) -> SupervisorBuilder {
        Supervisor::builder(self.provider.clone())
            .install_dir(self.install_dir())
            .health(Arc::new(HealthMarker::new(
                Some(self.liveness_file()),
                Some(self.readiness_file()),
            )))
            .args(CHILD_ARGS)
            .forward_shutdown(true)
    }
}

/// A supervisor running on a background task
pub struct Running {
    pub supervisor: Supervisor,
    pub cancel: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl Running {
    pub fn start(supervisor: Supervisor) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let supervisor = supervisor.clone();
            let cancel = cancel.clone();
            async move { supervisor.run(cancel).await }
        });
        Self {
            supervisor,
            cancel,
            task,
        }
    }

    /// Wait for the run to end on its own
    pub async fn finish(self) -> Result<()> {
        tokio::time::timeout(WAIT_TIMEOUT, self.task)
            .await
            .expect("supervisor did not finish")
            .unwrap()
    }

    /// Cancel the run and wait for it to end
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.finish().await
    }
}

/// Poll `condition` until it holds or the wait times out
pub async fn wait_until<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while !condition().await {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Wait until the fake CLI has been launched `count` times
pub async fn wait_for_launches(provider: &FakeProvider, count: usize) {
    wait_until(&format!("{} launch(es)", count), || async {
        provider.launches().len() >= count
    })
    .await;
}

/// Whether a process with this id still exists
pub fn process_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}
