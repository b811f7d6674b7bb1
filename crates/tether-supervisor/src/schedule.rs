//! Cron-driven trigger for scheduled jobs
//!
//! Each registered job runs on its own task once the trigger is started.
//! A job's next run is computed only after its callback finishes, so runs of
//! the same job never overlap; instants missed while a callback was busy are
//! skipped.

use chrono::{DateTime, Utc};
use croner::Cron;
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, SupervisorError};

/// Callback invoked at every matching instant
pub type JobCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Parse a five-field cron expression (a leading seconds field is accepted)
pub fn parse_cron(expr: &str) -> Result<Cron> {
    Cron::new(expr)
        .with_seconds_optional()
        .parse()
        .map_err(|e| SupervisorError::schedule(expr, e))
}

/// The first instant strictly after `after` matching `cron`
pub fn next_after(cron: &Cron, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
    cron.find_next_occurrence(after, false).ok()
}

#[derive(Default)]
struct Inner {
    jobs: Mutex<Vec<Cron>>,
    pending: Mutex<Vec<(Cron, JobCallback)>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

/// Cron trigger source
///
/// Cloning yields another handle to the same trigger.
#[derive(Clone, Default)]
pub struct CronTrigger {
    inner: Arc<Inner>,
}

impl CronTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` to run at every instant matching `expr`
    pub fn schedule(&self, expr: &str, callback: JobCallback) -> Result<()> {
        let cron = parse_cron(expr)?;
        debug!("Scheduled job with cron {:?}", expr);

        lock(&self.inner.jobs).push(cron.clone());
        lock(&self.inner.pending).push((cron, callback));
        Ok(())
    }

    /// Start running registered jobs; jobs scheduled later need another call
    pub fn start(&self) {
        if self.inner.cancel.is_cancelled() {
            warn!("Cron trigger already stopped; not starting");
            return;
        }

        let pending: Vec<_> = lock(&self.inner.pending).drain(..).collect();
        let mut tasks = lock(&self.inner.tasks);
        for (cron, callback) in pending {
            let cancel = self.inner.cancel.clone();
            tasks.push(tokio::spawn(run_job(cron, callback, cancel)));
        }
    }

    /// Stop firing and wait for in-flight callbacks to return
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        lock(&self.inner.pending).clear();

        let tasks: Vec<_> = lock(&self.inner.tasks).drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Scheduled job ended abnormally: {}", e);
            }
        }
    }

    /// The next instant any job will fire, if any job is scheduled
    pub fn next_firing(&self) -> Option<DateTime<Utc>> {
        if self.inner.cancel.is_cancelled() {
            return None;
        }

        let now = Utc::now();
        lock(&self.inner.jobs)
            .iter()
            .filter_map(|cron| next_after(cron, &now))
            .min()
    }

}

async fn run_job(cron: Cron, callback: JobCallback, cancel: CancellationToken) {
    let mut last = Utc::now();

    loop {
        let Some(next) = next_after(&cron, &last) else {
            warn!("Cron expression has no future occurrences; job stopped");
            return;
        };

        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(wait) => {}
        }

        callback().await;
        last = next.max(Utc::now());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn noop() -> JobCallback {
        Arc::new(|| async {}.boxed())
    }

    #[test]
    fn test_next_after_daily() {
        let cron = parse_cron("0 2 * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2026, 3, 1, 1, 59, 0).unwrap();
        assert_eq!(
            next_after(&cron, &from),
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap())
        );

        // Strictly after
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap();
        assert_eq!(
            next_after(&cron, &at),
            Some(Utc.with_ymd_and_hms(2026, 3, 2, 2, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_invalid_expression() {
        let trigger = CronTrigger::new();
        let err = trigger.schedule("every tuesday", noop()).unwrap_err();
        assert!(matches!(err, SupervisorError::Schedule { .. }));
        assert!(trigger.next_firing().is_none());
    }

    #[test]
    fn test_next_firing_without_jobs() {
        assert!(CronTrigger::new().next_firing().is_none());
    }

    #[test]
    fn test_next_firing_picks_earliest() {
        let trigger = CronTrigger::new();
        trigger.schedule("0 2 * * *", noop()).unwrap();
        trigger.schedule("* * * * *", noop()).unwrap();

        let next = trigger.next_firing().unwrap();
        assert!(next - Utc::now() <= chrono::Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_stop_clears_next_firing() {
        let trigger = CronTrigger::new();
        trigger.schedule("* * * * *", noop()).unwrap();
        trigger.start();
        assert!(trigger.next_firing().is_some());

        trigger.stop().await;
        assert!(trigger.next_firing().is_none());

        // Starting again after stop is a no-op
        trigger.start();
    }

    #[tokio::test]
    async fn test_job_fires_on_schedule() {
        let count = Arc::new(AtomicU32::new(0));
        let trigger = CronTrigger::new();

        let counter = count.clone();
        trigger
            .schedule(
                "* * * * * *",
                Arc::new(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                    .boxed()
                }),
            )
            .unwrap();
        trigger.start();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        trigger.stop().await;

        assert!(count.load(Ordering::SeqCst) >= 1);
    }
}
