//! Liveness and readiness marker files
//!
//! External probes (for example a Kubernetes `exec` probe running `cat`)
//! treat the presence of a marker file as healthy. Every operation is
//! idempotent and a no-op when the corresponding path is not configured.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info};

use crate::error::{Error, Result};
use crate::types::SupervisorConfig;

/// A single marker file
#[derive(Debug, Default)]
struct Marker {
    path: Option<PathBuf>,
    marked: AtomicBool,
}

impl Marker {
    fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            marked: AtomicBool::new(false),
        }
    }

    fn mark(&self, kind: &str) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if self.marked.load(Ordering::SeqCst) {
            return Ok(());
        }

        create_marker_file(path).map_err(|e| Error::health_marker(path.display().to_string(), e))?;
        self.marked.store(true, Ordering::SeqCst);

        info!("[health] Created {} file: {}", kind, path.display());
        Ok(())
    }

    fn remove(&self, kind: &str) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        match std::fs::remove_file(path) {
            Ok(()) => info!("[health] Removed {} file: {}", kind, path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::health_marker(path.display().to_string(), e)),
        }
        self.marked.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_marked(&self) -> bool {
        self.marked.load(Ordering::SeqCst)
    }
}

fn create_marker_file(path: &Path) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path).map(drop)
}

/// Liveness/readiness marker pair
#[derive(Debug, Default)]
pub struct HealthMarker {
    liveness: Marker,
    readiness: Marker,
}

impl HealthMarker {
    /// Create a marker pair for the given (optional) paths
    pub fn new(liveness: Option<PathBuf>, readiness: Option<PathBuf>) -> Self {
        Self {
            liveness: Marker::new(liveness),
            readiness: Marker::new(readiness),
        }
    }

    /// Create a marker pair from supervisor configuration
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self::new(
            config.liveness_file.clone().map(PathBuf::from),
            config.readiness_file.clone().map(PathBuf::from),
        )
    }

    /// A marker pair with no paths configured; every call is a no-op
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Create the liveness file
    pub fn mark_liveness(&self) -> Result<()> {
        self.liveness.mark("liveness")
    }

    /// Create the readiness file
    pub fn mark_readiness(&self) -> Result<()> {
        self.readiness.mark("readiness")
    }

    /// Remove the liveness file so the next probe fails
    pub fn remove_liveness_mark(&self) -> Result<()> {
        self.liveness.remove("liveness")
    }

    /// Whether the liveness file is currently marked
    pub fn is_live(&self) -> bool {
        self.liveness.is_marked()
    }

    /// Whether the readiness file is currently marked
    pub fn is_ready(&self) -> bool {
        self.readiness.is_marked()
    }

    /// Remove both marks; errors are logged rather than returned
    pub fn cleanup(&self) {
        if let Err(e) = self.liveness.remove("liveness") {
            error!("failed to remove liveness file: {}", e);
        }
        if let Err(e) = self.readiness.remove("readiness") {
            error!("failed to remove readiness file: {}", e);
        }
    }
}
