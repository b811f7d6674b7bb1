//! Error types for tether-supervisor

use thiserror::Error;

/// Result type alias using the supervisor's error type
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Exit status for supervisor-internal defects (`EX_SOFTWARE`)
pub const EXIT_INTERNAL: u8 = 70;

/// Exit status for configuration errors (`EX_CONFIG`)
pub const EXIT_CONFIG: u8 = 78;

/// Supervisor error types
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// Downloading or extracting a release failed
    #[error("install failed: {0:#}")]
    Install(anyhow::Error),

    /// No installed binary to launch
    #[error("no execution location")]
    NoExecutionLocation,

    /// The supervised child exited with an error
    #[error("child process failed ({})", describe_exit(.code, .signal))]
    ChildCrashed {
        code: Option<i32>,
        signal: Option<i32>,
    },

    /// The latest released version could not be determined
    #[error("failed to get latest released version: {0:#}")]
    LatestVersion(anyhow::Error),

    /// The restart signal could not be delivered
    #[error("failed to signal process group {pgid}: {source}")]
    Signal {
        pgid: i32,
        #[source]
        source: nix::errno::Errno,
    },

    /// The child terminated on its own while a restart was pending
    #[error("child terminated during handoff")]
    HandoffInterrupted,

    /// The child process could not be started
    #[error("failed to launch {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The update schedule is not a valid cron expression
    #[error("invalid update schedule {expr:?}: {message}")]
    Schedule { expr: String, message: String },

    /// The run loop task ended without recording an outcome
    #[error("run loop aborted: {0}")]
    RunLoopAborted(String),

    /// A health marker could not be updated
    #[error(transparent)]
    Health(tether_core::Error),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] tether_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SupervisorError {
    /// Create an install error
    pub fn install(source: anyhow::Error) -> Self {
        Self::Install(source)
    }

    /// Create a latest-version lookup error
    pub fn latest_version(source: anyhow::Error) -> Self {
        Self::LatestVersion(source)
    }

    /// Create a signal delivery error
    pub fn signal(pgid: i32, source: nix::errno::Errno) -> Self {
        Self::Signal { pgid, source }
    }

    /// Create a spawn error
    pub fn spawn(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            path: path.into(),
            source,
        }
    }

    /// Create a schedule error
    pub fn schedule(expr: impl Into<String>, message: impl ToString) -> Self {
        Self::Schedule {
            expr: expr.into(),
            message: message.to_string(),
        }
    }

    /// Exit status the host process should report for this error
    ///
    /// A crashed child's own status is mirrored (`128 + signal` when it was
    /// killed by a signal); everything else maps to a distinct non-zero code.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ChildCrashed { code, signal } => match (code, signal) {
                (Some(code), _) => exit_byte(*code),
                (None, Some(signal)) => exit_byte(128 + signal),
                (None, None) => EXIT_INTERNAL,
            },
            Self::Schedule { .. } => EXIT_CONFIG,
            Self::Config(e) if e.is_config_error() => EXIT_CONFIG,
            _ => EXIT_INTERNAL,
        }
    }
}

/// Truncate like the kernel does, never reporting success for a failure
fn exit_byte(code: i32) -> u8 {
    match (code & 0xff) as u8 {
        0 => EXIT_INTERNAL,
        byte => byte,
    }
}

fn describe_exit(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (code, signal) {
        (Some(code), _) => format!("exit status {}", code),
        (None, Some(signal)) => format!("killed by signal {}", signal),
        (None, None) => "unknown status".to_string(),
    }
}
