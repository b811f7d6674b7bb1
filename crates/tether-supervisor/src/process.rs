//! Child process launch, exit classification, and group signalling

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::ffi::OsString;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::OnceLock;
use tether_update::InstalledBinary;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::{Result, SupervisorError};
use crate::handoff::HandoffSlot;
use crate::output::OutputSinks;

/// Signal asking the child to exit so it can be relaunched
pub const RESTART_SIGNAL: Signal = Signal::SIGUSR1;

/// Signal forwarded to the child when the host shuts down
pub const SHUTDOWN_SIGNAL: Signal = Signal::SIGTERM;

/// How a child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    /// Exit status 0
    Success,
    /// The child asked to be relaunched
    RestartRequested,
    /// Any other termination
    Failed {
        code: Option<i32>,
        signal: Option<i32>,
    },
}

impl ChildExit {
    /// Classify a wait status
    ///
    /// Children trap the restart signal and exit with its number as their
    /// status; a child that did not trap it dies from the signal directly.
    /// Both count as a restart request.
    pub fn classify(status: ExitStatus) -> Self {
        let restart = RESTART_SIGNAL as i32;

        if status.success() {
            return Self::Success;
        }

        match (status.code(), status.signal()) {
            (Some(code), _) if code == restart => Self::RestartRequested,
            (None, Some(signal)) if signal == restart => Self::RestartRequested,
            (code, signal) => Self::Failed { code, signal },
        }
    }
}

/// The one running child, shared between the run loop and update checks
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Pid,
    binary: InstalledBinary,
    exit: OnceLock<ChildExit>,
    handoff: HandoffSlot,
}

impl ProcessHandle {
    pub fn new(pid: u32, binary: InstalledBinary) -> Self {
        Self {
            pid: Pid::from_raw(pid as i32),
            binary,
            exit: OnceLock::new(),
            handoff: HandoffSlot::new(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    /// The binary this child was launched from
    pub fn binary(&self) -> &InstalledBinary {
        &self.binary
    }

    /// Record how the child ended once it has been reaped
    pub fn mark_exited(&self, exit: ChildExit) {
        let _ = self.exit.set(exit);
    }

    /// How the child ended, if it has been reaped
    pub fn exit(&self) -> Option<ChildExit> {
        self.exit.get().copied()
    }

    pub fn handoff(&self) -> &HandoffSlot {
        &self.handoff
    }

    /// Send `signal` to the child's whole process group
    pub fn signal_group(&self, signal: Signal) -> Result<()> {
        signal_group(self.pid, signal)
    }
}

/// Send `signal` to the process group led by `pgid`
pub fn signal_group(pgid: Pid, signal: Signal) -> Result<()> {
    debug!(pgid = pgid.as_raw(), ?signal, "Signalling process group");
    killpg(pgid, signal).map_err(|e| SupervisorError::signal(pgid.as_raw(), e))
}

/// Launch `binary` in its own process group with the given arguments
pub fn spawn(binary: &InstalledBinary, args: &[OsString], sinks: &OutputSinks) -> Result<Child> {
    let path = binary.path.display().to_string();

    let mut command = Command::new(&binary.path);
    command
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(sinks.stdout.stdio().map_err(|e| SupervisorError::spawn(&path, e))?)
        .stderr(sinks.stderr.stdio().map_err(|e| SupervisorError::spawn(&path, e))?)
        .process_group(0);

    command.spawn().map_err(|e| SupervisorError::spawn(path, e))
}
