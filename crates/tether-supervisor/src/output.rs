//! Child stdout/stderr targets

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tether_core::types::SupervisorConfig;
use tracing::debug;

/// Where a child output stream goes
#[derive(Debug)]
pub enum OutputSink {
    /// Share the host's own stream
    Inherit,
    /// Append to a file opened once at startup
    File { path: PathBuf, file: File },
}

impl OutputSink {
    /// Open `path` for appending, or inherit the host stream when `None`
    pub fn open(path: Option<&Path>) -> io::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::Inherit);
        };

        let mut options = OpenOptions::new();
        options.create(true).append(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let file = options.open(path)?;
        debug!("Child output will be appended to {}", path.display());

        Ok(Self::File {
            path: path.to_path_buf(),
            file,
        })
    }

    /// A fresh `Stdio` for one child invocation
    pub fn stdio(&self) -> io::Result<Stdio> {
        match self {
            Self::Inherit => Ok(Stdio::inherit()),
            Self::File { file, .. } => Ok(Stdio::from(file.try_clone()?)),
        }
    }

    /// The target file, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Inherit => None,
            Self::File { path, .. } => Some(path),
        }
    }
}

/// The stdout/stderr pair handed to every child
#[derive(Debug)]
pub struct OutputSinks {
    pub stdout: OutputSink,
    pub stderr: OutputSink,
}

impl OutputSinks {
    /// Inherit both host streams
    pub fn inherit() -> Self {
        Self {
            stdout: OutputSink::Inherit,
            stderr: OutputSink::Inherit,
        }
    }

    /// Open the targets named in the supervisor configuration
    pub fn open(config: &SupervisorConfig) -> io::Result<Self> {
        Ok(Self {
            stdout: OutputSink::open(config.stdout_file.as_deref().map(|p| p.as_std_path()))?,
            stderr: OutputSink::open(config.stderr_file.as_deref().map(|p| p.as_std_path()))?,
        })
    }
}

impl Default for OutputSinks {
    fn default() -> Self {
        Self::inherit()
    }
}
