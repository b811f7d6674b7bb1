//! Version targets and installed binaries

use anyhow::{Context, Result};
use semver::Version;
use std::fmt;
use std::path::PathBuf;

/// Which release to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallTarget {
    /// The latest published release
    Latest,
    /// A specific (pinned) version
    Version(Version),
}

impl InstallTarget {
    /// Build a target from an optional pinned version
    pub fn from_pinned(pinned: Option<Version>) -> Self {
        pinned.map(Self::Version).unwrap_or(Self::Latest)
    }

    /// Release tag to request for a pinned target
    pub fn tag(&self) -> Option<String> {
        match self {
            Self::Latest => None,
            Self::Version(v) => Some(format!("v{}", v)),
        }
    }
}

impl fmt::Display for InstallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Version(v) => write!(f, "{}", v),
        }
    }
}

/// An executable installed on disk, paired with the version it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBinary {
    pub version: Version,
    pub path: PathBuf,
}

impl InstalledBinary {
    pub fn new(version: Version, path: impl Into<PathBuf>) -> Self {
        Self {
            version,
            path: path.into(),
        }
    }
}

/// Parse a release tag such as `v0.33.1` into a semantic version
pub fn parse_tag_version(tag: &str) -> Result<Version> {
    let trimmed = tag.trim();
    Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed))
        .with_context(|| format!("release tag {:?} is not a semantic version", tag))
}
