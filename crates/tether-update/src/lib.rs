//! Release provider for tether
//!
//! Provides:
//! - Latest/tagged release lookup against the GitHub releases API
//! - Platform archive selection (goreleaser `{os}_{arch}.tar.gz` naming)
//! - Archive download with retry and SHA-256 verification
//! - Extraction of the single qualifying binary from a `.tar.gz` archive
//! - The [`ReleaseProvider`] trait consumed by the supervisor

pub mod download;
pub mod error;
pub mod extract;
pub mod platform;
pub mod provider;
pub mod releases;
pub mod version;

pub use download::{BinaryDownloader, DownloadResult};
pub use error::StatusError;
pub use extract::BinaryExtractor;
pub use provider::{GithubReleaseProvider, ReleaseProvider};
pub use releases::{Release, ReleaseAsset, ReleaseManager};
pub use version::{InstallTarget, InstalledBinary};
