//! The release provider consumed by the supervisor

use anyhow::{Context, Result};
use async_trait::async_trait;
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};
use tether_core::types::RuntimeConfig;
use tracing::{debug, info};

use crate::download::BinaryDownloader;
use crate::extract::BinaryExtractor;
use crate::platform::current_asset_suffix;
use crate::releases::ReleaseManager;
use crate::version::{InstallTarget, InstalledBinary};

/// Resolves and installs published versions of the supervised binary
#[async_trait]
pub trait ReleaseProvider: Send + Sync {
    /// Version of the latest published release
    async fn get_latest(&self) -> Result<Version>;

    /// Download and extract `target` into `dir`
    async fn install(&self, target: &InstallTarget, dir: &Path) -> Result<InstalledBinary>;
}

/// [`ReleaseProvider`] backed by the GitHub releases API
pub struct GithubReleaseProvider {
    releases: ReleaseManager,
    downloader: BinaryDownloader,
    extractor: BinaryExtractor,
    asset_suffix: String,
}

impl GithubReleaseProvider {
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let asset_suffix = config
            .github
            .asset_suffix
            .clone()
            .unwrap_or_else(current_asset_suffix);

        debug!("Release asset suffix: {}", asset_suffix);

        Ok(Self {
            releases: ReleaseManager::new(config)?,
            downloader: BinaryDownloader::new(config)?,
            extractor: BinaryExtractor::new(),
            asset_suffix,
        })
    }

    /// Replace the archive extractor
    pub fn with_extractor(mut self, extractor: BinaryExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Archive suffix used to pick the platform asset
    pub fn asset_suffix(&self) -> &str {
        &self.asset_suffix
    }
}

#[async_trait]
impl ReleaseProvider for GithubReleaseProvider {
    async fn get_latest(&self) -> Result<Version> {
        self.releases.latest_version().await
    }

    async fn install(&self, target: &InstallTarget, dir: &Path) -> Result<InstalledBinary> {
        let release = match target.tag() {
            None => self.releases.get_latest().await?,
            Some(tag) => self.releases.get_release(&tag).await?,
        };
        let version = release.version()?;

        info!("Installing version {} into {}", version, dir.display());

        let download = self
            .downloader
            .download_release(&release, &self.asset_suffix)
            .await?;

        let extractor = self.extractor.clone();
        let archive = download.file_path.clone();
        let dest: PathBuf = dir.to_path_buf();
        let extract_version = version.clone();

        let extracted = tokio::task::spawn_blocking(move || {
            extractor.extract(&archive, &dest, &extract_version)
        })
        .await
        .context("extraction task failed")?;

        // The archive is no longer needed whether or not extraction worked
        let _ = fs::remove_file(&download.file_path);

        let path = extracted?;
        info!("Installed version {} at {}", version, path.display());
        Ok(InstalledBinary::new(version, path))
    }
}
