//! GitHub releases lookup

use anyhow::{anyhow, Context, Result};
use reqwest::header::ACCEPT;
use semver::Version;
use serde::Deserialize;
use std::time::Duration;
use tether_core::retry::{RetryExecutor, TracingObserver};
use tether_core::types::{GitHubConfig, RetryPolicy, RuntimeConfig};
use tracing::debug;

use crate::error::{flatten_retry, transient_http, StatusError};
use crate::version::parse_tag_version;

const GITHUB_JSON: &str = "application/vnd.github+json";

/// Release information
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Release tag (e.g., "v0.33.0")
    pub tag_name: String,

    /// Release name
    #[serde(default)]
    pub name: Option<String>,

    /// Whether this is a prerelease
    #[serde(default)]
    pub prerelease: bool,

    /// Release assets
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,

    /// Published date
    #[serde(default)]
    pub published_at: Option<String>,
}

impl Release {
    /// Semantic version of this release's tag
    pub fn version(&self) -> Result<Version> {
        parse_tag_version(&self.tag_name)
    }

    /// The archive whose name ends with `suffix`
    pub fn asset_with_suffix(&self, suffix: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name.ends_with(suffix))
    }

    /// The goreleaser checksum manifest, if published
    pub fn checksums_asset(&self) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name.ends_with("checksums.txt"))
    }
}

/// Release asset
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    /// Asset name
    pub name: String,

    /// Download URL
    pub browser_download_url: String,

    /// Asset size in bytes
    #[serde(default)]
    pub size: u64,
}

/// Release manager for looking up published releases
pub struct ReleaseManager {
    client: reqwest::Client,
    github: GitHubConfig,
    retry_policy: RetryPolicy,
}

impl ReleaseManager {
    /// Create a release manager from runtime configuration
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.network.user_agent)
            .timeout(Duration::from_secs(config.network.http_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            github: config.github.clone(),
            retry_policy: config.retry_policies.for_operation("release-metadata"),
        })
    }

    /// Base URL of the repository's releases collection
    fn releases_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.github.api_url.trim_end_matches('/'),
            self.github.repo_owner,
            self.github.repo_name
        )
    }

    /// Get the latest published release
    pub async fn get_latest(&self) -> Result<Release> {
        let url = format!("{}/latest", self.releases_url());
        self.fetch_release(&url)
            .await
            .context("get latest version")
    }

    /// Get a release by tag
    pub async fn get_release(&self, tag: &str) -> Result<Release> {
        let url = format!("{}/tags/{}", self.releases_url(), tag);
        self.fetch_release(&url)
            .await
            .with_context(|| format!("get release {}", tag))
    }

    /// Version of the latest published release
    pub async fn latest_version(&self) -> Result<Version> {
        self.get_latest().await?.version()
    }

    async fn fetch_release(&self, url: &str) -> Result<Release> {
        debug!("Fetching release from: {}", url);

        let executor = RetryExecutor::new(
            self.retry_policy.clone(),
            transient_http(),
            TracingObserver::new("release-metadata"),
        );

        executor
            .execute(|| self.request_release(url))
            .await
            .map_err(flatten_retry)
    }

    async fn request_release(&self, url: &str) -> Result<Release> {
        let mut request = self.client.get(url).header(ACCEPT, GITHUB_JSON);
        if let Some(token) = &self.github.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StatusError::new(status.as_u16(), url).into());
        }

        let release: Release = response.json().await?;
        if release.tag_name.is_empty() {
            return Err(anyhow!("release at {} has no tag", url));
        }
        Ok(release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release_with_assets(names: &[&str]) -> Release {
        Release {
            tag_name: "v0.33.0".to_string(),
            name: None,
            prerelease: false,
            assets: names
                .iter()
                .map(|name| ReleaseAsset {
                    name: name.to_string(),
                    browser_download_url: format!("https://example.com/{}", name),
                    size: 1,
                })
                .collect(),
            published_at: None,
        }
    }

    #[test]
    fn test_asset_with_suffix() {
        let release = release_with_assets(&[
            "cli_0.33.0_checksums.txt",
            "cli_0.33.0_darwin_arm64.tar.gz",
            "cli_0.33.0_linux_amd64.tar.gz",
        ]);

        let asset = release.asset_with_suffix("linux_amd64.tar.gz").unwrap();
        assert_eq!(asset.name, "cli_0.33.0_linux_amd64.tar.gz");
        assert!(release.asset_with_suffix("windows_386.tar.gz").is_none());
        assert_eq!(
            release.checksums_asset().unwrap().name,
            "cli_0.33.0_checksums.txt"
        );
    }

    #[test]
    fn test_release_version() {
        let release = release_with_assets(&[]);
        assert_eq!(release.version().unwrap(), Version::new(0, 33, 0));
    }

    #[test]
    fn test_releases_url_trims_slash() {
        let mut config = RuntimeConfig::default();
        config.github.api_url = "http://localhost:1234/".to_string();
        config.github.repo_owner = "acme".to_string();
        config.github.repo_name = "tool".to_string();

        let manager = ReleaseManager::new(&config).unwrap();
        assert_eq!(
            manager.releases_url(),
            "http://localhost:1234/repos/acme/tool/releases"
        );
    }
}
