//! Release archive download with retry and verification
//!
//! Archives are streamed into a private temporary directory, their size is
//! checked against the release metadata, and their SHA-256 digest is
//! compared with the release's `checksums.txt` when one is published.
//!
//! # Example
//!
//! ```no_run
//! use tether_core::RuntimeConfig;
//! use tether_update::{BinaryDownloader, ReleaseManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RuntimeConfig::default();
//!     let release = ReleaseManager::new(&config)?.get_latest().await?;
//!
//!     let downloader = BinaryDownloader::new(&config)?;
//!     let result = downloader
//!         .download_release(&release, "linux_amd64.tar.gz")
//!         .await?;
//!
//!     println!("Downloaded to: {:?}", result.file_path);
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Context, Result};
use futures_util::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tether_core::retry::{RetryExecutor, TracingObserver};
use tether_core::types::{RetryPolicy, RuntimeConfig};
use tracing::{debug, info};

use crate::error::{flatten_retry, transient_http, StatusError};
use crate::releases::{Release, ReleaseAsset};

/// Read buffer size for checksum calculation (1MB)
const CHECKSUM_CHUNK_SIZE: usize = 1024 * 1024;

/// Result of a download operation
#[derive(Debug)]
pub struct DownloadResult {
    /// Path to the downloaded file
    pub file_path: PathBuf,

    /// Size of the downloaded file in bytes
    pub file_size: u64,

    /// SHA256 checksum of the downloaded file
    pub checksum: String,

    /// Whether the checksum matched a published manifest
    pub verified: bool,
}

/// Binary downloader with retry and verification capabilities
pub struct BinaryDownloader {
    /// HTTP client
    client: reqwest::Client,

    /// Temporary directory for downloads
    temp_dir: TempDir,

    /// Retry policy for download operations
    retry_policy: RetryPolicy,
}

impl BinaryDownloader {
    /// Create a downloader using the configured download timeout and policy
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temporary directory")?;

        let client = reqwest::Client::builder()
            .user_agent(&config.network.user_agent)
            .timeout(Duration::from_secs(config.network.download_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            temp_dir,
            retry_policy: config.retry_policies.for_operation("download"),
        })
    }

    /// Override the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Download the release archive whose name ends with `suffix`
    pub async fn download_release(&self, release: &Release, suffix: &str) -> Result<DownloadResult> {
        let asset = release.asset_with_suffix(suffix).ok_or_else(|| {
            anyhow!(
                "no compatible asset found in release {} (looking for *{})",
                release.tag_name,
                suffix
            )
        })?;

        info!(
            "Downloading {} ({})",
            asset.name,
            human_readable_size(asset.size)
        );

        let executor = RetryExecutor::new(
            self.retry_policy.clone(),
            transient_http(),
            TracingObserver::new("download"),
        );

        let mut result = executor
            .execute(|| self.download_asset(asset))
            .await
            .map_err(flatten_retry)
            .with_context(|| format!("download {}", asset.name))?;

        if let Some(manifest) = release.checksums_asset() {
            let checksums = self.fetch_checksums(manifest).await?;
            let expected = checksums
                .get(&asset.name)
                .ok_or_else(|| anyhow!("{} does not list {}", manifest.name, asset.name))?;

            if !result.checksum.eq_ignore_ascii_case(expected) {
                let _ = fs::remove_file(&result.file_path);
                return Err(anyhow!(
                    "checksum mismatch for {}: expected {}, got {}",
                    asset.name,
                    expected,
                    result.checksum
                ));
            }
            result.verified = true;
            debug!("Checksum verified for {}", asset.name);
        }

        Ok(result)
    }

    /// Download a single asset
    async fn download_asset(&self, asset: &ReleaseAsset) -> Result<DownloadResult> {
        let file_path = self.temp_dir.path().join(&asset.name);
        let temp_file_path = self.temp_dir.path().join(format!("{}.tmp", asset.name));

        let response = self
            .client
            .get(&asset.browser_download_url)
            .send()
            .await
            .context("Failed to send download request")?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatusError::new(status.as_u16(), &asset.browser_download_url).into());
        }

        let expected_size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|ct| ct.to_str().ok())
            .and_then(|ct| ct.parse::<u64>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(asset.size);

        // Each attempt starts from an empty file
        let mut file = File::create(&temp_file_path).context("Failed to create temporary file")?;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk: bytes::Bytes = chunk_result.context("Failed to read download chunk")?;
            file.write_all(&chunk)
                .context("Failed to write to temporary file")?;
        }
        file.flush()?;
        drop(file);

        let final_size = fs::metadata(&temp_file_path)?.len();
        if expected_size > 0 && final_size != expected_size {
            return Err(anyhow!(
                "File size mismatch: expected {}, got {}",
                expected_size,
                final_size
            ));
        }

        debug!("Calculating SHA256 checksum...");
        let checksum = calculate_checksum(&temp_file_path)?;

        fs::rename(&temp_file_path, &file_path)
            .context("Failed to move downloaded file to final location")?;

        Ok(DownloadResult {
            file_path,
            file_size: final_size,
            checksum,
            verified: false,
        })
    }

    /// Fetch and parse a goreleaser checksum manifest
    async fn fetch_checksums(&self, manifest: &ReleaseAsset) -> Result<HashMap<String, String>> {
        let executor = RetryExecutor::new(
            self.retry_policy.clone(),
            transient_http(),
            TracingObserver::new("checksums"),
        );

        let body = executor
            .execute(|| self.request_text(&manifest.browser_download_url))
            .await
            .map_err(flatten_retry)
            .with_context(|| format!("download {}", manifest.name))?;

        Ok(parse_checksums(&body))
    }

    async fn request_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StatusError::new(status.as_u16(), url).into());
        }
        Ok(response.text().await?)
    }
}

/// Parse `<sha256>  <file name>` lines into a name → digest map
pub fn parse_checksums(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let digest = parts.next()?;
            // sha256sum marks binary mode with a leading '*'
            let name = parts.next()?.trim_start_matches('*');
            Some((name.to_string(), digest.to_lowercase()))
        })
        .collect()
}

/// Calculate SHA256 checksum of a file
pub fn calculate_checksum(path: &Path) -> Result<String> {
    let mut file = File::open(path).context("Failed to open file for checksum calculation")?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHECKSUM_CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Convert bytes to human-readable size
fn human_readable_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
