//! Runtime configuration types
//!
//! These types define everything the supervisor reads at startup: where
//! releases come from, how HTTP calls are retried, and how the supervised
//! child is wired into the host (output sinks, health markers, schedule).

use camino::Utf8PathBuf;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Cron expression used when no update schedule is configured (daily at 02:00)
pub const DEFAULT_UPDATE_CRON: &str = "0 2 * * *";

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Network and HTTP configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Retry policy configurations
    #[serde(default)]
    pub retry_policies: RetryPoliciesConfig,

    /// Release repository settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Supervisor behaviour
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

/// Network and HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Release metadata request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Archive download timeout in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            download_timeout_secs: default_download_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}
fn default_download_timeout() -> u64 {
    300 // 5 minutes
}
fn default_user_agent() -> String {
    format!(
        "tether/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Retry policy configurations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPoliciesConfig {
    /// Default retry policy
    #[serde(default)]
    pub default: RetryPolicy,

    /// Per-operation retry policies
    #[serde(default)]
    pub operations: HashMap<String, RetryPolicy>,
}

impl RetryPoliciesConfig {
    /// Policy for a named operation, falling back to the default policy
    pub fn for_operation(&self, operation: &str) -> RetryPolicy {
        self.operations
            .get(operation)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

impl Default for RetryPoliciesConfig {
    fn default() -> Self {
        let mut operations = HashMap::new();

        // A single retry layer around HTTP calls; the schedule retries the rest
        operations.insert(
            "download".to_string(),
            RetryPolicy {
                max_attempts: 3,
                strategy: RetryStrategy::ExponentialBackoff,
                backoff_multiplier: 2.0,
                initial_delay_ms: 1000,
                max_delay_ms: 30000,
            },
        );

        Self {
            default: RetryPolicy::default(),
            operations,
        }
    }
}

/// Retry policy for an operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first one)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Retry strategy
    #[serde(default)]
    pub strategy: RetryStrategy,

    /// Backoff multiplier for exponential strategies
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            strategy: RetryStrategy::default(),
            backoff_multiplier: default_backoff_multiplier(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    30000
}

/// Retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RetryStrategy {
    /// No retry
    None,

    /// Fixed delay between retries
    FixedDelay,

    /// Exponential backoff (default)
    #[default]
    ExponentialBackoff,

    /// Linear backoff
    LinearBackoff,
}

/// Release repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// Repository owner
    #[serde(default = "default_repo_owner")]
    pub repo_owner: String,

    /// Repository name
    #[serde(default = "default_repo_name")]
    pub repo_name: String,

    /// Base URL for the GitHub API
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Optional API token (raises rate limits)
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Archive name suffix override (e.g. `linux_amd64.tar.gz`)
    #[serde(default)]
    pub asset_suffix: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repo_owner: default_repo_owner(),
            repo_name: default_repo_name(),
            api_url: default_github_api_url(),
            token: None,
            asset_suffix: None,
        }
    }
}

fn default_repo_owner() -> String {
    "raito-io".to_string()
}
fn default_repo_name() -> String {
    "cli".to_string()
}
fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

/// Supervisor behaviour and process wiring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SupervisorConfig {
    /// Update-check cron expression; `None` falls back to [`DEFAULT_UPDATE_CRON`]
    #[serde(default)]
    pub update_cron: Option<String>,

    /// Pinned CLI version; `None` means always run the latest release
    #[serde(default)]
    pub cli_version: Option<String>,

    /// Directory the supervised binary is installed into
    #[serde(default = "default_working_dir")]
    pub working_dir: Utf8PathBuf,

    /// Child stdout target; `None` inherits the host's stdout
    #[serde(default)]
    pub stdout_file: Option<Utf8PathBuf>,

    /// Child stderr target; `None` inherits the host's stderr
    #[serde(default)]
    pub stderr_file: Option<Utf8PathBuf>,

    /// Liveness marker file
    #[serde(default)]
    pub liveness_file: Option<Utf8PathBuf>,

    /// Readiness marker file
    #[serde(default)]
    pub readiness_file: Option<Utf8PathBuf>,

    /// Send SIGTERM to a running child when the host shuts down, instead of
    /// waiting for it to exit on its own
    #[serde(default)]
    pub forward_shutdown: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            update_cron: None,
            cli_version: None,
            working_dir: default_working_dir(),
            stdout_file: None,
            stderr_file: None,
            liveness_file: None,
            readiness_file: None,
            forward_shutdown: false,
        }
    }
}

fn default_working_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("./")
}

impl SupervisorConfig {
    /// Parse the pinned version, accepting an optional leading `v`
    pub fn pinned_version(&self) -> Result<Option<Version>> {
        match self.cli_version.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Version::parse(raw.trim_start_matches('v'))
                .map(Some)
                .map_err(|_| Error::invalid_version(raw)),
        }
    }

    /// The configured cron expression, if one was set explicitly
    pub fn explicit_cron(&self) -> Option<&str> {
        self.update_cron
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}
