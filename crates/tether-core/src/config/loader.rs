//! Layered configuration loader
//!
//! Loads configuration from the following sources (low to high precedence):
//! 1. Built-in defaults
//! 2. YAML file named by `TETHER_CONFIG` (optional)
//! 3. Environment variables (`TETHER_*` prefix)

use crate::error::{Error, Result};
use crate::types::RuntimeConfig;
use camino::{Utf8Path, Utf8PathBuf};
use std::env;
use std::fs;
use tracing::debug;

/// Environment variable naming an optional YAML configuration file
pub const CONFIG_FILE_ENV: &str = "TETHER_CONFIG";

/// Host stream names that mean "inherit" rather than "open this file"
const HOST_STDOUT: &str = "/dev/stdout";
const HOST_STDERR: &str = "/dev/stderr";

/// Configuration loader
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Optional YAML file layered over the defaults
    config_file: Option<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a loader that honours `TETHER_CONFIG`
    pub fn new() -> Self {
        let config_file = env::var(CONFIG_FILE_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(Utf8PathBuf::from);
        Self { config_file }
    }

    /// Create a loader reading an explicit configuration file
    pub fn with_file(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            config_file: Some(path.into()),
        }
    }

    /// The configuration file this loader reads, if any
    pub fn config_file(&self) -> Option<&Utf8Path> {
        self.config_file.as_deref()
    }

    /// Load runtime configuration from the process environment
    pub fn load(&self) -> Result<RuntimeConfig> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Load runtime configuration using `lookup` for environment values
    pub fn load_with<F>(&self, lookup: F) -> Result<RuntimeConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RuntimeConfig::default();

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(Error::config_not_found(path.as_str()));
            }
            debug!("Loading configuration file {}", path);
            let content = fs::read_to_string(path)?;
            config = serde_yaml_ng::from_str(&content)
                .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;
        }

        let config = apply_env_overrides(config, lookup)?;
        validate(&config)?;
        Ok(config)
    }
}

/// Apply `TETHER_*` overrides; empty values count as unset
fn apply_env_overrides<F>(mut config: RuntimeConfig, lookup: F) -> Result<RuntimeConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    // Supervisor
    if let Some(val) = get("TETHER_UPDATE_CRON") {
        config.supervisor.update_cron = Some(val);
    }

    if let Some(val) = get("TETHER_CLI_VERSION") {
        config.supervisor.cli_version = Some(val);
    }

    if let Some(val) = get("TETHER_WORKING_DIR") {
        config.supervisor.working_dir = Utf8PathBuf::from(val);
    }

    if let Some(val) = get("TETHER_STDOUT_FILE") {
        config.supervisor.stdout_file = (val != HOST_STDOUT).then(|| Utf8PathBuf::from(val));
    }

    if let Some(val) = get("TETHER_STDERR_FILE") {
        config.supervisor.stderr_file = (val != HOST_STDERR).then(|| Utf8PathBuf::from(val));
    }

    if let Some(val) = get("TETHER_LIVENESS_FILE") {
        config.supervisor.liveness_file = Some(Utf8PathBuf::from(val));
    }

    if let Some(val) = get("TETHER_READINESS_FILE") {
        config.supervisor.readiness_file = Some(Utf8PathBuf::from(val));
    }

    if let Some(val) = get("TETHER_FORWARD_SHUTDOWN") {
        config.supervisor.forward_shutdown = match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => {
                return Err(Error::invalid_config(
                    "TETHER_FORWARD_SHUTDOWN must be true or false",
                ))
            }
        };
    }

    // Release source
    if let Some(val) = get("TETHER_GITHUB_REPO_OWNER") {
        config.github.repo_owner = val;
    }

    if let Some(val) = get("TETHER_GITHUB_REPO_NAME") {
        config.github.repo_name = val;
    }

    if let Some(val) = get("TETHER_GITHUB_API_URL") {
        config.github.api_url = val.trim_end_matches('/').to_string();
    }

    if let Some(val) = get("TETHER_GITHUB_TOKEN") {
        config.github.token = Some(val);
    }

    if let Some(val) = get("TETHER_ASSET_SUFFIX") {
        config.github.asset_suffix = Some(val);
    }

    // Network timeouts
    if let Some(val) = get("TETHER_HTTP_TIMEOUT_SECS") {
        config.network.http_timeout_secs = val.trim().parse().map_err(|_| {
            Error::invalid_config("TETHER_HTTP_TIMEOUT_SECS must be a valid number")
        })?;
    }

    if let Some(val) = get("TETHER_DOWNLOAD_TIMEOUT_SECS") {
        config.network.download_timeout_secs = val.trim().parse().map_err(|_| {
            Error::invalid_config("TETHER_DOWNLOAD_TIMEOUT_SECS must be a valid number")
        })?;
    }

    Ok(config)
}

fn validate(config: &RuntimeConfig) -> Result<()> {
    config.supervisor.pinned_version()?;

    if config.network.http_timeout_secs == 0 || config.network.download_timeout_secs == 0 {
        return Err(Error::invalid_config("network timeouts must be greater than zero"));
    }

    if config.github.repo_owner.is_empty() || config.github.repo_name.is_empty() {
        return Err(Error::invalid_config(
            "release repository owner and name must not be empty",
        ));
    }

    Ok(())
}
