//! In-memory release provider

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use semver::Version;
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use tether_update::{InstallTarget, InstalledBinary, ReleaseProvider};

use super::scripts::{render, Behavior};

/// A single launch recorded by a fake CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub version: String,
    pub pid: u32,
    pub args: Vec<String>,
}

/// Release provider that "installs" shell scripts
pub struct FakeProvider {
    latest: Mutex<Version>,
    behaviors: Mutex<HashMap<Version, Behavior>>,
    fail_latest: AtomicBool,
    fail_install: AtomicBool,
    fixed_path: bool,
    installs: Mutex<Vec<InstallTarget>>,
    lookups: AtomicU32,
    log: PathBuf,
}

impl FakeProvider {
    /// `log` receives one line per launch
    pub fn new(latest: &str, log: impl Into<PathBuf>) -> Self {
        Self {
            latest: Mutex::new(parse(latest)),
            behaviors: Mutex::new(HashMap::new()),
            fail_latest: AtomicBool::new(false),
            fail_install: AtomicBool::new(false),
            fixed_path: false,
            installs: Mutex::new(Vec::new()),
            lookups: AtomicU32::new(0),
            log: log.into(),
        }
    }

    pub fn with_behavior(self, version: &str, behavior: Behavior) -> Self {
        self.behaviors.lock().unwrap().insert(parse(version), behavior);
        self
    }

    /// Install every version at `dir/cli` instead of `dir/cli-{version}`
    pub fn with_fixed_path(mut self) -> Self {
        self.fixed_path = true;
        self
    }

    pub fn publish(&self, version: &str) {
        *self.latest.lock().unwrap() = parse(version);
    }

    pub fn fail_latest(&self, fail: bool) {
        self.fail_latest.store(fail, Ordering::SeqCst);
    }

    pub fn fail_install(&self, fail: bool) {
        self.fail_install.store(fail, Ordering::SeqCst);
    }

    pub fn installs(&self) -> Vec<InstallTarget> {
        self.installs.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Launches recorded so far, oldest first
    pub fn launches(&self) -> Vec<Launch> {
        let Ok(content) = fs::read_to_string(&self.log) else {
            return Vec::new();
        };

        content
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let version = parts.next()?.to_string();
                let pid = parts.next()?.parse().ok()?;
                let args = parts.map(str::to_string).collect();
                Some(Launch { version, pid, args })
            })
            .collect()
    }
}

#[async_trait]
impl ReleaseProvider for FakeProvider {
    async fn get_latest(&self) -> Result<Version> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_latest.load(Ordering::SeqCst) {
            return Err(anyhow!("get latest version: connection refused"));
        }
        Ok(self.latest.lock().unwrap().clone())
    }

    async fn install(&self, target: &InstallTarget, dir: &Path) -> Result<InstalledBinary> {
        self.installs.lock().unwrap().push(target.clone());
        if self.fail_install.load(Ordering::SeqCst) {
            return Err(anyhow!("no compatible asset found"));
        }

        let version = match target {
            InstallTarget::Latest => self.latest.lock().unwrap().clone(),
            InstallTarget::Version(v) => v.clone(),
        };
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&version)
            .copied()
            .unwrap_or(Behavior::Serve);

        fs::create_dir_all(dir)?;
        let name = match self.fixed_path {
            true => "cli".to_string(),
            false => format!("cli-{}", version),
        };
        let path = dir.join(&name);
        let partial = dir.join(format!(".{}.partial", name));

        // Replace by rename so a shell still reading the old script is unaffected
        fs::write(&partial, render(&version.to_string(), behavior, &self.log, dir))?;
        fs::set_permissions(&partial, fs::Permissions::from_mode(0o750))?;
        fs::rename(&partial, &path)?;

        Ok(InstalledBinary::new(version, path))
    }
}

fn parse(version: &str) -> Version {
    Version::parse(version).unwrap()
}
