//! Platform archive naming
//!
//! Releases follow goreleaser conventions: one archive per platform named
//! `<project>_<version>_<os>_<arch>.tar.gz`, with Go's `GOOS`/`GOARCH` names.

use tracing::debug;

/// Archive name suffix for the platform this binary was built for
pub fn current_asset_suffix() -> String {
    asset_suffix(std::env::consts::OS, std::env::consts::ARCH)
}

/// Archive name suffix for a Rust `(os, arch)` pair
pub fn asset_suffix(os: &str, arch: &str) -> String {
    let os = match os {
        "macos" => "darwin",
        other => other,
    };
    let arch = match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    };

    let suffix = format!("{}_{}.tar.gz", os, arch);
    debug!("Platform archive suffix: {}", suffix);
    suffix
}
