//! Binary extraction from release archives
//!
//! Release archives are gzip-compressed tarballs that hold the executable
//! next to a LICENSE and README. Exactly one regular file above the size
//! threshold may qualify as the binary.

use anyhow::{anyhow, bail, Context, Result};
use flate2::read::GzDecoder;
use semver::Version;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::debug;

/// Files smaller than this cannot be the binary (1MB)
pub const DEFAULT_MIN_BINARY_SIZE: u64 = 1024 * 1024;

/// Extracts the single qualifying executable from a `.tar.gz` archive
#[derive(Debug, Clone)]
pub struct BinaryExtractor {
    min_size: u64,
}

impl Default for BinaryExtractor {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_BINARY_SIZE,
        }
    }
}

impl BinaryExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the minimum size a file must have to qualify
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    /// Name of the installed executable for `version`
    pub fn binary_name(version: &Version) -> String {
        format!("cli-{}", version)
    }

    /// Extract the binary from `archive` into `dest_dir` as `cli-{version}`
    ///
    /// The file is written next to its final location and renamed into place,
    /// so a running binary with the same name is never truncated.
    pub fn extract(&self, archive: &Path, dest_dir: &Path, version: &Version) -> Result<PathBuf> {
        fs::create_dir_all(dest_dir)
            .with_context(|| format!("create install directory {}", dest_dir.display()))?;

        let target = dest_dir.join(Self::binary_name(version));
        let partial = dest_dir.join(format!(".{}.partial", Self::binary_name(version)));

        let result = self.unpack_single(archive, &partial);
        if result.is_err() {
            let _ = fs::remove_file(&partial);
        }
        result.with_context(|| format!("extract {}", archive.display()))?;

        set_executable(&partial)?;
        fs::rename(&partial, &target)
            .with_context(|| format!("move binary into {}", target.display()))?;

        debug!("Extracted binary to {}", target.display());
        Ok(target)
    }

    fn unpack_single(&self, archive: &Path, out_path: &Path) -> Result<()> {
        let file = File::open(archive)
            .with_context(|| format!("open archive {}", archive.display()))?;
        let mut tarball = Archive::new(GzDecoder::new(file));
        let mut found: Option<String> = None;

        for entry in tarball.entries().context("read tar.gz archive")? {
            let mut entry = entry.context("read archive entry")?;
            let name = entry.path()?.to_string_lossy().into_owned();

            match entry.header().entry_type() {
                EntryType::Directory => bail!("found directories in the tar.gz archive"),
                EntryType::Regular => {
                    if is_bundled_doc(&name) || entry.size() < self.min_size {
                        debug!("Skipping archive entry {}", name);
                        continue;
                    }
                    if let Some(first) = &found {
                        bail!("multiple candidate binaries in archive: {} and {}", first, name);
                    }

                    let mut out = File::create(out_path)
                        .with_context(|| format!("create {}", out_path.display()))?;
                    io::copy(&mut entry, &mut out)
                        .with_context(|| format!("extract {}", name))?;
                    found = Some(name);
                }
                EntryType::XGlobalHeader | EntryType::XHeader => continue,
                other => bail!("unknown entry {:?} ({}) found in tar.gz archive", other, name),
            }
        }

        match found {
            Some(_) => Ok(()),
            None => Err(anyhow!("no files found to extract from tar.gz archive")),
        }
    }
}

/// goreleaser ships LICENSE and README files next to the binary
fn is_bundled_doc(name: &str) -> bool {
    let base = name.rsplit('/').next().unwrap_or(name);
    base == "LICENSE" || base.starts_with("README")
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o750))
        .with_context(|| format!("set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
