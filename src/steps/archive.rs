//! Staged extraction of install media.
//!
//! The archive is unpacked into a temporary directory next to the
//! destination and only moved into place once every entry has been
//! written. A corrupt or interrupted archive therefore leaves the
//! destination exactly as it was.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};

use crate::error::{ProvisionError, Result};
use crate::platform::AccessGrant;
use crate::runner::CancellationToken;
use crate::steps::{Applied, CheckResult, Step, StepContext};

/// Marker file written into the destination after a complete extraction.
pub const DEFAULT_MARKER: &str = ".provision-extracted";

/// Archive formats the step can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    /// Detect the format from the file name.
    pub fn detect(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".zip") {
            Ok(ArchiveFormat::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(ArchiveFormat::TarGz)
        } else if name.ends_with(".tar") {
            Ok(ArchiveFormat::Tar)
        } else {
            Err(ProvisionError::configuration(format!(
                "unsupported archive format: {}",
                path.display()
            )))
        }
    }
}

/// Unpack an archive into a destination directory.
#[derive(Debug, Clone)]
pub struct ExtractArchive {
    name: String,
    archive: PathBuf,
    destination: PathBuf,
    marker: Option<String>,
    sha256: Option<String>,
    owner: Option<AccessGrant>,
}

impl ExtractArchive {
    pub fn new(archive: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        let archive = archive.into();
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| archive.display().to_string());
        Self {
            name: format!("extract {}", file_name),
            archive,
            destination: destination.into(),
            marker: None,
            sha256: None,
            owner: None,
        }
    }

    /// Record completion with a marker file of this name in the destination.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Verify the archive against a hex-encoded SHA-256 before unpacking.
    pub fn with_sha256(mut self, digest: Option<String>) -> Self {
        self.sha256 = digest;
        self
    }

    /// Hand the unpacked tree to an account before the marker is written.
    pub fn owned_by(mut self, grant: AccessGrant) -> Self {
        self.owner = Some(grant);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn marker_path(&self) -> Option<PathBuf> {
        self.marker.as_ref().map(|m| self.destination.join(m))
    }
}

impl Step for ExtractArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        format!(
            "Extract {} into {}",
            self.archive.display(),
            self.destination.display()
        )
    }

    fn check(&self, _ctx: &StepContext<'_>) -> CheckResult {
        match self.marker_path() {
            Some(marker) if marker.exists() => {
                CheckResult::complete(format!("Already extracted: {}", self.destination.display()))
            }
            Some(marker) => CheckResult::incomplete(
                "Archive not extracted",
                format!("marker {} missing", marker.display()),
            ),
            None if dir_has_entries(&self.destination) => {
                CheckResult::complete(format!("Destination populated: {}", self.destination.display()))
            }
            None => CheckResult::incomplete(
                "Archive not extracted",
                format!("{} is empty or missing", self.destination.display()),
            ),
        }
    }

    fn apply(&self, ctx: &StepContext<'_>) -> Result<Applied> {
        if !self.archive.is_file() {
            return Err(ProvisionError::NotFound {
                path: self.archive.clone(),
            });
        }
        let format = ArchiveFormat::detect(&self.archive)?;

        if let Some(expected) = &self.sha256 {
            let actual = sha256_file(&self.archive)?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(ProvisionError::validation(format!(
                    "checksum mismatch for {}: expected {}, got {}",
                    self.archive.display(),
                    expected,
                    actual
                )));
            }
        }

        let parent = self
            .destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| ProvisionError::io(parent, e))?;
        let staging = tempfile::Builder::new()
            .prefix(".provision-extract-")
            .tempdir_in(parent)
            .map_err(|e| ProvisionError::io(parent, e))?;

        tracing::info!(
            "Extracting {} into {}",
            self.archive.display(),
            self.destination.display()
        );
        let entries = match format {
            ArchiveFormat::Zip => unpack_zip(&self.archive, staging.path(), &ctx.cancel)?,
            ArchiveFormat::Tar => {
                let file = open(&self.archive)?;
                unpack_tar(file, &self.archive, staging.path(), &ctx.cancel)?
            }
            ArchiveFormat::TarGz => {
                let file = open(&self.archive)?;
                unpack_tar(GzDecoder::new(file), &self.archive, staging.path(), &ctx.cancel)?
            }
        };

        if ctx.cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }

        fs::create_dir_all(&self.destination)
            .map_err(|e| ProvisionError::io(&self.destination, e))?;
        merge_into(staging.path(), &self.destination)?;

        if let Some(grant) = &self.owner {
            ctx.platform.set_owner_and_mode(&self.destination, grant)?;
        }

        if let Some(marker) = self.marker_path() {
            let digest = self.sha256.clone().unwrap_or_default();
            fs::write(
                &marker,
                format!("archive={}\nsha256={}\n", self.archive.display(), digest),
            )
            .map_err(|e| ProvisionError::io(&marker, e))?;
        }

        Ok(Applied::detail(format!(
            "extracted {} entries into {}",
            entries,
            self.destination.display()
        )))
    }
}

/// Hex-encoded SHA-256 of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| ProvisionError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| ProvisionError::io(path, e))
}

fn dir_has_entries(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn corrupt(archive: &Path, detail: impl std::fmt::Display) -> ProvisionError {
    ProvisionError::io(
        archive,
        io::Error::new(io::ErrorKind::InvalidData, detail.to_string()),
    )
}

fn escapes(archive: &Path, entry: &str) -> ProvisionError {
    ProvisionError::io(
        archive,
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("entry '{}' escapes the destination", entry),
        ),
    )
}

/// Whether an entry path stays below the directory it is unpacked into.
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn unpack_zip(archive: &Path, staging: &Path, cancel: &CancellationToken) -> Result<usize> {
    let mut zip = zip::ZipArchive::new(open(archive)?).map_err(|e| corrupt(archive, e))?;

    for index in 0..zip.len() {
        if cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }
        let mut entry = zip.by_index(index).map_err(|e| corrupt(archive, e))?;
        let relative = match entry.enclosed_name() {
            Some(path) if is_contained(&path) => path,
            _ => return Err(escapes(archive, entry.name())),
        };
        let target = staging.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| ProvisionError::io(&target, e))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| ProvisionError::io(parent, e))?;
            }
            let mut out = File::create(&target).map_err(|e| ProvisionError::io(&target, e))?;
            io::copy(&mut entry, &mut out).map_err(|e| corrupt(archive, e))?;
        }

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777))
                .map_err(|e| ProvisionError::io(&target, e))?;
        }
    }
    Ok(zip.len())
}

fn unpack_tar<R: Read>(
    reader: R,
    archive_path: &Path,
    staging: &Path,
    cancel: &CancellationToken,
) -> Result<usize> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    let entries = archive
        .entries()
        .map_err(|e| corrupt(archive_path, e))?;

    let mut count = 0;
    for entry in entries {
        if cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }
        let mut entry = entry.map_err(|e| corrupt(archive_path, e))?;
        let path = entry
            .path()
            .map_err(|e| corrupt(archive_path, e))?
            .into_owned();
        if !is_contained(&path) {
            return Err(escapes(archive_path, &path.display().to_string()));
        }
        let unpacked = entry
            .unpack_in(staging)
            .map_err(|e| corrupt(archive_path, e))?;
        if !unpacked {
            return Err(escapes(archive_path, &path.display().to_string()));
        }
        count += 1;
    }
    Ok(count)
}

/// Move everything under `from` into `to`, merging directories.
fn merge_into(from: &Path, to: &Path) -> Result<()> {
    for entry in fs::read_dir(from).map_err(|e| ProvisionError::io(from, e))? {
        let entry = entry.map_err(|e| ProvisionError::io(from, e))?;
        let source = entry.path();
        let target = to.join(entry.file_name());
        let is_dir = entry
            .file_type()
            .map_err(|e| ProvisionError::io(&source, e))?
            .is_dir();

        if is_dir && target.is_dir() {
            merge_into(&source, &target)?;
            continue;
        }
        if target.is_dir() {
            fs::remove_dir_all(&target).map_err(|e| ProvisionError::io(&target, e))?;
        } else if target.exists() {
            fs::remove_file(&target).map_err(|e| ProvisionError::io(&target, e))?;
        }
        fs::rename(&source, &target).map_err(|e| ProvisionError::io(&target, e))?;
    }
    Ok(())
}
