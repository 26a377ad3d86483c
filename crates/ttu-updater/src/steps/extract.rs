//! Archive extraction into the install directory.
//!
//! Entries are unpacked into a hidden staging directory first and only moved
//! into place once every entry has been written, so a failed extraction never
//! leaves a half-written executable where the launcher would find it.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{LauncherError, Result};
use crate::platform::Fixup;

/// Per-entry extraction progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractProgress {
    /// Zero-based index of the entry just processed.
    pub index: usize,
    /// Number of entries in the archive.
    pub total: usize,
}

impl ExtractProgress {
    /// Status line, e.g. `Extracting file 3 of 120`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("Extracting file {} of {}", self.index + 1, self.total)
    }
}

/// Outcome of a successful extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Files and directories written.
    pub extracted: usize,
    /// Symbolic link entries skipped.
    pub skipped_links: usize,
    /// Entries skipped because their path would escape the destination.
    pub skipped_unsafe: usize,
}

/// Extracts the archive, applies the fixups, then deletes the archive.
///
/// Fixups run only after every entry has been moved into place. On any
/// failure the archive is left on disk for a retry. Once the new build is in
/// place, failing to delete the archive is only logged.
pub fn install_archive<F>(
    archive_path: &Path,
    dest_dir: &Path,
    fixups: &[Fixup],
    on_progress: F,
) -> Result<ExtractSummary>
where
    F: FnMut(ExtractProgress),
{
    let summary = extract_archive(archive_path, dest_dir, on_progress)?;
    apply_fixups(fixups)?;

    match fs::remove_file(archive_path) {
        Ok(()) => tracing::debug!("Removed archive {}", archive_path.display()),
        Err(e) => tracing::warn!(
            "Installed update but could not remove {}: {}",
            archive_path.display(),
            e
        ),
    }

    Ok(summary)
}

/// Unpacks every entry except symbolic links into `dest_dir`.
///
/// Top-level entries of the archive replace same-named entries already in
/// `dest_dir`.
pub fn extract_archive<F>(
    archive_path: &Path,
    dest_dir: &Path,
    mut on_progress: F,
) -> Result<ExtractSummary>
where
    F: FnMut(ExtractProgress),
{
    tracing::info!(
        "Extracting {} into {}",
        archive_path.display(),
        dest_dir.display()
    );

    let file = fs::File::open(archive_path).map_err(|e| {
        LauncherError::Extract(format!("failed to open {}: {e}", archive_path.display()))
    })?;
    let mut archive = zip::ZipArchive::new(io::BufReader::new(file))?;

    fs::create_dir_all(dest_dir).map_err(|e| {
        LauncherError::Extract(format!("failed to create {}: {e}", dest_dir.display()))
    })?;
    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(dest_dir)
        .map_err(|e| {
            LauncherError::Extract(format!("failed to create staging directory: {e}"))
        })?;

    let total = archive.len();
    let mut summary = ExtractSummary::default();

    for index in 0..total {
        let mut entry = archive.by_index(index)?;

        if entry.is_symlink() {
            tracing::debug!("Skipping symbolic link entry {}", entry.name());
            summary.skipped_links += 1;
            on_progress(ExtractProgress { index, total });
            continue;
        }

        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("Skipping entry with unsafe path {}", entry.name());
            summary.skipped_unsafe += 1;
            on_progress(ExtractProgress { index, total });
            continue;
        };
        let target = staging.path().join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| write_error(&target, &e))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| write_error(parent, &e))?;
            }
            let mut out = fs::File::create(&target).map_err(|e| write_error(&target, &e))?;
            io::copy(&mut entry, &mut out).map_err(|e| write_error(&target, &e))?;

            // Keep the permission bits recorded in the archive
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode().map(|m| m & 0o777).filter(|&m| m != 0) {
                    fs::set_permissions(&target, fs::Permissions::from_mode(mode))
                        .map_err(|e| write_error(&target, &e))?;
                }
            }
        }

        summary.extracted += 1;
        on_progress(ExtractProgress { index, total });
    }

    promote_staged(staging.path(), dest_dir)?;

    tracing::info!(
        "Extracted {} entries ({} links skipped)",
        summary.extracted,
        summary.skipped_links
    );
    Ok(summary)
}

/// Applies post-extract fixups in order.
pub fn apply_fixups(fixups: &[Fixup]) -> Result<()> {
    for fixup in fixups {
        match fixup {
            Fixup::SetMode { path, mode } => set_mode(path, *mode)?,
        }
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tracing::debug!("Setting mode {:o} on {}", mode, path.display());
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| {
        LauncherError::Extract(format!(
            "failed to set permissions on {}: {e}",
            path.display()
        ))
    })
}

#[cfg(not(unix))]
fn set_mode(path: &Path, _mode: u32) -> Result<()> {
    tracing::debug!("Ignoring mode fixup for {} on this platform", path.display());
    Ok(())
}

/// Moves every top-level entry of `staging` into `dest_dir`, replacing
/// existing entries of the same name.
fn promote_staged(staging: &Path, dest_dir: &Path) -> Result<()> {
    let entries = fs::read_dir(staging).map_err(|e| write_error(staging, &e))?;

    for entry in entries {
        let entry = entry.map_err(|e| write_error(staging, &e))?;
        let target = dest_dir.join(entry.file_name());

        match fs::symlink_metadata(&target) {
            Ok(meta) if meta.is_dir() => {
                fs::remove_dir_all(&target).map_err(|e| write_error(&target, &e))?;
            }
            Ok(_) => fs::remove_file(&target).map_err(|e| write_error(&target, &e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(write_error(&target, &e)),
        }

        fs::rename(entry.path(), &target).map_err(|e| write_error(&target, &e))?;
    }

    Ok(())
}

fn write_error(path: &Path, err: &io::Error) -> LauncherError {
    LauncherError::Extract(format!("failed to write {}: {err}", path.display()))
}
