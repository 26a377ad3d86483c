//! Platform detection and install path resolution.
//!
//! Every location a run touches (version marker, downloaded archive, install
//! directory, executable) is resolved once into a [`PlatformProfile`] and
//! passed around by value.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::LauncherSettings;
use crate::error::{LauncherError, Result};

/// Name of the local version marker file.
pub const VERSION_FILE_NAME: &str = "version.txt";

/// Name of the last-run status record.
pub const STATUS_FILE_NAME: &str = "launcher_status.json";

/// Directory under `~/Library/Application Support` used on macOS.
const MACOS_SUPPORT_DIR: &str = "Toontown in Unity Team";

/// Executable inside the macOS app bundle.
const MACOS_EXECUTABLE: &str = "client.app/Contents/MacOS/Toontown in Unity";

/// Executable inside the Windows install directory.
const WINDOWS_EXECUTABLE: &str = "Toontown in Unity.exe";

/// Supported operating systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Microsoft Windows.
    Windows,
    /// macOS / Darwin.
    MacOs,
    /// Linux. Recognised, but has no published build.
    Linux,
}

impl Platform {
    /// Detect the current operating system.
    ///
    /// Fails for targets outside the closed set of known identifiers.
    pub fn current() -> Result<Self> {
        std::env::consts::OS.parse()
    }

    /// Identifier used in archive names and on the command line.
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
        }
    }

    /// Get a human-readable name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
        }
    }

    /// Whether builds are published for this platform.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self, Self::Windows | Self::MacOs)
    }
}

impl FromStr for Platform {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windows" => Ok(Self::Windows),
            "macos" | "darwin" => Ok(Self::MacOs),
            "linux" => Ok(Self::Linux),
            other => Err(LauncherError::UnsupportedPlatform(other.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A change applied to the install directory once extraction has completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fixup {
    /// Set the permission bits of a file (Unix only; a no-op elsewhere).
    SetMode {
        /// File to change.
        path: PathBuf,
        /// Permission bits, e.g. `0o755`.
        mode: u32,
    },
}

/// Resolved platform-specific paths and URLs for one process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    /// Platform this profile was resolved for.
    pub platform: Platform,
    /// URL of the latest archive for this platform.
    pub archive_url: String,
    /// Directory the archive is extracted into.
    pub install_base_dir: PathBuf,
    /// Installed executable.
    pub executable_path: PathBuf,
    /// Local version marker.
    pub version_file_path: PathBuf,
    /// Where the archive is downloaded to.
    pub archive_file_path: PathBuf,
    /// Last-run status record.
    pub status_file_path: PathBuf,
    /// Applied after extraction completes.
    pub post_extract_fixups: Vec<Fixup>,
}

impl PlatformProfile {
    /// Resolves the profile for `platform` at its default location, or at
    /// `settings.install_root` when set.
    pub fn resolve(platform: Platform, settings: &LauncherSettings) -> Result<Self> {
        if !platform.is_supported() {
            return Err(LauncherError::UnsupportedPlatform(
                platform.identifier().to_string(),
            ));
        }

        let base_dir = match &settings.install_root {
            Some(root) => root.clone(),
            None => default_base_dir(platform)?,
        };

        Self::resolve_in(platform, &base_dir, settings)
    }

    /// Resolves the profile rooted at an explicit base directory.
    ///
    /// On macOS the directory is created (recursively, permissive mode) when
    /// it does not exist yet.
    pub fn resolve_in(
        platform: Platform,
        base_dir: &Path,
        settings: &LauncherSettings,
    ) -> Result<Self> {
        let archive_url = settings.endpoints.archive_url(platform.identifier());

        match platform {
            Platform::Windows => {
                let install_base_dir = base_dir.join("bin");
                Ok(Self {
                    platform,
                    archive_url,
                    executable_path: install_base_dir.join(WINDOWS_EXECUTABLE),
                    install_base_dir,
                    version_file_path: base_dir.join(VERSION_FILE_NAME),
                    archive_file_path: base_dir.join("bin.zip"),
                    status_file_path: base_dir.join(STATUS_FILE_NAME),
                    post_extract_fixups: Vec::new(),
                })
            }
            Platform::MacOs => {
                ensure_dir(base_dir)?;
                let executable_path = base_dir.join(MACOS_EXECUTABLE);
                Ok(Self {
                    platform,
                    archive_url,
                    install_base_dir: base_dir.to_path_buf(),
                    version_file_path: base_dir.join(VERSION_FILE_NAME),
                    archive_file_path: base_dir.join("client.zip"),
                    status_file_path: base_dir.join(STATUS_FILE_NAME),
                    post_extract_fixups: vec![Fixup::SetMode {
                        path: executable_path.clone(),
                        mode: 0o755,
                    }],
                    executable_path,
                })
            }
            Platform::Linux => Err(LauncherError::UnsupportedPlatform(
                platform.identifier().to_string(),
            )),
        }
    }
}

/// Default base directory: the working directory on Windows, Application
/// Support on macOS.
fn default_base_dir(platform: Platform) -> Result<PathBuf> {
    match platform {
        Platform::Windows => Ok(std::env::current_dir()?),
        Platform::MacOs => {
            let dirs = directories::BaseDirs::new().ok_or_else(|| {
                LauncherError::Io("could not determine home directory".to_string())
            })?;
            Ok(dirs
                .home_dir()
                .join("Library/Application Support")
                .join(MACOS_SUPPORT_DIR))
        }
        Platform::Linux => Err(LauncherError::UnsupportedPlatform(
            platform.identifier().to_string(),
        )),
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    tracing::debug!("Creating install directory {}", path.display());
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o777);
    }
    builder.create(path).map_err(|e| {
        LauncherError::Io(format!("failed to create {}: {e}", path.display()))
    })
}
