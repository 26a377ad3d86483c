//! Launcher settings.
//!
//! Settings are stored as TOML in the user's config directory. Every field has
//! a default, so a missing or partial file still yields a usable configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LauncherError, Result};

/// Default endpoint serving the version marker (GitHub contents API).
pub const DEFAULT_VERSION_URL: &str =
    "https://api.github.com/repos/Toontown-Unity/releases/contents/VERSION?ref=main";

/// Default base URL for the "latest release" archives.
pub const DEFAULT_ARCHIVE_BASE_URL: &str =
    "https://github.com/Toontown-Unity/releases/releases/latest/download";

/// Default host used for the reachability probe.
pub const DEFAULT_CONNECTIVITY_URL: &str = "https://www.google.com";

/// User agent sent with every request. The contents API rejects requests without one.
pub const DEFAULT_USER_AGENT: &str = "launcher";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Remote endpoints used during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// JSON endpoint whose `content` field is the remote version marker.
    pub version_url: String,
    /// Base URL; the archive for a platform is `<base>/<platform>.zip`.
    pub archive_base_url: String,
    /// Well-known host checked before contacting the version endpoint.
    pub connectivity_url: String,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            version_url: DEFAULT_VERSION_URL.to_string(),
            archive_base_url: DEFAULT_ARCHIVE_BASE_URL.to_string(),
            connectivity_url: DEFAULT_CONNECTIVITY_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Endpoints {
    /// Archive URL for a platform asset name such as `windows`.
    #[must_use]
    pub fn archive_url(&self, asset: &str) -> String {
        format!("{}/{}.zip", self.archive_base_url.trim_end_matches('/'), asset)
    }
}

/// User settings for the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    /// Overrides the platform base directory (working directory on Windows,
    /// Application Support on macOS).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_root: Option<PathBuf>,

    /// Connect timeout for HTTP requests, in seconds.
    pub request_timeout_secs: u64,

    /// Remote endpoints.
    pub endpoints: Endpoints,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            install_root: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            endpoints: Endpoints::default(),
        }
    }
}

impl LauncherSettings {
    /// Load settings from the default path.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from a specific path.
    ///
    /// A missing file yields defaults silently; an unreadable or malformed one
    /// yields defaults with a warning.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::try_load_from(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load settings from a specific path, reporting any failure.
    pub fn try_load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LauncherError::Config(format!("failed to read settings: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| LauncherError::Config(format!("failed to parse settings: {e}")))
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LauncherError::Config(format!("failed to create config directory: {e}"))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| LauncherError::Config(format!("failed to serialize settings: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| LauncherError::Config(format!("failed to write settings: {e}")))
    }

    /// Get the default config file path.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("com", "ToontownUnity", "Launcher")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
            .unwrap_or_else(|| PathBuf::from("settings.toml"))
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Builds the HTTP client shared by every stage of a run.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.endpoints.user_agent.clone())
            .connect_timeout(self.request_timeout())
            .build()
            .map_err(|e| LauncherError::Network(format!("failed to create HTTP client: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = LauncherSettings::default();
        assert_eq!(settings.endpoints.user_agent, "launcher");
        assert_eq!(settings.endpoints.connectivity_url, "https://www.google.com");
        assert!(settings.install_root.is_none());
        assert_eq!(settings.request_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_archive_url() {
        let endpoints = Endpoints {
            archive_base_url: "https://example.com/download/".to_string(),
            ..Endpoints::default()
        };
        assert_eq!(
            endpoints.archive_url("windows"),
            "https://example.com/download/windows.zip"
        );
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "[endpoints]\nversion_url = \"http://localhost:9/VERSION\"\n",
        )
        .unwrap();

        let settings = LauncherSettings::load_from(&path);
        assert_eq!(settings.endpoints.version_url, "http://localhost:9/VERSION");
        assert_eq!(settings.endpoints.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(settings.request_timeout_secs, 15);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "endpoints = [not toml").unwrap();

        assert!(LauncherSettings::try_load_from(&path).is_err());
        assert_eq!(LauncherSettings::load_from(&path), LauncherSettings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let settings = LauncherSettings {
            install_root: Some(PathBuf::from("/opt/game")),
            ..LauncherSettings::default()
        };

        settings.save_to(&path).unwrap();
        assert_eq!(LauncherSettings::load_from(&path), settings);
    }
}
