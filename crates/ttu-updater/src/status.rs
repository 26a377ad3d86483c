//! Record of the most recent update attempt.
//!
//! Only the last attempt is kept; each write replaces the previous record.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LauncherError, Result};
use crate::version::VersionMarker;

/// Outcome of an update attempt, persisted next to the version marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatus {
    /// Whether the update was installed.
    pub success: bool,
    /// Marker that was being installed.
    pub version: String,
    /// Marker that was installed before, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    /// When the attempt finished.
    pub timestamp: DateTime<Utc>,
    /// Error message if the attempt failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpdateStatus {
    /// Creates a new successful status.
    #[must_use]
    pub fn success(version: &VersionMarker, previous: Option<&VersionMarker>) -> Self {
        Self {
            success: true,
            version: version.display_short(),
            previous_version: previous.map(VersionMarker::display_short),
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Creates a new failed status.
    #[must_use]
    pub fn failure(
        version: &VersionMarker,
        previous: Option<&VersionMarker>,
        error: &LauncherError,
    ) -> Self {
        Self {
            success: false,
            version: version.display_short(),
            previous_version: previous.map(VersionMarker::display_short),
            timestamp: Utc::now(),
            error: Some(error.to_string()),
        }
    }

    /// Writes the status, replacing any previous record.
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| LauncherError::Io(format!("failed to write {}: {e}", path.display())))
    }

    /// Writes the status, logging instead of failing.
    pub fn write_best_effort(&self, path: &Path) {
        if let Err(e) = self.write(path) {
            tracing::warn!("Could not record update status: {}", e);
        }
    }

    /// Reads the last recorded status. A missing file is `Ok(None)`.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_replaces_previous_record() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("launcher_status.json");
        let v1 = VersionMarker::from("v1");
        let v2 = VersionMarker::from("v2");

        UpdateStatus::failure(&v2, Some(&v1), &LauncherError::Download("reset".into()))
            .write(&path)
            .unwrap();
        UpdateStatus::success(&v2, Some(&v1)).write(&path).unwrap();

        let status = UpdateStatus::read(&path).unwrap().unwrap();
        assert!(status.success);
        assert_eq!(status.version, "v2");
        assert_eq!(status.previous_version.as_deref(), Some("v1"));
        assert!(status.error.is_none());
    }

    #[test]
    fn test_missing_record() {
        let temp = tempfile::tempdir().unwrap();
        let status = UpdateStatus::read(&temp.path().join("none.json")).unwrap();
        assert!(status.is_none());
    }

    #[test]
    fn test_failure_keeps_error_text() {
        let status = UpdateStatus::failure(
            &VersionMarker::from("v3"),
            None,
            &LauncherError::Extract("corrupt".into()),
        );
        assert!(!status.success);
        assert!(status.error.unwrap().contains("corrupt"));
    }
}
