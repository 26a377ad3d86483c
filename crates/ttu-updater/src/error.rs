//! Error types for the update-and-launch flow.

use thiserror::Error;

/// Errors that can occur while checking, downloading, installing or launching.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum LauncherError {
    /// The running platform has no install profile.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// A request to the version or connectivity endpoint failed.
    #[error("network error: {0}")]
    Network(String),

    /// Reading or writing a local file failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The archive transfer failed mid-stream or returned a bad status.
    #[error("download error: {0}")]
    Download(String),

    /// The archive could not be unpacked into the install directory.
    #[error("archive extraction error: {0}")]
    Extract(String),

    /// The installed executable could not be started.
    #[error("failed to start executable: {0}")]
    Spawn(String),

    /// Failed to parse a JSON response.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Settings could not be read or written.
    #[error("configuration error: {0}")]
    Config(String),

    /// Another run is already in flight.
    #[error("a run is already in progress")]
    RunInProgress,
}

impl LauncherError {
    /// Returns a user-friendly error message suitable for display in the UI.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::UnsupportedPlatform(_) => "This platform is not supported.",
            Self::Network(_) => "No Internet Connection",
            Self::Io(_) => "Could not access the game files.",
            Self::Download(_) => "Failed to download update!",
            Self::Extract(_) => "Failed to extract update!",
            Self::Spawn(_) => "Failed to start the game!",
            Self::RunInProgress => "The game is already starting.",
            Self::JsonParse(_) | Self::Config(_) => "An unexpected error occurred.",
        }
    }

    /// Returns whether the run can continue on the degraded "launch existing
    /// install" path after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for LauncherError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LauncherError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse(err.to_string())
    }
}

impl From<zip::result::ZipError> for LauncherError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Extract(err.to_string())
    }
}

/// Result type alias for launcher operations.
pub type Result<T> = std::result::Result<T, LauncherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let err = LauncherError::Network("connection refused".to_string());
        assert_eq!(err.user_message(), "No Internet Connection");

        let err = LauncherError::Download("truncated".to_string());
        assert!(err.user_message().contains("download"));

        let err = LauncherError::Spawn("permission denied".to_string());
        assert!(err.user_message().contains("start the game"));
    }

    #[test]
    fn test_recoverable() {
        assert!(LauncherError::Network("timeout".to_string()).is_recoverable());
        assert!(!LauncherError::Download("reset".to_string()).is_recoverable());
        assert!(!LauncherError::Extract("corrupt".to_string()).is_recoverable());
        assert!(!LauncherError::UnsupportedPlatform("linux".to_string()).is_recoverable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LauncherError = io.into();
        assert!(matches!(err, LauncherError::Io(_)));
    }
}
