//! Version markers and the remote version oracle.
//!
//! A version marker is an opaque token. It is never parsed or ordered: an
//! install is stale whenever the local bytes differ from the remote ones, so a
//! local marker "ahead" of the remote one also triggers a re-download.

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;

use crate::config::Endpoints;
use crate::error::{LauncherError, Result};

/// Opaque token identifying an installed build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionMarker(Vec<u8>);

impl VersionMarker {
    /// Wraps raw marker bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw marker bytes, exactly as persisted.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Short printable form for logs and status records.
    #[must_use]
    pub fn display_short(&self) -> String {
        let text = String::from_utf8_lossy(&self.0);
        let text = text.trim();
        if text.chars().count() > 16 {
            let head: String = text.chars().take(16).collect();
            format!("{head}…")
        } else {
            text.to_string()
        }
    }
}

impl From<&str> for VersionMarker {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl fmt::Display for VersionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_short())
    }
}

/// Returns `true` when the local install must be replaced.
///
/// Staleness is pure inequality: a missing local marker, or one whose bytes
/// differ from the remote marker in any way, is stale.
#[must_use]
pub fn is_stale(remote: &VersionMarker, local: Option<&VersionMarker>) -> bool {
    local.is_none_or(|local| local.as_bytes() != remote.as_bytes())
}

/// Body of the version endpoint. Only `content` is used.
#[derive(Debug, Deserialize)]
struct VersionDocument {
    content: String,
}

/// Fetches the remote version marker and reads/writes the local one.
#[derive(Debug, Clone)]
pub struct VersionOracle {
    client: reqwest::Client,
    version_url: String,
    connectivity_url: String,
}

impl VersionOracle {
    /// Creates an oracle for the given endpoints.
    ///
    /// The client is expected to carry the `User-Agent` header
    /// (see [`LauncherSettings::http_client`](crate::config::LauncherSettings::http_client)).
    #[must_use]
    pub fn new(client: reqwest::Client, endpoints: &Endpoints) -> Self {
        Self {
            client,
            version_url: endpoints.version_url.clone(),
            connectivity_url: endpoints.connectivity_url.clone(),
        }
    }

    /// Lightweight reachability check against a well-known host.
    ///
    /// Any HTTP response counts as reachable; only transport failures do not.
    pub async fn probe_connectivity(&self) -> Result<()> {
        tracing::debug!("Probing connectivity via {}", self.connectivity_url);
        let response = self.client.get(&self.connectivity_url).send().await?;
        tracing::debug!("Connectivity probe answered with {}", response.status());
        Ok(())
    }

    /// Fetches the latest version marker from the version endpoint.
    ///
    /// Every failure, including a malformed body, is reported as
    /// [`LauncherError::Network`].
    pub async fn fetch_remote_version(&self) -> Result<VersionMarker> {
        tracing::debug!("Fetching remote version from {}", self.version_url);

        let response = self.client.get(&self.version_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LauncherError::Network(format!(
                "version endpoint returned {status}: {body}"
            )));
        }

        let bytes = response.bytes().await?;
        let document: VersionDocument = serde_json::from_slice(&bytes)
            .map_err(|e| LauncherError::Network(format!("invalid version response: {e}")))?;

        let marker = VersionMarker::new(document.content);
        tracing::info!("Remote version: {}", marker);
        Ok(marker)
    }

    /// Reads the local version marker. A missing file is `Ok(None)`.
    pub async fn read_local_version(path: &Path) -> Result<Option<VersionMarker>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(VersionMarker::new(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LauncherError::Io(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Persists a version marker, overwriting any previous one.
    pub async fn write_local_version(path: &Path, marker: &VersionMarker) -> Result<()> {
        tokio::fs::write(path, marker.as_bytes())
            .await
            .map_err(|e| LauncherError::Io(format!("failed to write {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_missing_local_is_stale() {
        assert!(is_stale(&VersionMarker::from("v2"), None));
    }

    #[test]
    fn test_equal_markers_are_current() {
        let remote = VersionMarker::from("v1");
        assert!(!is_stale(&remote, Some(&VersionMarker::from("v1"))));
    }

    #[test]
    fn test_local_ahead_is_stale() {
        // No ordering: a "newer" local marker still differs.
        let remote = VersionMarker::from("v1");
        assert!(is_stale(&remote, Some(&VersionMarker::from("v2"))));
    }

    #[test]
    fn test_trailing_newline_is_stale() {
        let remote = VersionMarker::from("djE=\n");
        assert!(is_stale(&remote, Some(&VersionMarker::from("djE="))));
    }

    #[test]
    fn test_display_short_truncates() {
        let marker = VersionMarker::from("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(marker.display_short(), "abcdefghijklmnop…");
    }

    #[tokio::test]
    async fn test_local_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("version.txt");

        assert_eq!(VersionOracle::read_local_version(&path).await.unwrap(), None);

        let marker = VersionMarker::from("v2");
        VersionOracle::write_local_version(&path, &marker)
            .await
            .unwrap();
        assert_eq!(
            VersionOracle::read_local_version(&path).await.unwrap(),
            Some(marker)
        );
    }

    #[tokio::test]
    async fn test_read_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = VersionOracle::read_local_version(dir.path()).await;
        assert!(matches!(result, Err(LauncherError::Io(_))));
    }

    proptest! {
        #[test]
        fn prop_stale_iff_bytes_differ(
            remote in proptest::collection::vec(any::<u8>(), 0..32),
            local in proptest::option::of(proptest::collection::vec(any::<u8>(), 0..32)),
        ) {
            let remote_marker = VersionMarker::new(remote.clone());
            let local_marker = local.clone().map(VersionMarker::new);
            let expected = match &local {
                None => true,
                Some(bytes) => bytes != &remote,
            };
            prop_assert_eq!(is_stale(&remote_marker, local_marker.as_ref()), expected);
        }
    }
}
