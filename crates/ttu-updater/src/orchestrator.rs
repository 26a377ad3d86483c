//! The update-and-launch state machine.
//!
//! A run moves through
//! `CheckingVersion → (UpToDate | Downloading → Extracting → PersistingVersion) → Launching → Running → Closed`.
//! Each stage completes before the next starts and each transition is driven
//! by the outcome of the previous stage. The remote marker is carried as a
//! value through the transition and written only after extraction succeeded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::LauncherSettings;
use crate::error::{LauncherError, Result};
use crate::events::LauncherEvents;
use crate::platform::PlatformProfile;
use crate::state::RunState;
use crate::status::UpdateStatus;
use crate::steps::download::download_to_file;
use crate::steps::extract::install_archive;
use crate::steps::launch::{LaunchResult, launch};
use crate::version::{VersionMarker, VersionOracle, is_stale};

/// Status texts shown while a run progresses.
pub mod messages {
    /// A run has started.
    pub const INITIALIZING: &str = "Initializing...";
    /// The executable is being spawned.
    pub const STARTING: &str = "Starting...";
    /// The archive transfer failed.
    pub const DOWNLOAD_FAILED: &str = "Failed to download update!";
    /// The archive could not be unpacked.
    pub const EXTRACT_FAILED: &str = "Failed to extract update!";
    /// The local version marker could not be read.
    pub const VERSION_READ_FAILED: &str = "Failed to read version file";
    /// The local version marker could not be written.
    pub const VERSION_WRITE_FAILED: &str = "Failed to write version file";
    /// Connectivity probe or version fetch failed.
    pub const NO_INTERNET: &str = "No Internet Connection";
    /// No installed executable to fall back to.
    pub const NO_GAME_FILES: &str = "No game files detected!";
}

/// Result of comparing the remote and local markers without updating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCheck {
    /// Marker published remotely.
    pub remote: VersionMarker,
    /// Marker installed locally, if any.
    pub local: Option<VersionMarker>,
    /// Whether a run would download.
    pub stale: bool,
}

/// Drives a run from the start signal to a terminal state.
pub struct UpdateOrchestrator {
    profile: Result<PlatformProfile>,
    client: reqwest::Client,
    oracle: VersionOracle,
    events: Arc<dyn LauncherEvents>,
    in_flight: AtomicBool,
}

/// Releases the single-flight gate and re-arms the trigger when dropped.
struct TriggerGuard<'a> {
    in_flight: &'a AtomicBool,
    events: &'a dyn LauncherEvents,
}

impl Drop for TriggerGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
        self.events.set_trigger_enabled(true);
    }
}

impl UpdateOrchestrator {
    /// Creates an orchestrator for an already resolved profile.
    pub fn new(
        profile: PlatformProfile,
        settings: &LauncherSettings,
        events: Arc<dyn LauncherEvents>,
    ) -> Result<Self> {
        Self::from_resolution(Ok(profile), settings, events)
    }

    /// Creates an orchestrator from the outcome of profile resolution.
    ///
    /// A failed resolution (such as an unsupported platform) does not fail
    /// here: the orchestrator is created disabled and every run ends in
    /// [`RunState::Disabled`].
    pub fn from_resolution(
        profile: Result<PlatformProfile>,
        settings: &LauncherSettings,
        events: Arc<dyn LauncherEvents>,
    ) -> Result<Self> {
        let client = settings.http_client()?;
        let oracle = VersionOracle::new(client.clone(), &settings.endpoints);

        let profile = profile.map_err(|e| {
            tracing::error!("Launching disabled: {}", e);
            events.on_state(&RunState::Disabled {
                reason: e.to_string(),
            });
            events.on_status_text(e.user_message());
            events.set_trigger_enabled(false);
            e
        });

        Ok(Self {
            profile,
            client,
            oracle,
            events,
            in_flight: AtomicBool::new(false),
        })
    }

    /// The resolved profile, unless launching is disabled.
    #[must_use]
    pub fn profile(&self) -> Option<&PlatformProfile> {
        self.profile.as_ref().ok()
    }

    /// Whether a run is currently in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Runs once: check, update if stale, then launch and wait for exit.
    ///
    /// Returns the terminal state of the run, or
    /// [`LauncherError::RunInProgress`] when another run is in flight.
    pub async fn start(&self) -> Result<RunState> {
        let profile = match &self.profile {
            Ok(profile) => profile,
            Err(e) => return Ok(self.disabled(e)),
        };

        let _guard = self.arm()?;
        self.events.on_status_text(messages::INITIALIZING);

        let terminal = self.run(profile).await;
        if matches!(terminal, RunState::Closed { .. }) {
            self.transition(RunState::Idle);
        }
        Ok(terminal)
    }

    /// Launches whatever is installed without contacting the network.
    pub async fn launch_installed(&self) -> Result<RunState> {
        let profile = match &self.profile {
            Ok(profile) => profile,
            Err(e) => return Ok(self.disabled(e)),
        };

        let _guard = self.arm()?;
        let terminal = self.launch_game(profile).await;
        if matches!(terminal, RunState::Closed { .. }) {
            self.transition(RunState::Idle);
        }
        Ok(terminal)
    }

    /// Compares the remote and local markers without downloading anything.
    pub async fn check(&self) -> Result<VersionCheck> {
        let profile = self.profile.as_ref().map_err(Clone::clone)?;

        self.oracle.probe_connectivity().await?;
        let remote = self.oracle.fetch_remote_version().await?;
        let local = VersionOracle::read_local_version(&profile.version_file_path).await?;
        let stale = is_stale(&remote, local.as_ref());

        Ok(VersionCheck {
            remote,
            local,
            stale,
        })
    }

    fn arm(&self) -> Result<TriggerGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Ignoring start signal: a run is already in progress");
            return Err(LauncherError::RunInProgress);
        }

        self.events.set_trigger_enabled(false);
        Ok(TriggerGuard {
            in_flight: &self.in_flight,
            events: self.events.as_ref(),
        })
    }

    async fn run(&self, profile: &PlatformProfile) -> RunState {
        self.transition(RunState::CheckingVersion);

        if let Err(e) = self.oracle.probe_connectivity().await {
            tracing::warn!("Connectivity probe failed: {}", e);
            return self.launch_offline(profile).await;
        }

        let remote = match self.oracle.fetch_remote_version().await {
            Ok(marker) => marker,
            Err(e) => {
                tracing::warn!("Could not fetch remote version: {}", e);
                return self.launch_offline(profile).await;
            }
        };

        let local = match VersionOracle::read_local_version(&profile.version_file_path).await {
            Ok(local) => local,
            Err(e) => return self.fail(messages::VERSION_READ_FAILED, &e),
        };

        if !is_stale(&remote, local.as_ref()) {
            tracing::info!("Installed build {} is up to date", remote);
            self.transition(RunState::UpToDate);
            return self.launch_game(profile).await;
        }

        tracing::info!(
            "Updating {} -> {}",
            local
                .as_ref()
                .map_or_else(|| "nothing".to_string(), VersionMarker::display_short),
            remote
        );

        match self.update(profile, &remote).await {
            Ok(()) => {
                UpdateStatus::success(&remote, local.as_ref())
                    .write_best_effort(&profile.status_file_path);
                self.launch_game(profile).await
            }
            Err((message, e)) => {
                UpdateStatus::failure(&remote, local.as_ref(), &e)
                    .write_best_effort(&profile.status_file_path);
                self.fail(message, &e)
            }
        }
    }

    /// Download, extract, then persist the marker. Returns the failing
    /// stage's message with the error.
    async fn update(
        &self,
        profile: &PlatformProfile,
        remote: &VersionMarker,
    ) -> std::result::Result<(), (&'static str, LauncherError)> {
        self.transition(RunState::Downloading);
        let events = Arc::clone(&self.events);
        download_to_file(
            &self.client,
            &profile.archive_url,
            &profile.archive_file_path,
            |progress| events.on_download_progress(progress),
        )
        .await
        .map_err(|e| (messages::DOWNLOAD_FAILED, e))?;

        self.transition(RunState::Extracting);
        let archive = profile.archive_file_path.clone();
        let dest = profile.install_base_dir.clone();
        let fixups = profile.post_extract_fixups.clone();
        let events = Arc::clone(&self.events);
        tokio::task::spawn_blocking(move || {
            install_archive(&archive, &dest, &fixups, |progress| {
                events.on_status_text(&progress.label());
                events.on_extract_progress(progress);
            })
        })
        .await
        .map_err(|e| LauncherError::Extract(format!("extraction task failed: {e}")))
        .and_then(|result| result)
        .map_err(|e| (messages::EXTRACT_FAILED, e))?;

        self.transition(RunState::PersistingVersion);
        VersionOracle::write_local_version(&profile.version_file_path, remote)
            .await
            .map_err(|e| (messages::VERSION_WRITE_FAILED, e))?;

        Ok(())
    }

    async fn launch_offline(&self, profile: &PlatformProfile) -> RunState {
        self.transition(RunState::NetworkUnavailable);
        self.events.on_status_text(messages::NO_INTERNET);
        self.launch_game(profile).await
    }

    async fn launch_game(&self, profile: &PlatformProfile) -> RunState {
        self.transition(RunState::Launching);
        self.events.on_status_text(messages::STARTING);

        let installed = profile.executable_path.is_file();
        let events = self.events.as_ref();
        let on_error = |e: &LauncherError| {
            let message = if installed {
                e.user_message()
            } else {
                messages::NO_GAME_FILES
            };
            events.on_status_text(message);
        };

        match launch(&profile.executable_path, events, Some(&on_error)).await {
            LaunchResult::Exited { code } => {
                let state = RunState::Closed { exit_code: code };
                self.transition(state.clone());
                state
            }
            LaunchResult::Failed(e) => {
                let message = if installed {
                    e.user_message()
                } else {
                    messages::NO_GAME_FILES
                };
                let state = RunState::LaunchFailed {
                    message: message.to_string(),
                };
                tracing::error!("Run aborted: {}", e);
                self.transition(state.clone());
                state
            }
        }
    }

    fn fail(&self, message: &str, err: &LauncherError) -> RunState {
        tracing::error!("Run aborted: {}", err);
        self.events.on_status_text(message);
        let state = RunState::LaunchFailed {
            message: message.to_string(),
        };
        self.transition(state.clone());
        state
    }

    fn disabled(&self, err: &LauncherError) -> RunState {
        let state = RunState::Disabled {
            reason: err.to_string(),
        };
        self.transition(state.clone());
        state
    }

    fn transition(&self, state: RunState) {
        tracing::info!(state = %state, "Run state changed");
        self.events.on_state(&state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopEvents;
    use crate::platform::Platform;

    #[tokio::test]
    async fn test_unsupported_platform_is_disabled() {
        let settings = LauncherSettings::default();
        let profile = PlatformProfile::resolve(Platform::Linux, &settings);
        let orchestrator =
            UpdateOrchestrator::from_resolution(profile, &settings, Arc::new(NoopEvents)).unwrap();

        assert!(orchestrator.profile().is_none());
        let state = orchestrator.start().await.unwrap();
        assert_eq!(
            state,
            RunState::Disabled {
                reason: "unsupported platform: linux".to_string()
            }
        );

        match orchestrator.check().await {
            Err(e @ LauncherError::UnsupportedPlatform(_)) => {
                assert_eq!(e.to_string(), "unsupported platform: linux");
            }
            other => panic!("expected unsupported platform, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gate_rejects_second_arm() {
        let temp = tempfile::tempdir().unwrap();
        let settings = LauncherSettings::default();
        let profile =
            PlatformProfile::resolve_in(Platform::Windows, temp.path(), &settings).unwrap();
        let orchestrator =
            UpdateOrchestrator::new(profile, &settings, Arc::new(NoopEvents)).unwrap();

        let guard = orchestrator.arm().unwrap();
        assert!(orchestrator.is_running());
        assert!(matches!(
            orchestrator.arm(),
            Err(LauncherError::RunInProgress)
        ));
        drop(guard);
        assert!(!orchestrator.is_running());
        assert!(orchestrator.arm().is_ok());
    }
}
