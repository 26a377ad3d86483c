//! Self-updating launcher core for Toontown in Unity.
//!
//! This crate checks a remote version marker, downloads and installs the
//! platform archive when the installed build is stale, and then launches the
//! game and waits for it to exit.
//!
//! # Overview
//!
//! A run is driven by [`UpdateOrchestrator::start`]:
//!
//! - Probe connectivity and fetch the remote version marker
//! - Compare it byte-for-byte with the local marker
//! - Download the archive with throttled progress reporting
//! - Extract it (symbolic links are skipped), apply platform fixups and
//!   delete the archive
//! - Persist the new marker only after extraction succeeded
//! - Spawn the executable, hide the launcher while it runs, show it again
//!   when it exits
//!
//! When offline the installed build is launched as-is.
//!
//! # Architecture
//!
//! Each stage lives in [`steps`] as a free function that can be used on its
//! own. The orchestrator sequences them and reports every transition through
//! the [`LauncherEvents`] trait, which a UI shell implements.
//!
//! # Supported Platforms
//!
//! - Windows: install next to the launcher in `bin/`
//! - macOS: install into `~/Library/Application Support/Toontown in Unity Team`
//!
//! Other platforms resolve to a disabled orchestrator.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ttu_updater::{LauncherSettings, NoopEvents, Platform, PlatformProfile, UpdateOrchestrator};
//!
//! async fn play() -> ttu_updater::Result<()> {
//!     let settings = LauncherSettings::load();
//!     let profile = Platform::current().and_then(|p| PlatformProfile::resolve(p, &settings));
//!     let orchestrator =
//!         UpdateOrchestrator::from_resolution(profile, &settings, Arc::new(NoopEvents))?;
//!
//!     let state = orchestrator.start().await?;
//!     println!("Run finished: {state}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod error;
pub mod events;
pub mod platform;
pub mod state;
pub mod status;
pub mod version;

// Individual steps
pub mod steps;

// State machine
pub mod orchestrator;

// Re-export main types for convenience
pub use config::{Endpoints, LauncherSettings};
pub use error::{LauncherError, Result};
pub use events::{LauncherEvents, NoopEvents, OutputStream};
pub use orchestrator::{UpdateOrchestrator, VersionCheck};
pub use platform::{Fixup, Platform, PlatformProfile};
pub use state::RunState;
pub use status::UpdateStatus;
pub use version::{VersionMarker, VersionOracle, is_stale};

// Re-export step functions and types
pub use steps::download::{
    DownloadProgress, DownloadStreamItem, DownloadSummary, Eta, download_stream, download_to_file,
    format_bytes, format_speed,
};
pub use steps::extract::{ExtractProgress, ExtractSummary, extract_archive, install_archive};
pub use steps::launch::{LaunchEvent, LaunchResult, launch, launch_stream};

/// Current version of the launcher.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
