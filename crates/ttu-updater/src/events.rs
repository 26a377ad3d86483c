//! Collaborator seam between the update flow and whatever renders it.
//!
//! The graphical or console shell implements [`LauncherEvents`]. Every
//! callback is fire-and-forget and may be invoked from a worker thread.

use crate::state::RunState;
use crate::steps::download::DownloadProgress;
use crate::steps::extract::ExtractProgress;

/// Which output stream of the child process a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl OutputStream {
    /// Label used in log fields.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Notifications emitted during a run. All methods default to no-ops.
pub trait LauncherEvents: Send + Sync {
    /// The run moved to a new state.
    fn on_state(&self, _state: &RunState) {}

    /// A status line for the user.
    fn on_status_text(&self, _message: &str) {}

    /// Throttled download progress.
    fn on_download_progress(&self, _progress: &DownloadProgress) {}

    /// One archive entry was processed.
    fn on_extract_progress(&self, _progress: ExtractProgress) {}

    /// Diagnostic output from the running executable.
    fn on_process_output(&self, _stream: OutputStream, _chunk: &str) {}

    /// The executable started; the host window should hide.
    fn hide_window(&self) {}

    /// The executable ended or failed to start; the host window should show.
    fn show_window(&self) {}

    /// Arms or disarms the control that starts a run.
    fn set_trigger_enabled(&self, _enabled: bool) {}
}

/// Ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl LauncherEvents for NoopEvents {}
