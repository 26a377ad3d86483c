//! Terminal rendering of a launcher run.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use ttu_updater::{DownloadProgress, ExtractProgress, LauncherEvents, RunState};

const DOWNLOAD_TEMPLATE: &str = "  Downloading [{bar:30}] {pos:>3}% {msg}";
const EXTRACT_TEMPLATE: &str = "  Extracting  [{bar:30}] {pos}/{len} {msg}";

/// Renders run events on the terminal with an `indicatif` progress bar.
#[derive(Default)]
pub struct ConsoleShell {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleShell {
    /// Creates a shell with no active progress bar.
    pub fn new() -> Self {
        Self::default()
    }

    fn start_bar(&self, length: u64, template: &str) {
        let bar = ProgressBar::new(length);
        if let Ok(style) = ProgressStyle::with_template(template) {
            bar.set_style(style.progress_chars("=> "));
        }
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.replace(bar) {
                previous.finish_and_clear();
            }
        }
    }

    fn clear_bar(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) -> bool {
        match self.bar.lock() {
            Ok(slot) => slot.as_ref().map(f).is_some(),
            Err(_) => false,
        }
    }
}

impl LauncherEvents for ConsoleShell {
    fn on_state(&self, state: &RunState) {
        match state {
            RunState::Downloading => self.start_bar(100, DOWNLOAD_TEMPLATE),
            RunState::Extracting => self.start_bar(0, EXTRACT_TEMPLATE),
            _ => {
                self.clear_bar();
                if let Some(line) = state_line(state) {
                    eprintln!("{line}");
                }
            }
        }
    }

    fn on_status_text(&self, message: &str) {
        // Extraction counters are already shown by the bar itself.
        if message.starts_with("Extracting file") {
            return;
        }
        if !self.with_bar(|bar| bar.println(message)) {
            eprintln!("{message}");
        }
    }

    fn on_download_progress(&self, progress: &DownloadProgress) {
        self.with_bar(|bar| {
            bar.set_position(u64::from(progress.percent));
            bar.set_message(progress_message(progress));
        });
    }

    fn on_extract_progress(&self, progress: ExtractProgress) {
        self.with_bar(|bar| {
            bar.set_length(progress.total as u64);
            bar.set_position(progress.index as u64 + 1);
        });
    }

    fn hide_window(&self) {
        self.clear_bar();
        tracing::debug!("Game window is up, console output paused");
    }

    fn show_window(&self) {
        tracing::info!("Game closed, launcher restored");
    }

    fn set_trigger_enabled(&self, enabled: bool) {
        tracing::trace!(enabled, "Start trigger toggled");
    }
}

/// Extra line printed for a state change. Failure texts already arrive
/// through `on_status_text`, so only the disable reason is printed here.
pub fn state_line(state: &RunState) -> Option<String> {
    match state {
        RunState::Disabled { reason } => Some(format!("error: launching is disabled ({reason})")),
        _ => None,
    }
}

/// Message shown next to the download bar: speed and remaining time.
pub fn progress_message(progress: &DownloadProgress) -> String {
    let speed = progress.speed_label();
    match (speed.is_empty(), progress.eta_label()) {
        (true, None) => String::new(),
        (true, Some(eta)) => eta,
        (false, None) => speed,
        (false, Some(eta)) => format!("{speed} - {eta}"),
    }
}
