//! Run states of the update-and-launch flow.

use std::fmt;

/// State of a single run.
///
/// A run starts in [`RunState::Idle`] and ends in exactly one of
/// [`RunState::Closed`], [`RunState::LaunchFailed`] or [`RunState::Disabled`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    /// No run in flight; the trigger is armed.
    #[default]
    Idle,

    /// The platform has no install profile; launching is disabled.
    Disabled {
        /// Why launching is disabled.
        reason: String,
    },

    /// Probing connectivity and comparing version markers.
    CheckingVersion,

    /// Local and remote markers match.
    UpToDate,

    /// Connectivity probe or version fetch failed; only the installed build can be launched.
    NetworkUnavailable,

    /// Streaming the archive to disk.
    Downloading,

    /// Unpacking the archive into the install directory.
    Extracting,

    /// Writing the new version marker.
    PersistingVersion,

    /// Spawning the installed executable.
    Launching,

    /// The executable is running.
    Running {
        /// OS process id, when available.
        pid: Option<u32>,
    },

    /// The executable exited.
    Closed {
        /// Exit code, `None` when terminated by a signal.
        exit_code: Option<i32>,
    },

    /// The run was aborted.
    LaunchFailed {
        /// User-facing failure message.
        message: String,
    },
}

impl RunState {
    /// Whether this state ends a run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Closed { .. } | Self::LaunchFailed { .. } | Self::Disabled { .. }
        )
    }

    /// Short label for logs and the console shell.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Disabled { .. } => "disabled",
            Self::CheckingVersion => "checking version",
            Self::UpToDate => "up to date",
            Self::NetworkUnavailable => "network unavailable",
            Self::Downloading => "downloading",
            Self::Extracting => "extracting",
            Self::PersistingVersion => "persisting version",
            Self::Launching => "launching",
            Self::Running { .. } => "running",
            Self::Closed { .. } => "closed",
            Self::LaunchFailed { .. } => "launch failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled { reason } => write!(f, "disabled ({reason})"),
            Self::Running { pid: Some(pid) } => write!(f, "running (pid {pid})"),
            Self::Closed {
                exit_code: Some(code),
            } => write!(f, "closed (exit code {code})"),
            Self::LaunchFailed { message } => write!(f, "launch failed: {message}"),
            other => f.write_str(other.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(RunState::Closed { exit_code: Some(0) }.is_terminal());
        assert!(
            RunState::LaunchFailed {
                message: "x".to_string()
            }
            .is_terminal()
        );
        assert!(!RunState::Running { pid: None }.is_terminal());
        assert!(!RunState::NetworkUnavailable.is_terminal());
        assert_eq!(RunState::default(), RunState::Idle);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            RunState::Closed { exit_code: Some(3) }.to_string(),
            "closed (exit code 3)"
        );
        assert_eq!(RunState::Extracting.to_string(), "extracting");
    }
}
