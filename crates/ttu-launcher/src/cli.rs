//! CLI argument definitions for the launcher.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use ttu_updater::Platform;

#[derive(Parser)]
#[command(
    name = "ttu-launcher",
    version,
    about = "Toontown in Unity launcher - keep the game up to date and start it",
    long_about = "Keep the Toontown in Unity client up to date and start it.\n\n\
                  Without a command the launcher checks for a new build, installs it \
                  when needed and then runs the game until it exits."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Settings file to use instead of the default location.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Override the detected platform (windows, macos).
    #[arg(long = "platform", value_name = "PLATFORM", global = true)]
    pub platform: Option<Platform>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// The command to run; `play` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or_default()
    }
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Update the game if needed, then start it and wait for it to exit.
    Play(PlayArgs),

    /// Compare the installed build with the published one.
    Check,

    /// Show where the game, archive and version files live.
    Paths,

    /// Show the outcome of the last update attempt.
    Status,
}

impl Default for Command {
    fn default() -> Self {
        Self::Play(PlayArgs::default())
    }
}

#[derive(Parser, Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayArgs {
    /// Start the installed build without checking for updates.
    #[arg(long = "offline")]
    pub offline: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_is_default() {
        let cli = Cli::try_parse_from(["ttu-launcher"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.command(), Command::Play(PlayArgs { offline: false }));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ttu-launcher",
            "paths",
            "--platform",
            "darwin",
            "--config",
            "custom.toml",
        ])
        .unwrap();
        assert_eq!(cli.command(), Command::Paths);
        assert_eq!(cli.platform, Some(Platform::MacOs));
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_offline_play() {
        let cli = Cli::try_parse_from(["ttu-launcher", "play", "--offline"]).unwrap();
        assert_eq!(cli.command(), Command::Play(PlayArgs { offline: true }));
    }

    #[test]
    fn test_unknown_platform_rejected() {
        assert!(Cli::try_parse_from(["ttu-launcher", "--platform", "amiga"]).is_err());
    }
}
