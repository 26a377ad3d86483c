use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};
use ttu_updater::{
    LauncherEvents, LauncherSettings, Platform, PlatformProfile, RunState, UpdateOrchestrator,
    UpdateStatus,
};

use crate::cli::{Cli, Command, PlayArgs};
use crate::console::ConsoleShell;
use crate::summary::{check_table, profile_table, status_table};

/// Exit code of `check` when a newer build is published.
pub const EXIT_UPDATE_AVAILABLE: i32 = 10;

/// Runs the selected command and returns the process exit code.
pub async fn run(cli: &Cli) -> i32 {
    let result = match cli.command() {
        Command::Play(args) => run_play(cli, &args).await,
        Command::Check => run_check(cli).await,
        Command::Paths => run_paths(cli),
        Command::Status => run_status(cli),
    };
    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    }
}

/// Maps the terminal state of a run to the process exit code.
pub fn exit_code_for(state: &RunState) -> i32 {
    match state {
        RunState::Closed { exit_code } => exit_code.unwrap_or(1),
        _ => 1,
    }
}

/// Loads settings from `--config`, which must parse, or from the default
/// location with a fallback to defaults.
pub fn load_settings(cli: &Cli) -> Result<LauncherSettings> {
    match &cli.config {
        Some(path) => LauncherSettings::try_load_from(path)
            .with_context(|| format!("load settings from {}", path.display())),
        None => Ok(LauncherSettings::load()),
    }
}

/// Resolves install paths for the `--platform` override or the running OS.
pub fn resolve_profile(
    platform: Option<Platform>,
    settings: &LauncherSettings,
) -> ttu_updater::Result<PlatformProfile> {
    let platform = match platform {
        Some(platform) => platform,
        None => Platform::current()?,
    };
    debug!(platform = platform.identifier(), "Resolving install paths");
    PlatformProfile::resolve(platform, settings)
}

async fn run_play(cli: &Cli, args: &PlayArgs) -> Result<i32> {
    let settings = load_settings(cli)?;
    let profile = resolve_profile(cli.platform, &settings);
    let shell: Arc<dyn LauncherEvents> = Arc::new(ConsoleShell::new());
    let orchestrator = UpdateOrchestrator::from_resolution(profile, &settings, shell)
        .context("create launcher")?;

    let state = if args.offline {
        orchestrator.launch_installed().await
    } else {
        orchestrator.start().await
    }
    .context("run launcher")?;

    info!(state = %state, "Run finished");
    Ok(exit_code_for(&state))
}

async fn run_check(cli: &Cli) -> Result<i32> {
    let settings = load_settings(cli)?;
    let profile = resolve_profile(cli.platform, &settings).context("resolve install paths")?;
    let orchestrator =
        UpdateOrchestrator::new(profile, &settings, Arc::new(ttu_updater::NoopEvents))
            .context("create launcher")?;

    let check = orchestrator.check().await.context("check for updates")?;
    println!("{}", check_table(&check));
    Ok(if check.stale { EXIT_UPDATE_AVAILABLE } else { 0 })
}

fn run_paths(cli: &Cli) -> Result<i32> {
    let settings = load_settings(cli)?;
    let profile = resolve_profile(cli.platform, &settings).context("resolve install paths")?;
    println!("{}", profile_table(&profile));
    Ok(0)
}

fn run_status(cli: &Cli) -> Result<i32> {
    let settings = load_settings(cli)?;
    let profile = resolve_profile(cli.platform, &settings).context("resolve install paths")?;
    match UpdateStatus::read(&profile.status_file_path).context("read status record")? {
        Some(status) => println!("{}", status_table(&status)),
        None => println!("No update has been attempted yet."),
    }
    Ok(0)
}
