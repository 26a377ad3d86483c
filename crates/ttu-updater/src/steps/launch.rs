//! Spawn the installed executable and observe it until it exits.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_stream::stream;
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use crate::error::LauncherError;
use crate::events::{LauncherEvents, OutputStream};
use crate::state::RunState;

/// Callback receiving spawn errors before they are returned.
pub type ErrorCallback<'a> = dyn Fn(&LauncherError) + Send + Sync + 'a;

/// Lifecycle event of a launched process.
///
/// A stream from [`launch_stream`] yields at most one `Spawned` and exactly
/// one terminal event (`Terminated`, `SpawnFailed` or `Lost`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEvent {
    /// The process started.
    Spawned {
        /// OS process id, when available.
        pid: Option<u32>,
    },
    /// A chunk of output (one line, lossily decoded).
    Output {
        /// Which stream produced it.
        stream: OutputStream,
        /// The text without its line terminator.
        chunk: String,
    },
    /// The process exited.
    Terminated {
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
    },
    /// The process could not be started.
    SpawnFailed(String),
    /// The process started but its exit status could not be collected.
    Lost(String),
}

/// Terminal outcome of a launch attempt.
#[derive(Debug)]
pub enum LaunchResult {
    /// The process ran and exited.
    Exited {
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
    },
    /// The process failed to start or was lost.
    Failed(LauncherError),
}

/// Spawns `executable` with no arguments and streams its lifecycle.
pub fn launch_stream(executable: PathBuf) -> impl Stream<Item = LaunchEvent> + Send + 'static {
    stream! {
        let spawned = tokio::process::Command::new(&executable)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                yield LaunchEvent::SpawnFailed(format!("{}: {e}", executable.display()));
                return;
            }
        };

        yield LaunchEvent::Spawned { pid: child.id() };

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, OutputStream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, OutputStream::Stderr, tx.clone()));
        }
        drop(tx);

        while let Some((stream, chunk)) = rx.recv().await {
            yield LaunchEvent::Output { stream, chunk };
        }

        match child.wait().await {
            Ok(status) => yield LaunchEvent::Terminated { code: status.code() },
            Err(e) => yield LaunchEvent::Lost(format!("failed to wait for process: {e}")),
        }
    }
}

/// Forwards output line by line until the pipe closes.
async fn forward_output<R>(
    reader: R,
    stream: OutputStream,
    tx: mpsc::UnboundedSender<(OutputStream, String)>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let chunk = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if tx.send((stream, chunk)).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(stream = stream.label(), "Output pipe closed: {}", e);
                break;
            }
        }
    }
}

/// Launches `executable` and waits for it to exit.
///
/// Signals `hide_window` once the process has started and `show_window` on
/// the terminal event, including a failed spawn. Spawn errors go to
/// `on_error` before being returned.
pub async fn launch(
    executable: &Path,
    events: &dyn LauncherEvents,
    on_error: Option<&ErrorCallback<'_>>,
) -> LaunchResult {
    tracing::info!("Launching {}", executable.display());

    let mut stream = std::pin::pin!(launch_stream(executable.to_path_buf()));

    while let Some(event) = stream.next().await {
        match event {
            LaunchEvent::Spawned { pid } => {
                tracing::info!(?pid, "Process started");
                events.hide_window();
                events.on_state(&RunState::Running { pid });
            }
            LaunchEvent::Output { stream, chunk } => {
                tracing::debug!(stream = stream.label(), "{}", chunk);
                events.on_process_output(stream, &chunk);
            }
            LaunchEvent::Terminated { code } => {
                tracing::info!(?code, "Process exited");
                events.show_window();
                return LaunchResult::Exited { code };
            }
            LaunchEvent::SpawnFailed(reason) | LaunchEvent::Lost(reason) => {
                return fail(LauncherError::Spawn(reason), events, on_error);
            }
        }
    }

    fail(
        LauncherError::Spawn("process stream ended without an exit status".to_string()),
        events,
        on_error,
    )
}

fn fail(
    err: LauncherError,
    events: &dyn LauncherEvents,
    on_error: Option<&ErrorCallback<'_>>,
) -> LaunchResult {
    tracing::error!("Launch failed: {}", err);
    events.show_window();
    if let Some(callback) = on_error {
        callback(&err);
    }
    LaunchResult::Failed(err)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl LauncherEvents for Recorder {
        fn on_state(&self, state: &RunState) {
            self.push(format!("state:{}", state.label()));
        }

        fn on_process_output(&self, stream: OutputStream, chunk: &str) {
            self.push(format!("{}:{chunk}", stream.label()));
        }

        fn hide_window(&self) {
            self.push("hide".to_string());
        }

        fn show_window(&self) {
            self.push("show".to_string());
        }
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let temp = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let reported = Mutex::new(Vec::new());
        let on_error = |err: &LauncherError| reported.lock().unwrap().push(err.to_string());

        let result = launch(&temp.path().join("missing.exe"), &recorder, Some(&on_error)).await;

        assert!(matches!(result, LaunchResult::Failed(LauncherError::Spawn(_))));
        assert_eq!(recorder.calls(), vec!["show".to_string()]);
        assert_eq!(reported.lock().unwrap().len(), 1);
    }

    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("game.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_and_signal_order() {
        let temp = tempfile::tempdir().unwrap();
        let exe = script(temp.path(), "echo ready\necho oops 1>&2\nexit 7");
        let recorder = Recorder::default();

        let result = launch(&exe, &recorder, None).await;

        assert!(matches!(result, LaunchResult::Exited { code: Some(7) }));
        let calls = recorder.calls();
        assert_eq!(calls.first().map(String::as_str), Some("hide"));
        assert_eq!(calls.get(1).map(String::as_str), Some("state:running"));
        assert_eq!(calls.last().map(String::as_str), Some("show"));
        assert!(calls.contains(&"stdout:ready".to_string()));
        assert!(calls.contains(&"stderr:oops".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stream_has_single_terminal_event() {
        let temp = tempfile::tempdir().unwrap();
        let exe = script(temp.path(), "exit 0");

        let events: Vec<LaunchEvent> = launch_stream(exe).collect().await;

        let terminal = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    LaunchEvent::Terminated { .. } | LaunchEvent::SpawnFailed(_) | LaunchEvent::Lost(_)
                )
            })
            .count();
        assert_eq!(terminal, 1);
        assert!(matches!(events.first(), Some(LaunchEvent::Spawned { .. })));
        assert_eq!(events.last(), Some(&LaunchEvent::Terminated { code: Some(0) }));
    }
}
