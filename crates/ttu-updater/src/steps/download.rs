//! Stream the platform archive to disk with throttled progress.

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_stream::stream;
use futures_util::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;

use crate::error::{LauncherError, Result};

/// Progress update interval in milliseconds.
const PROGRESS_UPDATE_INTERVAL_MS: u64 = 100;

/// Above this percentage the display jumps to 100 so it never sticks at 99
/// while the last buffers drain.
const SNAP_TO_COMPLETE_PERCENT: f64 = 98.0;

/// Samples older than this are dropped from the speed average.
const SPEED_WINDOW: Duration = Duration::from_secs(2);

/// Remaining-time estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eta {
    /// Whole seconds left, always greater than one.
    Seconds(u64),
    /// One second or less left.
    Finalizing,
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(secs) => write!(f, "{secs}s remaining"),
            Self::Finalizing => f.write_str("Finalizing..."),
        }
    }
}

/// Download progress event.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    /// Bytes written so far.
    pub downloaded: u64,
    /// Total bytes, when the server announced a length.
    pub total: Option<u64>,
    /// Current speed in bytes per second (smoothed average).
    pub bytes_per_second: u64,
    /// Completion in `0..=100`.
    pub percent: u8,
    /// Remaining time, when it can be estimated.
    pub eta: Option<Eta>,
}

impl DownloadProgress {
    /// Human-readable speed, empty while no speed is known yet.
    #[must_use]
    pub fn speed_label(&self) -> String {
        if self.bytes_per_second == 0 {
            String::new()
        } else {
            format_speed(self.bytes_per_second)
        }
    }

    /// Human-readable remaining time.
    #[must_use]
    pub fn eta_label(&self) -> Option<String> {
        self.eta.map(|eta| eta.to_string())
    }
}

/// Computes the displayed percentage: clamped to `0..=100` and snapped to 100
/// above [`SNAP_TO_COMPLETE_PERCENT`].
#[must_use]
pub fn percent_complete(downloaded: u64, total: Option<u64>) -> u8 {
    let Some(total) = total.filter(|&t| t > 0) else {
        return 0;
    };

    let percent = (downloaded as f64 / total as f64 * 100.0).clamp(0.0, 100.0);
    if percent > SNAP_TO_COMPLETE_PERCENT {
        100
    } else {
        percent as u8
    }
}

/// Estimates the remaining time; one second or less becomes [`Eta::Finalizing`].
#[must_use]
pub fn estimate_eta(downloaded: u64, total: Option<u64>, bytes_per_second: u64) -> Option<Eta> {
    let total = total?;
    if bytes_per_second == 0 {
        return None;
    }

    let secs = total.saturating_sub(downloaded).div_ceil(bytes_per_second);
    if secs <= 1 {
        Some(Eta::Finalizing)
    } else {
        Some(Eta::Seconds(secs))
    }
}

/// Download progress tracker with smoothed speed calculation.
///
/// Timestamps are offsets from the start of the transfer so the tracker can
/// be driven deterministically.
#[derive(Debug)]
struct ProgressTracker {
    downloaded: u64,
    total: Option<u64>,
    samples: VecDeque<(Duration, u64)>,
    last_emit: Option<Duration>,
}

impl ProgressTracker {
    fn new(total: Option<u64>) -> Self {
        Self {
            downloaded: 0,
            total,
            samples: VecDeque::new(),
            last_emit: None,
        }
    }

    fn record(&mut self, downloaded: u64, at: Duration) {
        self.downloaded = downloaded;
        self.samples.push_back((at, downloaded));

        // Keep at least two samples so a stalled transfer still has a rate
        while self.samples.len() > 2
            && self
                .samples
                .front()
                .is_some_and(|(t, _)| at.saturating_sub(*t) > SPEED_WINDOW)
        {
            self.samples.pop_front();
        }
    }

    fn speed(&self) -> u64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0;
        };

        let time_diff = last.0.saturating_sub(first.0);
        let bytes_diff = last.1.saturating_sub(first.1);

        if time_diff.is_zero() {
            return 0;
        }

        (bytes_diff as f64 / time_diff.as_secs_f64()) as u64
    }

    fn should_emit(&mut self, at: Duration) -> bool {
        let due = self.last_emit.is_none_or(|last| {
            at.saturating_sub(last) >= Duration::from_millis(PROGRESS_UPDATE_INTERVAL_MS)
        });
        if due {
            self.last_emit = Some(at);
        }
        due
    }

    fn to_progress(&self) -> DownloadProgress {
        let speed = self.speed();
        DownloadProgress {
            downloaded: self.downloaded,
            total: self.total,
            bytes_per_second: speed,
            percent: percent_complete(self.downloaded, self.total),
            eta: estimate_eta(self.downloaded, self.total, speed),
        }
    }

    /// Final event once the body is fully written.
    fn finished(&self) -> DownloadProgress {
        DownloadProgress {
            percent: 100,
            eta: None,
            ..self.to_progress()
        }
    }
}

/// A completed transfer.
#[derive(Debug, Clone)]
pub struct DownloadSummary {
    /// File the body was written to.
    pub path: PathBuf,
    /// Bytes written.
    pub bytes: u64,
    /// Final progress information.
    pub progress: DownloadProgress,
}

/// Item yielded by [`download_stream`].
#[derive(Debug, Clone)]
pub enum DownloadStreamItem {
    /// Progress update during download.
    Progress(DownloadProgress),
    /// Download complete.
    Complete(DownloadSummary),
}

/// Streams `url` into `dest`, overwriting it, and yields throttled progress.
///
/// Progress is yielded at most once per 100ms while bytes arrive, followed by
/// a final event with `percent == 100` and a [`DownloadStreamItem::Complete`].
/// On error the stream yields a single `Err` and ends; `dest` may be left
/// partially written.
pub fn download_stream(
    client: reqwest::Client,
    url: String,
    dest: PathBuf,
) -> impl Stream<Item = Result<DownloadStreamItem>> + Send + 'static {
    stream! {
        tracing::info!("Downloading {} to {}", url, dest.display());

        let response = match client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                yield Err(LauncherError::Download(e.to_string()));
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            yield Err(LauncherError::Download(format!(
                "download failed with status {status}"
            )));
            return;
        }

        let total = response.content_length();
        let mut file = match tokio::fs::File::create(&dest).await {
            Ok(f) => f,
            Err(e) => {
                yield Err(LauncherError::Io(format!(
                    "failed to create {}: {e}",
                    dest.display()
                )));
                return;
            }
        };

        let started = Instant::now();
        let mut tracker = ProgressTracker::new(total);
        let mut body = response.bytes_stream();

        while let Some(chunk_result) = body.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(LauncherError::Download(format!(
                        "transfer interrupted after {} bytes: {e}",
                        tracker.downloaded
                    )));
                    return;
                }
            };

            if let Err(e) = file.write_all(&chunk).await {
                yield Err(LauncherError::Io(format!(
                    "failed to write {}: {e}",
                    dest.display()
                )));
                return;
            }

            tracker.record(tracker.downloaded + chunk.len() as u64, started.elapsed());

            if tracker.should_emit(started.elapsed()) {
                yield Ok(DownloadStreamItem::Progress(tracker.to_progress()));
            }
        }

        if let Err(e) = file.flush().await {
            yield Err(LauncherError::Io(format!(
                "failed to flush {}: {e}",
                dest.display()
            )));
            return;
        }
        drop(file);

        if let Some(expected) = total.filter(|&t| tracker.downloaded < t) {
            yield Err(LauncherError::Download(format!(
                "truncated response: received {} of {} bytes",
                tracker.downloaded, expected
            )));
            return;
        }

        tracing::info!("Download complete: {}", format_bytes(tracker.downloaded));

        let progress = tracker.finished();
        yield Ok(DownloadStreamItem::Progress(progress.clone()));
        yield Ok(DownloadStreamItem::Complete(DownloadSummary {
            path: dest,
            bytes: tracker.downloaded,
            progress,
        }));
    }
}

/// Downloads `url` to `dest`, reporting progress through `on_progress`.
pub async fn download_to_file<F>(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    mut on_progress: F,
) -> Result<DownloadSummary>
where
    F: FnMut(&DownloadProgress),
{
    let mut stream = std::pin::pin!(download_stream(
        client.clone(),
        url.to_string(),
        dest.to_path_buf()
    ));

    while let Some(item) = stream.next().await {
        match item? {
            DownloadStreamItem::Progress(progress) => on_progress(&progress),
            DownloadStreamItem::Complete(summary) => return Ok(summary),
        }
    }

    Err(LauncherError::Download(
        "download ended without completing".to_string(),
    ))
}

/// Format bytes as a human-readable string.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format speed as a human-readable string.
#[must_use]
pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec))
}
