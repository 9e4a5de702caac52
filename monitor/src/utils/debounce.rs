//! Write-stability debouncing for log files.
//!
//! A modify notification can arrive while the writer is still flushing a
//! line. [`WriteStabilizer`] holds each touched path until its size has
//! stopped changing for a quiet period, then emits the path once:
//!
//! 1. A touch records the file's current size and sets a deadline of
//!    `now + threshold`; touching a pending path resets its deadline
//! 2. Every `poll_interval` the background task re-stats paths whose
//!    deadline has passed
//! 3. An unchanged size emits the path; a changed size records the new size
//!    and extends the deadline; a vanished file is dropped
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use tokio::sync::mpsc;
//! use chatter_monitor::utils::debounce::{StabilityWindow, WriteStabilizer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (output_tx, mut output_rx) = mpsc::channel(100);
//!     let stabilizer = WriteStabilizer::new(StabilityWindow::default(), output_tx);
//!
//!     let path = PathBuf::from("/tmp/session.jsonl");
//!     stabilizer.touch(path.clone()).await.unwrap();
//!     stabilizer.touch(path.clone()).await.unwrap();
//!
//!     // Emitted once, after the file has been quiet for 100ms.
//!     assert_eq!(output_rx.recv().await, Some(path));
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

/// Default quiet period in milliseconds.
pub const DEFAULT_STABILITY_THRESHOLD_MS: u64 = 100;

/// Default polling interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Capacity of the stabilizer's input queue.
const INPUT_CAPACITY: usize = 1000;

/// Error type for stabilizer operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StabilizerError {
    /// The background task has stopped.
    #[error("write stabilizer channel closed")]
    ChannelClosed,
}

/// How long a file must stay unchanged, and how often to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityWindow {
    /// Quiet period after the last observed write.
    pub threshold: Duration,

    /// Interval between size checks. Must be non-zero.
    pub poll_interval: Duration,
}

impl Default for StabilityWindow {
    fn default() -> Self {
        Self {
            threshold: Duration::from_millis(DEFAULT_STABILITY_THRESHOLD_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

#[derive(Debug)]
enum Command {
    Touch(PathBuf),
    Forget(PathBuf),
}

#[derive(Debug)]
struct PendingWrite {
    /// Size seen at the last touch or check; `None` if the stat failed.
    size: Option<u64>,
    deadline: Instant,
}

/// Emits a path once writes to it have settled.
///
/// Owns a background task; dropping the stabilizer closes its input, and
/// the task flushes anything still pending before exiting.
#[derive(Debug)]
pub struct WriteStabilizer {
    input_tx: mpsc::Sender<Command>,
    task_handle: JoinHandle<()>,
}

impl WriteStabilizer {
    /// Spawns the background task. Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(window: StabilityWindow, output_tx: mpsc::Sender<PathBuf>) -> Self {
        let (input_tx, input_rx) = mpsc::channel(INPUT_CAPACITY);
        let task_handle = tokio::spawn(run_stability_loop(window, input_rx, output_tx));

        Self {
            input_tx,
            task_handle,
        }
    }

    /// Records a write to `path`, (re)starting its quiet period.
    ///
    /// # Errors
    ///
    /// Returns [`StabilizerError::ChannelClosed`] if the background task has
    /// terminated.
    pub async fn touch(&self, path: PathBuf) -> Result<(), StabilizerError> {
        self.input_tx
            .send(Command::Touch(path))
            .await
            .map_err(|_| StabilizerError::ChannelClosed)
    }

    /// Non-blocking [`touch`](Self::touch); returns `false` if the queue is
    /// full or closed.
    pub fn try_touch(&self, path: PathBuf) -> bool {
        self.input_tx.try_send(Command::Touch(path)).is_ok()
    }

    /// Discards any pending write for `path` without emitting it.
    pub fn try_forget(&self, path: PathBuf) -> bool {
        self.input_tx.try_send(Command::Forget(path)).is_ok()
    }

    /// Stops the background task without flushing.
    pub fn abort(&self) {
        self.task_handle.abort();
    }
}

async fn run_stability_loop(
    window: StabilityWindow,
    mut input_rx: mpsc::Receiver<Command>,
    output_tx: mpsc::Sender<PathBuf>,
) {
    let mut pending: HashMap<PathBuf, PendingWrite> = HashMap::new();

    let poll_interval = window.poll_interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(
        threshold_ms = window.threshold.as_millis(),
        poll_ms = poll_interval.as_millis(),
        "Starting write stability loop"
    );

    loop {
        tokio::select! {
            command = input_rx.recv() => {
                match command {
                    Some(Command::Touch(path)) => {
                        let size = current_size(&path).await;
                        trace!(path = %path.display(), size = ?size, "Write observed");
                        pending.insert(path, PendingWrite {
                            size,
                            deadline: Instant::now() + window.threshold,
                        });
                    }
                    Some(Command::Forget(path)) => {
                        pending.remove(&path);
                    }
                    None => {
                        debug!("Input channel closed, flushing pending writes");
                        let remaining: Vec<PathBuf> = pending.drain().map(|(path, _)| path).collect();
                        for path in remaining {
                            emit(&output_tx, path).await;
                        }
                        break;
                    }
                }
            }

            _ = ticker.tick(), if !pending.is_empty() => {
                check_settled(&mut pending, window.threshold, &output_tx).await;
            }
        }
    }

    debug!("Write stability loop terminated");
}

/// Emits every expired path whose size has not changed since the last look.
async fn check_settled(
    pending: &mut HashMap<PathBuf, PendingWrite>,
    threshold: Duration,
    output_tx: &mpsc::Sender<PathBuf>,
) {
    let now = Instant::now();
    let expired: Vec<PathBuf> = pending
        .iter()
        .filter(|(_, write)| write.deadline <= now)
        .map(|(path, _)| path.clone())
        .collect();

    for path in expired {
        let size = current_size(&path).await;
        let Some(write) = pending.get_mut(&path) else {
            continue;
        };

        if size.is_none() {
            trace!(path = %path.display(), "File vanished before settling");
            pending.remove(&path);
        } else if size == write.size {
            pending.remove(&path);
            emit(output_tx, path).await;
        } else {
            trace!(path = %path.display(), size = ?size, "Still being written");
            write.size = size;
            write.deadline = Instant::now() + threshold;
        }
    }
}

async fn emit(output_tx: &mpsc::Sender<PathBuf>, path: PathBuf) {
    trace!(path = %path.display(), "Write settled");
    if let Err(e) = output_tx.send(path).await {
        warn!(path = %e.0.display(), "Failed to emit settled write");
    }
}

async fn current_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path).await.ok().map(|m| m.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;

    use tempfile::TempDir;
    use tokio::time::{sleep, timeout};

    fn window(threshold_ms: u64, poll_ms: u64) -> StabilityWindow {
        StabilityWindow {
            threshold: Duration::from_millis(threshold_ms),
            poll_interval: Duration::from_millis(poll_ms),
        }
    }

    fn stabilizer(threshold_ms: u64) -> (WriteStabilizer, mpsc::Receiver<PathBuf>) {
        let (tx, rx) = mpsc::channel(100);
        (WriteStabilizer::new(window(threshold_ms, 10), tx), rx)
    }

    fn log_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn append(path: &PathBuf, contents: &str) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn default_window_matches_documented_values() {
        let window = StabilityWindow::default();
        assert_eq!(window.threshold, Duration::from_millis(100));
        assert_eq!(window.poll_interval, Duration::from_millis(50));
    }

    #[tokio::test]
    async fn settled_file_is_emitted_after_threshold() {
        let dir = TempDir::new().unwrap();
        let path = log_file(&dir, "a.jsonl", "{}\n");
        let (stabilizer, mut rx) = stabilizer(50);

        stabilizer.touch(path.clone()).await.unwrap();

        let result = timeout(Duration::from_millis(500), rx.recv()).await;
        assert_eq!(result.unwrap(), Some(path));
    }

    #[tokio::test]
    async fn not_emitted_before_threshold() {
        let dir = TempDir::new().unwrap();
        let path = log_file(&dir, "a.jsonl", "{}\n");
        let (stabilizer, mut rx) = stabilizer(150);

        stabilizer.touch(path.clone()).await.unwrap();

        assert!(timeout(Duration::from_millis(60), rx.recv()).await.is_err());
        let result = timeout(Duration::from_millis(500), rx.recv()).await;
        assert_eq!(result.unwrap(), Some(path));
    }

    #[tokio::test]
    async fn repeated_touches_emit_once() {
        let dir = TempDir::new().unwrap();
        let path = log_file(&dir, "a.jsonl", "{}\n");
        let (stabilizer, mut rx) = stabilizer(50);

        for _ in 0..20 {
            stabilizer.touch(path.clone()).await.unwrap();
        }

        let first = timeout(Duration::from_millis(500), rx.recv()).await;
        assert_eq!(first.unwrap(), Some(path));
        assert!(timeout(Duration::from_millis(150), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn growing_file_waits_until_size_settles() {
        let dir = TempDir::new().unwrap();
        let path = log_file(&dir, "a.jsonl", "{}\n");
        let (stabilizer, mut rx) = stabilizer(60);

        stabilizer.touch(path.clone()).await.unwrap();
        // Grow the file without a touch; the size check must notice.
        sleep(Duration::from_millis(30)).await;
        append(&path, "{\"partial\":");

        let started = Instant::now();
        let result = timeout(Duration::from_millis(1000), rx.recv()).await;
        assert_eq!(result.unwrap(), Some(path));
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn different_paths_are_independent() {
        let dir = TempDir::new().unwrap();
        let a = log_file(&dir, "a.jsonl", "a\n");
        let b = log_file(&dir, "b.jsonl", "b\n");
        let (stabilizer, mut rx) = stabilizer(30);

        stabilizer.touch(a.clone()).await.unwrap();
        stabilizer.touch(b.clone()).await.unwrap();

        let mut received = Vec::new();
        for _ in 0..2 {
            if let Ok(Some(path)) = timeout(Duration::from_millis(500), rx.recv()).await {
                received.push(path);
            }
        }
        received.sort();
        assert_eq!(received, vec![a, b]);
    }

    #[tokio::test]
    async fn forgotten_path_is_not_emitted() {
        let dir = TempDir::new().unwrap();
        let path = log_file(&dir, "a.jsonl", "{}\n");
        let (stabilizer, mut rx) = stabilizer(50);

        assert!(stabilizer.try_touch(path.clone()));
        assert!(stabilizer.try_forget(path));

        assert!(timeout(Duration::from_millis(200), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn vanished_file_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = log_file(&dir, "a.jsonl", "{}\n");
        let (stabilizer, mut rx) = stabilizer(50);

        stabilizer.touch(path.clone()).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(timeout(Duration::from_millis(250), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn pending_writes_flush_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = log_file(&dir, "a.jsonl", "{}\n");
        let (stabilizer, mut rx) = stabilizer(10_000);

        stabilizer.touch(path.clone()).await.unwrap();
        drop(stabilizer);

        let result = timeout(Duration::from_millis(200), rx.recv()).await;
        assert_eq!(result.unwrap(), Some(path));
    }

    #[tokio::test]
    async fn abort_stops_the_task() {
        let dir = TempDir::new().unwrap();
        let path = log_file(&dir, "a.jsonl", "{}\n");
        let (stabilizer, mut rx) = stabilizer(30);

        stabilizer.abort();
        sleep(Duration::from_millis(20)).await;

        assert!(!stabilizer.try_touch(path));
        assert_eq!(timeout(Duration::from_millis(200), rx.recv()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn closed_output_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = log_file(&dir, "a.jsonl", "{}\n");
        let (stabilizer, rx) = stabilizer(10);
        drop(rx);

        stabilizer.touch(path.clone()).await.unwrap();
        sleep(Duration::from_millis(100)).await;
        stabilizer.touch(path).await.unwrap();
    }

    #[test]
    fn error_display() {
        assert_eq!(
            StabilizerError::ChannelClosed.to_string(),
            "write stabilizer channel closed"
        );
    }
}
