//! Log tailer for Claude Code session files.
//!
//! This module watches `~/.claude/projects/**/*.jsonl`, reads only the bytes
//! appended since the last look, and feeds each new line through the
//! [`SpeechPipeline`] to an [`EventSink`].
//!
//! # Architecture
//!
//! The [`notify`] callback is kept lightweight: it filters paths by
//! extension and depth and sends raw events through an internal channel to a
//! dedicated async task. That task owns the sequencing:
//!
//! - create events, and renames into the tree, start tracking a file at its
//!   current size
//! - modify events go through the [`WriteStabilizer`] so half-flushed writes
//!   are not read
//! - settled writes run the change algorithm in [`TailState::begin_change`]
//!   (debounce, stat, truncation check, offset commit) under one lock
//! - the claimed byte range is read, parsed, classified and cleaned on a
//!   separate blocking task, so a slow batch never holds up the next event
//!
//! Offsets are committed before the range is read. A second change for the
//! same file therefore never re-reads claimed bytes, and delivery is
//! at-most-once per range.
//!
//! # Example
//!
//! ```no_run
//! use chatter_monitor::config::TailerConfig;
//! use chatter_monitor::sink::StdoutSink;
//! use chatter_monitor::watcher::LogTailer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TailerConfig::new("/home/user/.claude/projects");
//!     let mut handle = LogTailer::start(config, StdoutSink)?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     handle.close();
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use notify::{
    event::{CreateKind, ModifyKind, RemoveKind, RenameMode},
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::config::TailerConfig;
use crate::pipeline::SpeechPipeline;
use crate::sink::EventSink;
use crate::utils::debounce::WriteStabilizer;

/// Capacity of the channel between the notify callback and the event loop.
const INTERNAL_CHANNEL_CAPACITY: usize = 1000;

/// Capacity of the settled-write channel.
const SETTLED_CHANNEL_CAPACITY: usize = 256;

/// Errors that can occur when starting the tailer.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to initialize the file system watcher.
    #[error("failed to create watcher: {0}")]
    WatcherInit(#[from] notify::Error),

    /// Failed to read the directory tree.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The watch directory does not exist or is inaccessible.
    #[error("watch directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),
}

/// Per-file tailing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFile {
    pub path: PathBuf,

    /// Byte offset already claimed for reading.
    pub last_known_size: u64,

    /// When the last change passed the debounce check.
    pub last_event: Option<Instant>,
}

/// Outcome of one change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDecision {
    /// Too soon after the previous processed change; dropped.
    Debounced,

    /// The file shrank; the offset was reset and nothing is read.
    Truncated { new_size: u64 },

    /// No bytes beyond the recorded offset.
    Unchanged,

    /// `[start, end)` was claimed; the offset is now `end`.
    Read { start: u64, end: u64 },

    /// The file could not be stat'ed; state is unchanged apart from the
    /// debounce timestamp.
    StatFailed,
}

/// Offset and debounce bookkeeping for one tailer.
///
/// Cloning shares the underlying map. Every operation takes the lock once,
/// so a change decision is computed and committed atomically.
#[derive(Debug, Clone)]
pub struct TailState {
    files: Arc<Mutex<HashMap<PathBuf, WatchedFile>>>,
    debounce: Duration,
}

impl TailState {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self::with_files(HashMap::new(), debounce)
    }

    fn with_files(files: HashMap<PathBuf, WatchedFile>, debounce: Duration) -> Self {
        Self {
            files: Arc::new(Mutex::new(files)),
            debounce,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, WatchedFile>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts tracking `path` at its current size.
    ///
    /// A stat failure tracks the file at offset 0. Returns the recorded offset.
    pub fn track(&self, path: &Path) -> u64 {
        let size = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to get file metadata, tracking from start");
                0
            }
        };

        self.lock().insert(
            path.to_path_buf(),
            WatchedFile {
                path: path.to_path_buf(),
                last_known_size: size,
                last_event: None,
            },
        );
        size
    }

    /// Runs the change algorithm for `path` as of `now`.
    ///
    /// A file that was never tracked is treated as starting at offset 0.
    pub fn begin_change(&self, path: &Path, now: Instant) -> ChangeDecision {
        let mut files = self.lock();
        let file = files
            .entry(path.to_path_buf())
            .or_insert_with(|| WatchedFile {
                path: path.to_path_buf(),
                last_known_size: 0,
                last_event: None,
            });

        if let Some(last) = file.last_event {
            if now.saturating_duration_since(last) < self.debounce {
                return ChangeDecision::Debounced;
            }
        }
        file.last_event = Some(now);

        let current_size = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat changed file");
                return ChangeDecision::StatFailed;
            }
        };

        let start = file.last_known_size;
        if current_size < start {
            file.last_known_size = current_size;
            return ChangeDecision::Truncated {
                new_size: current_size,
            };
        }
        if current_size == start {
            return ChangeDecision::Unchanged;
        }

        file.last_known_size = current_size;
        ChangeDecision::Read {
            start,
            end: current_size,
        }
    }

    /// Stops tracking `path`.
    pub fn forget(&self, path: &Path) -> bool {
        self.lock().remove(path).is_some()
    }

    /// Drops all offsets and debounce timestamps.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Recorded offset for `path`, if tracked.
    #[must_use]
    pub fn offset(&self, path: &Path) -> Option<u64> {
        self.lock().get(path).map(|f| f.last_known_size)
    }

    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.lock().len()
    }

    /// Copy of the state for `path`.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<WatchedFile> {
        self.lock().get(path).cloned()
    }
}

/// Reads `[start, end)` from `path` and returns its non-blank lines.
///
/// Bytes are decoded as UTF-8 with invalid sequences replaced. Lines end at
/// `\r\n`, `\n` or a lone `\r`; a trailing partial line is returned as is.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, seeked or read.
pub fn read_range(path: &Path, start: u64, end: u64) -> io::Result<Vec<String>> {
    if end <= start {
        return Ok(Vec::new());
    }

    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(start))?;

    let mut bytes = Vec::new();
    file.take(end - start).read_to_end(&mut bytes)?;

    Ok(split_lines(&String::from_utf8_lossy(&bytes)))
}

fn split_lines(text: &str) -> Vec<String> {
    // A `\r\n` pair yields an empty segment between the two, which the
    // blank filter drops along with real blank lines.
    text.split(['\r', '\n'])
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether `path` sits at most `max_depth` directories below `root`.
fn within_depth(root: &Path, path: &Path, max_depth: usize) -> bool {
    path.strip_prefix(root)
        .map(|relative| relative.components().count() <= max_depth + 1)
        .unwrap_or(false)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

/// Path filter shared by the startup scan and the notify callback.
#[derive(Debug, Clone)]
struct PathFilter {
    root: PathBuf,
    max_depth: usize,
    extension: String,
}

impl PathFilter {
    fn accepts(&self, path: &Path) -> bool {
        has_extension(path, &self.extension) && within_depth(&self.root, path, self.max_depth)
    }
}

/// Internal events from the notify callback, processed by the async task.
#[derive(Debug, PartialEq, Eq)]
enum InternalEvent {
    FileCreated(PathBuf),
    FileModified(PathBuf),
    FileRemoved(PathBuf),
}

/// Entry point for tailing a directory of session logs.
#[derive(Debug)]
pub struct LogTailer;

impl LogTailer {
    /// Starts watching `config.root` and emitting speak events to `sink`.
    ///
    /// On start, the tailer:
    /// 1. Scans the root for existing log files within depth and records
    ///    their current sizes (existing content is not replayed)
    /// 2. Spawns the event loop
    /// 3. Begins recursive watching
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The root directory does not exist
    /// - The root directory cannot be scanned
    /// - The file system watcher cannot be initialized
    pub fn start<S>(config: TailerConfig, sink: S) -> Result<TailerHandle, WatcherError>
    where
        S: EventSink + 'static,
    {
        let root = config
            .root
            .canonicalize()
            .map_err(|_| WatcherError::DirectoryNotFound(config.root.clone()))?;
        if !root.is_dir() {
            return Err(WatcherError::DirectoryNotFound(config.root));
        }

        let filter = PathFilter {
            root: root.clone(),
            max_depth: config.max_depth(),
            extension: config.extension.clone(),
        };

        let existing = scan_existing_files(&filter)?;
        let state = TailState::with_files(existing, config.debounce);

        let (internal_tx, internal_rx) = mpsc::channel(INTERNAL_CHANNEL_CAPACITY);
        let (settled_tx, settled_rx) = mpsc::channel(SETTLED_CHANNEL_CAPACITY);
        let stabilizer = Arc::new(WriteStabilizer::new(config.stability_window(), settled_tx));

        let task = tokio::spawn(process_internal_events(
            internal_rx,
            settled_rx,
            Arc::clone(&stabilizer),
            state.clone(),
            Arc::new(SpeechPipeline::new(config.include_sub_agents)),
            Arc::new(sink),
        ));

        let watcher = match create_watcher(internal_tx, filter) {
            Ok(watcher) => watcher,
            Err(e) => {
                stabilizer.abort();
                task.abort();
                return Err(e);
            }
        };

        info!(
            root = %root.display(),
            files = state.tracked_count(),
            depth = config.max_depth(),
            sub_agents = config.include_sub_agents,
            "Monitoring session logs"
        );

        Ok(TailerHandle {
            watcher: Some(watcher),
            task: Some(task),
            stabilizer,
            state,
            root,
        })
    }
}

/// Handle to a running tailer.
///
/// Dropping the handle closes the tailer.
#[derive(Debug)]
pub struct TailerHandle {
    watcher: Option<RecommendedWatcher>,
    task: Option<JoinHandle<()>>,
    stabilizer: Arc<WriteStabilizer>,
    state: TailState,
    root: PathBuf,
}

impl TailerHandle {
    /// Stops watching and clears all offsets and debounce timestamps.
    ///
    /// Reads already in flight still complete and reach the sink. Calling
    /// `close` more than once is a no-op.
    pub fn close(&mut self) {
        let Some(watcher) = self.watcher.take() else {
            return;
        };
        drop(watcher);

        self.stabilizer.abort();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state.clear();

        info!(root = %self.root.display(), "Stopped monitoring session logs");
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.watcher.is_none()
    }

    /// Canonical root being watched.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shared offset state, mainly for inspection.
    #[must_use]
    pub fn state(&self) -> &TailState {
        &self.state
    }
}

impl Drop for TailerHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Creates the underlying notify watcher with a lightweight callback.
fn create_watcher(
    internal_tx: mpsc::Sender<InternalEvent>,
    filter: PathFilter,
) -> Result<RecommendedWatcher, WatcherError> {
    let root = filter.root.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            handle_notify_event(res, &filter, &internal_tx);
        },
        NotifyConfig::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    debug!(root = %root.display(), "Started recursive file watch");

    Ok(watcher)
}

/// Filters notify events and forwards them to the event loop.
///
/// Runs on the notify thread; never blocks.
fn handle_notify_event(
    res: notify::Result<Event>,
    filter: &PathFilter,
    internal_tx: &mpsc::Sender<InternalEvent>,
) {
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "File watcher error");
            return;
        }
    };

    trace!(kind = ?event.kind, paths = ?event.paths, "Received notify event");

    for (index, path) in event.paths.iter().enumerate() {
        if !filter.accepts(path) {
            continue;
        }

        let Some(internal_event) = to_internal_event(&event.kind, index, path) else {
            trace!(kind = ?event.kind, path = %path.display(), "Ignoring event kind");
            continue;
        };

        // Dropping a notification loses no bytes: the next change of the
        // same file reads everything past the recorded offset.
        if let Err(e) = internal_tx.try_send(internal_event) {
            warn!(error = %e, "Failed to queue internal event, channel may be full");
        }
    }
}

/// Maps the notify event for the `index`-th path of an event.
///
/// A file renamed into the tree is discovered like a created one, and the
/// source side of a rename is removed. `RenameMode::Both` lists the source
/// first and the target second. Backends that cannot tell the two sides
/// apart report `RenameMode::Any`; the path's existence decides then.
fn to_internal_event(kind: &EventKind, index: usize, path: &Path) -> Option<InternalEvent> {
    let path = path.to_path_buf();
    let event = match kind {
        EventKind::Create(CreateKind::File | CreateKind::Any) => InternalEvent::FileCreated(path),
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => {
            InternalEvent::FileModified(path)
        }
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::To => InternalEvent::FileCreated(path),
            RenameMode::From => InternalEvent::FileRemoved(path),
            RenameMode::Both if index == 0 => InternalEvent::FileRemoved(path),
            RenameMode::Both => InternalEvent::FileCreated(path),
            RenameMode::Any | RenameMode::Other => {
                if path.exists() {
                    InternalEvent::FileCreated(path)
                } else {
                    InternalEvent::FileRemoved(path)
                }
            }
        },
        EventKind::Remove(RemoveKind::File | RemoveKind::Any) => InternalEvent::FileRemoved(path),
        _ => return None,
    };
    Some(event)
}

/// Event loop owning the order in which notifications are applied.
async fn process_internal_events(
    mut internal_rx: mpsc::Receiver<InternalEvent>,
    mut settled_rx: mpsc::Receiver<PathBuf>,
    stabilizer: Arc<WriteStabilizer>,
    state: TailState,
    pipeline: Arc<SpeechPipeline>,
    sink: Arc<dyn EventSink>,
) {
    loop {
        tokio::select! {
            Some(event) = internal_rx.recv() => match event {
                InternalEvent::FileCreated(path) => {
                    let size = state.track(&path);
                    info!(path = %path.display(), size, "New session log detected");
                }
                InternalEvent::FileModified(path) => {
                    if !stabilizer.try_touch(path) {
                        warn!("Write stabilizer unavailable, dropping change");
                    }
                }
                InternalEvent::FileRemoved(path) => {
                    stabilizer.try_forget(path.clone());
                    if state.forget(&path) {
                        info!(path = %path.display(), "Session log removed");
                    }
                }
            },
            Some(path) = settled_rx.recv() => {
                handle_change(path, &state, &pipeline, &sink);
            }
            else => break,
        }
    }

    debug!("Internal event processor shutting down");
}

/// Applies one settled change and spawns the read for any claimed range.
fn handle_change(
    path: PathBuf,
    state: &TailState,
    pipeline: &Arc<SpeechPipeline>,
    sink: &Arc<dyn EventSink>,
) {
    debug!(path = %path.display(), "File changes detected");

    match state.begin_change(&path, Instant::now()) {
        ChangeDecision::Debounced => {
            trace!(path = %path.display(), "Change debounced");
        }
        ChangeDecision::Unchanged => {
            trace!(path = %path.display(), "No new content");
        }
        ChangeDecision::StatFailed => {}
        ChangeDecision::Truncated { new_size } => {
            info!(path = %path.display(), new_size, "File truncated, resetting offset");
        }
        ChangeDecision::Read { start, end } => {
            let pipeline = Arc::clone(pipeline);
            let sink = Arc::clone(sink);
            tokio::task::spawn_blocking(move || emit_range(&path, start, end, &pipeline, &*sink));
        }
    }
}

fn emit_range(path: &Path, start: u64, end: u64, pipeline: &SpeechPipeline, sink: &dyn EventSink) {
    let lines = match read_range(path, start, end) {
        Ok(lines) => lines,
        Err(e) => {
            warn!(path = %path.display(), start, end, error = %e, "Failed to read new lines");
            return;
        }
    };

    debug!(path = %path.display(), line_count = lines.len(), "Read new lines from file");

    let emitted: usize = lines.iter().map(|line| pipeline.emit_line(line, sink)).sum();
    if emitted > 0 {
        debug!(path = %path.display(), emitted, "Emitted speak events");
    }
}

/// Records the current size of every existing log file within depth.
fn scan_existing_files(filter: &PathFilter) -> Result<HashMap<PathBuf, WatchedFile>, WatcherError> {
    let mut files = HashMap::new();
    scan_directory(&filter.root, 0, filter, &mut files)?;

    info!(file_count = files.len(), "Scanned existing session logs");

    Ok(files)
}

fn scan_directory(
    dir: &Path,
    depth: usize,
    filter: &PathFilter,
    files: &mut HashMap<PathBuf, WatchedFile>,
) -> Result<(), WatcherError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if depth > 0 => {
            warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for entry in entries.flatten() {
        let path = entry.path();

        if path.is_dir() {
            if depth < filter.max_depth {
                scan_directory(&path, depth + 1, filter, files)?;
            }
        } else if filter.accepts(&path) {
            match fs::metadata(&path) {
                Ok(meta) => {
                    debug!(path = %path.display(), size = meta.len(), "Found existing session log");
                    files.insert(
                        path.clone(),
                        WatchedFile {
                            path,
                            last_known_size: meta.len(),
                            last_event: None,
                        },
                    );
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to get metadata for existing file");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;

    use tempfile::TempDir;

    const DEBOUNCE: Duration = Duration::from_millis(100);

    fn create_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn append(path: &Path, content: &[u8]) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(content).unwrap();
    }

    fn truncate(path: &Path, len: u64) {
        OpenOptions::new().write(true).open(path).unwrap().set_len(len).unwrap();
    }

    fn after(start: Instant, millis: u64) -> Instant {
        start + Duration::from_millis(millis)
    }

    // TailState

    #[test]
    fn track_records_current_size() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"{\"a\":1}\n");
        let state = TailState::new(DEBOUNCE);

        assert_eq!(state.track(&path), 8);
        assert_eq!(state.offset(&path), Some(8));
        assert_eq!(state.tracked_count(), 1);
        assert_eq!(state.get(&path).unwrap().last_event, None);
    }

    #[test]
    fn track_missing_file_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let state = TailState::new(DEBOUNCE);
        let path = dir.path().join("missing.jsonl");

        assert_eq!(state.track(&path), 0);
        assert_eq!(state.offset(&path), Some(0));
    }

    #[test]
    fn change_claims_appended_range() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"line1\n");
        let state = TailState::new(DEBOUNCE);
        state.track(&path);

        append(&path, b"line2\n");
        let decision = state.begin_change(&path, Instant::now());

        assert_eq!(decision, ChangeDecision::Read { start: 6, end: 12 });
        assert_eq!(state.offset(&path), Some(12));
    }

    #[test]
    fn change_without_growth_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"line1\n");
        let state = TailState::new(DEBOUNCE);
        state.track(&path);

        assert_eq!(state.begin_change(&path, Instant::now()), ChangeDecision::Unchanged);
        assert_eq!(state.offset(&path), Some(6));
    }

    #[test]
    fn truncation_resets_offset_without_reading() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", &[b'x'; 1000]);
        let state = TailState::new(DEBOUNCE);
        state.track(&path);

        // Grows to 1200, then shrinks to 50 before any change is processed.
        append(&path, &[b'y'; 200]);
        truncate(&path, 50);

        let decision = state.begin_change(&path, Instant::now());
        assert_eq!(decision, ChangeDecision::Truncated { new_size: 50 });
        assert_eq!(state.offset(&path), Some(50));
    }

    #[test]
    fn truncation_after_processed_growth() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", &[b'x'; 1000]);
        let state = TailState::new(DEBOUNCE);
        state.track(&path);
        let t0 = Instant::now();

        append(&path, &[b'y'; 200]);
        assert_eq!(state.begin_change(&path, t0), ChangeDecision::Read { start: 1000, end: 1200 });

        truncate(&path, 50);
        assert_eq!(
            state.begin_change(&path, after(t0, 200)),
            ChangeDecision::Truncated { new_size: 50 }
        );
        assert_eq!(state.offset(&path), Some(50));

        // Growth after the reset is read from the new offset.
        append(&path, b"0123456789");
        assert_eq!(
            state.begin_change(&path, after(t0, 400)),
            ChangeDecision::Read { start: 50, end: 60 }
        );
    }

    #[test]
    fn rapid_change_is_debounced_and_next_change_covers_delta() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"a\n");
        let state = TailState::new(DEBOUNCE);
        state.track(&path);
        let t0 = Instant::now();

        append(&path, b"b\n");
        assert_eq!(state.begin_change(&path, t0), ChangeDecision::Read { start: 2, end: 4 });

        append(&path, b"c\n");
        assert_eq!(state.begin_change(&path, after(t0, 50)), ChangeDecision::Debounced);
        assert_eq!(state.offset(&path), Some(4));
        // A dropped event does not move the debounce timestamp.
        assert_eq!(state.get(&path).unwrap().last_event, Some(t0));

        append(&path, b"d\n");
        assert_eq!(
            state.begin_change(&path, after(t0, 150)),
            ChangeDecision::Read { start: 4, end: 8 }
        );
    }

    #[test]
    fn first_change_is_never_debounced() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"");
        let state = TailState::new(DEBOUNCE);
        state.track(&path);

        append(&path, b"x\n");
        assert!(matches!(
            state.begin_change(&path, Instant::now()),
            ChangeDecision::Read { .. }
        ));
    }

    #[test]
    fn offsets_are_monotonic_and_bounded() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"");
        let state = TailState::new(Duration::ZERO);
        state.track(&path);
        let t0 = Instant::now();

        let mut previous = 0;
        for i in 0..20u64 {
            append(&path, format!("{{\"n\":{i}}}\n").as_bytes());
            let _ = state.begin_change(&path, after(t0, i));

            let offset = state.offset(&path).unwrap();
            let size = fs::metadata(&path).unwrap().len();
            assert!(offset >= previous);
            assert!(offset <= size);
            previous = offset;
        }
        assert_eq!(previous, fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn untracked_file_reads_from_start() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"hello\n");
        let state = TailState::new(DEBOUNCE);

        assert_eq!(
            state.begin_change(&path, Instant::now()),
            ChangeDecision::Read { start: 0, end: 6 }
        );
    }

    #[test]
    fn stat_failure_keeps_offset_and_sets_timestamp() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"abc\n");
        let state = TailState::new(DEBOUNCE);
        state.track(&path);
        fs::remove_file(&path).unwrap();

        let now = Instant::now();
        assert_eq!(state.begin_change(&path, now), ChangeDecision::StatFailed);
        assert_eq!(state.offset(&path), Some(4));
        assert_eq!(state.get(&path).unwrap().last_event, Some(now));
    }

    #[test]
    fn forget_and_clear_drop_state() {
        let dir = TempDir::new().unwrap();
        let a = create_file(dir.path(), "a.jsonl", b"a\n");
        let b = create_file(dir.path(), "b.jsonl", b"b\n");
        let state = TailState::new(DEBOUNCE);
        state.track(&a);
        state.track(&b);

        assert!(state.forget(&a));
        assert!(!state.forget(&a));
        assert_eq!(state.tracked_count(), 1);

        state.clear();
        assert_eq!(state.tracked_count(), 0);
        assert_eq!(state.offset(&b), None);
    }

    #[test]
    fn separate_states_do_not_interfere() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"a\n");
        let first = TailState::new(DEBOUNCE);
        let second = TailState::new(DEBOUNCE);

        first.track(&path);
        assert_eq!(second.offset(&path), None);

        let shared = first.clone();
        shared.clear();
        assert_eq!(first.tracked_count(), 0);
    }

    // read_range

    #[test]
    fn read_range_reads_exact_range() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"first\nsecond\nthird\n");

        assert_eq!(read_range(&path, 6, 13).unwrap(), vec!["second"]);
        assert_eq!(read_range(&path, 0, 19).unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn read_range_handles_crlf_and_cr() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"one\r\ntwo\rthree\n");

        assert_eq!(read_range(&path, 0, 15).unwrap(), vec!["one", "two", "three"]);
    }

    #[test]
    fn read_range_drops_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"\n\na\n   \n\t\nb\n\n");

        assert_eq!(read_range(&path, 0, 13).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn read_range_keeps_trailing_partial_line() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"done\n{\"part");

        assert_eq!(read_range(&path, 0, 11).unwrap(), vec!["done", "{\"part"]);
    }

    #[test]
    fn read_range_decodes_lossily() {
        let dir = TempDir::new().unwrap();
        let text = "こんにちは\n".as_bytes();
        let path = create_file(dir.path(), "a.jsonl", text);

        // Starting mid-character replaces the broken bytes.
        let lines = read_range(&path, 1, text.len() as u64).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("んにちは"));
        assert!(lines[0].starts_with('\u{FFFD}'));
    }

    #[test]
    fn read_range_empty_and_missing() {
        let dir = TempDir::new().unwrap();
        let path = create_file(dir.path(), "a.jsonl", b"abc\n");

        assert!(read_range(&path, 4, 4).unwrap().is_empty());
        assert!(read_range(&dir.path().join("missing.jsonl"), 0, 10).is_err());
    }

    // Path filtering and scanning

    #[test]
    fn depth_counts_directories_below_root() {
        let root = Path::new("/root/projects");

        assert!(within_depth(root, Path::new("/root/projects/a.jsonl"), 1));
        assert!(within_depth(root, Path::new("/root/projects/p/a.jsonl"), 1));
        assert!(!within_depth(root, Path::new("/root/projects/p/s/a.jsonl"), 1));
        assert!(within_depth(root, Path::new("/root/projects/p/s/subagents/a.jsonl"), 3));
        assert!(!within_depth(root, Path::new("/root/projects/p/s/subagents/x/a.jsonl"), 3));
        assert!(!within_depth(root, Path::new("/elsewhere/a.jsonl"), 3));
    }

    #[test]
    fn filter_requires_extension() {
        let filter = PathFilter {
            root: PathBuf::from("/r"),
            max_depth: 1,
            extension: "jsonl".to_string(),
        };

        assert!(filter.accepts(Path::new("/r/p/s.jsonl")));
        assert!(!filter.accepts(Path::new("/r/p/s.json")));
        assert!(!filter.accepts(Path::new("/r/p/jsonl")));
    }

    #[test]
    fn scan_tracks_existing_files_within_depth() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let session = create_file(&root, "proj/session.jsonl", b"{}\n{}\n");
        create_file(&root, "proj/notes.txt", b"ignored");
        let nested = create_file(&root, "proj/session/subagents/agent.jsonl", b"{}\n");

        let main_filter = PathFilter {
            root: root.clone(),
            max_depth: 1,
            extension: "jsonl".to_string(),
        };
        let files = scan_existing_files(&main_filter).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[&session].last_known_size, 6);

        let sub_filter = PathFilter {
            max_depth: 3,
            ..main_filter
        };
        let files = scan_existing_files(&sub_filter).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[&nested].last_known_size, 3);
    }

    // LogTailer lifecycle

    #[tokio::test]
    async fn start_fails_for_missing_directory() {
        let dir = TempDir::new().unwrap();
        let config = TailerConfig::new(dir.path().join("nope"));

        let err = LogTailer::start(config, |_: &str| {}).unwrap_err();
        assert!(matches!(err, WatcherError::DirectoryNotFound(_)));
        assert!(err.to_string().starts_with("watch directory does not exist"));
    }

    #[tokio::test]
    async fn start_tracks_existing_files_and_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let path = create_file(&root, "proj/session.jsonl", b"{}\n");

        let mut handle = LogTailer::start(TailerConfig::new(&root), |_: &str| {}).unwrap();
        assert_eq!(handle.root(), root.as_path());
        assert_eq!(handle.state().offset(&path), Some(3));
        assert!(!handle.is_closed());

        handle.close();
        assert!(handle.is_closed());
        assert_eq!(handle.state().tracked_count(), 0);

        handle.close();
        assert!(handle.is_closed());
    }

    #[test]
    fn rename_into_tree_is_treated_as_created() {
        let path = PathBuf::from("/logs/proj/session.jsonl");
        let kind = EventKind::Modify(ModifyKind::Name(RenameMode::To));

        assert_eq!(
            to_internal_event(&kind, 0, &path),
            Some(InternalEvent::FileCreated(path.clone()))
        );
    }

    #[test]
    fn rename_out_of_tree_is_treated_as_removed() {
        let path = PathBuf::from("/logs/proj/session.jsonl");
        let kind = EventKind::Modify(ModifyKind::Name(RenameMode::From));

        assert_eq!(
            to_internal_event(&kind, 0, &path),
            Some(InternalEvent::FileRemoved(path.clone()))
        );
    }

    #[test]
    fn rename_both_removes_source_and_creates_target() {
        let from = PathBuf::from("/logs/proj/old.jsonl");
        let to = PathBuf::from("/logs/proj/new.jsonl");
        let kind = EventKind::Modify(ModifyKind::Name(RenameMode::Both));

        assert_eq!(
            to_internal_event(&kind, 0, &from),
            Some(InternalEvent::FileRemoved(from.clone()))
        );
        assert_eq!(
            to_internal_event(&kind, 1, &to),
            Some(InternalEvent::FileCreated(to.clone()))
        );
    }

    #[test]
    fn ambiguous_rename_checks_existence() {
        let dir = TempDir::new().unwrap();
        let present = create_file(dir.path(), "proj/session.jsonl", b"");
        let missing = dir.path().join("proj/gone.jsonl");
        let kind = EventKind::Modify(ModifyKind::Name(RenameMode::Any));

        assert_eq!(
            to_internal_event(&kind, 0, &present),
            Some(InternalEvent::FileCreated(present.clone()))
        );
        assert_eq!(
            to_internal_event(&kind, 0, &missing),
            Some(InternalEvent::FileRemoved(missing.clone()))
        );
    }

    #[test]
    fn plain_event_kinds_map_directly() {
        let path = PathBuf::from("/logs/proj/session.jsonl");

        assert_eq!(
            to_internal_event(&EventKind::Create(CreateKind::File), 0, &path),
            Some(InternalEvent::FileCreated(path.clone()))
        );
        assert_eq!(
            to_internal_event(
                &EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Content)),
                0,
                &path
            ),
            Some(InternalEvent::FileModified(path.clone()))
        );
        assert_eq!(
            to_internal_event(&EventKind::Remove(RemoveKind::File), 0, &path),
            Some(InternalEvent::FileRemoved(path.clone()))
        );
        assert_eq!(
            to_internal_event(&EventKind::Create(CreateKind::Folder), 0, &path),
            None
        );
        assert_eq!(
            to_internal_event(&EventKind::Access(notify::event::AccessKind::Any), 0, &path),
            None
        );
    }

    #[test]
    fn watcher_error_display() {
        let err = WatcherError::DirectoryNotFound(PathBuf::from("/x"));
        assert_eq!(err.to_string(), "watch directory does not exist: /x");

        let err = WatcherError::Io(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(err.to_string(), "I/O error: boom");
    }
}
