//! Directory watcher using notify-rs.
//!
//! A dedicated thread waits on OS notifications for every registered
//! directory and publishes one `FilesDiscovered` event per wake-up.

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender, TryRecvError};
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{EventKind as NotifyKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::WatcherError;
use crate::events::{Event, EventChannel};
use crate::Result;

/// Time spent gathering further notifications after the first one.
const BATCH_WINDOW: Duration = Duration::from_millis(250);

type NotifyResult = notify::Result<notify::Event>;

/// Directory watcher configuration.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Directories to watch.
    pub watch_dirs: Vec<PathBuf>,
    /// How long one wake-up keeps collecting notifications.
    pub batch_window: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            watch_dirs: Vec::new(),
            batch_window: BATCH_WINDOW,
        }
    }
}

/// A registered directory, as given and as resolved by the OS.
#[derive(Debug, Clone)]
struct WatchedDir {
    path: PathBuf,
    canonical: PathBuf,
}

impl WatchedDir {
    /// Map a notified path to the identifier used for this directory.
    fn resolve(&self, notified: &Path) -> Option<PathBuf> {
        let parent = notified.parent()?;
        if parent == self.path || parent == self.canonical {
            notified.file_name().map(|name| self.path.join(name))
        } else {
            None
        }
    }
}

enum State {
    Idle,
    Watching {
        // Held for its drop: dropping it ends OS notifications.
        _notifier: RecommendedWatcher,
        shutdown_tx: Sender<()>,
        thread: JoinHandle<()>,
    },
    Stopped,
}

/// Watches directories for newly created files.
///
/// Lifecycle: idle -> `start()` -> watching -> `stop()` -> stopped.
/// A stopped watcher cannot be restarted.
pub struct DirectoryWatcher {
    dirs: Vec<WatchedDir>,
    events: EventChannel,
    batch_window: Duration,
    state: State,
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("dirs", &self.watched_dirs())
            .field("watching", &self.is_watching())
            .finish_non_exhaustive()
    }
}

impl DirectoryWatcher {
    /// Create an idle watcher publishing on `events`.
    #[must_use]
    pub fn new(config: &WatcherConfig, events: EventChannel) -> Self {
        let mut watcher = Self {
            dirs: Vec::new(),
            events,
            batch_window: config.batch_window,
            state: State::Idle,
        };

        for dir in &config.watch_dirs {
            watcher.register_path(dir);
        }

        watcher
    }

    /// Add a directory to watch.
    ///
    /// Missing paths and non-directories are skipped with a warning.
    /// Returns whether the directory was added.
    pub fn register_path(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();

        if !matches!(self.state, State::Idle) {
            tracing::warn!(path = %path.display(), "Watcher already started, path not registered");
            return false;
        }

        if !path.is_dir() {
            tracing::warn!(
                path = %path.display(),
                "Path cannot be registered (check that it exists and is a directory)"
            );
            return false;
        }

        if self.dirs.iter().any(|d| d.path == path) {
            return false;
        }

        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.dirs.push(WatchedDir {
            path: path.to_path_buf(),
            canonical,
        });
        tracing::debug!(path = %path.display(), "Registered path for event notifications");
        true
    }

    /// Registered directories.
    #[must_use]
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.dirs.iter().map(|d| d.path.clone()).collect()
    }

    /// Whether the watch thread is running.
    #[must_use]
    pub const fn is_watching(&self) -> bool {
        matches!(self.state, State::Watching { .. })
    }

    /// Start the watch thread.
    ///
    /// Directories the OS refuses to watch are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher is not idle, or if the notifier or
    /// the thread cannot be created.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            State::Idle => {}
            State::Watching { .. } => {
                return Err(WatcherError::InvalidState("watcher already started".into()).into())
            }
            State::Stopped => {
                return Err(WatcherError::InvalidState("watcher already stopped".into()).into())
            }
        }

        let (event_tx, event_rx) = crossbeam_channel::unbounded::<NotifyResult>();
        let mut notifier = notify::recommended_watcher(move |result: NotifyResult| {
            let _ = event_tx.send(result);
        })
        .map_err(|e| WatcherError::WatchFailed {
            path: "init".to_string(),
            reason: e.to_string(),
        })?;

        let mut active = Vec::with_capacity(self.dirs.len());
        for dir in &self.dirs {
            match notifier.watch(&dir.path, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    tracing::info!(path = %dir.path.display(), "Watching directory");
                    active.push(dir.clone());
                }
                Err(e) => {
                    tracing::warn!(path = %dir.path.display(), error = %e, "Failed to watch directory");
                }
            }
        }

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let events = self.events.clone();
        let window = self.batch_window;

        let thread = std::thread::Builder::new()
            .name("termrank-watcher".to_string())
            .spawn(move || watch_loop(&event_rx, &shutdown_rx, &active, &events, window))
            .map_err(|e| WatcherError::Spawn(e.to_string()))?;

        self.state = State::Watching {
            _notifier: notifier,
            shutdown_tx,
            thread,
        };
        Ok(())
    }

    /// Stop the watch thread and wait for it to exit.
    ///
    /// Stopping is terminal; calling it again is a no-op.
    pub fn stop(&mut self) {
        let previous = std::mem::replace(&mut self.state, State::Stopped);

        if let State::Watching {
            _notifier,
            shutdown_tx,
            thread,
        } = previous
        {
            drop(shutdown_tx);
            if thread.join().is_err() {
                tracing::error!("Watch thread panicked");
            }
            tracing::info!("Directory watcher stopped");
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Block on notifications until shutdown, publishing one event per wake-up.
fn watch_loop(
    event_rx: &Receiver<NotifyResult>,
    shutdown_rx: &Receiver<()>,
    dirs: &[WatchedDir],
    events: &EventChannel,
    window: Duration,
) {
    tracing::debug!(dirs = dirs.len(), "Watch thread started");

    loop {
        let first = select! {
            recv(shutdown_rx) -> _ => break,
            recv(event_rx) -> msg => match msg {
                Ok(result) => result,
                Err(_) => break,
            },
        };

        let mut batch = Vec::new();
        collect_created(first, dirs, &mut batch);

        let deadline = Instant::now() + window;
        let mut shutting_down = false;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            select! {
                recv(shutdown_rx) -> _ => {
                    shutting_down = true;
                    break;
                },
                recv(event_rx) -> msg => match msg {
                    Ok(result) => collect_created(result, dirs, &mut batch),
                    Err(_) => break,
                },
                default(remaining) => break,
            }
        }

        if shutting_down || matches!(shutdown_rx.try_recv(), Err(TryRecvError::Disconnected)) {
            break;
        }

        if !batch.is_empty() {
            tracing::debug!(files = batch.len(), "Received new files");
            events.publish(&Event::FilesDiscovered(batch));
        }
    }

    tracing::debug!("Watch thread exiting");
}

/// Append newly created files from one notification, skipping duplicates.
fn collect_created(result: NotifyResult, dirs: &[WatchedDir], batch: &mut Vec<PathBuf>) {
    let event = match result {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("Watch error: {:?}", e);
            return;
        }
    };

    for path in created_files(&event, dirs) {
        if !batch.contains(&path) {
            batch.push(path);
        }
    }
}

/// Files created or moved in by `event` directly inside a watched directory.
fn created_files(event: &notify::Event, dirs: &[WatchedDir]) -> Vec<PathBuf> {
    let candidates: Vec<&PathBuf> = match event.kind {
        NotifyKind::Create(CreateKind::Folder) => return Vec::new(),
        NotifyKind::Create(_) | NotifyKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.iter().collect()
        }
        // Paths are [from, to].
        NotifyKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().into_iter().collect()
        }
        // Backends that cannot tell source from destination report both
        // ends this way; only the end that still exists is new.
        NotifyKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.iter().filter(|p| p.is_file()).collect()
        }
        _ => return Vec::new(),
    };

    candidates
        .into_iter()
        .filter(|p| !p.is_dir())
        .filter_map(|p| dirs.iter().find_map(|dir| dir.resolve(p)))
        .collect()
}
