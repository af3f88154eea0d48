//! TF-IDF ranking server.
//!
//! Wires the watcher, index and ranking together: new files discovered by
//! the watcher are added to the index and trigger a refresh, while a timer
//! writes the current ranking every period.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

use super::sink::ReportSink;
use crate::config::{Config, DEFAULT_MAX_RESULTS, DEFAULT_PERIOD_SECS};
use crate::events::{Event, EventChannel, EventKind, Subscriber};
use crate::index::{IndexConfig, IndexManager};
use crate::ranking::RankingManager;
use crate::watcher::{DirectoryWatcher, WatcherConfig};
use crate::{Error, Result};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directories seeded at startup and watched afterwards.
    pub watch_dirs: Vec<PathBuf>,
    /// Vocabulary to rank against.
    pub terms: Vec<String>,
    /// Documents per report.
    pub max_results: usize,
    /// Report period.
    pub period: Duration,
    /// Report destination.
    pub sink: ReportSink,
    /// Index settings.
    pub index: IndexConfig,
    /// Watcher settings; its directories are taken from `watch_dirs`.
    pub watcher: WatcherConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            watch_dirs: Vec::new(),
            terms: Vec::new(),
            max_results: DEFAULT_MAX_RESULTS,
            period: Duration::from_secs(DEFAULT_PERIOD_SECS),
            sink: ReportSink::Stdout,
            index: IndexConfig::default(),
            watcher: WatcherConfig::default(),
        }
    }
}

impl From<&Config> for ServerConfig {
    fn from(config: &Config) -> Self {
        Self {
            watch_dirs: config.watch_dirs(),
            terms: config.terms.clone(),
            max_results: config.max_results,
            period: config.period(),
            sink: config
                .output
                .clone()
                .map_or(ReportSink::Stdout, ReportSink::File),
            index: IndexConfig {
                separator: config.separator.clone(),
                retry_failed: config.retry_failed,
            },
            watcher: WatcherConfig::default(),
        }
    }
}

/// Adds discovered files to the index and wakes the refresh loop.
struct DiscoveryListener {
    index: IndexManager,
    signal_tx: mpsc::UnboundedSender<()>,
}

impl Subscriber for DiscoveryListener {
    fn on_event(&self, event: &Event) {
        let Event::FilesDiscovered(files) = event else {
            return;
        };

        let added = files
            .iter()
            .filter(|file| self.index.add_document(file.as_path()))
            .count();
        tracing::debug!(discovered = files.len(), added, "Files discovered");

        if added > 0 && self.signal_tx.send(()).is_err() {
            tracing::warn!("Refresh loop gone, discovered files left pending");
        }
    }
}

struct Running {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    listener: Arc<dyn Subscriber>,
}

/// The ranking daemon.
pub struct TfIdfServer {
    config: ServerConfig,
    events: EventChannel,
    index: IndexManager,
    ranking: RankingManager,
    watcher: Mutex<DirectoryWatcher>,
    running: Mutex<Option<Running>>,
}

impl TfIdfServer {
    /// Build the server and its components. Nothing runs until `start()`.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let events = EventChannel::new();
        let index = IndexManager::new(config.index.clone());
        let ranking = RankingManager::new(config.max_results);
        let watcher_config = WatcherConfig {
            watch_dirs: Vec::new(),
            ..config.watcher.clone()
        };
        let watcher = DirectoryWatcher::new(&watcher_config, events.clone());

        Self {
            config,
            events,
            index,
            ranking,
            watcher: Mutex::new(watcher),
            running: Mutex::new(None),
        }
    }

    /// Index shared with the server's tasks.
    #[must_use]
    pub const fn index(&self) -> &IndexManager {
        &self.index
    }

    /// Event channel the watcher publishes on.
    #[must_use]
    pub const fn events(&self) -> &EventChannel {
        &self.events
    }

    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Seed the index, start watching and launch the background tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if called outside a Tokio runtime, if the server
    /// was already started, or if the watcher cannot start.
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::internal(format!("server requires a Tokio runtime: {e}")))?;

        let mut running = self.running.lock();
        if running.is_some() {
            return Err(Error::internal("server already started"));
        }

        self.index.set_vocabulary(self.config.terms.iter().cloned());
        for dir in &self.config.watch_dirs {
            self.index.load_from(dir);
        }
        trigger_refresh(&self.index, &self.events);

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let listener: Arc<dyn Subscriber> = Arc::new(DiscoveryListener {
            index: self.index.clone(),
            signal_tx,
        });
        self.events
            .register(EventKind::FilesDiscovered, Arc::clone(&listener));

        {
            let mut watcher = self.watcher.lock();
            for dir in &self.config.watch_dirs {
                watcher.register_path(dir);
            }
            if let Err(e) = watcher.start() {
                self.events.unregister(EventKind::FilesDiscovered, &listener);
                return Err(e);
            }
        }

        let cancel = CancellationToken::new();
        let tasks = vec![
            runtime.spawn(refresh_loop(
                self.index.clone(),
                self.events.clone(),
                signal_rx,
                cancel.clone(),
            )),
            runtime.spawn(report_loop(
                self.index.clone(),
                self.ranking,
                self.config.period,
                self.config.sink.clone(),
                cancel.clone(),
            )),
        ];

        tracing::info!(
            terms = ?self.config.terms,
            dirs = ?self.config.watch_dirs,
            period_secs = self.config.period.as_secs(),
            max_results = self.ranking.max_results(),
            "Ranking server started"
        );

        *running = Some(Running {
            cancel,
            tasks,
            listener,
        });
        Ok(())
    }

    /// Stop watching and end the background tasks.
    ///
    /// In-flight indexing and an in-flight report finish on their own.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };

        tracing::info!("Stopping server");
        self.events
            .unregister(EventKind::FilesDiscovered, &running.listener);
        self.watcher.lock().stop();
        running.cancel.cancel();

        for task in running.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Server task failed");
            }
        }
        tracing::info!("Server stopped");
    }

    /// Run until SIGTERM or Ctrl+C, then shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot start.
    pub async fn run(self) -> Result<()> {
        self.start()?;
        shutdown_signal().await;
        self.stop().await;
        Ok(())
    }
}

/// Start indexing pending documents and announce the batch when done.
fn trigger_refresh(index: &IndexManager, events: &EventChannel) {
    let handle = match index.refresh() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to refresh index");
            return;
        }
    };

    if handle.is_empty() {
        return;
    }

    let events = events.clone();
    tokio::spawn(async move {
        let summary = handle.wait().await;
        tracing::info!(
            indexed = summary.indexed,
            failed = summary.failed,
            "Index refresh complete"
        );
        events.publish(&Event::IndexRefreshed(summary));
    });
}

/// Refresh once per wake, folding queued signals into that wake.
async fn refresh_loop(
    index: IndexManager,
    events: EventChannel,
    mut signals: mpsc::UnboundedReceiver<()>,
    cancel: CancellationToken,
) {
    tracing::debug!("Refresh loop started");

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            signal = signals.recv() => {
                if signal.is_none() {
                    break;
                }
                let mut coalesced = 0_usize;
                while signals.try_recv().is_ok() {
                    coalesced += 1;
                }
                tracing::trace!(coalesced, "Refresh signal received");
                trigger_refresh(&index, &events);
            }
        }
    }

    tracing::debug!("Refresh loop stopped");
}

/// Write the ranking to `sink` every `period`, first after one period.
async fn report_loop(
    index: IndexManager,
    ranking: RankingManager,
    period: Duration,
    sink: ReportSink,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let index = index.clone();
                let sink = sink.clone();
                let written = tokio::task::spawn_blocking(move || {
                    sink.write(&ranking.render(&index))
                })
                .await;

                match written {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!(error = %e, "Failed to write report"),
                    Err(e) => tracing::error!(error = %e, "Report task failed"),
                }
            }
        }
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
