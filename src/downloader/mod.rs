//! Core downloader implementation split into focused submodules.
//!
//! [`MediaDownloader`] is a cloneable handle to a single control loop that owns the
//! entry store. Its methods are organized by domain:
//! - [`queue`] - URL submission, resolution handling and queue queries
//! - [`control`] - Start, progress, completion and removal
//! - [`lifecycle`] - Graceful shutdown
//! - [`orchestrator`] - The control loop itself
//!
//! Background work (URL resolution and the single running job) reports back through
//! one inbound channel, so the store is only ever mutated by the control loop.

mod control;
mod lifecycle;
mod orchestrator;
mod queue;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::{Config, EntryConfig};
use crate::error::{Error, JobError, Result};
use crate::resolver::{CliPlaylistResolver, PlaylistResolver, ResolvedPlaylist};
use crate::runner::{CliJobRunner, JobRunner, ProgressUpdate};
use crate::types::{DownloadEntry, EntryId, Event, QueueStats, StartOutcome};

use orchestrator::Orchestrator;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Capacity of the command channel between handles and the control loop
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Filtered view over the entry store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum View {
    All,
    Queued,
    Running,
    Finished,
}

/// Requests from handles to the control loop
pub(crate) enum Command {
    Submit {
        url: String,
        overrides: EntryConfig,
        reply: oneshot::Sender<Result<()>>,
    },
    Start {
        reply: oneshot::Sender<StartOutcome>,
    },
    Remove {
        id: EntryId,
        reply: oneshot::Sender<Result<DownloadEntry>>,
    },
    RemoveLastQueued {
        reply: oneshot::Sender<Option<EntryId>>,
    },
    Entries {
        view: View,
        reply: oneshot::Sender<Vec<DownloadEntry>>,
    },
    Entry {
        id: EntryId,
        reply: oneshot::Sender<Option<DownloadEntry>>,
    },
    Stats {
        reply: oneshot::Sender<QueueStats>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Results delivered by background tasks
#[derive(Debug)]
pub(crate) enum Message {
    Resolved(ResolvedPlaylist),
    Progress(ProgressUpdate),
    Finished {
        id: EntryId,
        result: std::result::Result<Option<PathBuf>, JobError>,
    },
}

/// Main downloader handle (cloneable - every clone talks to the same control loop)
///
/// The control loop stops after [`shutdown`](MediaDownloader::shutdown), or once every
/// handle has been dropped and in-flight work has finished.
#[derive(Clone, Debug)]
pub struct MediaDownloader {
    /// Command channel into the control loop
    pub(crate) cmd_tx: mpsc::Sender<Command>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Process-wide configuration
    pub(crate) config: Arc<Config>,
}

impl MediaDownloader {
    /// Create a downloader backed by the external downloader binary
    ///
    /// The binary is taken from `config.tools.downloader_path` or searched in PATH.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] when no downloader binary can be located.
    pub async fn new(config: Config) -> Result<Self> {
        let resolver = CliPlaylistResolver::from_config(&config.tools)?;
        let runner = CliJobRunner::from_config(&config.tools)?;

        tracing::info!(
            binary = %runner.binary_path().display(),
            js_runtime = ?config.tools.js_runtime,
            output_folder = %config.output_folder.display(),
            "Downloader initialized"
        );

        Ok(Self::with_backends(config, Arc::new(resolver), Arc::new(runner)).await)
    }

    /// Create a downloader with custom resolver and runner implementations
    pub async fn with_backends(
        config: Config,
        resolver: Arc<dyn PlaylistResolver>,
        runner: Arc<dyn JobRunner>,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let config = Arc::new(config);

        tracing::debug!(
            resolver = resolver.name(),
            runner = runner.name(),
            "Spawning control loop"
        );

        let orchestrator = Orchestrator::new(
            config.clone(),
            resolver,
            runner,
            event_tx.clone(),
            inbound_tx,
        );
        tokio::spawn(orchestrator.run(cmd_rx, inbound_rx));

        Self {
            cmd_tx,
            event_tx,
            config,
        }
    }

    /// Subscribe to downloader events
    ///
    /// Each subscriber receives every event emitted after it subscribed. A subscriber
    /// that falls more than the channel capacity behind observes
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Process-wide configuration
    pub fn get_config(&self) -> &Config {
        &self.config
    }

    /// Send a command and wait for its reply
    ///
    /// Fails with [`Error::ShuttingDown`] once the control loop has stopped.
    pub(crate) async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(command(reply))
            .await
            .map_err(|_| Error::ShuttingDown)?;
        rx.await.map_err(|_| Error::ShuttingDown)
    }
}
