//! Download job execution
//!
//! A [`JobRunner`] performs exactly one download. It reports progress through a
//! [`ProgressSink`] and returns the produced file path, or a [`JobError`].

mod args;
mod cli;
mod output;

pub use args::{download_args, runtime_args};
pub use cli::CliJobRunner;
pub use output::{OutputParser, stream_output};

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::JobError;
use crate::types::EntryId;

/// One download to perform
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Entry being downloaded
    pub id: EntryId,
    /// Source URL
    pub url: String,
    /// Global configuration merged with the entry's override
    pub config: Config,
}

/// Progress report for a running job
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Entry being downloaded
    pub id: EntryId,
    /// Reported percentage (not yet clamped)
    pub percent: f64,
    /// Display title derived from the output file, once known
    pub title: Option<String>,
}

/// Sending half for progress reports of one job
///
/// Reports are delivered in the order they are made. The receiving side sees the
/// channel close once every clone of the sink is dropped.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    id: EntryId,
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ProgressSink {
    /// Create a sink for `id` with its receiving half
    pub fn channel(id: EntryId) -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id, tx }, rx)
    }

    /// Entry this sink reports for
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Report a progress percentage
    pub fn report(&self, percent: f64, title: Option<String>) {
        // Receiver gone means the orchestrator stopped; nothing left to inform
        let _ = self.tx.send(ProgressUpdate {
            id: self.id,
            percent,
            title,
        });
    }
}

/// Trait for running a single download job
///
/// Implementations must not panic on process or I/O failures; every failure is a
/// [`JobError`].
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Run `job` to completion, returning the produced file path when one was announced
    async fn run(&self, job: JobRequest, progress: ProgressSink) -> Result<Option<PathBuf>, JobError>;

    /// Name of this implementation, for logging
    fn name(&self) -> &'static str;
}
