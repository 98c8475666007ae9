//! Download lifecycle control (start/advance/remove) and job result handling.

use std::path::PathBuf;

use crate::error::{JobError, Result};
use crate::runner::{JobRequest, ProgressSink, ProgressUpdate};
use crate::types::{DownloadEntry, EntryId, Event, StartOutcome, Status};

use super::orchestrator::Orchestrator;
use super::{Command, MediaDownloader, Message};

impl MediaDownloader {
    /// Start processing the queue
    ///
    /// Starts the head of the queue when nothing is running, no resolution is in flight
    /// and at least one entry is queued. Once started, each completion advances to the
    /// next queued entry until the queue drains.
    pub async fn start(&self) -> Result<StartOutcome> {
        self.request(|reply| Command::Start { reply }).await
    }

    /// Remove a queued entry
    ///
    /// # Errors
    ///
    /// [`DownloadError::NotFound`](crate::error::DownloadError::NotFound) for an unknown id,
    /// [`DownloadError::InvalidState`](crate::error::DownloadError::InvalidState) when the
    /// entry is running or finished. The store is unchanged on error.
    pub async fn remove(&self, id: EntryId) -> Result<DownloadEntry> {
        self.request(|reply| Command::Remove { id, reply }).await?
    }

    /// Remove the most recently queued entry, returning its id
    pub async fn remove_last_queued(&self) -> Result<Option<EntryId>> {
        self.request(|reply| Command::RemoveLastQueued { reply }).await
    }
}

impl Orchestrator {
    pub(super) fn try_start(&mut self) -> StartOutcome {
        if !self.accepting_new {
            return StartOutcome::ShuttingDown;
        }
        if self.is_running || self.active.is_some() {
            return StartOutcome::AlreadyRunning;
        }
        if self.resolving > 0 {
            return StartOutcome::Resolving {
                pending: self.resolving,
            };
        }
        match self.store.next_queued() {
            None => StartOutcome::QueueEmpty,
            Some(id) => {
                self.is_running = true;
                tracing::info!(queued = self.store.queued().len(), "Queue processing started");
                self.launch(id);
                StartOutcome::Started { id }
            }
        }
    }

    /// Start the head of the queue, or clear the running flag when it is empty
    fn start_next(&mut self) {
        match self.store.next_queued() {
            Some(id) => self.launch(id),
            None => {
                self.is_running = false;
                let stats = self.store.stats();
                tracing::info!(
                    completed = stats.completed,
                    failed = stats.failed,
                    "Queue drained"
                );
                self.emit_event(Event::QueueDrained);
            }
        }
    }

    /// Transition `id` to running and spawn its job
    fn launch(&mut self, id: EntryId) {
        let Some(entry) = self.store.by_id(id) else {
            return;
        };
        let url = entry.url.clone();
        let config = self.config.merge_with(&entry.overrides);

        self.store.update(id, |e| {
            e.status = Status::Running;
            e.progress = 0.0;
            e.started_at = Some(chrono::Utc::now());
        });
        self.active = Some(id);

        tracing::info!(entry_id = id.0, url = %url, kind = %config.effective_kind(), "Starting download");
        self.emit_event(Event::Started {
            id,
            url: url.clone(),
        });

        let runner = self.runner.clone();
        let tx = self.inbound_tx.clone();
        tokio::spawn(async move {
            let (sink, mut progress_rx) = ProgressSink::channel(id);
            let job = JobRequest { id, url, config };
            let handle = tokio::spawn(async move { runner.run(job, sink).await });

            // Drains until every sink clone is dropped, so all progress precedes completion
            while let Some(update) = progress_rx.recv().await {
                if tx.send(Message::Progress(update)).is_err() {
                    break;
                }
            }

            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(JobError::Panicked(e.to_string())),
            };
            let _ = tx.send(Message::Finished { id, result });
        });
    }

    pub(super) fn handle_progress(&mut self, update: ProgressUpdate) {
        let ProgressUpdate { id, percent, title } = update;
        if self.active != Some(id) {
            return;
        }

        let title = title.filter(|t| !t.is_empty());
        let mut applied = None;
        self.store.update(id, |e| {
            if e.status != Status::Running {
                return;
            }
            e.set_progress(percent);
            if let Some(title) = &title {
                e.title = title.clone();
            }
            applied = Some(e.progress);
        });

        if let Some(percent) = applied {
            tracing::trace!(entry_id = id.0, percent, "Progress");
            self.emit_event(Event::Progress { id, percent, title });
        }
    }

    pub(super) fn handle_finished(
        &mut self,
        id: EntryId,
        result: std::result::Result<Option<PathBuf>, JobError>,
    ) {
        if self.active != Some(id) {
            tracing::warn!(entry_id = id.0, "Ignoring completion for entry that is not running");
            return;
        }
        self.active = None;

        let now = chrono::Utc::now();
        match result {
            Ok(output_path) => {
                self.store.update(id, |e| {
                    e.status = Status::Completed;
                    e.progress = 100.0;
                    e.output_path = output_path.clone();
                    e.finished_at = Some(now);
                });
                tracing::info!(entry_id = id.0, output_path = ?output_path, "Download complete");
                self.emit_event(Event::Completed { id, output_path });
            }
            Err(e) => {
                let error = e.to_string();
                self.store.update(id, |entry| {
                    entry.status = Status::Failed;
                    entry.error = Some(error.clone());
                    entry.finished_at = Some(now);
                });
                tracing::warn!(entry_id = id.0, error = %error, "Download failed");
                self.emit_event(Event::Failed { id, error });
            }
        }

        if self.is_running {
            self.start_next();
        }
    }

    pub(super) fn remove(&mut self, id: EntryId) -> Result<DownloadEntry> {
        let entry = self.store.remove_if_queued(id).inspect_err(|e| {
            tracing::debug!(entry_id = id.0, error = %e, "Remove rejected");
        })?;
        tracing::info!(entry_id = id.0, url = %entry.url, "Removed queued entry");
        self.emit_event(Event::Removed { id });
        Ok(entry)
    }

    pub(super) fn remove_last_queued(&mut self) -> Option<EntryId> {
        let id = self.store.last_queued()?;
        match self.remove(id) {
            Ok(_) => Some(id),
            Err(e) => {
                tracing::warn!(entry_id = id.0, error = %e, "Failed to remove last queued entry");
                None
            }
        }
    }
}

