//! URL submission, resolution handling and queue queries.

use crate::config::EntryConfig;
use crate::error::{Error, Result};
use crate::resolver::ResolvedPlaylist;
use crate::types::{DownloadEntry, EntryId, Event, QueueStats};

use super::orchestrator::Orchestrator;
use super::{Command, MediaDownloader, Message, View};

impl MediaDownloader {
    /// Submit a URL with the global configuration
    ///
    /// See [`submit_with`](Self::submit_with).
    pub async fn submit(&self, url: impl Into<String>) -> Result<()> {
        self.submit_with(url, EntryConfig::default()).await
    }

    /// Submit a URL with a per-entry configuration override
    ///
    /// The URL is resolved in the background; its items are queued when resolution
    /// finishes. A failed resolution is recorded as a failed entry. Returns once the
    /// resolution has been started, not when it completes.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUrl`] for a blank URL, [`Error::ShuttingDown`] after shutdown.
    pub async fn submit_with(&self, url: impl Into<String>, overrides: EntryConfig) -> Result<()> {
        let url = url.into();
        self.request(|reply| Command::Submit {
            url,
            overrides,
            reply,
        })
        .await?
    }

    /// All entries in queue order, including history
    pub async fn entries(&self) -> Result<Vec<DownloadEntry>> {
        self.request(|reply| Command::Entries {
            view: View::All,
            reply,
        })
        .await
    }

    /// Entries waiting to start, head first
    pub async fn queued(&self) -> Result<Vec<DownloadEntry>> {
        self.request(|reply| Command::Entries {
            view: View::Queued,
            reply,
        })
        .await
    }

    /// The running entry, if any (at most one)
    pub async fn running(&self) -> Result<Option<DownloadEntry>> {
        let mut running = self
            .request(|reply| Command::Entries {
                view: View::Running,
                reply,
            })
            .await?;
        Ok(running.pop())
    }

    /// Completed and failed entries, in insertion order
    pub async fn finished(&self) -> Result<Vec<DownloadEntry>> {
        self.request(|reply| Command::Entries {
            view: View::Finished,
            reply,
        })
        .await
    }

    /// Look up one entry
    pub async fn entry(&self, id: EntryId) -> Result<Option<DownloadEntry>> {
        self.request(|reply| Command::Entry { id, reply }).await
    }

    /// Queue statistics
    pub async fn stats(&self) -> Result<QueueStats> {
        self.request(|reply| Command::Stats { reply }).await
    }

    /// Overall progress across all entries (0.0 to 100.0)
    pub async fn total_progress(&self) -> Result<f64> {
        Ok(self.stats().await?.overall_progress)
    }
}

impl Orchestrator {
    pub(super) fn submit(&mut self, url: String, overrides: EntryConfig) -> Result<()> {
        if !self.accepting_new {
            return Err(Error::ShuttingDown);
        }
        let url = url.trim().to_string();
        if url.is_empty() {
            return Err(Error::InvalidUrl(url));
        }

        self.resolving += 1;
        tracing::info!(url = %url, resolving = self.resolving, "Resolving URL");
        self.emit_event(Event::ResolutionStarted { url: url.clone() });

        let resolver = self.resolver.clone();
        let tx = self.inbound_tx.clone();
        tokio::spawn(async move {
            let task_url = url.clone();
            let task_overrides = overrides.clone();
            let handle = tokio::spawn(async move {
                ResolvedPlaylist::resolve(resolver.as_ref(), task_url, task_overrides).await
            });

            let resolved = match handle.await {
                Ok(resolved) => resolved,
                Err(e) => ResolvedPlaylist {
                    url,
                    playlist_title: None,
                    items: Vec::new(),
                    overrides,
                    error: Some(format!("resolution task aborted: {e}")),
                },
            };
            // Receiver gone means the control loop already stopped
            let _ = tx.send(Message::Resolved(resolved));
        });

        Ok(())
    }

    /// Append the items of a finished resolution, or a failed entry on error
    pub(super) fn handle_resolved(&mut self, resolved: ResolvedPlaylist) {
        self.resolving = self.resolving.saturating_sub(1);

        let ResolvedPlaylist {
            url,
            playlist_title,
            items,
            overrides,
            error,
        } = resolved;

        if let Some(error) = error {
            let id = self.store.append_failed(&url, error.clone(), overrides);
            tracing::warn!(entry_id = id.0, url = %url, error = %error, "Resolution failed");
            // Queued first so subscribers see the entry before its failure
            self.emit_event(Event::Queued {
                id,
                url: url.clone(),
                title: String::new(),
            });
            self.emit_event(Event::Failed {
                id,
                error: error.clone(),
            });
            self.emit_event(Event::Resolved {
                url,
                playlist_title: None,
                items: 0,
                error: Some(error),
            });
            return;
        }

        let ids: Vec<EntryId> = match &playlist_title {
            Some(title) => self.store.append_playlist(title, &items, &overrides),
            None => items
                .iter()
                .map(|item| self.store.append(&item.url, &item.title, overrides.clone()))
                .collect(),
        };

        for (id, item) in ids.iter().zip(&items) {
            self.emit_event(Event::Queued {
                id: *id,
                url: item.url.clone(),
                title: item.title.clone(),
            });
        }

        tracing::info!(
            url = %url,
            playlist = ?playlist_title,
            queued = ids.len(),
            resolving = self.resolving,
            "Resolution complete"
        );
        self.emit_event(Event::Resolved {
            url,
            playlist_title,
            items: ids.len(),
            error: None,
        });
    }
}
