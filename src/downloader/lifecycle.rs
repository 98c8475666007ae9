//! Shutdown coordination.

use crate::error::{Error, Result};
use crate::types::Event;

use super::orchestrator::Orchestrator;
use super::{Command, MediaDownloader};

impl MediaDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting submissions and job starts
    /// 2. Lets the running job and any in-flight resolutions finish (the downloader
    ///    process is never killed); queued entries are not started
    /// 3. Emits [`Event::Shutdown`] and stops the control loop
    ///
    /// Resolves once the control loop has exited. Calling it again, or after the loop
    /// has already stopped, returns `Ok(())`.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");
        match self.request(|reply| Command::Shutdown { reply }).await {
            Ok(()) | Err(Error::ShuttingDown) => {
                tracing::info!("Graceful shutdown complete");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl Orchestrator {
    pub(super) fn begin_shutdown(&mut self) {
        if self.accepting_new {
            self.accepting_new = false;
            tracing::info!(
                active = ?self.active.map(|id| id.0),
                resolving = self.resolving,
                queued = self.store.queued().len(),
                "Stopped accepting new work"
            );
        }
        self.is_running = false;
    }

    /// Whether shutdown was requested and no background work remains
    pub(super) fn is_idle_after_shutdown(&self) -> bool {
        !self.accepting_new && self.active.is_none() && self.resolving == 0
    }

    pub(super) fn finish_shutdown(&mut self) {
        self.emit_event(Event::Shutdown);
        for waiter in self.shutdown_waiters.drain(..) {
            let _ = waiter.send(());
        }
        tracing::debug!(entries = self.store.len(), "Control loop stopped");
    }
}
