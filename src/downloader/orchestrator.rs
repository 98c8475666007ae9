//! The control loop owning the entry store.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::Config;
use crate::resolver::PlaylistResolver;
use crate::runner::JobRunner;
use crate::store::EntryStore;
use crate::types::{EntryId, Event, QueueStats};

use super::{Command, Message, View};

/// Single owner of the entry store and every status transition
///
/// Only one job is ever outstanding: `active` is set when a job is launched and
/// cleared when its completion message arrives.
pub(crate) struct Orchestrator {
    pub(super) store: EntryStore,
    pub(super) config: Arc<Config>,
    pub(super) resolver: Arc<dyn PlaylistResolver>,
    pub(super) runner: Arc<dyn JobRunner>,
    pub(super) event_tx: broadcast::Sender<Event>,
    pub(super) inbound_tx: mpsc::UnboundedSender<Message>,
    /// URL resolutions in flight
    pub(super) resolving: usize,
    /// Queue processing requested; cleared when the queue drains
    pub(super) is_running: bool,
    /// Entry whose job is outstanding
    pub(super) active: Option<EntryId>,
    pub(super) accepting_new: bool,
    pub(super) shutdown_waiters: Vec<oneshot::Sender<()>>,
}

impl Orchestrator {
    pub(crate) fn new(
        config: Arc<Config>,
        resolver: Arc<dyn PlaylistResolver>,
        runner: Arc<dyn JobRunner>,
        event_tx: broadcast::Sender<Event>,
        inbound_tx: mpsc::UnboundedSender<Message>,
    ) -> Self {
        Self {
            store: EntryStore::new(),
            config,
            resolver,
            runner,
            event_tx,
            inbound_tx,
            resolving: 0,
            is_running: false,
            active: None,
            accepting_new: true,
            shutdown_waiters: Vec::new(),
        }
    }

    /// Process commands and background results until shutdown completes
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut inbound: mpsc::UnboundedReceiver<Message>,
    ) {
        tracing::debug!("Control loop started");
        let mut commands_open = true;

        loop {
            tokio::select! {
                cmd = commands.recv(), if commands_open => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        tracing::debug!("All downloader handles dropped");
                        commands_open = false;
                        self.begin_shutdown();
                    }
                },
                Some(msg) = inbound.recv() => self.handle_message(msg),
                else => break,
            }

            if self.is_idle_after_shutdown() {
                break;
            }
        }

        self.finish_shutdown();
    }

    fn handle_command(&mut self, cmd: Command) {
        // A dropped reply receiver only means the caller stopped waiting
        match cmd {
            Command::Submit {
                url,
                overrides,
                reply,
            } => {
                let _ = reply.send(self.submit(url, overrides));
            }
            Command::Start { reply } => {
                let _ = reply.send(self.try_start());
            }
            Command::Remove { id, reply } => {
                let _ = reply.send(self.remove(id));
            }
            Command::RemoveLastQueued { reply } => {
                let _ = reply.send(self.remove_last_queued());
            }
            Command::Entries { view, reply } => {
                let _ = reply.send(self.entries(view));
            }
            Command::Entry { id, reply } => {
                let _ = reply.send(self.store.by_id(id).cloned());
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
            Command::Shutdown { reply } => {
                self.shutdown_waiters.push(reply);
                self.begin_shutdown();
            }
        }
    }

    fn handle_message(&mut self, msg: Message) {
        match msg {
            Message::Resolved(resolved) => self.handle_resolved(resolved),
            Message::Progress(update) => self.handle_progress(update),
            Message::Finished { id, result } => self.handle_finished(id, result),
        }
    }

    fn entries(&self, view: View) -> Vec<crate::types::DownloadEntry> {
        match view {
            View::All => self.store.all().to_vec(),
            View::Queued => self.store.queued().into_iter().cloned().collect(),
            View::Running => self.store.running().into_iter().cloned().collect(),
            View::Finished => self.store.finished().into_iter().cloned().collect(),
        }
    }

    fn stats(&self) -> QueueStats {
        QueueStats {
            resolving: self.resolving,
            is_running: self.is_running,
            accepting_new: self.accepting_new,
            ..self.store.stats()
        }
    }

    /// Emit an event to all subscribers
    pub(super) fn emit_event(&self, event: Event) {
        // No subscribers is not an error
        let _ = self.event_tx.send(event);
    }
}
