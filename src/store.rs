//! Ordered, id-addressable collection of download entries
//!
//! The store is plain data owned by the orchestrator's control loop; it is never shared
//! across tasks, so it needs no locking. Insertion order is queue order.

use crate::config::EntryConfig;
use crate::error::DownloadError;
use crate::types::{DownloadEntry, EntryId, PlaylistItem, PlaylistMeta, QueueStats, Status};

/// Ordered collection of [`DownloadEntry`] values
#[derive(Debug)]
pub struct EntryStore {
    entries: Vec<DownloadEntry>,
    next_id: u64,
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryStore {
    /// Create an empty store; the first entry gets id 1
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a queued entry and return its id
    pub fn append(&mut self, url: &str, title: &str, overrides: EntryConfig) -> EntryId {
        let id = self.allocate_id();
        self.entries
            .push(DownloadEntry::new(id, url, title, None, overrides));
        id
    }

    /// Append one queued entry per playlist item, in order
    ///
    /// Every entry carries the playlist title, its 1-based index and the item count.
    pub fn append_playlist(
        &mut self,
        playlist_title: &str,
        items: &[PlaylistItem],
        overrides: &EntryConfig,
    ) -> Vec<EntryId> {
        let total = items.len();
        let mut ids = Vec::with_capacity(total);
        for (i, item) in items.iter().enumerate() {
            let id = self.allocate_id();
            let meta = PlaylistMeta {
                playlist_title: playlist_title.to_string(),
                index: i + 1,
                total,
            };
            self.entries.push(DownloadEntry::new(
                id,
                item.url.as_str(),
                item.title.as_str(),
                Some(meta),
                overrides.clone(),
            ));
            ids.push(id);
        }
        ids
    }

    /// Append an entry that failed before it could be queued (e.g. resolution failure)
    pub fn append_failed(&mut self, url: &str, error: String, overrides: EntryConfig) -> EntryId {
        let id = self.allocate_id();
        let mut entry = DownloadEntry::new(id, url, "", None, overrides);
        entry.status = Status::Failed;
        entry.error = Some(error);
        entry.finished_at = Some(chrono::Utc::now());
        self.entries.push(entry);
        id
    }

    /// Apply `f` to the entry with `id`
    ///
    /// Returns `false` without calling `f` when no such entry exists.
    pub fn update<F>(&mut self, id: EntryId, f: F) -> bool
    where
        F: FnOnce(&mut DownloadEntry),
    {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                f(entry);
                true
            }
            None => false,
        }
    }

    /// Remove the entry with `id` if it is still queued
    ///
    /// Running and finished entries stay in the store and an error is returned.
    pub fn remove_if_queued(&mut self, id: EntryId) -> Result<DownloadEntry, DownloadError> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(DownloadError::NotFound { id: id.get() })?;

        let status = self.entries[pos].status;
        if status != Status::Queued {
            return Err(DownloadError::InvalidState {
                id: id.get(),
                operation: "remove".to_string(),
                current_state: status.to_string(),
            });
        }
        Ok(self.entries.remove(pos))
    }

    /// Id of the most recently added entry that is still queued
    pub fn last_queued(&self) -> Option<EntryId> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.status == Status::Queued)
            .map(|e| e.id)
    }

    /// Id of the oldest queued entry
    pub fn next_queued(&self) -> Option<EntryId> {
        self.entries
            .iter()
            .find(|e| e.status == Status::Queued)
            .map(|e| e.id)
    }

    /// Look up an entry by id
    pub fn by_id(&self, id: EntryId) -> Option<&DownloadEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Queued entries, in insertion order
    pub fn queued(&self) -> Vec<&DownloadEntry> {
        self.with_status(|s| s == Status::Queued)
    }

    /// Running entries, in insertion order
    pub fn running(&self) -> Vec<&DownloadEntry> {
        self.with_status(|s| s == Status::Running)
    }

    /// Completed and failed entries, in insertion order
    pub fn finished(&self) -> Vec<&DownloadEntry> {
        self.with_status(Status::is_terminal)
    }

    fn with_status(&self, pred: impl Fn(Status) -> bool) -> Vec<&DownloadEntry> {
        self.entries.iter().filter(|e| pred(e.status)).collect()
    }

    /// All entries, in insertion order
    pub fn all(&self) -> &[DownloadEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mean progress across all entries
    ///
    /// Completed entries count as 100, running entries as their progress, queued and
    /// failed entries as 0. An empty store reports 0.
    pub fn total_progress(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .entries
            .iter()
            .map(DownloadEntry::progress_contribution)
            .sum();
        sum / self.entries.len() as f64
    }

    /// Per-status counts and overall progress
    ///
    /// `resolving`, `is_running` and `accepting_new` are orchestrator state and are
    /// left at their defaults.
    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            total: self.entries.len(),
            overall_progress: self.total_progress(),
            ..Default::default()
        };
        for entry in &self.entries {
            match entry.status {
                Status::Queued => stats.queued += 1,
                Status::Running => stats.running += 1,
                Status::Completed => stats.completed += 1,
                Status::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: u32) -> PlaylistItem {
        PlaylistItem {
            url: format!("https://example.com/watch?v={n}"),
            title: format!("Track {n}"),
        }
    }

    fn set_status(store: &mut EntryStore, id: EntryId, status: Status, progress: f64) {
        assert!(store.update(id, |e| {
            e.status = status;
            e.set_progress(progress);
        }));
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut store = EntryStore::new();
        let a = store.append("https://a", "", EntryConfig::default());
        let b = store.append("https://b", "", EntryConfig::default());
        let c = store.append_playlist("P", &[item(1), item(2)], &EntryConfig::default());

        assert_eq!(a, EntryId(1));
        assert_eq!(b, EntryId(2));
        assert_eq!(c, vec![EntryId(3), EntryId(4)]);
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut store = EntryStore::new();
        let a = store.append("https://a", "", EntryConfig::default());
        store.remove_if_queued(a).unwrap();

        let b = store.append("https://b", "", EntryConfig::default());
        assert_ne!(a, b);
    }

    #[test]
    fn append_playlist_sets_position_metadata() {
        let mut store = EntryStore::new();
        let ids = store.append_playlist("My Mix", &[item(1), item(2), item(3)], &EntryConfig::default());

        for (i, id) in ids.iter().enumerate() {
            let entry = store.by_id(*id).unwrap();
            let meta = entry.playlist.as_ref().unwrap();
            assert_eq!(meta.playlist_title, "My Mix");
            assert_eq!(meta.index, i + 1);
            assert_eq!(meta.total, 3);
            assert_eq!(entry.status, Status::Queued);
        }
    }

    #[test]
    fn total_progress_of_empty_store_is_zero() {
        assert_eq!(EntryStore::new().total_progress(), 0.0);
    }

    #[test]
    fn total_progress_averages_over_all_entries() {
        let mut store = EntryStore::new();
        let done = store.append("https://a", "", EntryConfig::default());
        let _queued = store.append("https://b", "", EntryConfig::default());
        set_status(&mut store, done, Status::Completed, 100.0);

        assert_eq!(store.total_progress(), 50.0);
    }

    #[test]
    fn two_completed_of_four_is_half_done() {
        let mut store = EntryStore::new();
        let a = store.append("https://a", "", EntryConfig::default());
        let b = store.append("https://b", "", EntryConfig::default());
        store.append("https://c", "", EntryConfig::default());
        store.append("https://d", "", EntryConfig::default());
        set_status(&mut store, a, Status::Completed, 100.0);
        set_status(&mut store, b, Status::Completed, 100.0);

        assert_eq!(store.queued().len(), 2);
        assert_eq!(store.total_progress(), 50.0);
    }

    #[test]
    fn total_progress_counts_running_and_failed() {
        let mut store = EntryStore::new();
        let running = store.append("https://a", "", EntryConfig::default());
        let failed = store.append("https://b", "", EntryConfig::default());
        let _queued = store.append("https://c", "", EntryConfig::default());
        set_status(&mut store, running, Status::Running, 40.0);
        set_status(&mut store, failed, Status::Failed, 90.0);

        let total = store.total_progress();
        assert!((total - 40.0 / 3.0).abs() < 1e-9, "got {total}");
    }

    #[test]
    fn update_of_unknown_id_is_a_noop() {
        let mut store = EntryStore::new();
        store.append("https://a", "", EntryConfig::default());

        let mut called = false;
        assert!(!store.update(EntryId(99), |_| called = true));
        assert!(!called);
    }

    #[test]
    fn remove_only_affects_queued_entries() {
        let mut store = EntryStore::new();
        let running = store.append("https://a", "", EntryConfig::default());
        let queued = store.append("https://b", "", EntryConfig::default());
        set_status(&mut store, running, Status::Running, 10.0);

        let err = store.remove_if_queued(running).unwrap_err();
        assert!(matches!(err, DownloadError::InvalidState { id: 1, .. }));
        assert_eq!(store.len(), 2, "running entry must not be removed");

        let removed = store.remove_if_queued(queued).unwrap();
        assert_eq!(removed.url, "https://b");
        assert_eq!(store.len(), 1);

        let err = store.remove_if_queued(EntryId(42)).unwrap_err();
        assert!(matches!(err, DownloadError::NotFound { id: 42 }));
    }

    #[test]
    fn status_views_preserve_insertion_order() {
        let mut store = EntryStore::new();
        let a = store.append("https://a", "", EntryConfig::default());
        let b = store.append("https://b", "", EntryConfig::default());
        let c = store.append("https://c", "", EntryConfig::default());
        let d = store.append_failed("bad://x", "unsupported".to_string(), EntryConfig::default());
        set_status(&mut store, a, Status::Completed, 100.0);

        let queued: Vec<_> = store.queued().iter().map(|e| e.id).collect();
        assert_eq!(queued, vec![b, c]);
        assert_eq!(store.next_queued(), Some(b));
        assert_eq!(store.last_queued(), Some(c));

        let finished: Vec<_> = store.finished().iter().map(|e| e.id).collect();
        assert_eq!(finished, vec![a, d]);
        assert!(store.running().is_empty());
    }

    #[test]
    fn append_failed_records_error() {
        let mut store = EntryStore::new();
        let overrides = EntryConfig {
            format: Some("flac".to_string()),
            ..Default::default()
        };
        let id = store.append_failed("bad://x", "no extractor".to_string(), overrides.clone());

        let entry = store.by_id(id).unwrap();
        assert_eq!(entry.status, Status::Failed);
        assert_eq!(entry.overrides, overrides);
        assert_eq!(entry.error.as_deref(), Some("no extractor"));
        assert!(entry.finished_at.is_some());
        assert!(entry.output_path.is_none());
    }

    #[test]
    fn stats_count_each_status() {
        let mut store = EntryStore::new();
        let a = store.append("https://a", "", EntryConfig::default());
        let b = store.append("https://b", "", EntryConfig::default());
        store.append("https://c", "", EntryConfig::default());
        store.append_failed("bad://x", "boom".to_string(), EntryConfig::default());
        set_status(&mut store, a, Status::Completed, 100.0);
        set_status(&mut store, b, Status::Running, 50.0);

        let stats = store.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.running, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.overall_progress, 37.5);
    }
}
