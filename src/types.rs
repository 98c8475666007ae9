//! Core types for mldy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::EntryConfig;

/// Unique identifier for a queue entry
///
/// Identifiers are assigned by the [`EntryStore`](crate::store::EntryStore) in increasing
/// order and are never reused within a process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl EntryId {
    /// Create a new EntryId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for EntryId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<EntryId> for u64 {
    fn from(id: EntryId) -> Self {
        id.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EntryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Entry status
///
/// `Queued -> Running -> {Completed | Failed}`. The last two are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Waiting in the queue
    Queued,
    /// The downloader process is running for this entry
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl Status {
    /// Whether no further transition is possible from this status
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Queued => "queued",
            Status::Running => "running",
            Status::Completed => "completed",
            Status::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Set on entries that were expanded from a playlist
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistMeta {
    /// Title of the playlist the entry came from
    pub playlist_title: String,
    /// 1-based position within the playlist
    pub index: usize,
    /// Total number of items in the playlist
    pub total: usize,
}

/// One queued, running or finished download unit
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadEntry {
    /// Unique entry identifier
    pub id: EntryId,

    /// Source locator to fetch
    pub url: String,

    /// Best-known display label (empty until discovered)
    pub title: String,

    /// Current status
    pub status: Status,

    /// Progress percentage (0.0 to 100.0), meaningful while running
    pub progress: f64,

    /// Failure detail, set only when failed
    pub error: Option<String>,

    /// Produced file, set only on successful completion
    pub output_path: Option<PathBuf>,

    /// Present iff the entry originated from playlist expansion
    pub playlist: Option<PlaylistMeta>,

    /// Per-entry configuration override
    pub overrides: EntryConfig,

    /// When the entry was added
    pub created_at: DateTime<Utc>,

    /// When the download started
    pub started_at: Option<DateTime<Utc>>,

    /// When the entry reached a terminal status
    pub finished_at: Option<DateTime<Utc>>,
}

impl DownloadEntry {
    /// Create a queued entry
    pub fn new(
        id: EntryId,
        url: impl Into<String>,
        title: impl Into<String>,
        playlist: Option<PlaylistMeta>,
        overrides: EntryConfig,
    ) -> Self {
        Self {
            id,
            url: url.into(),
            title: title.into(),
            status: Status::Queued,
            progress: 0.0,
            error: None,
            output_path: None,
            playlist,
            overrides,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Best available label for display: the title, or the URL while the title is unknown
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }

    /// Short prefix like `"[My Playlist 3/12] "`, or `""` for entries outside a playlist
    pub fn playlist_label(&self) -> String {
        match &self.playlist {
            Some(meta) => format!("[{} {}/{}] ", meta.playlist_title, meta.index, meta.total),
            None => String::new(),
        }
    }

    /// Record a progress value, clamped to `[0, 100]`
    ///
    /// Non-finite values are ignored.
    pub fn set_progress(&mut self, percent: f64) {
        if percent.is_finite() {
            self.progress = percent.clamp(0.0, 100.0);
        }
    }

    /// Contribution of this entry to the overall progress
    pub(crate) fn progress_contribution(&self) -> f64 {
        match self.status {
            Status::Completed => 100.0,
            Status::Running => self.progress,
            Status::Queued | Status::Failed => 0.0,
        }
    }
}

/// One downloadable item produced by the playlist resolver
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// Canonical item URL
    pub url: String,
    /// Item title (may be empty)
    pub title: String,
}

/// Outcome of [`MediaDownloader::start`](crate::MediaDownloader::start)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    /// The head of the queue is now running
    Started {
        /// Entry that was started
        id: EntryId,
    },
    /// The queue is already being processed
    AlreadyRunning,
    /// URLs are still being resolved; start again once they are queued
    Resolving {
        /// Number of resolutions in flight
        pending: usize,
    },
    /// Nothing is queued
    QueueEmpty,
    /// Shutdown was requested
    ShuttingDown,
}

/// Event emitted to subscribers
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A URL was submitted for resolution
    ResolutionStarted {
        /// Submitted URL
        url: String,
    },

    /// A resolution finished (successfully or not)
    Resolved {
        /// Submitted URL
        url: String,
        /// Playlist title, when the URL was a playlist
        playlist_title: Option<String>,
        /// Number of entries queued from this resolution
        items: usize,
        /// Resolution error message, if any
        error: Option<String>,
    },

    /// An entry was added to the queue
    ///
    /// A failed resolution is announced the same way, followed at once by [`Event::Failed`].
    Queued {
        /// Entry ID
        id: EntryId,
        /// Entry URL
        url: String,
        /// Known title (may be empty)
        title: String,
    },

    /// A queued entry was removed
    Removed {
        /// Entry ID
        id: EntryId,
    },

    /// An entry started downloading
    Started {
        /// Entry ID
        id: EntryId,
        /// Entry URL
        url: String,
    },

    /// Progress update for the running entry
    Progress {
        /// Entry ID
        id: EntryId,
        /// Progress percentage (0.0 to 100.0)
        percent: f64,
        /// Display title derived from the output file name
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    /// An entry finished successfully
    Completed {
        /// Entry ID
        id: EntryId,
        /// Produced file, when the downloader announced one
        output_path: Option<PathBuf>,
    },

    /// An entry failed
    Failed {
        /// Entry ID
        id: EntryId,
        /// Error message
        error: String,
    },

    /// No queued entry remained after a completion
    QueueDrained,

    /// The control loop stopped
    Shutdown,
}

/// Queue statistics
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Total number of entries (including history)
    pub total: usize,

    /// Entries waiting to start
    pub queued: usize,

    /// Entries currently running (0 or 1)
    pub running: usize,

    /// Entries finished successfully
    pub completed: usize,

    /// Entries that failed
    pub failed: usize,

    /// URL resolutions in flight
    pub resolving: usize,

    /// Overall progress (0.0 to 100.0)
    pub overall_progress: f64,

    /// Whether the queue is being processed
    pub is_running: bool,

    /// Whether new submissions are accepted
    pub accepting_new: bool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn entry() -> DownloadEntry {
        DownloadEntry::new(
            EntryId(1),
            "https://example.com/v",
            "",
            None,
            EntryConfig::default(),
        )
    }

    #[test]
    fn display_title_falls_back_to_url() {
        let mut e = entry();
        assert_eq!(e.display_title(), "https://example.com/v");

        e.title = "Song".to_string();
        assert_eq!(e.display_title(), "Song");
    }

    #[test]
    fn playlist_label_formats_position() {
        let mut e = entry();
        assert_eq!(e.playlist_label(), "");

        e.playlist = Some(PlaylistMeta {
            playlist_title: "My Mix".to_string(),
            index: 3,
            total: 12,
        });
        assert_eq!(e.playlist_label(), "[My Mix 3/12] ");
    }

    #[test]
    fn set_progress_clamps_out_of_range_values() {
        let mut e = entry();

        e.set_progress(-5.0);
        assert_eq!(e.progress, 0.0, "negative progress must clamp to 0");

        e.set_progress(140.0);
        assert_eq!(e.progress, 100.0, "progress above 100 must clamp to 100");

        e.set_progress(42.5);
        assert_eq!(e.progress, 42.5);
    }

    #[test]
    fn set_progress_ignores_nan() {
        let mut e = entry();
        e.set_progress(12.0);
        e.set_progress(f64::NAN);
        assert_eq!(e.progress, 12.0, "NaN must not overwrite the last good value");
    }

    #[test]
    fn terminal_statuses() {
        assert!(!Status::Queued.is_terminal());
        assert!(!Status::Running.is_terminal());
        assert!(Status::Completed.is_terminal());
        assert!(Status::Failed.is_terminal());
    }

    #[test]
    fn entry_id_parses_and_displays() {
        let id = EntryId::from_str("42").unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
        assert!(EntryId::from_str("-1").is_err(), "ids are unsigned");
    }

    #[test]
    fn event_serializes_with_snake_case_tag() {
        let json = serde_json::to_value(Event::Progress {
            id: EntryId(3),
            percent: 50.0,
            title: None,
        })
        .unwrap();

        assert_eq!(json["type"], "progress");
        assert_eq!(json["id"], 3);
        assert!(json.get("title").is_none(), "absent title is skipped");
    }
}
