//! Error types for mldy
//!
//! This module provides the error hierarchy for the library:
//! - [`Error`] - the top-level error returned by public operations
//! - [`DownloadError`] - queue/entry state errors (unknown id, invalid transition)
//! - [`ResolveError`] - metadata (playlist expansion) failures
//! - [`JobError`] - failures of a single download job
//!
//! Resolution and job errors never escape the orchestrator as `Err` values: they are
//! rendered with `Display` and recorded on the affected entry so they stay visible in
//! history.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mldy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mldy
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "audio_quality")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("invalid config file: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Configuration could not be written
    #[error("failed to encode config: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Entry/queue state error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Playlist resolution error
    #[error("resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Download job error
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// External downloader binary could not be located
    #[error("external tool not found: {0}")]
    ToolNotFound(String),

    /// Submitted URL is unusable
    #[error("invalid URL: {0:?}")]
    InvalidUrl(String),

    /// Shutdown in progress - not accepting new work
    #[error("shutdown in progress: not accepting new work")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Entry and queue state errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Entry not found in the store
    #[error("entry {id} not found")]
    NotFound {
        /// The entry ID that was not found
        id: u64,
    },

    /// Cannot perform operation in current state
    #[error("cannot {operation} entry {id} in state {current_state}")]
    InvalidState {
        /// The entry ID that is in an invalid state for the operation
        id: u64,
        /// The operation that was attempted (e.g., "remove")
        operation: String,
        /// The current state that prevents the operation (e.g., "running")
        current_state: String,
    },
}

/// Errors produced while expanding a URL into downloadable items
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The metadata process could not be started
    #[error("failed to run {tool}: {source}")]
    Launch {
        /// Binary that was invoked
        tool: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// The metadata process exited unsuccessfully
    #[error("failed to resolve playlist: {status}{}", stderr_suffix(.stderr))]
    Exit {
        /// Exit status as reported by the OS
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The metadata output was not valid JSON of the expected shape
    #[error("failed to parse playlist JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The playlist had no item that could be turned into a URL
    #[error("playlist {title:?} contains no downloadable items")]
    Empty {
        /// Playlist title as reported by the downloader
        title: String,
    },
}

/// Failures of a single download job
#[derive(Debug, Error)]
pub enum JobError {
    /// Output directory could not be created; no process was launched
    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying filesystem error
        #[source]
        source: std::io::Error,
    },

    /// The downloader process could not be started
    #[error("failed to start {tool}: {source}")]
    Launch {
        /// Binary that was invoked
        tool: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// A standard stream of the child was not captured
    #[error("{0} pipe unavailable")]
    Pipe(&'static str),

    /// Reading the child's output failed
    #[error("failed to read downloader output: {0}")]
    Read(#[source] std::io::Error),

    /// The downloader exited unsuccessfully
    #[error("{tool} error: {status}{}", stderr_suffix(.stderr))]
    Exit {
        /// Binary that was invoked
        tool: String,
        /// Exit status as reported by the OS
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The runner task panicked before reporting an outcome
    #[error("download task aborted: {0}")]
    Panicked(String),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n\n{trimmed}")
    }
}
