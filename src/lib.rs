//! # mldy
//!
//! Sequential media download queue built around an external downloader (yt-dlp).
//!
//! ## Design
//!
//! - **Strictly single-flight** - at most one download runs at any time
//! - **Playlist aware** - playlist URLs expand into one queue entry per item
//! - **Event-driven** - consumers subscribe to events, no polling required
//! - **Single owner** - one control loop owns every entry; background work reports
//!   back through messages
//!
//! ## Quick Start
//!
//! ```no_run
//! use mldy::{Config, MediaDownloader, StartOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let downloader = MediaDownloader::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     downloader.submit("https://www.youtube.com/playlist?list=PL123").await?;
//!     if let StartOutcome::Resolving { pending } = downloader.start().await? {
//!         println!("{pending} URL(s) still resolving");
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Orchestrator (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Playlist resolution
pub mod resolver;
/// Download job execution
pub mod runner;
/// Entry store
pub mod store;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{AudioQuality, Config, EntryConfig, OutputKind, ToolsConfig, VideoQuality};
pub use downloader::MediaDownloader;
pub use error::{DownloadError, Error, JobError, ResolveError, Result};
pub use resolver::{CliPlaylistResolver, PlaylistResolver, Resolution};
pub use runner::{CliJobRunner, JobRequest, JobRunner, ProgressSink};
pub use store::EntryStore;
pub use types::{
    DownloadEntry, EntryId, Event, PlaylistItem, PlaylistMeta, QueueStats, StartOutcome, Status,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method,
/// which lets the running download finish before returning.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use mldy::{Config, MediaDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = MediaDownloader::new(Config::default()).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MediaDownloader) -> Result<()> {
    shutdown_on(downloader, wait_for_signal()).await
}

/// Gracefully shut the downloader down once `trigger` completes
///
/// [`run_with_shutdown`] is this function with [`wait_for_signal`] as the trigger.
pub async fn shutdown_on(
    downloader: MediaDownloader,
    trigger: impl std::future::Future<Output = ()>,
) -> Result<()> {
    trigger.await;
    downloader.shutdown().await
}

/// Wait for SIGTERM/SIGINT (Ctrl+C on non-unix platforms)
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Wait for SIGTERM/SIGINT (Ctrl+C on non-unix platforms)
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
