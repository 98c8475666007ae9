//! Playlist resolution
//!
//! A [`PlaylistResolver`] expands one submitted URL into the ordered list of items to
//! download. Resolution never touches the entry store; the orchestrator consumes the
//! [`ResolvedPlaylist`] it produces.

mod cli;
mod parser;

pub use cli::CliPlaylistResolver;
pub use parser::{MetadataResponse, PlaylistEntry, canonical_item_url, parse_metadata};

use async_trait::async_trait;

use crate::config::EntryConfig;
use crate::error::ResolveError;
use crate::types::PlaylistItem;

/// Successful resolution of one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Playlist title, `None` for a single item
    pub playlist_title: Option<String>,
    /// Items in playlist order (never empty)
    pub items: Vec<PlaylistItem>,
}

/// Trait for expanding a URL into downloadable items
///
/// Implementations may be invoked concurrently for different URLs.
#[async_trait]
pub trait PlaylistResolver: Send + Sync {
    /// Resolve `url` into one or more items
    async fn resolve(&self, url: &str) -> Result<Resolution, ResolveError>;

    /// Name of this implementation, for logging
    fn name(&self) -> &'static str;
}

/// Result of resolving one submission, delivered to the control loop
///
/// On failure the submitted URL and override are still carried so the caller can
/// record a failed entry.
#[derive(Debug, Clone)]
pub struct ResolvedPlaylist {
    /// URL as submitted
    pub url: String,
    /// Playlist title, when the URL was a playlist
    pub playlist_title: Option<String>,
    /// Items in playlist order (empty on error)
    pub items: Vec<PlaylistItem>,
    /// Override supplied with the submission
    pub overrides: EntryConfig,
    /// Resolution error message
    pub error: Option<String>,
}

impl ResolvedPlaylist {
    /// Run `resolver` for one submission and fold the outcome into a result value
    pub async fn resolve(
        resolver: &dyn PlaylistResolver,
        url: String,
        overrides: EntryConfig,
    ) -> Self {
        match resolver.resolve(&url).await {
            Ok(resolution) => {
                tracing::debug!(
                    url = %url,
                    items = resolution.items.len(),
                    playlist = ?resolution.playlist_title,
                    resolver = resolver.name(),
                    "URL resolved"
                );
                Self {
                    url,
                    playlist_title: resolution.playlist_title,
                    items: resolution.items,
                    overrides,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "URL resolution failed");
                Self {
                    url,
                    playlist_title: None,
                    items: Vec::new(),
                    overrides,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
