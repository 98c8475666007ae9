//! Decoding of the downloader's `-J` metadata document

use serde::Deserialize;

use super::Resolution;
use crate::error::ResolveError;
use crate::types::PlaylistItem;

/// Watch URL template for flat-playlist entries that only carry an identifier
const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(rename = "_type", default)]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    entries: Option<Vec<RawEntry>>,
    #[serde(default)]
    webpage_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

/// One flat-playlist entry as reported by the downloader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    /// Entry URL (may be a bare identifier or missing)
    pub url: Option<String>,
    /// Entry title
    pub title: String,
    /// Site-specific identifier
    pub id: Option<String>,
}

/// Decoded metadata response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataResponse {
    /// A single item
    Single {
        /// Canonical page URL, when reported
        url: Option<String>,
        /// Item title
        title: String,
    },
    /// A multi-item playlist
    Playlist {
        /// Playlist title
        title: String,
        /// Entries in playlist order
        entries: Vec<PlaylistEntry>,
    },
}

/// Parse the JSON document printed by `--flat-playlist -J`
pub fn parse_metadata(stdout: &[u8]) -> Result<MetadataResponse, ResolveError> {
    let raw: RawMetadata = serde_json::from_slice(stdout)?;
    let title = raw.title.unwrap_or_default();

    if raw.kind.as_deref() != Some("playlist") {
        return Ok(MetadataResponse::Single {
            url: raw.webpage_url.filter(|u| !u.is_empty()),
            title,
        });
    }

    let entries = raw
        .entries
        .unwrap_or_default()
        .into_iter()
        .map(|e| PlaylistEntry {
            url: e.url.filter(|u| !u.is_empty()),
            title: e.title.unwrap_or_default(),
            id: e.id.filter(|id| !id.is_empty()),
        })
        .collect();

    Ok(MetadataResponse::Playlist { title, entries })
}

/// Canonical URL for a playlist entry
///
/// Absolute http(s) URLs are kept; otherwise the identifier is substituted into the
/// watch URL template. Returns `None` when neither is usable.
pub fn canonical_item_url(entry: &PlaylistEntry) -> Option<String> {
    if let Some(raw) = entry.url.as_deref()
        && is_http_url(raw)
    {
        return Some(raw.to_string());
    }
    entry.id.as_deref().map(|id| format!("{WATCH_URL_PREFIX}{id}"))
}

fn is_http_url(raw: &str) -> bool {
    url::Url::parse(raw).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

impl MetadataResponse {
    /// Normalize into the ordered item list for `original_url`
    ///
    /// A single item falls back to `original_url` when no page URL was reported.
    /// Playlist entries without a usable URL are skipped; a playlist left with no items
    /// is an error.
    pub fn into_resolution(self, original_url: &str) -> Result<Resolution, ResolveError> {
        match self {
            MetadataResponse::Single { url, title } => Ok(Resolution {
                playlist_title: None,
                items: vec![PlaylistItem {
                    url: url.unwrap_or_else(|| original_url.to_string()),
                    title,
                }],
            }),
            MetadataResponse::Playlist { title, entries } => {
                let items: Vec<PlaylistItem> = entries
                    .into_iter()
                    .filter_map(|entry| match canonical_item_url(&entry) {
                        Some(url) => Some(PlaylistItem {
                            url,
                            title: entry.title,
                        }),
                        None => {
                            tracing::warn!(
                                playlist = %title,
                                item_title = %entry.title,
                                "Skipping playlist entry without URL or id"
                            );
                            None
                        }
                    })
                    .collect();

                if items.is_empty() {
                    return Err(ResolveError::Empty { title });
                }
                Ok(Resolution {
                    playlist_title: Some(title),
                    items,
                })
            }
        }
    }
}
