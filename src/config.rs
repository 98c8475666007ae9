//! Configuration types for mldy
//!
//! [`Config`] is the process-wide configuration. [`EntryConfig`] is the per-entry
//! override with every field optional; [`Config::merge_with`] overlays it field by field.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the directory holding the config file and default downloads
const APP_DIR: &str = "mldy";

/// Config file name inside the platform config directory
const CONFIG_FILE: &str = "config.toml";

/// Downloader binary searched for in PATH
pub const DOWNLOADER_BINARY: &str = "yt-dlp";

/// Target formats that imply audio extraction when the kind is `auto`
pub const AUDIO_FORMATS: &[&str] = &["mp3", "m4a", "opus", "flac", "wav", "aac"];

/// What kind of media to produce
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Extract audio only
    Audio,
    /// Download video (merged with best audio)
    Video,
    /// Infer from the target format
    #[default]
    Auto,
}

impl OutputKind {
    /// Resolve `Auto` against a target format; `Audio` and `Video` are returned unchanged
    pub fn resolve(self, format: &str) -> OutputKind {
        match self {
            OutputKind::Auto => {
                if AUDIO_FORMATS.contains(&format.to_ascii_lowercase().as_str()) {
                    OutputKind::Audio
                } else {
                    OutputKind::Video
                }
            }
            kind => kind,
        }
    }
}

impl std::str::FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "audio" => Ok(OutputKind::Audio),
            "video" => Ok(OutputKind::Video),
            "auto" => Ok(OutputKind::Auto),
            other => Err(format!("unknown kind {other:?} (expected audio, video or auto)")),
        }
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutputKind::Audio => "audio",
            OutputKind::Video => "video",
            OutputKind::Auto => "auto",
        })
    }
}

/// Audio quality: a VBR level `0`-`10` or a CBR bitrate such as `192K`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioQuality(pub String);

impl AudioQuality {
    /// Whether the value is a VBR level in `0..=10` or a `<digits>K` bitrate
    pub fn is_valid(&self) -> bool {
        let q = self.0.as_str();
        if let Some(rate) = q.strip_suffix(['K', 'k']) {
            return !rate.is_empty() && rate.bytes().all(|b| b.is_ascii_digit());
        }
        !q.is_empty() && q.bytes().all(|b| b.is_ascii_digit()) && q.parse::<u32>().is_ok_and(|n| n <= 10)
    }

    /// The raw value passed to the downloader
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AudioQuality {
    fn default() -> Self {
        Self("5".to_string())
    }
}

impl From<&str> for AudioQuality {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Video quality: `best` or a height cap such as `720p`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoQuality(pub String);

impl VideoQuality {
    /// Height cap in pixels, or `None` for `best`
    pub fn max_height(&self) -> Option<u32> {
        let q = self.0.trim();
        if q.eq_ignore_ascii_case("best") {
            return None;
        }
        q.strip_suffix(['p', 'P']).unwrap_or(q).parse().ok()
    }

    /// Whether the value is `best` or a parsable height
    pub fn is_valid(&self) -> bool {
        self.0.trim().eq_ignore_ascii_case("best") || self.max_height().is_some()
    }
}

impl Default for VideoQuality {
    fn default() -> Self {
        Self("best".to_string())
    }
}

impl From<&str> for VideoQuality {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// External tool settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the downloader executable (searched in PATH if None)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloader_path: Option<PathBuf>,

    /// Whether to search PATH for the downloader if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Scripting runtime the downloader should use (deno, bun, node)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_runtime: Option<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            downloader_path: None,
            search_path: true,
            js_runtime: None,
        }
    }
}

impl ToolsConfig {
    /// Locate the downloader binary
    ///
    /// An explicit `downloader_path` wins; otherwise PATH is searched for `yt-dlp` when
    /// `search_path` is enabled.
    pub fn locate_downloader(&self) -> Result<PathBuf> {
        if let Some(path) = &self.downloader_path {
            if path.is_file() {
                return Ok(path.clone());
            }
            // A bare program name is looked up in PATH
            if path.components().count() == 1
                && let Ok(found) = which::which(path)
            {
                return Ok(found);
            }
            return Err(Error::ToolNotFound(format!(
                "configured downloader {} does not exist",
                path.display()
            )));
        }
        if self.search_path {
            if let Ok(path) = which::which(DOWNLOADER_BINARY) {
                return Ok(path);
            }
            return Err(Error::ToolNotFound(format!("{DOWNLOADER_BINARY} not found in PATH")));
        }
        Err(Error::ToolNotFound(format!(
            "{DOWNLOADER_BINARY}: no downloader_path configured and PATH search disabled"
        )))
    }
}

/// Process-wide configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Output kind (default: auto); an unknown value falls back to auto
    #[serde(default, deserialize_with = "lenient_kind")]
    pub kind: OutputKind,

    /// Target format, e.g. "mp3" or "mp4" (default: "mp3")
    #[serde(default = "default_format")]
    pub format: String,

    /// Audio quality (default: "5")
    #[serde(default)]
    pub audio_quality: AudioQuality,

    /// Video quality (default: "best")
    #[serde(default)]
    pub video_quality: VideoQuality,

    /// Directory receiving downloaded files
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,

    /// External tool settings
    #[serde(flatten)]
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kind: OutputKind::default(),
            format: default_format(),
            audio_quality: AudioQuality::default(),
            video_quality: VideoQuality::default(),
            output_folder: default_output_folder(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Per-entry override of [`Config`]; unset fields fall back to the global value
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryConfig {
    /// Output kind override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<OutputKind>,

    /// Format override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Audio quality override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_quality: Option<AudioQuality>,

    /// Video quality override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_quality: Option<VideoQuality>,

    /// Output folder override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_folder: Option<PathBuf>,
}

impl EntryConfig {
    /// Whether no field is overridden
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl Config {
    /// Overlay a per-entry override; each set field wins over the global value
    pub fn merge_with(&self, entry: &EntryConfig) -> Config {
        let mut merged = self.clone();
        if let Some(kind) = entry.kind {
            merged.kind = kind;
        }
        if let Some(format) = &entry.format {
            merged.format = format.clone();
        }
        if let Some(quality) = &entry.audio_quality {
            merged.audio_quality = quality.clone();
        }
        if let Some(quality) = &entry.video_quality {
            merged.video_quality = quality.clone();
        }
        if let Some(folder) = &entry.output_folder {
            merged.output_folder = folder.clone();
        }
        merged
    }

    /// Effective media kind with `auto` resolved against the format
    pub fn effective_kind(&self) -> OutputKind {
        self.kind.resolve(&self.format)
    }

    /// Default config file location (`<config dir>/mldy/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load the config from the default location, see [`Config::load_from`]
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::warn!("No config directory available, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load the config from `path`
    ///
    /// A missing file is created with defaults. A file that cannot be parsed yields
    /// defaults (with a warning) rather than an error, and invalid quality values are
    /// replaced by their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save_to(path)?;
                tracing::info!(path = %path.display(), "Created default config file");
                return Ok(config);
            }
            Err(e) => return Err(e.into()),
        };

        match toml::from_str::<Config>(&text) {
            Ok(config) => Ok(config.sanitized()),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        if !self.audio_quality.is_valid() {
            tracing::warn!(value = %self.audio_quality, "Invalid audio_quality, falling back to default");
            self.audio_quality = AudioQuality::default();
        }
        if !self.video_quality.is_valid() {
            tracing::warn!(value = %self.video_quality, "Invalid video_quality, falling back to default");
            self.video_quality = VideoQuality::default();
        }
        self
    }
}

fn lenient_kind<'de, D>(deserializer: D) -> std::result::Result<OutputKind, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.parse().unwrap_or_else(|e: String| {
        tracing::warn!(value = %raw, error = %e, "Invalid kind, falling back to auto");
        OutputKind::Auto
    }))
}

// Default value functions
fn default_format() -> String {
    "mp3".to_string()
}

fn default_output_folder() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("Downloads").join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("downloads"))
}

fn default_true() -> bool {
    true
}
