//! Playlist resolver backed by the external downloader

use super::parser::parse_metadata;
use super::{PlaylistResolver, Resolution};
use crate::config::ToolsConfig;
use crate::error::{ResolveError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Resolver that runs the downloader in flat metadata mode (`--flat-playlist -J`)
///
/// # Examples
///
/// ```no_run
/// use mldy::resolver::{CliPlaylistResolver, PlaylistResolver};
/// use std::path::PathBuf;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = CliPlaylistResolver::new(PathBuf::from("/usr/bin/yt-dlp"), None);
/// let resolution = resolver.resolve("https://www.youtube.com/playlist?list=PL123").await?;
/// println!("{} items", resolution.items.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CliPlaylistResolver {
    binary_path: PathBuf,
    js_runtime: Option<String>,
}

impl CliPlaylistResolver {
    /// Create a resolver with an explicit binary path and optional scripting runtime
    pub fn new(binary_path: PathBuf, js_runtime: Option<String>) -> Self {
        Self {
            binary_path,
            js_runtime,
        }
    }

    /// Create a resolver using the configured or discovered downloader binary
    pub fn from_config(tools: &ToolsConfig) -> Result<Self> {
        Ok(Self::new(tools.locate_downloader()?, tools.js_runtime.clone()))
    }

    /// Arguments for a metadata-only invocation
    pub fn metadata_args(&self, url: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(6);
        if let Some(rt) = &self.js_runtime {
            args.push("--js-runtimes".to_string());
            args.push(rt.clone());
        }
        args.extend(
            ["--flat-playlist", "--no-warnings", "-J", url]
                .iter()
                .map(|s| s.to_string()),
        );
        args
    }

    fn tool_name(&self) -> String {
        self.binary_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.binary_path.display().to_string())
    }
}

#[async_trait]
impl PlaylistResolver for CliPlaylistResolver {
    async fn resolve(&self, url: &str) -> std::result::Result<Resolution, ResolveError> {
        let output = Command::new(&self.binary_path)
            .args(self.metadata_args(url))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ResolveError::Launch {
                tool: self.tool_name(),
                source,
            })?;

        if !output.status.success() {
            return Err(ResolveError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        parse_metadata(&output.stdout)?.into_resolution(url)
    }

    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }
}
