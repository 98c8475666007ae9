//! Job runner backed by the external downloader process

use super::args::download_args;
use super::output::stream_output;
use super::{JobRequest, JobRunner, ProgressSink};
use crate::config::ToolsConfig;
use crate::error::{JobError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::Command;

/// Runner that launches the downloader once per job
///
/// Standard output is parsed line by line while standard error is collected in full
/// for the failure message.
#[derive(Debug, Clone)]
pub struct CliJobRunner {
    binary_path: PathBuf,
}

impl CliJobRunner {
    /// Create a runner with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Create a runner using the configured or discovered downloader binary
    pub fn from_config(tools: &ToolsConfig) -> Result<Self> {
        Ok(Self::new(tools.locate_downloader()?))
    }

    /// Path of the binary this runner launches
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn tool_name(&self) -> String {
        self.binary_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.binary_path.display().to_string())
    }
}

#[async_trait]
impl JobRunner for CliJobRunner {
    async fn run(
        &self,
        job: JobRequest,
        progress: ProgressSink,
    ) -> std::result::Result<Option<PathBuf>, JobError> {
        let folder = &job.config.output_folder;
        tokio::fs::create_dir_all(folder)
            .await
            .map_err(|source| JobError::OutputDir {
                path: folder.clone(),
                source,
            })?;

        let args = download_args(&job.config, &job.url);
        tracing::debug!(entry_id = job.id.0, args = ?args, "Launching downloader");

        let mut child = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| JobError::Launch {
                tool: self.tool_name(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or(JobError::Pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(JobError::Pipe("stderr"))?;

        let collect_stderr = async move {
            let mut buf = Vec::new();
            BufReader::new(stderr)
                .read_to_end(&mut buf)
                .await
                .map(|_| String::from_utf8_lossy(&buf).into_owned())
        };
        let (path, stderr_text) =
            tokio::join!(stream_output(BufReader::new(stdout), &progress), collect_stderr);

        let status = child.wait().await.map_err(JobError::Read)?;
        if !status.success() {
            return Err(JobError::Exit {
                tool: self.tool_name(),
                status: status.to_string(),
                stderr: stderr_text.unwrap_or_default(),
            });
        }

        let path = path.map_err(JobError::Read)?;
        Ok(path.map(|p| std::path::absolute(&p).unwrap_or(p)))
    }

    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }
}
