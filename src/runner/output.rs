//! Parsing of the downloader's line-oriented standard output

use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::ProgressSink;

/// Incremental parser for downloader stdout
///
/// Tracks the most recently announced output path and extracts progress percentages.
#[derive(Debug)]
pub struct OutputParser {
    progress_re: Option<Regex>,
    destination_re: Option<Regex>,
    merger_re: Option<Regex>,
    already_re: Option<Regex>,
    output_path: Option<PathBuf>,
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputParser {
    /// Create a parser with no announced path
    pub fn new() -> Self {
        Self {
            progress_re: Regex::new(r"(\d+\.?\d*)%").ok(),
            destination_re: Regex::new(r"\[(?:download|ExtractAudio)\] Destination:\s*(.+)").ok(),
            merger_re: Regex::new(r#"\[Merger\] Merging formats into "(.+)""#).ok(),
            already_re: Regex::new(r"\[download\] (.+) has already been downloaded").ok(),
            output_path: None,
        }
    }

    /// Consume one line, returning the progress percentage it carries, if any
    ///
    /// Path announcement lines update the output path and never count as progress.
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        if let Some(path) = self.announced_path(line) {
            self.output_path = Some(PathBuf::from(path));
            return None;
        }

        let caps = self.progress_re.as_ref()?.captures(line)?;
        caps.get(1)?.as_str().parse::<f64>().ok()
    }

    fn announced_path(&self, line: &str) -> Option<String> {
        [&self.destination_re, &self.merger_re, &self.already_re]
            .into_iter()
            .flatten()
            .find_map(|re| re.captures(line))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|p| !p.is_empty())
    }

    /// Most recently announced output path
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// Display title derived from the output file name
    pub fn display_title(&self) -> Option<String> {
        self.output_path
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
    }

    /// Consume the parser, returning the final output path
    pub fn into_output_path(self) -> Option<PathBuf> {
        self.output_path
    }
}

/// Read `reader` to the end, reporting every progress line to `sink`
///
/// Returns the last announced output path. Invalid UTF-8 is replaced rather than
/// treated as an error.
pub async fn stream_output<R>(mut reader: R, sink: &ProgressSink) -> std::io::Result<Option<PathBuf>>
where
    R: AsyncBufRead + Unpin,
{
    let mut parser = OutputParser::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);

        if let Some(percent) = parser.feed(line) {
            sink.report(percent, parser.display_title());
        }
    }

    Ok(parser.into_output_path())
}
