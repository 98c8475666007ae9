//! Fake downloader binary for driving the CLI backends

use mldy::{Config, ToolsConfig};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

/// Shell script standing in for yt-dlp
///
/// Every invocation records its arguments (one per line) in `args.log` next to the
/// script. Behavior is selected by the URL, which is always the last argument:
/// - metadata mode (`-J`): URLs containing `playlist` yield a playlist named
///   "My Mix" with one full URL, one bare id and one unusable entry; `fail` exits 1;
///   anything else is a single video
/// - download mode: `fail` exits 1 with stderr; `exact` prints the canonical
///   destination/extract/progress sequence; `relative` announces a relative path;
///   anything else downloads `a.mp3` into the output folder
const FAKE_YT_DLP: &str = r#"#!/bin/sh
log="$(dirname "$0")/args.log"
: > "$log"
for arg in "$@"; do printf '%s\n' "$arg" >> "$log"; done
for last; do :; done

case " $* " in
*" -J "*)
    case "$last" in
    *fail*)
        echo "ERROR: Unsupported URL: $last" >&2
        exit 1
        ;;
    *playlist*)
        echo '{"_type":"playlist","title":"My Mix","entries":[{"url":"https://www.youtube.com/watch?v=a","title":"A","id":"a"},{"url":"b","title":"B","id":"b"},{"title":"Gone"}]}'
        ;;
    *)
        printf '{"_type":"video","title":"Single","webpage_url":"%s"}\n' "$last"
        ;;
    esac
    exit 0
    ;;
esac

out=""
prev=""
for arg in "$@"; do
    if [ "$prev" = "-o" ]; then out="$arg"; fi
    prev="$arg"
done
dir="$(dirname "$out")"

case "$last" in
*fail*)
    echo "[youtube] fail: Downloading webpage"
    echo "ERROR: Video unavailable" >&2
    exit 1
    ;;
*exact*)
    echo "[download] Destination: /tmp/a.webm"
    echo "[ExtractAudio] Destination: /tmp/a.mp3"
    echo "50.0%"
    ;;
*relative*)
    echo "[download] Destination: rel/b.mp4"
    echo "[download] 100% of 1.00MiB"
    ;;
*)
    echo "[download] Destination: $dir/a.webm"
    echo "[download]  25.0% of 1.00MiB at 1.00MiB/s ETA 00:01"
    echo "[download] 100% of 1.00MiB in 00:01"
    echo "[ExtractAudio] Destination: $dir/a.mp3"
    : > "$dir/a.mp3"
    ;;
esac
exit 0
"#;

/// A fake downloader installed in its own temporary directory
pub struct FakeDownloader {
    dir: TempDir,
    /// Path of the executable script
    pub path: PathBuf,
}

impl FakeDownloader {
    /// Write the script as `yt-dlp` into a fresh temporary directory
    pub fn install() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yt-dlp");
        std::fs::write(&path, FAKE_YT_DLP).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir, path }
    }

    /// Arguments of the most recent invocation
    pub fn recorded_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("args.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Output folder inside the temporary directory (not created up front)
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("downloads")
    }

    /// Configuration pointing at the script and the output folder
    pub fn config(&self) -> Config {
        Config {
            output_folder: self.output_dir(),
            tools: ToolsConfig {
                downloader_path: Some(self.path.clone()),
                search_path: false,
                js_runtime: None,
            },
            ..Default::default()
        }
    }
}
