//! Downloader argument construction
//!
//! Pure functions of the merged configuration.

use crate::config::{Config, OutputKind};

/// Output file name template appended to the output folder
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Scripting runtime selector flags shared by download invocations
pub fn runtime_args(js_runtime: Option<&str>) -> Vec<String> {
    let Some(rt) = js_runtime.filter(|rt| !rt.is_empty()) else {
        return Vec::new();
    };
    let components = match rt {
        "deno" | "bun" => "ejs:npm",
        _ => "ejs:github",
    };
    vec![
        "--js-runtimes".to_string(),
        rt.to_string(),
        "--remote-components".to_string(),
        components.to_string(),
    ]
}

/// Full argument list for downloading `url` with `config`
pub fn download_args(config: &Config, url: &str) -> Vec<String> {
    let mut args = vec!["--newline".to_string(), "--progress".to_string()];
    args.extend(runtime_args(config.tools.js_runtime.as_deref()));

    args.push("--no-playlist".to_string());
    args.push("-o".to_string());
    args.push(
        config
            .output_folder
            .join(OUTPUT_TEMPLATE)
            .to_string_lossy()
            .into_owned(),
    );

    match config.effective_kind() {
        OutputKind::Audio => {
            args.push("-x".to_string());
            args.push("--audio-format".to_string());
            args.push(config.format.clone());
            args.push("--audio-quality".to_string());
            args.push(config.audio_quality.as_str().to_string());
        }
        OutputKind::Video | OutputKind::Auto => {
            args.push("-f".to_string());
            args.push(match config.video_quality.max_height() {
                Some(height) => format!("bestvideo[height<={height}]+bestaudio"),
                None => "bestvideo+bestaudio".to_string(),
            });
            if !config.format.is_empty() && config.format != "best" {
                args.push("--merge-output-format".to_string());
                args.push(config.format.clone());
            }
        }
    }

    args.push(url.to_string());
    args
}
