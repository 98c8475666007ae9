use clap::Parser;
use mldy::{
    AudioQuality, Config, EntryConfig, Error, Event, MediaDownloader, OutputKind, Result,
    StartOutcome, VideoQuality,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Download media URLs (single items or playlists) one at a time with yt-dlp
#[derive(Debug, Parser)]
#[command(name = "mldy", version, about)]
struct Args {
    /// URLs to download
    #[arg(required = true)]
    urls: Vec<String>,

    /// Output kind: audio, video or auto
    #[arg(short, long, value_parser = parse_kind)]
    kind: Option<OutputKind>,

    /// Target format (e.g. mp3, m4a, mp4)
    #[arg(short, long)]
    format: Option<String>,

    /// Audio quality: VBR 0-10 or a bitrate like 192K
    #[arg(long)]
    audio_quality: Option<String>,

    /// Video quality: best or a height like 720p
    #[arg(long)]
    video_quality: Option<String>,

    /// Output folder
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn overrides(&self) -> Result<EntryConfig> {
        let audio_quality = self.audio_quality.as_deref().map(AudioQuality::from);
        if let Some(q) = &audio_quality
            && !q.is_valid()
        {
            return Err(Error::Config {
                message: format!("invalid audio quality \"{q}\": expected 0-10 or a bitrate like 192K"),
                key: Some("audio_quality".to_string()),
            });
        }

        let video_quality = self.video_quality.as_deref().map(VideoQuality::from);
        if let Some(q) = &video_quality
            && !q.is_valid()
        {
            return Err(Error::Config {
                message: format!("invalid video quality \"{q}\": expected best or a height like 720p"),
                key: Some("video_quality".to_string()),
            });
        }

        Ok(EntryConfig {
            kind: self.kind,
            format: self.format.clone(),
            audio_quality,
            video_quality,
            output_folder: self.output.clone(),
        })
    }
}

fn parse_kind(s: &str) -> std::result::Result<OutputKind, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!(error = %e, "Application error");
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("mldy=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mldy=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

/// Returns whether every entry succeeded
async fn run(args: Args) -> Result<bool> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let overrides = args.overrides()?;

    let downloader = MediaDownloader::new(config).await?;
    let mut events = downloader.subscribe();

    for url in &args.urls {
        downloader.submit_with(url.as_str(), overrides.clone()).await?;
    }

    let mut pending = args.urls.len();
    let signal = mldy::wait_for_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    print_event(&event, args.json);
                    match event {
                        Event::Resolved { .. } => {
                            pending = pending.saturating_sub(1);
                            if pending == 0 && !start_queue(&downloader).await? {
                                break;
                            }
                        }
                        Event::QueueDrained | Event::Shutdown => break,
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut signal => {
                info!("Interrupted, waiting for the running download to finish");
                break;
            }
        }
    }

    let stats = downloader.stats().await?;
    downloader.shutdown().await?;
    info!(
        completed = stats.completed,
        failed = stats.failed,
        queued = stats.queued,
        "Finished"
    );
    Ok(stats.failed == 0)
}

/// Start the queue; returns false when there is nothing left to wait for
async fn start_queue(downloader: &MediaDownloader) -> Result<bool> {
    match downloader.start().await? {
        StartOutcome::Started { id } => {
            info!(entry_id = id.0, "Queue started");
            Ok(true)
        }
        StartOutcome::AlreadyRunning | StartOutcome::Resolving { .. } => Ok(true),
        StartOutcome::QueueEmpty | StartOutcome::ShuttingDown => Ok(false),
    }
}

fn print_event(event: &Event, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "Failed to encode event"),
        }
        return;
    }

    match event {
        Event::ResolutionStarted { url } => println!("resolving {url}"),
        Event::Resolved {
            url,
            playlist_title,
            items,
            error: None,
        } => match playlist_title {
            Some(title) => println!("resolved {url}: playlist {title:?} with {items} item(s)"),
            None => println!("resolved {url}"),
        },
        Event::Resolved { .. } => {}
        Event::Queued { id, url, title } => {
            let label = if title.is_empty() { url } else { title };
            println!("queued #{id} {label}");
        }
        Event::Removed { id } => println!("removed #{id}"),
        Event::Started { id, url } => println!("started #{id} {url}"),
        Event::Progress { id, percent, title } => {
            println!("#{id} {percent:5.1}% {}", title.as_deref().unwrap_or(""));
        }
        Event::Completed { id, output_path } => match output_path {
            Some(path) => println!("completed #{id} -> {}", path.display()),
            None => println!("completed #{id}"),
        },
        Event::Failed { id, error } => println!("failed #{id}: {error}"),
        Event::QueueDrained => println!("queue drained"),
        Event::Shutdown => println!("shutdown"),
    }
}
