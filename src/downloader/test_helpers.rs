//! Shared test helpers: scripted resolver and runner doubles.

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::error::{JobError, ResolveError};
use crate::resolver::{PlaylistResolver, Resolution};
use crate::runner::{JobRequest, JobRunner, ProgressSink};
use crate::types::{Event, PlaylistItem, QueueStats};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Upper bound for any wait in orchestrator tests
pub(crate) const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Scripted outcome of one resolution
pub(crate) enum Script {
    /// Playlist with `n` items titled "Track 1".."Track n"
    Playlist(String, usize),
    /// Resolution fails with the given stderr
    Fail(String),
    /// Resolution waits until the sender fires
    Pending(oneshot::Receiver<Resolution>),
}

/// Resolver answering from a script; unscripted URLs resolve to a single item
#[derive(Default)]
pub(crate) struct ScriptedResolver {
    scripts: Mutex<HashMap<String, Script>>,
}

impl ScriptedResolver {
    pub(crate) fn script(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
    }
}

#[async_trait]
impl PlaylistResolver for ScriptedResolver {
    async fn resolve(&self, url: &str) -> Result<Resolution, ResolveError> {
        let script = self.scripts.lock().unwrap().remove(url);
        match script {
            None => Ok(Resolution {
                playlist_title: None,
                items: vec![PlaylistItem {
                    url: url.to_string(),
                    title: String::new(),
                }],
            }),
            Some(Script::Playlist(title, n)) => Ok(Resolution {
                playlist_title: Some(title),
                items: (1..=n)
                    .map(|i| PlaylistItem {
                        url: format!("https://www.youtube.com/watch?v=track{i}"),
                        title: format!("Track {i}"),
                    })
                    .collect(),
            }),
            Some(Script::Fail(stderr)) => Err(ResolveError::Exit {
                status: "exit status: 1".to_string(),
                stderr,
            }),
            Some(Script::Pending(rx)) => rx.await.map_err(|_| ResolveError::Empty {
                title: "cancelled".to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A job handed to the test by [`ScriptedRunner`]
pub(crate) struct RunningJob {
    pub(crate) request: JobRequest,
    pub(crate) progress: ProgressSink,
    pub(crate) finish: oneshot::Sender<Result<Option<PathBuf>, JobError>>,
}

impl RunningJob {
    /// Complete the job successfully with `path`
    pub(crate) fn succeed(self, path: &str) {
        let _ = self.finish.send(Ok(Some(PathBuf::from(path))));
    }

    /// Fail the job with a non-zero exit
    pub(crate) fn fail(self, stderr: &str) {
        let _ = self.finish.send(Err(JobError::Exit {
            tool: "yt-dlp".to_string(),
            status: "exit status: 1".to_string(),
            stderr: stderr.to_string(),
        }));
    }
}

/// Runner that hands every job to the test and waits for its verdict
pub(crate) struct ScriptedRunner {
    jobs: mpsc::UnboundedSender<RunningJob>,
    running: AtomicUsize,
    pub(crate) max_concurrent: AtomicUsize,
    pub(crate) launched: AtomicUsize,
}

#[async_trait]
impl JobRunner for ScriptedRunner {
    async fn run(
        &self,
        request: JobRequest,
        progress: ProgressSink,
    ) -> Result<Option<PathBuf>, JobError> {
        self.launched.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);

        let (finish, verdict) = oneshot::channel();
        let _ = self.jobs.send(RunningJob {
            request,
            progress,
            finish,
        });
        let result = verdict
            .await
            .unwrap_or_else(|_| Err(JobError::Panicked("test dropped job".to_string())));

        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Test harness around a downloader wired to scripted doubles
pub(crate) struct Harness {
    pub(crate) downloader: MediaDownloader,
    pub(crate) resolver: Arc<ScriptedResolver>,
    pub(crate) runner: Arc<ScriptedRunner>,
    pub(crate) jobs: mpsc::UnboundedReceiver<RunningJob>,
    pub(crate) events: broadcast::Receiver<Event>,
}

/// Helper to create a downloader with scripted resolver and runner
pub(crate) async fn create_test_downloader() -> Harness {
    let (jobs_tx, jobs) = mpsc::unbounded_channel();
    let resolver = Arc::new(ScriptedResolver::default());
    let runner = Arc::new(ScriptedRunner {
        jobs: jobs_tx,
        running: AtomicUsize::new(0),
        max_concurrent: AtomicUsize::new(0),
        launched: AtomicUsize::new(0),
    });

    let config = Config {
        output_folder: PathBuf::from("/tmp/mldy-test"),
        ..Default::default()
    };
    let downloader = MediaDownloader::with_backends(config, resolver.clone(), runner.clone()).await;
    let events = downloader.subscribe();

    Harness {
        downloader,
        resolver,
        runner,
        jobs,
        events,
    }
}

impl Harness {
    /// Submit URLs and wait until every resolution has been applied
    pub(crate) async fn submit_all(&mut self, urls: &[&str]) {
        for url in urls {
            self.downloader.submit(*url).await.unwrap();
        }
        self.wait_for_stats(|s| s.resolving == 0).await;
    }

    /// Poll queue statistics until `pred` holds
    pub(crate) async fn wait_for_stats(&self, pred: impl Fn(&QueueStats) -> bool) -> QueueStats {
        tokio::time::timeout(TEST_TIMEOUT, async {
            loop {
                let stats = self.downloader.stats().await.unwrap();
                if pred(&stats) {
                    return stats;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for queue state")
    }

    /// Next job handed to the runner
    pub(crate) async fn next_job(&mut self) -> RunningJob {
        tokio::time::timeout(TEST_TIMEOUT, self.jobs.recv())
            .await
            .expect("timed out waiting for a job")
            .expect("runner dropped")
    }

    /// Receive events until one matches `pred`
    pub(crate) async fn wait_for_event(&mut self, pred: impl Fn(&Event) -> bool) -> Event {
        tokio::time::timeout(TEST_TIMEOUT, async {
            loop {
                let event = self.events.recv().await.expect("event channel closed");
                if pred(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }
}
