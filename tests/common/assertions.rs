//! Event and state helpers for integration tests

use mldy::{Event, MediaDownloader, QueueStats};
use std::time::Duration;
use tokio::sync::broadcast;

/// Default timeout for waiting on the control loop
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Collect events until (and including) the first one matching `pred`
///
/// Panics on timeout or when the channel closes first.
pub async fn collect_events_until(
    events: &mut broadcast::Receiver<Event>,
    pred: impl Fn(&Event) -> bool,
) -> Vec<Event> {
    let mut seen = Vec::new();
    tokio::time::timeout(TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let done = pred(&event);
                    seen.push(event);
                    if done {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event");
    seen
}

/// Poll statistics until no resolution is in flight
pub async fn wait_until_resolved(downloader: &MediaDownloader) -> QueueStats {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            let stats = downloader.stats().await.unwrap();
            if stats.resolving == 0 {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for resolutions")
}
