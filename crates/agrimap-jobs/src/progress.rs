//! Per-job progress broadcast channels.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;
use uuid::Uuid;

use agrimap_core::{defaults, JobEvent};

/// Keyed broadcast channels carrying live progress for running jobs.
///
/// Subscribing opens a fresh channel for the job, replacing any prior one.
/// Publishing without an open channel is a silent no-op, and there is no
/// replay: a subscriber only sees events produced after it attaches.
/// Closing a channel never cancels the worker producing into it.
#[derive(Default)]
pub struct ProgressChannels {
    channels: RwLock<HashMap<Uuid, broadcast::Sender<JobEvent>>>,
}

impl ProgressChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh channel for the job, overwriting any prior entry.
    pub fn subscribe(&self, job_id: Uuid) -> broadcast::Receiver<JobEvent> {
        let (tx, rx) = broadcast::channel(defaults::PROGRESS_CHANNEL_CAPACITY);
        if let Ok(mut channels) = self.channels.write() {
            channels.insert(job_id, tx);
        }
        rx
    }

    /// Send an event to the job's channel, if one is open.
    pub fn publish(&self, job_id: Uuid, event: JobEvent) {
        if let Ok(channels) = self.channels.read() {
            if let Some(tx) = channels.get(&job_id) {
                // A send error only means every subscriber is gone.
                let _ = tx.send(event);
            }
        }
    }

    /// Drop the job's channel, ending any subscriber streams.
    pub fn close(&self, job_id: Uuid) {
        if let Ok(mut channels) = self.channels.write() {
            channels.remove(&job_id);
        }
    }

    /// Number of currently open channels.
    pub fn open_count(&self) -> usize {
        self.channels.read().map(|c| c.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrimap_core::ProgressEvent;

    fn progress(step: &str) -> JobEvent {
        JobEvent::Progress(ProgressEvent::now(step, "running", "working"))
    }

    #[tokio::test]
    async fn test_subscribe_then_publish_delivers() {
        let channels = ProgressChannels::new();
        let job_id = Uuid::new_v4();

        let mut rx = channels.subscribe(job_id);
        channels.publish(job_id, progress("detect"));

        match rx.recv().await.unwrap() {
            JobEvent::Progress(event) => assert_eq!(event.step, "detect"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscriber_is_noop() {
        let channels = ProgressChannels::new();
        channels.publish(Uuid::new_v4(), progress("detect"));
        assert_eq!(channels.open_count(), 0);
    }

    #[tokio::test]
    async fn test_resubscribe_replaces_channel() {
        let channels = ProgressChannels::new();
        let job_id = Uuid::new_v4();

        let mut first = channels.subscribe(job_id);
        let mut second = channels.subscribe(job_id);
        assert_eq!(channels.open_count(), 1);

        channels.publish(job_id, progress("detect"));

        // The replaced channel's sender is gone; only the new one delivers.
        assert!(first.recv().await.is_err());
        assert!(second.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_close_ends_subscriber_stream() {
        let channels = ProgressChannels::new();
        let job_id = Uuid::new_v4();

        let mut rx = channels.subscribe(job_id);
        channels.close(job_id);

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert_eq!(channels.open_count(), 0);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let channels = ProgressChannels::new();
        let job_id = Uuid::new_v4();

        channels.publish(job_id, progress("preprocess"));
        let mut rx = channels.subscribe(job_id);
        channels.publish(job_id, progress("detect"));

        match rx.recv().await.unwrap() {
            JobEvent::Progress(event) => assert_eq!(event.step, "detect"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
