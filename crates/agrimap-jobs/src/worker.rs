//! Fixed-size worker pool executing analysis jobs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use agrimap_analysis::{AnalysisBackend, AnalysisRequest};
use agrimap_core::{defaults, JobEvent, MapType, ProgressEvent, StagedResult};

use crate::progress::ProgressChannels;
use crate::store::JobStore;

/// Configuration for the analysis worker pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of workers; each runs one job at a time.
    pub workers: usize,
    /// Whether to process jobs at all.
    pub enabled: bool,
    /// Hard per-job timeout in seconds.
    pub job_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: defaults::ANALYSIS_WORKERS,
            enabled: true,
            job_timeout_secs: defaults::ANALYSIS_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `ANALYSIS_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `ANALYSIS_WORKERS` | `2` | Worker pool size |
    pub fn from_env() -> Self {
        let enabled = std::env::var(defaults::ENV_ANALYSIS_WORKER_ENABLED)
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let workers = std::env::var(defaults::ENV_ANALYSIS_WORKERS)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::ANALYSIS_WORKERS)
            .max(1);

        Self {
            workers,
            enabled,
            job_timeout_secs: defaults::ANALYSIS_TIMEOUT_SECS,
        }
    }

    /// Set the worker pool size (minimum 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the hard per-job timeout.
    pub fn with_job_timeout(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }
}

/// A submitted analysis job awaiting a worker.
#[derive(Debug)]
pub struct AnalysisTask {
    pub job_id: Uuid,
    pub image: Vec<u8>,
    pub province: String,
    pub district: Option<String>,
    pub map_type: MapType,
    pub submitted_at: DateTime<Utc>,
}

/// Handle for submitting tasks to a running pool.
#[derive(Clone)]
pub struct PoolHandle {
    task_tx: mpsc::UnboundedSender<AnalysisTask>,
}

impl PoolHandle {
    /// Enqueue a task, fire-and-forget. Never blocks on the analysis.
    pub fn submit(&self, task: AnalysisTask) -> agrimap_core::Result<()> {
        self.task_tx
            .send(task)
            .map_err(|_| agrimap_core::Error::Internal("Worker pool is not running".to_string()))
    }
}

/// Fixed-size pool of background workers running analysis jobs to
/// completion.
///
/// Each worker pulls one task at a time from the shared queue, invokes the
/// analysis backend with a progress callback wired to the job's broadcast
/// channel, and writes exactly one staged result regardless of how the
/// backend finished. There is no cancellation path: a subscriber
/// disconnecting has no effect on the running job.
pub struct WorkerPool {
    backend: Arc<dyn AnalysisBackend>,
    store: Arc<dyn JobStore>,
    channels: Arc<ProgressChannels>,
    config: PoolConfig,
}

impl WorkerPool {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        store: Arc<dyn JobStore>,
        channels: Arc<ProgressChannels>,
        config: PoolConfig,
    ) -> Self {
        Self {
            backend,
            store,
            channels,
            config,
        }
    }

    /// Spawn the worker loops and return the submission handle.
    ///
    /// With the pool disabled the receiver is dropped immediately and
    /// every submission fails fast instead of queueing forever.
    pub fn start(self) -> PoolHandle {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let handle = PoolHandle { task_tx };

        if !self.config.enabled {
            info!("Analysis worker pool is disabled, not starting");
            return handle;
        }

        info!(workers = self.config.workers, "Analysis worker pool started");

        let shared_rx = Arc::new(Mutex::new(task_rx));
        let pool = Arc::new(self);

        for worker_id in 0..pool.config.workers.max(1) {
            let pool = pool.clone();
            let shared_rx = shared_rx.clone();

            tokio::spawn(async move {
                debug!(worker_id, "Analysis worker started");
                loop {
                    // Hold the queue lock only while waiting for a task,
                    // never while running one.
                    let task = {
                        let mut rx = shared_rx.lock().await;
                        rx.recv().await
                    };
                    match task {
                        Some(task) => pool.clone().run_guarded(task).await,
                        None => break,
                    }
                }
                debug!(worker_id, "Analysis worker stopped");
            });
        }

        handle
    }

    /// Run one task inside a spawned subtask so a panic cannot take the
    /// worker loop down; a panicked job still yields a failed staged
    /// result.
    async fn run_guarded(self: Arc<Self>, task: AnalysisTask) {
        let job_id = task.job_id;
        let map_type = task.map_type;
        let province = task.province.clone();
        let district = task.district.clone();

        let pool = self.clone();
        let result = tokio::spawn(async move { pool.execute(task).await }).await;

        if let Err(e) = result {
            error!(job_id = %job_id, error = ?e, "Analysis task panicked");
            let staged = StagedResult::failure(
                job_id,
                "Analysis task panicked".to_string(),
                map_type,
                province,
                district,
                Vec::new(),
            );
            self.finish(staged).await;
        }
    }

    /// Execute a single task to completion.
    async fn execute(&self, task: AnalysisTask) {
        let start = Instant::now();
        let job_id = task.job_id;

        info!(
            job_id = %job_id,
            map_type = %task.map_type,
            province = %task.province,
            queued_ms = (Utc::now() - task.submitted_at).num_milliseconds(),
            "Processing analysis job"
        );

        let logs = Arc::new(std::sync::Mutex::new(Vec::new()));
        let progress = {
            let channels = self.channels.clone();
            let logs = logs.clone();
            move |step: &str, status: &str, message: &str| {
                if let Ok(mut log) = logs.lock() {
                    log.push(format!("{}: {}", step, message));
                }
                channels.publish(
                    job_id,
                    JobEvent::Progress(ProgressEvent::now(step, status, message)),
                );
            }
        };

        let request = AnalysisRequest {
            image: task.image,
            province: task.province,
            district: task.district,
            map_type: task.map_type,
        };

        let timeout = Duration::from_secs(self.config.job_timeout_secs);
        let outcome = tokio::time::timeout(timeout, self.backend.analyze(&request, &progress)).await;

        let logs = logs.lock().map(|l| l.clone()).unwrap_or_default();
        let staged = match outcome {
            Ok(Ok(outcome)) => StagedResult::from_outcome(
                job_id,
                outcome,
                request.map_type,
                request.province,
                request.district,
                logs,
            ),
            Ok(Err(e)) => StagedResult::failure(
                job_id,
                e.to_string(),
                request.map_type,
                request.province,
                request.district,
                logs,
            ),
            Err(_) => StagedResult::failure(
                job_id,
                format!(
                    "Analysis exceeded timeout of {}s",
                    self.config.job_timeout_secs
                ),
                request.map_type,
                request.province,
                request.district,
                logs,
            ),
        };

        if staged.success {
            info!(
                job_id = %job_id,
                zone_count = staged.zones.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Analysis job completed"
            );
        } else {
            warn!(
                job_id = %job_id,
                error = staged.error.as_deref().unwrap_or("unknown"),
                duration_ms = start.elapsed().as_millis() as u64,
                "Analysis job failed"
            );
        }

        self.finish(staged).await;
    }

    /// Stage the terminal result, emit the final event, close the channel.
    async fn finish(&self, staged: StagedResult) {
        let job_id = staged.job_id;
        self.store.put(staged.clone()).await;
        self.channels
            .publish(job_id, JobEvent::Complete(Box::new(staged)));
        self.channels.close(job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.workers, 2);
        assert!(config.enabled);
        assert_eq!(config.job_timeout_secs, 900);
    }

    #[test]
    fn test_pool_config_builder() {
        let config = PoolConfig::default()
            .with_workers(4)
            .with_enabled(false)
            .with_job_timeout(30);

        assert_eq!(config.workers, 4);
        assert!(!config.enabled);
        assert_eq!(config.job_timeout_secs, 30);
    }

    #[test]
    fn test_pool_config_workers_floor_is_one() {
        let config = PoolConfig::default().with_workers(0);
        assert_eq!(config.workers, 1);
    }

    #[tokio::test]
    async fn test_disabled_pool_rejects_submissions() {
        use agrimap_analysis::MockAnalysisBackend;
        use crate::store::InMemoryJobStore;

        let pool = WorkerPool::new(
            Arc::new(MockAnalysisBackend::new()),
            Arc::new(InMemoryJobStore::new()),
            Arc::new(ProgressChannels::new()),
            PoolConfig::default().with_enabled(false),
        );
        let handle = pool.start();

        let task = AnalysisTask {
            job_id: Uuid::new_v4(),
            image: vec![1],
            province: "Cà Mau".to_string(),
            district: None,
            map_type: MapType::Soil,
            submitted_at: Utc::now(),
        };
        assert!(handle.submit(task).is_err());
    }
}
