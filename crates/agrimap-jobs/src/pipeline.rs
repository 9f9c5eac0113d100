//! Pipeline coordinator: submission, status, progress subscription,
//! confirm, and discard.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use agrimap_core::{
    convert_zone, sanitize_filename, validate_map_image, ConfirmOverrides, ConvertContext,
    CreatorResolver, Error, ImageStore, JobEvent, JobStatus, MapUpload, Result, SubmitReceipt,
    ZoneRepository,
};

use crate::progress::ProgressChannels;
use crate::store::JobStore;
use crate::worker::{AnalysisTask, PoolHandle};

/// Coordinates the analysis job lifecycle.
///
/// Owns no computation itself: validation and conversion come from
/// `agrimap-core`, execution happens on the worker pool, and the staged
/// result lives in the injected job store until confirm/discard/eviction.
pub struct AnalysisPipeline {
    store: Arc<dyn JobStore>,
    channels: Arc<ProgressChannels>,
    pool: PoolHandle,
    zones: Arc<dyn ZoneRepository>,
    images: Arc<dyn ImageStore>,
    identity: Arc<dyn CreatorResolver>,
}

impl AnalysisPipeline {
    pub fn new(
        store: Arc<dyn JobStore>,
        channels: Arc<ProgressChannels>,
        pool: PoolHandle,
        zones: Arc<dyn ZoneRepository>,
        images: Arc<dyn ImageStore>,
        identity: Arc<dyn CreatorResolver>,
    ) -> Self {
        Self {
            store,
            channels,
            pool,
            zones,
            images,
            identity,
        }
    }

    /// Validate and accept a submission, returning immediately with the
    /// job id and stored image path.
    ///
    /// On success the image is stored under a sanitized, job-id-prefixed
    /// name and the task is dispatched fire-and-forget; no store entry
    /// exists for the job until its worker completes. A validation
    /// failure creates no job.
    pub async fn submit(&self, upload: MapUpload) -> Result<SubmitReceipt> {
        validate_map_image(&upload.filename, &upload.data)?;

        let job_id = Uuid::new_v4();
        let stored_name = format!(
            "{}_{}",
            job_id.simple(),
            sanitize_filename(&upload.filename)
        );
        let image_path = self.images.save(&stored_name, &upload.data).await?;

        self.pool.submit(AnalysisTask {
            job_id,
            image: upload.data,
            province: upload.province,
            district: upload.district,
            map_type: upload.map_type,
            submitted_at: Utc::now(),
        })?;

        info!(job_id = %job_id, image_path = %image_path, "Analysis job submitted");
        Ok(SubmitReceipt { job_id, image_path })
    }

    /// Report a job's current status.
    ///
    /// Absence of a staged result reads as `Processing` — the store does
    /// not distinguish "still running" from "already confirmed, discarded,
    /// or evicted".
    pub async fn status(&self, job_id: Uuid) -> JobStatus {
        match self.store.get(job_id).await {
            None => JobStatus::Processing,
            Some(staged) if staged.success => JobStatus::Completed(Box::new(staged)),
            Some(staged) => JobStatus::Failed {
                error: staged
                    .error
                    .unwrap_or_else(|| "Analysis failed".to_string()),
                logs: staged.logs,
            },
        }
    }

    /// Attach a progress subscriber, replacing any prior channel for the
    /// job. Events arrive from attach time onward; no history replays.
    pub fn subscribe(&self, job_id: Uuid) -> broadcast::Receiver<JobEvent> {
        self.channels.subscribe(job_id)
    }

    /// Convert and persist every staged zone, then drop the entry.
    ///
    /// Values recorded in the staged result take precedence over the
    /// caller's overrides; changing that would silently alter saved data.
    /// A zone that fails to persist is logged and skipped without
    /// aborting the batch. The entry is removed unconditionally, so a
    /// second confirm reports not-found.
    pub async fn confirm(&self, job_id: Uuid, overrides: ConfirmOverrides) -> Result<usize> {
        let staged = self.store.get(job_id).await.ok_or_else(|| {
            Error::NotFound(format!("Analysis result not found for job {}", job_id))
        })?;

        let ctx = ConvertContext {
            job_id,
            map_type: staged.map_type,
            province: staged.province.clone(),
            district: staged.district.clone().or(overrides.district),
            center: staged.center,
            created_by: self.identity.creator_id(),
            now: Utc::now(),
        };

        let mut saved = 0usize;
        for candidate in &staged.zones {
            let record = convert_zone(candidate, &ctx);
            match self.zones.save(&record).await {
                Ok(_) => saved += 1,
                Err(e) => warn!(
                    job_id = %job_id,
                    zone = %record.name,
                    error = %e,
                    "Failed to persist zone, skipping"
                ),
            }
        }

        self.store.delete(job_id).await;

        info!(
            job_id = %job_id,
            zone_count = staged.zones.len(),
            saved,
            "Analysis result confirmed"
        );
        Ok(saved)
    }

    /// Drop a staged result and any open progress channel. Absent ids are
    /// a no-op, never an error.
    pub async fn discard(&self, job_id: Uuid) {
        let removed = self.store.delete(job_id).await;
        self.channels.close(job_id);
        info!(job_id = %job_id, removed, "Analysis result discarded");
    }
}
