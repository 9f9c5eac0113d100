//! Map-analysis HTTP handlers.
//!
//! The REST surface over the analysis pipeline: multipart submission, SSE
//! progress streaming, status polling, and staged-result confirm/discard.

use std::convert::Infallible;

use axum::extract::{Multipart, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use agrimap_core::{
    defaults, ConfirmOverrides, JobEvent, JobStatus, MapType, MapUpload, StagedResult,
};

use crate::{ApiError, AppState};

/// Response from a successful submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnalysisResponse {
    pub success: bool,
    pub analysis_id: Uuid,
    pub message: String,
    pub image_path: String,
}

/// Response from confirm.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmAnalysisResponse {
    pub success: bool,
    pub saved_zones: usize,
    pub message: String,
}

/// Status query response; `status` discriminates the three states.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnalysisStatusResponse {
    Processing,
    Completed { results: Box<StagedResult> },
    Failed { error: String, logs: Vec<String> },
}

/// Submit a map image for multi-stage analysis.
///
/// Accepts multipart/form-data and returns immediately with the job id;
/// the analysis runs out-of-band on the worker pool.
///
/// # Multipart Fields
/// - `image`: Map image file, JPG or PNG, ≤ 50 MB (required)
/// - `province`: Province name (optional, defaults to Cà Mau)
/// - `district`: District name (optional)
/// - `mapType`: `"soil"` or `"planning"` (optional, defaults to soil)
///
/// # Returns
/// - 200 OK with the analysis id and stored image path
/// - 400 Bad Request on a validation failure (no job is created)
#[utoipa::path(post, path = "/analyze", tag = "Analysis",
    responses((status = 200, description = "Analysis job accepted")))]
pub async fn submit_analysis(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitAnalysisResponse>, ApiError> {
    let mut filename: Option<String> = None;
    let mut image: Option<Vec<u8>> = None;
    let mut province: Option<String> = None;
    let mut district: Option<String> = None;
    let mut map_type = MapType::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("image") => {
                filename = field.file_name().map(|f| f.to_string());
                image = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?
                        .to_vec(),
                );
            }
            Some("province") => {
                let val = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?;
                if !val.trim().is_empty() {
                    province = Some(val.trim().to_string());
                }
            }
            Some("district") => {
                let val = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?;
                if !val.trim().is_empty() {
                    district = Some(val.trim().to_string());
                }
            }
            Some("mapType") => {
                let val = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?;
                if !val.trim().is_empty() {
                    map_type = val
                        .trim()
                        .parse()
                        .map_err(|e: agrimap_core::Error| ApiError::BadRequest(e.to_string()))?;
                }
            }
            _ => {} // ignore unknown fields
        }
    }

    let image = image
        .ok_or_else(|| ApiError::BadRequest("Missing image in multipart form".to_string()))?;
    let filename = filename.unwrap_or_default();

    let receipt = state
        .pipeline
        .submit(MapUpload {
            filename,
            data: image,
            province: province.unwrap_or_else(|| defaults::DEFAULT_PROVINCE.to_string()),
            district,
            map_type,
        })
        .await?;

    Ok(Json(SubmitAnalysisResponse {
        success: true,
        analysis_id: receipt.job_id,
        message: "Analysis started. Stream progress or poll status.".to_string(),
        image_path: receipt.image_path,
    }))
}

/// Stream live analysis progress as Server-Sent Events.
///
/// Emits one `connected` event, then `progress` events as the worker
/// reports them, then one `complete` event carrying the terminal result.
/// The stream is hard-capped at five minutes and there is no replay: a
/// late subscriber only sees events from attach time onward. Closing the
/// stream never cancels the job.
#[utoipa::path(get, path = "/analyze/{id}/progress", tag = "Analysis",
    responses((status = 200, description = "SSE progress stream")))]
pub async fn stream_analysis_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.pipeline.subscribe(id);

    let connected = futures::stream::once(async move {
        Ok(Event::default()
            .event("connected")
            .data(serde_json::json!({ "analysisId": id }).to_string()))
    });

    let events =
        tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(|result| async move {
            match result {
                Ok(JobEvent::Progress(event)) => serde_json::to_string(&event)
                    .ok()
                    .map(|json| Ok(Event::default().event("progress").data(json))),
                Ok(JobEvent::Complete(staged)) => serde_json::to_string(&staged)
                    .ok()
                    .map(|json| Ok(Event::default().event("complete").data(json))),
                Err(_) => None, // Skip lagged errors
            }
        });

    let deadline = Box::pin(tokio::time::sleep(std::time::Duration::from_secs(
        defaults::PROGRESS_STREAM_TIMEOUT_SECS,
    )));
    let stream = connected.chain(events).take_until(deadline);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(defaults::SSE_KEEPALIVE_SECS))
            .text("keepalive"),
    )
}

/// Poll an analysis job's status.
///
/// `processing` covers both a running job and an id the store has already
/// forgotten (confirmed, discarded, or evicted).
#[utoipa::path(get, path = "/analyze/{id}/status", tag = "Analysis",
    responses((status = 200, description = "Job status")))]
pub async fn get_analysis_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Json<AnalysisStatusResponse> {
    let response = match state.pipeline.status(id).await {
        JobStatus::Processing => AnalysisStatusResponse::Processing,
        JobStatus::Completed(staged) => AnalysisStatusResponse::Completed { results: staged },
        JobStatus::Failed { error, logs } => AnalysisStatusResponse::Failed { error, logs },
    };
    Json(response)
}

/// Confirm a staged result, persisting its zones as domain records.
///
/// The optional body may carry `mapType`/`province`/`district` overrides;
/// values recorded at submission take precedence. Confirm is not
/// idempotent: the staged entry is removed regardless of per-zone save
/// failures, and a repeat call reports 400.
#[utoipa::path(post, path = "/analyze/{id}/confirm", tag = "Analysis",
    responses((status = 200, description = "Zones persisted"),
              (status = 400, description = "Unknown or expired job id")))]
pub async fn confirm_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ConfirmOverrides>>,
) -> Result<Json<ConfirmAnalysisResponse>, ApiError> {
    let overrides = body.map(|Json(o)| o).unwrap_or_default();
    let saved = state.pipeline.confirm(id, overrides).await?;

    Ok(Json(ConfirmAnalysisResponse {
        success: true,
        saved_zones: saved,
        message: format!("Saved {} zone(s)", saved),
    }))
}

/// Discard a staged result without persisting anything. Always 200, even
/// for ids the store no longer knows.
#[utoipa::path(delete, path = "/analyze/{id}", tag = "Analysis",
    responses((status = 200, description = "Staged result discarded")))]
pub async fn discard_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Json<serde_json::Value> {
    state.pipeline.discard(id).await;
    Json(serde_json::json!({
        "success": true,
        "message": "Analysis result discarded"
    }))
}
