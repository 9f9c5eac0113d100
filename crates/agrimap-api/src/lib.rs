//! HTTP API for the AgriMap map-analysis pipeline.
//!
//! The binary in `main.rs` wires the production collaborators (PostgreSQL
//! zones, filesystem images, vision backend) into [`AppState`] and serves
//! [`app`]; tests assemble the same router around in-memory collaborators.

pub mod handlers;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use governor::RateLimiter;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::OpenApi;

use agrimap_analysis::AnalysisBackend;
use agrimap_core::{defaults, CreatorResolver, ImageStore, ZoneRepository};
use agrimap_jobs::{
    AnalysisPipeline, InMemoryJobStore, JobStore, PoolConfig, ProgressChannels, WorkerPool,
};

use handlers::analysis::{
    confirm_analysis, discard_analysis, get_analysis_status, stream_analysis_progress,
    submit_analysis,
};

/// Global rate limiter type (direct quota, no keyed bucketing).
pub type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The analysis pipeline coordinator.
    pub pipeline: Arc<AnalysisPipeline>,
    /// The staging store, exposed so the host can drive the janitor.
    pub store: Arc<dyn JobStore>,
    /// Global rate limiter (None if rate limiting is disabled).
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

/// Assemble the pipeline and application state from injected
/// collaborators, starting the worker pool.
pub fn build_state(
    backend: Arc<dyn AnalysisBackend>,
    zones: Arc<dyn ZoneRepository>,
    images: Arc<dyn ImageStore>,
    identity: Arc<dyn CreatorResolver>,
    pool_config: PoolConfig,
    rate_limiter: Option<Arc<GlobalRateLimiter>>,
) -> AppState {
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let channels = Arc::new(ProgressChannels::new());

    let pool = WorkerPool::new(backend, store.clone(), channels.clone(), pool_config);
    let pipeline = Arc::new(AnalysisPipeline::new(
        store.clone(),
        channels,
        pool.start(),
        zones,
        images,
        identity,
    ));

    AppState {
        pipeline,
        store,
        rate_limiter,
    }
}

/// OpenAPI documentation metadata.
#[allow(dead_code)]
#[derive(OpenApi)]
#[openapi(
    info(
        title = "AgriMap Analysis API",
        version = "0.4.0",
        description = "Map-image analysis jobs: submission, progress streaming, staged-result review"
    ),
    tags(
        (name = "Analysis", description = "Map-image analysis job lifecycle"),
        (name = "System", description = "Health checks and system info")
    )
)]
struct ApiDoc;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/openapi.json", get(openapi_spec))
        .route("/analyze", post(submit_analysis))
        .route("/analyze/:id/progress", get(stream_analysis_progress))
        .route("/analyze/:id/status", get(get_analysis_status))
        .route("/analyze/:id/confirm", post(confirm_analysis))
        .route("/analyze/:id", delete(discard_analysis))
        // Middleware
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive().max_age(std::time::Duration::from_secs(
            defaults::CORS_MAX_AGE_SECS,
        )))
        // Uploads are capped at 50 MB; leave headroom for multipart framing.
        .layer(RequestBodyLimitLayer::new(
            defaults::MAX_UPLOAD_BYTES + 1024 * 1024,
        ))
        .with_state(state)
}

async fn rate_limit_middleware(
    axum::extract::State(state): axum::extract::State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, (StatusCode, Json<serde_json::Value>)> {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            tracing::warn!("Rate limit exceeded");
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "rate_limit_exceeded",
                    "error_description": "Too many requests. Please wait before retrying."
                })),
            ));
        }
    }
    Ok(next.run(request).await)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn openapi_spec() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<agrimap_core::Error> for ApiError {
    fn from(err: agrimap_core::Error) -> Self {
        match err {
            agrimap_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            // Unknown or expired job ids surface as 400 with the message;
            // eviction makes them occur naturally.
            agrimap_core::Error::NotFound(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
