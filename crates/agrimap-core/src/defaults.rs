//! Centralized default constants for the AgriMap analysis pipeline.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates reference these constants instead of defining their
//! own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

use uuid::Uuid;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 8080;

/// Default rate limit for analysis submissions: max requests per period.
pub const RATE_LIMIT_REQUESTS: u32 = 30;

/// Default rate limit: period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;

// =============================================================================
// UPLOADS
// =============================================================================

/// Maximum accepted map-image upload size in bytes (50 MB).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Accepted map-image file extensions (lowercase).
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Default directory for uploaded map images.
pub const UPLOAD_DIR: &str = "uploads/analysis";

/// Environment variable overriding the upload directory.
pub const ENV_UPLOAD_DIR: &str = "AGRIMAP_UPLOAD_DIR";

// =============================================================================
// ANALYSIS JOBS
// =============================================================================

/// Default number of analysis workers in the pool.
///
/// Vision-model analysis is memory-heavy; two concurrent jobs keeps the
/// model host responsive while still overlapping upload latency.
pub const ANALYSIS_WORKERS: usize = 2;

/// Hard per-job analysis timeout in seconds (15 minutes).
///
/// A backend that hangs past this is converted into a failed staged result
/// so the worker slot is reclaimed.
pub const ANALYSIS_TIMEOUT_SECS: u64 = 900;

/// Environment variable overriding the worker pool size.
pub const ENV_ANALYSIS_WORKERS: &str = "ANALYSIS_WORKERS";

/// Environment variable enabling/disabling job processing.
pub const ENV_ANALYSIS_WORKER_ENABLED: &str = "ANALYSIS_WORKER_ENABLED";

// =============================================================================
// PROGRESS STREAMING
// =============================================================================

/// Broadcast channel capacity for per-job progress events.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// Hard cap on a progress SSE stream, in seconds (5 minutes).
///
/// The stream closes after this regardless of worker state; closing the
/// stream never cancels the job.
pub const PROGRESS_STREAM_TIMEOUT_SECS: u64 = 300;

/// SSE keep-alive ping interval in seconds.
pub const SSE_KEEPALIVE_SECS: u64 = 15;

// =============================================================================
// STAGED RESULTS
// =============================================================================

/// Time-to-live for an unconfirmed staged result, in seconds (1 hour).
pub const STAGED_RESULT_TTL_SECS: u64 = 3600;

/// Maximum staged results held in memory before the janitor clears the
/// whole store. A hard memory bound that trades possible loss of recent
/// unconfirmed results for predictable footprint.
pub const STAGED_RESULT_MAX_ENTRIES: usize = 100;

/// Janitor sweep interval in seconds (10 minutes).
pub const JANITOR_INTERVAL_SECS: u64 = 600;

// =============================================================================
// ZONE CONVERSION
// =============================================================================

/// Fallback fill color when the candidate's color fails hex validation.
pub const DEFAULT_FILL_COLOR: &str = "#808080";

/// Fixed stroke color stamped on every persisted zone.
pub const ZONE_STROKE_COLOR: &str = "#2F4F2F";

/// Fixed fill opacity stamped on every persisted zone.
pub const ZONE_FILL_OPACITY: f64 = 0.5;

/// Square meters per area percentage point for province-scale maps.
pub const AREA_SQM_PER_PERCENT: f64 = 10_000.0;

/// Source tag stamped on every zone produced by the analysis pipeline.
pub const ANALYSIS_SOURCE_TAG: &str = "AI_MULTI_ANALYSIS";

/// Fixed system creator id used when no authenticated actor is available.
pub const SYSTEM_CREATOR_ID: Uuid = Uuid::from_u128(0x4147_5249_4d41_5000_0000_0000_0000_0001);

/// Maximum length of a zone name.
pub const ZONE_NAME_MAX_LEN: usize = 255;

/// Maximum length of a zone code.
pub const ZONE_CODE_MAX_LEN: usize = 20;

/// Maximum length of a province or district name.
pub const REGION_MAX_LEN: usize = 100;

/// Maximum length of the map-type tag.
pub const MAP_TYPE_MAX_LEN: usize = 20;

/// Maximum length of a zone type.
pub const ZONE_TYPE_MAX_LEN: usize = 50;

/// Maximum length of a land-use purpose.
pub const LAND_USE_MAX_LEN: usize = 255;

/// Default province applied when a submission omits one.
pub const DEFAULT_PROVINCE: &str = "Cà Mau";

// =============================================================================
// GEOGRAPHIC BOUNDS
// =============================================================================

/// Southern latitude bound for accepted zone centers.
pub const LAT_MIN: f64 = 8.0;

/// Northern latitude bound for accepted zone centers.
pub const LAT_MAX: f64 = 24.0;

/// Western longitude bound for accepted zone centers.
pub const LNG_MIN: f64 = 102.0;

/// Eastern longitude bound for accepted zone centers.
pub const LNG_MAX: f64 = 110.0;

// =============================================================================
// ANALYSIS BACKEND
// =============================================================================

/// Default vision-model API base URL.
pub const ANALYSIS_URL: &str = "http://127.0.0.1:11434";

/// Default vision model slug.
pub const ANALYSIS_MODEL: &str = "qwen2.5vl:7b";

/// Timeout for a single vision-model request, in seconds.
pub const ANALYSIS_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Environment variable for the vision-model API base URL.
pub const ENV_ANALYSIS_URL: &str = "ANALYSIS_URL";

/// Environment variable for the vision model slug.
pub const ENV_ANALYSIS_MODEL: &str = "ANALYSIS_MODEL";
