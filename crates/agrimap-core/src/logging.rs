//! Structured logging field name constants for the AgriMap pipeline.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (zones, events) |

/// Subsystem originating the log event.
/// Values: "api", "jobs", "analysis", "db"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pipeline", "worker", "janitor", "vision"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "submit", "confirm", "sweep", "analyze"
pub const OPERATION: &str = "op";

/// Analysis job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of zones processed (conversion, persistence).
pub const ZONE_COUNT: &str = "zone_count";
