//! Domain models for the AgriMap map-analysis pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::error::Error;

/// Kind of map a submission analyzes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    /// Soil-classification map.
    #[default]
    Soil,
    /// Land-use planning map.
    Planning,
}

impl MapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapType::Soil => "soil",
            MapType::Planning => "planning",
        }
    }
}

impl std::fmt::Display for MapType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MapType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "soil" => Ok(MapType::Soil),
            "planning" => Ok(MapType::Planning),
            other => Err(Error::InvalidInput(format!(
                "Unknown map type '{}' (expected 'soil' or 'planning')",
                other
            ))),
        }
    }
}

/// A WGS-84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether the point falls inside the accepted Vietnam bounding box.
    pub fn in_vietnam_bounds(&self) -> bool {
        (defaults::LAT_MIN..=defaults::LAT_MAX).contains(&self.lat)
            && (defaults::LNG_MIN..=defaults::LNG_MAX).contains(&self.lng)
    }
}

/// A single progress report emitted by the worker running a job.
///
/// Events for one job are causally ordered (single producer). They are not
/// buffered: a subscriber that attaches late misses earlier events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub step: String,
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    /// Create an event stamped with the current time.
    pub fn now(
        step: impl Into<String>,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            step: step.into(),
            status: status.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Event carried on a job's progress channel.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// Intermediate progress report.
    Progress(ProgressEvent),
    /// Terminal event carrying the staged result; the channel closes after.
    Complete(Box<StagedResult>),
}

/// Untrusted zone description produced by the analysis backend.
///
/// Every field is optional. Nothing here is persisted directly; the
/// converter clamps, validates, and defaults each field on confirm.
/// Unknown fields in the model output are dropped on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoneCandidate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub zone_code: Option<String>,
    pub zone_type: Option<String>,
    pub land_use: Option<String>,
    pub fill_color: Option<String>,
    /// Zone area as a percentage of the mapped region.
    pub area_percent: Option<f64>,
    /// Pre-serialized boundary shape, when the model returns one.
    pub boundary: Option<String>,
    /// Raw boundary points, when the model returns coordinates directly.
    pub points: Option<Vec<GeoPoint>>,
    pub center_lat: Option<f64>,
    pub center_lng: Option<f64>,
}

/// The not-yet-committed outcome of an analysis job.
///
/// Held only in the in-memory job store pending confirm/discard. Written
/// exactly once by the worker; never mutated afterwards except for the
/// lazily-stamped `inserted_at` used by the janitor for eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedResult {
    pub job_id: Uuid,
    pub success: bool,
    pub zones: Vec<ZoneCandidate>,
    /// Analysis-level center of the mapped region, if reported.
    pub center: Option<GeoPoint>,
    pub map_type: MapType,
    pub province: String,
    pub district: Option<String>,
    pub error: Option<String>,
    /// Ordered progress messages accumulated while the job ran.
    pub logs: Vec<String>,
    /// Eviction bookkeeping only; stamped by the janitor when missing.
    pub inserted_at: Option<DateTime<Utc>>,
}

impl StagedResult {
    /// Build a staged result from a backend outcome (success or reported
    /// failure).
    pub fn from_outcome(
        job_id: Uuid,
        outcome: AnalysisOutcome,
        map_type: MapType,
        province: String,
        district: Option<String>,
        logs: Vec<String>,
    ) -> Self {
        Self {
            job_id,
            success: outcome.success,
            zones: outcome.zones,
            center: outcome.center,
            map_type,
            province,
            district,
            error: outcome.error,
            logs,
            inserted_at: None,
        }
    }

    /// Build a failed staged result from a raised backend error.
    pub fn failure(
        job_id: Uuid,
        error: String,
        map_type: MapType,
        province: String,
        district: Option<String>,
        logs: Vec<String>,
    ) -> Self {
        Self {
            job_id,
            success: false,
            zones: Vec::new(),
            center: None,
            map_type,
            province,
            district,
            error: Some(error),
            logs,
            inserted_at: None,
        }
    }
}

/// Structured result returned by an analysis backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisOutcome {
    pub success: bool,
    pub zones: Vec<ZoneCandidate>,
    /// Center of the analyzed region, if the model located it.
    pub center: Option<GeoPoint>,
    pub error: Option<String>,
}

/// Validated, persistable form of a zone candidate.
///
/// Produced by [`crate::convert::convert_zone`]; the row id is assigned by
/// the repository on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRecord {
    pub name: String,
    pub description: Option<String>,
    pub zone_code: String,
    pub province: String,
    pub district: Option<String>,
    pub map_type: String,
    pub zone_type: Option<String>,
    pub land_use: Option<String>,
    pub fill_color: String,
    pub stroke_color: String,
    pub fill_opacity: f64,
    /// Area in square meters, derived from the candidate's percentage.
    pub area_sqm: Option<f64>,
    /// Serialized boundary shape; `"[]"` when the candidate supplied none.
    pub boundary: String,
    pub center_lat: Option<f64>,
    pub center_lng: Option<f64>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source: String,
    pub verified: bool,
}

/// A validated map-image submission handed to the pipeline.
#[derive(Debug, Clone)]
pub struct MapUpload {
    pub filename: String,
    pub data: Vec<u8>,
    pub province: String,
    pub district: Option<String>,
    pub map_type: MapType,
}

/// What the pipeline returns immediately after accepting a submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub job_id: Uuid,
    pub image_path: String,
}

/// Caller-supplied parameter overrides for confirm.
///
/// Values recorded in the staged result take precedence over these; the
/// overrides only fill gaps (in practice, a missing district).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfirmOverrides {
    pub map_type: Option<MapType>,
    pub province: Option<String>,
    pub district: Option<String>,
}

/// Status view of an analysis job.
///
/// The store uses "no entry" both for a job still running and for one
/// already confirmed, discarded, or evicted, so an expired id also reads
/// as `Processing`. Callers needing a terminal answer must watch the
/// progress stream's `complete` event or confirm promptly.
#[derive(Debug, Clone)]
pub enum JobStatus {
    Processing,
    Completed(Box<StagedResult>),
    Failed { error: String, logs: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_type_parse() {
        assert_eq!("soil".parse::<MapType>().unwrap(), MapType::Soil);
        assert_eq!("PLANNING".parse::<MapType>().unwrap(), MapType::Planning);
        assert!("cadastral".parse::<MapType>().is_err());
    }

    #[test]
    fn test_map_type_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&MapType::Planning).unwrap(),
            "\"planning\""
        );
        let parsed: MapType = serde_json::from_str("\"soil\"").unwrap();
        assert_eq!(parsed, MapType::Soil);
    }

    #[test]
    fn test_map_type_default_is_soil() {
        assert_eq!(MapType::default(), MapType::Soil);
    }

    #[test]
    fn test_geo_point_bounds() {
        assert!(GeoPoint::new(9.17, 105.15).in_vietnam_bounds());
        assert!(GeoPoint::new(8.0, 102.0).in_vietnam_bounds());
        assert!(GeoPoint::new(24.0, 110.0).in_vietnam_bounds());
        assert!(!GeoPoint::new(50.0, 106.0).in_vietnam_bounds());
        assert!(!GeoPoint::new(10.0, 100.0).in_vietnam_bounds());
    }

    #[test]
    fn test_zone_candidate_ignores_unknown_fields() {
        let raw = r##"{"name":"Rice paddy","confidence":0.93,"fillColor":"#00FF00"}"##;
        let candidate: ZoneCandidate = serde_json::from_str(raw).unwrap();
        assert_eq!(candidate.name.as_deref(), Some("Rice paddy"));
        assert_eq!(candidate.fill_color.as_deref(), Some("#00FF00"));
        assert!(candidate.zone_code.is_none());
    }

    #[test]
    fn test_staged_result_from_outcome() {
        let job_id = Uuid::new_v4();
        let outcome = AnalysisOutcome {
            success: true,
            zones: vec![ZoneCandidate::default()],
            center: Some(GeoPoint::new(9.0, 105.0)),
            error: None,
        };
        let staged = StagedResult::from_outcome(
            job_id,
            outcome,
            MapType::Planning,
            "Cà Mau".to_string(),
            None,
            vec!["detect: found 1 zone".to_string()],
        );
        assert!(staged.success);
        assert_eq!(staged.job_id, job_id);
        assert_eq!(staged.zones.len(), 1);
        assert!(staged.inserted_at.is_none());
    }

    #[test]
    fn test_staged_result_failure() {
        let staged = StagedResult::failure(
            Uuid::new_v4(),
            "model unreachable".to_string(),
            MapType::Soil,
            "Cà Mau".to_string(),
            None,
            Vec::new(),
        );
        assert!(!staged.success);
        assert_eq!(staged.error.as_deref(), Some("model unreachable"));
        assert!(staged.zones.is_empty());
    }

    #[test]
    fn test_progress_event_serde_camel_case() {
        let event = ProgressEvent::now("detect", "running", "scanning zones");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["step"], "detect");
        assert!(json.get("timestamp").is_some());
    }
}
