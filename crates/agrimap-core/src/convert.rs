//! Converting untrusted zone candidates into persistable zone records.
//!
//! Pure and deterministic: everything time- or identity-dependent comes in
//! through [`ConvertContext`]. Every text field is clamped, the fill color
//! is validated, and coordinates outside the accepted bounding box are
//! dropped rather than guessed.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::defaults;
use crate::models::{GeoPoint, MapType, ZoneCandidate, ZoneRecord};

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new("^#[0-9A-Fa-f]{6}$").expect("hex color pattern"));

/// Context shared by every zone converted from one staged result.
#[derive(Debug, Clone)]
pub struct ConvertContext {
    pub job_id: Uuid,
    pub map_type: MapType,
    pub province: String,
    pub district: Option<String>,
    /// Analysis-level center, the coarse fallback for zones without a
    /// precise one.
    pub center: Option<GeoPoint>,
    pub created_by: Uuid,
    pub now: DateTime<Utc>,
}

/// Convert one untrusted candidate into a persistable record.
pub fn convert_zone(candidate: &ZoneCandidate, ctx: &ConvertContext) -> ZoneRecord {
    let center = resolve_center(candidate, ctx.center);

    ZoneRecord {
        name: clamp_text(
            candidate.name.as_deref().unwrap_or("Unnamed zone"),
            defaults::ZONE_NAME_MAX_LEN,
        ),
        description: candidate.description.clone(),
        zone_code: resolve_zone_code(candidate.zone_code.as_deref(), ctx.job_id),
        province: clamp_text(&ctx.province, defaults::REGION_MAX_LEN),
        district: ctx
            .district
            .as_deref()
            .map(|d| clamp_text(d, defaults::REGION_MAX_LEN)),
        map_type: clamp_text(ctx.map_type.as_str(), defaults::MAP_TYPE_MAX_LEN),
        zone_type: candidate
            .zone_type
            .as_deref()
            .map(|t| clamp_text(t, defaults::ZONE_TYPE_MAX_LEN)),
        land_use: candidate
            .land_use
            .as_deref()
            .map(|l| clamp_text(l, defaults::LAND_USE_MAX_LEN)),
        fill_color: normalize_fill_color(candidate.fill_color.as_deref()),
        stroke_color: defaults::ZONE_STROKE_COLOR.to_string(),
        fill_opacity: defaults::ZONE_FILL_OPACITY,
        area_sqm: candidate.area_percent.map(area_from_percent),
        boundary: resolve_boundary(candidate),
        center_lat: center.map(|p| p.lat),
        center_lng: center.map(|p| p.lng),
        created_by: ctx.created_by,
        created_at: ctx.now,
        updated_at: ctx.now,
        source: defaults::ANALYSIS_SOURCE_TAG.to_string(),
        verified: false,
    }
}

/// Trim and truncate a text field to a maximum character count.
pub fn clamp_text(value: &str, max_chars: usize) -> String {
    value.trim().chars().take(max_chars).collect()
}

/// Validate a fill color against `#RRGGBB`, substituting the default on
/// mismatch or absence.
pub fn normalize_fill_color(color: Option<&str>) -> String {
    match color.map(str::trim) {
        Some(c) if HEX_COLOR.is_match(c) => c.to_string(),
        _ => defaults::DEFAULT_FILL_COLOR.to_string(),
    }
}

/// Area in square meters from a map-percentage figure, rounded to two
/// decimals. Province-scale heuristic: one percentage point covers
/// [`defaults::AREA_SQM_PER_PERCENT`] square meters.
pub fn area_from_percent(percent: f64) -> f64 {
    let sqm = percent.max(0.0) * defaults::AREA_SQM_PER_PERCENT;
    (sqm * 100.0).round() / 100.0
}

/// Keep the candidate's code when present, else derive a stable fallback
/// from the job id.
fn resolve_zone_code(code: Option<&str>, job_id: Uuid) -> String {
    match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => clamp_text(code, defaults::ZONE_CODE_MAX_LEN),
        None => {
            let hex = job_id.simple().to_string();
            format!("Z-{}", hex[..8].to_uppercase())
        }
    }
}

/// Boundary precedence: pre-serialized shape, then raw point list
/// (serialized here), then the empty-shape marker.
pub fn resolve_boundary(candidate: &ZoneCandidate) -> String {
    if let Some(shape) = candidate
        .boundary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return shape.to_string();
    }

    if let Some(points) = candidate.points.as_ref().filter(|p| !p.is_empty()) {
        if let Ok(serialized) = serde_json::to_string(points) {
            return serialized;
        }
    }

    "[]".to_string()
}

/// Center precedence: the candidate's precise point, then the
/// analysis-level center; either must fall inside the accepted bounding
/// box or the center stays unset.
pub fn resolve_center(
    candidate: &ZoneCandidate,
    analysis_center: Option<GeoPoint>,
) -> Option<GeoPoint> {
    let precise = match (candidate.center_lat, candidate.center_lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
        _ => None,
    };

    precise
        .into_iter()
        .chain(analysis_center)
        .find(|p| p.in_vietnam_bounds())
}
