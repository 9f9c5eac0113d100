//! Vision-LLM analysis backend (Ollama-compatible JSON API).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use agrimap_core::{defaults, AnalysisOutcome, Error, GeoPoint, Result, ZoneCandidate};

use crate::backend::{AnalysisBackend, AnalysisRequest, ProgressFn};
use crate::parse::parse_json_lenient;

/// Analysis backend that prompts a vision LLM for zone extraction.
pub struct VisionAnalysisBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl VisionAnalysisBackend {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            timeout_secs: defaults::ANALYSIS_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables (`ANALYSIS_URL`, `ANALYSIS_MODEL`),
    /// falling back to the built-in defaults.
    pub fn from_env() -> Self {
        let base_url = std::env::var(defaults::ENV_ANALYSIS_URL)
            .unwrap_or_else(|_| defaults::ANALYSIS_URL.to_string());
        let model = std::env::var(defaults::ENV_ANALYSIS_MODEL)
            .unwrap_or_else(|_| defaults::ANALYSIS_MODEL.to_string());
        Self::new(base_url, model)
    }

    fn build_prompt(request: &AnalysisRequest) -> String {
        let region = match &request.district {
            Some(district) => format!("{}, {}", district, request.province),
            None => request.province.clone(),
        };
        format!(
            r##"You are analyzing a {map_type} map of {region}, Vietnam. Identify every distinct zone on the map.

Respond with JSON only, in this shape:
{{"zones":[{{"name":"...","description":"...","zoneCode":"...","zoneType":"...","landUse":"...","fillColor":"#RRGGBB","areaPercent":0.0,"points":[{{"lat":0.0,"lng":0.0}}],"centerLat":0.0,"centerLng":0.0}}],"center":{{"lat":0.0,"lng":0.0}}}}

Omit any field you cannot determine. Do not add commentary."##,
            map_type = request.map_type,
            region = region,
        )
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    images: Vec<String>, // base64 encoded
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Shape the prompt asks the model to produce.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VisionPayload {
    zones: Vec<ZoneCandidate>,
    center: Option<GeoPoint>,
}

fn parse_outcome(raw: &str) -> Result<(Vec<ZoneCandidate>, Option<GeoPoint>)> {
    match parse_json_lenient::<VisionPayload>(raw) {
        Ok(payload) => Ok((payload.zones, payload.center)),
        Err(_) => {
            // Some models answer with the bare zones array.
            let zones = parse_json_lenient::<Vec<ZoneCandidate>>(raw).map_err(|e| {
                Error::Analysis(format!("Unparseable model response: {}", e))
            })?;
            Ok((zones, None))
        }
    }
}

#[async_trait]
impl AnalysisBackend for VisionAnalysisBackend {
    async fn analyze(
        &self,
        request: &AnalysisRequest,
        progress: &ProgressFn,
    ) -> Result<AnalysisOutcome> {
        use base64::Engine;

        progress("preprocess", "running", "Encoding map image");
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(&request.image);

        let body = GenerateRequest {
            model: self.model.clone(),
            prompt: Self::build_prompt(request),
            images: vec![image_b64],
            stream: false,
        };

        progress("detect", "running", "Querying vision model");
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Analysis(format!("Vision request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Analysis(format!(
                "Vision API returned {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Analysis(format!("Failed to parse vision response: {}", e)))?;

        progress("classify", "running", "Parsing detected zones");
        let (zones, center) = parse_outcome(&result.response)?;

        progress(
            "finalize",
            "running",
            &format!("Extracted {} zone(s)", zones.len()),
        );
        tracing::debug!(
            model = %self.model,
            zone_count = zones.len(),
            "Vision analysis parsed"
        );

        Ok(AnalysisOutcome {
            success: true,
            zones,
            center,
            error: None,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrimap_core::MapType;

    #[test]
    fn test_backend_construction() {
        let backend =
            VisionAnalysisBackend::new("http://localhost:11434".to_string(), "llava".to_string());
        assert_eq!(backend.model_name(), "llava");
        assert_eq!(
            backend.timeout_secs,
            defaults::ANALYSIS_REQUEST_TIMEOUT_SECS
        );
    }

    #[test]
    fn test_prompt_names_region_and_map_type() {
        let request = AnalysisRequest {
            image: vec![1, 2, 3],
            province: "Cà Mau".to_string(),
            district: Some("Đầm Dơi".to_string()),
            map_type: MapType::Planning,
        };
        let prompt = VisionAnalysisBackend::build_prompt(&request);
        assert!(prompt.contains("planning map"));
        assert!(prompt.contains("Đầm Dơi, Cà Mau"));
    }

    #[test]
    fn test_parse_outcome_payload_shape() {
        let raw = r##"{"zones":[{"name":"Rice","fillColor":"#00AA00"}],"center":{"lat":9.1,"lng":105.1}}"##;
        let (zones, center) = parse_outcome(raw).unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(center.unwrap().lat, 9.1);
    }

    #[test]
    fn test_parse_outcome_bare_array() {
        let raw = r#"[{"name":"Rice"},{"name":"Shrimp"}]"#;
        let (zones, center) = parse_outcome(raw).unwrap();
        assert_eq!(zones.len(), 2);
        assert!(center.is_none());
    }

    #[test]
    fn test_parse_outcome_rejects_prose() {
        assert!(parse_outcome("The map shows mostly rice paddies.").is_err());
    }
}
