//! Mock analysis backend for deterministic testing.
//!
//! Emits a scripted progress sequence and returns configured zones, a
//! reported failure, or an infrastructure error, with optional simulated
//! latency. Every call is recorded for assertion.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use agrimap_core::{AnalysisOutcome, Error, GeoPoint, Result, ZoneCandidate};

use crate::backend::{AnalysisBackend, AnalysisRequest, ProgressFn};

/// Scripted terminal behavior of the mock.
#[derive(Debug, Clone)]
enum MockBehavior {
    /// Return a successful outcome with the configured zones.
    Succeed,
    /// Return an outcome with `success = false` and this error message.
    ReportFailure(String),
    /// Raise an analysis error (infrastructure fault).
    Raise(String),
}

#[derive(Debug, Clone)]
struct MockConfig {
    zones: Vec<ZoneCandidate>,
    center: Option<GeoPoint>,
    behavior: MockBehavior,
    latency_ms: u64,
    progress_steps: Vec<(String, String, String)>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            zones: Vec::new(),
            center: None,
            behavior: MockBehavior::Succeed,
            latency_ms: 0,
            progress_steps: vec![
                ("preprocess".into(), "running".into(), "Encoding map image".into()),
                ("detect".into(), "running".into(), "Detecting zones".into()),
                ("classify".into(), "running".into(), "Classifying zones".into()),
            ],
        }
    }
}

/// Mock analysis backend for testing.
#[derive(Clone)]
pub struct MockAnalysisBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<AnalysisRequest>>>,
}

impl Default for MockAnalysisBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnalysisBackend {
    /// Create a mock that succeeds with no zones.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the zones returned on success.
    pub fn with_zones(mut self, zones: Vec<ZoneCandidate>) -> Self {
        Arc::make_mut(&mut self.config).zones = zones;
        self
    }

    /// Set the analysis-level center returned on success.
    pub fn with_center(mut self, center: GeoPoint) -> Self {
        Arc::make_mut(&mut self.config).center = Some(center);
        self
    }

    /// Make the mock return a reported failure (`success = false`).
    pub fn with_reported_failure(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).behavior = MockBehavior::ReportFailure(message.into());
        self
    }

    /// Make the mock raise an analysis error.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).behavior = MockBehavior::Raise(message.into());
        self
    }

    /// Simulate per-call latency.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Replace the scripted progress sequence.
    pub fn with_progress_steps(mut self, steps: Vec<(String, String, String)>) -> Self {
        Arc::make_mut(&mut self.config).progress_steps = steps;
        self
    }

    /// Number of analyze calls made so far.
    pub fn call_count(&self) -> usize {
        self.call_log.lock().map(|log| log.len()).unwrap_or(0)
    }
}

#[async_trait]
impl AnalysisBackend for MockAnalysisBackend {
    async fn analyze(
        &self,
        request: &AnalysisRequest,
        progress: &ProgressFn,
    ) -> Result<AnalysisOutcome> {
        if let Ok(mut log) = self.call_log.lock() {
            log.push(request.clone());
        }

        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }

        for (step, status, message) in &self.config.progress_steps {
            progress(step, status, message);
        }

        match &self.config.behavior {
            MockBehavior::Succeed => Ok(AnalysisOutcome {
                success: true,
                zones: self.config.zones.clone(),
                center: self.config.center,
                error: None,
            }),
            MockBehavior::ReportFailure(message) => Ok(AnalysisOutcome {
                success: false,
                zones: Vec::new(),
                center: None,
                error: Some(message.clone()),
            }),
            MockBehavior::Raise(message) => Err(Error::Analysis(message.clone())),
        }
    }

    fn model_name(&self) -> &str {
        "mock-analysis"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrimap_core::MapType;

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            image: vec![0xFF, 0xD8],
            province: "Cà Mau".to_string(),
            district: None,
            map_type: MapType::Soil,
        }
    }

    #[tokio::test]
    async fn test_mock_succeeds_with_zones() {
        let backend = MockAnalysisBackend::new().with_zones(vec![ZoneCandidate {
            name: Some("Rice".to_string()),
            ..Default::default()
        }]);

        let steps = Arc::new(Mutex::new(Vec::new()));
        let steps_clone = steps.clone();
        let progress = move |step: &str, _status: &str, _message: &str| {
            steps_clone.lock().unwrap().push(step.to_string());
        };

        let outcome = backend.analyze(&request(), &progress).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.zones.len(), 1);
        assert_eq!(backend.call_count(), 1);
        assert_eq!(
            steps.lock().unwrap().as_slice(),
            ["preprocess", "detect", "classify"]
        );
    }

    #[tokio::test]
    async fn test_mock_reported_failure() {
        let backend = MockAnalysisBackend::new().with_reported_failure("low contrast image");
        let outcome = backend.analyze(&request(), &|_, _, _| {}).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("low contrast image"));
    }

    #[tokio::test]
    async fn test_mock_raises() {
        let backend = MockAnalysisBackend::new().with_error("model host unreachable");
        let err = backend.analyze(&request(), &|_, _, _| {}).await.unwrap_err();
        assert!(err.to_string().contains("model host unreachable"));
    }
}
