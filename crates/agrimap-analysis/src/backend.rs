//! Analysis backend trait and call contract.

use async_trait::async_trait;

use agrimap_core::{AnalysisOutcome, MapType, Result};

/// Progress callback invoked by a backend as the analysis advances.
///
/// Arguments are `(step, status, message)`. Invocations are forwarded
/// verbatim to the job's progress channel; a backend may call it zero or
/// more times.
pub type ProgressFn = dyn Fn(&str, &str, &str) + Send + Sync;

/// One analysis invocation: the uploaded image plus submission parameters.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: Vec<u8>,
    pub province: String,
    pub district: Option<String>,
    pub map_type: MapType,
}

/// Backend performing the multi-stage map-image analysis.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Run the analysis to completion, reporting progress along the way.
    ///
    /// Recoverable model-side failures should be returned as an outcome
    /// with `success = false`; an `Err` is reserved for infrastructure
    /// faults (unreachable host, malformed response). The caller converts
    /// both into a failed staged result.
    async fn analyze(
        &self,
        request: &AnalysisRequest,
        progress: &ProgressFn,
    ) -> Result<AnalysisOutcome>;

    /// The model slug this backend invokes.
    fn model_name(&self) -> &str;

    /// Check if the backend is reachable.
    async fn health_check(&self) -> Result<bool>;
}
