//! Integration tests for the vision analysis backend against a stub HTTP
//! server.

use std::sync::{Arc, Mutex};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agrimap_analysis::{AnalysisBackend, AnalysisRequest, VisionAnalysisBackend};
use agrimap_core::MapType;

fn request() -> AnalysisRequest {
    AnalysisRequest {
        image: vec![0x89, 0x50, 0x4E, 0x47],
        province: "Cà Mau".to_string(),
        district: None,
        map_type: MapType::Soil,
    }
}

#[tokio::test]
async fn test_analyze_parses_model_payload() {
    let server = MockServer::start().await;

    let model_answer = r##"{"zones":[{"name":"Rice paddy","fillColor":"#00AA00","areaPercent":12.5},{"name":"Shrimp farm"}],"center":{"lat":9.17,"lng":105.15}}"##;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "response": model_answer })),
        )
        .mount(&server)
        .await;

    let backend = VisionAnalysisBackend::new(server.uri(), "test-model".to_string());

    let steps = Arc::new(Mutex::new(Vec::new()));
    let steps_clone = steps.clone();
    let progress = move |step: &str, _status: &str, _message: &str| {
        steps_clone.lock().unwrap().push(step.to_string());
    };

    let outcome = backend.analyze(&request(), &progress).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.zones.len(), 2);
    assert_eq!(outcome.zones[0].name.as_deref(), Some("Rice paddy"));
    assert_eq!(outcome.center.unwrap().lat, 9.17);

    let recorded = steps.lock().unwrap();
    assert_eq!(
        recorded.as_slice(),
        ["preprocess", "detect", "classify", "finalize"]
    );
}

#[tokio::test]
async fn test_analyze_tolerates_fenced_json() {
    let server = MockServer::start().await;

    let model_answer = "```json\n{\"zones\":[{\"name\":\"Mangrove\"}]}\n```";
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "response": model_answer })),
        )
        .mount(&server)
        .await;

    let backend = VisionAnalysisBackend::new(server.uri(), "test-model".to_string());
    let outcome = backend.analyze(&request(), &|_, _, _| {}).await.unwrap();

    assert_eq!(outcome.zones.len(), 1);
    assert_eq!(outcome.zones[0].name.as_deref(), Some("Mangrove"));
}

#[tokio::test]
async fn test_analyze_surfaces_http_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;

    let backend = VisionAnalysisBackend::new(server.uri(), "test-model".to_string());
    let err = backend.analyze(&request(), &|_, _, _| {}).await.unwrap_err();

    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_health_check_reports_reachability() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let backend = VisionAnalysisBackend::new(server.uri(), "test-model".to_string());
    assert!(backend.health_check().await.unwrap());

    let unreachable =
        VisionAnalysisBackend::new("http://127.0.0.1:9".to_string(), "test-model".to_string());
    assert!(!unreachable.health_check().await.unwrap());
}
