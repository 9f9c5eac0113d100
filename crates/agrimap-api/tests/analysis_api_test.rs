//! End-to-end tests for the analysis REST surface, driving the router
//! with the mock analysis backend and in-memory persistence.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;
use uuid::Uuid;

use agrimap_analysis::MockAnalysisBackend;
use agrimap_api::{app, build_state};
use agrimap_core::{GeoPoint, Result, SystemCreator, ZoneCandidate, ZoneRecord, ZoneRepository};
use agrimap_db::FilesystemImageStore;
use agrimap_jobs::PoolConfig;

const BOUNDARY: &str = "agrimap-test-boundary";

#[derive(Default)]
struct MemoryZoneRepository {
    saved: Mutex<Vec<ZoneRecord>>,
}

#[async_trait]
impl ZoneRepository for MemoryZoneRepository {
    async fn save(&self, record: &ZoneRecord) -> Result<Uuid> {
        self.saved.lock().unwrap().push(record.clone());
        Ok(Uuid::new_v4())
    }
}

struct TestApp {
    router: Router,
    zones: Arc<MemoryZoneRepository>,
    _upload_dir: tempfile::TempDir,
}

fn test_app(backend: MockAnalysisBackend) -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let zones = Arc::new(MemoryZoneRepository::default());

    let state = build_state(
        Arc::new(backend),
        zones.clone(),
        Arc::new(FilesystemImageStore::new(upload_dir.path())),
        Arc::new(SystemCreator),
        PoolConfig::default(),
        None,
    );

    TestApp {
        router: app(state),
        zones,
        _upload_dir: upload_dir,
    }
}

fn three_zone_backend() -> MockAnalysisBackend {
    let zones = ["Rice paddy", "Shrimp farm", "Mangrove belt"]
        .iter()
        .map(|name| ZoneCandidate {
            name: Some(name.to_string()),
            area_percent: Some(2.0),
            ..Default::default()
        })
        .collect();
    MockAnalysisBackend::new()
        .with_zones(zones)
        .with_center(GeoPoint::new(9.17, 105.15))
}

/// Build a multipart body with an image part plus text fields.
fn multipart_body(filename: &str, fields: &[(&str, &str)]) -> Body {
    let mut body = String::new();
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\nPNGDATA\r\n"
    ));
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Body::from(body)
}

fn submit_request(filename: &str, fields: &[(&str, &str)]) -> Request<Body> {
    Request::post("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart_body(filename, fields))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll the status endpoint until the job leaves `processing`.
async fn wait_for_terminal(router: &Router, id: &str) -> serde_json::Value {
    for _ in 0..300 {
        let response = router
            .clone()
            .oneshot(
                Request::get(format!("/analyze/{}/status", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = response_json(response).await;
        if json["status"] != "processing" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached a terminal state", id);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(MockAnalysisBackend::new());

    let response = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_submit_analyze_confirm_flow() {
    let app = test_app(three_zone_backend());

    // Submit
    let response = app
        .router
        .clone()
        .oneshot(submit_request(
            "plan.png",
            &[("province", "Cà Mau"), ("mapType", "planning")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let submitted = response_json(response).await;
    assert_eq!(submitted["success"], true);
    let id = submitted["analysisId"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert!(submitted["imagePath"].as_str().unwrap().ends_with(".png"));

    // Status converges to completed with the staged zones
    let terminal = wait_for_terminal(&app.router, &id).await;
    assert_eq!(terminal["status"], "completed");
    assert_eq!(terminal["results"]["zones"].as_array().unwrap().len(), 3);
    assert_eq!(terminal["results"]["province"], "Cà Mau");
    assert_eq!(terminal["results"]["mapType"], "planning");

    // Confirm persists all three
    let response = app
        .router
        .clone()
        .oneshot(
            Request::post(format!("/analyze/{}/confirm", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let confirmed = response_json(response).await;
    assert_eq!(confirmed["savedZones"], 3);
    assert_eq!(app.zones.saved.lock().unwrap().len(), 3);

    // The registry forgot the job, so status reads processing again
    let response = app
        .router
        .clone()
        .oneshot(
            Request::get(format!("/analyze/{}/status", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = response_json(response).await;
    assert_eq!(json["status"], "processing");

    // A second confirm reports 400
    let response = app
        .router
        .clone()
        .oneshot(
            Request::post(format!("/analyze/{}/confirm", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_submit_rejects_non_image_upload() {
    let app = test_app(MockAnalysisBackend::new());

    let response = app
        .router
        .oneshot(submit_request("notes.txt", &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("JPG and PNG"));
    assert!(json.get("analysisId").is_none());
}

#[tokio::test]
async fn test_submit_rejects_missing_image_field() {
    let app = test_app(MockAnalysisBackend::new());

    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"province\"\r\n\r\nCà Mau\r\n--{BOUNDARY}--\r\n"
    );
    let response = app
        .router
        .oneshot(
            Request::post("/analyze")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("Missing image"));
}

#[tokio::test]
async fn test_submit_rejects_unknown_map_type() {
    let app = test_app(MockAnalysisBackend::new());

    let response = app
        .router
        .oneshot(submit_request("plan.png", &[("mapType", "cadastral")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_failed_analysis_surfaces_error_and_logs() {
    let backend = MockAnalysisBackend::new().with_reported_failure("low contrast image");
    let app = test_app(backend);

    let response = app
        .router
        .clone()
        .oneshot(submit_request("soil.jpg", &[]))
        .await
        .unwrap();
    let id = response_json(response).await["analysisId"]
        .as_str()
        .unwrap()
        .to_string();

    let terminal = wait_for_terminal(&app.router, &id).await;
    assert_eq!(terminal["status"], "failed");
    assert_eq!(terminal["error"], "low contrast image");
    assert!(!terminal["logs"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_discard_is_always_ok() {
    let app = test_app(MockAnalysisBackend::new());

    let response = app
        .router
        .oneshot(
            Request::delete(format!("/analyze/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn test_status_unknown_id_reads_processing() {
    let app = test_app(MockAnalysisBackend::new());

    let response = app
        .router
        .oneshot(
            Request::get(format!("/analyze/{}/status", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["status"], "processing");
}
