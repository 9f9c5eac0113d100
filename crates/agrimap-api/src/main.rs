//! agrimap-api - HTTP API server for the AgriMap analysis pipeline.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agrimap_analysis::{AnalysisBackend, VisionAnalysisBackend};
use agrimap_core::{defaults, SystemCreator};
use agrimap_db::{Database, FilesystemImageStore};
use agrimap_jobs::{Janitor, PoolConfig};

use agrimap_api::{app, build_state, GlobalRateLimiter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    //
    // Environment variables:
    //   LOG_FORMAT - "json" or "text" (default: "text")
    //   RUST_LOG   - standard env filter (default: "agrimap_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agrimap_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Get configuration from environment
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/agrimap".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);

    // Rate limiting configuration
    let rate_limit_requests: u32 = std::env::var("RATE_LIMIT_REQUESTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::RATE_LIMIT_REQUESTS);
    let rate_limit_period_secs: u64 = std::env::var("RATE_LIMIT_PERIOD_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::RATE_LIMIT_PERIOD_SECS);
    let rate_limit_enabled: bool = std::env::var("RATE_LIMIT_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let rate_limiter: Option<Arc<GlobalRateLimiter>> = if rate_limit_enabled {
        let per_second =
            (rate_limit_requests as f64 / rate_limit_period_secs.max(1) as f64).ceil() as u32;
        let quota = Quota::per_second(NonZeroU32::new(per_second.max(1)).unwrap_or(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(rate_limit_requests.max(1)).unwrap_or(NonZeroU32::MIN));
        info!(
            requests = rate_limit_requests,
            period_secs = rate_limit_period_secs,
            "Rate limiting enabled"
        );
        Some(Arc::new(RateLimiter::direct(quota)))
    } else {
        info!("Rate limiting disabled");
        None
    };

    // Connect to database and run migrations
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    db.migrate().await?;
    info!("Database ready");

    // Analysis backend
    let backend: Arc<dyn AnalysisBackend> = Arc::new(VisionAnalysisBackend::from_env());
    if !backend.health_check().await.unwrap_or(false) {
        tracing::warn!(
            model = backend.model_name(),
            "Analysis backend is unreachable; submissions will stage failures"
        );
    }

    // Assemble the pipeline
    let state = build_state(
        backend,
        db.zones.clone(),
        Arc::new(FilesystemImageStore::from_env()),
        Arc::new(SystemCreator),
        PoolConfig::from_env(),
        rate_limiter,
    );

    // Janitor: sweep the staging store on a fixed cadence.
    let janitor = Janitor::new(state.store.clone());
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(defaults::JANITOR_INTERVAL_SECS));
        ticker.tick().await; // the first tick fires immediately
        loop {
            ticker.tick().await;
            janitor.run().await;
        }
    });

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
