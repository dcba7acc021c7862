use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use footfall_core::config::Config;
use footfall_core::window::CalendarZone;
use footfall_duckdb::DuckDbBackend;
use footfall_server::app::build_app;
use footfall_server::state::AppState;

fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/footfall-test".to_string(),
        site_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/tests/site").to_string(),
        calendar_zone: CalendarZone::utc(),
        ..Config::default()
    }
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

// ============================================================
// Health check returns 200 when DB is reachable
// ============================================================
#[tokio::test]
async fn test_health_returns_200_when_db_reachable() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(db, test_config()));
    let app = build_app(state);

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build request");

    let response = app.oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["pendingVisits"], 0);
}

// ============================================================
// Health reports the recorder backlog
// ============================================================
#[tokio::test]
async fn test_health_reports_pending_visits() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(db, test_config()));
    let app = build_app(Arc::clone(&state));

    let page = Request::builder()
        .uri("/")
        .header("x-real-ip", "198.51.100.21")
        .header("user-agent", "Mozilla/5.0")
        .body(Body::empty())
        .expect("build request");
    app.clone().oneshot(page).await.expect("request");

    let health = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build request");
    let response = app.clone().oneshot(health).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["pendingVisits"], 1);

    state.recorder.flush().await;
    let health = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build request");
    let response = app.oneshot(health).await.expect("request");
    assert_eq!(json_body(response).await["pendingVisits"], 0);
}

// ============================================================
// Health checks are not visits
// ============================================================
#[tokio::test]
async fn test_health_is_not_tracked() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(db, test_config()));
    let app = build_app(Arc::clone(&state));

    let request = Request::builder()
        .uri("/health")
        .header("x-real-ip", "198.51.100.20")
        .header("user-agent", "Mozilla/5.0")
        .body(Body::empty())
        .expect("build request");
    app.oneshot(request).await.expect("request");

    assert_eq!(state.recorder.pending_len().await, 0);
    assert!(state.rate_limiter.is_empty().await);
}
