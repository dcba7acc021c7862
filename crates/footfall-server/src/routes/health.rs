use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /health`: liveness of the store plus the recorder backlog.
///
/// `200` with `"status": "ok"` when DuckDB answers a ping, `503` with
/// `"degraded"` otherwise. `pendingVisits` is the number of visits waiting
/// for the next flush; a backlog that keeps growing means writes are failing
/// or falling behind.
///
/// ```json
/// { "status": "ok", "version": "0.1.0", "pendingVisits": 0 }
/// ```
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let (status, label) = match state.db.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::error!(error = %e, "Health check: DuckDB unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded")
        }
    };
    let pending = state.recorder.pending_len().await;

    (
        status,
        Json(json!({
            "status": label,
            "version": env!("CARGO_PKG_VERSION"),
            "pendingVisits": pending,
        })),
    )
}
