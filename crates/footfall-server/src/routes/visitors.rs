use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;

use footfall_core::aggregate::{build_snapshot, VisitorSnapshot};

use crate::state::AppState;

/// `GET /api/visitors`: dashboard snapshot of site traffic.
///
/// Always `200 OK`. When the store is unreachable the affected parts of the
/// snapshot are empty or zero; the dashboard cannot tell "no traffic" from
/// "store down" and is not meant to.
#[tracing::instrument(skip(state))]
pub async fn get_visitors(State(state): State<Arc<AppState>>) -> Json<VisitorSnapshot> {
    let snapshot = build_snapshot(
        state.store.as_ref(),
        Utc::now(),
        state.config.calendar_zone,
    )
    .await;
    Json(snapshot)
}
