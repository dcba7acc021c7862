use std::sync::Arc;

use axum::{
    middleware,
    routing::{any, get},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

use crate::{ingest, routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Routing:
///
/// - `/health` and `/api/*` are plain routes and are never tracked.
/// - Everything else falls through to the static site under
///   `config.site_dir`, wrapped in the tracking middleware.
///
/// Outer layers, outermost first:
///
/// 1. `TraceLayer`: structured request/response logging via `tracing`.
/// 2. `CompressionLayer`: gzip for the snapshot JSON and site assets.
pub fn build_app(state: Arc<AppState>) -> Router {
    let site = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            ingest::track_visit,
        ))
        .service(ServeDir::new(&state.config.site_dir));

    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/visitors",
            get(routes::visitors::get_visitors).fallback(routes::method_not_allowed),
        )
        .route("/api/{*rest}", any(routes::api_not_found))
        .fallback_service(site)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
