use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use footfall_server::state::AppState;

/// `footfall health`: query the local `/health` endpoint for container health checks.
///
/// Calls `GET http://localhost:$FOOTFALL_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("FOOTFALL_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }
    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("footfall=info".parse()?),
        )
        .json()
        .init();

    let cfg = footfall_server::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/footfall.db", cfg.data_dir);
    let db = footfall_duckdb::DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    if !std::path::Path::new(&cfg.site_dir).is_dir() {
        tracing::warn!(
            site_dir = %cfg.site_dir,
            "Site directory not found. Page requests will return 404 but are still tracked."
        );
    }

    let state = Arc::new(AppState::new(db, cfg.clone()));

    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            state.run_recorder_flush_loop().await;
        });
    }
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            state.run_rate_limit_sweep_loop().await;
        });
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = footfall_server::app::build_app(Arc::clone(&state));

    info!(
        port = cfg.port,
        timezone = %cfg.calendar_zone.name(),
        "Footfall listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let state_for_shutdown = Arc::clone(&state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    // Pending visits are best effort; give them a bounded chance to land.
    let flushed = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        state_for_shutdown.recorder.flush(),
    )
    .await
    .unwrap_or(0);
    info!(flushed, "Shutdown complete");

    Ok(())
}
