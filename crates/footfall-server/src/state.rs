use std::sync::Arc;

use tracing::{debug, info};

use footfall_core::{config::Config, store::VisitStore};
use footfall_duckdb::DuckDbBackend;

use crate::ingest::{rate_limit::RateLimiter, recorder::VisitRecorder};

/// Shared application state injected into every Axum handler and the tracking
/// middleware via [`axum::extract::State`].
pub struct AppState {
    /// The DuckDB backend, kept concretely for the health ping.
    pub db: Arc<DuckDbBackend>,

    /// The store the recorder writes to and the aggregator reads from.
    /// Normally the same object as `db`.
    pub store: Arc<dyn VisitStore>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Per-IP "recorded in the last window" cache.
    pub rate_limiter: RateLimiter,

    /// Fire-and-forget visit writer.
    pub recorder: VisitRecorder,
}

impl AppState {
    pub fn new(db: DuckDbBackend, config: Config) -> Self {
        let db = Arc::new(db);
        let store: Arc<dyn VisitStore> = db.clone();
        Self::with_store(db, store, config)
    }

    /// Construct state whose visits go to `store` instead of `db`.
    pub fn with_store(db: Arc<DuckDbBackend>, store: Arc<dyn VisitStore>, config: Config) -> Self {
        let rate_limiter =
            RateLimiter::new(config.rate_limit_window(), config.rate_limit_max_entries);
        let recorder = VisitRecorder::new(Arc::clone(&store), config.recorder_max_pending);
        Self {
            db,
            store,
            config: Arc::new(config),
            rate_limiter,
            recorder,
        }
    }

    /// Background loop: evict stale rate-limit entries on a fixed interval.
    ///
    /// Spawned as a `tokio::spawn` task in `main.rs`; runs until the process
    /// exits.
    pub async fn run_rate_limit_sweep_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.rate_limit_sweep_interval());
        // The first tick completes immediately; nothing to sweep yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = self.rate_limiter.sweep().await;
            if removed > 0 {
                info!(removed, "Rate limiter swept");
            } else {
                debug!("Rate limiter sweep found nothing to evict");
            }
        }
    }

    /// Background loop: write pending visits on a fixed interval.
    pub async fn run_recorder_flush_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.recorder_flush_interval());
        loop {
            ticker.tick().await;
            self.recorder.flush().await;
        }
    }
}
