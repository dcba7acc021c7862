use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use footfall_core::visit::NewVisit;

use crate::queries::ts_param;
use crate::schema::init_sql;

/// A DuckDB-backed visit store.
///
/// DuckDB is single-writer, so the connection sits behind
/// `Arc<tokio::sync::Mutex<_>>`: every query takes the lock for its duration
/// and the struct stays cheap to share across handlers and the recorder.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path` and ensure the
    /// schema exists.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(path, memory_limit, "DuckDB opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** DuckDB database. Data is discarded on drop.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Append one visit with an explicit `visited_at`.
    ///
    /// The `VisitStore` implementation calls this with the current time;
    /// tests call it directly to lay out visits across days and hours.
    pub async fn insert_visit_at(
        &self,
        visit: &NewVisit,
        visited_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO site_visitors (
                ip, city, region, country, latitude, longitude,
                page, user_agent, referrer, visited_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, CAST(?10 AS TIMESTAMP)
            )"#,
            duckdb::params![
                visit.ip,
                visit.city,
                visit.region,
                visit.country,
                visit.latitude,
                visit.longitude,
                visit.page,
                visit.user_agent,
                visit.referrer,
                ts_param(visited_at),
            ],
        )?;
        Ok(())
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }
}
