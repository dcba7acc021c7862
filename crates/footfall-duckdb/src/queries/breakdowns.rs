use anyhow::Result;
use chrono::{DateTime, Utc};

use footfall_core::store::{CountRow, DIRECT_REFERRER};

use super::{limit_param, ts_param};
use crate::DuckDbBackend;

impl DuckDbBackend {
    pub async fn count_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .prepare(
                "SELECT COUNT(*) FROM site_visitors \
                 WHERE visited_at >= CAST(?1 AS TIMESTAMP)",
            )?
            .query_row(duckdb::params![ts_param(since)], |row| row.get(0))?;
        Ok(count)
    }

    pub async fn country_counts_since(&self, since: DateTime<Utc>) -> Result<Vec<CountRow>> {
        self.grouped_counts(
            "SELECT country AS value, COUNT(*) AS c FROM site_visitors \
             WHERE visited_at >= CAST(?1 AS TIMESTAMP) AND country IS NOT NULL \
             GROUP BY country \
             ORDER BY c DESC, value ASC \
             LIMIT ?2",
            since,
            usize::MAX,
        )
        .await
    }

    pub async fn page_counts_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CountRow>> {
        self.grouped_counts(
            "SELECT page AS value, COUNT(*) AS c FROM site_visitors \
             WHERE visited_at >= CAST(?1 AS TIMESTAMP) \
             GROUP BY page \
             ORDER BY c DESC, value ASC \
             LIMIT ?2",
            since,
            limit,
        )
        .await
    }

    pub async fn referrer_counts_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CountRow>> {
        // NULL and empty referrers both mean direct traffic.
        let sql = format!(
            "SELECT COALESCE(NULLIF(referrer, ''), '{DIRECT_REFERRER}') AS value, COUNT(*) AS c \
             FROM site_visitors \
             WHERE visited_at >= CAST(?1 AS TIMESTAMP) \
             GROUP BY value \
             ORDER BY c DESC, value ASC \
             LIMIT ?2"
        );
        self.grouped_counts(&sql, since, limit).await
    }

    pub async fn user_agent_counts_since(&self, since: DateTime<Utc>) -> Result<Vec<CountRow>> {
        self.grouped_counts(
            "SELECT user_agent AS value, COUNT(*) AS c FROM site_visitors \
             WHERE visited_at >= CAST(?1 AS TIMESTAMP) \
             GROUP BY user_agent \
             ORDER BY c DESC, value ASC \
             LIMIT ?2",
            since,
            usize::MAX,
        )
        .await
    }

    /// Run a `(value, count)` query bound to `?1 = since`, `?2 = limit`.
    async fn grouped_counts(
        &self,
        sql: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CountRow>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(
            duckdb::params![ts_param(since), limit_param(limit)],
            |row| {
                Ok(CountRow {
                    value: row.get(0)?,
                    count: row.get(1)?,
                })
            },
        )?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
