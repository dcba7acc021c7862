use anyhow::Result;
use chrono::{DateTime, Utc};

use footfall_core::store::{MapPoint, MinuteCount};
use footfall_core::visit::{NewVisit, StoredVisit};

use super::{limit_param, parse_timestamp, ts_param};
use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Newest-first visits since `since` that carry both coordinates.
    pub async fn geo_visits_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MapPoint>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT latitude, longitude, city, country, page, CAST(visited_at AS VARCHAR) \
             FROM site_visitors \
             WHERE visited_at >= CAST(?1 AS TIMESTAMP) \
               AND latitude IS NOT NULL AND longitude IS NOT NULL \
             ORDER BY visited_at DESC \
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(
            duckdb::params![ts_param(since), limit_param(limit)],
            |row| {
                Ok((
                    row.get::<_, f64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )?;

        let mut points = Vec::new();
        for row in rows {
            let (lat, lon, city, country, page, visited_at) = row?;
            points.push(MapPoint {
                lat,
                lon,
                city,
                country,
                page,
                visited_at: parse_timestamp(&visited_at)?,
            });
        }
        Ok(points)
    }

    /// The `limit` most recent visits, newest first.
    pub async fn recent_visits(&self, limit: usize) -> Result<Vec<StoredVisit>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT ip, city, region, country, latitude, longitude, \
                    page, user_agent, referrer, CAST(visited_at AS VARCHAR) \
             FROM site_visitors \
             ORDER BY visited_at DESC \
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(duckdb::params![limit_param(limit)], |row| {
            Ok((
                NewVisit {
                    ip: row.get(0)?,
                    city: row.get(1)?,
                    region: row.get(2)?,
                    country: row.get(3)?,
                    latitude: row.get(4)?,
                    longitude: row.get(5)?,
                    page: row.get(6)?,
                    user_agent: row.get(7)?,
                    referrer: row.get(8)?,
                },
                row.get::<_, String>(9)?,
            ))
        })?;

        let mut visits = Vec::new();
        for row in rows {
            let (visit, visited_at) = row?;
            visits.push(StoredVisit {
                visit,
                visited_at: parse_timestamp(&visited_at)?,
            });
        }
        Ok(visits)
    }

    /// Visit counts per UTC minute since `since`.
    pub async fn minute_counts_since(&self, since: DateTime<Utc>) -> Result<Vec<MinuteCount>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT CAST(date_trunc('minute', visited_at) AS VARCHAR) AS bucket, COUNT(*) \
             FROM site_visitors \
             WHERE visited_at >= CAST(?1 AS TIMESTAMP) \
             GROUP BY bucket",
        )?;
        let rows = stmt.query_map(duckdb::params![ts_param(since)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut minutes = Vec::new();
        for row in rows {
            let (minute, count) = row?;
            minutes.push(MinuteCount::new(parse_timestamp(&minute)?, count));
        }
        Ok(minutes)
    }
}
