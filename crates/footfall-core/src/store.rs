//! Backing-store abstraction for visit events.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::visit::{NewVisit, StoredVisit};

/// One `(value, count)` pair of a group-by-count query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountRow {
    pub value: String,
    pub count: i64,
}

impl CountRow {
    pub fn new(value: impl Into<String>, count: i64) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}

/// A visit reduced to what the live map needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
    pub city: Option<String>,
    pub country: Option<String>,
    pub page: String,
    pub visited_at: DateTime<Utc>,
}

/// Visits that fell inside one UTC minute.
///
/// Minute granularity keeps the hour of day exact in zones offset by 30 or
/// 45 minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteCount {
    /// Start of the minute.
    pub minute: DateTime<Utc>,
    pub count: i64,
}

impl MinuteCount {
    pub fn new(minute: DateTime<Utc>, count: i64) -> Self {
        Self { minute, count }
    }
}

/// Referrer label substituted for visits without a referrer.
pub const DIRECT_REFERRER: &str = "Direct";

/// Append-only visit event table.
///
/// All `*_since` bounds are inclusive. Every grouped query orders by count
/// descending, ties broken by value ascending. Implementations must never
/// update or delete rows.
#[async_trait]
pub trait VisitStore: Send + Sync + 'static {
    /// Append one visit, stamping `visited_at` with the insertion time.
    async fn insert_visit(&self, visit: &NewVisit) -> Result<()>;

    /// Newest-first visits since `since` with both coordinates present.
    async fn geo_visits_since(&self, since: DateTime<Utc>, limit: usize)
        -> Result<Vec<MapPoint>>;

    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64>;

    /// Every non-null country since `since` with its visit count.
    async fn country_counts_since(&self, since: DateTime<Utc>) -> Result<Vec<CountRow>>;

    async fn page_counts_since(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<CountRow>>;

    /// Referrer counts with absent referrers grouped under [`DIRECT_REFERRER`].
    async fn referrer_counts_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CountRow>>;

    /// Raw user-agent strings (empty for none) with their visit counts.
    async fn user_agent_counts_since(&self, since: DateTime<Utc>) -> Result<Vec<CountRow>>;

    /// Visit counts per UTC minute since `since`, in no particular order.
    async fn minute_counts_since(&self, since: DateTime<Utc>) -> Result<Vec<MinuteCount>>;

    /// The `limit` most recent visits, newest first.
    async fn recent_visits(&self, limit: usize) -> Result<Vec<StoredVisit>>;
}
