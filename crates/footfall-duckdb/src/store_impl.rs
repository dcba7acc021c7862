use async_trait::async_trait;
use chrono::{DateTime, Utc};

use footfall_core::store::{CountRow, MapPoint, MinuteCount, VisitStore};
use footfall_core::visit::{NewVisit, StoredVisit};

use crate::DuckDbBackend;

#[async_trait]
impl VisitStore for DuckDbBackend {
    async fn insert_visit(&self, visit: &NewVisit) -> anyhow::Result<()> {
        self.insert_visit_at(visit, Utc::now()).await
    }

    async fn geo_visits_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<MapPoint>> {
        DuckDbBackend::geo_visits_since(self, since, limit).await
    }

    async fn count_since(&self, since: DateTime<Utc>) -> anyhow::Result<i64> {
        DuckDbBackend::count_since(self, since).await
    }

    async fn country_counts_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<CountRow>> {
        DuckDbBackend::country_counts_since(self, since).await
    }

    async fn page_counts_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<CountRow>> {
        DuckDbBackend::page_counts_since(self, since, limit).await
    }

    async fn referrer_counts_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<CountRow>> {
        DuckDbBackend::referrer_counts_since(self, since, limit).await
    }

    async fn user_agent_counts_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<CountRow>> {
        DuckDbBackend::user_agent_counts_since(self, since).await
    }

    async fn minute_counts_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<MinuteCount>> {
        DuckDbBackend::minute_counts_since(self, since).await
    }

    async fn recent_visits(&self, limit: usize) -> anyhow::Result<Vec<StoredVisit>> {
        DuckDbBackend::recent_visits(self, limit).await
    }
}
