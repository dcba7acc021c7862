//! The visitor snapshot served to the dashboard.
//!
//! Every call re-reads the store; nothing is cached. Each part of the
//! snapshot comes from its own store query and a failing query degrades only
//! its own part to the empty value, so a store that is down yields the
//! all-empty snapshot instead of an error.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::classify::{BrowserClass, DeviceClass};
use crate::store::{CountRow, MapPoint, MinuteCount, VisitStore};
use crate::visit::StoredVisit;
use crate::window::{CalendarZone, TimeWindows};

pub const MAP_POINT_LIMIT: usize = 200;
pub const TOP_PAGES_LIMIT: usize = 10;
pub const TOP_REFERRERS_LIMIT: usize = 10;
pub const RECENT_DETAILED_LIMIT: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorSnapshot {
    pub visitors: Vec<MapPoint>,
    pub stats: VisitorStats,
    pub country_breakdown: Vec<CountryCount>,
    /// Indexed by hour of day on the configured calendar.
    pub hourly_data: [i64; 24],
    pub referrer_breakdown: Vec<ReferrerCount>,
    pub device_breakdown: Vec<DeviceCount>,
    pub recent_detailed: Vec<DetailedVisit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorStats {
    pub total_today: i64,
    pub total_week: i64,
    pub unique_countries: i64,
    pub active_now: i64,
    pub top_pages: Vec<PageCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageCount {
    pub page: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryCount {
    pub country: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferrerCount {
    pub referrer: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceCount {
    pub device: DeviceClass,
    pub count: i64,
}

/// A stored visit annotated with its derived device and browser.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedVisit {
    pub ip: String,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub page: String,
    pub user_agent: String,
    pub referrer: Option<String>,
    pub visited_at: DateTime<Utc>,
    pub device: DeviceClass,
    pub browser: BrowserClass,
}

impl From<StoredVisit> for DetailedVisit {
    fn from(stored: StoredVisit) -> Self {
        let device = DeviceClass::classify(&stored.visit.user_agent);
        let browser = BrowserClass::classify(&stored.visit.user_agent);
        let v = stored.visit;
        Self {
            ip: v.ip,
            city: v.city,
            region: v.region,
            country: v.country,
            latitude: v.latitude,
            longitude: v.longitude,
            page: v.page,
            user_agent: v.user_agent,
            referrer: v.referrer,
            visited_at: stored.visited_at,
            device,
            browser,
        }
    }
}

/// Assemble the dashboard snapshot as of `now`.
///
/// Never fails. A sub-query error is logged and replaced by that part's
/// empty value.
pub async fn build_snapshot(
    store: &dyn VisitStore,
    now: DateTime<Utc>,
    zone: CalendarZone,
) -> VisitorSnapshot {
    let w = TimeWindows::at(now, zone);

    let visitors = or_empty(
        "map_points",
        store.geo_visits_since(w.recent_since, MAP_POINT_LIMIT).await,
    );
    let total_today = or_empty("total_today", store.count_since(w.today_start).await);
    let total_week = or_empty("total_week", store.count_since(w.week_since).await);
    let active_now = or_empty("active_now", store.count_since(w.active_since).await);

    let countries = rank(
        or_empty("countries", store.country_counts_since(w.today_start).await),
        usize::MAX,
    );
    let top_pages = rank(
        or_empty(
            "top_pages",
            store.page_counts_since(w.today_start, TOP_PAGES_LIMIT).await,
        ),
        TOP_PAGES_LIMIT,
    );
    let minutes = or_empty("hourly", store.minute_counts_since(w.day_since).await);
    let referrers = rank(
        or_empty(
            "referrers",
            store
                .referrer_counts_since(w.today_start, TOP_REFERRERS_LIMIT)
                .await,
        ),
        TOP_REFERRERS_LIMIT,
    );
    let agents = or_empty("devices", store.user_agent_counts_since(w.today_start).await);
    let recent = or_empty(
        "recent_detailed",
        store.recent_visits(RECENT_DETAILED_LIMIT).await,
    );

    VisitorSnapshot {
        visitors,
        stats: VisitorStats {
            total_today,
            total_week,
            unique_countries: countries.len() as i64,
            active_now,
            top_pages: top_pages
                .into_iter()
                .map(|r| PageCount {
                    page: r.value,
                    count: r.count,
                })
                .collect(),
        },
        country_breakdown: countries
            .into_iter()
            .map(|r| CountryCount {
                country: r.value,
                count: r.count,
            })
            .collect(),
        hourly_data: hourly_histogram(&minutes, zone),
        referrer_breakdown: referrers
            .into_iter()
            .map(|r| ReferrerCount {
                referrer: r.value,
                count: r.count,
            })
            .collect(),
        device_breakdown: device_breakdown(&agents),
        recent_detailed: recent.into_iter().map(DetailedVisit::from).collect(),
    }
}

fn or_empty<T: Default>(part: &'static str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        warn!(part, error = %e, "Visitor snapshot query failed, reporting empty");
        T::default()
    })
}

/// Stable sort by count descending, then truncate.
fn rank(mut rows: Vec<CountRow>, limit: usize) -> Vec<CountRow> {
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows.truncate(limit);
    rows
}

/// Clock-hour histogram: each minute's visits land in the slot of its hour
/// of day, so 15:xx yesterday and 15:xx today share slot 15.
pub fn hourly_histogram(minutes: &[MinuteCount], zone: CalendarZone) -> [i64; 24] {
    let mut buckets = [0_i64; 24];
    for m in minutes {
        let hour = zone.hour_of(m.minute) as usize;
        if let Some(slot) = buckets.get_mut(hour) {
            *slot += m.count;
        }
    }
    buckets
}

/// Fold per-user-agent counts into per-device counts, count descending with
/// ties in classifier order. Classes with no visits are omitted.
pub fn device_breakdown(agents: &[CountRow]) -> Vec<DeviceCount> {
    let mut totals = [0_i64; DeviceClass::ALL.len()];
    for row in agents {
        let class = DeviceClass::classify(&row.value);
        if let Some(slot) = totals.get_mut(class.rank()) {
            *slot += row.count;
        }
    }
    let mut out: Vec<DeviceCount> = DeviceClass::ALL
        .iter()
        .zip(totals)
        .filter(|(_, count)| *count > 0)
        .map(|(device, count)| DeviceCount {
            device: *device,
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visit::NewVisit;
    use anyhow::anyhow;
    use async_trait::async_trait;

    fn ts(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    struct FailingStore;

    #[async_trait]
    impl VisitStore for FailingStore {
        async fn insert_visit(&self, _: &NewVisit) -> Result<()> {
            Err(anyhow!("store unreachable"))
        }
        async fn geo_visits_since(&self, _: DateTime<Utc>, _: usize) -> Result<Vec<MapPoint>> {
            Err(anyhow!("store unreachable"))
        }
        async fn count_since(&self, _: DateTime<Utc>) -> Result<i64> {
            Err(anyhow!("store unreachable"))
        }
        async fn country_counts_since(&self, _: DateTime<Utc>) -> Result<Vec<CountRow>> {
            Err(anyhow!("store unreachable"))
        }
        async fn page_counts_since(&self, _: DateTime<Utc>, _: usize) -> Result<Vec<CountRow>> {
            Err(anyhow!("store unreachable"))
        }
        async fn referrer_counts_since(
            &self,
            _: DateTime<Utc>,
            _: usize,
        ) -> Result<Vec<CountRow>> {
            Err(anyhow!("store unreachable"))
        }
        async fn user_agent_counts_since(&self, _: DateTime<Utc>) -> Result<Vec<CountRow>> {
            Err(anyhow!("store unreachable"))
        }
        async fn minute_counts_since(&self, _: DateTime<Utc>) -> Result<Vec<MinuteCount>> {
            Err(anyhow!("store unreachable"))
        }
        async fn recent_visits(&self, _: usize) -> Result<Vec<StoredVisit>> {
            Err(anyhow!("store unreachable"))
        }
    }

    /// Answers counts and countries; every other query fails.
    struct HalfBrokenStore;

    #[async_trait]
    impl VisitStore for HalfBrokenStore {
        async fn insert_visit(&self, _: &NewVisit) -> Result<()> {
            Ok(())
        }
        async fn geo_visits_since(&self, _: DateTime<Utc>, _: usize) -> Result<Vec<MapPoint>> {
            Err(anyhow!("timeout"))
        }
        async fn count_since(&self, _: DateTime<Utc>) -> Result<i64> {
            Ok(4)
        }
        async fn country_counts_since(&self, _: DateTime<Utc>) -> Result<Vec<CountRow>> {
            // Deliberately unsorted.
            Ok(vec![CountRow::new("CA", 3), CountRow::new("US", 7)])
        }
        async fn page_counts_since(&self, _: DateTime<Utc>, _: usize) -> Result<Vec<CountRow>> {
            Ok((0..15).map(|i| CountRow::new(format!("/p{i}"), i)).collect())
        }
        async fn referrer_counts_since(
            &self,
            _: DateTime<Utc>,
            _: usize,
        ) -> Result<Vec<CountRow>> {
            Err(anyhow!("timeout"))
        }
        async fn user_agent_counts_since(&self, _: DateTime<Utc>) -> Result<Vec<CountRow>> {
            Err(anyhow!("timeout"))
        }
        async fn minute_counts_since(&self, _: DateTime<Utc>) -> Result<Vec<MinuteCount>> {
            Err(anyhow!("timeout"))
        }
        async fn recent_visits(&self, _: usize) -> Result<Vec<StoredVisit>> {
            Err(anyhow!("timeout"))
        }
    }

    #[tokio::test]
    async fn failing_store_yields_empty_shape() {
        let snapshot = build_snapshot(&FailingStore, Utc::now(), CalendarZone::utc()).await;
        assert_eq!(snapshot, VisitorSnapshot::default());

        let json = serde_json::to_value(&snapshot).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "visitors": [],
                "stats": {
                    "totalToday": 0,
                    "totalWeek": 0,
                    "uniqueCountries": 0,
                    "activeNow": 0,
                    "topPages": []
                },
                "countryBreakdown": [],
                "hourlyData": [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                               0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                "referrerBreakdown": [],
                "deviceBreakdown": [],
                "recentDetailed": []
            })
        );
    }

    #[tokio::test]
    async fn partial_failure_keeps_successful_parts() {
        let snapshot = build_snapshot(&HalfBrokenStore, Utc::now(), CalendarZone::utc()).await;

        assert!(snapshot.visitors.is_empty());
        assert!(snapshot.referrer_breakdown.is_empty());
        assert_eq!(snapshot.hourly_data, [0; 24]);
        assert_eq!(snapshot.stats.total_today, 4);
        assert_eq!(snapshot.stats.active_now, 4);
        assert_eq!(snapshot.stats.unique_countries, 2);
        assert_eq!(
            snapshot.country_breakdown,
            vec![
                CountryCount {
                    country: "US".to_string(),
                    count: 7
                },
                CountryCount {
                    country: "CA".to_string(),
                    count: 3
                },
            ]
        );
        assert_eq!(snapshot.stats.top_pages.len(), TOP_PAGES_LIMIT);
        assert_eq!(snapshot.stats.top_pages[0].page, "/p14");
    }

    #[test]
    fn histogram_buckets_by_clock_hour_across_days() {
        let minutes = vec![
            MinuteCount::new(ts("2026-03-09T16:45:00Z"), 2), // yesterday, hour 16
            MinuteCount::new(ts("2026-03-10T16:10:00Z"), 1), // today, hour 16
            MinuteCount::new(ts("2026-03-10T00:05:00Z"), 1),
            MinuteCount::new(ts("2026-03-09T23:59:00Z"), 4),
        ];
        let buckets = hourly_histogram(&minutes, CalendarZone::utc());
        assert_eq!(buckets[16], 3);
        assert_eq!(buckets[0], 1);
        assert_eq!(buckets[23], 4);
        assert_eq!(buckets.iter().sum::<i64>(), 8);
    }

    #[test]
    fn histogram_uses_minutes_for_half_hour_zones() {
        // Kolkata is UTC+05:30: 10:29 UTC is 15:59 local, 10:30 UTC is 16:00.
        let zone = CalendarZone::Fixed(chrono_tz::Asia::Kolkata);
        let minutes = vec![
            MinuteCount::new(ts("2026-03-10T10:29:00Z"), 1),
            MinuteCount::new(ts("2026-03-10T10:30:00Z"), 2),
        ];
        let buckets = hourly_histogram(&minutes, zone);
        assert_eq!(buckets[15], 1);
        assert_eq!(buckets[16], 2);
    }

    #[test]
    fn device_breakdown_merges_agents_per_class() {
        let agents = vec![
            CountRow::new("Mozilla/5.0 (iPad; CPU OS 17_1 like Mac OS X) Mobile/15E148", 2),
            CountRow::new("Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) Mobile", 1),
            CountRow::new("Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile Safari", 2),
            CountRow::new("Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0", 1),
            CountRow::new("", 1),
        ];
        let breakdown = device_breakdown(&agents);
        assert_eq!(
            breakdown,
            vec![
                DeviceCount {
                    device: DeviceClass::Mobile,
                    count: 3
                },
                DeviceCount {
                    device: DeviceClass::Tablet,
                    count: 2
                },
                DeviceCount {
                    device: DeviceClass::Desktop,
                    count: 1
                },
                DeviceCount {
                    device: DeviceClass::Unknown,
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn detailed_visit_is_annotated() {
        let mut visit = NewVisit::new(
            "1.2.3.4",
            "/pricing",
            "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
            None,
        );
        visit.country = Some("DE".to_string());
        let detailed = DetailedVisit::from(StoredVisit {
            visit,
            visited_at: ts("2026-03-10T10:00:00Z"),
        });
        assert_eq!(detailed.device, DeviceClass::Desktop);
        assert_eq!(detailed.browser, BrowserClass::Firefox);

        let json = serde_json::to_value(&detailed).expect("serialize");
        assert_eq!(json["device"], "Desktop");
        assert_eq!(json["browser"], "Firefox");
        assert_eq!(json["userAgent"].as_str().map(|s| s.contains("Firefox")), Some(true));
        assert_eq!(json["referrer"], serde_json::Value::Null);
    }
}
