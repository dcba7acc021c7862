use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// The calendar used for "today" boundaries and hour-of-day buckets.
///
/// Defaults to the server's local zone. A fixed IANA zone can be configured
/// through `FOOTFALL_TIMEZONE`; tests pin it to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarZone {
    #[default]
    ServerLocal,
    Fixed(Tz),
}

impl CalendarZone {
    pub fn utc() -> Self {
        CalendarZone::Fixed(Tz::UTC)
    }

    /// Hour of day (0–23) of `ts` on this calendar.
    pub fn hour_of(&self, ts: DateTime<Utc>) -> u32 {
        match self {
            CalendarZone::ServerLocal => ts.with_timezone(&Local).hour(),
            CalendarZone::Fixed(tz) => ts.with_timezone(tz).hour(),
        }
    }

    /// The instant the calendar day containing `now` started.
    pub fn start_of_day(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            CalendarZone::ServerLocal => local_midnight(&Local, now),
            CalendarZone::Fixed(tz) => local_midnight(tz, now),
        }
    }

    pub fn name(&self) -> String {
        match self {
            CalendarZone::ServerLocal => "local".to_string(),
            CalendarZone::Fixed(tz) => tz.name().to_string(),
        }
    }
}

fn local_midnight<Z: TimeZone>(zone: &Z, now: DateTime<Utc>) -> DateTime<Utc> {
    let day = now.with_timezone(zone).date_naive();
    let midnight: NaiveDateTime = day.and_time(chrono::NaiveTime::MIN);
    match zone.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(a, b) => a.min(b).with_timezone(&Utc),
        // Midnight skipped by a DST jump: the day starts at the first valid
        // instant, one hour later in every zone that does this.
        LocalResult::None => zone
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| midnight.and_utc()),
    }
}

/// Lower bounds of every window the aggregator reports on, all inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindows {
    pub now: DateTime<Utc>,
    /// Last 5 minutes ("active now").
    pub active_since: DateTime<Utc>,
    /// Last hour (live map points).
    pub recent_since: DateTime<Utc>,
    /// Last 24 hours (hourly histogram).
    pub day_since: DateTime<Utc>,
    /// Start of the current calendar day.
    pub today_start: DateTime<Utc>,
    /// Last 7 days.
    pub week_since: DateTime<Utc>,
}

impl TimeWindows {
    pub fn at(now: DateTime<Utc>, zone: CalendarZone) -> Self {
        Self {
            now,
            active_since: now - Duration::minutes(5),
            recent_since: now - Duration::hours(1),
            day_since: now - Duration::hours(24),
            today_start: zone.start_of_day(now),
            week_since: now - Duration::days(7),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn utc_windows() {
        let now = ts("2026-03-10T15:42:00Z");
        let w = TimeWindows::at(now, CalendarZone::utc());
        assert_eq!(w.active_since, ts("2026-03-10T15:37:00Z"));
        assert_eq!(w.recent_since, ts("2026-03-10T14:42:00Z"));
        assert_eq!(w.day_since, ts("2026-03-09T15:42:00Z"));
        assert_eq!(w.today_start, ts("2026-03-10T00:00:00Z"));
        assert_eq!(w.week_since, ts("2026-03-03T15:42:00Z"));
    }

    #[test]
    fn today_follows_configured_zone() {
        // 03:00 UTC is still the previous evening in New York (UTC-4 in June).
        let zone = CalendarZone::Fixed(chrono_tz::America::New_York);
        let now = ts("2026-06-02T03:00:00Z");
        assert_eq!(zone.start_of_day(now), ts("2026-06-01T04:00:00Z"));
        assert_eq!(zone.hour_of(now), 23);
    }

    #[test]
    fn hour_of_in_utc() {
        let zone = CalendarZone::utc();
        assert_eq!(zone.hour_of(ts("2026-03-10T00:59:59Z")), 0);
        assert_eq!(zone.hour_of(ts("2026-03-10T23:00:00Z")), 23);
    }
}
