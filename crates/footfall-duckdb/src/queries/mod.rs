use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

pub mod breakdowns;
pub mod recent;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Render a UTC instant as the naive timestamp string stored in DuckDB.
pub(crate) fn ts_param(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

/// Parse `CAST(visited_at AS VARCHAR)` output back into a UTC instant.
///
/// DuckDB omits the fractional part when it is zero, hence the fallback.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|_| anyhow!("invalid_datetime: {raw}"))
}

pub(crate) fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_round_trips_with_and_without_fraction() {
        let parsed = parse_timestamp("2026-03-10 15:50:00").expect("whole seconds");
        assert_eq!(ts_param(parsed), "2026-03-10 15:50:00.000000");

        let parsed = parse_timestamp("2026-03-10 15:50:00.123456").expect("fraction");
        assert_eq!(ts_param(parsed), "2026-03-10 15:50:00.123456");
    }

    #[test]
    fn garbage_timestamp_is_an_error() {
        assert!(parse_timestamp("yesterday").is_err());
    }
}
