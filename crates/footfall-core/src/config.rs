use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::CoreError;
use crate::window::CalendarZone;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub duckdb_memory_limit: String,
    /// Root of the pre-rendered site served behind the tracking layer.
    pub site_dir: String,
    pub calendar_zone: CalendarZone,
    pub rate_limit_window_secs: u64,
    pub rate_limit_sweep_secs: u64,
    pub rate_limit_max_entries: usize,
    pub recorder_max_pending: usize,
    pub recorder_flush_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            data_dir: "./data".to_string(),
            duckdb_memory_limit: "1GB".to_string(),
            site_dir: "./site".to_string(),
            calendar_zone: CalendarZone::ServerLocal,
            rate_limit_window_secs: 300,
            rate_limit_sweep_secs: 600,
            rate_limit_max_entries: 100_000,
            recorder_max_pending: 10_000,
            recorder_flush_interval_ms: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Missing keys fall back to
    /// [`Config::default`]; present but malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            port: parse_or("FOOTFALL_PORT", &lookup, defaults.port)?,
            data_dir: lookup("FOOTFALL_DATA_DIR").unwrap_or(defaults.data_dir),
            duckdb_memory_limit: lookup("FOOTFALL_DUCKDB_MEMORY")
                .unwrap_or(defaults.duckdb_memory_limit),
            site_dir: lookup("FOOTFALL_SITE_DIR").unwrap_or(defaults.site_dir),
            calendar_zone: match lookup("FOOTFALL_TIMEZONE").as_deref().map(str::trim) {
                None | Some("") | Some("local") => CalendarZone::ServerLocal,
                Some(raw) => CalendarZone::Fixed(
                    raw.parse::<Tz>()
                        .map_err(|_| CoreError::Config(format!("unknown timezone: {raw}")))?,
                ),
            },
            rate_limit_window_secs: parse_or(
                "FOOTFALL_RATE_LIMIT_WINDOW_SECS",
                &lookup,
                defaults.rate_limit_window_secs,
            )?,
            rate_limit_sweep_secs: parse_or(
                "FOOTFALL_RATE_LIMIT_SWEEP_SECS",
                &lookup,
                defaults.rate_limit_sweep_secs,
            )?
            .max(1),
            rate_limit_max_entries: parse_or(
                "FOOTFALL_RATE_LIMIT_MAX_ENTRIES",
                &lookup,
                defaults.rate_limit_max_entries,
            )?
            .max(1),
            recorder_max_pending: parse_or(
                "FOOTFALL_RECORDER_MAX_PENDING",
                &lookup,
                defaults.recorder_max_pending,
            )?
            .max(1),
            recorder_flush_interval_ms: parse_or(
                "FOOTFALL_RECORDER_FLUSH_MS",
                &lookup,
                defaults.recorder_flush_interval_ms,
            )?
            .max(10),
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn rate_limit_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_sweep_secs)
    }

    pub fn recorder_flush_interval(&self) -> Duration {
        Duration::from_millis(self.recorder_flush_interval_ms)
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CoreError::Config(format!("invalid {key}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, CoreError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = from_pairs(&[]).expect("config");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.rate_limit_window(), Duration::from_secs(300));
        assert_eq!(cfg.rate_limit_sweep_interval(), Duration::from_secs(600));
        assert_eq!(cfg.calendar_zone, CalendarZone::ServerLocal);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = from_pairs(&[
            ("FOOTFALL_PORT", "8080"),
            ("FOOTFALL_TIMEZONE", "Europe/Warsaw"),
            ("FOOTFALL_RATE_LIMIT_WINDOW_SECS", "60"),
        ])
        .expect("config");
        assert_eq!(cfg.port, 8080);
        assert_eq!(
            cfg.calendar_zone,
            CalendarZone::Fixed(chrono_tz::Europe::Warsaw)
        );
        assert_eq!(cfg.rate_limit_window_secs, 60);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(from_pairs(&[("FOOTFALL_PORT", "eighty")]).is_err());
        assert!(from_pairs(&[("FOOTFALL_TIMEZONE", "Mars/Olympus")]).is_err());
    }
}
