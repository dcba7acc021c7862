/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// Every statement uses `IF NOT EXISTS`, so re-running it on each startup is
/// a no-op.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `FOOTFALL_DUCKDB_MEMORY`, default `"1GB"`). Always set an explicit
/// limit: the DuckDB default of 80% of system RAM is not acceptable for a
/// server process.
///
/// `site_visitors` is an append-only fact table. `visited_at` is stored as a
/// naive UTC `TIMESTAMP` written by the backend at insertion time and is the
/// only ordering key, hence the index.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

CREATE TABLE IF NOT EXISTS site_visitors (
    ip              VARCHAR NOT NULL,
    city            VARCHAR,
    region          VARCHAR,
    country         VARCHAR,                 -- ISO code from the edge, NULL when unknown
    latitude        DOUBLE,
    longitude       DOUBLE,
    page            VARCHAR NOT NULL,
    user_agent      VARCHAR NOT NULL DEFAULT '',  -- truncated to 500 chars
    referrer        VARCHAR,                 -- NULL means direct traffic
    visited_at      TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_site_visitors_visited_at ON site_visitors(visited_at);
"#
    )
}
