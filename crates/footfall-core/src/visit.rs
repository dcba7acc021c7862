use chrono::{DateTime, Utc};

/// Maximum number of characters kept from the `User-Agent` and `Referer`
/// headers before a visit is stored.
pub const MAX_HEADER_CHARS: usize = 500;

/// A visit as produced by the ingestion layer, before the store stamps it.
///
/// `visited_at` is deliberately absent: the store sets it at insertion time
/// and it is the only ordering key the aggregator uses.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVisit {
    pub ip: String,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub page: String,
    /// Empty when the request carried no `User-Agent`.
    pub user_agent: String,
    /// `None` means direct traffic.
    pub referrer: Option<String>,
}

impl NewVisit {
    /// Build a visit for `page`, truncating the free-text header values.
    ///
    /// An empty referrer is normalised to `None`.
    pub fn new(
        ip: impl Into<String>,
        page: impl Into<String>,
        user_agent: &str,
        referrer: Option<&str>,
    ) -> Self {
        Self {
            ip: ip.into(),
            city: None,
            region: None,
            country: None,
            latitude: None,
            longitude: None,
            page: page.into(),
            user_agent: truncate_chars(user_agent, MAX_HEADER_CHARS),
            referrer: referrer
                .filter(|r| !r.is_empty())
                .map(|r| truncate_chars(r, MAX_HEADER_CHARS)),
        }
    }

    /// `true` when both coordinates are present, i.e. the visit can be placed
    /// on the live map.
    pub fn is_geolocated(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// A visit read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVisit {
    pub visit: NewVisit,
    pub visited_at: DateTime<Utc>,
}

/// Truncate `value` to at most `max` characters without splitting a UTF-8
/// sequence.
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}
