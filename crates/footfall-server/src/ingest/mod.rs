//! Visit ingestion: the middleware that sits in front of every page request
//! and decides whether the request becomes a stored visit.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use footfall_core::{
    classify::{is_bot, is_untracked_path},
    visit::NewVisit,
};

use crate::state::AppState;

pub mod rate_limit;
pub mod recorder;

const UNKNOWN_IP: &str = "unknown";

const CITY_HEADER: &str = "x-vercel-ip-city";
const REGION_HEADER: &str = "x-vercel-ip-country-region";
const COUNTRY_HEADER: &str = "x-vercel-ip-country";
const LATITUDE_HEADER: &str = "x-vercel-ip-latitude";
const LONGITUDE_HEADER: &str = "x-vercel-ip-longitude";

/// Tracking middleware.
///
/// Records at most one visit per client IP per rate-limit window, skipping
/// asset/API paths and bot user agents. Recording never blocks or alters the
/// response: the visit is handed to the recorder and the request continues
/// unchanged whatever the outcome.
pub async fn track_visit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(visit) = admit(&state, request.uri().path(), request.headers()).await {
        let geolocated = visit.is_geolocated();
        let outcome = state.recorder.submit(visit).await;
        debug!(path = %request.uri().path(), geolocated, ?outcome, "Visit submitted");
    }
    next.run(request).await
}

/// Build the visit for a request to `path` if it should be recorded.
///
/// Filters run cheapest first and the rate limiter last, so skipped paths
/// and bots never occupy a rate-limit slot.
async fn admit(state: &AppState, path: &str, headers: &HeaderMap) -> Option<NewVisit> {
    if is_untracked_path(path) {
        return None;
    }

    let user_agent = header_str(headers, header::USER_AGENT.as_str()).unwrap_or("");
    if is_bot(user_agent) {
        return None;
    }

    let ip = client_ip(headers);
    if !state.rate_limiter.check_and_mark(&ip).await {
        return None;
    }

    let referrer = header_str(headers, header::REFERER.as_str());
    let mut visit = NewVisit::new(ip, path, user_agent, referrer);
    apply_geo(&mut visit, headers);
    Some(visit)
}

/// Resolve the client IP: `x-real-ip`, else the first `x-forwarded-for`
/// entry, else `"unknown"`. All visitors without either header share one
/// rate-limit slot.
pub fn client_ip(headers: &HeaderMap) -> String {
    header_str(headers, "x-real-ip")
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            header_str(headers, "x-forwarded-for")
                .and_then(|s| s.split(',').next())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        })
        .unwrap_or(UNKNOWN_IP)
        .to_string()
}

/// Copy the edge-provided geolocation headers onto `visit`.
///
/// The city arrives percent-encoded and is decoded, keeping the raw value if
/// decoding fails. Coordinates that do not parse as finite numbers are
/// treated as absent.
pub fn apply_geo(visit: &mut NewVisit, headers: &HeaderMap) {
    visit.city = header_str(headers, CITY_HEADER).map(|raw| {
        urlencoding::decode(raw)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| raw.to_string())
    });
    visit.region = header_str(headers, REGION_HEADER).map(str::to_string);
    visit.country = header_str(headers, COUNTRY_HEADER).map(str::to_string);
    visit.latitude = header_str(headers, LATITUDE_HEADER).and_then(parse_coordinate);
    visit.longitude = header_str(headers, LONGITUDE_HEADER).and_then(parse_coordinate);
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}
