//! First-match-wins rule tables over user agents and request paths.
//!
//! Rule order is part of the contract. Real user agents routinely match more
//! than one rule (iPad agents carry `Mobile/`, Edge and Opera agents carry
//! `Chrome/` and `Safari/`), so the first matching rule decides.

use serde::Serialize;

/// A single substring predicate.
#[derive(Debug, Clone, Copy)]
enum Match {
    /// Haystack contains at least one of the needles.
    Any(&'static [&'static str]),
    /// Haystack contains the first needle and not the second.
    Without(&'static str, &'static str),
}

impl Match {
    fn matches(self, haystack: &str) -> bool {
        match self {
            Match::Any(needles) => needles.iter().any(|n| haystack.contains(n)),
            Match::Without(needle, excluded) => {
                haystack.contains(needle) && !haystack.contains(excluded)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceClass {
    Tablet,
    Mobile,
    Desktop,
    Unknown,
}

/// Evaluated against the lowercased user agent. Tablet rules come first.
const DEVICE_RULES: &[(DeviceClass, Match)] = &[
    (
        DeviceClass::Tablet,
        Match::Any(&["ipad", "tablet", "kindle", "silk/", "playbook"]),
    ),
    (DeviceClass::Tablet, Match::Without("android", "mobile")),
    (
        DeviceClass::Mobile,
        Match::Any(&[
            "mobi",
            "iphone",
            "ipod",
            "android",
            "blackberry",
            "opera mini",
            "iemobile",
            "windows phone",
        ]),
    ),
];

impl DeviceClass {
    /// Every class in classifier order. Also the tie-break order for
    /// breakdowns with equal counts.
    pub const ALL: [DeviceClass; 4] = [
        DeviceClass::Tablet,
        DeviceClass::Mobile,
        DeviceClass::Desktop,
        DeviceClass::Unknown,
    ];

    /// Classify a user agent. An empty agent is `Unknown`; an agent that
    /// matches no rule is `Desktop`.
    pub fn classify(user_agent: &str) -> Self {
        let ua = user_agent.trim();
        if ua.is_empty() {
            return DeviceClass::Unknown;
        }
        let ua = ua.to_ascii_lowercase();
        DEVICE_RULES
            .iter()
            .find(|(_, rule)| rule.matches(&ua))
            .map(|(class, _)| *class)
            .unwrap_or(DeviceClass::Desktop)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Tablet => "Tablet",
            DeviceClass::Mobile => "Mobile",
            DeviceClass::Desktop => "Desktop",
            DeviceClass::Unknown => "Unknown",
        }
    }

    pub(crate) fn rank(self) -> usize {
        Self::ALL.iter().position(|c| *c == self).unwrap_or(Self::ALL.len())
    }
}

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BrowserClass {
    Firefox,
    Edge,
    Opera,
    Chrome,
    Safari,
    Other,
}

/// Evaluated case-sensitively against product tokens. `Edg` covers `Edge/`,
/// `Edg/`, `EdgA/` and `EdgiOS/`.
const BROWSER_RULES: &[(BrowserClass, Match)] = &[
    (BrowserClass::Firefox, Match::Any(&["Firefox"])),
    (BrowserClass::Edge, Match::Any(&["Edg"])),
    (BrowserClass::Opera, Match::Any(&["OPR/", "Opera"])),
    (BrowserClass::Chrome, Match::Without("Chrome", "Edg")),
    (BrowserClass::Safari, Match::Without("Safari", "Chrome")),
];

impl BrowserClass {
    pub fn classify(user_agent: &str) -> Self {
        BROWSER_RULES
            .iter()
            .find(|(_, rule)| rule.matches(user_agent))
            .map(|(class, _)| *class)
            .unwrap_or(BrowserClass::Other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BrowserClass::Firefox => "Firefox",
            BrowserClass::Edge => "Edge",
            BrowserClass::Opera => "Opera",
            BrowserClass::Chrome => "Chrome",
            BrowserClass::Safari => "Safari",
            BrowserClass::Other => "Other",
        }
    }
}

// ---------------------------------------------------------------------------
// Ingestion filters
// ---------------------------------------------------------------------------

/// Lowercase fragments identifying crawlers, link unfurlers and uptime
/// monitors.
const BOT_TOKENS: &[&str] = &[
    "bot",
    "crawl",
    "spider",
    "slurp",
    "facebookexternalhit",
    "linkedinbot",
    "twitterbot",
    "whatsapp",
    "telegram",
    "pingdom",
    "uptimerobot",
];

/// Case-insensitive substring match against [`BOT_TOKENS`].
pub fn is_bot(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    BOT_TOKENS.iter().any(|token| ua.contains(token))
}

/// Raw prefixes: `/apiary` and `/_nextgen` are untracked along with `/api/x`.
const UNTRACKED_PREFIXES: &[&str] = &[
    "/api",
    "/_next",
    "/favicon.ico",
    "/robots.txt",
    "/sitemap.xml",
];

/// `true` for API routes, framework internals, well-known root files and
/// any path with a `.` after the leading slash (assets, `/v1.2/notes`).
pub fn is_untracked_path(path: &str) -> bool {
    if UNTRACKED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
    {
        return true;
    }
    path.strip_prefix('/').unwrap_or(path).contains('.')
}
