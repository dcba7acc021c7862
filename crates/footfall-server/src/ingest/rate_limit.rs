use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Per-IP "recorded recently" cache.
///
/// Key: client IP string. Value: the instant a visit from that IP was last
/// recorded. An IP is recorded at most once per `window`; requests inside the
/// window still proceed, they are just not recorded.
///
/// The map is bounded by `max_entries`. Entries are evicted by the periodic
/// [`RateLimiter::sweep`] and, when a new IP arrives at a full map, by
/// dropping expired entries and then the oldest one if still full. Both walk
/// a recording-order queue from the front, so eviction never scans the map.
///
/// Best effort only: the map lives in process memory and is lost on restart.
pub struct RateLimiter {
    window: Duration,
    max_entries: usize,
    entries: Mutex<Entries>,
}

#[derive(Default)]
struct Entries {
    last_recorded: HashMap<String, Instant>,
    /// Every mark in recording order. A queued mark whose instant no longer
    /// matches `last_recorded` is stale and skipped.
    order: VecDeque<(String, Instant)>,
}

impl Entries {
    fn mark(&mut self, ip: &str, now: Instant) {
        self.last_recorded.insert(ip.to_string(), now);
        self.order.push_back((ip.to_string(), now));
    }

    /// Pop stale and expired marks off the front. Returns the number of IPs
    /// removed.
    fn evict_expired(&mut self, now: Instant, window: Duration) -> usize {
        let mut removed = 0;
        while let Some((ip, at)) = self.order.front() {
            match self.last_recorded.get(ip) {
                Some(last) if last == at => {
                    if now.saturating_duration_since(*at) < window {
                        break;
                    }
                    self.last_recorded.remove(ip);
                    removed += 1;
                }
                _ => {}
            }
            self.order.pop_front();
        }
        removed
    }

    fn evict_oldest(&mut self) {
        while let Some((ip, at)) = self.order.pop_front() {
            if self.last_recorded.get(&ip) == Some(&at) {
                self.last_recorded.remove(&ip);
                return;
            }
        }
    }
}

impl RateLimiter {
    pub fn new(window: Duration, max_entries: usize) -> Self {
        Self {
            window,
            max_entries: max_entries.max(1),
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Return `true` if a visit from `ip` should be recorded now, marking it
    /// as recorded. Returns `false` while the previous record is younger than
    /// the window.
    pub async fn check_and_mark(&self, ip: &str) -> bool {
        self.check_and_mark_at(ip, Instant::now()).await
    }

    pub async fn check_and_mark_at(&self, ip: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock().await;

        if let Some(last) = entries.last_recorded.get(ip) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
            entries.mark(ip, now);
            return true;
        }

        if entries.last_recorded.len() >= self.max_entries {
            entries.evict_expired(now, self.window);
            if entries.last_recorded.len() >= self.max_entries {
                entries.evict_oldest();
            }
        }
        entries.mark(ip, now);
        true
    }

    /// Drop every entry that no longer suppresses recording. Returns the
    /// number of entries removed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    pub async fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock().await;
        entries.evict_expired(now, self.window)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.last_recorded.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
