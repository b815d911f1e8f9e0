use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

/// Default time-to-live for the global leaderboard cache. Staleness up to
/// this bound is accepted: per-group views and budget checks always read
/// the live ledger.
pub const LEADERBOARD_TTL_SECS: i64 = 60;

/// Process-wide `(value, computed_at)` cache with a freshness check.
/// Global scope only, replaced wholesale on recompute, invalidated by time
/// alone, never by events.
pub struct LeaderboardCache<T> {
    slot: RwLock<Option<(T, DateTime<Utc>)>>,
    ttl: Duration,
}

impl<T: Clone> LeaderboardCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(Duration::seconds(LEADERBOARD_TTL_SECS))
    }

    pub async fn get_fresh(&self, now: DateTime<Utc>) -> Option<T> {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some((value, computed_at)) if now - *computed_at < self.ttl => {
                debug!(age_secs = (now - *computed_at).num_seconds(), "Leaderboard cache hit");
                Some(value.clone())
            }
            _ => None,
        }
    }

    pub async fn store(&self, value: T, computed_at: DateTime<Utc>) {
        let mut slot = self.slot.write().await;
        *slot = Some((value, computed_at));
    }
}
