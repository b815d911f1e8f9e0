use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    pub ratings_accepted: IntCounter,
    pub ratings_rejected: IntCounterVec,
    pub groups_created: IntCounter,
    pub slots_claimed: IntCounter,
    pub entries_migrated: IntCounter,
    pub counter_adjustments: IntCounter,
    pub leaderboard_cache_hits: IntCounter,
    pub leaderboard_cache_misses: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let ratings_accepted =
            IntCounter::new("aura_ratings_accepted_total", "Accepted rating submissions").unwrap();
        let ratings_rejected = IntCounterVec::new(
            Opts::new("aura_ratings_rejected_total", "Rejected rating submissions"),
            &["kind"],
        )
        .unwrap();
        let groups_created =
            IntCounter::new("aura_groups_created_total", "Groups created").unwrap();
        let slots_claimed = IntCounter::new("aura_slots_claimed_total", "Slots claimed").unwrap();
        let entries_migrated = IntCounter::new(
            "aura_entries_migrated_total",
            "Ledger entries re-addressed by slot claims",
        )
        .unwrap();
        let counter_adjustments =
            IntCounter::new("aura_counter_adjustments_total", "Counter adjust calls").unwrap();
        let leaderboard_cache_hits = IntCounter::new(
            "aura_leaderboard_cache_hits_total",
            "Global leaderboard served from cache",
        )
        .unwrap();
        let leaderboard_cache_misses = IntCounter::new(
            "aura_leaderboard_cache_misses_total",
            "Global leaderboard recomputed",
        )
        .unwrap();

        registry.register(Box::new(ratings_accepted.clone())).unwrap();
        registry.register(Box::new(ratings_rejected.clone())).unwrap();
        registry.register(Box::new(groups_created.clone())).unwrap();
        registry.register(Box::new(slots_claimed.clone())).unwrap();
        registry.register(Box::new(entries_migrated.clone())).unwrap();
        registry.register(Box::new(counter_adjustments.clone())).unwrap();
        registry
            .register(Box::new(leaderboard_cache_hits.clone()))
            .unwrap();
        registry
            .register(Box::new(leaderboard_cache_misses.clone()))
            .unwrap();

        Self {
            registry: Arc::new(registry),
            ratings_accepted,
            ratings_rejected,
            groups_created,
            slots_claimed,
            entries_migrated,
            counter_adjustments,
            leaderboard_cache_hits,
            leaderboard_cache_misses,
        }
    }

    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        encoder.encode_to_string(&families).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
