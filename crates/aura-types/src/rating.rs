use crate::dimension::DimensionScores;
use crate::id::{RatingId, Scope, TargetRef, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every known target is seeded at this aggregate before ledger entries
/// are applied.
pub const BASE_AURA: i64 = 500;

/// Fixed lifetime cap on a rater's total absolute point spend, shared
/// across all scopes. Positive and negative transfers consume it alike.
pub const LIFETIME_BUDGET: i64 = 10_000;

/// Per-entry bound on |points|.
pub const MAX_ABS_POINTS: i64 = 10_000;

/// The atomic unit of the ledger. Immutable once written, except for the
/// one-time re-addressing of `target` from a synthetic slot id to a real
/// identity when that slot is claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub id: RatingId,
    pub scope: Scope,
    pub from: UserId,
    pub target: TargetRef,
    pub points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "DimensionScores::is_empty")]
    pub dimensions: DimensionScores,
    /// Denormalized display name for the target at write/migration time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RatingEntry {
    pub fn new(
        scope: Scope,
        from: UserId,
        target: TargetRef,
        points: i64,
        reason: Option<String>,
        dimensions: DimensionScores,
        target_name: Option<String>,
    ) -> Self {
        let id = RatingId::derive(&scope, &from, &target);
        Self {
            id,
            scope,
            from,
            target,
            points,
            reason,
            dimensions,
            target_name,
            created_at: Utc::now(),
        }
    }

    /// Rewrite the target from a synthetic slot id to a real identity.
    /// The edge id is re-derived so duplicate detection keeps working
    /// against the resolved form.
    pub fn readdress(&mut self, user_id: UserId, display_name: Option<String>) {
        self.target = TargetRef::user(user_id);
        self.id = RatingId::derive(&self.scope, &self.from, &self.target);
        self.target_name = display_name;
    }
}
