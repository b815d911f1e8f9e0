use crate::storage::LedgerStorage;
use async_trait::async_trait;
use aura_types::{
    AuraError, DimensionScores, RatingEntry, RatingId, Result, Scope, TargetRef, UserId,
    LIFETIME_BUDGET, MAX_ABS_POINTS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Resolves whether a target exists within a scope and whether a rater is
/// allowed to rate in it. Implemented over the group and identity stores by
/// the node wiring; the ledger itself stays ignorant of those crates.
#[async_trait]
pub trait TargetResolver: Send + Sync {
    /// `Ok(None)` when the target does not exist in the scope; otherwise
    /// `Ok(Some(display_name))`, where the display name itself is optional.
    async fn resolve_target(
        &self,
        scope: &Scope,
        target: &TargetRef,
    ) -> anyhow::Result<Option<Option<String>>>;

    /// Whether `rater` may write into `scope` (group membership; always
    /// true for the direct scope).
    async fn rater_in_scope(&self, scope: &Scope, rater: &UserId) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_entries: usize,
    pub total_absolute_points: i64,
    pub unique_raters: usize,
}

/// Owns the append-only store of point transfers and enforces the spend
/// cap and the at-most-one-edge-per-pair rule.
pub struct LedgerManager {
    storage: Arc<dyn LedgerStorage>,
    resolver: Arc<dyn TargetResolver>,
    // Serializes every read-validate-write sequence. Two concurrent
    // submissions from one rater must not both pass a budget check
    // computed from the same stale read.
    write_lock: Mutex<()>,
}

impl LedgerManager {
    pub fn new(storage: Arc<dyn LedgerStorage>, resolver: Arc<dyn TargetResolver>) -> Self {
        Self {
            storage,
            resolver,
            write_lock: Mutex::new(()),
        }
    }

    /// Validate and append one transfer. Checks run in order: target
    /// resolvable → membership → no self-target → bound → duplicate edge →
    /// projected budget. The first failure rejects without a write.
    pub async fn submit(
        &self,
        from: UserId,
        scope: Scope,
        target: TargetRef,
        points: i64,
        reason: Option<String>,
        dimensions: DimensionScores,
    ) -> Result<RatingEntry> {
        let _guard = self.write_lock.lock().await;

        let target_name = self
            .resolver
            .resolve_target(&scope, &target)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?
            .ok_or_else(|| AuraError::TargetNotFound(target.to_string()))?;

        let member = self
            .resolver
            .rater_in_scope(&scope, &from)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        if !member {
            return Err(AuraError::NotAMember(scope.to_string()));
        }

        if target.as_user() == Some(&from) {
            return Err(AuraError::SelfTarget);
        }

        if points == 0 {
            return Err(AuraError::OutOfBounds("points must be non-zero".to_string()));
        }
        // checked_abs: i64::MIN has no positive counterpart and must not
        // wrap past the bound check.
        let magnitude = points
            .checked_abs()
            .filter(|m| *m <= MAX_ABS_POINTS)
            .ok_or_else(|| {
                AuraError::OutOfBounds(format!("points {} outside ±{}", points, MAX_ABS_POINTS))
            })?;

        // Group ratings may arrive pre-composed from per-dimension
        // sub-scores; when the breakdown is present it must agree with
        // the recorded total.
        if !dimensions.is_empty() {
            let sum: i64 = dimensions.values().sum();
            if sum != points {
                return Err(AuraError::OutOfBounds(format!(
                    "dimension sum {} disagrees with points {}",
                    sum, points
                )));
            }
        }

        let id = RatingId::derive(&scope, &from, &target);
        if self
            .storage
            .get(&id)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?
            .is_some()
        {
            debug!(id = %id, from = %from, target = %target, "Duplicate edge rejected");
            return Err(AuraError::DuplicateEdge);
        }

        let spent = self.spent(&from).await?;
        if spent + magnitude > LIFETIME_BUDGET {
            warn!(
                from = %from,
                spent = spent,
                requested = magnitude,
                budget = LIFETIME_BUDGET,
                "Budget exceeded"
            );
            return Err(AuraError::BudgetExceeded {
                spent,
                requested: magnitude,
            });
        }

        let entry = RatingEntry::new(scope, from, target, points, reason, dimensions, target_name);
        self.storage
            .append(entry.clone())
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;

        info!(
            id = %entry.id,
            scope = %entry.scope,
            from = %entry.from,
            target = %entry.target,
            points = entry.points,
            remaining = LIFETIME_BUDGET - spent - magnitude,
            "✅ Rating accepted"
        );
        Ok(entry)
    }

    /// Total absolute spend across every scope. The budget is one lifetime
    /// pool per rater, not per group, and is always recomputed from the
    /// ledger rather than kept as a second counter that can drift.
    pub async fn spent(&self, rater: &UserId) -> Result<i64> {
        let entries = self
            .storage
            .by_rater(rater)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        Ok(entries.iter().map(|e| e.points.abs()).sum())
    }

    pub async fn remaining(&self, rater: &UserId) -> Result<i64> {
        Ok(LIFETIME_BUDGET - self.spent(rater).await?)
    }

    /// Entries within a scope, ordered by server-assigned timestamp. The
    /// ordering is for display only; no invariant depends on it.
    pub async fn entries_for_scope(&self, scope: &Scope) -> Result<Vec<RatingEntry>> {
        let mut entries = self
            .storage
            .by_scope(scope)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    pub async fn all_entries(&self) -> Result<Vec<RatingEntry>> {
        let mut entries = self
            .storage
            .all()
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    pub async fn entries_by_rater(&self, rater: &UserId) -> Result<Vec<RatingEntry>> {
        let mut entries = self
            .storage
            .by_rater(rater)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    /// Entries addressed to one resolved identity, across all scopes.
    pub async fn received_count(&self, target: &UserId) -> Result<usize> {
        let entries = self
            .storage
            .all()
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        Ok(entries
            .iter()
            .filter(|e| e.target.as_user() == Some(target))
            .count())
    }

    /// Cardinality of distinct raters within a scope; feeds the
    /// voter-threshold closure condition.
    pub async fn unique_voter_count(&self, scope: &Scope) -> Result<usize> {
        let entries = self.entries_for_scope(scope).await?;
        let voters: HashSet<&UserId> = entries.iter().map(|e| &e.from).collect();
        Ok(voters.len())
    }

    /// Rewrite every entry in `scope` addressed to the synthetic id for
    /// `(scope, index)` so it targets `user_id` instead. Idempotent:
    /// already-migrated entries no longer match the synthetic id and are
    /// untouched, so a retry after a partial failure converges.
    pub async fn migrate_slot_entries(
        &self,
        scope: &Scope,
        index: usize,
        user_id: &UserId,
        display_name: Option<&str>,
    ) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let synthetic = TargetRef::slot(scope.clone(), index);
        let entries = self
            .storage
            .by_scope(scope)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;

        let mut migrated = 0usize;
        for entry in entries {
            if entry.target != synthetic {
                continue;
            }
            let old_id = entry.id;
            let mut rewritten = entry;
            rewritten.readdress(user_id.clone(), display_name.map(str::to_owned));
            self.storage
                .replace(old_id, rewritten)
                .await
                .map_err(|e| AuraError::Storage(e.to_string()))?;
            migrated += 1;
        }

        if migrated > 0 {
            info!(
                scope = %scope,
                slot = index,
                user = %user_id,
                migrated = migrated,
                "✅ Slot ratings migrated"
            );
        }
        Ok(migrated)
    }

    pub async fn stats(&self) -> Result<LedgerStats> {
        let entries = self.all_entries().await?;
        let raters: HashSet<&UserId> = entries.iter().map(|e| &e.from).collect();
        Ok(LedgerStats {
            total_entries: entries.len(),
            total_absolute_points: entries.iter().map(|e| e.points.abs()).sum(),
            unique_raters: raters.len(),
        })
    }
}
