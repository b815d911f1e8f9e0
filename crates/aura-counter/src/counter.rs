use crate::storage::{CounterRecord, CounterStorage};
use aura_types::{AuraError, ContentId, Result, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Fixed adjustment step an endorser can push a counter by.
pub const COUNTER_STEP: i64 = 100;
/// Clamp bounds for a single `(content, endorser)` counter.
pub const COUNTER_MIN: i64 = -100;
pub const COUNTER_MAX: i64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub content_id: ContentId,
    pub owner: UserId,
    pub aggregate: i64,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(content_id: ContentId, owner: UserId) -> Self {
        Self {
            content_id,
            owner,
            aggregate: 0,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of one adjust call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub new_value: i64,
    /// Effective change after clamping, which is what flows into the
    /// aggregates. Zero means the call was a no-op at a bound.
    pub delta: i64,
}

/// A lighter sibling of the rating ledger: one bounded counter per
/// `(content, endorser)` pair.
pub struct CounterManager {
    storage: Arc<dyn CounterStorage>,
    write_lock: Mutex<()>,
}

impl CounterManager {
    pub fn new(storage: Arc<dyn CounterStorage>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn register_content(&self, content_id: ContentId, owner: UserId) -> Result<ContentItem> {
        let _guard = self.write_lock.lock().await;
        if let Some(existing) = self
            .storage
            .get_content(&content_id)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?
        {
            return Ok(existing);
        }
        let item = ContentItem::new(content_id, owner);
        self.storage
            .put_content(item.clone())
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        Ok(item)
    }

    pub async fn get_content(&self, content_id: &ContentId) -> Result<ContentItem> {
        self.storage
            .get_content(content_id)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?
            .ok_or_else(|| AuraError::ContentNotFound(content_id.to_string()))
    }

    pub async fn owner_total(&self, owner: &UserId) -> Result<i64> {
        self.storage
            .owner_total(owner)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))
    }

    /// Push the pair's counter by `step`, clamped to the bounds. Applies
    /// the effective delta, not the raw step, to the content aggregate and
    /// the owner total; near a bound the clamp silently shrinks the change
    /// and the raw step would drift the aggregates out of sync.
    pub async fn adjust(
        &self,
        content_id: &ContentId,
        endorser: &UserId,
        step: i64,
    ) -> Result<Adjustment> {
        if step != COUNTER_STEP && step != -COUNTER_STEP {
            return Err(AuraError::OutOfBounds(format!(
                "step must be ±{}, got {}",
                COUNTER_STEP, step
            )));
        }

        let _guard = self.write_lock.lock().await;

        let mut item = self.get_content(content_id).await?;
        if &item.owner == endorser {
            return Err(AuraError::SelfTarget);
        }

        // Legacy duplicate records for the pair are summed and replaced by
        // the single canonical record on the way out.
        let records = self
            .storage
            .records_for_pair(content_id, endorser)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        let current: i64 = records.iter().map(|r| r.value).sum();
        if records.len() > 1 {
            debug!(
                content = %content_id,
                endorser = %endorser,
                duplicates = records.len(),
                "Consolidating legacy counter records"
            );
        }

        let new_value = (current + step).clamp(COUNTER_MIN, COUNTER_MAX);
        let delta = new_value - current;
        if delta == 0 && records.len() <= 1 {
            // At a bound already and nothing to consolidate.
            return Ok(Adjustment { new_value, delta: 0 });
        }

        self.storage
            .consolidate(CounterRecord {
                content_id: content_id.clone(),
                endorser: endorser.clone(),
                value: new_value,
                updated_at: Utc::now(),
            })
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;

        if delta != 0 {
            item.aggregate += delta;
            self.storage
                .put_content(item.clone())
                .await
                .map_err(|e| AuraError::Storage(e.to_string()))?;
            self.storage
                .add_owner_total(&item.owner, delta)
                .await
                .map_err(|e| AuraError::Storage(e.to_string()))?;
        }

        info!(
            content = %content_id,
            endorser = %endorser,
            value = new_value,
            delta = delta,
            aggregate = item.aggregate,
            "✅ Counter adjusted"
        );
        Ok(Adjustment { new_value, delta })
    }
}
