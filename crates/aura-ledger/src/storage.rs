use anyhow::Result;
use async_trait::async_trait;
use aura_types::{RatingEntry, RatingId, Scope, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Backing store for the rating ledger. Entries are append-only; the only
/// in-place mutation is `replace`, used by slot migration to rewrite an
/// entry under its re-derived edge id.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    async fn append(&self, entry: RatingEntry) -> Result<()>;
    async fn get(&self, id: &RatingId) -> Result<Option<RatingEntry>>;
    async fn all(&self) -> Result<Vec<RatingEntry>>;
    async fn by_scope(&self, scope: &Scope) -> Result<Vec<RatingEntry>>;
    async fn by_rater(&self, rater: &UserId) -> Result<Vec<RatingEntry>>;

    /// Remove the entry stored under `old_id` and store `entry` under its
    /// own id. Must succeed even when `old_id` is already gone, so a
    /// retried migration is a no-op.
    async fn replace(&self, old_id: RatingId, entry: RatingEntry) -> Result<()>;
}

pub struct MemoryLedgerStorage {
    entries: Arc<RwLock<HashMap<RatingId, RatingEntry>>>,
}

impl Default for MemoryLedgerStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedgerStorage {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl LedgerStorage for MemoryLedgerStorage {
    async fn append(&self, entry: RatingEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        debug!(
            id = %entry.id,
            scope = %entry.scope,
            from = %entry.from,
            target = %entry.target,
            points = entry.points,
            storage_type = "memory",
            "💾 Rating stored"
        );
        entries.insert(entry.id, entry);
        Ok(())
    }

    async fn get(&self, id: &RatingId) -> Result<Option<RatingEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.get(id).cloned())
    }

    async fn all(&self) -> Result<Vec<RatingEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.values().cloned().collect())
    }

    async fn by_scope(&self, scope: &Scope) -> Result<Vec<RatingEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|e| &e.scope == scope)
            .cloned()
            .collect())
    }

    async fn by_rater(&self, rater: &UserId) -> Result<Vec<RatingEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|e| &e.from == rater)
            .cloned()
            .collect())
    }

    async fn replace(&self, old_id: RatingId, entry: RatingEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(&old_id);
        debug!(
            old_id = %old_id,
            new_id = %entry.id,
            target = %entry.target,
            storage_type = "memory",
            "💾 Rating re-addressed"
        );
        entries.insert(entry.id, entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_types::{DimensionScores, GroupId, TargetRef};

    fn entry(from: &str, target: TargetRef) -> RatingEntry {
        RatingEntry::new(
            Scope::group(GroupId::new("g1")),
            UserId::new(from),
            target,
            100,
            None,
            DimensionScores::new(),
            None,
        )
    }

    #[tokio::test]
    async fn test_append_and_lookup() {
        let storage = MemoryLedgerStorage::new();
        let e = entry("alice", TargetRef::user(UserId::new("bob")));
        let id = e.id;
        storage.append(e.clone()).await.unwrap();

        assert_eq!(storage.get(&id).await.unwrap(), Some(e));
        assert_eq!(storage.by_rater(&UserId::new("alice")).await.unwrap().len(), 1);
        assert!(storage.by_scope(&Scope::Direct).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_tolerates_missing_old_id() {
        let storage = MemoryLedgerStorage::new();
        let mut e = entry("alice", TargetRef::slot(Scope::group(GroupId::new("g1")), 1));
        let slot_id = e.id;
        e.readdress(UserId::new("bob"), None);

        // First migration and a retry of it.
        storage.replace(slot_id, e.clone()).await.unwrap();
        storage.replace(slot_id, e.clone()).await.unwrap();

        assert_eq!(storage.all().await.unwrap().len(), 1);
        assert!(storage.get(&slot_id).await.unwrap().is_none());
        assert!(storage.get(&e.id).await.unwrap().is_some());
    }
}
