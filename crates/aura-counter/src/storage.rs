use crate::counter::ContentItem;
use anyhow::Result;
use async_trait::async_trait;
use aura_types::{ContentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub content_id: ContentId,
    pub endorser: UserId,
    pub value: i64,
    pub updated_at: DateTime<Utc>,
}

/// Counter records are canonically one per `(content, endorser)` pair, but
/// legacy data may hold several; `records_for_pair` surfaces them all so
/// the manager can consolidate.
#[async_trait]
pub trait CounterStorage: Send + Sync {
    async fn records_for_pair(
        &self,
        content_id: &ContentId,
        endorser: &UserId,
    ) -> Result<Vec<CounterRecord>>;

    /// Atomically drop every record for the pair and store the canonical
    /// one in its place.
    async fn consolidate(&self, record: CounterRecord) -> Result<()>;

    async fn get_content(&self, content_id: &ContentId) -> Result<Option<ContentItem>>;
    async fn put_content(&self, item: ContentItem) -> Result<()>;

    async fn owner_total(&self, owner: &UserId) -> Result<i64>;
    async fn add_owner_total(&self, owner: &UserId, delta: i64) -> Result<()>;
}

pub struct MemoryCounterStorage {
    // Keyed per pair; the Vec carries legacy duplicates until consolidated.
    counters: Arc<RwLock<HashMap<(ContentId, UserId), Vec<CounterRecord>>>>,
    content: Arc<RwLock<HashMap<ContentId, ContentItem>>>,
    owner_totals: Arc<RwLock<HashMap<UserId, i64>>>,
}

impl Default for MemoryCounterStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCounterStorage {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(RwLock::new(HashMap::new())),
            content: Arc::new(RwLock::new(HashMap::new())),
            owner_totals: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Test hook: seed pre-consolidation duplicate records for one pair.
    pub async fn seed_legacy_records(&self, records: Vec<CounterRecord>) {
        let mut counters = self.counters.write().await;
        for record in records {
            counters
                .entry((record.content_id.clone(), record.endorser.clone()))
                .or_default()
                .push(record);
        }
    }
}

#[async_trait]
impl CounterStorage for MemoryCounterStorage {
    async fn records_for_pair(
        &self,
        content_id: &ContentId,
        endorser: &UserId,
    ) -> Result<Vec<CounterRecord>> {
        let counters = self.counters.read().await;
        Ok(counters
            .get(&(content_id.clone(), endorser.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn consolidate(&self, record: CounterRecord) -> Result<()> {
        let mut counters = self.counters.write().await;
        counters.insert(
            (record.content_id.clone(), record.endorser.clone()),
            vec![record],
        );
        Ok(())
    }

    async fn get_content(&self, content_id: &ContentId) -> Result<Option<ContentItem>> {
        let content = self.content.read().await;
        Ok(content.get(content_id).cloned())
    }

    async fn put_content(&self, item: ContentItem) -> Result<()> {
        let mut content = self.content.write().await;
        content.insert(item.content_id.clone(), item);
        Ok(())
    }

    async fn owner_total(&self, owner: &UserId) -> Result<i64> {
        let totals = self.owner_totals.read().await;
        Ok(totals.get(owner).copied().unwrap_or(0))
    }

    async fn add_owner_total(&self, owner: &UserId, delta: i64) -> Result<()> {
        let mut totals = self.owner_totals.write().await;
        *totals.entry(owner.clone()).or_insert(0) += delta;
        Ok(())
    }
}
