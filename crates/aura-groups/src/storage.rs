use crate::group::GroupSession;
use anyhow::Result;
use async_trait::async_trait;
use aura_types::{GroupId, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait GroupStorage: Send + Sync {
    async fn get(&self, id: &GroupId) -> Result<Option<GroupSession>>;
    async fn put(&self, group: GroupSession) -> Result<()>;
    async fn by_join_code(&self, code: &str) -> Result<Option<GroupSession>>;
    async fn all(&self) -> Result<Vec<GroupSession>>;
    async fn for_member(&self, user_id: &UserId) -> Result<Vec<GroupSession>>;
}

pub struct MemoryGroupStorage {
    groups: Arc<RwLock<HashMap<GroupId, GroupSession>>>,
}

impl Default for MemoryGroupStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGroupStorage {
    pub fn new() -> Self {
        Self {
            groups: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl GroupStorage for MemoryGroupStorage {
    async fn get(&self, id: &GroupId) -> Result<Option<GroupSession>> {
        let groups = self.groups.read().await;
        Ok(groups.get(id).cloned())
    }

    async fn put(&self, group: GroupSession) -> Result<()> {
        let mut groups = self.groups.write().await;
        groups.insert(group.id.clone(), group);
        Ok(())
    }

    async fn by_join_code(&self, code: &str) -> Result<Option<GroupSession>> {
        let groups = self.groups.read().await;
        Ok(groups.values().find(|g| g.join_code == code).cloned())
    }

    async fn all(&self) -> Result<Vec<GroupSession>> {
        let groups = self.groups.read().await;
        Ok(groups.values().cloned().collect())
    }

    async fn for_member(&self, user_id: &UserId) -> Result<Vec<GroupSession>> {
        let groups = self.groups.read().await;
        Ok(groups
            .values()
            .filter(|g| g.is_member(user_id))
            .cloned()
            .collect())
    }
}
