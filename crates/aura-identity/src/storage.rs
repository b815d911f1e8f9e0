use crate::identity::Identity;
use anyhow::Result;
use async_trait::async_trait;
use aura_types::UserId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait IdentityStorage: Send + Sync {
    async fn get(&self, user_id: &UserId) -> Result<Option<Identity>>;
    async fn put(&self, identity: Identity) -> Result<()>;
    async fn all(&self) -> Result<Vec<Identity>>;
}

pub struct MemoryIdentityStorage {
    identities: Arc<RwLock<HashMap<UserId, Identity>>>,
}

impl Default for MemoryIdentityStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityStorage {
    pub fn new() -> Self {
        Self {
            identities: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl IdentityStorage for MemoryIdentityStorage {
    async fn get(&self, user_id: &UserId) -> Result<Option<Identity>> {
        let identities = self.identities.read().await;
        Ok(identities.get(user_id).cloned())
    }

    async fn put(&self, identity: Identity) -> Result<()> {
        let mut identities = self.identities.write().await;
        identities.insert(identity.user_id.clone(), identity);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Identity>> {
        let identities = self.identities.read().await;
        Ok(identities.values().cloned().collect())
    }
}
