use crate::storage::IdentityStorage;
use aura_types::{AuraError, Result, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// How an identity appears on a leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Show,
    Anonymous,
    Hidden,
}

/// Separate preferences for the global and per-group scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VisibilityPrefs {
    pub global: Visibility,
    pub group: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub display_name: String,
    pub visibility: VisibilityPrefs,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            visibility: VisibilityPrefs::default(),
            created_at: Utc::now(),
        }
    }
}

pub struct IdentityManager {
    storage: Arc<dyn IdentityStorage>,
}

impl IdentityManager {
    pub fn new(storage: Arc<dyn IdentityStorage>) -> Self {
        Self { storage }
    }

    /// Create the identity on first sign-in; subsequent calls return the
    /// existing record untouched.
    pub async fn ensure(&self, user_id: UserId, display_name: &str) -> Result<Identity> {
        if let Some(existing) = self
            .storage
            .get(&user_id)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?
        {
            return Ok(existing);
        }

        let identity = Identity::new(user_id.clone(), display_name);
        self.storage
            .put(identity.clone())
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        info!(user = %user_id, name = display_name, "✅ Identity created");
        Ok(identity)
    }

    pub async fn get(&self, user_id: &UserId) -> Result<Option<Identity>> {
        self.storage
            .get(user_id)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))
    }

    pub async fn all(&self) -> Result<Vec<Identity>> {
        self.storage
            .all()
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))
    }

    pub async fn set_display_name(&self, user_id: &UserId, display_name: &str) -> Result<Identity> {
        let mut identity = self
            .get(user_id)
            .await?
            .ok_or_else(|| AuraError::IdentityNotFound(user_id.to_string()))?;
        identity.display_name = display_name.to_owned();
        self.storage
            .put(identity.clone())
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        Ok(identity)
    }

    pub async fn set_visibility(&self, user_id: &UserId, prefs: VisibilityPrefs) -> Result<Identity> {
        let mut identity = self
            .get(user_id)
            .await?
            .ok_or_else(|| AuraError::IdentityNotFound(user_id.to_string()))?;
        identity.visibility = prefs;
        self.storage
            .put(identity.clone())
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        info!(user = %user_id, ?prefs, "Visibility updated");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryIdentityStorage;

    fn manager() -> IdentityManager {
        IdentityManager::new(Arc::new(MemoryIdentityStorage::new()))
    }

    #[tokio::test]
    async fn test_ensure_is_first_write_wins() {
        let ids = manager();
        let alice = UserId::new("alice");

        let first = ids.ensure(alice.clone(), "Alice").await.unwrap();
        let second = ids.ensure(alice.clone(), "Someone Else").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.display_name, "Alice");
    }

    #[tokio::test]
    async fn test_visibility_update() {
        let ids = manager();
        let alice = UserId::new("alice");
        ids.ensure(alice.clone(), "Alice").await.unwrap();

        let prefs = VisibilityPrefs {
            global: Visibility::Anonymous,
            group: Visibility::Hidden,
        };
        let updated = ids.set_visibility(&alice, prefs).await.unwrap();
        assert_eq!(updated.visibility, prefs);

        let err = ids
            .set_visibility(&UserId::new("ghost"), prefs)
            .await
            .unwrap_err();
        assert!(matches!(err, AuraError::IdentityNotFound(_)));
    }
}
