use crate::auth::{AuthContext, DevTokenVerifier, TokenVerifier};
use crate::config::NodeConfig;
use async_trait::async_trait;
use aura_counter::{CounterManager, MemoryCounterStorage};
use aura_groups::{GroupManager, GroupStorage, MemoryGroupStorage};
use aura_identity::{IdentityManager, IdentityStorage, MemoryIdentityStorage};
use aura_ledger::{LedgerManager, MemoryLedgerStorage, TargetResolver};
use aura_rank::{GlobalBoard, LeaderboardCache, RankEngine};
use aura_types::{Scope, TargetRef, UserId};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Resolves rating targets against the group and identity stores. Works
/// over the storage seams directly so the ledger does not depend on the
/// managers built on top of it.
struct DirectoryResolver {
    groups: Arc<dyn GroupStorage>,
    identities: Arc<dyn IdentityStorage>,
}

#[async_trait]
impl TargetResolver for DirectoryResolver {
    async fn resolve_target(
        &self,
        scope: &Scope,
        target: &TargetRef,
    ) -> anyhow::Result<Option<Option<String>>> {
        match scope {
            Scope::Direct => match target {
                TargetRef::User { user_id } => Ok(self
                    .identities
                    .get(user_id)
                    .await?
                    .map(|i| Some(i.display_name))),
                // Slot placeholders only exist inside a group scope.
                TargetRef::Slot { .. } => Ok(None),
            },
            Scope::Group { group_id } => {
                let Some(group) = self.groups.get(group_id).await? else {
                    return Ok(None);
                };
                match target {
                    TargetRef::User { user_id } => Ok(group
                        .participant_name(user_id)
                        .map(|name| Some(name.to_owned()))),
                    TargetRef::Slot { scope: slot_scope, index } => {
                        if slot_scope != scope {
                            return Ok(None);
                        }
                        let slot = group
                            .slots
                            .as_ref()
                            .and_then(|slots| slots.get(*index));
                        // A claimed slot's synthetic id is retired; the
                        // rating should address the bound identity.
                        match slot {
                            Some(slot) if !slot.is_claimed() => {
                                Ok(Some(Some(slot.label.clone())))
                            }
                            _ => Ok(None),
                        }
                    }
                }
            }
        }
    }

    async fn rater_in_scope(&self, scope: &Scope, rater: &UserId) -> anyhow::Result<bool> {
        match scope {
            Scope::Direct => Ok(true),
            Scope::Group { group_id } => Ok(self
                .groups
                .get(group_id)
                .await?
                .map(|g| g.is_member(rater))
                .unwrap_or(false)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStats {
    pub node_name: String,
    pub ledger: aura_ledger::LedgerStats,
    pub groups: usize,
    pub identities: usize,
}

/// The assembled service: every manager wired over shared in-memory
/// storage, plus the token-verification seam.
pub struct AuraNode {
    pub config: NodeConfig,
    pub ledger: Arc<LedgerManager>,
    pub identities: Arc<IdentityManager>,
    pub groups: Arc<GroupManager>,
    pub counters: Arc<CounterManager>,
    pub rank: Arc<RankEngine>,
    verifier: Arc<dyn TokenVerifier>,
}

impl AuraNode {
    pub fn new(config: NodeConfig) -> Self {
        Self::with_verifier(config, Arc::new(DevTokenVerifier))
    }

    pub fn with_verifier(config: NodeConfig, verifier: Arc<dyn TokenVerifier>) -> Self {
        info!(name = %config.node.name, "Initializing aura node");

        let group_storage: Arc<dyn GroupStorage> = Arc::new(MemoryGroupStorage::new());
        let identity_storage: Arc<dyn IdentityStorage> = Arc::new(MemoryIdentityStorage::new());

        let resolver = Arc::new(DirectoryResolver {
            groups: group_storage.clone(),
            identities: identity_storage.clone(),
        });

        let ledger = Arc::new(LedgerManager::new(
            Arc::new(MemoryLedgerStorage::new()),
            resolver,
        ));
        let identities = Arc::new(IdentityManager::new(identity_storage));
        let groups = Arc::new(GroupManager::new(group_storage, ledger.clone()));
        let counters = Arc::new(CounterManager::new(Arc::new(MemoryCounterStorage::new())));

        let cache: LeaderboardCache<GlobalBoard> =
            LeaderboardCache::new(Duration::seconds(config.leaderboard.ttl_secs));
        let rank = Arc::new(RankEngine::new(
            ledger.clone(),
            identities.clone(),
            groups.clone(),
            cache,
        ));

        Self {
            config,
            ledger,
            identities,
            groups,
            counters,
            rank,
            verifier,
        }
    }

    /// Verify a bearer token and make sure the identity record exists
    /// (identities are created on first sign-in).
    pub async fn authenticate(&self, token: &str) -> anyhow::Result<Option<AuthContext>> {
        let Some(ctx) = self.verifier.verify(token).await? else {
            return Ok(None);
        };
        self.identities
            .ensure(ctx.user_id.clone(), &ctx.display_name)
            .await?;
        Ok(Some(ctx))
    }

    pub async fn stats(&self) -> anyhow::Result<NodeStats> {
        Ok(NodeStats {
            node_name: self.config.node.name.clone(),
            ledger: self.ledger.stats().await?,
            groups: self.groups.all_groups().await?.len(),
            identities: self.identities.all().await?.len(),
        })
    }
}
