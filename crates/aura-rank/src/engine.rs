use crate::cache::LeaderboardCache;
use crate::reduce::{assign_ranks, reduce, seeded, Standing};
use aura_groups::{closure, ClosureReason, GroupManager};
use aura_identity::{IdentityManager, Visibility};
use aura_ledger::LedgerManager;
use aura_types::{GroupId, Result, Scope, TargetRef, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

const ANONYMOUS_NAME: &str = "Anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupResults {
    pub group_id: GroupId,
    pub rankings: Vec<Standing>,
    pub voting_closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closure_reason: Option<ClosureReason>,
}

/// Non-sensitive cardinalities, visible even on the anonymized view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub identities: usize,
    pub total_entries: usize,
    pub total_points_transferred: i64,
}

/// The cached authenticated reduction; both projections derive from it so
/// they always agree on ranking order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalBoard {
    pub rankings: Vec<Standing>,
    pub stats: GlobalStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub display_name: String,
    /// Nulled on the anonymized projection.
    pub aura: Option<i64>,
    pub ratings_received: usize,
    pub groups_joined: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardView {
    pub rankings: Vec<LeaderboardRow>,
    pub stats: GlobalStats,
    pub anonymized: bool,
}

/// Reduces the ledger into ranked standings, per group or system-wide.
pub struct RankEngine {
    ledger: Arc<LedgerManager>,
    identities: Arc<IdentityManager>,
    groups: Arc<GroupManager>,
    cache: LeaderboardCache<GlobalBoard>,
}

impl RankEngine {
    pub fn new(
        ledger: Arc<LedgerManager>,
        identities: Arc<IdentityManager>,
        groups: Arc<GroupManager>,
        cache: LeaderboardCache<GlobalBoard>,
    ) -> Self {
        Self {
            ledger,
            identities,
            groups,
            cache,
        }
    }

    /// Standings for one group, always from the live ledger. Participants
    /// and unclaimed slots are seeded at the base aura; hidden identities
    /// are excluded, anonymous ones renamed with real totals.
    pub async fn group_results(&self, group_id: &GroupId, now: DateTime<Utc>) -> Result<GroupResults> {
        let group = self.groups.get(group_id).await?;
        let scope = Scope::group(group_id.clone());
        let entries = self.ledger.entries_for_scope(&scope).await?;
        let voters = self.ledger.unique_voter_count(&scope).await?;
        let status = closure::evaluate(&group, voters, now);

        // Seed every known target: participants under their per-group
        // names, plus the synthetic ids of still-unclaimed slots.
        let mut names: HashMap<TargetRef, String> = HashMap::new();
        for participant in &group.participants {
            let target = TargetRef::user(participant.user_id.clone());
            match self.group_visibility(&participant.user_id).await? {
                Visibility::Hidden => continue,
                Visibility::Anonymous => names.insert(target, ANONYMOUS_NAME.to_owned()),
                Visibility::Show => names.insert(target, participant.display_name.clone()),
            };
        }
        if let Some(slots) = &group.slots {
            for (index, slot) in slots.iter().enumerate() {
                if !slot.is_claimed() {
                    names.insert(TargetRef::slot(scope.clone(), index), slot.label.clone());
                }
            }
        }

        let totals = reduce(names.keys(), &entries);
        let rows = totals
            .into_iter()
            .map(|(target, t)| Standing {
                rank: 0,
                display_name: names.get(&target).cloned().unwrap_or_default(),
                aura: seeded(t.delta),
                dimensions: t.dimensions,
                ratings_received: t.ratings_received,
                groups_joined: 0,
                target,
            })
            .collect();

        debug!(group = %group_id, voters = voters, closed = status.closed, "Group results computed");
        Ok(GroupResults {
            group_id: group_id.clone(),
            rankings: assign_ranks(rows),
            voting_closed: status.closed,
            closure_reason: status.reason,
        })
    }

    /// The system-wide board: cached reduction plus the projection the
    /// caller is entitled to. The anonymized branch conceals names and
    /// aura values but never re-ranks.
    pub async fn global_leaderboard(
        &self,
        now: DateTime<Utc>,
        authenticated: bool,
    ) -> Result<(LeaderboardView, bool)> {
        let (board, cache_hit) = match self.cache.get_fresh(now).await {
            Some(board) => (board, true),
            None => {
                let board = self.compute_global_board().await?;
                self.cache.store(board.clone(), now).await;
                (board, false)
            }
        };

        let rankings = board
            .rankings
            .iter()
            .enumerate()
            .map(|(position, s)| LeaderboardRow {
                rank: s.rank,
                display_name: if authenticated {
                    s.display_name.clone()
                } else {
                    format!("Member {}", position + 1)
                },
                aura: authenticated.then_some(s.aura),
                ratings_received: s.ratings_received,
                groups_joined: s.groups_joined,
            })
            .collect();

        Ok((
            LeaderboardView {
                rankings,
                stats: board.stats,
                anonymized: !authenticated,
            },
            cache_hit,
        ))
    }

    /// Full ledger scan; the expensive path behind the cache.
    async fn compute_global_board(&self) -> Result<GlobalBoard> {
        let identities = self.identities.all().await?;
        let groups = self.groups.all_groups().await?;
        let entries = self.ledger.all_entries().await?;

        let mut membership: HashMap<&UserId, usize> = HashMap::new();
        for group in &groups {
            for participant in &group.participants {
                *membership.entry(&participant.user_id).or_insert(0) += 1;
            }
        }

        let mut names: HashMap<TargetRef, (String, usize)> = HashMap::new();
        for identity in &identities {
            let (name, joined) = match identity.visibility.global {
                Visibility::Hidden => continue,
                Visibility::Anonymous => (
                    ANONYMOUS_NAME.to_owned(),
                    membership.get(&identity.user_id).copied().unwrap_or(0),
                ),
                Visibility::Show => (
                    identity.display_name.clone(),
                    membership.get(&identity.user_id).copied().unwrap_or(0),
                ),
            };
            names.insert(TargetRef::user(identity.user_id.clone()), (name, joined));
        }

        let totals = reduce(names.keys(), &entries);
        let rows = totals
            .into_iter()
            .map(|(target, t)| {
                let (display_name, groups_joined) =
                    names.get(&target).cloned().unwrap_or_default();
                Standing {
                    rank: 0,
                    display_name,
                    aura: seeded(t.delta),
                    dimensions: t.dimensions,
                    ratings_received: t.ratings_received,
                    groups_joined,
                    target,
                }
            })
            .collect();

        let stats = GlobalStats {
            identities: identities.len(),
            total_entries: entries.len(),
            total_points_transferred: entries.iter().map(|e| e.points.abs()).sum(),
        };

        info!(
            identities = stats.identities,
            entries = stats.total_entries,
            "📊 Global leaderboard recomputed"
        );
        Ok(GlobalBoard {
            rankings: assign_ranks(rows),
            stats,
        })
    }

    async fn group_visibility(&self, user_id: &UserId) -> Result<Visibility> {
        Ok(self
            .identities
            .get(user_id)
            .await?
            .map(|i| i.visibility.group)
            .unwrap_or_default())
    }
}
