use crate::group::{GroupSession, Participant, Slot, DEFAULT_VOTING_WINDOW_DAYS};
use crate::storage::GroupStorage;
use aura_ledger::LedgerManager;
use aura_types::{AuraError, GroupId, Result, Scope, UserId};
use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

const JOIN_CODE_LEN: usize = 6;
// 0/O and 1/I left out; codes are typed by hand.
const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const JOIN_CODE_ATTEMPTS: usize = 16;

#[derive(Debug, Clone)]
pub struct CreateGroup {
    pub name: String,
    pub capacity: usize,
    /// When present, pre-seeds the roster; the founder claims slot 0.
    pub slot_labels: Option<Vec<String>>,
    pub min_voters_to_close: Option<usize>,
    /// Defaults to seven days when absent.
    pub voting_window: Option<Duration>,
}

/// What a slot claim did: the updated group and how many historical
/// ledger entries were re-addressed to the claimant.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimOutcome {
    pub group: GroupSession,
    pub migrated: usize,
}

/// Owns group lifecycle and the slot claim state machine. Holds the ledger
/// so a claim and its historical-entry migration commit as one unit.
pub struct GroupManager {
    storage: Arc<dyn GroupStorage>,
    ledger: Arc<LedgerManager>,
    // One claim/join at a time; capacity and slot checks read-validate-write.
    write_lock: Mutex<()>,
}

impl GroupManager {
    pub fn new(storage: Arc<dyn GroupStorage>, ledger: Arc<LedgerManager>) -> Self {
        Self {
            storage,
            ledger,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn create_group(
        &self,
        creator: UserId,
        creator_name: &str,
        params: CreateGroup,
    ) -> Result<GroupSession> {
        let _guard = self.write_lock.lock().await;

        if params.capacity == 0 {
            return Err(AuraError::InvalidScope("capacity must be positive".into()));
        }
        let slots = match &params.slot_labels {
            Some(labels) if labels.is_empty() => {
                return Err(AuraError::InvalidScope("slot list must not be empty".into()))
            }
            Some(labels) if labels.len() > params.capacity => {
                return Err(AuraError::InvalidScope(format!(
                    "{} slots exceed capacity {}",
                    labels.len(),
                    params.capacity
                )))
            }
            Some(labels) => {
                let mut slots: Vec<Slot> =
                    labels.iter().map(|l| Slot::unclaimed(l.clone())).collect();
                // The founder takes the first slot at creation time.
                slots[0].claimed_by = Some(creator.clone());
                slots[0].display_name = Some(creator_name.to_owned());
                Some(slots)
            }
            None => None,
        };

        let join_code = self.fresh_join_code().await?;
        let now = Utc::now();
        let window = params
            .voting_window
            .unwrap_or_else(|| Duration::days(DEFAULT_VOTING_WINDOW_DAYS));
        let id = derive_group_id(&params.name, &creator, now.timestamp_nanos_opt().unwrap_or(0));

        let group = GroupSession {
            id: id.clone(),
            name: params.name,
            join_code,
            creator: creator.clone(),
            capacity: params.capacity,
            is_active: true,
            participants: vec![Participant {
                user_id: creator.clone(),
                display_name: creator_name.to_owned(),
            }],
            slots,
            voting_closed: false,
            voting_closes_at: Some(now + window),
            min_voters_to_close: params.min_voters_to_close,
            created_at: now,
        };

        self.storage
            .put(group.clone())
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        info!(
            group = %group.id,
            name = %group.name,
            join_code = %group.join_code,
            creator = %creator,
            slots = group.slots.as_ref().map(Vec::len).unwrap_or(0),
            "✅ Group created"
        );
        Ok(group)
    }

    pub async fn get(&self, id: &GroupId) -> Result<GroupSession> {
        self.storage
            .get(id)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?
            .ok_or_else(|| AuraError::GroupNotFound(id.to_string()))
    }

    pub async fn find_by_join_code(&self, code: &str) -> Result<GroupSession> {
        self.storage
            .by_join_code(&code.trim().to_ascii_uppercase())
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?
            .ok_or_else(|| AuraError::GroupNotFound(code.to_owned()))
    }

    pub async fn all_groups(&self) -> Result<Vec<GroupSession>> {
        self.storage
            .all()
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))
    }

    pub async fn groups_for_user(&self, user_id: &UserId) -> Result<Vec<GroupSession>> {
        self.storage
            .for_member(user_id)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))
    }

    /// Plain join for groups without a pre-seeded roster. Seeded groups
    /// admit members through `claim_slot` only; letting plain joiners eat
    /// capacity there would leave unclaimed slots stranded at `GroupFull`.
    pub async fn join_group(
        &self,
        group_id: &GroupId,
        user_id: UserId,
        display_name: &str,
    ) -> Result<GroupSession> {
        let _guard = self.write_lock.lock().await;
        let mut group = self.get(group_id).await?;

        if group.slots.is_some() {
            return Err(AuraError::NotPermitted(
                "seeded rosters are joined by claiming a slot".into(),
            ));
        }
        if !group.is_active {
            return Err(AuraError::GroupInactive);
        }
        if group.is_member(&user_id) {
            return Err(AuraError::AlreadyMember);
        }
        if group.is_full() {
            return Err(AuraError::GroupFull);
        }

        group.participants.push(Participant {
            user_id: user_id.clone(),
            display_name: display_name.to_owned(),
        });
        self.storage
            .put(group.clone())
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        info!(group = %group_id, user = %user_id, "✅ Joined group");
        Ok(group)
    }

    /// Claim a slot: bind the placeholder, join the roster, close voting
    /// when the roster completes, and re-address every ledger entry that
    /// targeted the slot's synthetic id. A retry of a half-applied claim
    /// (same user, slot already bound) just re-runs the migration, which
    /// is a no-op for entries already rewritten.
    pub async fn claim_slot(
        &self,
        group_id: &GroupId,
        index: usize,
        user_id: UserId,
        display_name: &str,
    ) -> Result<ClaimOutcome> {
        let _guard = self.write_lock.lock().await;
        let mut group = self.get(group_id).await?;
        let scope = Scope::group(group_id.clone());

        if !group.is_active {
            return Err(AuraError::GroupInactive);
        }
        let current_owner = {
            let slots = group
                .slots
                .as_ref()
                .ok_or_else(|| AuraError::InvalidScope(format!("group {} has no slots", group_id)))?;
            if index >= slots.len() {
                return Err(AuraError::OutOfRange(index));
            }
            slots[index].claimed_by.clone()
        };

        match current_owner {
            Some(owner) if owner == user_id => {
                // Idempotent retry path.
                let migrated = self
                    .ledger
                    .migrate_slot_entries(&scope, index, &user_id, Some(display_name))
                    .await?;
                return Ok(ClaimOutcome { group, migrated });
            }
            Some(_) => return Err(AuraError::SlotTaken(index)),
            None => {}
        }
        if group.is_member(&user_id) {
            warn!(group = %group_id, user = %user_id, slot = index, "Claim by existing member rejected");
            return Err(AuraError::AlreadyMember);
        }
        if group.is_full() {
            return Err(AuraError::GroupFull);
        }

        if let Some(slots) = group.slots.as_mut() {
            slots[index].claimed_by = Some(user_id.clone());
            slots[index].display_name = Some(display_name.to_owned());
        }
        group.participants.push(Participant {
            user_id: user_id.clone(),
            display_name: display_name.to_owned(),
        });
        if group.all_slots_claimed() {
            // Full roster means the round is complete.
            group.voting_closed = true;
        }

        self.storage
            .put(group.clone())
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        let migrated = self
            .ledger
            .migrate_slot_entries(&scope, index, &user_id, Some(display_name))
            .await?;

        info!(
            group = %group_id,
            slot = index,
            user = %user_id,
            migrated = migrated,
            voting_closed = group.voting_closed,
            "✅ Slot claimed"
        );
        Ok(ClaimOutcome { group, migrated })
    }

    /// Founder-only manual close.
    pub async fn close_voting(&self, group_id: &GroupId, caller: &UserId) -> Result<GroupSession> {
        let _guard = self.write_lock.lock().await;
        let mut group = self.get(group_id).await?;
        if &group.creator != caller {
            return Err(AuraError::NotPermitted(
                "only the founder may close voting".into(),
            ));
        }
        if !group.voting_closed {
            group.voting_closed = true;
            self.storage
                .put(group.clone())
                .await
                .map_err(|e| AuraError::Storage(e.to_string()))?;
            info!(group = %group_id, "Voting closed manually");
        }
        Ok(group)
    }

    /// Groups are never hard-deleted; the founder can deactivate instead.
    pub async fn deactivate(&self, group_id: &GroupId, caller: &UserId) -> Result<GroupSession> {
        let _guard = self.write_lock.lock().await;
        let mut group = self.get(group_id).await?;
        if &group.creator != caller {
            return Err(AuraError::NotPermitted(
                "only the founder may deactivate".into(),
            ));
        }
        group.is_active = false;
        self.storage
            .put(group.clone())
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        info!(group = %group_id, "Group deactivated");
        Ok(group)
    }

    /// Leave a non-slot membership. A claimed slot is immutable, so slot
    /// holders cannot leave in-band.
    pub async fn leave(&self, group_id: &GroupId, user_id: &UserId) -> Result<GroupSession> {
        let _guard = self.write_lock.lock().await;
        let mut group = self.get(group_id).await?;
        if !group.is_member(user_id) {
            return Err(AuraError::NotAMember(group_id.to_string()));
        }
        let holds_slot = group
            .slots
            .as_ref()
            .map(|slots| slots.iter().any(|s| s.claimed_by.as_ref() == Some(user_id)))
            .unwrap_or(false);
        if holds_slot {
            return Err(AuraError::NotPermitted(
                "slot holders cannot leave a seeded roster".into(),
            ));
        }
        group.participants.retain(|p| &p.user_id != user_id);
        self.storage
            .put(group.clone())
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?;
        Ok(group)
    }

    async fn fresh_join_code(&self) -> Result<String> {
        for _ in 0..JOIN_CODE_ATTEMPTS {
            let code = random_join_code();
            let taken = self
                .storage
                .by_join_code(&code)
                .await
                .map_err(|e| AuraError::Storage(e.to_string()))?
                .is_some();
            if !taken {
                return Ok(code);
            }
        }
        Err(AuraError::Storage(
            "could not find a free join code".into(),
        ))
    }
}

fn random_join_code() -> String {
    let mut rng = rand::thread_rng();
    (0..JOIN_CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..JOIN_CODE_ALPHABET.len());
            JOIN_CODE_ALPHABET[idx] as char
        })
        .collect()
}

fn derive_group_id(name: &str, creator: &UserId, nanos: i64) -> GroupId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(name.as_bytes());
    hasher.update(creator.as_str().as_bytes());
    hasher.update(&nanos.to_le_bytes());
    GroupId::new(hex::encode(&hasher.finalize().as_bytes()[..8]))
}
