use aura_types::{GroupId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default auto-close deadline, measured from group creation.
pub const DEFAULT_VOTING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub display_name: String,
}

/// A pre-seeded rating target inside a group's roster. Starts unclaimed;
/// once `claimed_by` is set it never reverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Slot {
    pub fn unclaimed(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            claimed_by: None,
            display_name: None,
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed_by.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSession {
    pub id: GroupId,
    pub name: String,
    pub join_code: String,
    pub creator: UserId,
    pub capacity: usize,
    pub is_active: bool,
    pub participants: Vec<Participant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<Vec<Slot>>,
    pub voting_closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voting_closes_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_voters_to_close: Option<usize>,
    pub created_at: DateTime<Utc>,
}

impl GroupSession {
    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.participants.iter().any(|p| &p.user_id == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.capacity
    }

    pub fn all_slots_claimed(&self) -> bool {
        match &self.slots {
            Some(slots) if !slots.is_empty() => slots.iter().all(Slot::is_claimed),
            _ => false,
        }
    }

    pub fn participant_name(&self, user_id: &UserId) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| &p.user_id == user_id)
            .map(|p| p.display_name.as_str())
    }
}
