use crate::group::GroupSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which closure condition fired, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureReason {
    ManualClose,
    AllSlotsClaimed,
    DeadlinePassed,
    VoterThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureStatus {
    pub closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ClosureReason>,
}

impl ClosureStatus {
    pub fn open() -> Self {
        Self {
            closed: false,
            reason: None,
        }
    }

    fn because(reason: ClosureReason) -> Self {
        Self {
            closed: true,
            reason: Some(reason),
        }
    }
}

/// Whether a group's voting round has ended. Pure and total: evaluated on
/// every read, never cached, since `now` and the voter count move
/// independently of writes to the group record. Closed when any condition
/// holds; conditions are never un-set, so the result is monotone in time.
pub fn evaluate(group: &GroupSession, unique_voter_count: usize, now: DateTime<Utc>) -> ClosureStatus {
    // A full roster also sets the stored flag; report the roster as the
    // reason when both hold.
    if group.all_slots_claimed() {
        return ClosureStatus::because(ClosureReason::AllSlotsClaimed);
    }
    if group.voting_closed {
        return ClosureStatus::because(ClosureReason::ManualClose);
    }
    if let Some(deadline) = group.voting_closes_at {
        if now >= deadline {
            return ClosureStatus::because(ClosureReason::DeadlinePassed);
        }
    }
    if let Some(min_voters) = group.min_voters_to_close {
        if unique_voter_count >= min_voters {
            return ClosureStatus::because(ClosureReason::VoterThreshold);
        }
    }
    ClosureStatus::open()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Slot;
    use aura_types::{GroupId, UserId};
    use chrono::Duration;

    fn group() -> GroupSession {
        GroupSession {
            id: GroupId::new("g1"),
            name: "test".into(),
            join_code: "ABC123".into(),
            creator: UserId::new("alice"),
            capacity: 4,
            is_active: true,
            participants: Vec::new(),
            slots: None,
            voting_closed: false,
            voting_closes_at: None,
            min_voters_to_close: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_by_default() {
        let status = evaluate(&group(), 0, Utc::now());
        assert!(!status.closed);
        assert_eq!(status.reason, None);
    }

    #[test]
    fn test_manual_close_wins() {
        let mut g = group();
        g.voting_closed = true;
        let status = evaluate(&g, 0, Utc::now());
        assert_eq!(status.reason, Some(ClosureReason::ManualClose));
    }

    #[test]
    fn test_full_roster_closes() {
        let mut g = group();
        g.slots = Some(vec![
            Slot {
                label: "a".into(),
                claimed_by: Some(UserId::new("alice")),
                display_name: None,
            },
            Slot {
                label: "b".into(),
                claimed_by: Some(UserId::new("bob")),
                display_name: None,
            },
        ]);
        let status = evaluate(&g, 0, Utc::now());
        assert_eq!(status.reason, Some(ClosureReason::AllSlotsClaimed));
    }

    #[test]
    fn test_empty_slot_list_does_not_close() {
        let mut g = group();
        g.slots = Some(Vec::new());
        assert!(!evaluate(&g, 0, Utc::now()).closed);
    }

    #[test]
    fn test_deadline() {
        let mut g = group();
        let now = Utc::now();
        g.voting_closes_at = Some(now + Duration::hours(1));
        assert!(!evaluate(&g, 0, now).closed);

        let status = evaluate(&g, 0, now + Duration::hours(2));
        assert_eq!(status.reason, Some(ClosureReason::DeadlinePassed));
    }

    #[test]
    fn test_voter_threshold() {
        let mut g = group();
        g.min_voters_to_close = Some(3);
        assert!(!evaluate(&g, 2, Utc::now()).closed);
        let status = evaluate(&g, 3, Utc::now());
        assert_eq!(status.reason, Some(ClosureReason::VoterThreshold));
    }

    /// Once closed, later evaluations stay closed: time only advances and
    /// voter counts only grow.
    #[test]
    fn test_monotone_over_time() {
        let mut g = group();
        let now = Utc::now();
        g.voting_closes_at = Some(now);
        for hours in 0..48 {
            assert!(evaluate(&g, 0, now + Duration::hours(hours)).closed);
        }
    }
}
