use async_trait::async_trait;
use aura_groups::{closure, CreateGroup, GroupManager, MemoryGroupStorage};
use aura_ledger::{LedgerManager, MemoryLedgerStorage, TargetResolver};
use aura_types::{AuraError, DimensionScores, Scope, TargetRef, UserId};
use chrono::Utc;
use std::sync::Arc;

struct OpenResolver;

#[async_trait]
impl TargetResolver for OpenResolver {
    async fn resolve_target(
        &self,
        _scope: &Scope,
        _target: &TargetRef,
    ) -> anyhow::Result<Option<Option<String>>> {
        Ok(Some(None))
    }

    async fn rater_in_scope(&self, _scope: &Scope, _rater: &UserId) -> anyhow::Result<bool> {
        Ok(true)
    }
}

fn setup() -> (Arc<LedgerManager>, GroupManager) {
    let ledger = Arc::new(LedgerManager::new(
        Arc::new(MemoryLedgerStorage::new()),
        Arc::new(OpenResolver),
    ));
    let groups = GroupManager::new(Arc::new(MemoryGroupStorage::new()), ledger.clone());
    (ledger, groups)
}

fn three_slot_group() -> CreateGroup {
    CreateGroup {
        name: "movie night".into(),
        capacity: 3,
        slot_labels: Some(vec!["Host".into(), "The Critic".into(), "The Sleeper".into()]),
        min_voters_to_close: None,
        voting_window: None,
    }
}

/// The founder pre-claims slot 0; ratings land on slot 1's synthetic id;
/// claiming slot 1 migrates them; claiming slot 2 completes the roster and
/// closes voting.
#[tokio::test]
async fn test_claim_migrates_and_full_roster_closes() {
    let (ledger, groups) = setup();
    let alice = UserId::new("alice");

    let group = groups
        .create_group(alice.clone(), "Alice", three_slot_group())
        .await
        .unwrap();
    let scope = Scope::group(group.id.clone());

    // Rate the unclaimed slot 1 placeholder.
    ledger
        .submit(
            alice.clone(),
            scope.clone(),
            TargetRef::slot(scope.clone(), 1),
            400,
            Some("sharp takes".into()),
            DimensionScores::new(),
        )
        .await
        .unwrap();

    let bob = UserId::new("bob");
    let outcome = groups
        .claim_slot(&group.id, 1, bob.clone(), "Bob")
        .await
        .unwrap();
    assert!(!outcome.group.voting_closed);
    assert_eq!(outcome.migrated, 1);

    let entries = ledger.entries_for_scope(&scope).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].target, TargetRef::user(bob.clone()));
    assert_eq!(entries[0].target_name.as_deref(), Some("Bob"));

    let carol = UserId::new("carol");
    let group = groups
        .claim_slot(&group.id, 2, carol.clone(), "Carol")
        .await
        .unwrap()
        .group;
    assert!(group.voting_closed);
    assert!(group.all_slots_claimed());
    assert_eq!(group.participants.len(), 3);

    let status = closure::evaluate(&group, 0, Utc::now());
    assert!(status.closed);
}

/// Claiming a slot twice (second a retry) leaves exactly the same ledger
/// and roster state as claiming it once.
#[tokio::test]
async fn test_claim_retry_is_idempotent() {
    let (ledger, groups) = setup();
    let alice = UserId::new("alice");
    let group = groups
        .create_group(alice.clone(), "Alice", three_slot_group())
        .await
        .unwrap();
    let scope = Scope::group(group.id.clone());

    ledger
        .submit(
            alice.clone(),
            scope.clone(),
            TargetRef::slot(scope.clone(), 1),
            250,
            None,
            DimensionScores::new(),
        )
        .await
        .unwrap();

    let bob = UserId::new("bob");
    let after_first = groups
        .claim_slot(&group.id, 1, bob.clone(), "Bob")
        .await
        .unwrap();
    let ledger_after_first = ledger.entries_for_scope(&scope).await.unwrap();
    assert_eq!(after_first.migrated, 1);

    let after_retry = groups
        .claim_slot(&group.id, 1, bob.clone(), "Bob")
        .await
        .unwrap();
    let ledger_after_retry = ledger.entries_for_scope(&scope).await.unwrap();

    assert_eq!(after_first.group, after_retry.group);
    // The retry finds nothing left to re-address.
    assert_eq!(after_retry.migrated, 0);
    assert_eq!(ledger_after_first, ledger_after_retry);
}

#[tokio::test]
async fn test_claim_rejections() {
    let (_ledger, groups) = setup();
    let alice = UserId::new("alice");
    let group = groups
        .create_group(alice.clone(), "Alice", three_slot_group())
        .await
        .unwrap();

    // Out of range.
    let err = groups
        .claim_slot(&group.id, 9, UserId::new("bob"), "Bob")
        .await
        .unwrap_err();
    assert_eq!(err, AuraError::OutOfRange(9));

    // Taken by someone else (founder holds slot 0).
    let err = groups
        .claim_slot(&group.id, 0, UserId::new("bob"), "Bob")
        .await
        .unwrap_err();
    assert_eq!(err, AuraError::SlotTaken(0));

    // A member cannot take a second slot.
    groups
        .claim_slot(&group.id, 1, UserId::new("bob"), "Bob")
        .await
        .unwrap();
    let err = groups
        .claim_slot(&group.id, 2, UserId::new("bob"), "Bob (again)")
        .await
        .unwrap_err();
    assert_eq!(err, AuraError::AlreadyMember);
}

#[tokio::test]
async fn test_plain_join_capacity_and_inactive() {
    let (_ledger, groups) = setup();
    let alice = UserId::new("alice");
    let group = groups
        .create_group(
            alice.clone(),
            "Alice",
            CreateGroup {
                name: "open group".into(),
                capacity: 2,
                slot_labels: None,
                min_voters_to_close: None,
                voting_window: None,
            },
        )
        .await
        .unwrap();

    groups
        .join_group(&group.id, UserId::new("bob"), "Bob")
        .await
        .unwrap();

    let err = groups
        .join_group(&group.id, UserId::new("bob"), "Bob")
        .await
        .unwrap_err();
    assert_eq!(err, AuraError::AlreadyMember);

    let err = groups
        .join_group(&group.id, UserId::new("carol"), "Carol")
        .await
        .unwrap_err();
    assert_eq!(err, AuraError::GroupFull);

    groups.deactivate(&group.id, &alice).await.unwrap();
    let err = groups
        .join_group(&group.id, UserId::new("dave"), "Dave")
        .await
        .unwrap_err();
    assert_eq!(err, AuraError::GroupInactive);
}

/// A seeded roster admits members only through claims. A plain join would
/// consume capacity and could strand unclaimed slots behind `GroupFull`.
#[tokio::test]
async fn test_plain_join_rejected_for_seeded_roster() {
    let (_ledger, groups) = setup();
    let alice = UserId::new("alice");
    let group = groups
        .create_group(alice.clone(), "Alice", three_slot_group())
        .await
        .unwrap();

    for joiner in ["bob", "carol"] {
        let err = groups
            .join_group(&group.id, UserId::new(joiner), joiner)
            .await
            .unwrap_err();
        assert!(matches!(err, AuraError::NotPermitted(_)));
    }

    // Every open slot is still claimable.
    groups
        .claim_slot(&group.id, 1, UserId::new("bob"), "Bob")
        .await
        .unwrap();
    let group = groups
        .claim_slot(&group.id, 2, UserId::new("carol"), "Carol")
        .await
        .unwrap()
        .group;
    assert!(group.all_slots_claimed());
}

#[tokio::test]
async fn test_join_code_round_trip() {
    let (_ledger, groups) = setup();
    let group = groups
        .create_group(
            UserId::new("alice"),
            "Alice",
            CreateGroup {
                name: "find me".into(),
                capacity: 8,
                slot_labels: None,
                min_voters_to_close: None,
                voting_window: None,
            },
        )
        .await
        .unwrap();

    let found = groups
        .find_by_join_code(&group.join_code.to_lowercase())
        .await
        .unwrap();
    assert_eq!(found.id, group.id);
}

#[tokio::test]
async fn test_manual_close_is_founder_only_and_sticky() {
    let (ledger, groups) = setup();
    let alice = UserId::new("alice");
    let group = groups
        .create_group(
            alice.clone(),
            "Alice",
            CreateGroup {
                name: "closable".into(),
                capacity: 4,
                slot_labels: None,
                min_voters_to_close: Some(10),
                voting_window: None,
            },
        )
        .await
        .unwrap();

    let err = groups
        .close_voting(&group.id, &UserId::new("bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuraError::NotPermitted(_)));

    let group = groups.close_voting(&group.id, &alice).await.unwrap();
    let voters = ledger
        .unique_voter_count(&Scope::group(group.id.clone()))
        .await
        .unwrap();
    let status = closure::evaluate(&group, voters, Utc::now());
    assert!(status.closed);

    // Closing again is a no-op, still closed.
    let group = groups.close_voting(&group.id, &alice).await.unwrap();
    assert!(closure::evaluate(&group, voters, Utc::now()).closed);
}
