use aura_groups::CreateGroup;
use aura_node::{AuraNode, NodeConfig};
use aura_types::{ContentId, DimensionScores, GroupId, Scope, TargetRef, UserId};
use chrono::Utc;
use std::sync::Arc;

async fn sign_in(node: &AuraNode, token: &str) -> UserId {
    node.authenticate(token)
        .await
        .unwrap()
        .expect("dev token should verify")
        .user_id
}

/// Full flow: sign-ins, a seeded group, ratings against a placeholder,
/// claim-time migration, derived closure, results and the global board.
#[tokio::test]
async fn test_end_to_end_group_round() {
    let node = Arc::new(AuraNode::new(NodeConfig::default()));

    let alice = sign_in(&node, "alice:Alice").await;
    let bob = sign_in(&node, "bob:Bob").await;

    println!("\n=== Creating seeded group ===");
    let group = node
        .groups
        .create_group(
            alice.clone(),
            "Alice",
            CreateGroup {
                name: "ski trip".into(),
                capacity: 3,
                slot_labels: Some(vec!["Organizer".into(), "Navigator".into(), "Chef".into()]),
                min_voters_to_close: None,
                voting_window: None,
            },
        )
        .await
        .unwrap();
    let scope = Scope::group(group.id.clone());
    println!("✓ Group {} created, join code {}", group.id, group.join_code);

    println!("\n=== Rating the unclaimed Navigator slot ===");
    let mut dims = DimensionScores::new();
    dims.insert(aura_types::Dimension::Presence, 150);
    dims.insert(aura_types::Dimension::Consistency, 50);
    node.ledger
        .submit(
            alice.clone(),
            scope.clone(),
            TargetRef::slot(scope.clone(), 1),
            200,
            Some("never lost".into()),
            dims,
        )
        .await
        .unwrap();
    println!("✓ Rating accepted against the synthetic slot id");

    println!("\n=== Bob claims the Navigator slot ===");
    let outcome = node
        .groups
        .claim_slot(&group.id, 1, bob.clone(), "Bob")
        .await
        .unwrap();
    assert!(!outcome.group.voting_closed);
    assert_eq!(outcome.migrated, 1);
    let group = outcome.group;

    let entries = node.ledger.entries_for_scope(&scope).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].target, TargetRef::user(bob.clone()));
    println!("✓ Historical rating re-addressed to Bob");

    println!("\n=== Carol claims the last slot; round completes ===");
    let carol = sign_in(&node, "carol:Carol").await;
    let group = node
        .groups
        .claim_slot(&group.id, 2, carol.clone(), "Carol")
        .await
        .unwrap()
        .group;
    assert!(group.voting_closed);

    let results = node.rank.group_results(&group.id, Utc::now()).await.unwrap();
    assert!(results.voting_closed);
    let top = &results.rankings[0];
    assert_eq!(top.display_name, "Bob");
    assert_eq!(top.aura, 700);
    assert_eq!(top.rank, 1);
    println!("✓ Results ranked, Bob leads with {}", top.aura);

    println!("\n=== Global leaderboard, both projections ===");
    let now = Utc::now();
    let (auth_view, _) = node.rank.global_leaderboard(now, true).await.unwrap();
    let (anon_view, _) = node.rank.global_leaderboard(now, false).await.unwrap();
    assert_eq!(auth_view.rankings.len(), 3);
    assert!(anon_view.anonymized);
    assert!(anon_view.rankings.iter().all(|r| r.aura.is_none()));
    let auth_order: Vec<usize> = auth_view.rankings.iter().map(|r| r.rank).collect();
    let anon_order: Vec<usize> = anon_view.rankings.iter().map(|r| r.rank).collect();
    assert_eq!(auth_order, anon_order);
    println!("✓ Projections agree on order");

    println!("\n=== All flows hold ===");
}

#[tokio::test]
async fn test_resolver_gates_scope_membership() {
    let node = Arc::new(AuraNode::new(NodeConfig::default()));
    let alice = sign_in(&node, "alice:Alice").await;
    let outsider = sign_in(&node, "mallory:Mallory").await;

    let group = node
        .groups
        .create_group(
            alice.clone(),
            "Alice",
            CreateGroup {
                name: "closed circle".into(),
                capacity: 4,
                slot_labels: None,
                min_voters_to_close: None,
                voting_window: None,
            },
        )
        .await
        .unwrap();
    let scope = Scope::group(group.id.clone());

    // Non-members cannot rate into the scope.
    let err = node
        .ledger
        .submit(
            outsider.clone(),
            scope.clone(),
            TargetRef::user(alice.clone()),
            100,
            None,
            DimensionScores::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, aura_types::AuraError::NotAMember(_)));

    // Targets outside the group are unresolvable in its scope.
    node.groups
        .join_group(&group.id, outsider.clone(), "Mallory")
        .await
        .unwrap();
    let err = node
        .ledger
        .submit(
            outsider,
            scope.clone(),
            TargetRef::user(UserId::new("nobody")),
            100,
            None,
            DimensionScores::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, aura_types::AuraError::TargetNotFound(_)));

    // Unknown group ids resolve to nothing at all.
    let err = node
        .ledger
        .submit(
            alice,
            Scope::group(GroupId::new("missing")),
            TargetRef::user(UserId::new("bob")),
            100,
            None,
            DimensionScores::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, aura_types::AuraError::TargetNotFound(_)));
}

#[tokio::test]
async fn test_counter_flow_through_node() {
    let node = Arc::new(AuraNode::new(NodeConfig::default()));
    let owner = sign_in(&node, "owner:Oona").await;
    let fan = sign_in(&node, "fan:Fred").await;

    node.counters
        .register_content(ContentId::new("post-1"), owner.clone())
        .await
        .unwrap();

    let adj = node
        .counters
        .adjust(&ContentId::new("post-1"), &fan, 100)
        .await
        .unwrap();
    assert_eq!(adj.new_value, 100);
    assert_eq!(node.counters.owner_total(&owner).await.unwrap(), 100);
}
