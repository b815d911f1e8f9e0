use aura_types::{Dimension, RatingEntry, TargetRef, BASE_AURA};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Accumulated totals for one target before ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub delta: i64,
    pub dimensions: BTreeMap<Dimension, i64>,
    pub ratings_received: usize,
}

/// One ranked leaderboard line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub rank: usize,
    pub target: TargetRef,
    pub display_name: String,
    pub aura: i64,
    pub dimensions: BTreeMap<Dimension, i64>,
    pub ratings_received: usize,
    pub groups_joined: usize,
}

/// Reduce entries to per-target totals. Every target in `seed` appears in
/// the result even with zero entries; entries addressed to targets outside
/// the seed set are ignored (they belong to identities unknown to the
/// requested view, e.g. hidden ones).
pub fn reduce<'a>(
    seed: impl IntoIterator<Item = &'a TargetRef>,
    entries: &[RatingEntry],
) -> HashMap<TargetRef, Totals> {
    let mut totals: HashMap<TargetRef, Totals> = seed
        .into_iter()
        .map(|t| (t.clone(), Totals::default()))
        .collect();

    for entry in entries {
        let Some(acc) = totals.get_mut(&entry.target) else {
            continue;
        };
        acc.delta += entry.points;
        acc.ratings_received += 1;
        // Parallel per-dimension accumulation; enables secondary sort
        // orders without re-scanning the ledger per dimension.
        for (dim, score) in &entry.dimensions {
            *acc.dimensions.entry(*dim).or_insert(0) += score;
        }
    }
    totals
}

/// Sort descending by aura and assign ranks: same score, same rank; the
/// next distinct score skips ahead to its position index plus one.
/// `[900, 900, 700, 700, 500]` ranks as `[1, 1, 3, 3, 5]`.
pub fn assign_ranks(mut rows: Vec<Standing>) -> Vec<Standing> {
    rows.sort_by(|a, b| {
        b.aura
            .cmp(&a.aura)
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then_with(|| a.target.to_string().cmp(&b.target.to_string()))
    });

    let mut prev_aura: Option<i64> = None;
    let mut prev_rank = 0usize;
    for (i, row) in rows.iter_mut().enumerate() {
        if prev_aura == Some(row.aura) {
            row.rank = prev_rank;
        } else {
            row.rank = i + 1;
            prev_rank = row.rank;
            prev_aura = Some(row.aura);
        }
    }
    rows
}

/// Seeded aura for a raw reduction delta.
pub fn seeded(delta: i64) -> i64 {
    BASE_AURA + delta
}

/// Secondary ordering over an already-reduced board: descending by one
/// dimension's total, no fresh ledger scan. Overall rank numbers are left
/// as assigned.
pub fn by_dimension(rows: &[Standing], dim: Dimension) -> Vec<Standing> {
    let mut out: Vec<Standing> = rows.to_vec();
    out.sort_by(|a, b| {
        let av = a.dimensions.get(&dim).copied().unwrap_or(0);
        let bv = b.dimensions.get(&dim).copied().unwrap_or(0);
        bv.cmp(&av).then_with(|| a.display_name.cmp(&b.display_name))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_types::{DimensionScores, GroupId, Scope, UserId};

    fn standing(name: &str, aura: i64) -> Standing {
        Standing {
            rank: 0,
            target: TargetRef::user(UserId::new(name)),
            display_name: name.to_owned(),
            aura,
            dimensions: BTreeMap::new(),
            ratings_received: 0,
            groups_joined: 0,
        }
    }

    #[test]
    fn test_rank_tie_law() {
        let rows = assign_ranks(vec![
            standing("a", 700),
            standing("b", 900),
            standing("c", 500),
            standing("d", 900),
            standing("e", 700),
        ]);
        let ranks: Vec<usize> = rows.iter().map(|r| r.rank).collect();
        let auras: Vec<i64> = rows.iter().map(|r| r.aura).collect();
        assert_eq!(auras, vec![900, 900, 700, 700, 500]);
        assert_eq!(ranks, vec![1, 1, 3, 3, 5]);
    }

    #[test]
    fn test_rank_all_tied() {
        let rows = assign_ranks(vec![standing("a", 500), standing("b", 500), standing("c", 500)]);
        assert!(rows.iter().all(|r| r.rank == 1));
    }

    #[test]
    fn test_by_dimension_reorders_without_rescans() {
        let mut a = standing("a", 900);
        a.dimensions.insert(Dimension::Humor, 10);
        let mut b = standing("b", 700);
        b.dimensions.insert(Dimension::Humor, 80);
        let ranked = assign_ranks(vec![a, b]);

        let funny = by_dimension(&ranked, Dimension::Humor);
        assert_eq!(funny[0].display_name, "b");
        // Overall ranks are untouched by the secondary ordering.
        assert_eq!(funny[0].rank, 2);
    }

    #[test]
    fn test_reduce_seeds_and_filters() {
        let scope = Scope::group(GroupId::new("g1"));
        let bob = TargetRef::user(UserId::new("bob"));
        let ghost = TargetRef::user(UserId::new("ghost"));

        let mut dims = DimensionScores::new();
        dims.insert(Dimension::Humor, 150);
        dims.insert(Dimension::Presence, 50);
        let entries = vec![
            RatingEntry::new(
                scope.clone(),
                UserId::new("alice"),
                bob.clone(),
                200,
                None,
                dims,
                None,
            ),
            // Addressed outside the seed set; dropped from this view.
            RatingEntry::new(
                scope.clone(),
                UserId::new("alice"),
                ghost.clone(),
                300,
                None,
                DimensionScores::new(),
                None,
            ),
        ];

        let idle = TargetRef::user(UserId::new("carol"));
        let totals = reduce([&bob, &idle], &entries);

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&bob].delta, 200);
        assert_eq!(totals[&bob].ratings_received, 1);
        assert_eq!(totals[&bob].dimensions[&Dimension::Humor], 150);
        assert_eq!(totals[&idle], Totals::default());
        assert_eq!(seeded(totals[&idle].delta), 500);
    }
}
