//! Golden tests for community tracking.
//!
//! These tests pin the concrete matching outcomes and check that repeated
//! runs over the same series are byte-for-byte stable.

use std::collections::BTreeSet;

use alluvial_kernel::tracking::MembershipEntry;
use alluvial_kernel::{
    jaccard, CandidateSelection, ChronologicalCommunityTracker, ChronologicalStrategy, Cluster,
    CommunityHistory, DynamicCommunityId, DynamicIdStrategy, Graph, HistoryFileMatcher,
    RecordSet, SnapshotSeries, TrackerConfig,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn cluster(id: i64, children: &[i64]) -> Cluster {
    Cluster::new(id, 0.0, 0.0, 1.0, children.iter().copied())
}

fn graph(clusters: Vec<Cluster>) -> Graph {
    Graph::new(RecordSet::new(), RecordSet::new(), clusters.into())
}

fn history(entries: &[(i64, &[i64])]) -> CommunityHistory {
    let mut history = CommunityHistory::new();
    for (id, members) in entries {
        history.insert(*id, members.iter().map(|m| m.to_string()).collect());
    }
    history
}

fn id(raw: i64) -> DynamicCommunityId {
    DynamicCommunityId::new(raw)
}

fn drifting_series() -> SnapshotSeries {
    SnapshotSeries::new()
        .with("t0", graph(vec![cluster(1, &[1, 2, 3]), cluster(2, &[4, 5]), cluster(3, &[6])]))
        .with("t1", graph(vec![cluster(4, &[1, 2, 3, 4]), cluster(5, &[5, 6, 7])]))
        .with("t2", graph(vec![cluster(6, &[1, 2]), cluster(7, &[3, 4, 5, 6, 7]), cluster(8, &[9])]))
}

// ─────────────────────────────────────────────────────────────────────────────
// Chronological Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_golden_inherit_from_best_overlap() {
    let mut tracker = ChronologicalCommunityTracker::new(TrackerConfig {
        threshold: 0.4,
        first_id: 10,
    });

    let t0 = tracker
        .observe("t0", &[cluster(1, &[1, 2, 3]), cluster(2, &[4, 5])])
        .unwrap();
    assert_eq!(t0.assigned, vec![(1, id(10)), (2, id(11))]);

    let x = BTreeSet::from([1, 2, 3, 4]);
    assert_eq!(jaccard(&x, &BTreeSet::from([1, 2, 3])), 0.75);
    assert_eq!(jaccard(&x, &BTreeSet::from([4, 5])), 0.2);

    let t1 = tracker.observe("t1", &[cluster(1, &[1, 2, 3, 4])]).unwrap();
    assert_eq!(t1.assigned, vec![(1, id(10))]);
    assert_eq!(t1.inherited, 1);
    assert_eq!(tracker.next_id(), 12);
}

#[test]
fn test_golden_drifting_series() {
    let assignment = ChronologicalStrategy::default().track(&drifting_series()).unwrap();

    // t0: three births.
    assert_eq!(assignment.get("t0", 1), Some(id(1)));
    assert_eq!(assignment.get("t0", 2), Some(id(2)));
    assert_eq!(assignment.get("t0", 3), Some(id(3)));
    // t1: {1,2,3,4} ~ {1,2,3} = 0.75; {5,6,7} ~ {6} = 0.33, ~ {4,5} = 0.25, so birth.
    assert_eq!(assignment.get("t1", 4), Some(id(1)));
    assert_eq!(assignment.get("t1", 5), Some(id(4)));
    // t2: {1,2} ~ {1,2,3,4} = 0.5; {3..7} ~ {5,6,7} = 0.6; {9} is new.
    assert_eq!(assignment.get("t2", 6), Some(id(1)));
    assert_eq!(assignment.get("t2", 7), Some(id(4)));
    assert_eq!(assignment.get("t2", 8), Some(id(5)));
}

#[test]
fn test_golden_many_to_one_inheritance() {
    let mut tracker = ChronologicalCommunityTracker::new(TrackerConfig::default());
    tracker.observe("t0", &[cluster(1, &[1, 2, 3, 4])]).unwrap();
    let split = tracker
        .observe("t1", &[cluster(1, &[1, 2]), cluster(2, &[3, 4])])
        .unwrap();

    // Both halves reach 0.5 against the parent and keep its id.
    assert_eq!(split.assigned, vec![(1, id(1)), (2, id(1))]);
    assert_eq!(split.births, 0);
}

#[test]
fn test_golden_fingerprint_stable() {
    let series = drifting_series();
    let a = ChronologicalStrategy::default().track(&series).unwrap();
    let b = ChronologicalStrategy::default().track(&series).unwrap();
    assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

    let tables_a = ChronologicalStrategy::default().membership_tables(&series).unwrap();
    let tables_b = ChronologicalStrategy::default().membership_tables(&series).unwrap();
    assert_eq!(tables_a, tables_b);
}

#[test]
fn test_golden_fingerprint_sensitive_to_threshold() {
    let series = drifting_series();
    let loose = ChronologicalStrategy::new(TrackerConfig::with_threshold(0.2))
        .track(&series)
        .unwrap();
    let strict = ChronologicalStrategy::default().track(&series).unwrap();

    // {5,6,7} ~ {6} = 0.33 qualifies at 0.2.
    assert_eq!(loose.get("t1", 5), Some(id(3)));
    assert_ne!(loose.fingerprint().unwrap(), strict.fingerprint().unwrap());
}

#[test]
fn test_golden_membership_tables_keep_cluster_order() {
    let tables = ChronologicalStrategy::default()
        .membership_tables(&drifting_series())
        .unwrap();
    let t1: Vec<&MembershipEntry> = tables["t1"].entries().iter().collect();

    assert_eq!(t1.len(), 2);
    assert_eq!(t1[0].dynamic_id, id(1));
    assert_eq!(
        t1[0].members,
        ["1", "2", "3", "4"].iter().map(|s| s.to_string()).collect::<BTreeSet<String>>()
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// History Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_golden_history_exclusive_claims() {
    let previous = history(&[(1, &[1, 2, 3]), (2, &[7, 8])]);
    let current = history(&[(5, &[1, 2, 3]), (6, &[1, 2]), (7, &[7, 8, 9])]);

    let mapping = HistoryFileMatcher::default().match_ids(&current, &previous);

    // 5 claims 1; 6 would also match 1 but it is taken, so 6 keeps its id.
    assert_eq!(mapping, vec![(5, 1), (6, 6), (7, 2)]);
}

#[test]
fn test_golden_history_last_versus_best() {
    let previous = history(&[(1, &[1, 2, 3, 4]), (2, &[1, 2])]);
    let current = history(&[(9, &[1, 2, 3, 4])]);

    let last = HistoryFileMatcher::new(0.25, CandidateSelection::LastQualifying);
    let best = HistoryFileMatcher::new(0.25, CandidateSelection::BestQualifying);

    assert_eq!(last.match_ids(&current, &previous), vec![(9, 2)]);
    assert_eq!(best.match_ids(&current, &previous), vec![(9, 1)]);
}

#[test]
fn test_golden_history_id_collision_replaces_in_place() {
    let previous = history(&[(3, &[1, 2])]);
    // 3 finds nothing and keeps its id; 4 then inherits 3 from the previous file.
    let current = history(&[(3, &[8, 9]), (4, &[1, 2])]);

    let relabeled = HistoryFileMatcher::default().match_communities(&current, Some(&previous));

    assert_eq!(relabeled.ids(), vec![3]);
    assert_eq!(
        relabeled.get(3),
        Some(&BTreeSet::from(["1".to_string(), "2".to_string()]))
    );
}
