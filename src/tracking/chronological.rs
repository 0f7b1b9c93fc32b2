//! Chronological greedy Jaccard tracking.
//!
//! Timestamps are consumed strictly in order. Every cluster at t is
//! compared against every cluster at t-1. The highest-scoring predecessor
//! is selected, and the first one wins on exact ties. If its score reaches
//! the threshold, the cluster inherits that predecessor's dynamic id.
//! Otherwise the cluster is a birth and receives a fresh id.
//!
//! There is no exclusivity: several clusters at t may inherit the same id.
//! Clusters are iterated in cluster-id order so that ties and allocation
//! order are reproducible.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::canonical::canonical_hash_hex;
use crate::types::{Cluster, ClusterId, DynamicCommunityId, NodeId, SnapshotSeries, Timestamp};

use super::resolver::{MembershipEntry, MembershipTable};
use super::{jaccard, DynamicIdStrategy, TrackingError};

/// Default Jaccard threshold for inheriting a predecessor's id.
pub const DEFAULT_JACCARD_THRESHOLD: f64 = 0.4;

/// Tracker parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum Jaccard score for a cluster to inherit an id.
    pub threshold: f64,
    /// First dynamic id handed out.
    pub first_id: i64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_JACCARD_THRESHOLD,
            first_id: 1,
        }
    }
}

impl TrackerConfig {
    /// Config with a custom threshold.
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }
}

/// Mapping `(timestamp, cluster_id) → dynamic id`.
///
/// Grows one timestamp at a time and is never revised.
#[derive(Debug, Clone, Default)]
pub struct TemporalAssignment {
    by_timestamp: BTreeMap<Timestamp, BTreeMap<ClusterId, DynamicCommunityId>>,
    timestamps: Vec<Timestamp>,
}

impl TemporalAssignment {
    /// Dynamic id assigned to a cluster.
    pub fn get(&self, timestamp: &str, cluster_id: ClusterId) -> Option<DynamicCommunityId> {
        self.by_timestamp
            .get(timestamp)
            .and_then(|clusters| clusters.get(&cluster_id))
            .copied()
    }

    /// Processed timestamps, in processing order.
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Whether a timestamp has been processed.
    pub fn contains_timestamp(&self, timestamp: &str) -> bool {
        self.by_timestamp.contains_key(timestamp)
    }

    /// Total `(timestamp, cluster)` pairs.
    pub fn len(&self) -> usize {
        self.by_timestamp.values().map(BTreeMap::len).sum()
    }

    /// Whether nothing has been assigned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in processing order, clusters by id within a timestamp.
    pub fn iter(&self) -> impl Iterator<Item = (&Timestamp, ClusterId, DynamicCommunityId)> + '_ {
        self.timestamps.iter().flat_map(move |ts| {
            self.by_timestamp
                .get(ts)
                .into_iter()
                .flat_map(move |clusters| clusters.iter().map(move |(&c, &d)| (ts, c, d)))
        })
    }

    /// Every distinct dynamic id in the map.
    pub fn distinct_ids(&self) -> BTreeSet<DynamicCommunityId> {
        self.by_timestamp
            .values()
            .flat_map(|clusters| clusters.values().copied())
            .collect()
    }

    /// xxh64 fingerprint over entries in processing order.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let entries: Vec<_> = self.iter().map(|(ts, c, d)| (ts.as_str(), c, d.get())).collect();
        canonical_hash_hex(&entries)
    }

    fn record(&mut self, timestamp: Timestamp, ids: BTreeMap<ClusterId, DynamicCommunityId>) {
        self.timestamps.push(timestamp.clone());
        self.by_timestamp.insert(timestamp, ids);
    }
}

/// What one call to [`ChronologicalCommunityTracker::observe`] decided.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Timestamp processed.
    pub timestamp: Timestamp,
    /// `(cluster_id, dynamic_id)` in cluster-id order.
    pub assigned: Vec<(ClusterId, DynamicCommunityId)>,
    /// Clusters that inherited a predecessor's id.
    pub inherited: usize,
    /// Clusters that received a fresh id.
    pub births: usize,
}

/// Stateful tracker for one time series.
///
/// Owns the id counter and the assignment map. Feed it timestamps in
/// chronological order with [`observe`](Self::observe), then take the result
/// with [`into_assignment`](Self::into_assignment).
#[derive(Debug, Clone)]
pub struct ChronologicalCommunityTracker {
    config: TrackerConfig,
    next_id: i64,
    assignment: TemporalAssignment,
    previous: Option<Vec<(BTreeSet<NodeId>, DynamicCommunityId)>>,
}

impl ChronologicalCommunityTracker {
    /// Create a tracker.
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            next_id: config.first_id,
            config,
            assignment: TemporalAssignment::default(),
            previous: None,
        }
    }

    /// The id the next birth will receive.
    pub fn next_id(&self) -> i64 {
        self.next_id
    }

    /// Threshold in use.
    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    /// Assignment built so far.
    pub fn assignment(&self) -> &TemporalAssignment {
        &self.assignment
    }

    /// Dynamic id of an already processed cluster.
    pub fn dynamic_id(&self, timestamp: &str, cluster_id: ClusterId) -> Option<DynamicCommunityId> {
        self.assignment.get(timestamp, cluster_id)
    }

    /// Consume the tracker and return the finished assignment.
    pub fn into_assignment(self) -> TemporalAssignment {
        self.assignment
    }

    /// Assign dynamic ids to the clusters of the next timestamp.
    pub fn observe(
        &mut self,
        timestamp: impl Into<Timestamp>,
        clusters: &[Cluster],
    ) -> Result<Observation, TrackingError> {
        let timestamp = timestamp.into();
        if self.assignment.contains_timestamp(&timestamp) {
            return Err(TrackingError::TimestampAlreadyProcessed(timestamp));
        }

        let mut ordered: Vec<&Cluster> = clusters.iter().collect();
        ordered.sort_by_key(|c| c.id);

        let mut assigned = Vec::with_capacity(ordered.len());
        let mut current = Vec::with_capacity(ordered.len());
        let mut inherited = 0;
        let mut births = 0;

        for cluster in ordered {
            let predecessor = self
                .previous
                .as_deref()
                .and_then(|prev| best_predecessor(&cluster.children, prev, self.config.threshold));

            let id = match predecessor {
                Some(id) => {
                    inherited += 1;
                    id
                }
                None => {
                    births += 1;
                    self.allocate()
                }
            };

            assigned.push((cluster.id, id));
            current.push((cluster.children.clone(), id));
        }

        debug!(
            timestamp = %timestamp,
            clusters = assigned.len(),
            inherited = inherited,
            births = births,
            next_id = self.next_id,
            "timestamp tracked"
        );

        self.assignment
            .record(timestamp.clone(), assigned.iter().copied().collect());
        self.previous = Some(current);

        Ok(Observation {
            timestamp,
            assigned,
            inherited,
            births,
        })
    }

    fn allocate(&mut self) -> DynamicCommunityId {
        let id = DynamicCommunityId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Highest-scoring predecessor, first on ties, if it reaches the threshold.
///
/// A zero score never qualifies, so a cluster with no overlap is always a birth.
fn best_predecessor(
    children: &BTreeSet<NodeId>,
    previous: &[(BTreeSet<NodeId>, DynamicCommunityId)],
    threshold: f64,
) -> Option<DynamicCommunityId> {
    let mut best: Option<(f64, DynamicCommunityId)> = None;
    for (prev_children, prev_id) in previous {
        let score = jaccard(children, prev_children);
        if score > best.map_or(0.0, |(s, _)| s) {
            best = Some((score, *prev_id));
        }
    }
    best.filter(|(score, _)| *score >= threshold).map(|(_, id)| id)
}

/// [`DynamicIdStrategy`] backed by a fresh tracker per run.
#[derive(Debug, Clone, Default)]
pub struct ChronologicalStrategy {
    config: TrackerConfig,
}

impl ChronologicalStrategy {
    /// Create the strategy.
    pub fn new(config: TrackerConfig) -> Self {
        Self { config }
    }

    /// Track the whole series and return the assignment map.
    pub fn track(&self, series: &SnapshotSeries) -> Result<TemporalAssignment, TrackingError> {
        let mut tracker = ChronologicalCommunityTracker::new(self.config.clone());
        for snapshot in series {
            tracker.observe(snapshot.timestamp.clone(), snapshot.graph.clusters().as_slice())?;
        }
        Ok(tracker.into_assignment())
    }
}

impl DynamicIdStrategy for ChronologicalStrategy {
    fn name(&self) -> &'static str {
        "chronological"
    }

    fn membership_tables(
        &self,
        series: &SnapshotSeries,
    ) -> Result<BTreeMap<Timestamp, MembershipTable>, TrackingError> {
        let assignment = self.track(series)?;

        let mut tables = BTreeMap::new();
        for snapshot in series {
            let table: MembershipTable = snapshot
                .graph
                .clusters()
                .iter()
                .filter_map(|cluster| {
                    assignment
                        .get(&snapshot.timestamp, cluster.id)
                        .map(|id| MembershipEntry::new(id, cluster.member_keys()))
                })
                .collect();
            tables.insert(snapshot.timestamp.clone(), table);
        }
        Ok(tables)
    }
}
