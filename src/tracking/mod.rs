//! Temporal community identity resolution.
//!
//! Each timestamp's clusters are computed independently, so nothing in a
//! single snapshot says which cluster "is" which cluster one step earlier.
//! Two strategies answer that question:
//!
//! 1. **Chronological**: greedy best-Jaccard matching against the previous
//!    timestamp's clusters, minting fresh ids for births
//!    ([`ChronologicalCommunityTracker`]).
//! 2. **History file**: exclusive threshold matching between externally
//!    supplied community files, keeping their own ids when nothing qualifies
//!    ([`HistoryFileMatcher`]).
//!
//! Both produce per-timestamp [`MembershipTable`]s, which the
//! [`ClusterResolver`] turns into a dynamic id for every cluster and node.
//!
//! ```text
//! SnapshotSeries → DynamicIdStrategy → MembershipTables → ClusterResolver
//! ```

pub mod chronological;
pub mod history;
pub mod resolver;

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{SnapshotSeries, Timestamp};

pub use chronological::{
    ChronologicalCommunityTracker, ChronologicalStrategy, Observation, TemporalAssignment,
    TrackerConfig, DEFAULT_JACCARD_THRESHOLD,
};
pub use history::{
    CandidateSelection, CommunityHistory, HistoryFileError, HistoryFileMatcher,
    HistoryFileStrategy, DEFAULT_HISTORY_THRESHOLD,
};
pub use resolver::{ClusterResolver, MembershipEntry, MembershipTable, ResolvedSnapshot};

/// Errors raised while assigning dynamic ids.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    /// A timestamp was fed to a tracker twice.
    #[error("Timestamp {0} was already processed; assignments are never revised")]
    TimestampAlreadyProcessed(Timestamp),
}

/// A named way of producing per-timestamp membership tables.
///
/// Implementations stay separate. They only share this entry point, which
/// the pipeline calls once per run.
pub trait DynamicIdStrategy {
    /// Strategy name recorded in run manifests.
    fn name(&self) -> &'static str;

    /// Build the membership table for every timestamp in the series.
    fn membership_tables(
        &self,
        series: &SnapshotSeries,
    ) -> Result<BTreeMap<Timestamp, MembershipTable>, TrackingError>;
}

/// Jaccard similarity `|A ∩ B| / |A ∪ B|`.
///
/// Defined as `0.0` when either set is empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    shared as f64 / union as f64
}
