//! Chronologically ordered snapshot series.

use super::graph::Graph;
use super::Timestamp;

/// One parsed snapshot tagged with its timestamp.
#[derive(Debug, Clone)]
pub struct TimedSnapshot {
    /// Timestamp label.
    pub timestamp: Timestamp,
    /// Parsed snapshot.
    pub graph: Graph,
}

/// Snapshots in the order they must be processed.
///
/// Order is the caller's: the series never sorts timestamp labels.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSeries {
    snapshots: Vec<TimedSnapshot>,
}

impl SnapshotSeries {
    /// Create an empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next timestamp.
    pub fn push(&mut self, timestamp: impl Into<Timestamp>, graph: Graph) {
        self.snapshots.push(TimedSnapshot {
            timestamp: timestamp.into(),
            graph,
        });
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, timestamp: impl Into<Timestamp>, graph: Graph) -> Self {
        self.push(timestamp, graph);
        self
    }

    /// Snapshots in processing order.
    pub fn iter(&self) -> std::slice::Iter<'_, TimedSnapshot> {
        self.snapshots.iter()
    }

    /// Timestamp labels in processing order.
    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.snapshots.iter().map(|s| s.timestamp.clone()).collect()
    }

    /// Number of timestamps.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the series is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl<'a> IntoIterator for &'a SnapshotSeries {
    type Item = &'a TimedSnapshot;
    type IntoIter = std::slice::Iter<'a, TimedSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.iter()
    }
}
