//! Spatial clusters of a layout snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::graph::Record;
use super::node::NodeId;

/// Integer id of a cluster, unique within a snapshot.
pub type ClusterId = i64;

/// A cluster: layout circle plus the community members it encloses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster id.
    pub id: ClusterId,
    /// Centre x.
    pub x: f64,
    /// Centre y.
    pub y: f64,
    /// Radius.
    pub r: f64,
    /// Member node ids at this timestamp.
    pub children: BTreeSet<NodeId>,
}

impl Cluster {
    /// Create a new cluster.
    pub fn new(
        id: ClusterId,
        x: f64,
        y: f64,
        r: f64,
        children: impl IntoIterator<Item = NodeId>,
    ) -> Self {
        Self {
            id,
            x,
            y,
            r,
            children: children.into_iter().collect(),
        }
    }

    /// Number of member nodes.
    pub fn size(&self) -> usize {
        self.children.len()
    }

    /// Members rendered as strings, the form community history files use.
    ///
    /// Ids use canonical decimal form. History members are compared as raw
    /// text, so `007` or `+5` in a history file never equals node 7 or 5.
    pub fn member_keys(&self) -> BTreeSet<String> {
        self.children.iter().map(|c| c.to_string()).collect()
    }

    /// Row label, `C{id}`.
    pub fn label(&self) -> String {
        format!("C{}", self.id)
    }

    /// Id unique across the whole series, `C{id}_{timestamp}`.
    pub fn timed_label(&self, timestamp: &str) -> String {
        format!("C{}_{}", self.id, timestamp)
    }
}

impl Record for Cluster {
    fn natural_id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_collapse() {
        let cluster = Cluster::new(3, 0.0, 0.0, 1.0, [4, 5, 4]);
        assert_eq!(cluster.size(), 2);
        assert_eq!(cluster.member_keys(), ["4", "5"].iter().map(|s| s.to_string()).collect::<BTreeSet<String>>());
    }

    #[test]
    fn test_member_keys_are_canonical_decimal() {
        let cluster = Cluster::new(1, 0.0, 0.0, 1.0, [7, 5, -3]);
        let keys = cluster.member_keys();
        assert!(keys.contains("7"));
        assert!(keys.contains("-3"));
        assert!(!keys.contains("007"));
        assert!(!keys.contains("+5"));
    }

    #[test]
    fn test_labels() {
        let cluster = Cluster::new(7, 0.0, 0.0, 1.0, []);
        assert_eq!(cluster.label(), "C7");
        assert_eq!(cluster.timed_label("2001"), "C7_2001");
    }
}
