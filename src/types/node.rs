//! Node records of a layout snapshot.

use serde::{Deserialize, Serialize};

use super::graph::Record;

/// Integer id of a node, unique within a snapshot.
pub type NodeId = i64;

/// Display size used when the snapshot row carries no size column.
pub const DEFAULT_NODE_SIZE: f64 = 2.0;

/// A positioned node in one layout snapshot.
///
/// Equality compares every field, mirroring how snapshot rows collapse:
/// two byte-identical rows are one node, rows that differ anywhere stay
/// distinct. Lookups go through [`Record::natural_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node id.
    pub id: NodeId,
    /// Layout x coordinate.
    pub x: f64,
    /// Layout y coordinate.
    pub y: f64,
    /// Cluster declared on the node row itself.
    pub cluster_id: i64,
    /// Free-form label.
    pub label: String,
    /// Display size.
    pub size: f64,
}

impl Node {
    /// Create a node with the default display size.
    pub fn new(id: NodeId, x: f64, y: f64, cluster_id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            x,
            y,
            cluster_id,
            label: label.into(),
            size: DEFAULT_NODE_SIZE,
        }
    }

    /// Override the display size.
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }
}

impl Record for Node {
    fn natural_id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_size() {
        let node = Node::new(6, 0.16, -0.39, 2, "Viant MR");
        assert_eq!(node.size, DEFAULT_NODE_SIZE);
        assert_eq!(node.with_size(5.0).size, 5.0);
    }

    #[test]
    fn test_full_value_equality() {
        let a = Node::new(1, 0.0, 0.0, 1, "a");
        let b = Node::new(1, 0.0, 0.0, 1, "b");
        assert_ne!(a, b);
        assert_eq!(a.natural_id(), b.natural_id());
    }
}
