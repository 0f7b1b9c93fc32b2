//! Edge records of a layout snapshot.

use serde::{Deserialize, Serialize};

use super::graph::Record;
use super::node::NodeId;

/// Integer id of an edge.
pub type EdgeId = i64;

/// Edge between two nodes.
///
/// Identity is the edge's own id, not its endpoint pair. Layout tools emit
/// undirected graphs with both directions present, so `(a, b)` and `(b, a)`
/// arrive as two records with different ids and are kept apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Edge id.
    pub id: EdgeId,
    /// First endpoint.
    pub node1: NodeId,
    /// Second endpoint.
    pub node2: NodeId,
}

impl Edge {
    /// Create a new edge.
    pub fn new(id: EdgeId, node1: NodeId, node2: NodeId) -> Self {
        Self { id, node1, node2 }
    }

    /// Endpoint pair with the smaller id first.
    pub fn undirected_key(&self) -> (NodeId, NodeId) {
        if self.node1 <= self.node2 {
            (self.node1, self.node2)
        } else {
            (self.node2, self.node1)
        }
    }
}

impl Record for Edge {
    fn natural_id(&self) -> i64 {
        self.id
    }
}
