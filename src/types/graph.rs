//! Snapshot graph model.
//!
//! Records are kept in first-occurrence order alongside an index keyed by
//! their natural id. Iteration is therefore reproducible, and "first wins"
//! or "last wins" rules downstream mean the same thing on every run.

use std::collections::BTreeMap;

use super::cluster::{Cluster, ClusterId};
use super::edge::Edge;
use super::node::{Node, NodeId};

/// A snapshot record with a natural integer id.
pub trait Record: PartialEq {
    /// The id the record is looked up by.
    fn natural_id(&self) -> i64;
}

/// Insertion-ordered collection deduplicated by full-record equality.
#[derive(Debug, Clone)]
pub struct RecordSet<T: Record> {
    items: Vec<T>,
    by_id: BTreeMap<i64, Vec<usize>>,
}

impl<T: Record> RecordSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            by_id: BTreeMap::new(),
        }
    }

    /// Insert a record unless an identical one is already present.
    ///
    /// Returns `false` when the record was a duplicate.
    pub fn insert(&mut self, record: T) -> bool {
        let slots = self.by_id.entry(record.natural_id()).or_default();
        if slots.iter().any(|&i| self.items[i] == record) {
            return false;
        }
        slots.push(self.items.len());
        self.items.push(record);
        true
    }

    /// Records in first-occurrence order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Records as a slice, first-occurrence order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// First record inserted with the given id.
    pub fn get(&self, id: i64) -> Option<&T> {
        self.by_id
            .get(&id)
            .and_then(|slots| slots.first())
            .map(|&i| &self.items[i])
    }

    /// Whether a distinct record already uses this id.
    pub fn contains_id(&self, id: i64) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Records sorted by natural id, ties kept in insertion order.
    pub fn sorted_by_id(&self) -> Vec<&T> {
        let mut sorted: Vec<&T> = self.items.iter().collect();
        sorted.sort_by_key(|r| r.natural_id());
        sorted
    }

    /// Number of distinct records.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Record> Default for RecordSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> FromIterator<T> for RecordSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

impl<T: Record> From<Vec<T>> for RecordSet<T> {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T: Record> From<RecordSet<T>> for Vec<T> {
    fn from(set: RecordSet<T>) -> Self {
        set.items
    }
}

impl<'a, T: Record> IntoIterator for &'a RecordSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Nodes, edges and clusters of exactly one timestamp.
///
/// Immutable once parsed; fields are read through accessors.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: RecordSet<Node>,
    edges: RecordSet<Edge>,
    clusters: RecordSet<Cluster>,
}

impl Graph {
    /// Assemble a snapshot from its three collections.
    pub fn new(nodes: RecordSet<Node>, edges: RecordSet<Edge>, clusters: RecordSet<Cluster>) -> Self {
        Self {
            nodes,
            edges,
            clusters,
        }
    }

    /// Nodes in file order.
    pub fn nodes(&self) -> &RecordSet<Node> {
        &self.nodes
    }

    /// Edges in file order.
    pub fn edges(&self) -> &RecordSet<Edge> {
        &self.edges
    }

    /// Clusters in file order.
    pub fn clusters(&self) -> &RecordSet<Cluster> {
        &self.clusters
    }

    /// Look up a cluster by id.
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(id)
    }

    /// Node → cluster membership index.
    ///
    /// Clusters are walked in file order; a node claimed twice ends up with
    /// the last cluster that lists it.
    pub fn node_cluster_index(&self) -> BTreeMap<NodeId, ClusterId> {
        let mut index = BTreeMap::new();
        for cluster in &self.clusters {
            for &child in &cluster.children {
                index.insert(child, cluster.id);
            }
        }
        index
    }
}
