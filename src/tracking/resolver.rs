//! Cluster and node resolution against membership tables.
//!
//! A cluster resolves to the first table entry whose members equal its
//! children exactly. No match yields [`DynamicCommunityId::UNRESOLVED`].
//! Nodes resolve through the cluster that claims them.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Cluster, ClusterId, DynamicCommunityId, Graph, Node, NodeId, Timestamp};

/// One community of a membership table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipEntry {
    /// Dynamic id carried by the community.
    pub dynamic_id: DynamicCommunityId,
    /// Member node ids, as strings.
    pub members: BTreeSet<String>,
}

impl MembershipEntry {
    /// Create an entry.
    pub fn new(dynamic_id: DynamicCommunityId, members: BTreeSet<String>) -> Self {
        Self {
            dynamic_id,
            members,
        }
    }
}

/// Ordered communities of one timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipTable {
    entries: Vec<MembershipEntry>,
}

impl MembershipTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, entry: MembershipEntry) {
        self.entries.push(entry);
    }

    /// Entries in order.
    pub fn entries(&self) -> &[MembershipEntry] {
        &self.entries
    }

    /// First entry whose members equal `members` exactly.
    pub fn find_exact(&self, members: &BTreeSet<String>) -> Option<&MembershipEntry> {
        self.entries.iter().find(|e| &e.members == members)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<MembershipEntry> for MembershipTable {
    fn from_iter<I: IntoIterator<Item = MembershipEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Dynamic ids for every cluster and node of one snapshot.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSnapshot {
    clusters: BTreeMap<ClusterId, DynamicCommunityId>,
    node_clusters: BTreeMap<NodeId, ClusterId>,
}

impl ResolvedSnapshot {
    /// Dynamic id of a cluster, unresolved if the cluster is unknown.
    pub fn cluster_id(&self, cluster_id: ClusterId) -> DynamicCommunityId {
        self.clusters
            .get(&cluster_id)
            .copied()
            .unwrap_or(DynamicCommunityId::UNRESOLVED)
    }

    /// Cluster a node belongs to: the claiming cluster, else the node's own
    /// `cluster_id` column.
    pub fn node_cluster(&self, node: &Node) -> ClusterId {
        self.node_clusters
            .get(&node.id)
            .copied()
            .unwrap_or(node.cluster_id)
    }

    /// Node's cluster and that cluster's dynamic id.
    pub fn node(&self, node: &Node) -> (ClusterId, DynamicCommunityId) {
        let cluster = self.node_cluster(node);
        (cluster, self.cluster_id(cluster))
    }

    /// Number of clusters that resolved to the sentinel.
    pub fn unresolved_count(&self) -> usize {
        self.clusters.values().filter(|d| d.is_unresolved()).count()
    }

    /// `(cluster_id, dynamic_id)` by cluster id.
    pub fn clusters(&self) -> impl Iterator<Item = (ClusterId, DynamicCommunityId)> + '_ {
        self.clusters.iter().map(|(&c, &d)| (c, d))
    }
}

/// Resolves clusters and nodes using per-timestamp membership tables.
#[derive(Debug, Clone, Default)]
pub struct ClusterResolver {
    tables: BTreeMap<Timestamp, MembershipTable>,
}

impl ClusterResolver {
    /// Create a resolver over the tables one strategy produced.
    pub fn new(tables: BTreeMap<Timestamp, MembershipTable>) -> Self {
        Self { tables }
    }

    /// Table for a timestamp.
    pub fn table(&self, timestamp: &str) -> Option<&MembershipTable> {
        self.tables.get(timestamp)
    }

    /// Dynamic id of a cluster by exact child-set equality.
    pub fn resolve_cluster(&self, timestamp: &str, cluster: &Cluster) -> DynamicCommunityId {
        let members = cluster.member_keys();
        self.table(timestamp)
            .and_then(|table| table.find_exact(&members))
            .map(|entry| entry.dynamic_id)
            .unwrap_or(DynamicCommunityId::UNRESOLVED)
    }

    /// Resolve every cluster and index every claimed node of a snapshot.
    pub fn resolve_snapshot(&self, timestamp: &str, graph: &Graph) -> ResolvedSnapshot {
        let clusters = graph
            .clusters()
            .iter()
            .map(|cluster| (cluster.id, self.resolve_cluster(timestamp, cluster)))
            .collect();

        ResolvedSnapshot {
            clusters,
            node_clusters: graph.node_cluster_index(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordSet;

    fn keys(items: &[i64]) -> BTreeSet<String> {
        items.iter().map(|i| i.to_string()).collect()
    }

    fn id(raw: i64) -> DynamicCommunityId {
        DynamicCommunityId::new(raw)
    }

    fn resolver(entries: &[(i64, Vec<i64>)]) -> ClusterResolver {
        let table = entries
            .iter()
            .map(|(d, m)| MembershipEntry::new(id(*d), keys(m)))
            .collect();
        ClusterResolver::new(BTreeMap::from([("t0".to_string(), table)]))
    }

    #[test]
    fn test_exact_match_required() {
        let resolver = resolver(&[(7, vec![1, 2, 3])]);

        assert_eq!(resolver.resolve_cluster("t0", &Cluster::new(1, 0.0, 0.0, 1.0, [1, 2, 3])), id(7));
        // Subset and superset do not match.
        assert!(resolver.resolve_cluster("t0", &Cluster::new(1, 0.0, 0.0, 1.0, [1, 2])).is_unresolved());
        assert!(resolver.resolve_cluster("t0", &Cluster::new(1, 0.0, 0.0, 1.0, [1, 2, 3, 4])).is_unresolved());
    }

    #[test]
    fn test_first_matching_entry_wins() {
        let resolver = resolver(&[(4, vec![5]), (9, vec![5])]);
        assert_eq!(resolver.resolve_cluster("t0", &Cluster::new(1, 0.0, 0.0, 1.0, [5])), id(4));
    }

    #[test]
    fn test_unknown_timestamp_unresolved() {
        let resolver = resolver(&[(4, vec![5])]);
        assert_eq!(
            resolver.resolve_cluster("t9", &Cluster::new(1, 0.0, 0.0, 1.0, [5])),
            DynamicCommunityId::UNRESOLVED
        );
    }

    #[test]
    fn test_nodes_follow_claiming_cluster() {
        let nodes: RecordSet<Node> = vec![
            Node::new(1, 0.0, 0.0, 99, "a"),
            Node::new(2, 0.0, 0.0, 99, "b"),
            Node::new(3, 0.0, 0.0, 5, "c"),
        ]
        .into();
        let clusters: RecordSet<Cluster> = vec![
            Cluster::new(1, 0.0, 0.0, 1.0, [1, 2]),
            Cluster::new(2, 0.0, 0.0, 1.0, [2]),
        ]
        .into();
        let graph = Graph::new(nodes, RecordSet::new(), clusters);

        let resolved = resolver(&[(10, vec![1, 2]), (20, vec![2])]).resolve_snapshot("t0", &graph);
        let node = |i| graph.nodes().get(i).unwrap();

        assert_eq!(resolved.node(node(1)), (1, id(10)));
        // Claimed by both clusters; the last one indexed wins.
        assert_eq!(resolved.node(node(2)), (2, id(20)));
        // Unclaimed: falls back to its own column, which names no cluster.
        assert_eq!(resolved.node(node(3)), (5, DynamicCommunityId::UNRESOLVED));
        assert_eq!(resolved.unresolved_count(), 0);
    }
}
