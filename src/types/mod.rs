//! Core types for layout snapshots and community identity.

pub mod node;
pub mod edge;
pub mod cluster;
pub mod graph;
pub mod community;
pub mod series;

pub use node::{Node, NodeId, DEFAULT_NODE_SIZE};
pub use edge::{Edge, EdgeId};
pub use cluster::{Cluster, ClusterId};
pub use graph::{Graph, Record, RecordSet};
pub use community::DynamicCommunityId;
pub use series::{SnapshotSeries, TimedSnapshot};

/// Label of one timestamp in the series, e.g. `"1998"`.
///
/// Labels are opaque; chronological order is the order the caller supplies.
pub type Timestamp = String;
