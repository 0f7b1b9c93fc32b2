//! Export tables for the alluvial and layout views.
//!
//! Four CSV tables are produced per run:
//!
//! | File | Columns |
//! |------|---------|
//! | `nodes.csv` | node_id, x, y, time, cluster, label, dynamic_community_id |
//! | `edges.csv` | src, dst, time |
//! | `alluvial_nodes.csv` | time, community_id, size, label, dynamic_community_id |
//! | `alluvial_links.csv` | time_from, comm_id_from, time_to, comm_id_to, weight |
//!
//! The first timestamp of a run creates each file with a header. Every
//! later timestamp appends rows without one. A table is only valid if
//! timestamps were appended in processing order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::tracking::ResolvedSnapshot;
use crate::types::{Graph, NodeId};

/// Errors writing export tables.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Output file could not be opened or created.
    #[error("Failed to open {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whether a write starts a table or extends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Truncate and write the header first.
    Create,
    /// Append rows, no header.
    Append,
}

impl WriteMode {
    /// Mode for a 0-based position in the processing order.
    pub fn for_position(position: usize) -> Self {
        if position == 0 {
            Self::Create
        } else {
            Self::Append
        }
    }
}

/// A row type with a fixed file name and header.
pub trait TableRow: Serialize {
    /// File name inside the export directory.
    const FILE_NAME: &'static str;
    /// Column names, in serialization order.
    const HEADER: &'static [&'static str];
}

/// Row of `nodes.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRow {
    /// Node id.
    pub node_id: NodeId,
    /// Layout x.
    pub x: f64,
    /// Layout y.
    pub y: f64,
    /// Timestamp.
    pub time: String,
    /// `C{cluster}_{time}`.
    pub cluster: String,
    /// Node label.
    pub label: String,
    /// Dynamic id of the node's cluster.
    pub dynamic_community_id: i64,
}

impl TableRow for NodeRow {
    const FILE_NAME: &'static str = "nodes.csv";
    const HEADER: &'static [&'static str] = &[
        "node_id",
        "x",
        "y",
        "time",
        "cluster",
        "label",
        "dynamic_community_id",
    ];
}

/// Row of `edges.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeRow {
    /// First endpoint.
    pub src: NodeId,
    /// Second endpoint.
    pub dst: NodeId,
    /// Timestamp.
    pub time: String,
}

impl TableRow for EdgeRow {
    const FILE_NAME: &'static str = "edges.csv";
    const HEADER: &'static [&'static str] = &["src", "dst", "time"];
}

/// Row of `alluvial_nodes.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlluvialNodeRow {
    /// Timestamp.
    pub time: String,
    /// `C{cluster}_{time}`.
    pub community_id: String,
    /// Number of children.
    pub size: usize,
    /// `C{cluster}`.
    pub label: String,
    /// Dynamic id of the cluster.
    pub dynamic_community_id: i64,
}

impl TableRow for AlluvialNodeRow {
    const FILE_NAME: &'static str = "alluvial_nodes.csv";
    const HEADER: &'static [&'static str] =
        &["time", "community_id", "size", "label", "dynamic_community_id"];
}

/// Row of `alluvial_links.csv`: nodes flowing between two clusters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlluvialLinkRow {
    /// Earlier timestamp.
    pub time_from: String,
    /// Cluster label at `time_from`.
    pub comm_id_from: String,
    /// Later timestamp.
    pub time_to: String,
    /// Cluster label at `time_to`.
    pub comm_id_to: String,
    /// Shared members.
    pub weight: usize,
}

impl TableRow for AlluvialLinkRow {
    const FILE_NAME: &'static str = "alluvial_links.csv";
    const HEADER: &'static [&'static str] =
        &["time_from", "comm_id_from", "time_to", "comm_id_to", "weight"];
}

/// Write rows to a table file. Returns the number of data rows written.
pub fn write_table<R: TableRow>(path: &Path, rows: &[R], mode: WriteMode) -> Result<usize, ExportError> {
    let mut options = OpenOptions::new();
    match mode {
        WriteMode::Create => options.write(true).create(true).truncate(true),
        WriteMode::Append => options.append(true).create(true),
    };
    let file = options.open(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if mode == WriteMode::Create {
        writer.write_record(R::HEADER)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), rows = rows.len(), mode = ?mode, "table written");
    Ok(rows.len())
}

/// Node rows of one snapshot, in node file order.
pub fn node_rows(timestamp: &str, graph: &Graph, resolved: &ResolvedSnapshot) -> Vec<NodeRow> {
    graph
        .nodes()
        .iter()
        .map(|node| {
            let (cluster, dynamic_id) = resolved.node(node);
            NodeRow {
                node_id: node.id,
                x: node.x,
                y: node.y,
                time: timestamp.to_string(),
                cluster: format!("C{}_{}", cluster, timestamp),
                label: node.label.clone(),
                dynamic_community_id: dynamic_id.get(),
            }
        })
        .collect()
}

/// Edge rows of one snapshot.
///
/// With `dedupe_undirected`, `(b, a)` is dropped when `(a, b)` came first.
pub fn edge_rows(timestamp: &str, graph: &Graph, dedupe_undirected: bool) -> Vec<EdgeRow> {
    let mut seen = BTreeSet::new();
    graph
        .edges()
        .iter()
        .filter(|edge| !dedupe_undirected || seen.insert(edge.undirected_key()))
        .map(|edge| EdgeRow {
            src: edge.node1,
            dst: edge.node2,
            time: timestamp.to_string(),
        })
        .collect()
}

/// Alluvial block rows, one per cluster in file order.
pub fn alluvial_node_rows(
    timestamp: &str,
    graph: &Graph,
    resolved: &ResolvedSnapshot,
) -> Vec<AlluvialNodeRow> {
    graph
        .clusters()
        .iter()
        .map(|cluster| AlluvialNodeRow {
            time: timestamp.to_string(),
            community_id: cluster.timed_label(timestamp),
            size: cluster.size(),
            label: cluster.label(),
            dynamic_community_id: resolved.cluster_id(cluster.id).get(),
        })
        .collect()
}

/// Flows between every pair of clusters at consecutive timestamps that
/// share at least one node.
pub fn alluvial_link_rows(
    previous_timestamp: &str,
    previous: &Graph,
    timestamp: &str,
    graph: &Graph,
) -> Vec<AlluvialLinkRow> {
    let mut rows = Vec::new();
    for from in previous.clusters() {
        for to in graph.clusters() {
            let weight = from.children.intersection(&to.children).count();
            if weight > 0 {
                rows.push(AlluvialLinkRow {
                    time_from: previous_timestamp.to_string(),
                    comm_id_from: from.timed_label(previous_timestamp),
                    time_to: timestamp.to_string(),
                    comm_id_to: to.timed_label(timestamp),
                    weight,
                });
            }
        }
    }
    rows
}

/// Data rows written per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
    /// Rows in `nodes.csv`.
    pub nodes: usize,
    /// Rows in `edges.csv`.
    pub edges: usize,
    /// Rows in `alluvial_nodes.csv`.
    pub alluvial_nodes: usize,
    /// Rows in `alluvial_links.csv`.
    pub alluvial_links: usize,
}

impl AddAssign for TableCounts {
    fn add_assign(&mut self, other: Self) {
        self.nodes += other.nodes;
        self.edges += other.edges;
        self.alluvial_nodes += other.alluvial_nodes;
        self.alluvial_links += other.alluvial_links;
    }
}

/// One timestamp's worth of input to [`ExportTables::write_timestamp`].
#[derive(Debug, Clone, Copy)]
pub struct TimestampExport<'a> {
    /// 0-based position in the processing order.
    pub position: usize,
    /// Timestamp label.
    pub timestamp: &'a str,
    /// Snapshot.
    pub graph: &'a Graph,
    /// Dynamic ids for the snapshot.
    pub resolved: &'a ResolvedSnapshot,
    /// Previous timestamp and its snapshot, absent at position 0.
    pub previous: Option<(&'a str, &'a Graph)>,
}

/// Writer for the four tables of one export directory.
#[derive(Debug, Clone)]
pub struct ExportTables {
    dir: PathBuf,
    dedupe_undirected_edges: bool,
}

impl ExportTables {
    /// Tables under `dir`. The directory must exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            dedupe_undirected_edges: false,
        }
    }

    /// Collapse reverse-direction duplicate edges.
    pub fn with_edge_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe_undirected_edges = dedupe;
        self
    }

    /// Export directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a table inside the export directory.
    pub fn path_of<R: TableRow>(&self) -> PathBuf {
        self.dir.join(R::FILE_NAME)
    }

    /// Create or append every table for one timestamp.
    pub fn write_timestamp(&self, export: TimestampExport<'_>) -> Result<TableCounts, ExportError> {
        let mode = WriteMode::for_position(export.position);
        let TimestampExport {
            timestamp,
            graph,
            resolved,
            ..
        } = export;

        let links = match export.previous {
            Some((previous_timestamp, previous)) => {
                alluvial_link_rows(previous_timestamp, previous, timestamp, graph)
            }
            None => Vec::new(),
        };

        Ok(TableCounts {
            nodes: write_table(
                &self.path_of::<NodeRow>(),
                &node_rows(timestamp, graph, resolved),
                mode,
            )?,
            edges: write_table(
                &self.path_of::<EdgeRow>(),
                &edge_rows(timestamp, graph, self.dedupe_undirected_edges),
                mode,
            )?,
            alluvial_nodes: write_table(
                &self.path_of::<AlluvialNodeRow>(),
                &alluvial_node_rows(timestamp, graph, resolved),
                mode,
            )?,
            alluvial_links: write_table(&self.path_of::<AlluvialLinkRow>(), &links, mode)?,
        })
    }
}
