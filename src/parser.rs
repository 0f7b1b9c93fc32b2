//! Snapshot parser for marker-delimited layout files.
//!
//! One file holds one timestamp. Three marker rows sit at offsets computed
//! from the counts they declare:
//!
//! ```text
//! row 0            #nodes,N
//! rows 1..=N       id,x,y,cluster_id,label[,size]
//! row N+1          #edges,E
//! rows N+2..       id,node1,node2
//! row N+E+2        #clusters,C
//! next C rows      (id,x,y,r) then (_,child,child,...) pairs
//! ```
//!
//! Any deviation is a [`SnapshotParseError`] and aborts the snapshot.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::types::{Cluster, Edge, Graph, Node, RecordSet};

/// The three section markers, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `#nodes`
    Nodes,
    /// `#edges`
    Edges,
    /// `#clusters`
    Clusters,
}

impl Marker {
    /// Literal label of the marker row.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Nodes => "#nodes",
            Self::Edges => "#edges",
            Self::Clusters => "#clusters",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors raised while parsing a snapshot file. All are fatal.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotParseError {
    /// Marker row absent or carrying the wrong label.
    #[error("Wrong file template: expected {expected} marker at row {row}, found {found:?}")]
    MissingMarker {
        /// Marker that should have been there.
        expected: Marker,
        /// Row index it was expected at.
        row: usize,
        /// First field actually found, empty if the row is missing.
        found: String,
    },

    /// Marker count is not a non-negative integer.
    #[error("Invalid {marker} count at row {row}: {value:?}")]
    InvalidCount {
        /// Marker carrying the count.
        marker: Marker,
        /// Row index of the marker.
        row: usize,
        /// Raw count field.
        value: String,
    },

    /// A section declares more rows than the file holds.
    #[error("Row {row} missing: {section} section runs past the end of the file")]
    MissingRow {
        /// Section being read.
        section: Marker,
        /// Row index that does not exist.
        row: usize,
    },

    /// Record row shorter than its section requires.
    #[error("Row {row} has {found} fields, {section} records need at least {needed}")]
    TooFewFields {
        /// Section being read.
        section: Marker,
        /// Row index.
        row: usize,
        /// Fields present.
        found: usize,
        /// Fields required.
        needed: usize,
    },

    /// A numeric field failed to parse.
    #[error("Row {row}, field {field}: cannot parse {value:?} as {expected}")]
    InvalidField {
        /// Row index.
        row: usize,
        /// Field index within the row.
        field: usize,
        /// Raw value.
        value: String,
        /// Expected type name.
        expected: &'static str,
    },

    /// Cluster section row count is odd.
    #[error("Cluster section at row {row} declares {count} rows, which do not form (meta, children) pairs")]
    UnpairedCluster {
        /// Row index of the cluster marker.
        row: usize,
        /// Declared row count.
        count: usize,
    },

    /// Two different clusters share one id.
    #[error("Duplicate cluster id {id} at row {row}")]
    DuplicateClusterId {
        /// Repeated cluster id.
        id: i64,
        /// Row index of the second definition.
        row: usize,
    },

    /// Tokenizer failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, SnapshotParseError>;

/// Parser for one timestamp's snapshot file.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotParser;

impl SnapshotParser {
    /// Create a parser.
    pub fn new() -> Self {
        Self
    }

    /// Read and parse a snapshot file.
    pub fn parse_path(&self, path: impl AsRef<Path>) -> Result<Graph> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let graph = self.parse_reader(file)?;
        debug!(path = %path.display(), "snapshot file parsed");
        Ok(graph)
    }

    /// Tokenize comma-separated input and parse it.
    pub fn parse_reader<R: Read>(&self, reader: R) -> Result<Graph> {
        let rows = read_rows(reader)?;
        self.parse_rows(&rows)
    }

    /// Parse already tokenized rows.
    pub fn parse_rows(&self, rows: &[Vec<String>]) -> Result<Graph> {
        let rows = Rows(rows);

        let node_marker = 0;
        let node_count = rows.marker(node_marker, Marker::Nodes)?;
        let nodes = parse_nodes(&rows, node_marker + 1, node_count)?;

        let edge_marker = node_count + 1;
        let edge_count = rows.marker(edge_marker, Marker::Edges)?;
        let edges = parse_edges(&rows, edge_marker + 1, edge_count)?;

        let cluster_marker = node_count + edge_count + 2;
        let cluster_rows = rows.marker(cluster_marker, Marker::Clusters)?;
        if cluster_rows % 2 != 0 {
            return Err(SnapshotParseError::UnpairedCluster {
                row: cluster_marker,
                count: cluster_rows,
            });
        }
        let clusters = parse_clusters(&rows, cluster_marker + 1, cluster_rows / 2)?;

        debug!(
            declared_nodes = node_count,
            declared_edges = edge_count,
            declared_cluster_rows = cluster_rows,
            nodes = nodes.len(),
            edges = edges.len(),
            clusters = clusters.len(),
            "snapshot parsed"
        );

        Ok(Graph::new(nodes, edges, clusters))
    }
}

/// Tokenize headerless, ragged comma-separated rows.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<Vec<String>>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn parse_nodes(rows: &Rows<'_>, start: usize, count: usize) -> Result<RecordSet<Node>> {
    let mut nodes = RecordSet::new();
    for row in start..start + count {
        let fields = rows.record(row, Marker::Nodes, 5)?;
        let mut node = Node::new(
            parse_field(fields, row, 0)?,
            parse_field(fields, row, 1)?,
            parse_field(fields, row, 2)?,
            parse_field(fields, row, 3)?,
            fields[4].clone(),
        );
        if fields.get(5).is_some_and(|s| !s.trim().is_empty()) {
            node = node.with_size(parse_field(fields, row, 5)?);
        }
        nodes.insert(node);
    }
    Ok(nodes)
}

fn parse_edges(rows: &Rows<'_>, start: usize, count: usize) -> Result<RecordSet<Edge>> {
    let mut edges = RecordSet::new();
    for row in start..start + count {
        let fields = rows.record(row, Marker::Edges, 3)?;
        edges.insert(Edge::new(
            parse_field(fields, row, 0)?,
            parse_field(fields, row, 1)?,
            parse_field(fields, row, 2)?,
        ));
    }
    Ok(edges)
}

fn parse_clusters(rows: &Rows<'_>, start: usize, pairs: usize) -> Result<RecordSet<Cluster>> {
    let mut clusters: RecordSet<Cluster> = RecordSet::new();
    for pair in 0..pairs {
        let meta_row = start + 2 * pair;
        let child_row = meta_row + 1;

        let meta = rows.record(meta_row, Marker::Clusters, 4)?;
        let children_fields = rows.record(child_row, Marker::Clusters, 0)?;

        let mut children: Vec<i64> = Vec::with_capacity(children_fields.len().saturating_sub(1));
        for (field, value) in children_fields.iter().enumerate().skip(1) {
            if value.trim().is_empty() {
                continue;
            }
            children.push(parse_value(value, child_row, field)?);
        }

        let cluster = Cluster::new(
            parse_field(meta, meta_row, 0)?,
            parse_field(meta, meta_row, 1)?,
            parse_field(meta, meta_row, 2)?,
            parse_field(meta, meta_row, 3)?,
            children,
        );

        if let Some(existing) = clusters.get(cluster.id) {
            if existing != &cluster {
                return Err(SnapshotParseError::DuplicateClusterId {
                    id: cluster.id,
                    row: meta_row,
                });
            }
        }
        clusters.insert(cluster);
    }
    Ok(clusters)
}

struct Rows<'a>(&'a [Vec<String>]);

impl<'a> Rows<'a> {
    fn marker(&self, row: usize, expected: Marker) -> Result<usize> {
        let fields = self.0.get(row);
        let label = fields.and_then(|f| f.first()).map(|s| s.trim()).unwrap_or("");
        if label != expected.label() {
            return Err(SnapshotParseError::MissingMarker {
                expected,
                row,
                found: label.to_string(),
            });
        }

        let raw = fields.and_then(|f| f.get(1)).map(|s| s.trim()).unwrap_or("");
        let count: usize = raw.parse().map_err(|_| SnapshotParseError::InvalidCount {
            marker: expected,
            row,
            value: raw.to_string(),
        })?;

        // Every section offset stays within the file, so later row arithmetic cannot overflow.
        let remaining = self.0.len() - row - 1;
        if count > remaining {
            return Err(SnapshotParseError::MissingRow {
                section: expected,
                row: self.0.len(),
            });
        }
        Ok(count)
    }

    fn record(&self, row: usize, section: Marker, needed: usize) -> Result<&'a [String]> {
        let fields = self
            .0
            .get(row)
            .ok_or(SnapshotParseError::MissingRow { section, row })?;
        if fields.len() < needed {
            return Err(SnapshotParseError::TooFewFields {
                section,
                row,
                found: fields.len(),
                needed,
            });
        }
        Ok(fields)
    }
}

fn parse_field<T: FromStr>(fields: &[String], row: usize, field: usize) -> Result<T> {
    parse_value(fields.get(field).map(String::as_str).unwrap_or(""), row, field)
}

fn parse_value<T: FromStr>(value: &str, row: usize, field: usize) -> Result<T> {
    value.trim().parse().map_err(|_| SnapshotParseError::InvalidField {
        row,
        field,
        value: value.to_string(),
        expected: std::any::type_name::<T>(),
    })
}
