//! Batch pipeline: parse → match → resolve → export.
//!
//! One run holds the whole series in memory. It aborts on the first fatal
//! error. Degraded history input only produces warnings and unresolved ids.
//!
//! ## Dataset Layout
//!
//! ```text
//! {data_dir}/{timestamp}/layout{gen}-{layout}.csv   snapshots
//! {data_dir}/dynamic_communities/                   history files
//! {data_dir}/processed/                             export tables + run_manifest.json
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::canonical::canonical_hash_hex;
use crate::config::{ConfigError, PipelineConfig, StrategyKind};
use crate::export::{ExportError, ExportTables, TableCounts, TimestampExport};
use crate::parser::{SnapshotParseError, SnapshotParser};
use crate::tracking::{
    ChronologicalStrategy, ClusterResolver, DynamicIdStrategy, HistoryFileStrategy, TrackingError,
};
use crate::types::{DynamicCommunityId, SnapshotSeries, Timestamp};
use crate::ALLUVIAL_SCHEMA_VERSION;

/// File name of the run manifest inside the export directory.
pub const RUN_MANIFEST_FILE: &str = "run_manifest.json";

/// Fatal pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A snapshot failed to parse.
    #[error("Snapshot {timestamp} ({path}): {source}")]
    Snapshot {
        /// Timestamp of the snapshot.
        timestamp: Timestamp,
        /// File that failed.
        path: PathBuf,
        /// Parse failure.
        #[source]
        source: SnapshotParseError,
    },

    /// Dynamic id assignment failed.
    #[error(transparent)]
    Tracking(#[from] TrackingError),

    /// Export tables could not be written.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Output directory could not be created.
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Where a dataset keeps its inputs and outputs.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    data_dir: PathBuf,
    gen_number: u32,
    layout_number: u32,
}

impl DatasetLayout {
    /// Layout for a configured dataset.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            gen_number: config.gen_number,
            layout_number: config.layout_number,
        }
    }

    /// Snapshot file of a timestamp.
    pub fn snapshot_path(&self, timestamp: &str) -> PathBuf {
        self.data_dir.join(timestamp).join(format!(
            "layout{}-{}.csv",
            self.gen_number, self.layout_number
        ))
    }

    /// Directory of community history files.
    pub fn history_dir(&self) -> PathBuf {
        self.data_dir.join("dynamic_communities")
    }

    /// Export directory.
    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }
}

/// Summary of one run, written next to the export tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema version of the export tables.
    pub version: String,
    /// Strategy that assigned dynamic ids.
    pub strategy: String,
    /// Timestamps in processing order.
    pub timestamps: Vec<Timestamp>,
    /// Data rows written per table.
    pub rows: TableCounts,
    /// Clusters across all timestamps.
    pub cluster_count: usize,
    /// Clusters that resolved to the `-1` sentinel.
    pub unresolved_clusters: usize,
    /// Distinct dynamic ids, sentinel excluded.
    pub dynamic_community_count: usize,
    /// xxh64 over `(timestamp, cluster_id, dynamic_id)` in processing order.
    pub assignment_fingerprint: String,
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
}

/// Parse every configured snapshot, in configured order.
pub fn load_series(config: &PipelineConfig) -> Result<SnapshotSeries, PipelineError> {
    let layout = DatasetLayout::from_config(config);
    let parser = SnapshotParser::new();
    let mut series = SnapshotSeries::new();

    for timestamp in &config.timestamps {
        let path = layout.snapshot_path(timestamp);
        let graph = parser
            .parse_path(&path)
            .map_err(|source| PipelineError::Snapshot {
                timestamp: timestamp.clone(),
                path: path.clone(),
                source,
            })?;
        info!(
            timestamp = %timestamp,
            nodes = graph.nodes().len(),
            edges = graph.edges().len(),
            clusters = graph.clusters().len(),
            "snapshot loaded"
        );
        series.push(timestamp.clone(), graph);
    }
    Ok(series)
}

/// Strategy selected by the configuration.
pub fn strategy_for(config: &PipelineConfig) -> Box<dyn DynamicIdStrategy> {
    match config.strategy {
        StrategyKind::Chronological => Box::new(ChronologicalStrategy::new(config.tracker.clone())),
        StrategyKind::HistoryFile => Box::new(HistoryFileStrategy::new(
            config.history.clone(),
            DatasetLayout::from_config(config).history_dir(),
        )),
    }
}

/// Assign, resolve and export an already parsed series.
///
/// The table directory must exist. Tables in it are replaced.
pub fn export_series(
    series: &SnapshotSeries,
    strategy: &dyn DynamicIdStrategy,
    tables: &ExportTables,
) -> Result<RunManifest, PipelineError> {
    let resolver = ClusterResolver::new(strategy.membership_tables(series)?);

    let mut counts = TableCounts::default();
    let mut assignment = Vec::new();
    let mut previous = None;

    for (position, snapshot) in series.iter().enumerate() {
        let timestamp = snapshot.timestamp.as_str();
        let resolved = resolver.resolve_snapshot(timestamp, &snapshot.graph);

        let unresolved = resolved.unresolved_count();
        if unresolved > 0 {
            warn!(timestamp = %timestamp, unresolved = unresolved, "clusters without a dynamic id");
        }
        assignment.extend(resolved.clusters().map(|(c, d)| (timestamp, c, d.get())));

        counts += tables.write_timestamp(TimestampExport {
            position,
            timestamp,
            graph: &snapshot.graph,
            resolved: &resolved,
            previous,
        })?;
        previous = Some((timestamp, &snapshot.graph));

        info!(timestamp = %timestamp, position = position, "timestamp exported");
    }

    let mut dynamic_ids: Vec<i64> = assignment
        .iter()
        .map(|(_, _, d)| *d)
        .filter(|&d| d != DynamicCommunityId::UNRESOLVED.get())
        .collect();
    dynamic_ids.sort_unstable();
    dynamic_ids.dedup();

    let manifest = RunManifest {
        version: ALLUVIAL_SCHEMA_VERSION.to_string(),
        strategy: strategy.name().to_string(),
        timestamps: series.timestamps(),
        rows: counts,
        cluster_count: assignment.len(),
        unresolved_clusters: assignment
            .iter()
            .filter(|(_, _, d)| *d == DynamicCommunityId::UNRESOLVED.get())
            .count(),
        dynamic_community_count: dynamic_ids.len(),
        assignment_fingerprint: canonical_hash_hex(&assignment).map_err(ExportError::from)?,
        generated_at: Utc::now(),
    };

    write_manifest(tables.dir(), &manifest)?;
    Ok(manifest)
}

/// Run the configured pipeline end to end.
pub fn run(config: &PipelineConfig) -> Result<RunManifest, PipelineError> {
    config.validate()?;
    let layout = DatasetLayout::from_config(config);

    let series = load_series(config)?;
    let strategy = strategy_for(config);

    let output_dir = layout.output_dir();
    std::fs::create_dir_all(&output_dir).map_err(|source| PipelineError::OutputDir {
        path: output_dir.clone(),
        source,
    })?;
    let tables = ExportTables::new(&output_dir).with_edge_dedupe(config.dedupe_undirected_edges);

    info!(
        strategy = strategy.name(),
        timestamps = series.len(),
        output = %output_dir.display(),
        "exporting series"
    );
    let manifest = export_series(&series, strategy.as_ref(), &tables)?;

    info!(
        fingerprint = %manifest.assignment_fingerprint,
        clusters = manifest.cluster_count,
        unresolved = manifest.unresolved_clusters,
        dynamic_communities = manifest.dynamic_community_count,
        "run complete"
    );
    Ok(manifest)
}

fn write_manifest(dir: &Path, manifest: &RunManifest) -> Result<(), ExportError> {
    let path = dir.join(RUN_MANIFEST_FILE);
    let file = std::fs::File::create(&path).map_err(|source| ExportError::Io { path, source })?;
    serde_json::to_writer_pretty(file, manifest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{NodeRow, TableRow};
    use std::fs;

    fn snapshot_csv(nodes: &[i64], clusters: &[(i64, &[i64])]) -> String {
        let mut out = format!("#nodes,{}\n", nodes.len());
        for n in nodes {
            out.push_str(&format!("{},{}.0,0.0,0,n{}\n", n, n, n));
        }
        out.push_str("#edges,0\n");
        out.push_str(&format!("#clusters,{}\n", clusters.len() * 2));
        for (id, children) in clusters {
            out.push_str(&format!("{},0.0,0.0,1.0\n", id));
            let children: Vec<String> = children.iter().map(|c| c.to_string()).collect();
            out.push_str(&format!("_,{}\n", children.join(",")));
        }
        out
    }

    fn write_snapshot(root: &Path, timestamp: &str, content: &str) {
        let dir = root.join(timestamp);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("layout3-3.csv"), content).unwrap();
    }

    fn config(root: &Path, timestamps: &[&str]) -> PipelineConfig {
        PipelineConfig {
            data_dir: root.to_path_buf(),
            timestamps: timestamps.iter().map(|t| t.to_string()).collect(),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_layout_paths() {
        let layout = DatasetLayout::from_config(&config(Path::new("data"), &["1998"]));
        assert_eq!(layout.snapshot_path("1998"), Path::new("data/1998/layout3-3.csv"));
        assert_eq!(layout.history_dir(), Path::new("data/dynamic_communities"));
        assert_eq!(layout.output_dir(), Path::new("data/processed"));
    }

    #[test]
    fn test_run_chronological() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), "t0", &snapshot_csv(&[1, 2, 3], &[(1, &[1, 2, 3])]));
        write_snapshot(dir.path(), "t1", &snapshot_csv(&[1, 2, 3, 4], &[(7, &[1, 2, 3, 4])]));

        let manifest = run(&config(dir.path(), &["t0", "t1"])).unwrap();

        assert_eq!(manifest.strategy, "chronological");
        assert_eq!(manifest.timestamps, vec!["t0", "t1"]);
        assert_eq!(manifest.cluster_count, 2);
        assert_eq!(manifest.unresolved_clusters, 0);
        assert_eq!(manifest.dynamic_community_count, 1);
        assert_eq!(manifest.rows.nodes, 7);
        assert_eq!(manifest.rows.alluvial_links, 1);

        let out = dir.path().join("processed");
        assert!(out.join(RUN_MANIFEST_FILE).exists());
        let nodes = fs::read_to_string(out.join(NodeRow::FILE_NAME)).unwrap();
        assert_eq!(nodes.lines().count(), 8);
        assert!(nodes.contains("4,4.0,0.0,t1,C7_t1,n4,1"));
    }

    #[test]
    fn test_parse_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), "t0", &snapshot_csv(&[1], &[(1, &[1])]));
        write_snapshot(dir.path(), "t1", "#nodes,2\n1,0,0,0,a\n");

        let err = run(&config(dir.path(), &["t0", "t1"])).unwrap_err();
        match err {
            PipelineError::Snapshot { timestamp, .. } => assert_eq!(timestamp, "t1"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("processed").exists());
    }

    #[test]
    fn test_missing_snapshot_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&config(dir.path(), &["t0"])).unwrap_err();
        assert!(matches!(err, PipelineError::Snapshot { .. }));
    }

    #[test]
    fn test_empty_timestamps_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&config(dir.path(), &[])).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_fingerprint_stable_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), "t0", &snapshot_csv(&[1, 2], &[(1, &[1]), (2, &[2])]));
        write_snapshot(dir.path(), "t1", &snapshot_csv(&[1, 2], &[(3, &[1, 2])]));

        let cfg = config(dir.path(), &["t0", "t1"]);
        let a = run(&cfg).unwrap();
        let b = run(&cfg).unwrap();
        assert_eq!(a.assignment_fingerprint, b.assignment_fingerprint);
        assert_eq!(a.rows, b.rows);
    }
}
