//! # alluvial-kernel
//!
//! Temporal community identity for layout snapshot series.
//!
//! The kernel answers one question:
//!
//! > Given independently clustered snapshots, which clusters are **the same
//! > community** over time?
//!
//! ## Core Contract
//!
//! 1. Parse one marker-delimited layout file per timestamp into a [`Graph`]
//! 2. Assign every cluster a dynamic community id that persists across time
//! 3. Export node, edge and alluvial tables keyed by those ids
//!
//! ## Architecture
//!
//! ```text
//! layout CSVs → SnapshotParser → SnapshotSeries → DynamicIdStrategy
//!                                                       ↓
//!                     ExportTables ← ClusterResolver ← MembershipTables
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same series + same config → identical export tables and fingerprint
//! - Clusters are matched in ascending id order, ties keep the first candidate
//! - Fresh dynamic ids are minted in processing order, never reused

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod parser;
pub mod tracking;
pub mod export;
pub mod config;
pub mod pipeline;
pub mod canonical;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{
    Cluster, ClusterId, DynamicCommunityId, Edge, EdgeId, Graph, Node, NodeId, Record,
    RecordSet, SnapshotSeries, TimedSnapshot, Timestamp,
};
pub use parser::{Marker, SnapshotParseError, SnapshotParser};
pub use tracking::{
    jaccard, CandidateSelection, ChronologicalCommunityTracker, ChronologicalStrategy,
    ClusterResolver, CommunityHistory, DynamicIdStrategy, HistoryFileMatcher,
    HistoryFileStrategy, MembershipTable, ResolvedSnapshot, TemporalAssignment, TrackerConfig,
    TrackingError,
};
pub use export::{ExportError, ExportTables, TableCounts, WriteMode};
pub use config::{ConfigError, PipelineConfig, StrategyKind};
pub use pipeline::{run, DatasetLayout, PipelineError, RunManifest};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};

/// Schema version of the export tables and run manifest.
/// Increment on breaking changes to any table layout.
pub const ALLUVIAL_SCHEMA_VERSION: &str = "1.0.0";
