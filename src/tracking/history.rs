//! Community history files and exclusive history matching.
//!
//! A history file lists communities as alternating lines:
//!
//! ```text
//! 12:
//! 4,8,15
//! 13:
//!
//! ```
//!
//! An empty member line is an empty community. A trailing header with no
//! member line is dropped.
//!
//! [`HistoryFileMatcher`] relabels the communities of one file against the
//! file of the previous timestamp. Each previous id can be claimed at most
//! once. A community that finds no qualifying predecessor keeps its own id,
//! so this strategy never mints ids.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::types::{DynamicCommunityId, SnapshotSeries, Timestamp};

use super::resolver::{MembershipEntry, MembershipTable};
use super::{jaccard, DynamicIdStrategy, TrackingError};

/// Default Jaccard threshold for history matching.
pub const DEFAULT_HISTORY_THRESHOLD: f64 = 0.25;

/// Errors reading history files. A missing file is not an error.
#[derive(Debug, thiserror::Error)]
pub enum HistoryFileError {
    /// The file exists but could not be read.
    #[error("Failed to read community history {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Communities of one history file, in declared order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommunityHistory {
    communities: Vec<(i64, BTreeSet<String>)>,
}

impl CommunityHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the alternating-line file format.
    pub fn parse(content: &str) -> Self {
        let lines: Vec<&str> = content.lines().collect();
        let mut history = Self::new();

        for pair in lines.chunks_exact(2) {
            let (header, members) = (pair[0], pair[1]);
            let raw_id = header.trim().split(':').next().unwrap_or("").trim();
            let Ok(id) = raw_id.parse::<i64>() else {
                warn!(header = %header, "skipping community with unreadable id");
                continue;
            };

            let members: BTreeSet<String> = if members.trim().is_empty() {
                BTreeSet::new()
            } else {
                members.trim().split(',').map(|m| m.trim().to_string()).collect()
            };
            history.insert(id, members);
        }

        if lines.len() % 2 != 0 {
            debug!(lines = lines.len(), "dropping trailing history line");
        }
        history
    }

    /// Load a history file. `Ok(None)` when the file does not exist.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; the affected members
    /// simply never match a snapshot node.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, HistoryFileError> {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(Self::parse(&String::from_utf8_lossy(&bytes)))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(HistoryFileError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Load a history file, logging and returning `None` when it is missing
    /// or unreadable.
    pub fn load_or_warn(path: impl AsRef<Path>, role: &'static str) -> Option<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(Some(history)) => Some(history),
            Ok(None) => {
                warn!(path = %path.display(), role, "community file not found");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), role, error = %e, "community file unreadable");
                None
            }
        }
    }

    /// Set a community's members.
    ///
    /// An existing id keeps its position and has its members replaced.
    pub fn insert(&mut self, id: i64, members: BTreeSet<String>) {
        match self.communities.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = members,
            None => self.communities.push((id, members)),
        }
    }

    /// Members of a community.
    pub fn get(&self, id: i64) -> Option<&BTreeSet<String>> {
        self.communities
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, members)| members)
    }

    /// Communities in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &BTreeSet<String>)> + '_ {
        self.communities.iter().map(|(id, members)| (*id, members))
    }

    /// Community ids in declared order.
    pub fn ids(&self) -> Vec<i64> {
        self.communities.iter().map(|(id, _)| *id).collect()
    }

    /// Number of communities.
    pub fn len(&self) -> usize {
        self.communities.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    /// Convert to a resolver table, ids taken as dynamic ids.
    pub fn to_membership_table(&self) -> MembershipTable {
        self.iter()
            .map(|(id, members)| MembershipEntry::new(DynamicCommunityId::new(id), members.clone()))
            .collect()
    }
}

/// How a qualifying previous community is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSelection {
    /// Every qualifying candidate overwrites the pick; the last one in scan
    /// order wins, even when an earlier one scored higher.
    #[default]
    LastQualifying,
    /// Highest-scoring qualifying candidate, first on ties.
    BestQualifying,
}

/// Exclusive threshold matcher between two history files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryFileMatcher {
    /// Minimum Jaccard score for a candidate to qualify.
    pub threshold: f64,
    /// Candidate selection rule.
    pub selection: CandidateSelection,
}

impl Default for HistoryFileMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_HISTORY_THRESHOLD,
            selection: CandidateSelection::default(),
        }
    }
}

impl HistoryFileMatcher {
    /// Create a matcher.
    pub fn new(threshold: f64, selection: CandidateSelection) -> Self {
        Self {
            threshold,
            selection,
        }
    }

    /// Decide the new id of every current community.
    ///
    /// Returns `(current_id, new_id)` pairs in current-file order.
    pub fn match_ids(
        &self,
        current: &CommunityHistory,
        previous: &CommunityHistory,
    ) -> Vec<(i64, i64)> {
        let mut used: BTreeSet<i64> = BTreeSet::new();
        let mut mapping = Vec::with_capacity(current.len());

        for (curr_id, curr_nodes) in current.iter() {
            let mut best: Option<(f64, i64)> = None;

            for (prev_id, prev_nodes) in previous.iter() {
                if used.contains(&prev_id) {
                    continue;
                }
                let score = jaccard(curr_nodes, prev_nodes);
                if score < self.threshold {
                    continue;
                }
                let replace = match (self.selection, best) {
                    (CandidateSelection::LastQualifying, _) => true,
                    (CandidateSelection::BestQualifying, None) => true,
                    (CandidateSelection::BestQualifying, Some((best_score, _))) => score > best_score,
                };
                if replace {
                    best = Some((score, prev_id));
                }
            }

            let new_id = match best {
                Some((_, prev_id)) => {
                    used.insert(prev_id);
                    prev_id
                }
                None => curr_id,
            };
            mapping.push((curr_id, new_id));
        }
        mapping
    }

    /// Relabel `current` against `previous`.
    ///
    /// Without a previous file the current communities come back unchanged.
    pub fn match_communities(
        &self,
        current: &CommunityHistory,
        previous: Option<&CommunityHistory>,
    ) -> CommunityHistory {
        let Some(previous) = previous else {
            return current.clone();
        };

        let mut result = CommunityHistory::new();
        for ((_, new_id), (_, members)) in self.match_ids(current, previous).into_iter().zip(current.iter()) {
            result.insert(new_id, members.clone());
        }
        result
    }

    /// Load both files and relabel.
    ///
    /// A missing or unreadable current file yields an empty history; a
    /// missing or unreadable previous file yields the current one unchanged.
    /// Both cases log a warning.
    pub fn match_files(
        &self,
        current_path: impl AsRef<Path>,
        previous_path: impl AsRef<Path>,
    ) -> CommunityHistory {
        let Some(current) = CommunityHistory::load_or_warn(current_path, "current") else {
            return CommunityHistory::new();
        };

        let previous = CommunityHistory::load_or_warn(previous_path, "previous");
        self.match_communities(&current, previous.as_ref())
    }
}

/// [`DynamicIdStrategy`] reading one history file per timestamp.
///
/// The file for series position `i` is `dynamic_community_{i+1}.txt`. The
/// first position is loaded as-is. Every later position is matched against
/// the file of the position before it.
#[derive(Debug, Clone)]
pub struct HistoryFileStrategy {
    matcher: HistoryFileMatcher,
    directory: PathBuf,
}

impl HistoryFileStrategy {
    /// Create the strategy over a directory of history files.
    pub fn new(matcher: HistoryFileMatcher, directory: impl Into<PathBuf>) -> Self {
        Self {
            matcher,
            directory: directory.into(),
        }
    }

    /// History file for a 0-based series position.
    pub fn path_for(&self, position: usize) -> PathBuf {
        self.directory
            .join(format!("dynamic_community_{}.txt", position + 1))
    }
}

impl DynamicIdStrategy for HistoryFileStrategy {
    fn name(&self) -> &'static str {
        "history_file"
    }

    fn membership_tables(
        &self,
        series: &SnapshotSeries,
    ) -> Result<BTreeMap<Timestamp, MembershipTable>, TrackingError> {
        let mut tables = BTreeMap::new();

        for (position, snapshot) in series.iter().enumerate() {
            let current_path = self.path_for(position);
            let history = if position == 0 {
                CommunityHistory::load_or_warn(&current_path, "current").unwrap_or_default()
            } else {
                self.matcher
                    .match_files(&current_path, self.path_for(position - 1))
            };

            debug!(
                timestamp = %snapshot.timestamp,
                communities = history.len(),
                "history communities loaded"
            );
            tables.insert(snapshot.timestamp.clone(), history.to_membership_table());
        }
        Ok(tables)
    }
}
