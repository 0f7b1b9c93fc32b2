//! Run configuration.
//!
//! Loaded from a JSON file or from environment variables:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `ALLUVIAL_DATA_DIR` | Dataset root | `data` |
//! | `ALLUVIAL_TIMESTAMPS` | `1998..=2013` or `a,b,c` | (required) |
//! | `ALLUVIAL_STRATEGY` | `chronological` or `history_file` | `chronological` |
//! | `ALLUVIAL_JACCARD_THRESHOLD` | Chronological threshold | `0.4` |
//! | `ALLUVIAL_HISTORY_THRESHOLD` | History threshold | `0.25` |
//! | `ALLUVIAL_HISTORY_SELECTION` | `last_qualifying` or `best_qualifying` | `last_qualifying` |
//! | `ALLUVIAL_FIRST_DYNAMIC_ID` | First id minted | `1` |
//! | `ALLUVIAL_LAYOUT` | `gen-layout` numbers | `3-3` |
//! | `ALLUVIAL_DEDUPE_EDGES` | Collapse reverse edges | `false` |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::tracking::{CandidateSelection, HistoryFileMatcher, TrackerConfig};

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A value is malformed or out of range.
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue {
        /// Setting name.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for [`PipelineConfig`].
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            reason: reason.into(),
        }
    }
}

/// Which matching strategy assigns dynamic ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Greedy best-Jaccard against the previous timestamp.
    #[default]
    Chronological,
    /// Exclusive matching over community history files.
    HistoryFile,
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chronological" => Ok(Self::Chronological),
            "history_file" | "history" => Ok(Self::HistoryFile),
            other => Err(ConfigError::invalid("strategy", format!("unknown strategy {:?}", other))),
        }
    }
}

/// Everything one batch run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Dataset root.
    pub data_dir: PathBuf,
    /// Timestamps in processing order.
    pub timestamps: Vec<String>,
    /// Layout generation number in snapshot file names.
    pub gen_number: u32,
    /// Layout number in snapshot file names.
    pub layout_number: u32,
    /// Matching strategy.
    pub strategy: StrategyKind,
    /// Chronological tracker parameters.
    pub tracker: TrackerConfig,
    /// History matcher parameters.
    pub history: HistoryFileMatcher,
    /// Collapse `(b, a)` edges when `(a, b)` was already written.
    pub dedupe_undirected_edges: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            timestamps: Vec::new(),
            gen_number: 3,
            layout_number: 3,
            strategy: StrategyKind::default(),
            tracker: TrackerConfig::default(),
            history: HistoryFileMatcher::default(),
            dedupe_undirected_edges: false,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("ALLUVIAL_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("ALLUVIAL_TIMESTAMPS") {
            config.timestamps = parse_timestamps(&raw)?;
        }
        if let Some(raw) = lookup("ALLUVIAL_STRATEGY") {
            config.strategy = raw.parse()?;
        }
        if let Some(raw) = lookup("ALLUVIAL_JACCARD_THRESHOLD") {
            config.tracker.threshold = parse_number("jaccard_threshold", &raw)?;
        }
        if let Some(raw) = lookup("ALLUVIAL_HISTORY_THRESHOLD") {
            config.history.threshold = parse_number("history_threshold", &raw)?;
        }
        if let Some(raw) = lookup("ALLUVIAL_HISTORY_SELECTION") {
            config.history.selection = parse_selection(&raw)?;
        }
        if let Some(raw) = lookup("ALLUVIAL_FIRST_DYNAMIC_ID") {
            config.tracker.first_id = parse_number("first_dynamic_id", &raw)?;
        }
        if let Some(raw) = lookup("ALLUVIAL_LAYOUT") {
            let (generation, layout) = raw
                .split_once('-')
                .ok_or_else(|| ConfigError::invalid("layout", "expected `gen-layout`"))?;
            config.gen_number = parse_number("layout", generation)?;
            config.layout_number = parse_number("layout", layout)?;
        }
        if let Some(raw) = lookup("ALLUVIAL_DEDUPE_EDGES") {
            config.dedupe_undirected_edges = parse_number("dedupe_edges", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check ranges and required settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timestamps.is_empty() {
            return Err(ConfigError::invalid("timestamps", "at least one timestamp is required"));
        }
        let mut seen = std::collections::BTreeSet::new();
        if let Some(dup) = self.timestamps.iter().find(|t| !seen.insert(t.as_str())) {
            return Err(ConfigError::invalid("timestamps", format!("{:?} listed twice", dup)));
        }
        for (key, value) in [
            ("jaccard_threshold", self.tracker.threshold),
            ("history_threshold", self.history.threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(key, format!("{} is outside [0, 1]", value)));
            }
        }
        Ok(())
    }
}

/// Parse `start..=end` (inclusive integer range) or a comma list.
pub fn parse_timestamps(raw: &str) -> Result<Vec<String>, ConfigError> {
    if let Some((start, end)) = raw.split_once("..=") {
        let start: i64 = parse_number("timestamps", start)?;
        let end: i64 = parse_number("timestamps", end)?;
        if end < start {
            return Err(ConfigError::invalid("timestamps", format!("empty range {}", raw)));
        }
        return Ok((start..=end).map(|t| t.to_string()).collect());
    }

    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect())
}

fn parse_selection(raw: &str) -> Result<CandidateSelection, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "last_qualifying" | "last" => Ok(CandidateSelection::LastQualifying),
        "best_qualifying" | "best" => Ok(CandidateSelection::BestQualifying),
        other => Err(ConfigError::invalid(
            "history_selection",
            format!("unknown selection {:?}", other),
        )),
    }
}

fn parse_number<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("cannot parse {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_timestamp_range() {
        let ts = parse_timestamps("1998..=2001").unwrap();
        assert_eq!(ts, vec!["1998", "1999", "2000", "2001"]);
        assert!(parse_timestamps("2001..=1998").is_err());
    }

    #[test]
    fn test_timestamp_list() {
        assert_eq!(parse_timestamps("a, b,,c").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_env_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[("ALLUVIAL_TIMESTAMPS", "1,2")])).unwrap();

        assert_eq!(config.strategy, StrategyKind::Chronological);
        assert_eq!(config.tracker.threshold, 0.4);
        assert_eq!(config.tracker.first_id, 1);
        assert_eq!(config.history.threshold, 0.25);
        assert_eq!(config.history.selection, CandidateSelection::LastQualifying);
        assert_eq!((config.gen_number, config.layout_number), (3, 3));
        assert!(!config.dedupe_undirected_edges);
    }

    #[test]
    fn test_env_overrides() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("ALLUVIAL_TIMESTAMPS", "1998..=1999"),
            ("ALLUVIAL_STRATEGY", "history_file"),
            ("ALLUVIAL_HISTORY_SELECTION", "best"),
            ("ALLUVIAL_JACCARD_THRESHOLD", "0.6"),
            ("ALLUVIAL_LAYOUT", "2-5"),
            ("ALLUVIAL_DEDUPE_EDGES", "true"),
        ]))
        .unwrap();

        assert_eq!(config.strategy, StrategyKind::HistoryFile);
        assert_eq!(config.history.selection, CandidateSelection::BestQualifying);
        assert_eq!(config.tracker.threshold, 0.6);
        assert_eq!((config.gen_number, config.layout_number), (2, 5));
        assert!(config.dedupe_undirected_edges);
    }

    #[test]
    fn test_validation() {
        let missing = PipelineConfig::from_lookup(lookup(&[]));
        assert!(matches!(missing, Err(ConfigError::InvalidValue { key: "timestamps", .. })));

        let out_of_range = PipelineConfig::from_lookup(lookup(&[
            ("ALLUVIAL_TIMESTAMPS", "1"),
            ("ALLUVIAL_JACCARD_THRESHOLD", "1.5"),
        ]));
        assert!(matches!(out_of_range, Err(ConfigError::InvalidValue { key: "jaccard_threshold", .. })));

        let duplicate = PipelineConfig::from_lookup(lookup(&[("ALLUVIAL_TIMESTAMPS", "1,1")]));
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_json_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(
            &path,
            r#"{"data_dir": "/data/NBAF", "timestamps": ["1998"], "tracker": {"threshold": 0.5}}"#,
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/data/NBAF"));
        assert_eq!(config.tracker.threshold, 0.5);
        assert_eq!(config.tracker.first_id, 1);
        assert_eq!(config.strategy, StrategyKind::Chronological);
    }
}
