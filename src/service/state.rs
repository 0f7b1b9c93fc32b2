//! Service state management.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default export directory when `EXPORT_DIR` is unset.
pub const DEFAULT_EXPORT_DIR: &str = "data/processed";

/// Shared service state.
///
/// The service only reads; the export directory is written by batch runs.
#[derive(Debug, Clone)]
pub struct ServiceState {
    export_dir: Arc<PathBuf>,
}

impl ServiceState {
    /// Serve tables from `export_dir`.
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: Arc::new(export_dir.into()),
        }
    }

    /// Create service state from environment variables.
    ///
    /// Reads `EXPORT_DIR`, falling back to [`DEFAULT_EXPORT_DIR`].
    pub fn from_env() -> Self {
        let dir = std::env::var("EXPORT_DIR").unwrap_or_else(|_| {
            tracing::warn!(default = DEFAULT_EXPORT_DIR, "EXPORT_DIR not set, using default");
            DEFAULT_EXPORT_DIR.to_string()
        });
        Self::new(dir)
    }

    /// Directory being served.
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Path of a file inside the export directory.
    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.export_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_path_joins_export_dir() {
        let state = ServiceState::new("/srv/processed");
        assert_eq!(state.file_path("nodes.csv"), Path::new("/srv/processed/nodes.csv"));
        assert_eq!(state.export_dir(), Path::new("/srv/processed"));
    }

    #[test]
    fn test_clones_share_directory() {
        let state = ServiceState::new("out");
        let clone = state.clone();
        assert_eq!(state.export_dir(), clone.export_dir());
    }
}
