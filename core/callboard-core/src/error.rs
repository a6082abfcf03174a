//! Error types for callboard-core operations.

use std::path::PathBuf;

/// All errors that can occur in callboard-core operations.
///
/// Only `StoreIo` is expected to reach HTTP clients as a failure. A
/// `MalformedTrigger` is absorbed by the caller and reported as "no data",
/// and `WatchSetup` switches the server into degraded mode.
#[derive(Debug, thiserror::Error)]
pub enum CallboardError {
    // ─────────────────────────────────────────────────────────────────────
    // Trigger Store
    // ─────────────────────────────────────────────────────────────────────
    #[error("Trigger file is not valid JSON: {path}: {source}")]
    MalformedTrigger {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: {path}: {source}")]
    StoreIo {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize trigger record: {0}")]
    Serialize(#[source] serde_json::Error),

    // ─────────────────────────────────────────────────────────────────────
    // Change Watcher
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to watch {path}: {source}")]
    WatchSetup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },
}

impl CallboardError {
    pub(crate) fn store_io(
        context: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        CallboardError::StoreIo {
            context,
            path: path.into(),
            source,
        }
    }

    /// True for content problems the display should shrug off as "no data".
    pub fn is_malformed(&self) -> bool {
        matches!(self, CallboardError::MalformedTrigger { .. })
    }
}

/// Convenience type alias for Results using CallboardError.
pub type Result<T> = std::result::Result<T, CallboardError>;

impl From<CallboardError> for String {
    fn from(err: CallboardError) -> String {
        err.to_string()
    }
}
