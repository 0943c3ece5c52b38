use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("failed to {operation} transcript {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transcript {path} is empty")]
    Empty { path: PathBuf },

    #[error("{path}:{line}: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: written by journal version {found}, this build reads version {expected}")]
    Version {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("{path}:{line}: expected item {expected}, found item {found}")]
    OutOfOrder {
        path: PathBuf,
        line: usize,
        expected: u64,
        found: u64,
    },

    #[error("{path}:{line}: `{value}` is not an RFC 3339 timestamp")]
    Timestamp {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("package root must be absolute to be journaled: {0}")]
    RelativePackageRoot(PathBuf),

    #[error("failed to encode transcript line: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("system clock cannot be formatted as RFC 3339: {0}")]
    Clock(#[source] time::error::Format),
}

impl TranscriptError {
    pub(crate) fn io(operation: &'static str, path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}
