use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Nothing has been saved under this key.
    #[error("no index available for key {key}")]
    NoIndex { key: String },

    #[error("snapshot {path} is corrupt: {reason}")]
    CorruptSnapshot { path: PathBuf, reason: String },

    /// The snapshot's folder hashes to a different key.
    #[error("snapshot key {key} does not belong to folder {folder}")]
    FolderMismatch { key: String, folder: String },

    #[error("snapshot format version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The worker already has a job running and one queued.
    #[error("engine is busy")]
    Busy,

    #[error("top_k must be at least 1")]
    InvalidTopK,

    #[error("engine worker has shut down")]
    WorkerGone,

    #[error("internal engine failure: {0}")]
    Internal(String),

    #[error("failed to read stop words from {path}: {source}")]
    StopWords { path: PathBuf, source: io::Error },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Encode(#[from] bincode::Error),
}

impl EngineError {
    /// Load failures after which the caller should treat the folder as unindexed.
    pub fn is_no_index(&self) -> bool {
        matches!(
            self,
            EngineError::NoIndex { .. }
                | EngineError::CorruptSnapshot { .. }
                | EngineError::FolderMismatch { .. }
                | EngineError::UnsupportedVersion { .. }
        )
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EngineError::CorruptSnapshot { path: path.into(), reason: reason.into() }
    }
}
