use thiserror::Error;

use crate::vfs::DocumentId;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Failures at the edges of the analysis core: files, configuration and
/// document identity. Analysis itself degrades to `unknown` instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid document uri: {0}")]
    InvalidUri(String),

    #[error("unknown document: {0}")]
    UnknownUri(String),

    #[error("unknown document id: {0:?}")]
    UnknownDocument(DocumentId),

    #[error("bundled definition file is not utf-8: {0}")]
    InvalidStdFile(String),

    #[error("analysis was cancelled")]
    Cancelled,

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
