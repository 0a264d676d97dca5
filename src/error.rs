/// Error types for file processing and whole-run failures
use crate::mt::MtError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to walk input tree: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Failed to extract archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Backend(#[from] MtError),
    #[error("Failed to write QA report: {0}")]
    Report(#[from] serde_json::Error),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    /// The pre-run QA gate rejected the backend output
    #[error("QA gate failed: {0}")]
    QaGateFailed(String),
}

impl PipelineError {
    /// Adapter for `map_err` that attaches `path` to an I/O error
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
