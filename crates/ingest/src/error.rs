use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Extraction error: {0}")]
    Extract(#[from] atlas_extractor::ExtractError),

    #[error("Graph error: {0}")]
    Graph(#[from] atlas_graph::GraphError),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    /// A scanned path resolves outside the ingestion root
    #[error("Path escapes ingestion root: {}", .0.display())]
    Security(PathBuf),

    #[error("Config error in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("{0}")]
    Other(String),
}

impl IngestError {
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }
}
