// Error types for the transport crate

use std::path::PathBuf;

use crate::project::ProjectError;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Host sync segment {path} unavailable: {source}")]
    SharedSegment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Project error: {0}")]
    Project(#[from] ProjectError),
}

pub type Result<T> = std::result::Result<T, TransportError>;
