use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while working with the content tree
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Access to path outside the content root denied: {path}")]
    PathTraversalDenied { path: String },

    #[error("Content not found: {path}")]
    NotFound { path: String },

    #[error("Invalid operation on {path}: {message}")]
    InvalidOperation { path: String, message: String },

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ContentError {
    /// Wrap an IO error together with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ContentError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn invalid_operation(path: impl Into<String>, message: impl Into<String>) -> Self {
        ContentError::InvalidOperation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for `NotFound`, including IO errors of kind `NotFound`
    pub fn is_not_found(&self) -> bool {
        match self {
            ContentError::NotFound { .. } => true,
            ContentError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result type alias for content operations
pub type Result<T> = std::result::Result<T, ContentError>;
