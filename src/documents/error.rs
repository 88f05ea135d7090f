//! Typed failures surfaced by the document facade.

use std::path::PathBuf;

use thiserror::Error;

use crate::providers::ProviderError;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to render HTML to {}: {source}", destination.display())]
    Render {
        destination: PathBuf,
        source: ProviderError,
    },

    #[error("Failed to compose text document {}: {source}", destination.display())]
    Compose {
        destination: PathBuf,
        source: ProviderError,
    },

    #[error("Failed to merge into {}: {source}", destination.display())]
    Merge {
        destination: PathBuf,
        source: ProviderError,
    },

    #[error("Failed to extract text from {}: {source}", source_path.display())]
    Extract {
        source_path: PathBuf,
        source: ProviderError,
    },

    #[error(
        "Failed to watermark {} into {}: {source}",
        source_path.display(),
        destination.display()
    )]
    Watermark {
        source_path: PathBuf,
        destination: PathBuf,
        source: ProviderError,
    },

    #[error("Failed to list {}: {source}", dir.display())]
    Listing {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to prepare output directory {}: {source}", dir.display())]
    Store {
        dir: PathBuf,
        source: std::io::Error,
    },
}

impl DocumentError {
    /// Whether the caller supplied something unusable, as opposed to an
    /// engine or filesystem failure.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidName(_) | Self::NotFound(_))
    }
}

pub type DocumentResult<T> = Result<T, DocumentError>;
