//! Errors that abort a conversion request before any audio is written.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("PDF file not found: {}", .0.display())]
    MissingDocument(PathBuf),

    #[error("Invalid page range {start}-{end}{}", describe_total(.total))]
    InvalidPageRange {
        start: usize,
        end: usize,
        total: Option<usize>,
    },

    #[error("Pages per chapter must be at least 1")]
    InvalidChapterSize,

    #[error("Failed to read PDF {}: {reason}", .path.display())]
    Extraction { path: PathBuf, reason: String },

    #[error("Failed to start speech engine: {0:#}")]
    Engine(anyhow::Error),
}

fn describe_total(total: &Option<usize>) -> String {
    match total {
        Some(total) => format!(" (document has {} pages)", total),
        None => String::new(),
    }
}

impl ConvertError {
    /// True for errors raised by input checks rather than by collaborators.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ConvertError::MissingDocument(_)
                | ConvertError::InvalidPageRange { .. }
                | ConvertError::InvalidChapterSize
        )
    }
}
