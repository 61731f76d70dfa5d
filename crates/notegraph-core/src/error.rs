//! Error type shared by every note operation

use std::path::PathBuf;

/// Failures surfaced by single-document operations.
///
/// Bulk scans never return these for individual files; they log and skip.
#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("note not found: {0}")]
    NotFound(String),

    #[error("Checkbox index {index} out of range ({count} checkboxes)")]
    OutOfRange { index: i64, count: usize },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8", .0.display())]
    Decode(PathBuf),

    /// A path that exists but lies outside the notes root.
    #[error("note not found: {0}")]
    SecurityViolation(String),
}

impl NoteError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NoteError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that must look like a missing note to callers.
    pub fn is_not_found(&self) -> bool {
        matches!(self, NoteError::NotFound(_) | NoteError::SecurityViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, NoteError>;
