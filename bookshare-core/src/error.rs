//! Error types for Bookshare Core

use thiserror::Error;

/// Result type alias using LibraryError
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Every failure a library operation can report to its caller
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LibraryError {
    /// Missing ISBN or missing engagement row
    #[error("Not found: {0}")]
    NotFound(String),

    /// Role or ownership check failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A create collided with an existing ISBN
    #[error("Duplicate ISBN: {0}")]
    DuplicateIsbn(String),

    /// Update attempted at the edit ceiling
    #[error("Edit limit exceeded for {isbn}: {used} of {allowance} edits used")]
    EditLimitExceeded {
        isbn: String,
        used: u32,
        allowance: u32,
    },

    /// Star value outside 1..=5, as the caller sent it
    #[error("Invalid rating: {0} (expected 1 to 5 stars)")]
    InvalidRating(String),

    /// Pages read outside 0..=page_count, as the caller sent it
    #[error("Invalid progress: {pages_read} pages read, book has {page_count}")]
    InvalidProgress { pages_read: String, page_count: u32 },

    /// Malformed request payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl LibraryError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::Unauthorized(_) => "Unauthorized",
            Self::DuplicateIsbn(_) => "DuplicateIsbn",
            Self::EditLimitExceeded { .. } => "EditLimitExceeded",
            Self::InvalidRating(_) => "InvalidRating",
            Self::InvalidProgress { .. } => "InvalidProgress",
            Self::InvalidInput(_) => "InvalidInput",
        }
    }

    pub(crate) fn book_not_found(isbn: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("book {}", isbn))
    }
}

/// Errors that occur while loading or saving a library snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot failed validation: {0}")]
    Invalid(String),

    #[error("Backend error: {0}")]
    Backend(String),
}
