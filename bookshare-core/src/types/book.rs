//! Book records and their approval status

use crate::clock::Timestamp;
use crate::error::{LibraryError, Result};
use crate::types::Principal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Author-initiated edits permitted before an edit request is needed
pub const DEFAULT_EDIT_ALLOWANCE: u32 = 3;

/// Stored when a rejection carries no reason
pub const NO_REASON_PROVIDED: &str = "No reason provided";

/// Opaque, globally unique book key. Not checked for ISBN checksum validity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

impl Isbn {
    /// Trim the input and reject blank keys
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LibraryError::InvalidInput("ISBN must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Isbn {
    type Error = LibraryError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Isbn> for String {
    fn from(isbn: Isbn) -> Self {
        isbn.0
    }
}

impl FromStr for Isbn {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a book sits in the approval workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected { reason: String },
}

impl ApprovalStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::Pending => StatusKind::Pending,
            Self::Approved => StatusKind::Approved,
            Self::Rejected { .. } => StatusKind::Rejected,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Status without its payload, used for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusKind {
    Pending,
    Approved,
    Rejected,
}

impl FromStr for StatusKind {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(LibraryError::InvalidInput(format!(
                "unknown approval status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Author-editable fields of a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetails {
    pub title: String,

    /// Author name as printed on the book, not the uploader's identity
    pub author: String,

    pub genre: String,

    #[serde(default)]
    pub description: String,

    /// Opaque cover image URL
    #[serde(default)]
    pub cover_url: Option<String>,

    /// Opaque PDF URL
    #[serde(default)]
    pub pdf_url: Option<String>,

    pub publication_year: i32,

    pub page_count: u32,
}

impl BookDetails {
    /// Reject blank required fields and empty books
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("genre", &self.genre),
        ] {
            if value.trim().is_empty() {
                return Err(LibraryError::InvalidInput(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }
        if self.page_count == 0 {
            return Err(LibraryError::InvalidInput(
                "pageCount must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Payload of a submission: a fresh ISBN plus its details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub isbn: Isbn,

    #[serde(flatten)]
    pub details: BookDetails,
}

/// A book record, from submission through approval or rejection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Immutable once created
    pub isbn: Isbn,

    #[serde(flatten)]
    pub details: BookDetails,

    pub created_at: Timestamp,

    /// Successful author edits so far; never decreases
    pub edit_count: u32,

    /// Edit ceiling; raised only by an admin grant
    pub edit_allowance: u32,

    pub uploader: Principal,

    pub approval_status: ApprovalStatus,
}

impl Book {
    /// Stage a new submission as Pending
    pub fn submitted(new_book: NewBook, uploader: Principal, created_at: Timestamp) -> Self {
        Self {
            isbn: new_book.isbn,
            details: new_book.details,
            created_at,
            edit_count: 0,
            edit_allowance: DEFAULT_EDIT_ALLOWANCE,
            uploader,
            approval_status: ApprovalStatus::Pending,
        }
    }

    /// Publicly listed books
    pub fn is_listed(&self) -> bool {
        self.approval_status.is_approved()
    }

    pub fn edits_remaining(&self) -> u32 {
        self.edit_allowance.saturating_sub(self.edit_count)
    }

    pub fn is_uploaded_by(&self, principal: &Principal) -> bool {
        &self.uploader == principal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> BookDetails {
        BookDetails {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            genre: "Science Fiction".to_string(),
            description: String::new(),
            cover_url: None,
            pdf_url: None,
            publication_year: 1965,
            page_count: 412,
        }
    }

    #[test]
    fn test_isbn_rejects_blank() {
        assert!(Isbn::new("   ").is_err());
        assert_eq!(Isbn::new(" 978-0 ").unwrap().as_str(), "978-0");
    }

    #[test]
    fn test_details_validation() {
        assert!(details().validate().is_ok());

        let mut no_title = details();
        no_title.title = " ".to_string();
        assert!(matches!(
            no_title.validate(),
            Err(LibraryError::InvalidInput(_))
        ));

        let mut no_pages = details();
        no_pages.page_count = 0;
        assert!(no_pages.validate().is_err());
    }

    #[test]
    fn test_submitted_book_starts_pending() {
        let new_book = NewBook {
            isbn: Isbn::new("978-0").unwrap(),
            details: details(),
        };
        let book = Book::submitted(new_book, Principal::new("alice"), 42);
        assert_eq!(book.approval_status, ApprovalStatus::Pending);
        assert_eq!(book.edit_count, 0);
        assert_eq!(book.edits_remaining(), DEFAULT_EDIT_ALLOWANCE);
        assert!(!book.is_listed());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(ApprovalStatus::Rejected {
            reason: "Blurry scan".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["reason"], "Blurry scan");

        let kind: StatusKind = "Approved".parse().unwrap();
        assert_eq!(kind, StatusKind::Approved);
    }

    #[test]
    fn test_isbn_deserialization_rejects_blank() {
        let result: std::result::Result<Isbn, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}
