//! Point-in-time copy of every table, used for persistence and aggregation

use crate::error::SnapshotError;
use crate::types::{
    Book, Bookmark, EditRequest, Isbn, Principal, Rating, ReadingProgress, UserAccount,
    MAX_STARS, MIN_STARS,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Current on-disk format version
pub const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Every table of the library, in deterministic order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySnapshot {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub books: Vec<Book>,

    #[serde(default)]
    pub edit_requests: Vec<EditRequest>,

    #[serde(default)]
    pub ratings: Vec<Rating>,

    #[serde(default)]
    pub progress: Vec<ReadingProgress>,

    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,

    #[serde(default)]
    pub accounts: Vec<UserAccount>,
}

impl Default for LibrarySnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            books: Vec::new(),
            edit_requests: Vec::new(),
            ratings: Vec::new(),
            progress: Vec::new(),
            bookmarks: Vec::new(),
            accounts: Vec::new(),
        }
    }
}

/// A broken invariant found in a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    DuplicateIsbn(Isbn),
    DuplicateAccount(Principal),
    DuplicateRating { isbn: Isbn, user: Principal },
    DuplicateProgress { isbn: Isbn, user: Principal },
    OrphanedRating { isbn: Isbn, user: Principal },
    OrphanedProgress { isbn: Isbn, user: Principal },
    OrphanedBookmark { isbn: Isbn, user: Principal },
    OrphanedEditRequest { isbn: Isbn },
    StarsOutOfRange { isbn: Isbn, user: Principal, stars: u8 },
    ProgressOutOfRange {
        isbn: Isbn,
        user: Principal,
        pages_read: u32,
        page_count: u32,
    },
    EditCountAboveAllowance {
        isbn: Isbn,
        edit_count: u32,
        allowance: u32,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateIsbn(isbn) => write!(f, "ISBN {} appears more than once", isbn),
            Self::DuplicateAccount(p) => write!(f, "account {} appears more than once", p),
            Self::DuplicateRating { isbn, user } => {
                write!(f, "{} rated {} more than once", user, isbn)
            }
            Self::DuplicateProgress { isbn, user } => {
                write!(f, "{} has more than one progress row for {}", user, isbn)
            }
            Self::OrphanedRating { isbn, user } => {
                write!(f, "rating by {} references missing book {}", user, isbn)
            }
            Self::OrphanedProgress { isbn, user } => {
                write!(f, "progress of {} references missing book {}", user, isbn)
            }
            Self::OrphanedBookmark { isbn, user } => {
                write!(f, "bookmark of {} references missing book {}", user, isbn)
            }
            Self::OrphanedEditRequest { isbn } => {
                write!(f, "edit request references missing book {}", isbn)
            }
            Self::StarsOutOfRange { isbn, user, stars } => {
                write!(f, "{} gave {} {} stars", user, isbn, stars)
            }
            Self::ProgressOutOfRange {
                isbn,
                user,
                pages_read,
                page_count,
            } => write!(
                f,
                "{} read {} pages of {} which has {}",
                user, pages_read, isbn, page_count
            ),
            Self::EditCountAboveAllowance {
                isbn,
                edit_count,
                allowance,
            } => write!(
                f,
                "{} has {} edits against an allowance of {}",
                isbn, edit_count, allowance
            ),
        }
    }
}

impl LibrarySnapshot {
    pub fn from_json(data: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check uniqueness, referential integrity and range invariants
    pub fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        let mut page_counts: BTreeMap<&Isbn, u32> = BTreeMap::new();
        for book in &self.books {
            if page_counts
                .insert(&book.isbn, book.details.page_count)
                .is_some()
            {
                violations.push(Violation::DuplicateIsbn(book.isbn.clone()));
            }
            if book.edit_count > book.edit_allowance {
                violations.push(Violation::EditCountAboveAllowance {
                    isbn: book.isbn.clone(),
                    edit_count: book.edit_count,
                    allowance: book.edit_allowance,
                });
            }
        }

        let mut principals = BTreeSet::new();
        for account in &self.accounts {
            if !principals.insert(&account.principal) {
                violations.push(Violation::DuplicateAccount(account.principal.clone()));
            }
        }

        let mut rated = BTreeSet::new();
        for rating in &self.ratings {
            let isbn = rating.book_isbn.clone();
            let user = rating.user.clone();
            if !rated.insert((&rating.book_isbn, &rating.user)) {
                violations.push(Violation::DuplicateRating {
                    isbn: isbn.clone(),
                    user: user.clone(),
                });
            }
            if !page_counts.contains_key(&rating.book_isbn) {
                violations.push(Violation::OrphanedRating {
                    isbn: isbn.clone(),
                    user: user.clone(),
                });
            }
            if !(MIN_STARS..=MAX_STARS).contains(&rating.stars) {
                violations.push(Violation::StarsOutOfRange {
                    isbn,
                    user,
                    stars: rating.stars,
                });
            }
        }

        let mut tracked = BTreeSet::new();
        for progress in &self.progress {
            let isbn = progress.book_isbn.clone();
            let user = progress.user.clone();
            if !tracked.insert((&progress.book_isbn, &progress.user)) {
                violations.push(Violation::DuplicateProgress {
                    isbn: isbn.clone(),
                    user: user.clone(),
                });
            }
            match page_counts.get(&progress.book_isbn) {
                None => violations.push(Violation::OrphanedProgress { isbn, user }),
                Some(&page_count) if progress.pages_read > page_count => {
                    violations.push(Violation::ProgressOutOfRange {
                        isbn,
                        user,
                        pages_read: progress.pages_read,
                        page_count,
                    })
                }
                Some(_) => {}
            }
        }

        for bookmark in &self.bookmarks {
            if !page_counts.contains_key(&bookmark.book_isbn) {
                violations.push(Violation::OrphanedBookmark {
                    isbn: bookmark.book_isbn.clone(),
                    user: bookmark.user.clone(),
                });
            }
        }

        for request in &self.edit_requests {
            if !page_counts.contains_key(&request.book_isbn) {
                violations.push(Violation::OrphanedEditRequest {
                    isbn: request.book_isbn.clone(),
                });
            }
        }

        violations
    }

    /// Approved books only, in ISBN order
    pub fn listed_books(&self) -> impl Iterator<Item = &Book> {
        self.books.iter().filter(|book| book.is_listed())
    }
}
