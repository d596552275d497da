//! Per-(user, book) engagement rows

use crate::clock::Timestamp;
use crate::error::{LibraryError, Result};
use crate::types::{Isbn, Principal};
use serde::{Deserialize, Serialize};

pub const MIN_STARS: u8 = 1;
pub const MAX_STARS: u8 = 5;

/// One user's rating of one book. At most one per (book, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub book_isbn: Isbn,
    pub user: Principal,
    pub stars: u8,
    pub timestamp: Timestamp,
}

impl Rating {
    pub fn validate_stars(stars: u8) -> Result<u8> {
        if (MIN_STARS..=MAX_STARS).contains(&stars) {
            Ok(stars)
        } else {
            Err(LibraryError::InvalidRating(stars.to_string()))
        }
    }
}

/// Pages read so far. May go down as well as up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub book_isbn: Isbn,
    pub user: Principal,
    pub pages_read: u32,
    pub last_updated: Timestamp,
}

impl ReadingProgress {
    /// `pages_read` must lie within `0..=page_count`
    pub fn validate_pages(pages_read: u32, page_count: u32) -> Result<u32> {
        if pages_read <= page_count {
            Ok(pages_read)
        } else {
            Err(LibraryError::InvalidProgress {
                pages_read: pages_read.to_string(),
                page_count,
            })
        }
    }

    pub fn is_finished(&self, page_count: u32) -> bool {
        self.pages_read >= page_count
    }
}

/// Membership of a book in a user's bookmark set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub user: Principal,
    pub book_isbn: Isbn,
}
