//! Bookshare Core Library
//!
//! This crate holds the book lifecycle and aggregation engine of the Bookshare
//! platform: the approval state machine with its edit-count gate, per-user
//! engagement (ratings, bookmarks, reading progress), role-based authorization,
//! and the trending and recommendation read models derived from them.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod library;
pub mod locks;
pub mod roles;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod types;
pub mod workflow;

pub use aggregate::{LibraryStats, Recommendation, TrendingBook};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use error::{LibraryError, Result, SnapshotError};
pub use library::Library;
pub use snapshot::{LibrarySnapshot, Violation};
pub use store::Cascade;
pub use types::{
    ApprovalStatus, Book, BookDetails, Bookmark, EditRequest, Isbn, NewBook, Principal, Rating,
    ReadingProgress, Role, StatusKind, SystemRole, UserAccount, UserProfile,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_library() {
        let library = Library::new(Vec::new());
        assert!(library.get_all_books().is_empty());
        assert!(library.get_trending_books(10).is_empty());
        assert_eq!(library.get_user_role(&Principal::new("anyone")), Role::GUEST);
    }
}
