//! In-memory tables for books and engagement

mod books;
mod engagement;

pub use books::{BookStore, BookTable};
pub use engagement::{EngagementRows, EngagementStore, EngagementTables};

use crate::types::{Book, EditRequest, UserAccount};

/// Everything a deletion removed. Handing it back to
/// [`Library::restore`](crate::Library::restore) undoes the deletion as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cascade {
    pub books: Vec<Book>,
    pub edit_requests: Vec<EditRequest>,
    pub engagement: EngagementRows,
    pub account: Option<UserAccount>,
}

impl Cascade {
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
            && self.edit_requests.is_empty()
            && self.engagement.is_empty()
            && self.account.is_none()
    }
}
