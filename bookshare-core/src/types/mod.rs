//! Core domain types for the Bookshare library

mod book;
mod edit_request;
mod engagement;
mod role;

pub use book::{
    ApprovalStatus, Book, BookDetails, Isbn, NewBook, StatusKind, DEFAULT_EDIT_ALLOWANCE,
    NO_REASON_PROVIDED,
};
pub use edit_request::EditRequest;
pub use engagement::{Bookmark, Rating, ReadingProgress, MAX_STARS, MIN_STARS};
pub use role::{Principal, Role, SystemRole, UserAccount, UserProfile};
