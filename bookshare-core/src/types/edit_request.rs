//! Author requests for more edits than the allowance permits

use crate::clock::Timestamp;
use crate::types::{Isbn, Principal};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raised by an uploader who has used every edit. Purely a signal to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub id: Uuid,
    pub book_isbn: Isbn,
    pub author: Principal,
    pub message: Option<String>,
    pub created_at: Timestamp,
}

impl EditRequest {
    pub fn new(
        book_isbn: Isbn,
        author: Principal,
        message: Option<String>,
        created_at: Timestamp,
    ) -> Self {
        // Whitespace-only messages carry nothing
        let message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        Self {
            id: Uuid::new_v4(),
            book_isbn,
            author,
            message,
            created_at,
        }
    }
}
