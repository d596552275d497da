//! Approval state machine, edit-count gate and edit-request escalation
//!
//! ```text
//! submit ──► Pending ──approve──► Approved
//!               │
//!               └──reject──► Rejected
//!                              │
//!        uploader edit ◄───────┘  (re-queues as Pending)
//! ```
//!
//! A decision is final for the submission it was made on. Only a resubmission
//! (an uploader edit of a rejected book) opens a new review.
//!
//! The rules here operate on a `&mut Book` the caller already holds under the
//! ISBN's lock; [`Library`](crate::Library) owns the locking.

use crate::error::{LibraryError, Result};
use crate::types::{
    ApprovalStatus, Book, BookDetails, EditRequest, Isbn, Principal, Role, StatusKind,
    NO_REASON_PROVIDED,
};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Outcome of an admin review
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { reason: String },
}

impl Decision {
    /// Approvals must not carry a reason; rejections default one
    pub fn from_parts(approved: bool, reason: Option<String>) -> Result<Self> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        match (approved, reason) {
            (true, None) => Ok(Self::Approve),
            (true, Some(_)) => Err(LibraryError::InvalidInput(
                "an approval cannot carry a rejection reason".to_string(),
            )),
            (false, reason) => Ok(Self::Reject {
                reason: reason.unwrap_or_else(|| NO_REASON_PROVIDED.to_string()),
            }),
        }
    }

    fn into_status(self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject { reason } => ApprovalStatus::Rejected { reason },
        }
    }
}

/// Which authorization path an edit takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPath {
    /// Admin edits bypass the gate and do not consume the allowance
    Admin,
    /// The uploader's edits are gated by the allowance
    Uploader,
}

/// What an accepted edit changed beyond the details themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    pub path: EditPath,
    pub requeued: bool,
    pub page_count_shrank: bool,
}

/// Admin wins over ownership, so an admin editing their own upload is exempt too
pub fn edit_path(book: &Book, caller: &Principal, role: Role) -> Result<EditPath> {
    if role.is_admin() {
        Ok(EditPath::Admin)
    } else if book.is_uploaded_by(caller) {
        Ok(EditPath::Uploader)
    } else {
        Err(LibraryError::Unauthorized(format!(
            "only the uploader may edit {}",
            book.isbn
        )))
    }
}

/// Record a review decision. Repeating the decision already on record changes
/// nothing; reversing it is refused.
pub fn apply_decision(book: &mut Book, decision: Decision) -> Result<bool> {
    let status = decision.into_status();
    let current = book.approval_status.kind();
    if current == StatusKind::Pending {
        book.approval_status = status;
        Ok(true)
    } else if current == status.kind() {
        Ok(false)
    } else {
        Err(LibraryError::InvalidInput(format!(
            "{} was already {} and cannot be {}",
            book.isbn,
            current,
            status.kind()
        )))
    }
}

/// Apply new details, enforcing the edit gate for uploaders. On failure the
/// book is untouched.
pub fn apply_edit(book: &mut Book, details: BookDetails, path: EditPath) -> Result<EditOutcome> {
    details.validate()?;

    if path == EditPath::Uploader && book.edit_count >= book.edit_allowance {
        return Err(LibraryError::EditLimitExceeded {
            isbn: book.isbn.to_string(),
            used: book.edit_count,
            allowance: book.edit_allowance,
        });
    }

    let page_count_shrank = details.page_count < book.details.page_count;
    book.details = details;

    let mut requeued = false;
    if path == EditPath::Uploader {
        book.edit_count += 1;
        if matches!(book.approval_status, ApprovalStatus::Rejected { .. }) {
            book.approval_status = ApprovalStatus::Pending;
            requeued = true;
        }
    }

    Ok(EditOutcome {
        path,
        requeued,
        page_count_shrank,
    })
}

/// Only the uploader, and only once every edit is used
pub fn check_edit_request(book: &Book, caller: &Principal) -> Result<()> {
    if !book.is_uploaded_by(caller) {
        return Err(LibraryError::Unauthorized(format!(
            "only the uploader may request edits for {}",
            book.isbn
        )));
    }
    if book.edit_count < book.edit_allowance {
        return Err(LibraryError::InvalidInput(format!(
            "{} edit(s) remaining for {}",
            book.edits_remaining(),
            book.isbn
        )));
    }
    Ok(())
}

/// Raise the edit ceiling. `edit_count` is never lowered.
pub fn grant_edits(book: &mut Book, count: u32) -> Result<()> {
    if count == 0 {
        return Err(LibraryError::InvalidInput(
            "grant at least one edit".to_string(),
        ));
    }
    book.edit_allowance = book.edit_allowance.saturating_add(count);
    Ok(())
}

/// Open edit requests, one list per ISBN
#[derive(Debug, Default)]
pub struct EditRequestTable {
    requests: BTreeMap<Isbn, Vec<EditRequest>>,
}

impl EditRequestTable {
    pub fn push(&mut self, request: EditRequest) {
        self.requests
            .entry(request.book_isbn.clone())
            .or_default()
            .push(request);
    }

    pub fn for_book(&self, isbn: &Isbn) -> Vec<EditRequest> {
        self.requests.get(isbn).cloned().unwrap_or_default()
    }

    /// Empty the book's queue, returning what was in it
    pub fn clear(&mut self, isbn: &Isbn) -> Vec<EditRequest> {
        self.requests.remove(isbn).unwrap_or_default()
    }

    pub fn remove_author(&mut self, author: &Principal) -> Vec<EditRequest> {
        let mut removed = Vec::new();
        self.requests.retain(|_, list| {
            list.retain(|request| {
                if &request.author == author {
                    removed.push(request.clone());
                    false
                } else {
                    true
                }
            });
            !list.is_empty()
        });
        removed
    }

    pub fn restore(&mut self, requests: Vec<EditRequest>) {
        for request in requests {
            self.push(request);
        }
        for list in self.requests.values_mut() {
            list.sort_by_key(|r| r.created_at);
        }
    }

    pub fn all(&self) -> Vec<EditRequest> {
        self.requests.values().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.requests.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Owner of the edit-request queues
#[derive(Debug, Default)]
pub struct ApprovalWorkflow {
    requests: RwLock<EditRequestTable>,
}

impl ApprovalWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, EditRequestTable> {
        self.requests.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, EditRequestTable> {
        self.requests.write().unwrap_or_else(PoisonError::into_inner)
    }
}
