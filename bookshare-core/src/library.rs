//! The library service: every operation the RPC surface exposes
//!
//! Mutations follow one pattern: turn away callers without the needed role,
//! take the keyed guards (principal first, then ISBNs ascending), check
//! authorization again under the guards, validate, and only then touch the
//! tables. Tables are locked in a fixed order (books, edit requests, engagement,
//! accounts) and never held across an `.await`.

use crate::aggregate::{self, LibraryStats, Recommendation, TrendingBook};
use crate::clock::{Clock, SystemClock, Timestamp};
use crate::error::{LibraryError, Result, SnapshotError};
use crate::locks::KeyedLocks;
use crate::roles::RoleAuthority;
use crate::snapshot::{LibrarySnapshot, SNAPSHOT_VERSION};
use crate::store::{BookStore, BookTable, Cascade, EngagementRows, EngagementStore, EngagementTables};
use crate::types::{
    Book, BookDetails, EditRequest, Isbn, NewBook, Principal, Rating, ReadingProgress, Role,
    StatusKind, SystemRole, UserAccount, UserProfile,
};
use crate::workflow::{self, ApprovalWorkflow, Decision, EditPath, EditRequestTable};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Book lifecycle and engagement engine
pub struct Library {
    books: BookStore,
    workflow: ApprovalWorkflow,
    engagement: EngagementStore,
    roles: RoleAuthority,
    isbn_locks: KeyedLocks<Isbn>,
    principal_locks: KeyedLocks<Principal>,
    clock: Arc<dyn Clock>,
}

impl Library {
    /// Empty library on the system clock
    pub fn new(bootstrap_admins: impl IntoIterator<Item = Principal>) -> Self {
        Self::with_clock(bootstrap_admins, Arc::new(SystemClock))
    }

    pub fn with_clock(
        bootstrap_admins: impl IntoIterator<Item = Principal>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            books: BookStore::new(),
            workflow: ApprovalWorkflow::new(),
            engagement: EngagementStore::new(),
            roles: RoleAuthority::new(bootstrap_admins),
            isbn_locks: KeyedLocks::new(),
            principal_locks: KeyedLocks::new(),
            clock,
        }
    }

    /// Rebuild a library from a saved snapshot. Bootstrap admins that already
    /// have an account are raised to admin.
    pub fn from_snapshot(
        snapshot: LibrarySnapshot,
        bootstrap_admins: impl IntoIterator<Item = Principal>,
        clock: Arc<dyn Clock>,
    ) -> std::result::Result<Self, SnapshotError> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::Invalid(format!(
                "snapshot version {} is newer than supported version {}",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        let violations = snapshot.violations();
        if !violations.is_empty() {
            let summary: Vec<String> = violations.iter().map(ToString::to_string).collect();
            return Err(SnapshotError::Invalid(summary.join("; ")));
        }

        let bootstrap_admins: Vec<Principal> = bootstrap_admins.into_iter().collect();
        let library = Self::with_clock(bootstrap_admins.iter().cloned(), clock);
        {
            let mut books = library.books.write();
            for book in snapshot.books {
                books
                    .create(book)
                    .map_err(|e| SnapshotError::Invalid(e.to_string()))?;
            }
        }
        library.workflow.write().restore(snapshot.edit_requests);
        library.engagement.write().restore(EngagementRows {
            ratings: snapshot.ratings,
            progress: snapshot.progress,
            bookmarks: snapshot.bookmarks,
        });
        for mut account in snapshot.accounts {
            if bootstrap_admins.contains(&account.principal) {
                account.role.system_role = SystemRole::Admin;
            }
            library.roles.insert(account);
        }

        info!(
            books = library.books.read().len(),
            accounts = library.roles.len(),
            "Library restored from snapshot"
        );
        Ok(library)
    }

    /// Consistent copy of every table
    pub fn snapshot(&self) -> LibrarySnapshot {
        let books = self.books.read();
        let requests = self.workflow.read();
        let engagement = self.engagement.read();

        LibrarySnapshot {
            version: SNAPSHOT_VERSION,
            books: books.iter().cloned().collect(),
            edit_requests: requests.all(),
            ratings: engagement.all_ratings(),
            progress: engagement.all_progress(),
            bookmarks: engagement.all_bookmarks(),
            accounts: self.roles.accounts(),
        }
    }

    /// Undo a deletion, e.g. after the deletion could not be persisted.
    ///
    /// A book whose ISBN was taken again in the meantime stays deleted, and so
    /// does everything that referenced it. Rows only go back onto the book
    /// they were written against.
    pub fn restore(&self, cascade: Cascade) {
        if cascade.is_empty() {
            return;
        }

        let mut books = self.books.write();
        let mut requests = self.workflow.write();
        let mut engagement = self.engagement.write();

        let deleted: HashSet<Isbn> = cascade.books.iter().map(|b| b.isbn.clone()).collect();
        let mut restored = HashSet::new();
        for book in cascade.books {
            let isbn = book.isbn.clone();
            match books.create(book) {
                Ok(()) => {
                    restored.insert(isbn);
                }
                Err(e) => warn!(isbn = %isbn, error = %e, "Skipping restore of deleted book"),
            }
        }

        let books = &*books;
        let attachable = |isbn: &Isbn, written_at: Timestamp| {
            if restored.contains(isbn) {
                return true;
            }
            !deleted.contains(isbn)
                && books
                    .get(isbn)
                    .is_some_and(|book| book.created_at <= written_at)
        };

        requests.restore(
            cascade
                .edit_requests
                .into_iter()
                .filter(|r| attachable(&r.book_isbn, r.created_at))
                .collect(),
        );

        let rows = cascade.engagement;
        let skipped = rows.len();
        let rows = EngagementRows {
            ratings: rows
                .ratings
                .into_iter()
                .filter(|r| attachable(&r.book_isbn, r.timestamp))
                .collect(),
            progress: rows
                .progress
                .into_iter()
                .filter(|p| {
                    attachable(&p.book_isbn, p.last_updated)
                        && books
                            .get(&p.book_isbn)
                            .is_some_and(|book| p.pages_read <= book.details.page_count)
                })
                .collect(),
            bookmarks: rows
                .bookmarks
                .into_iter()
                .filter(|b| {
                    restored.contains(&b.book_isbn)
                        || (!deleted.contains(&b.book_isbn) && books.contains(&b.book_isbn))
                })
                .collect(),
        };
        let skipped = skipped - rows.len();
        if skipped > 0 {
            debug!(skipped, "Dropped engagement rows whose book did not come back");
        }
        engagement.restore(rows);

        if let Some(account) = cascade.account {
            if self.roles.profile(&account.principal).is_some() {
                warn!(principal = %account.principal, "Account re-registered, keeping the new one");
            } else {
                info!(principal = %account.principal, "Restoring account");
                self.roles.insert(account);
            }
        }
    }

    // ------------------------------------------------------------------
    // Approval workflow
    // ------------------------------------------------------------------

    /// Stage a new book as Pending. The ISBN must be unused.
    pub async fn submit_book_for_approval(
        &self,
        caller: &Principal,
        new_book: NewBook,
    ) -> Result<Book> {
        self.roles.require(caller, SystemRole::User)?;
        let _account = self.principal_locks.lock(caller).await;
        let _book = self.isbn_locks.lock(&new_book.isbn).await;

        self.roles.require(caller, SystemRole::User)?;
        new_book.details.validate()?;

        let book = Book::submitted(new_book, caller.clone(), self.clock.now());
        self.books.create(book.clone())?;

        info!(isbn = %book.isbn, uploader = %caller, "Book submitted for approval");
        Ok(book)
    }

    /// Replace a book's details. Uploader edits are gated by the allowance;
    /// admin edits are not counted.
    pub async fn update_book(
        &self,
        caller: &Principal,
        isbn: &Isbn,
        details: BookDetails,
    ) -> Result<Book> {
        self.roles.require(caller, SystemRole::User)?;
        let _book = self.isbn_locks.lock(isbn).await;
        let role = self.roles.require(caller, SystemRole::User)?;

        let mut books = self.books.write();
        let book = books
            .get_mut(isbn)
            .ok_or_else(|| LibraryError::book_not_found(isbn))?;

        let path = workflow::edit_path(book, caller, role)?;
        let outcome = workflow::apply_edit(book, details, path)?;

        if outcome.page_count_shrank {
            let page_count = book.details.page_count;
            let clamped = self.engagement.write().clamp_progress(isbn, page_count);
            if clamped > 0 {
                debug!(isbn = %isbn, clamped, page_count, "Clamped reading progress");
            }
        }

        match outcome.path {
            EditPath::Admin => info!(isbn = %isbn, admin = %caller, "Book edited by admin"),
            EditPath::Uploader => info!(
                isbn = %isbn,
                edit_count = book.edit_count,
                allowance = book.edit_allowance,
                requeued = outcome.requeued,
                "Book edited by uploader"
            ),
        }
        Ok(book.clone())
    }

    /// Admin review. A rejection without a reason records a default reason, and
    /// a decided submission keeps its decision.
    pub async fn approve_book_submission(
        &self,
        caller: &Principal,
        isbn: &Isbn,
        approved: bool,
        reason: Option<String>,
    ) -> Result<Book> {
        self.roles.require_admin(caller)?;
        let _book = self.isbn_locks.lock(isbn).await;
        self.roles.require_admin(caller)?;
        let decision = Decision::from_parts(approved, reason)?;

        let mut books = self.books.write();
        let book = books
            .get_mut(isbn)
            .ok_or_else(|| LibraryError::book_not_found(isbn))?;

        if workflow::apply_decision(book, decision)? {
            info!(isbn = %isbn, admin = %caller, status = %book.approval_status.kind(), "Submission reviewed");
        } else {
            debug!(isbn = %isbn, "Review left status unchanged");
        }
        Ok(book.clone())
    }

    /// Delete a book with every engagement row and edit request that
    /// references it, as one unit.
    pub async fn delete_book(&self, caller: &Principal, isbn: &Isbn) -> Result<Cascade> {
        self.roles.require(caller, SystemRole::User)?;
        let guard = self.isbn_locks.lock(isbn).await;
        let role = self.roles.require(caller, SystemRole::User)?;

        let cascade = {
            let mut books = self.books.write();
            let book = books
                .get(isbn)
                .ok_or_else(|| LibraryError::book_not_found(isbn))?;
            if !role.is_admin() && !book.is_uploaded_by(caller) {
                warn!(isbn = %isbn, caller = %caller, "Delete denied");
                return Err(LibraryError::Unauthorized(format!(
                    "only an admin or the uploader may delete {}",
                    isbn
                )));
            }

            let mut requests = self.workflow.write();
            let mut engagement = self.engagement.write();
            cascade_delete(&mut books, &mut requests, &mut engagement, isbn)
        };

        drop(guard);

        info!(
            isbn = %isbn,
            caller = %caller,
            ratings = cascade.engagement.ratings.len(),
            progress = cascade.engagement.progress.len(),
            bookmarks = cascade.engagement.bookmarks.len(),
            "Book deleted"
        );
        Ok(cascade)
    }

    /// Ask an admin for more edits once the allowance is used up
    pub async fn request_more_edits(
        &self,
        caller: &Principal,
        isbn: &Isbn,
        message: Option<String>,
    ) -> Result<EditRequest> {
        self.roles.require(caller, SystemRole::User)?;
        let _book = self.isbn_locks.lock(isbn).await;
        self.roles.require(caller, SystemRole::User)?;

        let books = self.books.read();
        let book = books
            .get(isbn)
            .ok_or_else(|| LibraryError::book_not_found(isbn))?;
        workflow::check_edit_request(book, caller)?;

        let request = EditRequest::new(isbn.clone(), caller.clone(), message, self.clock.now());
        self.workflow.write().push(request.clone());

        info!(isbn = %isbn, author = %caller, "More edits requested");
        Ok(request)
    }

    /// Admin-only. Empties the queue without changing the allowance.
    pub async fn clear_edit_requests(
        &self,
        caller: &Principal,
        isbn: &Isbn,
    ) -> Result<Vec<EditRequest>> {
        self.roles.require_admin(caller)?;
        let _book = self.isbn_locks.lock(isbn).await;
        self.roles.require_admin(caller)?;

        let books = self.books.read();
        if !books.contains(isbn) {
            return Err(LibraryError::book_not_found(isbn));
        }
        let cleared = self.workflow.write().clear(isbn);

        info!(isbn = %isbn, admin = %caller, cleared = cleared.len(), "Edit requests cleared");
        Ok(cleared)
    }

    /// Admin-only. Raises the allowance and settles the open requests.
    pub async fn grant_additional_edits(
        &self,
        caller: &Principal,
        isbn: &Isbn,
        count: u32,
    ) -> Result<Book> {
        self.roles.require_admin(caller)?;
        let _book = self.isbn_locks.lock(isbn).await;
        self.roles.require_admin(caller)?;

        let mut books = self.books.write();
        let book = books
            .get_mut(isbn)
            .ok_or_else(|| LibraryError::book_not_found(isbn))?;
        workflow::grant_edits(book, count)?;
        let settled = self.workflow.write().clear(isbn);

        info!(
            isbn = %isbn,
            admin = %caller,
            granted = count,
            allowance = book.edit_allowance,
            settled = settled.len(),
            "Additional edits granted"
        );
        Ok(book.clone())
    }

    /// Admin or uploader
    pub fn get_edit_requests(&self, caller: &Principal, isbn: &Isbn) -> Result<Vec<EditRequest>> {
        let role = self.roles.role_of(caller);
        let books = self.books.read();
        let book = books
            .get(isbn)
            .ok_or_else(|| LibraryError::book_not_found(isbn))?;
        if !role.is_admin() && !book.is_uploaded_by(caller) {
            return Err(LibraryError::Unauthorized(format!(
                "only an admin or the uploader may view edit requests for {}",
                isbn
            )));
        }
        Ok(self.workflow.read().for_book(isbn))
    }

    pub fn get_all_edit_requests(&self, caller: &Principal) -> Result<Vec<EditRequest>> {
        self.roles.require_admin(caller)?;
        Ok(self.workflow.read().all())
    }

    // ------------------------------------------------------------------
    // Book queries
    // ------------------------------------------------------------------

    /// Approved books, ISBN ascending
    pub fn get_all_books(&self) -> Vec<Book> {
        self.books.list_by_predicate(Book::is_listed)
    }

    pub fn get_pending_submissions(&self, caller: &Principal) -> Result<Vec<Book>> {
        self.get_books_by_status(caller, StatusKind::Pending)
    }

    /// Anyone may list approved books; other statuses are admin-only
    pub fn get_books_by_status(&self, caller: &Principal, status: StatusKind) -> Result<Vec<Book>> {
        if status != StatusKind::Approved {
            self.roles.require_admin(caller)?;
        }
        Ok(self
            .books
            .list_by_predicate(|book| book.approval_status.kind() == status))
    }

    /// Case-insensitive genre match over approved books
    pub fn get_books_by_genre(&self, genre: &str) -> Vec<Book> {
        let genre = genre.trim().to_lowercase();
        self.books.list_by_predicate(|book| {
            book.is_listed() && book.details.genre.trim().to_lowercase() == genre
        })
    }

    /// Case-insensitive author-name match over approved books
    pub fn get_books_by_author(&self, author: &str) -> Vec<Book> {
        let author = author.trim().to_lowercase();
        self.books.list_by_predicate(|book| {
            book.is_listed() && book.details.author.trim().to_lowercase() == author
        })
    }

    /// Unapproved books are only visible to admins and their uploader
    pub fn get_book(&self, caller: &Principal, isbn: &Isbn) -> Result<Book> {
        let book = self.books.get(isbn)?;
        if book.is_listed()
            || book.is_uploaded_by(caller)
            || self.roles.role_of(caller).is_admin()
        {
            Ok(book)
        } else {
            Err(LibraryError::book_not_found(isbn))
        }
    }

    /// The caller's own uploads in every status
    pub fn get_my_submissions(&self, caller: &Principal) -> Vec<Book> {
        self.books
            .list_by_predicate(|book| book.is_uploaded_by(caller))
    }

    // ------------------------------------------------------------------
    // Engagement
    // ------------------------------------------------------------------

    fn require_listed(&self, isbn: &Isbn) -> Result<Book> {
        let book = self.books.get(isbn)?;
        if book.is_listed() {
            Ok(book)
        } else {
            Err(LibraryError::book_not_found(isbn))
        }
    }

    /// Insert or replace the caller's rating of the book
    pub async fn add_rating(&self, caller: &Principal, isbn: &Isbn, stars: u8) -> Result<Rating> {
        self.roles.require(caller, SystemRole::User)?;
        let _account = self.principal_locks.lock(caller).await;
        let _book = self.isbn_locks.lock(isbn).await;

        self.roles.require(caller, SystemRole::User)?;
        let stars = Rating::validate_stars(stars)?;
        self.require_listed(isbn)?;

        let rating = Rating {
            book_isbn: isbn.clone(),
            user: caller.clone(),
            stars,
            timestamp: self.clock.now(),
        };
        let previous = self.engagement.write().upsert_rating(rating.clone());

        debug!(
            isbn = %isbn,
            user = %caller,
            stars,
            previous = previous.map(|r| r.stars),
            "Rating recorded"
        );
        Ok(rating)
    }

    pub fn get_book_ratings(&self, isbn: &Isbn) -> Vec<Rating> {
        self.engagement.read().ratings_for(isbn)
    }

    /// `None` for an unrated (or unknown) book
    pub fn get_book_average_rating(&self, isbn: &Isbn) -> Option<f64> {
        self.engagement.read().average_rating(isbn)
    }

    /// Flip the bookmark; returns whether the book is now bookmarked
    pub async fn toggle_bookmark(&self, caller: &Principal, isbn: &Isbn) -> Result<bool> {
        self.roles.require(caller, SystemRole::User)?;
        let _account = self.principal_locks.lock(caller).await;
        let _book = self.isbn_locks.lock(isbn).await;

        self.roles.require(caller, SystemRole::User)?;
        self.require_listed(isbn)?;

        let bookmarked = self.engagement.write().toggle_bookmark(caller, isbn);
        debug!(isbn = %isbn, user = %caller, bookmarked, "Bookmark toggled");
        Ok(bookmarked)
    }

    pub fn is_book_bookmarked(&self, caller: &Principal, isbn: &Isbn) -> bool {
        self.engagement.read().is_bookmarked(caller, isbn)
    }

    /// The caller's bookmarked books that are still listed
    pub fn get_bookmarked_books(&self, caller: &Principal) -> Vec<Book> {
        let books = self.books.read();
        let isbns = self.engagement.read().bookmarks_of(caller);
        isbns
            .iter()
            .filter_map(|isbn| books.get(isbn))
            .filter(|book| book.is_listed())
            .cloned()
            .collect()
    }

    /// Record pages read, checked against the book's page count at call time
    pub async fn update_reading_progress(
        &self,
        caller: &Principal,
        isbn: &Isbn,
        pages_read: u32,
    ) -> Result<ReadingProgress> {
        self.roles.require(caller, SystemRole::User)?;
        let _account = self.principal_locks.lock(caller).await;
        let _book = self.isbn_locks.lock(isbn).await;

        self.roles.require(caller, SystemRole::User)?;
        let book = self.require_listed(isbn)?;
        let pages_read = ReadingProgress::validate_pages(pages_read, book.details.page_count)?;

        let progress = ReadingProgress {
            book_isbn: isbn.clone(),
            user: caller.clone(),
            pages_read,
            last_updated: self.clock.now(),
        };
        self.engagement.write().set_progress(progress.clone());

        debug!(isbn = %isbn, user = %caller, pages_read, "Reading progress updated");
        Ok(progress)
    }

    pub fn get_user_book_progress(&self, caller: &Principal, isbn: &Isbn) -> Result<ReadingProgress> {
        self.engagement
            .read()
            .progress(caller, isbn)
            .cloned()
            .ok_or_else(|| LibraryError::NotFound(format!("progress of {} on {}", caller, isbn)))
    }

    pub fn get_all_user_progress(&self, caller: &Principal) -> Vec<ReadingProgress> {
        self.engagement.read().progress_of(caller)
    }

    // ------------------------------------------------------------------
    // Aggregation
    // ------------------------------------------------------------------

    pub fn get_trending_books(&self, limit: usize) -> Vec<TrendingBook> {
        aggregate::trending(&self.snapshot(), limit)
    }

    pub fn get_personalized_recommendations(
        &self,
        caller: &Principal,
        limit: usize,
    ) -> Vec<Recommendation> {
        aggregate::recommendations(&self.snapshot(), caller, limit)
    }

    pub fn get_library_stats(&self, caller: &Principal) -> Result<LibraryStats> {
        self.roles.require_admin(caller)?;
        Ok(aggregate::stats(&self.snapshot()))
    }

    // ------------------------------------------------------------------
    // Roles and accounts
    // ------------------------------------------------------------------

    pub fn get_user_role(&self, principal: &Principal) -> Role {
        self.roles.role_of(principal)
    }

    pub fn register(&self, caller: &Principal, profile: UserProfile) -> Result<UserAccount> {
        self.roles.register(caller, profile)
    }

    pub fn get_user_profile(&self, caller: &Principal) -> Result<UserProfile> {
        self.roles
            .profile(caller)
            .ok_or_else(|| LibraryError::NotFound(format!("account {}", caller)))
    }

    pub fn save_user_profile(&self, caller: &Principal, profile: UserProfile) -> Result<UserProfile> {
        self.roles.save_profile(caller, profile)
    }

    pub fn assign_caller_user_role(
        &self,
        caller: &Principal,
        target: &Principal,
        system_role: SystemRole,
    ) -> Result<Role> {
        self.roles.assign_role(caller, target, system_role)
    }

    pub fn promote_to_author(&self, caller: &Principal, target: &Principal) -> Result<Role> {
        self.roles.promote_to_author(caller, target)
    }

    /// Remove the caller's account, engagement and uploaded books as one unit
    pub async fn delete_account(&self, caller: &Principal) -> Result<Cascade> {
        let account_guard = self.principal_locks.lock(caller).await;
        if self.roles.profile(caller).is_none() {
            return Err(LibraryError::NotFound(format!("account {}", caller)));
        }

        // Uploads need the principal lock, so this list cannot grow underneath us
        let owned: Vec<Isbn> = self
            .get_my_submissions(caller)
            .into_iter()
            .map(|book| book.isbn)
            .collect();
        let book_guards = self.isbn_locks.lock_many(owned.iter().cloned()).await;

        let cascade = {
            let mut books = self.books.write();
            let mut requests = self.workflow.write();
            let mut engagement = self.engagement.write();

            let mut cascade = Cascade::default();
            for isbn in &owned {
                let removed = cascade_delete(&mut books, &mut requests, &mut engagement, isbn);
                cascade.books.extend(removed.books);
                cascade.edit_requests.extend(removed.edit_requests);
                cascade.engagement.extend(removed.engagement);
            }
            cascade.engagement.extend(engagement.remove_user(caller));
            cascade.edit_requests.extend(requests.remove_author(caller));
            cascade.account = self.roles.remove(caller);
            cascade
        };

        drop(book_guards);
        drop(account_guard);

        info!(
            principal = %caller,
            books = cascade.books.len(),
            ratings = cascade.engagement.ratings.len(),
            "Account deleted"
        );
        Ok(cascade)
    }
}

/// Remove one book and everything that references it. Infallible once started.
fn cascade_delete(
    books: &mut BookTable,
    requests: &mut EditRequestTable,
    engagement: &mut EngagementTables,
    isbn: &Isbn,
) -> Cascade {
    Cascade {
        books: books.remove(isbn).into_iter().collect(),
        edit_requests: requests.clear(isbn),
        engagement: engagement.remove_book(isbn),
        account: None,
    }
}
