//! Authoritative keyed storage of book records

use crate::error::{LibraryError, Result};
use crate::types::{Book, Isbn};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Book rows keyed by ISBN. Pending, approved and rejected records share one
/// keyspace, so an ISBN is unique across submissions and published books.
#[derive(Debug, Default)]
pub struct BookTable {
    books: BTreeMap<Isbn, Book>,
}

impl BookTable {
    pub fn get(&self, isbn: &Isbn) -> Option<&Book> {
        self.books.get(isbn)
    }

    pub fn get_mut(&mut self, isbn: &Isbn) -> Option<&mut Book> {
        self.books.get_mut(isbn)
    }

    pub fn contains(&self, isbn: &Isbn) -> bool {
        self.books.contains_key(isbn)
    }

    /// Insert a new record; fails if the ISBN is taken
    pub fn create(&mut self, book: Book) -> Result<()> {
        if self.books.contains_key(&book.isbn) {
            return Err(LibraryError::DuplicateIsbn(book.isbn.to_string()));
        }
        self.books.insert(book.isbn.clone(), book);
        Ok(())
    }

    pub fn remove(&mut self, isbn: &Isbn) -> Option<Book> {
        self.books.remove(isbn)
    }

    /// Books in ascending ISBN order
    pub fn iter(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    /// Linear scan; the corpus is small enough that no secondary index is kept
    pub fn list_by<P>(&self, predicate: P) -> Vec<Book>
    where
        P: Fn(&Book) -> bool,
    {
        self.books
            .values()
            .filter(|book| predicate(book))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

/// Shared handle to the book table
#[derive(Debug, Default)]
pub struct BookStore {
    table: RwLock<BookTable>,
}

impl BookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, BookTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, BookTable> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, isbn: &Isbn) -> Result<Book> {
        self.read()
            .get(isbn)
            .cloned()
            .ok_or_else(|| LibraryError::book_not_found(isbn))
    }

    pub fn create(&self, book: Book) -> Result<()> {
        self.write().create(book)
    }

    pub fn list_by_predicate<P>(&self, predicate: P) -> Vec<Book>
    where
        P: Fn(&Book) -> bool,
    {
        self.read().list_by(predicate)
    }
}
