//! Shared fixtures for the integration tests

#![allow(dead_code)]

use bookshare_core::{BookDetails, Isbn, Library, ManualClock, NewBook, Principal, UserProfile};
use std::sync::Arc;

pub const DAY: i64 = 86_400 * 1_000_000_000;

pub struct Fixture {
    pub library: Arc<Library>,
    pub clock: Arc<ManualClock>,
    pub admin: Principal,
    pub author: Principal,
    pub reader: Principal,
}

pub fn details(title: &str, genre: &str, pages: u32) -> BookDetails {
    BookDetails {
        title: title.to_string(),
        author: "Octavia E. Butler".to_string(),
        genre: genre.to_string(),
        description: format!("{} in {}", title, genre),
        cover_url: None,
        pdf_url: None,
        publication_year: 1993,
        page_count: pages,
    }
}

pub fn profile(name: &str) -> UserProfile {
    UserProfile {
        name: name.to_string(),
        is_author: false,
    }
}

pub fn isbn(value: &str) -> Isbn {
    Isbn::new(value).unwrap()
}

impl Fixture {
    pub fn new() -> Self {
        let admin = Principal::new("admin-principal");
        let author = Principal::new("author-principal");
        let reader = Principal::new("reader-principal");

        let clock = Arc::new(ManualClock::new(1_700_000_000 * 1_000_000_000));
        let library = Arc::new(Library::with_clock([admin.clone()], clock.clone()));
        library.register(&admin, profile("Admin")).unwrap();
        library.register(&author, profile("Author")).unwrap();
        library.register(&reader, profile("Reader")).unwrap();

        Self {
            library,
            clock,
            admin,
            author,
            reader,
        }
    }

    pub fn user(&self, name: &str) -> Principal {
        let principal = Principal::new(name);
        self.library.register(&principal, profile(name)).unwrap();
        principal
    }

    pub async fn submit(&self, isbn_value: &str, genre: &str, pages: u32) -> Isbn {
        let isbn = isbn(isbn_value);
        self.library
            .submit_book_for_approval(
                &self.author,
                NewBook {
                    isbn: isbn.clone(),
                    details: details(&format!("Book {}", isbn_value), genre, pages),
                },
            )
            .await
            .unwrap();
        isbn
    }

    pub async fn publish(&self, isbn_value: &str, genre: &str, pages: u32) -> Isbn {
        let isbn = self.submit(isbn_value, genre, pages).await;
        self.library
            .approve_book_submission(&self.admin, &isbn, true, None)
            .await
            .unwrap();
        isbn
    }
}
