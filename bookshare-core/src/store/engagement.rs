//! Ratings, bookmarks and reading progress, keyed by (user, book)

use crate::types::{Bookmark, Isbn, Principal, Rating, ReadingProgress};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Engagement rows removed by a cascade, kept so the cascade can be undone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngagementRows {
    pub ratings: Vec<Rating>,
    pub progress: Vec<ReadingProgress>,
    pub bookmarks: Vec<Bookmark>,
}

impl EngagementRows {
    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty() && self.progress.is_empty() && self.bookmarks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ratings.len() + self.progress.len() + self.bookmarks.len()
    }

    pub fn extend(&mut self, other: EngagementRows) {
        self.ratings.extend(other.ratings);
        self.progress.extend(other.progress);
        self.bookmarks.extend(other.bookmarks);
    }
}

#[derive(Debug, Default)]
pub struct EngagementTables {
    ratings: BTreeMap<(Isbn, Principal), Rating>,
    progress: BTreeMap<(Principal, Isbn), ReadingProgress>,
    bookmarks: BTreeMap<Principal, BTreeSet<Isbn>>,
}

impl EngagementTables {
    /// Insert or replace the caller's rating, returning the one it replaced
    pub fn upsert_rating(&mut self, rating: Rating) -> Option<Rating> {
        let key = (rating.book_isbn.clone(), rating.user.clone());
        self.ratings.insert(key, rating)
    }

    pub fn ratings_for(&self, isbn: &Isbn) -> Vec<Rating> {
        self.ratings
            .values()
            .filter(|r| &r.book_isbn == isbn)
            .cloned()
            .collect()
    }

    /// Arithmetic mean of the book's ratings; `None` when unrated
    pub fn average_rating(&self, isbn: &Isbn) -> Option<f64> {
        let (sum, count) = self
            .ratings
            .values()
            .filter(|r| &r.book_isbn == isbn)
            .fold((0u64, 0u64), |(sum, count), r| {
                (sum + u64::from(r.stars), count + 1)
            });
        if count == 0 {
            None
        } else {
            Some(sum as f64 / count as f64)
        }
    }

    /// Flip membership; returns whether the book is now bookmarked
    pub fn toggle_bookmark(&mut self, user: &Principal, isbn: &Isbn) -> bool {
        let set = self.bookmarks.entry(user.clone()).or_default();
        let now_bookmarked = if set.remove(isbn) {
            false
        } else {
            set.insert(isbn.clone());
            true
        };
        if set.is_empty() {
            self.bookmarks.remove(user);
        }
        now_bookmarked
    }

    pub fn is_bookmarked(&self, user: &Principal, isbn: &Isbn) -> bool {
        self.bookmarks
            .get(user)
            .is_some_and(|set| set.contains(isbn))
    }

    pub fn bookmarks_of(&self, user: &Principal) -> Vec<Isbn> {
        self.bookmarks
            .get(user)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_progress(&mut self, progress: ReadingProgress) {
        let key = (progress.user.clone(), progress.book_isbn.clone());
        self.progress.insert(key, progress);
    }

    pub fn progress(&self, user: &Principal, isbn: &Isbn) -> Option<&ReadingProgress> {
        self.progress.get(&(user.clone(), isbn.clone()))
    }

    pub fn progress_of(&self, user: &Principal) -> Vec<ReadingProgress> {
        self.progress
            .values()
            .filter(|p| &p.user == user)
            .cloned()
            .collect()
    }

    /// Pull progress rows back within a shrunken page count; returns rows touched
    pub fn clamp_progress(&mut self, isbn: &Isbn, page_count: u32) -> usize {
        let mut clamped = 0;
        for progress in self.progress.values_mut() {
            if &progress.book_isbn == isbn && progress.pages_read > page_count {
                progress.pages_read = page_count;
                clamped += 1;
            }
        }
        clamped
    }

    /// Remove every row that references the book
    pub fn remove_book(&mut self, isbn: &Isbn) -> EngagementRows {
        let mut removed = EngagementRows::default();

        self.ratings.retain(|_, rating| {
            if &rating.book_isbn == isbn {
                removed.ratings.push(rating.clone());
                false
            } else {
                true
            }
        });

        self.progress.retain(|_, progress| {
            if &progress.book_isbn == isbn {
                removed.progress.push(progress.clone());
                false
            } else {
                true
            }
        });

        self.bookmarks.retain(|user, set| {
            if set.remove(isbn) {
                removed.bookmarks.push(Bookmark {
                    user: user.clone(),
                    book_isbn: isbn.clone(),
                });
            }
            !set.is_empty()
        });

        removed
    }

    /// Remove every row the user owns
    pub fn remove_user(&mut self, user: &Principal) -> EngagementRows {
        let mut removed = EngagementRows::default();

        self.ratings.retain(|_, rating| {
            if &rating.user == user {
                removed.ratings.push(rating.clone());
                false
            } else {
                true
            }
        });

        self.progress.retain(|_, progress| {
            if &progress.user == user {
                removed.progress.push(progress.clone());
                false
            } else {
                true
            }
        });

        if let Some(set) = self.bookmarks.remove(user) {
            removed
                .bookmarks
                .extend(set.into_iter().map(|book_isbn| Bookmark {
                    user: user.clone(),
                    book_isbn,
                }));
        }

        removed
    }

    /// Put back rows previously taken out by a cascade. Rows written since
    /// the removal win over the ones being put back.
    pub fn restore(&mut self, rows: EngagementRows) {
        for rating in rows.ratings {
            let key = (rating.book_isbn.clone(), rating.user.clone());
            self.ratings.entry(key).or_insert(rating);
        }
        for progress in rows.progress {
            let key = (progress.user.clone(), progress.book_isbn.clone());
            self.progress.entry(key).or_insert(progress);
        }
        for bookmark in rows.bookmarks {
            self.bookmarks
                .entry(bookmark.user)
                .or_default()
                .insert(bookmark.book_isbn);
        }
    }

    pub fn all_ratings(&self) -> Vec<Rating> {
        self.ratings.values().cloned().collect()
    }

    pub fn all_progress(&self) -> Vec<ReadingProgress> {
        self.progress.values().cloned().collect()
    }

    pub fn all_bookmarks(&self) -> Vec<Bookmark> {
        self.bookmarks
            .iter()
            .flat_map(|(user, set)| {
                set.iter().map(move |isbn| Bookmark {
                    user: user.clone(),
                    book_isbn: isbn.clone(),
                })
            })
            .collect()
    }
}

/// Shared handle to the engagement tables
#[derive(Debug, Default)]
pub struct EngagementStore {
    tables: RwLock<EngagementTables>,
}

impl EngagementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, EngagementTables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, EngagementTables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}
