//! Read models derived from books and engagement: trending and recommendations
//!
//! Everything here is a pure function of a [`LibrarySnapshot`], recomputed on
//! every call. Identical snapshots always produce identical output.

use crate::clock::NANOS_PER_DAY;
use crate::snapshot::LibrarySnapshot;
use crate::types::{Book, Isbn, Principal, StatusKind};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Recency boost halves every this many days
pub const TRENDING_HALF_LIFE_DAYS: f64 = 30.0;

pub const REASON_TRENDING: &str = "Trending now";
pub const REASON_POPULAR: &str = "Popular with other readers";

const BOOKMARK_AFFINITY: i64 = 2;
const PROGRESS_AFFINITY: i64 = 1;
const FINISHED_AFFINITY: i64 = 1;

/// A listed book with its ranking inputs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingBook {
    pub book: Book,
    pub score: f64,
    pub average_rating: Option<f64>,
    pub rating_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub book: Book,
    pub reason: String,
}

/// Counts across the whole library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub pending_books: usize,
    pub approved_books: usize,
    pub rejected_books: usize,
    pub ratings: usize,
    pub bookmarks: usize,
    pub progress_entries: usize,
    pub accounts: usize,
    pub open_edit_requests: usize,
}

/// `avg * ln(1 + count) * (1 + 0.5^(age / half-life))`; unrated books score 0
pub fn trending_score(average: Option<f64>, rating_count: usize, age_nanos: i64) -> f64 {
    match average {
        Some(average) if rating_count > 0 => {
            let age_days = age_nanos.max(0) as f64 / NANOS_PER_DAY as f64;
            let recency = 0.5f64.powf(age_days / TRENDING_HALF_LIFE_DAYS);
            average * (rating_count as f64).ln_1p() * (1.0 + recency)
        }
        _ => 0.0,
    }
}

/// Every listed book, best first. Ties break on ISBN ascending.
pub fn rank(snapshot: &LibrarySnapshot) -> Vec<TrendingBook> {
    let mut totals: HashMap<&Isbn, (u64, usize)> = HashMap::new();
    for rating in &snapshot.ratings {
        let entry = totals.entry(&rating.book_isbn).or_default();
        entry.0 += u64::from(rating.stars);
        entry.1 += 1;
    }

    // Age is measured against the newest listed book, not the wall clock
    let newest = snapshot
        .listed_books()
        .map(|book| book.created_at)
        .max()
        .unwrap_or_default();

    let mut ranked: Vec<TrendingBook> = snapshot
        .listed_books()
        .map(|book| {
            let (sum, count) = totals.get(&book.isbn).copied().unwrap_or_default();
            let average_rating = (count > 0).then(|| sum as f64 / count as f64);
            let age = newest.saturating_sub(book.created_at);
            TrendingBook {
                book: book.clone(),
                score: trending_score(average_rating, count, age),
                average_rating,
                rating_count: count,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.book.isbn.cmp(&b.book.isbn))
    });
    ranked
}

pub fn trending(snapshot: &LibrarySnapshot, limit: usize) -> Vec<TrendingBook> {
    let mut ranked = rank(snapshot);
    ranked.truncate(limit);
    ranked
}

fn genre_key(genre: &str) -> String {
    genre.trim().to_lowercase()
}

/// Books the user has bookmarked, rated or tracked
fn engaged_with<'a>(snapshot: &'a LibrarySnapshot, user: &Principal) -> BTreeSet<&'a Isbn> {
    let bookmarked = snapshot
        .bookmarks
        .iter()
        .filter(|b| &b.user == user)
        .map(|b| &b.book_isbn);
    let rated = snapshot
        .ratings
        .iter()
        .filter(|r| &r.user == user)
        .map(|r| &r.book_isbn);
    let tracked = snapshot
        .progress
        .iter()
        .filter(|p| &p.user == user)
        .map(|p| &p.book_isbn);

    bookmarked.chain(rated).chain(tracked).collect()
}

/// Preferred genres, strongest first, as (key, display name)
fn preferred_genres(snapshot: &LibrarySnapshot, user: &Principal) -> Vec<(String, String)> {
    let books: HashMap<&Isbn, &Book> = snapshot.books.iter().map(|b| (&b.isbn, b)).collect();

    // key -> (affinity, display name)
    let mut affinity: BTreeMap<String, (i64, String)> = BTreeMap::new();
    let mut add = |isbn: &Isbn, weight: i64| {
        if let Some(book) = books.get(isbn) {
            let entry = affinity
                .entry(genre_key(&book.details.genre))
                .or_insert_with(|| (0, book.details.genre.trim().to_string()));
            entry.0 += weight;
        }
    };

    for bookmark in snapshot.bookmarks.iter().filter(|b| &b.user == user) {
        add(&bookmark.book_isbn, BOOKMARK_AFFINITY);
    }
    for rating in snapshot.ratings.iter().filter(|r| &r.user == user) {
        // 1 star counts against the genre, 3+ for it
        add(&rating.book_isbn, i64::from(rating.stars) - 2);
    }
    for progress in snapshot.progress.iter().filter(|p| &p.user == user) {
        let finished = books
            .get(&progress.book_isbn)
            .is_some_and(|book| progress.is_finished(book.details.page_count));
        let weight = PROGRESS_AFFINITY + if finished { FINISHED_AFFINITY } else { 0 };
        add(&progress.book_isbn, weight);
    }

    let mut genres: Vec<(String, i64, String)> = affinity
        .into_iter()
        .filter(|(_, (score, _))| *score > 0)
        .map(|(key, (score, name))| (key, score, name))
        .collect();
    genres.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    genres
        .into_iter()
        .map(|(key, _, name)| (key, name))
        .collect()
}

/// Listed books the user has not engaged with, led by their preferred genres
pub fn recommendations(
    snapshot: &LibrarySnapshot,
    user: &Principal,
    limit: usize,
) -> Vec<Recommendation> {
    let ranked = rank(snapshot);
    let engaged = engaged_with(snapshot, user);

    let eligible: Vec<&TrendingBook> = ranked
        .iter()
        .filter(|t| !engaged.contains(&t.book.isbn) && !t.book.is_uploaded_by(user))
        .collect();

    if engaged.is_empty() {
        return eligible
            .into_iter()
            .take(limit)
            .map(|t| Recommendation {
                book: t.book.clone(),
                reason: REASON_TRENDING.to_string(),
            })
            .collect();
    }

    let genres = preferred_genres(snapshot, user);
    let genre_rank: HashMap<&str, usize> = genres
        .iter()
        .enumerate()
        .map(|(i, (key, _))| (key.as_str(), i))
        .collect();

    // `eligible` is already in trending order; a stable sort keeps it within a genre
    let mut by_genre: Vec<(usize, &TrendingBook)> = eligible
        .iter()
        .filter_map(|t| {
            genre_rank
                .get(genre_key(&t.book.details.genre).as_str())
                .map(|&rank| (rank, *t))
        })
        .collect();
    by_genre.sort_by_key(|(rank, _)| *rank);

    let mut picked: BTreeSet<&Isbn> = BTreeSet::new();
    let mut result: Vec<Recommendation> = Vec::new();
    for (rank, t) in by_genre {
        if result.len() >= limit {
            break;
        }
        picked.insert(&t.book.isbn);
        result.push(Recommendation {
            book: t.book.clone(),
            reason: format!("Because you enjoy {}", genres[rank].1),
        });
    }

    for t in eligible {
        if result.len() >= limit {
            break;
        }
        if picked.insert(&t.book.isbn) {
            result.push(Recommendation {
                book: t.book.clone(),
                reason: REASON_POPULAR.to_string(),
            });
        }
    }

    result
}

pub fn stats(snapshot: &LibrarySnapshot) -> LibraryStats {
    let mut stats = LibraryStats {
        ratings: snapshot.ratings.len(),
        bookmarks: snapshot.bookmarks.len(),
        progress_entries: snapshot.progress.len(),
        accounts: snapshot.accounts.len(),
        open_edit_requests: snapshot.edit_requests.len(),
        ..LibraryStats::default()
    };
    for book in &snapshot.books {
        match book.approval_status.kind() {
            StatusKind::Pending => stats.pending_books += 1,
            StatusKind::Approved => stats.approved_books += 1,
            StatusKind::Rejected => stats.rejected_books += 1,
        }
    }
    stats
}
