//! Trending, recommendation and stats tests
//!
//! Trending order is captured with insta so a change to the scoring formula
//! shows up as a reviewable diff.

mod common;

use bookshare_core::{Isbn, LibraryError, Principal};
use common::{Fixture, DAY};

/// Four listed books: ages 60, 30, 0 and 0 days relative to the newest.
///
/// | isbn  | genre   | ratings |
/// |-------|---------|---------|
/// | 978-a | Fantasy | 5 5 4   |
/// | 978-b | Mystery | 5       |
/// | 978-c | Fantasy | 3 3     |
/// | 978-d | Fantasy | -       |
async fn seeded() -> (Fixture, [Principal; 3]) {
    let fx = Fixture::new();
    let raters = [fx.reader.clone(), fx.user("carol"), fx.user("dave")];

    let a = fx.publish("978-a", "Fantasy", 300).await;
    fx.clock.advance(30 * DAY);
    let c = fx.publish("978-c", "Fantasy", 150).await;
    fx.clock.advance(30 * DAY);
    let b = fx.publish("978-b", "Mystery", 220).await;
    fx.publish("978-d", "Fantasy", 90).await;

    for (rater, stars) in raters.iter().zip([5u8, 5, 4]) {
        fx.library.add_rating(rater, &a, stars).await.unwrap();
    }
    fx.library.add_rating(&raters[0], &b, 5).await.unwrap();
    for rater in &raters[1..] {
        fx.library.add_rating(rater, &c, 3).await.unwrap();
    }

    (fx, raters)
}

fn isbns<T>(items: &[T], isbn_of: impl Fn(&T) -> &Isbn) -> Vec<String> {
    items.iter().map(|item| isbn_of(item).to_string()).collect()
}

#[tokio::test]
async fn test_trending_order_snapshot() {
    let (fx, _) = seeded().await;

    let rendered: Vec<String> = fx
        .library
        .get_trending_books(10)
        .iter()
        .map(|t| {
            let average = t
                .average_rating
                .map(|avg| format!("{:.2}", avg))
                .unwrap_or_else(|| "-".to_string());
            format!("{} {} x{}", t.book.isbn, average, t.rating_count)
        })
        .collect();

    insta::assert_snapshot!("trending_order", rendered.join("\n"));
}

#[tokio::test]
async fn test_trending_is_stable_and_limited() {
    let (fx, _) = seeded().await;

    let first = fx.library.get_trending_books(2);
    let second = fx.library.get_trending_books(2);
    assert_eq!(first, second);
    assert_eq!(isbns(&first, |t| &t.book.isbn), vec!["978-a", "978-b"]);

    assert!(fx.library.get_trending_books(0).is_empty());
    assert_eq!(fx.library.get_trending_books(100).len(), 4);
}

#[tokio::test]
async fn test_trending_ignores_wall_clock() {
    let (fx, _) = seeded().await;
    let before = fx.library.get_trending_books(10);

    fx.clock.advance(365 * DAY);
    assert_eq!(fx.library.get_trending_books(10), before);
}

#[tokio::test]
async fn test_recommendations_follow_genre_affinity() {
    let (fx, _) = seeded().await;
    let erin = fx.user("erin");
    fx.library
        .toggle_bookmark(&erin, &Isbn::new("978-c").unwrap())
        .await
        .unwrap();

    let recs = fx.library.get_personalized_recommendations(&erin, 10);
    assert_eq!(isbns(&recs, |r| &r.book.isbn), vec!["978-a", "978-d", "978-b"]);
    assert_eq!(recs[0].reason, "Because you enjoy Fantasy");
    assert_eq!(recs[1].reason, "Because you enjoy Fantasy");
    assert_eq!(recs[2].reason, "Popular with other readers");
}

#[tokio::test]
async fn test_recommendations_without_history_use_trending() {
    let (fx, _) = seeded().await;
    let frank = fx.user("frank");

    let recs = fx.library.get_personalized_recommendations(&frank, 3);
    assert_eq!(isbns(&recs, |r| &r.book.isbn), vec!["978-a", "978-b", "978-c"]);
    assert!(recs.iter().all(|r| r.reason == "Trending now"));
}

#[tokio::test]
async fn test_recommendations_skip_own_and_engaged_books() {
    let (fx, raters) = seeded().await;

    // Everything listed was uploaded by the fixture author
    assert!(fx
        .library
        .get_personalized_recommendations(&fx.author, 10)
        .is_empty());

    // The reader rated a and b, which leaves c and d
    let recs = fx.library.get_personalized_recommendations(&raters[0], 10);
    let picked = isbns(&recs, |r| &r.book.isbn);
    assert!(!picked.contains(&"978-a".to_string()));
    assert!(!picked.contains(&"978-b".to_string()));
    assert_eq!(picked.len(), 2);
}

#[tokio::test]
async fn test_stats_counts_every_table() {
    let (fx, raters) = seeded().await;
    fx.submit("978-p", "Poetry", 40).await;
    fx.library
        .toggle_bookmark(&raters[1], &Isbn::new("978-d").unwrap())
        .await
        .unwrap();

    let stats = fx.library.get_library_stats(&fx.admin).unwrap();
    assert_eq!(stats.pending_books, 1);
    assert_eq!(stats.approved_books, 4);
    assert_eq!(stats.rejected_books, 0);
    assert_eq!(stats.ratings, 6);
    assert_eq!(stats.bookmarks, 1);
    assert_eq!(stats.accounts, 5);

    assert!(matches!(
        fx.library.get_library_stats(&raters[0]),
        Err(LibraryError::Unauthorized(_))
    ));
}
