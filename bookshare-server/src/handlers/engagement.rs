//! Ratings, bookmarks and reading progress

use super::persist;
use crate::error::{ApiError, ApiResult};
use crate::identity::caller;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use bookshare_core::{Book, Isbn, LibraryError, Rating, ReadingProgress};
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Whole numbers that fit `T`; anything else (negative, fractional, too large)
/// is out of range for the caller to hear about.
fn whole<T: TryFrom<u64>>(value: &Number) -> Option<T> {
    value.as_u64().and_then(|n| T::try_from(n).ok())
}

/// Any JSON number is accepted here so out-of-range values reach the rating rules
#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub stars: Number,
}

pub async fn rate_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(isbn): Path<Isbn>,
    Json(body): Json<RatingRequest>,
) -> ApiResult<Json<Rating>> {
    let stars = whole::<u8>(&body.stars)
        .ok_or_else(|| LibraryError::InvalidRating(body.stars.to_string()))?;
    let rating = state
        .library
        .add_rating(&caller(&headers), &isbn, stars)
        .await?;
    persist(&state).await?;
    Ok(Json(rating))
}

pub async fn book_ratings(
    State(state): State<AppState>,
    Path(isbn): Path<Isbn>,
) -> Json<Vec<Rating>> {
    Json(state.library.get_book_ratings(&isbn))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageRatingResponse {
    /// `null` when the book has no ratings
    pub average: Option<f64>,
    pub count: usize,
}

pub async fn average_rating(
    State(state): State<AppState>,
    Path(isbn): Path<Isbn>,
) -> Json<AverageRatingResponse> {
    Json(AverageRatingResponse {
        average: state.library.get_book_average_rating(&isbn),
        count: state.library.get_book_ratings(&isbn).len(),
    })
}

#[derive(Debug, Serialize)]
pub struct BookmarkResponse {
    pub bookmarked: bool,
}

pub async fn toggle_bookmark(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(isbn): Path<Isbn>,
) -> ApiResult<Json<BookmarkResponse>> {
    let bookmarked = state
        .library
        .toggle_bookmark(&caller(&headers), &isbn)
        .await?;
    persist(&state).await?;
    Ok(Json(BookmarkResponse { bookmarked }))
}

pub async fn bookmark_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(isbn): Path<Isbn>,
) -> Json<BookmarkResponse> {
    Json(BookmarkResponse {
        bookmarked: state.library.is_book_bookmarked(&caller(&headers), &isbn),
    })
}

pub async fn my_bookmarks(State(state): State<AppState>, headers: HeaderMap) -> Json<Vec<Book>> {
    Json(state.library.get_bookmarked_books(&caller(&headers)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    pub pages_read: Number,
}

pub async fn update_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(isbn): Path<Isbn>,
    Json(body): Json<ProgressRequest>,
) -> ApiResult<Json<ReadingProgress>> {
    let caller = caller(&headers);
    let Some(pages_read) = whole::<u32>(&body.pages_read) else {
        // the error names the book's length, so unknown books stay NotFound
        let book = state.library.get_book(&caller, &isbn)?;
        return Err(ApiError::from(LibraryError::InvalidProgress {
            pages_read: body.pages_read.to_string(),
            page_count: book.details.page_count,
        }));
    };
    let progress = state
        .library
        .update_reading_progress(&caller, &isbn, pages_read)
        .await?;
    persist(&state).await?;
    Ok(Json(progress))
}

pub async fn book_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(isbn): Path<Isbn>,
) -> ApiResult<Json<ReadingProgress>> {
    Ok(Json(
        state
            .library
            .get_user_book_progress(&caller(&headers), &isbn)?,
    ))
}

pub async fn my_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<Vec<ReadingProgress>> {
    Json(state.library.get_all_user_progress(&caller(&headers)))
}
