//! Book submission, review and listing handlers

use super::persist;
use crate::error::{ApiError, ApiResult};
use crate::identity::caller;
use crate::state::{AppState, ServerEvent};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use bookshare_core::{ApprovalStatus, Book, BookDetails, Isbn, NewBook, StatusKind};
use serde::Deserialize;

/// Submit a new book for review
pub async fn submit_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new_book): Json<NewBook>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    let book = state
        .library
        .submit_book_for_approval(&caller(&headers), new_book)
        .await?;
    persist(&state).await?;

    state.broadcast(ServerEvent::BookSubmitted {
        isbn: book.isbn.to_string(),
        title: book.details.title.clone(),
    });
    Ok((StatusCode::CREATED, Json(book)))
}

/// List approved books
pub async fn list_books(State(state): State<AppState>) -> Json<Vec<Book>> {
    Json(state.library.get_all_books())
}

pub async fn get_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(isbn): Path<Isbn>,
) -> ApiResult<Json<Book>> {
    Ok(Json(state.library.get_book(&caller(&headers), &isbn)?))
}

pub async fn update_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(isbn): Path<Isbn>,
    Json(details): Json<BookDetails>,
) -> ApiResult<Json<Book>> {
    let book = state
        .library
        .update_book(&caller(&headers), &isbn, details)
        .await?;
    persist(&state).await?;
    Ok(Json(book))
}

/// Delete a book together with everything that references it
pub async fn delete_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(isbn): Path<Isbn>,
) -> ApiResult<StatusCode> {
    let cascade = state.library.delete_book(&caller(&headers), &isbn).await?;

    // If save fails, restore the removed records for consistency
    if let Err(e) = state.save_library().await {
        tracing::error!("Failed to save library after delete: {}", e);
        state.library.restore(cascade);
        return Err(ApiError::Storage(e));
    }

    state.broadcast(ServerEvent::BookDeleted {
        isbn: isbn.to_string(),
    });
    Ok(StatusCode::NO_CONTENT)
}

/// Review decision body
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub approved: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn review_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(isbn): Path<Isbn>,
    Json(review): Json<ReviewRequest>,
) -> ApiResult<Json<Book>> {
    let book = state
        .library
        .approve_book_submission(&caller(&headers), &isbn, review.approved, review.reason)
        .await?;
    persist(&state).await?;

    let event = match &book.approval_status {
        ApprovalStatus::Approved => Some(ServerEvent::BookApproved {
            isbn: isbn.to_string(),
        }),
        ApprovalStatus::Rejected { reason } => Some(ServerEvent::BookRejected {
            isbn: isbn.to_string(),
            reason: reason.clone(),
        }),
        ApprovalStatus::Pending => None,
    };
    if let Some(event) = event {
        state.broadcast(event);
    }
    Ok(Json(book))
}

pub async fn pending_submissions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Book>>> {
    Ok(Json(state.library.get_pending_submissions(&caller(&headers))?))
}

/// The caller's own uploads in every status
pub async fn my_submissions(State(state): State<AppState>, headers: HeaderMap) -> Json<Vec<Book>> {
    Json(state.library.get_my_submissions(&caller(&headers)))
}

pub async fn books_by_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(status): Path<String>,
) -> ApiResult<Json<Vec<Book>>> {
    let status: StatusKind = status.parse()?;
    Ok(Json(state.library.get_books_by_status(&caller(&headers), status)?))
}

pub async fn books_by_genre(
    State(state): State<AppState>,
    Path(genre): Path<String>,
) -> Json<Vec<Book>> {
    Json(state.library.get_books_by_genre(&genre))
}

pub async fn books_by_author(
    State(state): State<AppState>,
    Path(author): Path<String>,
) -> Json<Vec<Book>> {
    Json(state.library.get_books_by_author(&author))
}
