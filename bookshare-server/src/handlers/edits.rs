//! Edit request handlers

use super::persist;
use crate::error::ApiResult;
use crate::identity::caller;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use bookshare_core::{Book, EditRequest, Isbn};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct MoreEditsRequest {
    #[serde(default)]
    pub message: Option<String>,
}

pub async fn request_more_edits(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(isbn): Path<Isbn>,
    Json(body): Json<MoreEditsRequest>,
) -> ApiResult<(StatusCode, Json<EditRequest>)> {
    let request = state
        .library
        .request_more_edits(&caller(&headers), &isbn, body.message)
        .await?;
    persist(&state).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list_edit_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(isbn): Path<Isbn>,
) -> ApiResult<Json<Vec<EditRequest>>> {
    Ok(Json(state.library.get_edit_requests(&caller(&headers), &isbn)?))
}

/// Returns the requests that were cleared
pub async fn clear_edit_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(isbn): Path<Isbn>,
) -> ApiResult<Json<Vec<EditRequest>>> {
    let cleared = state
        .library
        .clear_edit_requests(&caller(&headers), &isbn)
        .await?;
    persist(&state).await?;
    Ok(Json(cleared))
}

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub count: u32,
}

pub async fn grant_edits(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(isbn): Path<Isbn>,
    Json(grant): Json<GrantRequest>,
) -> ApiResult<Json<Book>> {
    let book = state
        .library
        .grant_additional_edits(&caller(&headers), &isbn, grant.count)
        .await?;
    persist(&state).await?;
    Ok(Json(book))
}

/// Every open request across the library (admin)
pub async fn all_edit_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<EditRequest>>> {
    Ok(Json(state.library.get_all_edit_requests(&caller(&headers))?))
}
