//! Trending, recommendations and library statistics

use super::LimitQuery;
use crate::error::ApiResult;
use crate::identity::caller;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use bookshare_core::{LibraryStats, Recommendation, TrendingBook};

pub async fn trending(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<TrendingBook>> {
    Json(state.library.get_trending_books(query.limit))
}

pub async fn recommendations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<Recommendation>> {
    Json(
        state
            .library
            .get_personalized_recommendations(&caller(&headers), query.limit),
    )
}

/// Admin-only counts across every table
pub async fn library_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<LibraryStats>> {
    Ok(Json(state.library.get_library_stats(&caller(&headers))?))
}
