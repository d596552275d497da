//! Registration, profiles and role management

use super::persist;
use crate::error::{ApiError, ApiResult};
use crate::identity::caller;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use bookshare_core::{Principal, Role, SystemRole, UserAccount, UserProfile};
use serde::Deserialize;

/// Create the caller's account, or rename it if it already exists
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(profile): Json<UserProfile>,
) -> ApiResult<Json<UserAccount>> {
    let account = state.library.register(&caller(&headers), profile)?;
    persist(&state).await?;
    Ok(Json(account))
}

pub async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.library.get_user_profile(&caller(&headers))?))
}

pub async fn save_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(profile): Json<UserProfile>,
) -> ApiResult<Json<UserProfile>> {
    let profile = state.library.save_user_profile(&caller(&headers), profile)?;
    persist(&state).await?;
    Ok(Json(profile))
}

/// Guests get the guest role rather than an error
pub async fn get_role(State(state): State<AppState>, headers: HeaderMap) -> Json<Role> {
    Json(state.library.get_user_role(&caller(&headers)))
}

/// Remove the caller's account, uploads and engagement
pub async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let cascade = state.library.delete_account(&caller(&headers)).await?;

    if let Err(e) = state.save_library().await {
        tracing::error!("Failed to save library after account deletion: {}", e);
        state.library.restore(cascade);
        return Err(ApiError::Storage(e));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: SystemRole,
}

pub async fn assign_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(target): Path<Principal>,
    Json(body): Json<RoleRequest>,
) -> ApiResult<Json<Role>> {
    let role = state
        .library
        .assign_caller_user_role(&caller(&headers), &target, body.role)?;
    persist(&state).await?;
    Ok(Json(role))
}

pub async fn promote_to_author(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(target): Path<Principal>,
) -> ApiResult<Json<Role>> {
    let role = state
        .library
        .promote_to_author(&caller(&headers), &target)?;
    persist(&state).await?;
    Ok(Json(role))
}
