//! Request handlers

mod accounts;
mod books;
mod discovery;
mod edits;
mod engagement;
mod sync;

pub use accounts::*;
pub use books::*;
pub use discovery::*;
pub use edits::*;
pub use engagement::*;
pub use sync::*;

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Query parameters for ranked listings
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

/// Save after a mutation. The mutation stays applied in memory on failure.
async fn persist(state: &AppState) -> ApiResult<()> {
    state.save_library().await.map_err(|e| {
        tracing::error!("Failed to save library: {}", e);
        e.into()
    })
}
