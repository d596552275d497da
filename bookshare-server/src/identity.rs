//! Caller identity
//!
//! Authentication happens upstream; the gateway forwards the caller's
//! principal in a header. A missing or blank header is the anonymous caller.

use axum::http::HeaderMap;
use bookshare_core::Principal;

pub const PRINCIPAL_HEADER: &str = "x-principal";

pub fn caller(headers: &HeaderMap) -> Principal {
    headers
        .get(PRINCIPAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(Principal::new)
        .unwrap_or_else(Principal::anonymous)
}
