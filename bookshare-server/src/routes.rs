//! API routes

use crate::config::CorsPolicy;
use crate::handlers;
use crate::state::AppState;
use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

const LOCAL_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

fn cors_layer(policy: &CorsPolicy) -> CorsLayer {
    let origins = match policy {
        CorsPolicy::Any => AllowOrigin::any(),
        CorsPolicy::Origins(origins) => AllowOrigin::list(origins.clone()),
        CorsPolicy::LocalDevelopment => {
            AllowOrigin::list(LOCAL_ORIGINS.into_iter().map(HeaderValue::from_static))
        }
    };
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors);

    let api_routes = Router::new()
        // Books and review
        .route("/books", get(handlers::list_books).post(handlers::submit_book))
        .route(
            "/books/:isbn",
            get(handlers::get_book)
                .put(handlers::update_book)
                .delete(handlers::delete_book),
        )
        .route("/books/:isbn/decision", post(handlers::review_book))
        .route("/books/status/:status", get(handlers::books_by_status))
        .route("/books/genre/:genre", get(handlers::books_by_genre))
        .route("/books/author/:author", get(handlers::books_by_author))
        .route("/submissions/pending", get(handlers::pending_submissions))
        .route("/submissions/mine", get(handlers::my_submissions))
        // Edit requests
        .route(
            "/books/:isbn/edit-requests",
            get(handlers::list_edit_requests)
                .post(handlers::request_more_edits)
                .delete(handlers::clear_edit_requests),
        )
        .route("/books/:isbn/edit-grants", post(handlers::grant_edits))
        .route("/edit-requests", get(handlers::all_edit_requests))
        // Engagement
        .route("/books/:isbn/rating", put(handlers::rate_book))
        .route("/books/:isbn/ratings", get(handlers::book_ratings))
        .route("/books/:isbn/rating/average", get(handlers::average_rating))
        .route(
            "/books/:isbn/bookmark",
            get(handlers::bookmark_status).post(handlers::toggle_bookmark),
        )
        .route(
            "/books/:isbn/progress",
            get(handlers::book_progress).put(handlers::update_progress),
        )
        .route("/me/bookmarks", get(handlers::my_bookmarks))
        .route("/me/progress", get(handlers::my_progress))
        // Discovery
        .route("/trending", get(handlers::trending))
        .route("/me/recommendations", get(handlers::recommendations))
        .route("/stats", get(handlers::library_stats))
        // Accounts and roles
        .route("/me", post(handlers::register).delete(handlers::delete_account))
        .route(
            "/me/profile",
            get(handlers::get_profile).put(handlers::save_profile),
        )
        .route("/me/role", get(handlers::get_role))
        .route("/users/:principal/role", put(handlers::assign_role))
        .route("/users/:principal/author", post(handlers::promote_to_author))
        // SSE endpoint
        .route("/sync", get(handlers::sync_events));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
