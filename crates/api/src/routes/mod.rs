//! Router assembly.

pub mod progress;

use axum::Router;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the HTTP surface: progress CRUD under `/progress` plus a liveness probe.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/progress",
            get(progress::fetch_student_progress).post(progress::track_progress),
        )
        .route(
            "/progress/",
            get(progress::fetch_student_progress).post(progress::track_progress),
        )
        .route("/progress/:progress_id", put(progress::update_progress))
        // Unauthenticated
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    "OK"
}
