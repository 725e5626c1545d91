pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Interview API
        .route("/api/v1/interviews", post(handlers::handle_create_interview))
        .route("/api/v1/interviews/:id", get(handlers::handle_get_interview))
        .route(
            "/api/v1/interviews/:id/profile",
            patch(handlers::handle_update_profile),
        )
        .route(
            "/api/v1/interviews/:id/start",
            post(handlers::handle_start_interview),
        )
        .route(
            "/api/v1/interviews/:id/draft",
            put(handlers::handle_update_draft),
        )
        .route(
            "/api/v1/interviews/:id/responses",
            post(handlers::handle_submit_response),
        )
        .route(
            "/api/v1/interviews/:id/signals",
            post(handlers::handle_push_signal),
        )
        .route(
            "/api/v1/interviews/:id/terminate",
            post(handlers::handle_terminate),
        )
        .route(
            "/api/v1/interviews/:id/report",
            get(handlers::handle_get_report),
        )
        .with_state(state)
}
