use axum::{Router, routing::{get, post}};
use tower_http::trace::TraceLayer;

use crate::handlers::{AppState, handle_poll, health};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/poll/{node}", post(handle_poll))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
