pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Single action-dispatch endpoint: interview | generate | get_history
        .route("/api/v1/architect", post(handlers::handle_architect))
        .with_state(state)
}
