pub mod health;
pub mod recognize;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/:endpoint", post(recognize::handle_recognize))
        .with_state(state)
}
