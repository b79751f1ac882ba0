use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version and the endpoints being served.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let mut endpoints: Vec<&str> = state.endpoints.keys().map(String::as_str).collect();
    endpoints.sort_unstable();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "irs",
        "endpoints": endpoints
    }))
}
