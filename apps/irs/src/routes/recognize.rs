use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::api_key_from_headers;
use crate::endpoint::run_recognition;
use crate::errors::AppError;
use crate::recognition::RequestIds;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecognizeRequest {
    pub query: String,
    #[serde(default)]
    pub uid: Option<String>,
}

/// POST /:endpoint
pub async fn handle_recognize(
    State(state): State<AppState>,
    Path(endpoint_name): Path<String>,
    headers: HeaderMap,
    Json(req): Json<RecognizeRequest>,
) -> Result<Json<Value>, AppError> {
    let endpoint = state
        .endpoint(&endpoint_name)
        .ok_or_else(|| AppError::NotFound(format!("Unknown endpoint '{endpoint_name}'")))?;

    if let Some(store) = &endpoint.api_key_store {
        store.verify(
            api_key_from_headers(&headers),
            req.uid.as_deref(),
            endpoint.endpoint_name.as_str(),
        )?;
    }

    if req.query.trim().is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }

    let received_at = Utc::now();
    let started = Instant::now();
    let ids = RequestIds {
        ir_id: Uuid::new_v4().to_string(),
        irs_id: endpoint.irs_id.clone(),
    };

    let outcome = run_recognition(&endpoint, state.generator.as_ref(), &req.query, &ids).await?;
    info!(
        "[{}] {} -> {}",
        endpoint.endpoint_name,
        ids.ir_id,
        outcome.output.code()
    );

    let mut body =
        serde_json::to_value(&outcome.output).map_err(|e| AppError::Internal(e.into()))?;
    if endpoint.verbose {
        body["meta"] = json!({
            "ir_id": ids.ir_id,
            "irs_id": ids.irs_id,
            "endpoint": endpoint.endpoint_name,
            "query": outcome.query,
            "received_at": received_at.to_rfc3339(),
            "elapsed_ms": started.elapsed().as_millis() as u64,
        });
    }
    Ok(Json(body))
}
