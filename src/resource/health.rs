use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use super::AppState;

/// GET /health
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .backend
        .health_check()
        .await
        .map_err(|e| e.to_response())?;

    Ok(Json(json!({ "status": "ok" })))
}
