use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use super::AppState;
use crate::extractors::ImportJson;
use crate::models::ImportBatch;
use crate::schema::validate_batch;

/// POST /user-import
///
/// 422 when the batch fails structural checks, otherwise the batch summary
/// with 200 for a completed run or 500 for an aborted one.
pub async fn import_users(
    State(state): State<AppState>,
    ImportJson(batch): ImportJson<ImportBatch>,
) -> Response {
    if let Err(errors) = validate_batch(&batch) {
        warn!(
            violations = errors.errors.len(),
            total_records = errors.total_records,
            "Rejected structurally invalid import batch"
        );
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response();
    }

    let summary = state.importer.import_users(batch).await;
    (summary.status.status_code(), Json(summary)).into_response()
}
