// ---------------------------------------------------------------------------
// handlers/maps.rs - map link → website resolution
// ---------------------------------------------------------------------------

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::models::{ProcessMapsRequest, ProcessMapsResponse};
use crate::state::AppState;

use super::ApiError;

/// POST /process-maps - resolve one record or a batch.
///
/// The response mirrors the request: an object for a single record, an
/// array (same order) for a batch. Unresolved records come back with
/// `Status: "Website Not Found"` and their original `Website`.
#[utoipa::path(post, path = "/process-maps", tag = "resolve",
    request_body = ProcessMapsRequest,
    responses(
        (status = 200, description = "Resolution outcomes", body = ProcessMapsResponse),
        (status = 400, description = "Body is not a record or an array of records", body = serde_json::Value),
        (status = 413, description = "Batch exceeds MAX_BATCH_RECORDS", body = serde_json::Value)
    )
)]
pub async fn process_maps(
    State(state): State<AppState>,
    payload: Result<Json<ProcessMapsRequest>, JsonRejection>,
) -> Result<Json<ProcessMapsResponse>, ApiError> {
    let Json(request) = payload?;
    match request {
        ProcessMapsRequest::Single(record) => {
            let outcome = state.resolver.resolve(&record).await;
            Ok(Json(ProcessMapsResponse::Single(outcome)))
        }
        ProcessMapsRequest::Batch(records) => {
            check_batch_size(records.len(), state.max_batch_records)?;
            let outcomes = state.resolver.resolve_batch(records).await;
            Ok(Json(ProcessMapsResponse::Batch(outcomes)))
        }
    }
}

pub(crate) fn check_batch_size(len: usize, max: usize) -> Result<(), ApiError> {
    if len > max {
        return Err(ApiError::PayloadTooLarge(format!(
            "Batch has {} records, limit is {}",
            len, max
        )));
    }
    Ok(())
}
