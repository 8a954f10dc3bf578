use crate::{errors::AppError, handlers::LocalState, services::pipeline::IngestReport};
use axum::{Json, extract::State};
use serde_json::Value;

/// POST `/events` - replay a raw S3 notification (or an SNS envelope around
/// one) against the local stores.
pub async fn ingest_event(
    State(state): State<LocalState>,
    Json(payload): Json<Value>,
) -> Result<Json<Vec<IngestReport>>, AppError> {
    let reports = state.pipeline.handle_notification(payload).await?;
    Ok(Json(reports))
}
