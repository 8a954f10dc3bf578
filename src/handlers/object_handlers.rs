//! Upload handler: the local stand-in for an object landing in the bucket.
//! Streams the body to disk, then runs the pipeline as an object-created
//! notification would.

use crate::{
    errors::AppError,
    handlers::LocalState,
    models::event::ObjectRef,
    services::pipeline::IngestReport,
};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures::StreamExt;
use serde::Serialize;
use std::io;

#[derive(Serialize)]
pub struct UploadResponse {
    pub size_bytes: u64,
    pub report: IngestReport,
}

/// PUT `/objects/{bucket}/{*key}` - store the object and ingest it.
pub async fn upload_object(
    State(state): State<LocalState>,
    Path((bucket, key)): Path<(String, String)>,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(io::Error::other));

    let size_bytes = state.objects.put_stream(&bucket, &key, stream).await?;
    tracing::info!(%bucket, %key, size_bytes, "stored upload");

    let report = state.pipeline.ingest(&ObjectRef { bucket, key }).await?;
    Ok((StatusCode::CREATED, Json(UploadResponse { size_bytes, report })))
}
