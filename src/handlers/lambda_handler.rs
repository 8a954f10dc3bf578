use crate::services::pipeline::{IngestPipeline, IngestReport};
use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;

/// Lambda entry point: one invocation per notification. Any pipeline error
/// fails the invocation so the platform's retry policy applies.
#[tracing::instrument(skip(pipeline, event), fields(request_id = %event.context.request_id))]
pub async fn handler(
    pipeline: IngestPipeline,
    event: LambdaEvent<Value>,
) -> Result<Vec<IngestReport>, Error> {
    let reports = pipeline
        .handle_notification(event.payload)
        .await
        .map_err(|err| Error::from(err.chain()))?;
    tracing::debug!(objects = reports.len(), "handled notification");
    Ok(reports)
}
