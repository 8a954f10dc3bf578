//! Point reads of the certificate and section tables.

use crate::{
    errors::AppError,
    handlers::LocalState,
    models::{certificate::CertificateAggregate, section::SectionDetail},
};
use axum::{
    Json,
    extract::{Path, State},
};

/// GET `/certificates/{cert_id}`
pub async fn get_certificate(
    State(state): State<LocalState>,
    Path(cert_id): Path<String>,
) -> Result<Json<CertificateAggregate>, AppError> {
    state
        .pipeline
        .certificates()
        .get_certificate(&cert_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("certificate `{cert_id}` not found")))
}

/// GET `/certificates/{cert_id}/sections/{section_id}`
pub async fn get_section(
    State(state): State<LocalState>,
    Path((cert_id, section_id)): Path<(String, String)>,
) -> Result<Json<SectionDetail>, AppError> {
    state
        .pipeline
        .sections()
        .get_section(&cert_id, &section_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::not_found(format!(
                "section `{section_id}` of certificate `{cert_id}` not found"
            ))
        })
}
