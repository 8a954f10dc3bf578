//! Persistence capabilities for certificate metadata and section details.
//!
//! Both are traits so the pipeline can run against DynamoDB in Lambda, SQLite
//! locally and in-memory fakes in tests.

use crate::models::{certificate::CertificateAggregate, section::SectionDetail};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("dynamodb request failed: {0}")]
    Dynamo(String),
    #[error(transparent)]
    SerdeDynamo(#[from] serde_dynamo::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("update returned no attributes")]
    MissingAttributes,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Name of the backing table, used in error context.
    fn metadata_table(&self) -> &str;

    /// Append `section_id` to the certificate's sections, creating the
    /// aggregate when absent, and refresh its display name.
    ///
    /// Must be one atomic remote operation: concurrent appends for the same
    /// certificate all survive. Returns the aggregate as stored afterwards.
    async fn append_section(
        &self,
        cert_id: &str,
        section_id: &str,
    ) -> StoreResult<CertificateAggregate>;

    async fn get_certificate(&self, cert_id: &str) -> StoreResult<Option<CertificateAggregate>>;
}

#[async_trait]
pub trait SectionStore: Send + Sync {
    /// Name of the backing table, used in error context.
    fn detail_table(&self) -> &str;

    /// Write the section, replacing any previous record with the same
    /// `(cert_id, section_id)`.
    async fn put_section(&self, section: &SectionDetail) -> StoreResult<()>;

    async fn get_section(
        &self,
        cert_id: &str,
        section_id: &str,
    ) -> StoreResult<Option<SectionDetail>>;
}
