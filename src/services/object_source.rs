//! Object retrieval: the capability the pipeline fetches uploaded CSV bodies through.

use async_trait::async_trait;
use aws_sdk_s3 as s3;
use bytes::Bytes;
use futures::Stream;
use std::{io, pin::Pin};
use thiserror::Error;
use tokio_util::io::ReaderStream;

/// Body of a stored object, yielded incrementally.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("object not found")]
    NotFound,
    #[error("invalid object key")]
    InvalidKey,
    #[error("object store request failed: {0}")]
    Remote(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Open the object at `bucket`/`key` for streaming reads.
    async fn open(&self, bucket: &str, key: &str) -> Result<ByteStream, SourceError>;
}

/// Reads objects from S3.
#[derive(Clone, Debug)]
pub struct S3ObjectSource {
    inner: s3::Client,
}

impl S3ObjectSource {
    pub fn new(inner: s3::Client) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ObjectSource for S3ObjectSource {
    #[tracing::instrument(skip(self))]
    async fn open(&self, bucket: &str, key: &str) -> Result<ByteStream, SourceError> {
        let resp = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(service_err) if service_err.is_no_such_key() => SourceError::NotFound,
                _ => SourceError::Remote(s3::error::DisplayErrorContext(&err).to_string()),
            })?;

        tracing::trace!(content_length = ?resp.content_length(), "opened object body");
        let reader = resp.body.into_async_read();
        Ok(Box::pin(ReaderStream::new(reader)))
    }
}
