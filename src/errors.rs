use crate::{
    models::{event::EventError, object_key::KeyError},
    services::{csv_decoder::DecodeError, object_source::SourceError, store::StoreError},
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{error::Error as StdError, fmt};
use thiserror::Error;

/// Failure of one ingestion, tagged with the step that failed and the
/// object or table involved.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid trigger event")]
    InvalidEvent(#[from] EventError),
    #[error("malformed object key `{key}`")]
    MalformedKey {
        key: String,
        #[source]
        source: KeyError,
    },
    #[error("error getting object `{key}` from bucket `{bucket}`")]
    Fetch {
        bucket: String,
        key: String,
        #[source]
        source: SourceError,
    },
    #[error("error decoding object `{key}` from bucket `{bucket}`")]
    Decode {
        bucket: String,
        key: String,
        #[source]
        source: DecodeError,
    },
    #[error("error updating certificate `{cert_id}` in table `{table}`")]
    MetadataWrite {
        table: String,
        cert_id: String,
        #[source]
        source: StoreError,
    },
    #[error("error putting section `{section_id}` of `{cert_id}` in table `{table}`")]
    DetailWrite {
        table: String,
        cert_id: String,
        section_id: String,
        #[source]
        source: StoreError,
    },
}

impl IngestError {
    /// The message followed by every underlying cause, `: `-separated.
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut cause = StdError::source(self);
        while let Some(err) = cause {
            message.push_str(": ");
            message.push_str(&err.to_string());
            cause = err.source();
        }
        message
    }
}

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        let status = match &err {
            IngestError::InvalidEvent(_) | IngestError::MalformedKey { .. } => {
                StatusCode::BAD_REQUEST
            }
            IngestError::Fetch {
                source: SourceError::NotFound,
                ..
            } => StatusCode::NOT_FOUND,
            IngestError::Fetch {
                source: SourceError::InvalidKey,
                ..
            } => StatusCode::BAD_REQUEST,
            IngestError::Decode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::new(status, err.chain())
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::InvalidKey => AppError::new(StatusCode::BAD_REQUEST, err.to_string()),
            other => AppError::internal(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::internal(err.to_string())
    }
}
