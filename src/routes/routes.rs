//! Defines routes for the local run mode.
//!
//! ## Structure
//! - `GET  /healthz`, `GET /readyz` - liveness and readiness
//! - `PUT  /objects/{bucket}/{*key}` - store an object and ingest it
//! - `POST /events` - ingest every object a notification references
//! - `GET  /certificates/{cert_id}` - certificate aggregate
//! - `GET  /certificates/{cert_id}/sections/{section_id}` - section detail
//!
//! The wildcard `*key` allows nested keys like `uploads/cert-x/Intro.csv`.

use crate::handlers::{
    LocalState,
    certificate_handlers::{get_certificate, get_section},
    event_handlers::ingest_event,
    health_handlers::{healthz, readyz},
    object_handlers::upload_object,
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Build the local-mode router. Handlers share `LocalState`.
pub fn routes() -> Router<LocalState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/objects/{bucket}/{*key}", put(upload_object))
        .route("/events", post(ingest_event))
        .route("/certificates/{cert_id}", get(get_certificate))
        .route(
            "/certificates/{cert_id}/sections/{section_id}",
            get(get_section),
        )
}
