//! HTTP handlers for the local run mode.

pub mod certificate_handlers;
pub mod event_handlers;
pub mod health_handlers;
pub mod lambda_handler;
pub mod object_handlers;

use crate::services::{disk_store::DiskObjectStore, pipeline::IngestPipeline, sqlite_store::SqliteStore};

/// Shared state handed to every local-mode handler.
///
/// The pipeline holds the same disk store and SQLite tables behind its
/// capability traits; the concrete handles are kept for uploads, reads and
/// readiness probes.
#[derive(Clone)]
pub struct LocalState {
    pub pipeline: IngestPipeline,
    pub objects: DiskObjectStore,
    pub store: SqliteStore,
}
