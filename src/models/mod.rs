//! Core data models for the flashcard ingestion pipeline.
//!
//! These are plain values: they map to DynamoDB items through `serde_dynamo`,
//! to SQLite rows through `sqlx`, and to JSON for the local HTTP surface.

pub mod certificate;
pub mod event;
pub mod flashcard;
pub mod object_key;
pub mod section;
