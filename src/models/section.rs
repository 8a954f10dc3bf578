//! The flashcard content of one certificate section.

use crate::models::flashcard::FlashcardRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Detail record keyed by `(cert_id, section_id)`.
///
/// Writes replace the whole record; flashcards from an earlier ingestion of
/// the same section are never merged.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SectionDetail {
    pub cert_id: String,
    pub cert_name: String,
    pub section_id: String,
    #[serde(default)]
    pub flashcards: Vec<FlashcardRecord>,
    pub ingested_at: DateTime<Utc>,
}
