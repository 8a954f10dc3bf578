//! Flashcard rows as decoded from CSV and as persisted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A raw two-column CSV row. Columns are positional: the first is the
/// question, the second the answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashcardRow {
    pub question: String,
    pub answer: String,
}

/// A normalized flashcard ready to be written with its section.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FlashcardRecord {
    /// Freshly generated for every ingestion.
    pub id: Uuid,
    pub question: String,
    pub answer: String,
}

impl FlashcardRecord {
    /// Assign a new id and sanitize both text fields.
    pub fn from_row(row: FlashcardRow) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: sanitize_text(&row.question),
            answer: sanitize_text(&row.answer),
        }
    }
}

/// Replace newline, carriage return, tab, backspace and form-feed with a
/// single space each.
pub fn sanitize_text(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' | '\u{8}' | '\u{c}' => ' ',
            other => other,
        })
        .collect()
}
