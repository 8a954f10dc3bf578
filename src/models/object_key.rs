//! Derives certificate and section identifiers from an uploaded object key.
//!
//! Keys follow `<prefix>/<cert_id>/<file name>`, e.g.
//! `uploads/aws-solutions-architect/Networking Basics.csv`.

use thiserror::Error;

/// Minimum number of `/`-separated segments a key must have.
const MIN_KEY_SEGMENTS: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("expected at least 3 path segments, got {0}")]
    TooFewSegments(usize),
    #[error("certificate segment is empty")]
    EmptyCertificate,
    #[error("file name does not yield a section identifier")]
    EmptySection,
}

/// Identifiers derived from an object key.
///
/// `cert_id` is the second path segment verbatim. `section_id` is the file
/// name (last segment) with its last extension removed and each whitespace
/// character replaced by a hyphen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    pub cert_id: String,
    pub section_id: String,
}

impl ObjectKey {
    /// Parse an already URL-decoded object key.
    pub fn parse(key: &str) -> Result<Self, KeyError> {
        let segments: Vec<&str> = key.split('/').collect();
        if segments.len() < MIN_KEY_SEGMENTS {
            return Err(KeyError::TooFewSegments(segments.len()));
        }

        let cert_id = segments[1];
        if cert_id.is_empty() {
            return Err(KeyError::EmptyCertificate);
        }

        let file_name = segments[segments.len() - 1];
        let stem = match file_name.rsplit_once('.') {
            Some((stem, _ext)) => stem,
            None => file_name,
        };
        if stem.trim().is_empty() {
            return Err(KeyError::EmptySection);
        }
        let section_id = hyphenate_whitespace(stem);

        Ok(Self {
            cert_id: cert_id.to_string(),
            section_id,
        })
    }
}

/// One hyphen per whitespace character, so distinct file names stay distinct.
fn hyphenate_whitespace(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}
