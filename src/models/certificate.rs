//! Per-certificate metadata: the display name and the sections ingested so far.

use serde::{Deserialize, Serialize};

/// Metadata aggregate for one certificate.
///
/// `sections` is append-only in ingestion order. Re-ingesting a file appends
/// its section again; duplicates are not filtered.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CertificateAggregate {
    pub cert_id: String,
    pub cert_name: String,
    #[serde(default)]
    pub sections: Vec<String>,
}

/// Human-readable certificate name: the id with hyphens turned into spaces.
pub fn display_name(cert_id: &str) -> String {
    cert_id.replace('-', " ")
}
