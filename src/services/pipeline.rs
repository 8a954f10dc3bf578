//! src/services/pipeline.rs
//!
//! IngestPipeline: turns one uploaded CSV object into a section detail record
//! and a certificate metadata update.
//!
//! Steps run strictly in order, each awaited before the next:
//! `ResolvingKey → Fetching → Parsing → UpsertingMetadata → WritingDetail → Done`.
//! The first failure stops the run. Nothing is retried or rolled back, so a
//! failed detail write after a successful metadata upsert leaves the section
//! listed without content until the file is ingested again.

use crate::{
    errors::IngestError,
    models::{
        certificate::display_name,
        event::{self, ObjectRef},
        flashcard::FlashcardRecord,
        object_key::ObjectKey,
        section::SectionDetail,
    },
    services::{
        csv_decoder::decode_rows,
        object_source::ObjectSource,
        store::{CertificateStore, SectionStore},
    },
};
use chrono::Utc;
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    ResolvingKey,
    Fetching,
    Parsing,
    UpsertingMetadata,
    WritingDetail,
    Done,
}

/// Outcome of one successful ingestion.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub bucket: String,
    pub key: String,
    pub cert_id: String,
    pub section_id: String,
    /// Flashcards written to the section.
    pub flashcards: usize,
    /// Length of the certificate's section list after the upsert.
    pub sections: usize,
}

#[derive(Clone)]
pub struct IngestPipeline {
    objects: Arc<dyn ObjectSource>,
    certificates: Arc<dyn CertificateStore>,
    sections: Arc<dyn SectionStore>,
}

impl IngestPipeline {
    pub fn new(
        objects: Arc<dyn ObjectSource>,
        certificates: Arc<dyn CertificateStore>,
        sections: Arc<dyn SectionStore>,
    ) -> Self {
        Self {
            objects,
            certificates,
            sections,
        }
    }

    pub fn certificates(&self) -> &dyn CertificateStore {
        self.certificates.as_ref()
    }

    pub fn sections(&self) -> &dyn SectionStore {
        self.sections.as_ref()
    }

    /// Ingest every object referenced by a raw notification, one after the
    /// other, stopping at the first failure.
    pub async fn handle_notification(
        &self,
        payload: Value,
    ) -> Result<Vec<IngestReport>, IngestError> {
        let objects = event::object_refs(payload)?;
        if objects.is_empty() {
            tracing::info!("notification references no objects");
        }

        let mut reports = Vec::with_capacity(objects.len());
        for object in &objects {
            reports.push(self.ingest(object).await?);
        }
        Ok(reports)
    }

    /// Ingest a single stored object.
    #[tracing::instrument(skip(self), fields(bucket = %object.bucket, key = %object.key))]
    pub async fn ingest(&self, object: &ObjectRef) -> Result<IngestReport, IngestError> {
        let mut stage = Stage::ResolvingKey;
        let result = self.run(object, &mut stage).await;
        match &result {
            Ok(report) => tracing::info!(
                cert_id = %report.cert_id,
                section_id = %report.section_id,
                flashcards = report.flashcards,
                sections = report.sections,
                "ingested section"
            ),
            Err(err) => tracing::error!(stage = ?stage, error = %err.chain(), "ingestion failed"),
        }
        result
    }

    async fn run(&self, object: &ObjectRef, stage: &mut Stage) -> Result<IngestReport, IngestError> {
        enter(stage, Stage::ResolvingKey);
        let ObjectKey {
            cert_id,
            section_id,
        } = ObjectKey::parse(&object.key).map_err(|source| IngestError::MalformedKey {
            key: object.key.clone(),
            source,
        })?;

        enter(stage, Stage::Fetching);
        let body = self
            .objects
            .open(&object.bucket, &object.key)
            .await
            .map_err(|source| IngestError::Fetch {
                bucket: object.bucket.clone(),
                key: object.key.clone(),
                source,
            })?;

        enter(stage, Stage::Parsing);
        let flashcards: Vec<FlashcardRecord> = decode_rows(body)
            .map_ok(FlashcardRecord::from_row)
            .try_collect()
            .await
            .map_err(|source| IngestError::Decode {
                bucket: object.bucket.clone(),
                key: object.key.clone(),
                source,
            })?;
        tracing::debug!(rows = flashcards.len(), "decoded object");

        enter(stage, Stage::UpsertingMetadata);
        let aggregate = self
            .certificates
            .append_section(&cert_id, &section_id)
            .await
            .map_err(|source| IngestError::MetadataWrite {
                table: self.certificates.metadata_table().to_string(),
                cert_id: cert_id.clone(),
                source,
            })?;

        enter(stage, Stage::WritingDetail);
        let detail = SectionDetail {
            cert_name: display_name(&cert_id),
            cert_id,
            section_id,
            flashcards,
            ingested_at: Utc::now(),
        };
        self.sections
            .put_section(&detail)
            .await
            .map_err(|source| IngestError::DetailWrite {
                table: self.sections.detail_table().to_string(),
                cert_id: detail.cert_id.clone(),
                section_id: detail.section_id.clone(),
                source,
            })?;

        enter(stage, Stage::Done);
        Ok(IngestReport {
            bucket: object.bucket.clone(),
            key: object.key.clone(),
            flashcards: detail.flashcards.len(),
            sections: aggregate.sections.len(),
            cert_id: detail.cert_id,
            section_id: detail.section_id,
        })
    }
}

fn enter(stage: &mut Stage, next: Stage) {
    *stage = next;
    tracing::debug!(stage = ?next, "entering stage");
}
