//! In-memory fakes of the pipeline capabilities for tests.

use crate::{
    models::{
        certificate::{CertificateAggregate, display_name},
        section::SectionDetail,
    },
    services::{
        object_source::{ByteStream, ObjectSource, SourceError},
        store::{CertificateStore, SectionStore, StoreError, StoreResult},
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::{
    collections::HashMap,
    io,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Objects served from memory in fixed-size chunks, optionally failing
/// after the body has been partly delivered.
#[derive(Default)]
pub struct MemoryObjectSource {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    chunk_size: Option<usize>,
    fail_after_first_chunk: bool,
    pub opens: AtomicUsize,
}

impl MemoryObjectSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunked(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn failing_mid_stream(mut self) -> Self {
        self.fail_after_first_chunk = true;
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body.into());
    }
}

#[async_trait]
impl ObjectSource for MemoryObjectSource {
    async fn open(&self, bucket: &str, key: &str) -> Result<ByteStream, SourceError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let body = self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or(SourceError::NotFound)?;

        let size = self.chunk_size.unwrap_or(body.len().max(1));
        let mut chunks: Vec<io::Result<Bytes>> = body
            .chunks(size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        if self.fail_after_first_chunk {
            chunks.truncate(1);
            chunks.push(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before end of body",
            )));
        }
        Ok(Box::pin(stream::iter(chunks)))
    }
}

/// Certificate and section tables in memory. The `failing_*` builders make
/// the matching writes fail the way a remote outage would.
#[derive(Default)]
pub struct MemoryStore {
    certificates: Mutex<HashMap<String, CertificateAggregate>>,
    sections: Mutex<HashMap<(String, String), SectionDetail>>,
    fail_certificate_writes: bool,
    fail_section_writes: bool,
    pub certificate_writes: AtomicUsize,
    pub section_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_certificate_writes(mut self) -> Self {
        self.fail_certificate_writes = true;
        self
    }

    pub fn failing_section_writes(mut self) -> Self {
        self.fail_section_writes = true;
        self
    }
}

#[async_trait]
impl CertificateStore for MemoryStore {
    fn metadata_table(&self) -> &str {
        "memory-certificates"
    }

    async fn append_section(
        &self,
        cert_id: &str,
        section_id: &str,
    ) -> StoreResult<CertificateAggregate> {
        self.certificate_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_certificate_writes {
            return Err(StoreError::Dynamo("simulated outage".into()));
        }

        let mut certificates = self.certificates.lock().unwrap();
        let aggregate = certificates
            .entry(cert_id.to_string())
            .or_insert_with(|| CertificateAggregate {
                cert_id: cert_id.to_string(),
                cert_name: String::new(),
                sections: Vec::new(),
            });
        aggregate.cert_name = display_name(cert_id);
        aggregate.sections.push(section_id.to_string());
        Ok(aggregate.clone())
    }

    async fn get_certificate(&self, cert_id: &str) -> StoreResult<Option<CertificateAggregate>> {
        Ok(self.certificates.lock().unwrap().get(cert_id).cloned())
    }
}

#[async_trait]
impl SectionStore for MemoryStore {
    fn detail_table(&self) -> &str {
        "memory-sections"
    }

    async fn put_section(&self, section: &SectionDetail) -> StoreResult<()> {
        self.section_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_section_writes {
            return Err(StoreError::Dynamo("simulated outage".into()));
        }

        self.sections.lock().unwrap().insert(
            (section.cert_id.clone(), section.section_id.clone()),
            section.clone(),
        );
        Ok(())
    }

    async fn get_section(
        &self,
        cert_id: &str,
        section_id: &str,
    ) -> StoreResult<Option<SectionDetail>> {
        Ok(self
            .sections
            .lock()
            .unwrap()
            .get(&(cert_id.to_string(), section_id.to_string()))
            .cloned())
    }
}
