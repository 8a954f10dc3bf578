//! src/services/sqlite_store.rs
//!
//! SqliteStore: local-mode certificate and section tables. Section lists and
//! flashcards are stored as JSON text; appends happen inside a single upsert
//! statement so concurrent ingestions never lose a section.

use crate::{
    models::{
        certificate::{CertificateAggregate, display_name},
        flashcard::FlashcardRecord,
        section::SectionDetail,
    },
    services::store::{CertificateStore, SectionStore, StoreResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool, types::Json};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct SqliteStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
    metadata_table: String,
    detail_table: String,
}

#[derive(FromRow)]
struct CertificateRow {
    cert_id: String,
    cert_name: String,
    sections: Json<Vec<String>>,
}

impl From<CertificateRow> for CertificateAggregate {
    fn from(row: CertificateRow) -> Self {
        Self {
            cert_id: row.cert_id,
            cert_name: row.cert_name,
            sections: row.sections.0,
        }
    }
}

#[derive(FromRow)]
struct SectionRow {
    cert_id: String,
    cert_name: String,
    section_id: String,
    flashcards: Json<Vec<FlashcardRecord>>,
    ingested_at: DateTime<Utc>,
}

impl From<SectionRow> for SectionDetail {
    fn from(row: SectionRow) -> Self {
        Self {
            cert_id: row.cert_id,
            cert_name: row.cert_name,
            section_id: row.section_id,
            flashcards: row.flashcards.0,
            ingested_at: row.ingested_at,
        }
    }
}

impl SqliteStore {
    /// Table names are interpolated into SQL and must already be validated
    /// as plain identifiers.
    pub fn new(
        db: Arc<SqlitePool>,
        metadata_table: impl Into<String>,
        detail_table: impl Into<String>,
    ) -> Self {
        Self {
            db,
            metadata_table: metadata_table.into(),
            detail_table: detail_table.into(),
        }
    }

    /// Create both tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        let statements = [
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{}" (
                    cert_id    TEXT PRIMARY KEY NOT NULL,
                    cert_name  TEXT NOT NULL,
                    sections   TEXT NOT NULL DEFAULT '[]',
                    updated_at TEXT NOT NULL
                )"#,
                self.metadata_table
            ),
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{}" (
                    cert_id     TEXT NOT NULL,
                    section_id  TEXT NOT NULL,
                    cert_name   TEXT NOT NULL,
                    flashcards  TEXT NOT NULL DEFAULT '[]',
                    ingested_at TEXT NOT NULL,
                    PRIMARY KEY (cert_id, section_id)
                )"#,
                self.detail_table
            ),
        ];

        tracing::info!("Ensuring {} sqlite tables...", statements.len());
        for stmt in statements {
            tracing::debug!("Executing schema SQL: {}", stmt);
            sqlx::query(&stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Cheap connectivity probe for readiness checks.
    pub async fn ping(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?)
    }
}

#[async_trait]
impl CertificateStore for SqliteStore {
    fn metadata_table(&self) -> &str {
        &self.metadata_table
    }

    #[tracing::instrument(skip(self))]
    async fn append_section(
        &self,
        cert_id: &str,
        section_id: &str,
    ) -> StoreResult<CertificateAggregate> {
        let sql = format!(
            r#"
            INSERT INTO "{}" (cert_id, cert_name, sections, updated_at)
            VALUES (?, ?, json_array(?), ?)
            ON CONFLICT(cert_id) DO UPDATE SET
                cert_name = excluded.cert_name,
                sections = json_insert(sections, '$[#]', ?),
                updated_at = excluded.updated_at
            RETURNING cert_id, cert_name, sections
            "#,
            self.metadata_table
        );

        let row = sqlx::query_as::<_, CertificateRow>(&sql)
            .bind(cert_id)
            .bind(display_name(cert_id))
            .bind(section_id)
            .bind(Utc::now())
            .bind(section_id)
            .fetch_one(&*self.db)
            .await?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self))]
    async fn get_certificate(&self, cert_id: &str) -> StoreResult<Option<CertificateAggregate>> {
        let sql = format!(
            r#"SELECT cert_id, cert_name, sections FROM "{}" WHERE cert_id = ?"#,
            self.metadata_table
        );
        let row = sqlx::query_as::<_, CertificateRow>(&sql)
            .bind(cert_id)
            .fetch_optional(&*self.db)
            .await?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl SectionStore for SqliteStore {
    fn detail_table(&self) -> &str {
        &self.detail_table
    }

    #[tracing::instrument(skip(self, section), fields(cert_id = %section.cert_id, section_id = %section.section_id))]
    async fn put_section(&self, section: &SectionDetail) -> StoreResult<()> {
        let sql = format!(
            r#"
            INSERT INTO "{}" (cert_id, section_id, cert_name, flashcards, ingested_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(cert_id, section_id) DO UPDATE SET
                cert_name = excluded.cert_name,
                flashcards = excluded.flashcards,
                ingested_at = excluded.ingested_at
            "#,
            self.detail_table
        );

        sqlx::query(&sql)
            .bind(&section.cert_id)
            .bind(&section.section_id)
            .bind(&section.cert_name)
            .bind(Json(&section.flashcards))
            .bind(section.ingested_at)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_section(
        &self,
        cert_id: &str,
        section_id: &str,
    ) -> StoreResult<Option<SectionDetail>> {
        let sql = format!(
            r#"SELECT cert_id, cert_name, section_id, flashcards, ingested_at
               FROM "{}" WHERE cert_id = ? AND section_id = ?"#,
            self.detail_table
        );
        let row = sqlx::query_as::<_, SectionRow>(&sql)
            .bind(cert_id)
            .bind(section_id)
            .fetch_optional(&*self.db)
            .await?;
        Ok(row.map(Into::into))
    }
}
