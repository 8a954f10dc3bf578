//! DynamoDB-backed certificate and section stores.
//!
//! Metadata table: partition key `cert_id`. Detail table: partition key
//! `cert_id`, sort key `section_id`.

use crate::{
    models::{
        certificate::{CertificateAggregate, display_name},
        section::SectionDetail,
    },
    services::store::{CertificateStore, SectionStore, StoreError, StoreResult},
};
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    Client,
    error::DisplayErrorContext,
    operation::update_item::builders::UpdateItemFluentBuilder,
    types::{AttributeValue, ReturnValue},
};
use serde_dynamo::{Item, from_item, to_item};

const APPEND_SECTION_EXPRESSION: &str =
    "SET #cert_name = :cert_name, #sections = list_append(if_not_exists(#sections, :empty), :section)";

#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: Client,
    metadata_table: String,
    detail_table: String,
}

impl DynamoStore {
    pub fn new(client: Client, metadata_table: String, detail_table: String) -> Self {
        Self {
            client,
            metadata_table,
            detail_table,
        }
    }

    /// One `UpdateItem` that creates the aggregate when absent and appends
    /// the section otherwise, so concurrent appends never lose each other.
    fn append_section_request(&self, cert_id: &str, section_id: &str) -> UpdateItemFluentBuilder {
        self.client
            .update_item()
            .table_name(&self.metadata_table)
            .key("cert_id", AttributeValue::S(cert_id.to_owned()))
            .update_expression(APPEND_SECTION_EXPRESSION)
            .expression_attribute_names("#cert_name", "cert_name")
            .expression_attribute_names("#sections", "sections")
            .expression_attribute_values(":cert_name", AttributeValue::S(display_name(cert_id)))
            .expression_attribute_values(":empty", AttributeValue::L(Vec::new()))
            .expression_attribute_values(
                ":section",
                AttributeValue::L(vec![AttributeValue::S(section_id.to_owned())]),
            )
            .return_values(ReturnValue::AllNew)
    }
}

fn dynamo_error<E>(err: E) -> StoreError
where
    E: std::error::Error,
{
    StoreError::Dynamo(DisplayErrorContext(&err).to_string())
}

#[async_trait]
impl CertificateStore for DynamoStore {
    fn metadata_table(&self) -> &str {
        &self.metadata_table
    }

    #[tracing::instrument(skip(self))]
    async fn append_section(
        &self,
        cert_id: &str,
        section_id: &str,
    ) -> StoreResult<CertificateAggregate> {
        let out = self
            .append_section_request(cert_id, section_id)
            .send()
            .await
            .map_err(dynamo_error)?;

        let attrs = out.attributes.ok_or(StoreError::MissingAttributes)?;
        Ok(from_item(attrs)?)
    }

    #[tracing::instrument(skip(self))]
    async fn get_certificate(&self, cert_id: &str) -> StoreResult<Option<CertificateAggregate>> {
        let out = self
            .client
            .get_item()
            .table_name(&self.metadata_table)
            .key("cert_id", AttributeValue::S(cert_id.to_owned()))
            .send()
            .await
            .map_err(dynamo_error)?;

        out.item.map(from_item).transpose().map_err(StoreError::from)
    }
}

#[async_trait]
impl SectionStore for DynamoStore {
    fn detail_table(&self) -> &str {
        &self.detail_table
    }

    #[tracing::instrument(skip(self, section), fields(cert_id = %section.cert_id, section_id = %section.section_id))]
    async fn put_section(&self, section: &SectionDetail) -> StoreResult<()> {
        let item: Item = to_item(section)?;
        self.client
            .put_item()
            .table_name(&self.detail_table)
            .set_item(Some(item.into()))
            .send()
            .await
            .map_err(dynamo_error)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_section(
        &self,
        cert_id: &str,
        section_id: &str,
    ) -> StoreResult<Option<SectionDetail>> {
        let out = self
            .client
            .get_item()
            .table_name(&self.detail_table)
            .key("cert_id", AttributeValue::S(cert_id.to_owned()))
            .key("section_id", AttributeValue::S(section_id.to_owned()))
            .send()
            .await
            .map_err(dynamo_error)?;

        out.item.map(from_item).transpose().map_err(StoreError::from)
    }
}
