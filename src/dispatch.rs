//! Sync dispatcher.
//!
//! Classifies an inbound request into a [`SyncEvent`] and performs the one
//! index action it calls for:
//!
//! | Event | Action |
//! |-------|--------|
//! | `FullReindexRequested` | fetch every document, normalize, one bulk save |
//! | `Upsert` | normalize the supplied document, save its record(s) |
//! | `Delete` | delete the record with the event id |
//! | `Malformed` | nothing; client error |
//!
//! The dispatcher holds no per-request state. The content store is only
//! read. A full reindex does not remove records whose documents are gone,
//! and deleting a sharded document removes only the record whose id equals
//! the document id; its `{id}-{n}` shard records stay in the index.

use anyhow::{Context, Result};
use index_sync_core::models::SourceDocument;
use index_sync_core::normalize::{normalize_with, NormalizeLimits};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::content_store::{ContentStore, SanityClient};
use crate::error::SyncError;
use crate::search_index::{AlgoliaClient, SearchIndex};

/// Webhook operation value that selects deletion.
pub const DELETE_OPERATION: &str = "delete";

/// Classified inbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    FullReindexRequested,
    Upsert { id: String, value: Option<Value> },
    Delete { id: String },
    Malformed { reason: String },
}

/// Recognized webhook body: `{ _id, operation, value? }`.
#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(default)]
    operation: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

impl SyncEvent {
    /// Classify a request. `full_reindex` is the query flag; when set, the
    /// body is not looked at.
    pub fn classify(full_reindex: bool, raw_body: &[u8]) -> Self {
        if full_reindex {
            return SyncEvent::FullReindexRequested;
        }

        if raw_body.iter().all(u8::is_ascii_whitespace) {
            return SyncEvent::malformed("No payload provided");
        }

        let payload: WebhookPayload = match serde_json::from_slice(raw_body) {
            Ok(payload) => payload,
            Err(e) => return SyncEvent::malformed(format!("body is not a valid payload: {}", e)),
        };

        let id = match payload.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return SyncEvent::malformed("missing required field: _id"),
        };

        match payload.operation.as_deref() {
            None => SyncEvent::malformed("missing required field: operation"),
            Some(op) if op.trim().is_empty() => {
                SyncEvent::malformed("missing required field: operation")
            }
            Some(DELETE_OPERATION) => SyncEvent::Delete { id },
            Some(_) => SyncEvent::Upsert {
                id,
                value: payload.value.filter(|v| !v.is_null()),
            },
        }
    }

    fn malformed(reason: impl Into<String>) -> Self {
        SyncEvent::Malformed {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::FullReindexRequested => "full_reindex",
            SyncEvent::Upsert { .. } => "upsert",
            SyncEvent::Delete { .. } => "delete",
            SyncEvent::Malformed { .. } => "malformed",
        }
    }
}

/// Successful dispatch summary, returned as the response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub message: String,
    /// Records written (saved) or deleted.
    pub records: usize,
}

/// Routes events to the content store and search index.
pub struct SyncDispatcher {
    content: Arc<dyn ContentStore>,
    index: Arc<dyn SearchIndex>,
    index_name: String,
    limits: NormalizeLimits,
}

impl SyncDispatcher {
    pub fn new(
        content: Arc<dyn ContentStore>,
        index: Arc<dyn SearchIndex>,
        index_name: impl Into<String>,
        limits: NormalizeLimits,
    ) -> Self {
        Self {
            content,
            index,
            index_name: index_name.into(),
            limits,
        }
    }

    /// Build the Sanity and Algolia clients from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let content = SanityClient::from_config(&config.content_store)
            .context("Failed to create content store client")?;
        let index = AlgoliaClient::from_config(&config.search_index)
            .context("Failed to create search index client")?;
        Ok(Self::new(
            Arc::new(content),
            Arc::new(index),
            config.search_index.index_name.clone(),
            config.normalize,
        ))
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub async fn dispatch(&self, event: SyncEvent) -> Result<SyncOutcome, SyncError> {
        debug!(event = event.kind(), "dispatching sync event");
        match event {
            SyncEvent::FullReindexRequested => self.full_reindex().await,
            SyncEvent::Upsert { id, value } => self.upsert(&id, value).await,
            SyncEvent::Delete { id } => self.delete(&id).await,
            SyncEvent::Malformed { reason } => Err(SyncError::MalformedPayload(reason)),
        }
    }

    async fn full_reindex(&self) -> Result<SyncOutcome, SyncError> {
        info!(index = %self.index_name, "starting full reindex");
        let documents = self
            .content
            .fetch_all()
            .await
            .context("Failed to fetch documents from content store")?;

        let records: Vec<_> = documents
            .iter()
            .flat_map(|doc| normalize_with(doc, &self.limits))
            .collect();

        self.index
            .save_records(&self.index_name, &records)
            .await
            .context("Failed to save records to search index")?;

        info!(
            documents = documents.len(),
            records = records.len(),
            "full reindex completed"
        );
        Ok(SyncOutcome {
            message: format!(
                "Successfully completed initial indexing! ({} documents, {} records)",
                documents.len(),
                records.len()
            ),
            records: records.len(),
        })
    }

    async fn upsert(&self, id: &str, value: Option<Value>) -> Result<SyncOutcome, SyncError> {
        let document = match value {
            Some(value) => document_from_value(id, value)?,
            None => self
                .content
                .fetch_document(id)
                .await
                .with_context(|| format!("Failed to fetch document {}", id))?
                .ok_or_else(|| SyncError::NotFound(id.to_string()))?,
        };

        let records = normalize_with(&document, &self.limits);
        match records.as_slice() {
            [record] => self
                .index
                .save_record(&self.index_name, record)
                .await
                .with_context(|| format!("Failed to save record {}", record.object_id))?,
            _ => {
                debug!(id, shards = records.len(), "document sharded");
                self.index
                    .save_records(&self.index_name, &records)
                    .await
                    .with_context(|| format!("Failed to save shards of {}", id))?
            }
        }

        info!(id, records = records.len(), "indexed document");
        Ok(SyncOutcome {
            message: format!("Successfully processed document with ID: {}!", id),
            records: records.len(),
        })
    }

    async fn delete(&self, id: &str) -> Result<SyncOutcome, SyncError> {
        self.index
            .delete_record(&self.index_name, id)
            .await
            .with_context(|| format!("Failed to delete record {}", id))?;

        info!(id, "deleted record");
        Ok(SyncOutcome {
            message: format!("Successfully deleted object with ID: {}", id),
            records: 1,
        })
    }
}

/// Parse a webhook `value` as a document whose id is the event id.
fn document_from_value(id: &str, value: Value) -> Result<SourceDocument, SyncError> {
    if !value.is_object() {
        return Err(SyncError::MalformedPayload(
            "value must be a document object".to_string(),
        ));
    }
    let mut document: SourceDocument = serde_json::from_value(value)
        .map_err(|e| SyncError::MalformedPayload(format!("invalid document value: {}", e)))?;
    document.id = id.to_string();
    Ok(document)
}
