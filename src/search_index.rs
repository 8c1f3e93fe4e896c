//! Search-index access.
//!
//! [`SearchIndex`] is the write seam the dispatcher mutates the hosted index
//! through. Implementations:
//!
//! - **[`AlgoliaClient`]** calls the Algolia REST API.
//! - **[`InMemoryIndex`]** keeps records in memory and logs every call, so
//!   tests can assert exactly which mutations a request produced.
//!
//! # Algolia endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | [`save_records`](SearchIndex::save_records) | `POST /1/indexes/{index}/batch` (chunked by `batch_size`) |
//! | [`save_record`](SearchIndex::save_record) | `PUT /1/indexes/{index}/{objectID}` |
//! | [`delete_record`](SearchIndex::delete_record) | `DELETE /1/indexes/{index}/{objectID}` |
//!
//! Saves create or fully replace a record by `objectID`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use index_sync_core::models::IndexRecord;
use reqwest::{Response, Url};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::config::SearchIndexConfig;

/// Mutations against a hosted search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create or replace every record in `records`.
    async fn save_records(&self, index_name: &str, records: &[IndexRecord]) -> Result<()>;

    /// Create or replace one record.
    async fn save_record(&self, index_name: &str, record: &IndexRecord) -> Result<()>;

    /// Delete the record with `object_id`. Deleting a missing record succeeds.
    async fn delete_record(&self, index_name: &str, object_id: &str) -> Result<()>;
}

// ============ Algolia ============

#[derive(Serialize)]
struct BatchRequest<'a> {
    requests: Vec<BatchOperation<'a>>,
}

#[derive(Serialize)]
struct BatchOperation<'a> {
    action: &'static str,
    body: &'a IndexRecord,
}

/// Algolia REST client authenticated with an admin API key.
pub struct AlgoliaClient {
    http: reqwest::Client,
    host: Url,
    app_id: String,
    api_key: String,
    batch_size: usize,
}

impl AlgoliaClient {
    pub fn new(config: &SearchIndexConfig, api_key: String) -> Result<Self> {
        let host = match config.host {
            Some(ref host) => host.clone(),
            None => format!("https://{}.algolia.net", config.app_id),
        };
        let host = Url::parse(&host).with_context(|| format!("Invalid Algolia host: {}", host))?;
        if host.cannot_be_a_base() {
            bail!("Invalid Algolia host: {}", host);
        }

        Ok(Self {
            http: reqwest::Client::builder().build()?,
            host,
            app_id: config.app_id.clone(),
            api_key,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Construct from config, reading the admin key from the environment.
    pub fn from_config(config: &SearchIndexConfig) -> Result<Self> {
        Self::new(config, config.api_key()?)
    }

    /// `{host}/1/indexes/{index}[/{objectID}|/batch]`, segments percent-encoded.
    fn index_url(&self, index_name: &str, tail: &str) -> Result<Url> {
        let mut url = self.host.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Invalid Algolia host: {}", self.host))?
            .pop_if_empty()
            .extend(["1", "indexes", index_name, tail]);
        Ok(url)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-Algolia-Application-Id", &self.app_id)
            .header("X-Algolia-API-Key", &self.api_key)
    }
}

async fn check_response(response: Response, operation: &str) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body_text = response.text().await.unwrap_or_default();
    bail!("Algolia {} failed with {}: {}", operation, status, body_text)
}

#[async_trait]
impl SearchIndex for AlgoliaClient {
    async fn save_records(&self, index_name: &str, records: &[IndexRecord]) -> Result<()> {
        let url = self.index_url(index_name, "batch")?;

        for batch in records.chunks(self.batch_size) {
            let body = BatchRequest {
                requests: batch
                    .iter()
                    .map(|record| BatchOperation {
                        action: "addObject",
                        body: record,
                    })
                    .collect(),
            };

            let response = self
                .authed(self.http.post(url.clone()))
                .json(&body)
                .send()
                .await
                .context("Algolia batch request failed")?;
            check_response(response, "batch").await?;
        }

        Ok(())
    }

    async fn save_record(&self, index_name: &str, record: &IndexRecord) -> Result<()> {
        let url = self.index_url(index_name, &record.object_id)?;
        let response = self
            .authed(self.http.put(url))
            .json(record)
            .send()
            .await
            .context("Algolia save request failed")?;
        check_response(response, "save").await
    }

    async fn delete_record(&self, index_name: &str, object_id: &str) -> Result<()> {
        let url = self.index_url(index_name, object_id)?;
        let response = self
            .authed(self.http.delete(url))
            .send()
            .await
            .context("Algolia delete request failed")?;
        check_response(response, "delete").await
    }
}

// ============ In-memory ============

/// One call recorded by [`InMemoryIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOperation {
    SaveRecords {
        index: String,
        object_ids: Vec<String>,
    },
    SaveRecord {
        index: String,
        object_id: String,
    },
    DeleteRecord {
        index: String,
        object_id: String,
    },
}

/// In-memory index that records every mutation call.
#[derive(Default)]
pub struct InMemoryIndex {
    records: RwLock<BTreeMap<(String, String), IndexRecord>>,
    operations: RwLock<Vec<IndexOperation>>,
    failure: RwLock<Option<String>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `message` (or succeed again on `None`).
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.write().unwrap_or_else(|e| e.into_inner()) = message.map(str::to_string);
    }

    /// All calls received so far, including failed ones.
    pub fn operations(&self) -> Vec<IndexOperation> {
        self.operations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn get(&self, index_name: &str, object_id: &str) -> Option<IndexRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(index_name.to_string(), object_id.to_string()))
            .cloned()
    }

    /// Object ids stored under `index_name`, in sorted order.
    pub fn object_ids(&self, index_name: &str) -> Vec<String> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .filter(|(index, _)| index == index_name)
            .map(|(_, id)| id.clone())
            .collect()
    }

    fn record(&self, operation: IndexOperation) -> Result<()> {
        self.operations
            .write()
            .map_err(|_| anyhow::anyhow!("index lock poisoned"))?
            .push(operation);
        match self
            .failure
            .read()
            .map_err(|_| anyhow::anyhow!("index lock poisoned"))?
            .as_deref()
        {
            Some(message) => bail!("{}", message),
            None => Ok(()),
        }
    }

    fn put(&self, index_name: &str, record: &IndexRecord) -> Result<()> {
        self.records
            .write()
            .map_err(|_| anyhow::anyhow!("index lock poisoned"))?
            .insert(
                (index_name.to_string(), record.object_id.clone()),
                record.clone(),
            );
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    async fn save_records(&self, index_name: &str, records: &[IndexRecord]) -> Result<()> {
        self.record(IndexOperation::SaveRecords {
            index: index_name.to_string(),
            object_ids: records.iter().map(|r| r.object_id.clone()).collect(),
        })?;
        for record in records {
            self.put(index_name, record)?;
        }
        Ok(())
    }

    async fn save_record(&self, index_name: &str, record: &IndexRecord) -> Result<()> {
        self.record(IndexOperation::SaveRecord {
            index: index_name.to_string(),
            object_id: record.object_id.clone(),
        })?;
        self.put(index_name, record)
    }

    async fn delete_record(&self, index_name: &str, object_id: &str) -> Result<()> {
        self.record(IndexOperation::DeleteRecord {
            index: index_name.to_string(),
            object_id: object_id.to_string(),
        })?;
        self.records
            .write()
            .map_err(|_| anyhow::anyhow!("index lock poisoned"))?
            .remove(&(index_name.to_string(), object_id.to_string()));
        Ok(())
    }
}
