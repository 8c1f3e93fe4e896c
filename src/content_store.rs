//! Content-store access.
//!
//! The [`ContentStore`] trait is the read-only seam the dispatcher fetches
//! source documents through. Two implementations ship with the crate:
//!
//! - **[`SanityClient`]** queries the Sanity HTTP API with GROQ.
//! - **[`InMemoryContentStore`]** holds documents in memory, for tests and
//!   offline runs.
//!
//! # GROQ projection
//!
//! Both query shapes project the same fields so that the normalizer sees a
//! flattened body string rather than raw Portable Text:
//!
//! ```text
//! *[_type == $type]{ _id, title, "slug": slug.current,
//!   "body": pt::text(content), coverImage, date, _createdAt, _updatedAt }
//! ```

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use index_sync_core::models::SourceDocument;
use serde_json::Value;
use std::sync::RwLock;

use crate::config::ContentStoreConfig;

/// Fields projected for every fetched document.
const PROJECTION: &str = r#"{
  _id,
  title,
  "slug": slug.current,
  "body": pt::text(content),
  coverImage,
  date,
  _createdAt,
  _updatedAt
}"#;

/// Which documents to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentQuery {
    /// Every document of the configured type.
    All,
    /// The single document with this id, if it still exists.
    ById(String),
}

impl DocumentQuery {
    /// GROQ text for this query. Parameters are bound separately.
    pub fn groq(&self) -> String {
        match self {
            DocumentQuery::All => format!("*[_type == $type]{}", PROJECTION),
            DocumentQuery::ById(_) => format!("*[_type == $type && _id == $id]{}", PROJECTION),
        }
    }
}

/// Read-only source of documents.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Run `query` and return the matching documents.
    async fn fetch(&self, query: &DocumentQuery) -> Result<Vec<SourceDocument>>;

    async fn fetch_all(&self) -> Result<Vec<SourceDocument>> {
        self.fetch(&DocumentQuery::All).await
    }

    async fn fetch_document(&self, id: &str) -> Result<Option<SourceDocument>> {
        let mut documents = self.fetch(&DocumentQuery::ById(id.to_string())).await?;
        if documents.is_empty() {
            Ok(None)
        } else {
            Ok(Some(documents.swap_remove(0)))
        }
    }
}

// ============ Sanity ============

/// Sanity HTTP API client.
///
/// Issues `GET {host}/v{api_version}/data/query/{dataset}?query=…&$type=…`.
/// GROQ parameters are passed as JSON-encoded `$name` query arguments.
pub struct SanityClient {
    http: reqwest::Client,
    query_url: String,
    document_type: String,
    token: Option<String>,
}

impl SanityClient {
    pub fn new(config: &ContentStoreConfig, token: Option<String>) -> Result<Self> {
        let host = match config.api_host {
            Some(ref host) => host.trim_end_matches('/').to_string(),
            None if config.use_cdn => format!("https://{}.apicdn.sanity.io", config.project_id),
            None => format!("https://{}.api.sanity.io", config.project_id),
        };
        let query_url = format!(
            "{}/v{}/data/query/{}",
            host,
            config.api_version.trim_start_matches('v'),
            config.dataset
        );

        Ok(Self {
            http: reqwest::Client::builder().build()?,
            query_url,
            document_type: config.document_type.clone(),
            token,
        })
    }

    /// Construct from config, reading the optional token from the environment.
    pub fn from_config(config: &ContentStoreConfig) -> Result<Self> {
        Self::new(config, config.token())
    }

    pub fn query_url(&self) -> &str {
        &self.query_url
    }

    fn query_args(&self, query: &DocumentQuery) -> Vec<(String, String)> {
        let mut args = vec![
            ("query".to_string(), query.groq()),
            ("$type".to_string(), Value::from(self.document_type.as_str()).to_string()),
        ];
        if let DocumentQuery::ById(id) = query {
            args.push(("$id".to_string(), Value::from(id.as_str()).to_string()));
        }
        args
    }
}

#[async_trait]
impl ContentStore for SanityClient {
    async fn fetch(&self, query: &DocumentQuery) -> Result<Vec<SourceDocument>> {
        let mut request = self.http.get(&self.query_url).query(&self.query_args(query));
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Sanity query request to {} failed", self.query_url))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Sanity API error {}: {}", status, body_text);
        }

        let json: Value = response
            .json()
            .await
            .context("Invalid Sanity response: body is not JSON")?;
        parse_query_response(json)
    }
}

/// Extract documents from a query response's `result` field.
///
/// `result` may be an array, a single object, or `null`.
fn parse_query_response(json: Value) -> Result<Vec<SourceDocument>> {
    let result = match json {
        Value::Object(mut map) => map
            .remove("result")
            .ok_or_else(|| anyhow::anyhow!("Invalid Sanity response: missing result"))?,
        _ => bail!("Invalid Sanity response: expected an object"),
    };

    let items = match result {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        other => bail!("Invalid Sanity response: unexpected result {}", other),
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).context("Invalid Sanity response: malformed document")
        })
        .collect()
}

// ============ In-memory ============

/// In-memory content store for tests and offline runs.
pub struct InMemoryContentStore {
    documents: RwLock<Vec<SourceDocument>>,
}

impl InMemoryContentStore {
    pub fn new(documents: Vec<SourceDocument>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    /// Insert or replace a document by id.
    pub fn insert(&self, document: SourceDocument) {
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        documents.retain(|d| d.id != document.id);
        documents.push(document);
    }

    pub fn remove(&self, id: &str) {
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        documents.retain(|d| d.id != id);
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn fetch(&self, query: &DocumentQuery) -> Result<Vec<SourceDocument>> {
        let documents = self
            .documents
            .read()
            .map_err(|_| anyhow::anyhow!("content store lock poisoned"))?;
        Ok(match query {
            DocumentQuery::All => documents.clone(),
            DocumentQuery::ById(id) => documents.iter().filter(|d| &d.id == id).cloned().collect(),
        })
    }
}
