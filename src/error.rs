//! Error kinds surfaced at the webhook boundary.

use axum::http::StatusCode;
use thiserror::Error;

/// Failure of a single sync request.
///
/// Collaborator failures arrive as `anyhow::Error` and are wrapped in
/// [`SyncError::Downstream`]; nothing is retried.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Body unparsable, or `_id` / `operation` missing.
    #[error("Invalid payload: {0}")]
    MalformedPayload(String),

    /// Webhook signature header missing or not matching the body.
    #[error("Invalid webhook signature")]
    Unauthorized,

    /// Upsert referenced a document the content store no longer has.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Content-store or search-index call failed.
    #[error("Error indexing objects: {0:#}")]
    Downstream(#[from] anyhow::Error),
}

impl SyncError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Downstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short, stable message for the `error` field of the response body.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::MalformedPayload(_) => "Invalid payload",
            Self::Unauthorized => "Invalid signature",
            Self::NotFound(_) => "Document not found",
            Self::Downstream(_) => "Error indexing objects",
        }
    }

    /// Extra context for the `details` field, if any.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::MalformedPayload(reason) => Some(reason.clone()),
            Self::Unauthorized => None,
            Self::NotFound(id) => Some(format!("no document with ID: {}", id)),
            Self::Downstream(err) => Some(format!("{:#}", err)),
        }
    }
}
