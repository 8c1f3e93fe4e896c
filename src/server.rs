//! Webhook HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `{server.webhook_path}` | Content-store webhook (default `/api/algolia`) |
//! | `POST` | `{server.webhook_path}?initialIndex=true` | Full reindex |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Response contract
//!
//! ```json
//! { "message": "Successfully processed document with ID: abc!", "records": 1 }
//! { "error": "Invalid payload", "details": "missing required field: operation" }
//! ```
//!
//! Status codes: 200 success, 400 malformed payload, 401 bad signature,
//! 404 document no longer in the content store, 500 downstream failure.
//!
//! # Signature check
//!
//! When the webhook secret env var is set, the `sanity-webhook-signature`
//! header is verified against the raw body before anything is parsed.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dispatch::{SyncDispatcher, SyncEvent, SyncOutcome};
use crate::error::SyncError;
use crate::signature::{is_valid_signature, SIGNATURE_HEADER};

/// Query flag selecting full-reindex mode.
pub const FULL_REINDEX_PARAM: &str = "initialIndex";

/// Health-check route; the webhook path may not reuse it.
pub const HEALTH_PATH: &str = "/health";

/// Shared state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<SyncDispatcher>,
    /// `None` disables signature verification.
    webhook_secret: Option<Arc<str>>,
}

/// Starts the webhook server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let dispatcher = Arc::new(SyncDispatcher::from_config(config)?);

    let secret = config.webhook.secret();
    if secret.is_none() {
        warn!(
            "{} is not set; webhook signatures will not be verified",
            config.webhook.secret_env
        );
    }

    let app = router(dispatcher, secret, &config.server.webhook_path);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        "webhook server listening on http://{}{}",
        listener.local_addr()?,
        config.server.webhook_path
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router. Exposed so tests and embedders can serve it on their
/// own listener with their own collaborators.
pub fn router(
    dispatcher: Arc<SyncDispatcher>,
    webhook_secret: Option<String>,
    webhook_path: &str,
) -> Router {
    let state = AppState {
        dispatcher,
        webhook_secret: webhook_secret.map(Arc::from),
    };

    Router::new()
        .route(webhook_path, post(handle_webhook))
        .route(HEALTH_PATH, get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "sync request failed");
        } else {
            warn!(error = %self, "sync request rejected");
        }

        let body = ErrorBody {
            error: self.summary().to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST {webhook_path} ============

#[derive(Debug, Deserialize)]
struct SyncQuery {
    #[serde(rename = "initialIndex")]
    initial_index: Option<String>,
}

/// Handler for the webhook route.
///
/// Verifies the signature (if configured), classifies the request, and
/// hands it to the dispatcher. The query string is only inspected after
/// the signature check.
async fn handle_webhook(
    State(state): State<AppState>,
    query: Result<Query<SyncQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SyncOutcome>, SyncError> {
    if let Some(ref secret) = state.webhook_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or(SyncError::Unauthorized)?;
        if !is_valid_signature(&body, signature, secret) {
            return Err(SyncError::Unauthorized);
        }
    }

    let Query(query) = query.map_err(|e| {
        SyncError::MalformedPayload(format!("invalid query string: {}", e.body_text()))
    })?;
    let full_reindex = query.initial_index.as_deref() == Some("true");
    let event = SyncEvent::classify(full_reindex, &body);
    info!(event = event.kind(), "received sync request");

    let outcome = state.dispatcher.dispatch(event).await?;
    Ok(Json(outcome))
}
