//! # index-sync
//!
//! Keeps an Algolia search index in sync with documents held in a Sanity
//! content store.
//!
//! Sanity delivers a webhook for every create, update, or delete; the
//! service normalizes the document into one or more size-bounded records
//! and saves or deletes them in Algolia. A query flag on the same route
//! rebuilds the whole index from the content store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  webhook   ┌──────────────┐  normalize  ┌──────────────┐
//! │  Sanity  │──────────▶│  Dispatcher  │────────────▶│   Algolia    │
//! │ (GROQ)   │◀──────────│ + signature  │  save/delete │  (REST API)  │
//! └──────────┘   fetch    └──────────────┘             └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export ALGOLIA_API_KEY=...            # admin key
//! export SANITY_WEBHOOK_SECRET=...      # optional, enables signature checks
//! isync serve                           # start the webhook server
//! isync reindex                         # rebuild the index once
//! isync normalize post.json             # preview records for a document
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`content_store`] | Sanity client and in-memory store |
//! | [`search_index`] | Algolia client and in-memory index |
//! | [`signature`] | Webhook signature verification |
//! | [`dispatch`] | Event classification and routing |
//! | [`server`] | Webhook HTTP server |
//! | [`error`] | Request error kinds |
//! | [`logging`] | Log level config and subscriber setup |
//! | [`reindex`] | `isync reindex` command |
//! | [`preview`] | `isync normalize` command |
//!
//! Record normalization lives in the `index-sync-core` crate and is
//! re-exported as [`core`].

pub use index_sync_core as core;

pub mod config;
pub mod content_store;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod preview;
pub mod reindex;
pub mod search_index;
pub mod server;
pub mod signature;
