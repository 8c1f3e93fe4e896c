//! # index-sync core
//!
//! Pure logic for index-sync: the content-store document model, Portable
//! Text flattening, and the record normalizer that turns one source
//! document into one or more size-bounded search-index records.
//!
//! This crate performs no I/O and has no async runtime dependency. The
//! service crate (`index-sync`) owns the HTTP clients and the webhook
//! server and calls into [`normalize`] on every upsert and reindex.
//!
//! # Example
//!
//! ```rust
//! use index_sync_core::models::{RichText, SourceDocument};
//! use index_sync_core::normalize::normalize;
//!
//! let doc = SourceDocument {
//!     id: "abc".to_string(),
//!     title: Some("T".to_string()),
//!     body: Some(RichText::Plain("x".repeat(20_000))),
//!     ..Default::default()
//! };
//!
//! let records = normalize(&doc);
//! let ids: Vec<&str> = records.iter().map(|r| r.object_id.as_str()).collect();
//! assert_eq!(ids, ["abc-0", "abc-1", "abc-2"]);
//! ```

pub mod models;
pub mod normalize;
pub mod richtext;
