//! Data models shared by the normalizer and the sync service.
//!
//! [`SourceDocument`] mirrors what the content store returns, both from a
//! GROQ projection (flattened `body` string) and from a webhook delivery
//! (raw `content` block array). Every field is optional on the wire; a
//! JSON `null` is treated the same as a missing key.
//!
//! [`IndexRecord`] is the search-index wire form. Its serde names match the
//! index's attribute names (`objectID`, `shardIndex`, `coverImage`, …).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::richtext::flatten_rich_text;

/// A document as read from the content store.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SourceDocument {
    #[serde(rename = "_id", default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<Slug>,
    /// Already-flattened text, or blocks when the producer did not flatten.
    #[serde(default)]
    pub body: Option<RichText>,
    /// Raw Portable Text field as stored on the document.
    #[serde(default)]
    pub content: Option<RichText>,
    #[serde(rename = "coverImage", default)]
    pub cover_image: Option<Value>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "_createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "_updatedAt", default)]
    pub updated_at: Option<String>,
}

impl SourceDocument {
    /// Plain-text body: `body` when present, otherwise `content`, otherwise `""`.
    pub fn body_text(&self) -> String {
        match self.body.as_ref().or(self.content.as_ref()) {
            Some(text) => text.to_plain_text(),
            None => String::new(),
        }
    }

    pub fn slug_str(&self) -> &str {
        self.slug.as_ref().map(Slug::as_str).unwrap_or("")
    }
}

/// A slug, either projected to a string or as the raw `{ current }` object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Slug {
    Path(String),
    Object {
        #[serde(default)]
        current: Option<String>,
    },
}

impl Slug {
    pub fn as_str(&self) -> &str {
        match self {
            Slug::Path(path) => path,
            Slug::Object { current } => current.as_deref().unwrap_or(""),
        }
    }
}

/// Rich-text field contents.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RichText {
    Plain(String),
    Blocks(Vec<Block>),
}

impl RichText {
    pub fn to_plain_text(&self) -> String {
        match self {
            RichText::Plain(text) => text.clone(),
            RichText::Blocks(blocks) => flatten_rich_text(blocks),
        }
    }
}

/// One Portable Text node. Only nodes of type `"block"` carry text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Block {
    #[serde(rename = "_type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<Span>,
}

impl Block {
    /// A text block made of the given span texts.
    pub fn text<S: AsRef<str>>(spans: &[S]) -> Self {
        Self {
            kind: "block".to_string(),
            children: spans
                .iter()
                .map(|s| Span {
                    kind: "span".to_string(),
                    text: Some(s.as_ref().to_string()),
                })
                .collect(),
        }
    }

    pub fn is_text_block(&self) -> bool {
        self.kind == "block"
    }
}

/// An inline child of a [`Block`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Span {
    #[serde(rename = "_type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// A record in the search index.
///
/// `object_id` is the document id, or `{documentId}-{shardIndex}` for shards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub title: String,
    pub slug: String,
    pub body: String,
    #[serde(
        rename = "shardIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub shard_index: Option<usize>,
    #[serde(
        rename = "coverImage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cover_image: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(
        rename = "_createdAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
    #[serde(
        rename = "_updatedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
