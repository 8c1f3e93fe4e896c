//! Record normalizer.
//!
//! Turns a [`SourceDocument`] into the records written to the search index.
//! The index rejects records above a fixed byte size, so each document is
//! bounded in one of two ways:
//!
//! 1. Build a base record: title truncated to `title_max_chars`, slug,
//!    cover image and dates copied, `objectID` = document id, full body.
//! 2. If the serialized base record is at most `max_record_bytes`, return it
//!    alone with the body truncated to `body_chunk_chars`.
//! 3. Otherwise split the body into consecutive `body_chunk_chars` pieces
//!    and return one record per piece, `objectID = "{id}-{n}"`,
//!    `shardIndex = n`, starting at 0.
//!
//! Lengths are counted in `char`s; the size ceiling is counted in UTF-8
//! bytes of the JSON wire form. Concatenating shard bodies in order yields
//! the original body text.

use serde::Deserialize;

use crate::models::{IndexRecord, SourceDocument};

pub const TITLE_MAX_CHARS: usize = 100;
pub const BODY_CHUNK_CHARS: usize = 9000;
pub const MAX_RECORD_BYTES: usize = 10_000;

/// Size bounds applied by [`normalize_with`] and [`shard_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NormalizeLimits {
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
    #[serde(default = "default_body_chunk_chars")]
    pub body_chunk_chars: usize,
    #[serde(default = "default_max_record_bytes")]
    pub max_record_bytes: usize,
}

fn default_title_max_chars() -> usize {
    TITLE_MAX_CHARS
}
fn default_body_chunk_chars() -> usize {
    BODY_CHUNK_CHARS
}
fn default_max_record_bytes() -> usize {
    MAX_RECORD_BYTES
}

impl Default for NormalizeLimits {
    fn default() -> Self {
        Self {
            title_max_chars: TITLE_MAX_CHARS,
            body_chunk_chars: BODY_CHUNK_CHARS,
            max_record_bytes: MAX_RECORD_BYTES,
        }
    }
}

/// Byte length of the record's JSON wire form.
///
/// A record that cannot be serialized counts as infinitely large.
pub fn estimate_size(record: &IndexRecord) -> usize {
    serde_json::to_vec(record)
        .map(|bytes| bytes.len())
        .unwrap_or(usize::MAX)
}

/// First `max_len` chars of `field`, or `field` itself when already short enough.
pub fn truncate(field: &str, max_len: usize) -> String {
    match field.char_indices().nth(max_len) {
        Some((end, _)) => field[..end].to_string(),
        None => field.to_string(),
    }
}

/// Normalize with the default limits.
pub fn normalize(document: &SourceDocument) -> Vec<IndexRecord> {
    normalize_with(document, &NormalizeLimits::default())
}

pub fn normalize_with(document: &SourceDocument, limits: &NormalizeLimits) -> Vec<IndexRecord> {
    let mut base = base_record(document, limits);

    if estimate_size(&base) > limits.max_record_bytes {
        return shard_record(&base, limits);
    }

    base.body = truncate(&base.body, limits.body_chunk_chars);
    vec![base]
}

/// Shard with the default limits.
pub fn shard(document: &SourceDocument) -> Vec<IndexRecord> {
    shard_with(document, &NormalizeLimits::default())
}

/// Split the document body into shard records regardless of its size.
///
/// Always returns at least one record; an empty body yields a single
/// record with an empty body.
pub fn shard_with(document: &SourceDocument, limits: &NormalizeLimits) -> Vec<IndexRecord> {
    shard_record(&base_record(document, limits), limits)
}

fn base_record(document: &SourceDocument, limits: &NormalizeLimits) -> IndexRecord {
    IndexRecord {
        object_id: document.id.clone(),
        title: truncate(
            document.title.as_deref().unwrap_or(""),
            limits.title_max_chars,
        ),
        slug: document.slug_str().to_string(),
        body: document.body_text(),
        shard_index: None,
        cover_image: document.cover_image.clone(),
        date: document.date.clone(),
        created_at: document.created_at.clone(),
        updated_at: document.updated_at.clone(),
    }
}

fn shard_record(base: &IndexRecord, limits: &NormalizeLimits) -> Vec<IndexRecord> {
    split_chars(&base.body, limits.body_chunk_chars)
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| IndexRecord {
            object_id: format!("{}-{}", base.object_id, index),
            body: chunk.to_string(),
            shard_index: Some(index),
            ..base.clone()
        })
        .collect()
}

/// Consecutive slices of at most `max_chars` chars covering `text`.
fn split_chars(text: &str, max_chars: usize) -> Vec<&str> {
    if text.is_empty() {
        return vec![text];
    }

    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let end = remaining
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        chunks.push(&remaining[..end]);
        remaining = &remaining[end..];
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Block, RichText, Slug};

    fn doc(id: &str, title: &str, body: &str) -> SourceDocument {
        SourceDocument {
            id: id.to_string(),
            title: Some(title.to_string()),
            slug: Some(Slug::Path(format!("{}-slug", id))),
            body: Some(RichText::Plain(body.to_string())),
            date: Some("2024-03-01".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_truncate_short_field_unchanged() {
        assert_eq!(truncate("hello", 5), "hello");
        assert_eq!(truncate("hello", 100), "hello");
        assert_eq!(truncate("", 0), "");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("héllo wörld", 4), "héll");
        assert_eq!(truncate("日本語テキスト", 3), "日本語");
    }

    #[test]
    fn test_estimate_size_counts_bytes() {
        let ascii = normalize(&doc("a", "t", "eeee")).remove(0);
        let accented = normalize(&doc("a", "t", "éééé")).remove(0);
        assert_eq!(estimate_size(&accented), estimate_size(&ascii) + 4);
        assert_eq!(
            estimate_size(&ascii),
            serde_json::to_string(&ascii).unwrap().len()
        );
    }

    #[test]
    fn test_small_document_single_record() {
        let records = normalize(&doc("abc", "Title", "short body"));
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.object_id, "abc");
        assert_eq!(record.shard_index, None);
        assert_eq!(record.body, "short body");
        assert_eq!(record.slug, "abc-slug");
        assert_eq!(record.date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn test_title_truncated_to_100_chars() {
        let records = normalize(&doc("abc", &"t".repeat(250), "body"));
        assert_eq!(records[0].title.chars().count(), 100);
    }

    #[test]
    fn test_under_ceiling_body_truncated_to_chunk_size() {
        // 9500 ASCII chars stays under the byte ceiling but over the chunk size.
        let records = normalize(&doc("abc", "T", &"y".repeat(9500)));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].object_id, "abc");
        assert_eq!(records[0].body.chars().count(), 9000);
    }

    #[test]
    fn test_ceiling_is_inclusive() {
        let empty = normalize(&doc("b", "T", "")).remove(0);
        let fill = MAX_RECORD_BYTES - estimate_size(&empty);
        assert!(fill > BODY_CHUNK_CHARS);

        let at_ceiling = doc("b", "T", &"b".repeat(fill));
        let records = normalize(&at_ceiling);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].object_id, "b");
        assert_eq!(records[0].shard_index, None);
        assert_eq!(records[0].body.len(), BODY_CHUNK_CHARS);

        let over_ceiling = doc("b", "T", &"b".repeat(fill + 1));
        let records = normalize(&over_ceiling);
        let shards: Vec<(&str, Option<usize>, usize)> = records
            .iter()
            .map(|r| (r.object_id.as_str(), r.shard_index, r.body.len()))
            .collect();
        assert_eq!(
            shards,
            [
                ("b-0", Some(0), BODY_CHUNK_CHARS),
                ("b-1", Some(1), fill + 1 - BODY_CHUNK_CHARS)
            ]
        );
    }

    #[test]
    fn test_twenty_thousand_chars_gives_three_shards() {
        let records = normalize(&doc("abc", "T", &"x".repeat(20_000)));
        let ids: Vec<&str> = records.iter().map(|r| r.object_id.as_str()).collect();
        assert_eq!(ids, ["abc-0", "abc-1", "abc-2"]);
        let lens: Vec<usize> = records.iter().map(|r| r.body.len()).collect();
        assert_eq!(lens, [9000, 9000, 2000]);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.shard_index, Some(i));
            assert_eq!(record.title, "T");
            assert_eq!(record.slug, "abc-slug");
        }
    }

    #[test]
    fn test_multibyte_body_shards_on_byte_ceiling() {
        // 6000 chars but 12000 bytes: over the ceiling, within one chunk.
        let body = "é".repeat(6000);
        let records = normalize(&doc("m", "T", &body));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].object_id, "m-0");
        assert_eq!(records[0].shard_index, Some(0));
        assert_eq!(records[0].body, body);
    }

    #[test]
    fn test_shards_reassemble_original_body() {
        let body: String = (0..4000).map(|i| format!("w{} ", i)).collect();
        let records = normalize(&doc("r", "T", &body));
        assert!(records.len() > 1);
        for record in &records {
            assert!(record.body.chars().count() <= BODY_CHUNK_CHARS);
        }
        let joined: String = records.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(joined, body);
    }

    #[test]
    fn test_shard_ids_contiguous_from_zero() {
        let records = shard(&doc("p", "T", &"z".repeat(45_001)));
        assert_eq!(records.len(), 6);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.object_id, format!("p-{}", i));
            assert_eq!(record.shard_index, Some(i));
        }
        assert_eq!(records[5].body, "z");
    }

    #[test]
    fn test_empty_body_shards_to_one_empty_record() {
        let records = shard(&doc("e", "T", ""));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].object_id, "e-0");
        assert_eq!(records[0].body, "");
    }

    #[test]
    fn test_missing_fields_do_not_fail() {
        let records = normalize(&SourceDocument::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "");
        assert_eq!(records[0].slug, "");
        assert_eq!(records[0].body, "");
    }

    #[test]
    fn test_block_body_is_flattened() {
        let document = SourceDocument {
            id: "b".to_string(),
            content: Some(RichText::Blocks(vec![
                Block::text(&["One"]),
                Block::text(&["Two"]),
            ])),
            ..Default::default()
        };
        assert_eq!(normalize(&document)[0].body, "One\n\nTwo");
    }

    #[test]
    fn test_custom_limits() {
        let limits = NormalizeLimits {
            title_max_chars: 2,
            body_chunk_chars: 4,
            max_record_bytes: 80,
        };
        let records = normalize_with(&doc("c", "Title", &"q".repeat(100)), &limits);
        assert_eq!(records.len(), 25);
        assert!(records.iter().all(|r| r.title == "Ti"));
        assert!(records.iter().all(|r| r.body == "qqqq"));
    }

    #[test]
    fn test_deterministic() {
        let document = doc("d", "T", &"abc ".repeat(5000));
        assert_eq!(normalize(&document), normalize(&document));
    }
}
