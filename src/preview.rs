//! `isync normalize <file>`: show the records a document would produce.
//!
//! Reads a JSON file holding one document (or an array of documents) in the
//! content store's shape and prints the normalized index records. Nothing
//! is fetched or written.

use anyhow::{Context, Result};
use index_sync_core::models::{IndexRecord, SourceDocument};
use index_sync_core::normalize::{estimate_size, normalize_with, NormalizeLimits};
use serde_json::Value;
use std::path::Path;

/// Normalize every document in the file at `path`.
pub fn preview_file(path: &Path, limits: &NormalizeLimits) -> Result<Vec<IndexRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document file: {}", path.display()))?;
    let json: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse document file: {}", path.display()))?;

    let documents: Vec<SourceDocument> = match json {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?,
        single => vec![serde_json::from_value(single)?],
    };

    Ok(documents
        .iter()
        .flat_map(|doc| normalize_with(doc, limits))
        .collect())
}

/// CLI entry point. Prints the id, size and JSON of each record.
pub fn run_preview(path: &Path, limits: &NormalizeLimits) -> Result<()> {
    let records = preview_file(path, limits)?;

    for record in &records {
        println!(
            "--- {} ({} bytes, body {} chars) ---",
            record.object_id,
            estimate_size(record),
            record.body.chars().count()
        );
        println!("{}", serde_json::to_string_pretty(record)?);
    }
    println!("{} record(s)", records.len());
    Ok(())
}
