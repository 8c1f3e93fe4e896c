//! Portable Text flattening.
//!
//! Produces the same plain text as GROQ's `pt::text()`: one string per
//! text block (its span texts concatenated in order), joined with a blank
//! line. Non-text nodes such as images or embeds still occupy a slot in the
//! join and contribute an empty string.

use crate::models::Block;

/// Separator placed between consecutive blocks.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Flatten a block sequence into plain text.
///
/// Pure function of its input. An empty sequence yields `""`.
pub fn flatten_rich_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(block_text)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

fn block_text(block: &Block) -> String {
    if !block.is_text_block() {
        return String::new();
    }
    block
        .children
        .iter()
        .filter_map(|span| span.text.as_deref())
        .collect()
}
