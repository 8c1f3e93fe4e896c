//! `isync reindex`: run the full-reindex path once from the command line.

use anyhow::Result;

use crate::config::Config;
use crate::dispatch::{SyncDispatcher, SyncEvent};

/// CLI entry point. Rebuilds the index from the content store and prints
/// the summary.
pub async fn run_reindex(config: &Config) -> Result<()> {
    let dispatcher = SyncDispatcher::from_config(config)?;
    let outcome = dispatcher.dispatch(SyncEvent::FullReindexRequested).await?;

    println!("reindex {}", dispatcher.index_name());
    println!("  records written: {}", outcome.records);
    println!("{}", outcome.message);
    Ok(())
}
