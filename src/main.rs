//! # index-sync CLI (`isync`)
//!
//! ## Usage
//!
//! ```bash
//! isync --config ./config/isync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `isync serve` | Start the webhook server |
//! | `isync reindex` | Rebuild the search index from the content store |
//! | `isync normalize <file>` | Print the records a document JSON file produces |

use clap::{Parser, Subcommand};
use index_sync::{config, logging, preview, reindex, server};
use index_sync_core::normalize::NormalizeLimits;
use std::path::PathBuf;

/// index-sync: keeps an Algolia index in sync with a Sanity dataset.
#[derive(Parser)]
#[command(name = "isync", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/isync.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server.
    ///
    /// Listens on `[server].bind` for content-store webhooks and
    /// full-reindex requests.
    Serve,

    /// Rebuild the search index from the content store.
    ///
    /// Fetches every document, normalizes it, and saves all records in one
    /// bulk call. Records of deleted documents are left in place.
    Reindex,

    /// Print the index records a document file would produce.
    ///
    /// The file holds one document or an array of documents as JSON. Uses
    /// the `[normalize]` limits from the config file when it exists.
    Normalize {
        /// Path to the document JSON file.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Works without a config file
    if let Commands::Normalize { ref path } = cli.command {
        let limits = if cli.config.exists() {
            config::load_config(&cli.config)?.normalize
        } else {
            NormalizeLimits::default()
        };
        return preview::run_preview(path, &limits);
    }

    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging, cli.verbose)?;

    match cli.command {
        Commands::Serve => server::run_server(&cfg).await?,
        Commands::Reindex => reindex::run_reindex(&cfg).await?,
        Commands::Normalize { .. } => unreachable!(),
    }

    Ok(())
}
