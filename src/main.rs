//! # Concept Mapper CLI (`cmap`)
//!
//! ## Usage
//!
//! ```bash
//! cmap --config ./config/cmap.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cmap init` | Create the SQLite database and run schema migrations |
//! | `cmap extract` | Extract page text from the PDFs in `[paths] pdf_dir` |
//! | `cmap chunk` | Window extracted pages into curriculum-tagged fragments |
//! | `cmap embed` | Load fragments into the index and embed pending ones |
//! | `cmap search "<query>"` | Print the concept labels nearest to a query |
//! | `cmap map "<transcript>"` | Run the full mapping and print the JSON response |
//! | `cmap serve` | Start the HTTP server |
//!
//! Logs go to stderr; set `RUST_LOG` (default `info`) to change verbosity.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use concept_mapper::{config, embed_cmd, extract, ingest, migrate, search, server};

/// Concept Mapper CLI: maps lecture transcripts onto NCERT textbook concepts.
#[derive(Parser)]
#[command(
    name = "cmap",
    about = "Concept Mapper: maps lecture transcripts onto NCERT textbook concepts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cmap.toml`. See `config/cmap.example.toml`.
    #[arg(long, global = true, default_value = "./config/cmap.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Extract page text from every PDF in `[paths] pdf_dir`.
    Extract,

    /// Split extracted pages into overlapping, curriculum-tagged fragments.
    ///
    /// Writes `<doc>_chunks.json` per document into `[paths] chunks_dir`.
    Chunk,

    /// Load chunk files into the index and embed fragments without an
    /// up-to-date vector.
    Embed {
        /// Delete all stored vectors first and re-embed everything.
        #[arg(long)]
        rebuild: bool,

        /// Override `[embedding] batch_size`.
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Print the concept labels nearest to a query.
    Search {
        query: String,

        /// Number of fragments to retrieve (defaults to `[retrieval] top_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Map a transcript to concepts, title and summary (JSON on stdout).
    Map {
        transcript: String,

        /// Include display timestamps for the first concepts.
        #[arg(long)]
        timestamps: bool,
    },

    /// Start the HTTP server on `[server] bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Extract => {
            extract::run_extract(&cfg)?;
        }
        Commands::Chunk => {
            ingest::run_chunk(&cfg)?;
        }
        Commands::Embed {
            rebuild,
            batch_size,
        } => {
            embed_cmd::run_embed(&cfg, rebuild, batch_size).await?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit).await?;
        }
        Commands::Map {
            transcript,
            timestamps,
        } => {
            search::run_map(&cfg, &transcript, timestamps).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
