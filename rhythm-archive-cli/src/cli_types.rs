//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rhythm-archive")]
#[command(about = "Ingest and browse a rhythm-game song catalog", long_about = None)]
pub(crate) struct Cli {
    /// Path to the archive database (overrides settings.toml)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Ingest catalog documents (JSON or YAML) into the archive
    Ingest {
        /// Document files or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Walk each document and report what would change, then roll back
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Label recorded in the ingestion log (defaults to the file path)
        #[arg(long)]
        source: Option<String>,

        /// Abort a document's ingestion after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Check documents for structural problems without touching the archive
    Validate {
        /// Document files or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Show a game with all of its songs, versions and charts
    Show {
        /// Exact game name
        game: String,

        /// Print the graph as JSON
        #[arg(long)]
        json: bool,
    },

    /// List games in the archive
    Games,

    /// Show archive statistics and recent ingestion runs
    Stats {
        /// Number of recent ingestion runs to show
        #[arg(short, long, default_value_t = 5)]
        limit: u32,
    },

    /// Delete the archive database
    Reset {
        /// Actually delete (without this flag, only shows what would happen)
        #[arg(long)]
        confirm: bool,
    },

    /// Inspect settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show resolved settings and where they come from
    Show,

    /// Print the settings file path
    Path,
}
