pub mod import;
pub mod init;
pub mod notes;
pub mod open;
pub mod reindex;
pub mod search;
pub mod show;
pub mod status;
pub mod tree;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::open_existing;
use crate::error::Result;
use crate::models::{CostFlag, SearchField};
use crate::ranker::SortMode;
use crate::settings::{load_settings, Settings};

/// Load settings and open the configured database, which must exist.
pub(crate) fn open_catalog() -> Result<(Settings, Connection)> {
    let settings = load_settings();
    let conn = open_existing(&settings.database())?;
    Ok((settings, conn))
}

#[derive(Parser)]
#[command(
    name = "acx",
    version,
    about = "Browse, annotate, and search a catalog of account codes."
)]
pub struct Cli {
    /// Log index and import activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new, empty account code database and make it current.
    Init {
        /// Database file (default: ~/Documents/acx/account_codes.sqlite)
        #[arg(long)]
        database: Option<String>,
    },
    /// Switch to an existing account code database.
    Open {
        /// Path to the .sqlite file
        path: String,
    },
    /// Replace all account codes with the contents of a CSV export.
    Import {
        /// Path to the account code CSV
        file: String,
    },
    /// Full-text search over descriptions and notes.
    Search {
        /// Words to search for; empty lists every record
        #[arg(default_value = "")]
        term: String,
        /// Fields to search: description, notes, personal (comma separated)
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<SearchField>>,
        /// Search description, notes and personal notes
        #[arg(long, conflicts_with = "fields")]
        all_fields: bool,
        /// Cost categories; a record matches if it has any of them
        #[arg(long, value_delimiter = ',')]
        cost: Vec<CostFlag>,
        /// Result order: relevance or code
        #[arg(long)]
        sort: Option<SortMode>,
        /// Treat the term as a full-text expression (AND, OR, NOT, "phrases")
        #[arg(long)]
        raw: bool,
        /// Show at most this many results
        #[arg(long)]
        limit: Option<usize>,
        /// Print the relevance score next to each result
        #[arg(long)]
        scores: bool,
        /// Color results by hierarchy level
        #[arg(long)]
        color: bool,
    },
    /// Show every field of one account code.
    Show {
        /// Account code, e.g. 12.03.10
        code: String,
    },
    /// Print the account code hierarchy.
    Tree {
        /// Only show this code and its descendants
        #[arg(long)]
        root: Option<String>,
        /// Levels to show below the root
        #[arg(long)]
        depth: Option<i64>,
        /// Only list lines whose "CODE - Description" contains this text
        /// (case-insensitive), flat and in code order
        #[arg(long)]
        filter: Option<String>,
        /// Color lines by hierarchy level
        #[arg(long)]
        color: bool,
    },
    /// Manage personal notes.
    Notes {
        #[command(subcommand)]
        command: NotesCommands,
    },
    /// Rebuild and optimize the full-text index.
    Reindex,
    /// Show the current database and index state.
    Status,
}

#[derive(Subcommand)]
pub enum NotesCommands {
    /// Replace the personal notes of one account code.
    Set {
        /// Account code
        code: String,
        /// Note text; omit with --clear to remove notes
        #[arg(required_unless_present = "clear")]
        text: Option<String>,
        /// Remove the notes instead
        #[arg(long)]
        clear: bool,
    },
    /// Export all personal notes to a .csv or .json file.
    Export {
        /// Output path (.csv or .json)
        file: String,
        /// Author recorded in the file (default: settings author or login name)
        #[arg(long)]
        author: Option<String>,
        /// Date recorded in the file (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Import personal notes from a .csv or .json file.
    Import {
        /// Input path (.csv or .json)
        file: String,
        /// Replace existing notes instead of appending
        #[arg(long)]
        overwrite: bool,
        /// Prefix each note with its author and date
        #[arg(long)]
        annotate: bool,
    },
}
