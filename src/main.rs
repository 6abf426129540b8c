mod cli;
mod codes;
mod db;
mod error;
mod fmt;
mod importer;
mod index;
mod models;
mod query;
mod ranker;
mod search;
mod settings;
mod store;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::search::SearchArgs;
use cli::{Cli, Commands, NotesCommands};

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Init { database } => cli::init::run(database),
        Commands::Open { path } => cli::open::run(&path),
        Commands::Import { file } => cli::import::run(&file),
        Commands::Search {
            term,
            fields,
            all_fields,
            cost,
            sort,
            raw,
            limit,
            scores,
            color,
        } => cli::search::run(SearchArgs {
            term,
            fields,
            all_fields,
            cost,
            sort,
            raw,
            limit,
            scores,
            color,
        }),
        Commands::Show { code } => cli::show::run(&code),
        Commands::Tree {
            root,
            depth,
            filter,
            color,
        } => cli::tree::run(root.as_deref(), depth, filter.as_deref(), color),
        Commands::Notes { command } => match command {
            NotesCommands::Set { code, text, clear } => {
                cli::notes::set(&code, text.as_deref(), clear)
            }
            NotesCommands::Export { file, author, date } => cli::notes::export(&file, author, date),
            NotesCommands::Import {
                file,
                overwrite,
                annotate,
            } => cli::notes::import(&file, overwrite, annotate),
        },
        Commands::Reindex => cli::reindex::run(),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
