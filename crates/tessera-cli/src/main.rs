//! Tessera CLI
//!
//! Operator interface for a Tessera SQLite store

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

#[derive(Debug, Parser)]
#[command(name = "tessera")]
#[command(about = "Tessera - inspect and manage a session store", long_about = None)]
struct Cli {
    /// SQLite database path (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (defaults to ./tessera.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the store and apply pending migrations
    Init,
    /// List stored models with their row counts
    Models,
    /// Print every stored row of a model as JSON lines
    Dump(commands::dump::DumpArgs),
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    tessera_core::logging_facility::init(config.log_profile);
    tracing::debug!(db_path = %config.db_path.display(), "configuration resolved");

    match cli.command {
        Commands::Init => commands::init::execute(&config),
        Commands::Models => commands::models::execute(&config),
        Commands::Dump(args) => commands::dump::execute(&config, args),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
