//! # sessiondb-cli
//!
//! Command-line administration for sessiondb session databases.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sessiondb_core::{error::format_error_with_suggestion, Config};
use sessiondb_store::StoreError;

mod commands;

/// Application context containing shared state.
pub struct AppContext {
    pub config: Config,
}

/// sessiondb - inspect and maintain a SQLite session store
#[derive(Parser)]
#[command(name = "sessiondb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user and project config files)
    #[arg(short, long, global = true, env = "SESSIONDB_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Database file, overriding `database.path`
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Session table, overriding `store.table_name`
    #[arg(long, global = true)]
    table: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count stored sessions, including expired ones not yet reclaimed
    Count,
    /// List sessions, soonest expiry first
    List {
        /// Maximum sessions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show a session as JSON
    Show {
        /// Session ID
        id: String,
    },
    /// Write a session from JSON
    Put {
        /// Session JSON, e.g. '{"cookie":{"maxAge":60000},"user":"ada"}'
        json: String,
        /// Session ID (a new UUID when omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Delete a session
    Delete {
        /// Session ID
        id: String,
    },
    /// Delete every session
    Clear {
        /// Confirm deleting all sessions
        #[arg(long)]
        yes: bool,
    },
    /// Reclaim expired sessions now
    Prune,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
    /// Diagnose the database and configuration
    Doctor,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Show where configuration and data are read from
    Path,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error_with_suggestion(&sessiondb_core::Error::from(e)));
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }
    if let Some(table) = cli.table {
        config.store.table_name = table;
    }

    let config = match config.into_validated() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error_with_suggestion(&e));
            return ExitCode::FAILURE;
        }
    };

    let ctx = AppContext { config };

    match run(cli.command, &ctx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(store_err) = e.downcast_ref::<StoreError>() {
                if store_err.is_connection() {
                    tracing::error!(error = %store_err, "Cannot open session database");
                    return ExitCode::from(2);
                }
            }
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, ctx: &AppContext) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => commands::config::handle(action, ctx),
        Commands::Version => {
            println!("sessiondb {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Doctor => commands::doctor::run(ctx).await,
        command => commands::session::handle(command, ctx).await,
    }
}
