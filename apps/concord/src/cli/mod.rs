//! # Concord CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show store counters
//! - `write` - Write organisations or roles from a JSON file
//! - `read` - Print one concept as JSON
//! - `delete` - Delete one concept
//! - `count` - Count concepts of a kind
//! - `export` - Write a snapshot of the graph to a file
//! - `compact` - Reclaim free space in a redb database
//! - `init` - Initialize a new database

mod commands;

use clap::{Parser, Subcommand};
use concord::config::{Backend, Config};
use concord_core::{ConceptKind, ConcordError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Concord - entity concordance over a property graph
///
/// Writes organisations and roles as canonical graph nodes, absorbing every
/// alias a record names through its UPP identifiers.
#[derive(Parser, Debug)]
#[command(name = "concord")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the graph database (overrides [storage] database)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides [storage] backend)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides [server] host)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show store status
    Status,

    /// Write records from a JSON file (one object or an array)
    Write {
        /// Concept kind (organisation, role)
        #[arg(short, long)]
        kind: ConceptKind,

        /// Path to the input file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Read one concept
    Read {
        /// Concept kind (organisation, role)
        #[arg(short, long)]
        kind: ConceptKind,

        /// Concept uuid
        #[arg(short, long)]
        uuid: String,
    },

    /// Delete one concept
    Delete {
        /// Concept kind (organisation, role)
        #[arg(short, long)]
        kind: ConceptKind,

        /// Concept uuid
        #[arg(short, long)]
        uuid: String,
    },

    /// Count concepts of a kind
    Count {
        /// Concept kind (organisation, role)
        #[arg(short, long)]
        kind: ConceptKind,
    },

    /// Export a snapshot of the graph
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Reclaim free space in a redb database
    Compact,

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ConcordError> {
    let mut config =
        Config::load(cli.config.as_deref())?.with_overrides(cli.database, cli.backend);
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Status) | None => cmd_status(&config, json_mode),
        Some(Commands::Write { kind, file }) => cmd_write(&config, json_mode, kind, &file),
        Some(Commands::Read { kind, uuid }) => cmd_read(&config, kind, &uuid),
        Some(Commands::Delete { kind, uuid }) => cmd_delete(&config, json_mode, kind, &uuid),
        Some(Commands::Count { kind }) => cmd_count(&config, json_mode, kind),
        Some(Commands::Export { output }) => cmd_export(&config, &output),
        Some(Commands::Compact) => cmd_compact(&config, json_mode),
        Some(Commands::Init { force }) => cmd_init(&config, force),
    }
}
