//! # Concord - Entity Concordance Server
//!
//! The main binary for the Concord concordance engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based) for organisations and roles
//! - CLI interface for writes, reads, deletes and snapshots
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │             apps/concord (THE BINARY)             │
//! │                                                   │
//! │   ┌─────────────┐          ┌─────────────┐        │
//! │   │    CLI      │          │  HTTP API   │        │
//! │   │   (clap)    │          │   (axum)    │        │
//! │   └──────┬──────┘          └──────┬──────┘        │
//! │          └───────────┬────────────┘               │
//! │                      ▼                            │
//! │              ┌───────────────┐                    │
//! │              │ concord-core  │                    │
//! │              │ (THE ENGINE)  │                    │
//! │              └───────────────┘                    │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! concord server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! concord status
//! concord write -k organisation -f organisations.json
//! concord read -k organisation -u 5c510ad1-2b73-4375-90e1-6ccbc50bd21f
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // CONCORD_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("CONCORD_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "concord=info,concord_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  Concord v{}
  Entity concordance over a property graph
"#,
        env!("CARGO_PKG_VERSION")
    );
}
