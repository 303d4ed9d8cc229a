//! # bizdash - Back-Office Server
//!
//! The main binary for the bizdash dashboard back end.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for setup and administration
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                apps/bizdash (THE BINARY)                │
//! │                                                         │
//! │   ┌─────────────┐    ┌─────────────┐   ┌────────────┐   │
//! │   │    CLI      │    │  HTTP API   │   │   Config   │   │
//! │   │   (clap)    │    │   (axum)    │   │   (toml)   │   │
//! │   └──────┬──────┘    └──────┬──────┘   └─────┬──────┘   │
//! │          └──────────────────┼────────────────┘          │
//! │                             ▼                           │
//! │                    ┌────────────────┐                   │
//! │                    │  bizdash-core  │                   │
//! │                    │  (THE LOGIC)   │                   │
//! │                    └────────────────┘                   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Seed role grants and an owner account, then serve
//! bizdash -B redb init --owner-email owner@example.com
//! bizdash -B redb server --port 8080
//!
//! # Administration
//! bizdash -B redb check --email sam@example.com -r products -a create
//! bizdash -B redb export --catalog <id> -o summer.pdf
//! ```

use bizdash::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // BIZDASH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("BIZDASH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bizdash=info,tower_http=debug".into());

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
  ┏┓ ╻╺━┓╺┳┓┏━┓┏━┓╻ ╻
  ┣┻┓┃┏━┛ ┃┃┣━┫┗━┓┣━┫
  ┗━┛╹┗━╸╺┻┛╹ ╹┗━┛╹ ╹

  Back-office server v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
