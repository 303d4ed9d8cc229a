//! # bizdash CLI Module
//!
//! This module implements the CLI interface for bizdash.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Seed default role grants (and optionally an owner account)
//! - `grant` - Set one role's grant for one resource
//! - `check` - Ask a permission question for a user
//! - `routes` - Print the route-permission table
//! - `export` - Write a saved catalog to a PDF or CSV file

mod commands;

use bizdash_core::DashError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// bizdash - back-office server
///
/// Role-based access to the dashboard's tables, plus the catalog builder.
#[derive(Parser, Debug)]
#[command(name = "bizdash")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the database
    #[arg(short = 'D', long, global = true, default_value = "bizdash.redb")]
    pub database: PathBuf,

    /// Storage backend: "redb" (ACID database) or "memory" (volatile)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Configuration file (default: ./bizdash.toml if present)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

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
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Seed the default grants of every role
    Init {
        /// Also create an owner account with this email
        #[arg(long)]
        owner_email: Option<String>,

        /// Overwrite grants that were already edited
        #[arg(short, long)]
        force: bool,
    },

    /// Set one role's grant for one resource (flags not given are denied)
    Grant {
        /// Role (owner, catalog_builder, sales_manager, business_manager, it_admin)
        #[arg(short, long)]
        role: String,

        /// Resource name (e.g. products)
        #[arg(short = 'R', long)]
        resource: String,

        #[arg(long)]
        view: bool,

        #[arg(long)]
        create: bool,

        #[arg(long)]
        edit: bool,

        #[arg(long)]
        delete: bool,
    },

    /// Check whether a user may perform an action
    Check {
        /// The user's email
        #[arg(short, long)]
        email: String,

        /// Resource name
        #[arg(short, long)]
        resource: String,

        /// Action (view, create, edit, delete)
        #[arg(short, long)]
        action: String,
    },

    /// Print the route-permission table
    Routes,

    /// Export a saved catalog
    Export {
        /// Catalog id
        #[arg(short, long)]
        catalog: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (pdf, csv); defaults to the output file's extension
        #[arg(short = 't', long)]
        format: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), DashError> {
    let ctx = Context {
        database: cli.database,
        backend: cli.backend,
        config: cli.config,
        json_mode: cli.json_mode,
        verbose: cli.verbose,
    };

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&ctx, host, port).await,
        Some(Commands::Init { owner_email, force }) => {
            cmd_init(&ctx, owner_email.as_deref(), force)
        }
        Some(Commands::Grant {
            role,
            resource,
            view,
            create,
            edit,
            delete,
        }) => cmd_grant(&ctx, &role, &resource, [view, create, edit, delete]),
        Some(Commands::Check {
            email,
            resource,
            action,
        }) => cmd_check(&ctx, &email, &resource, &action),
        Some(Commands::Routes) => cmd_routes(&ctx),
        Some(Commands::Export {
            catalog,
            output,
            format,
        }) => cmd_export(&ctx, &catalog, &output, format.as_deref()),
        None => {
            // No subcommand - show the route table by default
            cmd_routes(&ctx)
        }
    }
}
