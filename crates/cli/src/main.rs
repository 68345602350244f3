//! Pawfect Supply CLI - database migrations and store management.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront database migrations
//! pawfect migrate
//!
//! # Load the bundled demo catalog (or your own JSON file)
//! pawfect seed
//! pawfect seed --file catalog.json
//!
//! # Create an admin account
//! pawfect admin create -e admin@example.com -n "Admin Name" -p '<password>'
//!
//! # Remove expired signup codes and reset tokens
//! pawfect tokens purge
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pawfect_core::UserRole;

mod commands;

#[derive(Parser)]
#[command(name = "pawfect")]
#[command(author, version, about = "Pawfect Supply CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog with categories and products
    Seed {
        /// JSON catalog to load instead of the bundled one
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Verification token maintenance
    Tokens {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Initial password
        #[arg(short, long, env = "PAWFECT_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Give an existing account the admin role
    Promote {
        #[arg(short, long)]
        email: String,
    },
    /// Return an admin account to the shopper role
    Demote {
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Delete expired tokens
    Purge,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::catalog(file.as_deref()).await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => commands::admin::create_user(&email, &name, &password).await?,
            AdminAction::Promote { email } => {
                commands::admin::set_role(&email, UserRole::Admin).await?;
            }
            AdminAction::Demote { email } => {
                commands::admin::set_role(&email, UserRole::User).await?;
            }
        },
        Commands::Tokens { action } => match action {
            TokenAction::Purge => commands::tokens::purge().await?,
        },
    }
    Ok(())
}
