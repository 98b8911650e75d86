//! Chairbook CLI - Database migrations, seeding and maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! chairbook migrate
//!
//! # Load shops, staff and services from a YAML file
//! chairbook seed crates/cli/seed/demo.yaml
//!
//! # Create a user or change their role
//! chairbook user create -e sam@example.com --first-name Sam -r barber
//! chairbook user set-role -e sam@example.com -r admin
//!
//! # Move `EmployeeId:` markers out of appointment notes
//! chairbook cleanup legacy-notes --dry-run
//! ```
//!
//! # Environment Variables
//!
//! - `CHAIRBOOK_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "chairbook")]
#[command(author, version, about = "Chairbook CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed shops, staff and services from a YAML file
    Seed {
        /// Path to the seed file
        file: PathBuf,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Data maintenance
    Cleanup {
        #[command(subcommand)]
        target: CleanupTarget,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user without going through the identity provider
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(long)]
        first_name: Option<String>,

        /// Last name
        #[arg(long)]
        last_name: Option<String>,

        /// Role (`customer`, `employee`, `barber`, `admin`)
        #[arg(short, long, default_value = "customer")]
        role: String,

        /// Subject id at the identity provider, if already known
        #[arg(long)]
        external_id: Option<String>,
    },
    /// Change a user's role
    SetRole {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// New role (`customer`, `employee`, `barber`, `admin`)
        #[arg(short, long)]
        role: String,
    },
}

#[derive(Subcommand)]
enum CleanupTarget {
    /// Move `EmployeeId:` markers from notes into the employee column
    LegacyNotes {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                first_name,
                last_name,
                role,
                external_id,
            } => {
                commands::user::create(
                    &email,
                    first_name.as_deref(),
                    last_name.as_deref(),
                    &role,
                    external_id.as_deref(),
                )
                .await?;
            }
            UserAction::SetRole { email, role } => {
                commands::user::set_role(&email, &role).await?;
            }
        },
        Commands::Cleanup { target } => match target {
            CleanupTarget::LegacyNotes { dry_run } => {
                commands::cleanup::legacy_notes(dry_run).await?;
            }
        },
    }
    Ok(())
}
