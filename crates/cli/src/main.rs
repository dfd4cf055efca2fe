//! Folio CLI - Database migrations and admin bootstrap tools.
//!
//! # Usage
//!
//! ```bash
//! # Run admin database migrations
//! folio-cli migrate
//!
//! # Insert any missing built-in roles
//! folio-cli roles seed
//!
//! # Create the first super admin
//! FOLIO_ADMIN_PASSWORD=... folio-cli admin create -e admin@example.com -n "Admin Name" -r super_admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `roles` - Seed and list roles
//! - `admin create` - Create admin accounts

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "folio-cli")]
#[command(author, version, about = "Folio admin CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run admin database migrations
    Migrate,
    /// Manage roles
    Roles {
        #[command(subcommand)]
        action: RolesAction,
    },
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum RolesAction {
    /// Insert built-in roles that do not exist yet
    Seed,
    /// List roles and their permissions
    List,
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

        /// Role label or code (`super_admin`, `admin`, `moderator`, `viewer`)
        #[arg(short, long, default_value = "viewer")]
        role: String,

        /// Initial password
        #[arg(long, env = "FOLIO_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
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

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::admin().await?,
        Commands::Roles { action } => match action {
            RolesAction::Seed => commands::roles::seed().await?,
            RolesAction::List => commands::roles::list().await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::admin::create(email, name, role, password).await?;
            }
        },
    }
    Ok(())
}
