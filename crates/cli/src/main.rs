//! Gallery Flow CLI - database migrations and maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! gf-cli migrate
//!
//! # Remove uploads left without images
//! gf-cli cleanup
//!
//! # Preview what cleanup would remove
//! gf-cli cleanup --dry-run
//! ```
//!
//! # Environment Variables
//!
//! - `GALLERY_DATABASE_URL` - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gf-cli")]
#[command(author, version, about = "Gallery Flow CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Remove gallery uploads that have no images
    Cleanup {
        /// Count the affected uploads without deleting them
        #[arg(long)]
        dry_run: bool,
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

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Cleanup { dry_run } => {
            commands::cleanup::run(dry_run).await?;
        }
    }
    Ok(())
}
