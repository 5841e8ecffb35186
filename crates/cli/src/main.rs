//! Shopkeep CLI - database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront migrations and create the session table
//! shopkeep-cli migrate
//!
//! # Load categories, brands, tags and products from a fixture
//! shopkeep-cli seed fixtures/catalog.yaml
//! ```
//!
//! Both commands read `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shopkeep-cli")]
#[command(author, version, about = "Shopkeep CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog from a YAML fixture
    Seed {
        /// Path to the fixture file
        file: String,

        /// Only parse and validate the fixture
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Seed { file, dry_run } => commands::seed::catalog(&file, dry_run).await?,
    }
    Ok(())
}
