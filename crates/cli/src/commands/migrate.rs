//! Database migration command.
//!
//! Applies `crates/storefront/migrations/` and creates the table the
//! session store writes to.

use tower_sessions_sqlx_store::PostgresStore;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails to apply.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = super::database_url().map_err(MigrationError::MissingEnvVar)?;

    tracing::info!("Connecting to storefront database...");
    let pool = shopkeep_storefront::db::create_pool(&database_url).await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
