mod models;
mod seeders;

pub use models::*;
pub use seeders::seed_default_categories;

use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("storefront.db");

    info!("Initializing database at {}", db_path.display());

    // Pragmas are per connection, so they go on the connect options
    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Open a private in-memory database with the full schema applied.
///
/// Every pooled connection to `sqlite::memory:` gets its own database, so the
/// pool is pinned to a single connection that never expires.
pub async fn init_memory() -> Result<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true))
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Users and sessions
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    // Migration 002: Categories and products
    let has_products_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='products'",
    )
    .fetch_optional(pool)
    .await?;
    if has_products_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/002_catalog.sql")).await?;
    }

    // Migration 003: search_text column for catalogs created without it
    let has_search_text: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM pragma_table_info('products') WHERE name = 'search_text'",
    )
    .fetch_optional(pool)
    .await?;
    if has_search_text.is_none() {
        execute_sql(pool, include_str!("../../migrations/003_product_search_text.sql")).await?;
        let rows = Product::rebuild_search_text(pool).await?;
        info!(products = rows, "Backfilled product search text");
    }

    info!("Migrations completed");
    Ok(())
}
