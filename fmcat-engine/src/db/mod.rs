//! Persistence for libraries and session state
//!
//! The pipeline only needs keyed get/put over JSON values with
//! last-write-wins semantics; see [`CatalogStore`].

pub mod store;

pub use store::{load, save, CatalogStore, MemoryStore, SqliteStore};

use fmcat_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

pub const MECHANISM_LIBRARY_KEY: &str = "mechanism_library";
pub const CAUSE_LIBRARY_KEY: &str = "cause_library";
pub const COMPONENT_LIBRARY_KEY: &str = "component_library";
pub const SESSION_STATE_KEY: &str = "session_state";

/// Initialize database connection pool
///
/// Creates the file (and parent directory) if missing.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the key/value state table if it doesn't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (catalog_state)");

    Ok(())
}
