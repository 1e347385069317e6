//! Database module
//!
//! Entity models, the incident repository and the SQLite file that backs
//! [`crate::storage::SqliteStore`]. The file holds a single `kv_store`
//! table: one row per storage key, the JSON text of the collection as value.

pub mod models;
pub mod repository;
pub mod schema;

pub use models::*;
pub use repository::{IncidentQuery, IncidentRepository};
pub use schema::{initialize_database, schema_version};

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// WAL journal and a busy timeout so a second pool on the same file waits
/// instead of failing.
fn connect_options(db_path: &Path) -> std::result::Result<SqliteConnectOptions, sqlx::Error> {
    SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display())).map(
        |opts| {
            opts.create_if_missing(true)
                .busy_timeout(Duration::from_secs(5))
                .journal_mode(SqliteJournalMode::Wal)
        },
    )
}

/// Open the database file at `db_path`, creating it and its parent
/// directory when missing, and bring `kv_store` up to date before the
/// returned pool serves any key.
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::info!("Creating database connection pool at: {:?}", db_path);

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let migration_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options(db_path)?)
        .await?;

    initialize_database(&migration_pool).await?;
    migration_pool.close().await;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options(db_path)?)
        .await?;

    tracing::info!("Database pool created successfully");

    Ok(pool)
}
