//! Schema migrations for the key/value table
//!
//! Each migration is applied once, inside a transaction, and recorded in
//! the `migrations` table.

use crate::error::Result;
use sqlx::sqlite::SqlitePool;

const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("migrations/001_kv_store.sql"))];

/// Highest applied migration, 0 on a fresh database
pub async fn schema_version(pool: &SqlitePool) -> Result<i64> {
    let version: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM migrations")
        .fetch_one(pool)
        .await?;
    Ok(version)
}

/// Create the `migrations` bookkeeping table and apply pending migrations
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current = schema_version(pool).await?;
    tracing::info!("Key/value schema at version {}", current);

    for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        let mut tx = pool.begin().await?;

        for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO migrations (version) VALUES (?)")
            .bind(version)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!("Applied key/value migration {}", version);
    }

    Ok(())
}
