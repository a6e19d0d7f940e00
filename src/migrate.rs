use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index. Safe to run on an existing database.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT,
            content_html TEXT,
            tags_json TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT,
            status TEXT,
            tags_json TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT,
            description TEXT,
            starts_at INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Exactly one of payload / handle, matching storage_mode.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attachments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            mime TEXT NOT NULL,
            size INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            checksum TEXT NOT NULL,
            storage_mode TEXT NOT NULL,
            payload BLOB,
            handle TEXT,
            CHECK (
                (storage_mode = 'inline' AND payload IS NOT NULL AND handle IS NULL)
                OR (storage_mode = 'external' AND payload IS NULL AND handle IS NOT NULL)
            )
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Enumerated in rowid order; upserts keep their row.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS search_index (
            id TEXT PRIMARY KEY,
            source_type TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            tags_json TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_search_index_source_type ON search_index(source_type)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attachments_created_at ON attachments(created_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}
