//! Database statistics.
//!
//! A quick summary of what is stored: record counts, attachment storage
//! breakdown, and whether the persisted search index covers every record.
//! Used by `dash stats`.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::migrate;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;

    let notes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes")
        .fetch_one(&pool)
        .await?;
    let tasks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
        .fetch_one(&pool)
        .await?;
    let events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(&pool)
        .await?;
    let indexed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search_index")
        .fetch_one(&pool)
        .await?;

    let storage_rows = sqlx::query(
        r#"
        SELECT storage_mode, COUNT(*) AS n, COALESCE(SUM(size), 0) AS bytes
        FROM attachments
        GROUP BY storage_mode
        ORDER BY storage_mode
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    let records = notes + tasks + events;

    println!("Dash Store — Database Stats");
    println!("===========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Notes:       {}", notes);
    println!("  Tasks:       {}", tasks);
    println!("  Events:      {}", events);
    println!(
        "  Indexed:     {} / {}{}",
        indexed,
        records,
        if indexed == records {
            ""
        } else {
            "   (run `dash reindex`)"
        }
    );

    if !storage_rows.is_empty() {
        println!();
        println!("  Attachments:");
        println!("  {:<10} {:>6} {:>12}", "STORAGE", "COUNT", "SIZE");
        println!("  {}", "-".repeat(30));
        for row in &storage_rows {
            let mode: String = row.get("storage_mode");
            let n: i64 = row.get("n");
            let bytes: i64 = row.get("bytes");
            println!("  {:<10} {:>6} {:>12}", mode, n, format_bytes(bytes as u64));
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.0 MB");
    }
}
