//! SQLite-backed [`StoreBackend`] implementation.
//!
//! Tags are stored as JSON arrays, timestamps as Unix seconds. Attachment
//! rows carry either a payload blob or a handle path, enforced by a CHECK
//! constraint in the schema.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use dash_store_core::models::AttachmentSummary;
use dash_store_core::{
    AttachmentRecord, AttachmentStorage, Event, FileHandle, Note, SearchDocument, SourceType,
    StorageMode, StoreBackend, Task,
};

/// SQLite implementation of the [`StoreBackend`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn tags_to_json(tags: &Option<Vec<String>>) -> Result<Option<String>> {
    tags.as_ref()
        .map(|t| serde_json::to_string(t).context("Failed to encode tags"))
        .transpose()
}

fn tags_from_json(raw: Option<String>) -> Result<Option<Vec<String>>> {
    raw.map(|s| serde_json::from_str(&s).context("Malformed tags_json"))
        .transpose()
}

fn ts_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

fn row_to_attachment(row: &SqliteRow) -> Result<AttachmentRecord> {
    let id: i64 = row.get("id");
    let mode: String = row.get("storage_mode");
    let payload: Option<Vec<u8>> = row.get("payload");
    let handle: Option<String> = row.get("handle");

    let storage = match (StorageMode::parse(&mode), payload, handle) {
        (Some(StorageMode::Inline), Some(payload), None) => AttachmentStorage::Inline { payload },
        (Some(StorageMode::ExternalHandle), None, Some(handle)) => AttachmentStorage::ExternalHandle {
            handle: FileHandle::new(handle),
        },
        _ => bail!("attachment {} has inconsistent storage columns (mode '{}')", id, mode),
    };

    Ok(AttachmentRecord {
        id,
        name: row.get("name"),
        mime: row.get("mime"),
        size: row.get::<i64, _>("size") as u64,
        created_at: ts_to_datetime(row.get("created_at")),
        checksum: row.get("checksum"),
        storage,
    })
}

fn row_to_search_document(row: &SqliteRow) -> Result<SearchDocument> {
    let id: String = row.get("id");
    let source_type: String = row.get("source_type");
    let tags_json: String = row.get("tags_json");

    Ok(SearchDocument {
        source_type: SourceType::parse(&source_type)
            .with_context(|| format!("Unknown source type '{}' for {}", source_type, id))?,
        title: row.get("title"),
        content: row.get("content"),
        tags: serde_json::from_str(&tags_json)
            .with_context(|| format!("Malformed tags_json for {}", id))?,
        id,
    })
}

async fn insert_search_document<'e, E>(executor: E, doc: &SearchDocument) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO search_index (id, source_type, title, content, tags_json)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            source_type = excluded.source_type,
            title = excluded.title,
            content = excluded.content,
            tags_json = excluded.tags_json
        "#,
    )
    .bind(&doc.id)
    .bind(doc.source_type.key())
    .bind(&doc.title)
    .bind(&doc.content)
    .bind(serde_json::to_string(&doc.tags)?)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl StoreBackend for SqliteStore {
    async fn insert_note(&self, note: &Note) -> Result<i64> {
        let result = sqlx::query("INSERT INTO notes (title, content_html, tags_json) VALUES (?, ?, ?)")
            .bind(&note.title)
            .bind(&note.content_html)
            .bind(tags_to_json(&note.tags)?)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn insert_task(&self, task: &Task) -> Result<i64> {
        let result = sqlx::query("INSERT INTO tasks (title, status, tags_json) VALUES (?, ?, ?)")
            .bind(&task.title)
            .bind(&task.status)
            .bind(tags_to_json(&task.tags)?)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn insert_event(&self, event: &Event) -> Result<i64> {
        let result = sqlx::query("INSERT INTO events (title, description, starts_at) VALUES (?, ?, ?)")
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.starts_at.map(|t| t.timestamp()))
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_notes(&self) -> Result<Vec<Note>> {
        let rows = sqlx::query("SELECT id, title, content_html, tags_json FROM notes ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(Note {
                    id: row.get("id"),
                    title: row.get("title"),
                    content_html: row.get("content_html"),
                    tags: tags_from_json(row.get("tags_json"))?,
                })
            })
            .collect()
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let rows = sqlx::query("SELECT id, title, status, tags_json FROM tasks ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(Task {
                    id: row.get("id"),
                    title: row.get("title"),
                    status: row.get("status"),
                    tags: tags_from_json(row.get("tags_json"))?,
                })
            })
            .collect()
    }

    async fn list_events(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query("SELECT id, title, description, starts_at FROM events ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| Event {
                id: row.get("id"),
                title: row.get("title"),
                description: row.get("description"),
                starts_at: row.get::<Option<i64>, _>("starts_at").map(ts_to_datetime),
            })
            .collect())
    }

    async fn add_attachment(&self, record: &AttachmentRecord) -> Result<i64> {
        let (payload, handle) = match &record.storage {
            AttachmentStorage::Inline { payload } => (Some(payload.as_slice()), None),
            AttachmentStorage::ExternalHandle { handle } => (None, Some(handle.as_str())),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO attachments (name, mime, size, created_at, checksum, storage_mode, payload, handle)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.name)
        .bind(&record.mime)
        .bind(record.size as i64)
        .bind(record.created_at.timestamp())
        .bind(&record.checksum)
        .bind(record.storage.mode().as_str())
        .bind(payload)
        .bind(handle)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_attachment(&self, id: i64) -> Result<Option<AttachmentRecord>> {
        let row = sqlx::query(
            "SELECT id, name, mime, size, created_at, checksum, storage_mode, payload, handle FROM attachments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_attachment).transpose()
    }

    async fn list_attachments(&self) -> Result<Vec<AttachmentSummary>> {
        let rows = sqlx::query(
            "SELECT id, name, mime, size, created_at, storage_mode FROM attachments ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let mode: String = row.get("storage_mode");
                Ok(AttachmentSummary {
                    id: row.get("id"),
                    name: row.get("name"),
                    mime: row.get("mime"),
                    size: row.get::<i64, _>("size") as u64,
                    created_at: ts_to_datetime(row.get("created_at")),
                    mode: StorageMode::parse(&mode)
                        .with_context(|| format!("Unknown storage mode '{}'", mode))?,
                })
            })
            .collect()
    }

    async fn put_search_document(&self, doc: &SearchDocument) -> Result<()> {
        insert_search_document(&self.pool, doc).await
    }

    async fn list_search_documents(&self) -> Result<Vec<SearchDocument>> {
        let rows = sqlx::query(
            "SELECT id, source_type, title, content, tags_json FROM search_index ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_search_document).collect()
    }

    async fn replace_search_documents(&self, docs: &[SearchDocument]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM search_index").execute(&mut *tx).await?;
        for doc in docs {
            insert_search_document(&mut *tx, doc).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
