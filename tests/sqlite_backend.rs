use std::sync::Arc;

use dash_store::app::App;
use dash_store::config::{AttachmentsConfig, Config, DbConfig, SearchConfig};
use dash_store::sqlite_store::SqliteStore;
use dash_store::{db, migrate};
use dash_store_core::platform::MemoryFile;
use dash_store_core::{
    AttachmentRecord, AttachmentStorage, ExportOutcome, Note, SearchIndex, SearchOptions,
    StorageMode, StoreBackend, Task,
};
use tempfile::TempDir;

fn test_config(tmp: &TempDir, external: bool) -> Config {
    Config {
        db: DbConfig {
            path: tmp.path().join("data/dash.sqlite"),
        },
        attachments: AttachmentsConfig {
            external_dir: external.then(|| tmp.path().join("files")),
            downloads_dir: tmp.path().join("downloads"),
        },
        search: SearchConfig::default(),
    }
}

async fn open_store(config: &Config) -> Arc<SqliteStore> {
    let pool = db::connect(config).await.unwrap();
    migrate::apply(&pool).await.unwrap();
    Arc::new(SqliteStore::new(pool))
}

#[tokio::test]
async fn test_records_round_trip_with_optional_fields() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&test_config(&tmp, false)).await;

    let id = store
        .insert_note(&Note {
            id: 0,
            title: Some("Groceries".into()),
            content_html: None,
            tags: Some(vec!["home".into(), "weekly".into()]),
        })
        .await
        .unwrap();
    store.insert_task(&Task::default()).await.unwrap();

    let notes = store.list_notes().await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, id);
    assert_eq!(notes[0].content_html, None);
    assert_eq!(notes[0].tags.as_deref(), Some(&["home".to_string(), "weekly".to_string()][..]));

    let tasks = store.list_tasks().await.unwrap();
    assert_eq!(tasks[0].title, None);
    assert_eq!(tasks[0].tags, None);
}

#[tokio::test]
async fn test_search_index_upsert_keeps_position() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, false);
    let app = App::open(&config).await.unwrap();

    for title in ["first", "second"] {
        app.records
            .add_note(Note {
                title: Some(title.into()),
                ..Default::default()
            })
            .await
            .unwrap();
    }
    let docs = app.store().list_search_documents().await.unwrap();
    let mut renamed = docs[0].clone();
    renamed.title = "first, renamed".into();
    app.store().put_search_document(&renamed).await.unwrap();

    let ids: Vec<String> = app
        .store()
        .list_search_documents()
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, vec!["note-1", "note-2"]);
    app.close().await;
}

#[tokio::test]
async fn test_incremental_index_matches_rebuild() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, false);
    let app = App::open(&config).await.unwrap();

    app.records
        .add_note(Note {
            title: Some("Shopping list".into()),
            content_html: Some("<ul><li>milk</li><li>eggs</li></ul>".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    app.records
        .add_task(Task {
            title: Some("Pay rent".into()),
            status: Some("pending".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let incremental = app.store().list_search_documents().await.unwrap();
    assert_eq!(incremental[0].content, "milk eggs");

    assert_eq!(app.index.build().await.unwrap(), 2);
    let rebuilt = app.store().list_search_documents().await.unwrap();
    assert_eq!(incremental, rebuilt);
    app.close().await;
}

#[tokio::test]
async fn test_cold_engine_loads_persisted_index() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, false);

    let app = App::open(&config).await.unwrap();
    app.records
        .add_note(Note {
            title: Some("Dentist appointment".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    app.close().await;

    let store = open_store(&config).await;
    let index = SearchIndex::new(store.clone(), SearchOptions::default());
    assert!(!index.is_warm());
    let hits = index.search_all("dentist").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "note-1");
    store.pool().close().await;
}

#[tokio::test]
async fn test_attachment_storage_modes_round_trip() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, true);
    let app = App::open(&config).await.unwrap();

    let small = app
        .attachments
        .save_attachment(&MemoryFile::new("a.txt", "text/plain", b"tiny".to_vec()))
        .await
        .unwrap();
    let large = app
        .attachments
        .save_attachment(&MemoryFile::new(
            "b.bin",
            "application/octet-stream",
            vec![3u8; 5 * 1024 * 1024 + 1],
        ))
        .await
        .unwrap();

    let summaries = app.attachments.list().await.unwrap();
    assert_eq!(summaries[0].mode, StorageMode::Inline);
    assert_eq!(summaries[1].mode, StorageMode::ExternalHandle);

    let record = app.store().get_attachment(large).await.unwrap().unwrap();
    assert!(record.checksum.starts_with("sha256:"));
    assert!(matches!(record.storage, AttachmentStorage::ExternalHandle { .. }));

    assert_eq!(
        app.attachments.export_attachment(small).await.unwrap(),
        ExportOutcome::Downloaded
    );
    assert_eq!(
        std::fs::read(tmp.path().join("downloads/a.txt")).unwrap(),
        b"tiny"
    );
    assert_eq!(
        app.attachments.export_attachment(large).await.unwrap(),
        ExportOutcome::DeliveredViaHandle
    );
    assert_eq!(
        app.attachments.export_attachment(99).await.unwrap(),
        ExportOutcome::NotFound
    );
    app.close().await;
}

#[tokio::test]
async fn test_schema_rejects_mixed_storage() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&test_config(&tmp, false)).await;

    let result = sqlx::query(
        "INSERT INTO attachments (name, mime, size, created_at, checksum, storage_mode, payload, handle) \
         VALUES ('x', 'text/plain', 1, 0, '', 'inline', X'00', '/tmp/x')",
    )
    .execute(store.pool())
    .await;
    assert!(result.is_err());

    let ok = store
        .add_attachment(&AttachmentRecord {
            id: 0,
            name: "y".into(),
            mime: "text/plain".into(),
            size: 1,
            created_at: chrono::Utc::now(),
            checksum: String::new(),
            storage: AttachmentStorage::Inline { payload: vec![0] },
        })
        .await;
    assert!(ok.is_ok());
}
