//! Record store abstraction for Dash Store.
//!
//! The [`StoreBackend`] trait defines every storage operation the core
//! needs, enabling pluggable backends (SQLite, in-memory). [`RecordStore`]
//! wraps a backend and publishes a [`SourceRecord`] to each registered
//! [`CreationObserver`] after every note, task, or event insert; this is
//! how the search index learns about new records without the creator
//! knowing about indexing.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::models::{AttachmentRecord, AttachmentSummary, Event, Note, SearchDocument, SourceRecord, Task};

/// Abstract storage backend for Dash Store.
///
/// All operations are async (via `async-trait`). In-memory
/// implementations return immediately-ready futures.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_note`](StoreBackend::insert_note) / `insert_task` / `insert_event` | Add a record, returning its new id |
/// | [`list_notes`](StoreBackend::list_notes) / `list_tasks` / `list_events` | Enumerate a collection |
/// | [`add_attachment`](StoreBackend::add_attachment) | Add an attachment, returning its new id |
/// | [`get_attachment`](StoreBackend::get_attachment) | Fetch one attachment with its payload |
/// | [`list_attachments`](StoreBackend::list_attachments) | Attachment metadata without payloads |
/// | [`put_search_document`](StoreBackend::put_search_document) | Upsert one index entry by id |
/// | [`list_search_documents`](StoreBackend::list_search_documents) | Enumerate the persisted index |
/// | [`replace_search_documents`](StoreBackend::replace_search_documents) | Clear then bulk-insert the index |
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Insert a note. The `id` field of the input is ignored.
    async fn insert_note(&self, note: &Note) -> Result<i64>;

    /// Insert a task. The `id` field of the input is ignored.
    async fn insert_task(&self, task: &Task) -> Result<i64>;

    /// Insert an event. The `id` field of the input is ignored.
    async fn insert_event(&self, event: &Event) -> Result<i64>;

    async fn list_notes(&self) -> Result<Vec<Note>>;

    async fn list_tasks(&self) -> Result<Vec<Task>>;

    async fn list_events(&self) -> Result<Vec<Event>>;

    /// Insert an attachment. The `id` field of the input is ignored.
    async fn add_attachment(&self, record: &AttachmentRecord) -> Result<i64>;

    async fn get_attachment(&self, id: i64) -> Result<Option<AttachmentRecord>>;

    async fn list_attachments(&self) -> Result<Vec<AttachmentSummary>>;

    /// Insert or replace the index entry with the same `id`. A replaced
    /// entry keeps its position in [`list_search_documents`](StoreBackend::list_search_documents).
    async fn put_search_document(&self, doc: &SearchDocument) -> Result<()>;

    /// All index entries in insertion order.
    async fn list_search_documents(&self) -> Result<Vec<SearchDocument>>;

    /// Delete every index entry, then insert `docs` in order. Callers never
    /// observe a partially replaced index.
    async fn replace_search_documents(&self, docs: &[SearchDocument]) -> Result<()>;
}

/// Subscriber to record creation events.
///
/// Delivery is at-least-once, so implementations must be idempotent.
#[async_trait]
pub trait CreationObserver: Send + Sync {
    async fn record_created(&self, record: &SourceRecord) -> Result<()>;
}

/// Record store facade that publishes creation events.
///
/// Content records should be added through this type rather than the raw
/// backend, otherwise observers never hear about them.
pub struct RecordStore {
    backend: Arc<dyn StoreBackend>,
    observers: RwLock<Vec<Arc<dyn CreationObserver>>>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    /// Register an observer for note, task, and event creation.
    pub fn on_created(&self, observer: Arc<dyn CreationObserver>) {
        self.observers.write().unwrap().push(observer);
    }

    /// Insert a note and publish it. Returns the note with its assigned id.
    pub async fn add_note(&self, mut note: Note) -> Result<Note> {
        note.id = self.backend.insert_note(&note).await?;
        self.publish(SourceRecord::Note(note.clone())).await?;
        Ok(note)
    }

    /// Insert a task and publish it. Returns the task with its assigned id.
    pub async fn add_task(&self, mut task: Task) -> Result<Task> {
        task.id = self.backend.insert_task(&task).await?;
        self.publish(SourceRecord::Task(task.clone())).await?;
        Ok(task)
    }

    /// Insert an event and publish it. Returns the event with its assigned id.
    pub async fn add_event(&self, mut event: Event) -> Result<Event> {
        event.id = self.backend.insert_event(&event).await?;
        self.publish(SourceRecord::Event(event.clone())).await?;
        Ok(event)
    }

    async fn publish(&self, record: SourceRecord) -> Result<()> {
        // Clone the list so no lock is held across an await.
        let observers: Vec<Arc<dyn CreationObserver>> = self.observers.read().unwrap().clone();
        debug!(
            source_type = %record.source_type(),
            source_id = record.id(),
            observers = observers.len(),
            "record created"
        );
        for observer in observers {
            observer.record_created(&record).await?;
        }
        Ok(())
    }
}
