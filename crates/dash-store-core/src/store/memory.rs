//! In-memory [`StoreBackend`] implementation for tests and embedded use.
//!
//! Uses `Vec`s behind `std::sync::RwLock` for thread safety. Ids are
//! assigned from a per-collection counter starting at 1, like an
//! auto-increment primary key.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{AttachmentRecord, AttachmentSummary, Event, Note, SearchDocument, Task};

use super::StoreBackend;

struct Collection<T> {
    rows: Vec<T>,
    next_id: i64,
}

impl<T> Collection<T> {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// In-memory store for tests and embedded environments.
pub struct InMemoryStore {
    notes: RwLock<Collection<Note>>,
    tasks: RwLock<Collection<Task>>,
    events: RwLock<Collection<Event>>,
    attachments: RwLock<Collection<AttachmentRecord>>,
    search_index: RwLock<Vec<SearchDocument>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            notes: RwLock::new(Collection::new()),
            tasks: RwLock::new(Collection::new()),
            events: RwLock::new(Collection::new()),
            attachments: RwLock::new(Collection::new()),
            search_index: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_note(&self, note: &Note) -> Result<i64> {
        let mut notes = self.notes.write().unwrap();
        let id = notes.allocate_id();
        notes.rows.push(Note {
            id,
            ..note.clone()
        });
        Ok(id)
    }

    async fn insert_task(&self, task: &Task) -> Result<i64> {
        let mut tasks = self.tasks.write().unwrap();
        let id = tasks.allocate_id();
        tasks.rows.push(Task {
            id,
            ..task.clone()
        });
        Ok(id)
    }

    async fn insert_event(&self, event: &Event) -> Result<i64> {
        let mut events = self.events.write().unwrap();
        let id = events.allocate_id();
        events.rows.push(Event {
            id,
            ..event.clone()
        });
        Ok(id)
    }

    async fn list_notes(&self) -> Result<Vec<Note>> {
        Ok(self.notes.read().unwrap().rows.clone())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.read().unwrap().rows.clone())
    }

    async fn list_events(&self) -> Result<Vec<Event>> {
        Ok(self.events.read().unwrap().rows.clone())
    }

    async fn add_attachment(&self, record: &AttachmentRecord) -> Result<i64> {
        let mut attachments = self.attachments.write().unwrap();
        let id = attachments.allocate_id();
        attachments.rows.push(AttachmentRecord {
            id,
            ..record.clone()
        });
        Ok(id)
    }

    async fn get_attachment(&self, id: i64) -> Result<Option<AttachmentRecord>> {
        let attachments = self.attachments.read().unwrap();
        Ok(attachments.rows.iter().find(|a| a.id == id).cloned())
    }

    async fn list_attachments(&self) -> Result<Vec<AttachmentSummary>> {
        let attachments = self.attachments.read().unwrap();
        Ok(attachments.rows.iter().map(AttachmentSummary::from).collect())
    }

    async fn put_search_document(&self, doc: &SearchDocument) -> Result<()> {
        let mut index = self.search_index.write().unwrap();
        match index.iter_mut().find(|existing| existing.id == doc.id) {
            Some(existing) => *existing = doc.clone(),
            None => index.push(doc.clone()),
        }
        Ok(())
    }

    async fn list_search_documents(&self) -> Result<Vec<SearchDocument>> {
        Ok(self.search_index.read().unwrap().clone())
    }

    async fn replace_search_documents(&self, docs: &[SearchDocument]) -> Result<()> {
        let mut index = self.search_index.write().unwrap();
        index.clear();
        index.extend_from_slice(docs);
        Ok(())
    }
}
