//! Core data models used throughout Dash Store.
//!
//! Source records (notes, tasks, events) are what the user creates.
//! [`SearchDocument`]s are their flattened, search-optimized projections.
//! [`AttachmentRecord`]s carry uploaded files in one of two storage modes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A rich-text note. Every mapped field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Assigned by the store on insert; ignored when adding.
    pub id: i64,
    pub title: Option<String>,
    pub content_html: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// A to-do item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Assigned by the store on insert; ignored when adding.
    pub id: i64,
    pub title: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// A calendar event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Assigned by the store on insert; ignored when adding.
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
}

/// The kind of source record a [`SearchDocument`] was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    Note,
    Task,
    Event,
}

impl SourceType {
    /// Display label, also the searchable `type` field (`"Note"`).
    pub fn label(self) -> &'static str {
        match self {
            SourceType::Note => "Note",
            SourceType::Task => "Task",
            SourceType::Event => "Event",
        }
    }

    /// Lower-case prefix used in composed document ids (`"note"`).
    pub fn key(self) -> &'static str {
        match self {
            SourceType::Note => "note",
            SourceType::Task => "task",
            SourceType::Event => "event",
        }
    }

    /// Parse a label or key, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "note" => Some(SourceType::Note),
            "task" => Some(SourceType::Task),
            "event" => Some(SourceType::Event),
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A freshly created source record, as published by the creation hook.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRecord {
    Note(Note),
    Task(Task),
    Event(Event),
}

impl SourceRecord {
    pub fn source_type(&self) -> SourceType {
        match self {
            SourceRecord::Note(_) => SourceType::Note,
            SourceRecord::Task(_) => SourceType::Task,
            SourceRecord::Event(_) => SourceType::Event,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            SourceRecord::Note(n) => n.id,
            SourceRecord::Task(t) => t.id,
            SourceRecord::Event(e) => e.id,
        }
    }
}

/// Flattened, search-optimized projection of exactly one source record.
///
/// `id` is `"<type>-<source id>"` (e.g. `note-3`); `content` is plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    pub source_type: SourceType,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl SearchDocument {
    /// Compose the document id for a source record.
    pub fn compose_id(source_type: SourceType, source_id: i64) -> String {
        format!("{}-{}", source_type.key(), source_id)
    }
}

/// Opaque reference to a user-chosen file outside the database.
///
/// The handle is persisted with its attachment and reopened at export.
/// Whether it still resolves is up to the platform; see
/// [`PlatformError::HandleExpired`](crate::platform::PlatformError::HandleExpired).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHandle(String);

impl FileHandle {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which of the two storage strategies an attachment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageMode {
    Inline,
    ExternalHandle,
}

impl StorageMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageMode::Inline => "inline",
            StorageMode::ExternalHandle => "external",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inline" => Some(StorageMode::Inline),
            "external" => Some(StorageMode::ExternalHandle),
            _ => None,
        }
    }
}

/// Where an attachment's bytes live. Exactly one representation exists per
/// record, fixed at creation time.
#[derive(Clone, PartialEq, Eq)]
pub enum AttachmentStorage {
    /// Full payload stored inside the record.
    Inline { payload: Vec<u8> },
    /// Payload written to an external file reachable through `handle`.
    ExternalHandle { handle: FileHandle },
}

impl AttachmentStorage {
    pub fn mode(&self) -> StorageMode {
        match self {
            AttachmentStorage::Inline { .. } => StorageMode::Inline,
            AttachmentStorage::ExternalHandle { .. } => StorageMode::ExternalHandle,
        }
    }
}

// Payloads can be many megabytes; print their length instead.
impl fmt::Debug for AttachmentStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentStorage::Inline { payload } => f
                .debug_struct("Inline")
                .field("payload_len", &payload.len())
                .finish(),
            AttachmentStorage::ExternalHandle { handle } => f
                .debug_struct("ExternalHandle")
                .field("handle", handle)
                .finish(),
        }
    }
}

/// A stored file attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRecord {
    /// Assigned by the store on insert; ignored when adding.
    pub id: i64,
    pub name: String,
    pub mime: String,
    /// Size in bytes of the saved content.
    pub size: u64,
    pub created_at: DateTime<Utc>,
    /// `sha256:<hex>` of the bytes written at save time.
    pub checksum: String,
    pub storage: AttachmentStorage,
}

/// Attachment metadata without the payload, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSummary {
    pub id: i64,
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub mode: StorageMode,
}

impl From<&AttachmentRecord> for AttachmentSummary {
    fn from(record: &AttachmentRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            mime: record.mime.clone(),
            size: record.size,
            created_at: record.created_at,
            mode: record.storage.mode(),
        }
    }
}
