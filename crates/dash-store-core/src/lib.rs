//! # Dash Store Core
//!
//! Shared, runtime-agnostic logic for Dash Store: data models, the record
//! store abstraction and its creation hook, the search index with its fuzzy
//! query engine, platform capability traits, and the attachment manager.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Every I/O
//! boundary is an async trait so the same logic drives the SQLite-backed
//! CLI and the in-memory store used in tests.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Notes, tasks, events, attachments, search documents |
//! | [`store`] | `StoreBackend` trait, `RecordStore` publisher, in-memory backend |
//! | [`project`] | Record → `SearchDocument` projection and HTML stripping |
//! | [`search`] | Fuzzy `QueryEngine` with weighted fields |
//! | [`index`] | `SearchIndex`: bulk rebuild, incremental update, lazy engine |
//! | [`platform`] | File pickers, handles, downloads, notices |
//! | [`attachments`] | Inline vs external-handle attachment storage and export |

pub mod attachments;
pub mod index;
pub mod models;
pub mod platform;
pub mod project;
pub mod search;
pub mod store;

pub use attachments::{AttachmentManager, ExportOutcome, UploadReport, INLINE_LIMIT_BYTES};
pub use index::SearchIndex;
pub use models::{
    AttachmentRecord, AttachmentStorage, Event, FileHandle, Note, SearchDocument, SourceRecord,
    SourceType, StorageMode, Task,
};
pub use search::{FieldWeights, QueryEngine, SearchOptions};
pub use store::{CreationObserver, RecordStore, StoreBackend};
