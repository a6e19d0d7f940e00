//! # Dash Store
//!
//! A local-first store for notes, tasks, events, and file attachments,
//! with a fuzzy search index kept in step with every write.
//!
//! This crate is the application layer around `dash-store-core`: TOML
//! configuration, the SQLite backend, a filesystem platform for attachment
//! I/O, and the `dash` CLI commands.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  add_*   ┌─────────────┐ record_created ┌─────────────┐
//! │  dash note / │─────────▶│ RecordStore │───────────────▶│ SearchIndex │
//! │  task / event│          └──────┬──────┘                └──────┬──────┘
//! └──────────────┘                 │                              │
//!                                  ▼                              ▼
//! ┌──────────────┐         ┌──────────────┐               ┌─────────────┐
//! │ dash attach /│────────▶│ SqliteStore  │◀──────────────│ QueryEngine │
//! │ export       │ Attach- │ (sqlx, WAL)  │  lazy load    │ (in memory) │
//! └──────┬───────┘ ment-   └──────────────┘               └─────────────┘
//!        │         Manager
//!        ▼
//! ┌──────────────┐
//! │  FsPlatform  │  external files, downloads, notices
//! └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dash init
//! dash note add --title "Shopping list" --html "<p>milk, eggs</p>" --tag home
//! dash attach ./scan.pdf
//! dash search milk
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `StoreBackend` |
//! | [`fs_platform`] | Filesystem attachment platform |
//! | [`app`] | Store, index, and attachment wiring |
//! | [`records`] | Adding notes, tasks, and events |
//! | [`attach`] | Attachment upload, listing, export |
//! | [`search`] | Search and reindex commands |
//! | [`stats`] | Database statistics |

pub mod app;
pub mod attach;
pub mod config;
pub mod db;
pub mod fs_platform;
pub mod migrate;
pub mod records;
pub mod search;
pub mod sqlite_store;
pub mod stats;
