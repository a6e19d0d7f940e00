//! Wiring of the SQLite store, search index, and attachment manager.
//!
//! Every command opens an [`App`], which connects to the database, applies
//! migrations, and registers the [`SearchIndex`] as a creation observer so
//! records added through [`App::records`] are indexed immediately.

use std::sync::Arc;

use anyhow::Result;

use dash_store_core::{AttachmentManager, RecordStore, SearchIndex, SearchOptions, StoreBackend};

use crate::config::Config;
use crate::db;
use crate::fs_platform::FsPlatform;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

pub struct App {
    store: Arc<SqliteStore>,
    pub records: RecordStore,
    pub index: Arc<SearchIndex>,
    pub platform: Arc<FsPlatform>,
    pub attachments: AttachmentManager,
}

impl App {
    /// Open with the configured search options and a plain [`FsPlatform`].
    pub async fn open(config: &Config) -> Result<Self> {
        Self::open_with(
            config,
            FsPlatform::new(&config.attachments),
            config.search.options(None),
        )
        .await
    }

    pub async fn open_with(config: &Config, platform: FsPlatform, search: SearchOptions) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;

        let store = Arc::new(SqliteStore::new(pool));
        let backend: Arc<dyn StoreBackend> = store.clone();
        let platform = Arc::new(platform);

        let records = RecordStore::new(backend.clone());
        let index = Arc::new(SearchIndex::new(backend.clone(), search));
        records.on_created(index.clone());
        let attachments = AttachmentManager::new(backend, platform.clone());

        Ok(Self {
            store,
            records,
            index,
            platform,
            attachments,
        })
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub async fn close(self) {
        self.store.pool().close().await;
    }
}
