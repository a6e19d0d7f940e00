//! Search index maintenance: bulk rebuild, incremental update, and the
//! lazily built query engine.
//!
//! The index exists twice: persisted through the [`StoreBackend`] and live
//! in a [`QueryEngine`]. Every write goes to the persisted copy first and
//! is then mirrored into the engine.
//!
//! The engine is built on first use from the persisted index. While a load
//! or rebuild is in flight, updates are also queued in the slot; the
//! finishing load applies the queue to its engine, and a rebuild writes the
//! queued documents back after replacing the persisted index. Outside that
//! window nothing is queued, since the persisted copy already has the
//! document.

use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::models::{SearchDocument, SourceRecord};
use crate::project::{project, project_all};
use crate::search::{QueryEngine, ScoredDocument, SearchOptions};
use crate::store::{CreationObserver, StoreBackend};

#[derive(Default)]
struct EngineSlot {
    engine: Option<QueryEngine>,
    /// Loads and rebuilds currently running.
    in_flight: usize,
    /// Documents written while `in_flight > 0`. Append-only until the
    /// last in-flight operation finishes.
    pending: Vec<SearchDocument>,
}

impl EngineSlot {
    fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 {
            self.pending.clear();
        }
    }

    fn install(&mut self, mut engine: QueryEngine) -> usize {
        for doc in &self.pending {
            engine.upsert(doc.clone());
        }
        let count = engine.len();
        self.engine = Some(engine);
        count
    }
}

/// Maintainer of the persisted search index and its live query engine.
pub struct SearchIndex {
    backend: Arc<dyn StoreBackend>,
    options: SearchOptions,
    slot: RwLock<EngineSlot>,
}

impl SearchIndex {
    pub fn new(backend: Arc<dyn StoreBackend>, options: SearchOptions) -> Self {
        Self {
            backend,
            options,
            slot: RwLock::new(EngineSlot::default()),
        }
    }

    /// Rebuild the whole index from the note, task, and event collections.
    ///
    /// The persisted index is cleared and refilled in one backend call,
    /// then the engine is rebuilt from the same documents. Records created
    /// while the rebuild runs are written back afterwards. Returns the
    /// number of documents indexed.
    pub async fn build(&self) -> Result<usize> {
        self.slot.write().unwrap().in_flight += 1;
        let result = self.rebuild().await;
        if result.is_err() {
            self.slot.write().unwrap().finish();
        }
        result
    }

    async fn rebuild(&self) -> Result<usize> {
        let notes = self.backend.list_notes().await?;
        let tasks = self.backend.list_tasks().await?;
        let events = self.backend.list_events().await?;

        let docs = project_all(&notes, &tasks, &events);
        self.backend.replace_search_documents(&docs).await?;

        // The replace may have erased documents written by concurrent
        // updates; put them back until no new ones arrive.
        let mut restored = 0;
        loop {
            let batch = self.pending_from(restored);
            if batch.is_empty() {
                let mut slot = self.slot.write().unwrap();
                if slot.pending.len() > restored {
                    continue;
                }
                let count = slot.install(QueryEngine::new(docs, self.options.clone()));
                slot.finish();
                info!(documents = count, restored, "search index rebuilt");
                return Ok(count);
            }
            for doc in &batch {
                self.backend.put_search_document(doc).await?;
            }
            restored += batch.len();
        }
    }

    fn pending_from(&self, start: usize) -> Vec<SearchDocument> {
        let slot = self.slot.read().unwrap();
        slot.pending.get(start..).map(<[_]>::to_vec).unwrap_or_default()
    }

    /// Index a single newly created record without a rebuild.
    ///
    /// Upserts the projected document into the persisted index, then into
    /// the engine if it exists. While a load or rebuild is in flight the
    /// document is also queued for it.
    pub async fn update(&self, record: &SourceRecord) -> Result<()> {
        let doc = project(record);
        self.backend.put_search_document(&doc).await?;

        let mut slot = self.slot.write().unwrap();
        debug!(
            doc_id = %doc.id,
            warm = slot.engine.is_some(),
            in_flight = slot.in_flight,
            "search index updated"
        );
        if slot.in_flight > 0 {
            slot.pending.push(doc.clone());
        }
        if let Some(engine) = slot.engine.as_mut() {
            engine.upsert(doc);
        }
        Ok(())
    }

    /// Search all indexed records, most relevant first.
    pub async fn search_all(&self, query: &str) -> Result<Vec<SearchDocument>> {
        Ok(self
            .search_scored(query)
            .await?
            .into_iter()
            .map(|hit| hit.document)
            .collect())
    }

    /// Like [`search_all`](SearchIndex::search_all), keeping the scores.
    pub async fn search_scored(&self, query: &str) -> Result<Vec<ScoredDocument>> {
        self.ensure_engine().await?;
        let slot = self.slot.read().unwrap();
        let hits = slot
            .engine
            .as_ref()
            .map(|engine| engine.search_scored(query))
            .unwrap_or_default();
        debug!(query, results = hits.len(), "search");
        Ok(hits)
    }

    /// Whether the engine has been built in this process.
    pub fn is_warm(&self) -> bool {
        self.slot.read().unwrap().engine.is_some()
    }

    /// Drop the live engine, as after a process restart. The next search
    /// rebuilds it from the persisted index.
    pub fn reset_engine(&self) {
        self.slot.write().unwrap().engine = None;
    }

    async fn ensure_engine(&self) -> Result<()> {
        {
            let mut slot = self.slot.write().unwrap();
            if slot.engine.is_some() {
                return Ok(());
            }
            slot.in_flight += 1;
        }

        let loaded = self.backend.list_search_documents().await;

        let mut slot = self.slot.write().unwrap();
        let docs = match loaded {
            Ok(docs) => docs,
            Err(e) => {
                slot.finish();
                return Err(e);
            }
        };
        // A rebuild may have landed while we were loading.
        if slot.engine.is_none() {
            let count = slot.install(QueryEngine::new(docs, self.options.clone()));
            info!(documents = count, "query engine loaded from persisted index");
        }
        slot.finish();
        Ok(())
    }
}

#[async_trait]
impl CreationObserver for SearchIndex {
    async fn record_created(&self, record: &SourceRecord) -> Result<()> {
        self.update(record).await
    }
}
