//! The search service facade.
//!
//! Wires the store, indexer, scheduler, change observer, and query
//! coordinator around one object graph, and owns their shared teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use search_indexer::{ChangeObserver, IndexScheduler, Indexer, IndexingError, SchedulerStats};
use search_source::ObjectGraph;
use search_store::{IndexStats, IndexStore};
use search_types::{Identifier, SearchConfig, TagDefinition};

use crate::coordinator::{QueryCoordinator, SearchResults};
use crate::error::QueryError;

/// In-process search over a hierarchical object graph.
///
/// Construct within a tokio runtime, call [`SearchService::start_indexing`]
/// once at system start, then issue searches. Call
/// [`SearchService::shutdown`] during teardown so observer registrations
/// are released and background tasks stop.
pub struct SearchService {
    graph: Arc<dyn ObjectGraph>,
    store: Arc<IndexStore>,
    indexer: Arc<Indexer>,
    scheduler: Arc<IndexScheduler>,
    coordinator: QueryCoordinator,
    observer_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
    started: AtomicBool,
}

impl SearchService {
    pub fn new(graph: Arc<dyn ObjectGraph>, config: SearchConfig) -> Self {
        let shutdown = CancellationToken::new();
        let store = Arc::new(IndexStore::new());

        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let indexer = Arc::new(Indexer::new(graph.clone(), store.clone(), change_tx));
        let scheduler = IndexScheduler::new(
            graph.clone(),
            indexer.clone(),
            config.concurrency_ceiling,
            shutdown.clone(),
        );
        let observer_task = ChangeObserver::new(graph.clone(), indexer.clone(), scheduler.clone())
            .spawn(change_rx, shutdown.clone());

        let coordinator =
            QueryCoordinator::new(graph.clone(), store.clone(), &config, shutdown.clone());

        Self {
            graph,
            store,
            indexer,
            scheduler,
            coordinator,
            observer_task: Mutex::new(Some(observer_task)),
            shutdown,
            started: AtomicBool::new(false),
        }
    }

    /// Seed the index: the synthetic root plus any annotation objects
    /// already materialized by the host. Invoked once at system start.
    pub async fn start_indexing(&self) -> Result<(), IndexingError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(IndexingError::AlreadyRunning);
        }

        let root = self.graph.root();
        self.scheduler.schedule(&root);
        for annotation in self.graph.loaded_annotations().await {
            self.scheduler.schedule(&annotation);
        }
        info!("Indexing started from root {}", root);
        Ok(())
    }

    /// Enqueue one identifier, for hosts feeding newly created objects
    /// (such as fresh annotations) into the index.
    pub fn schedule(&self, identifier: &Identifier) {
        self.scheduler.schedule(identifier);
    }

    /// Register a tag definition from the host's tag dictionary.
    pub fn define_tag(&self, tag: TagDefinition) {
        self.store.define_tag(tag);
    }

    pub async fn search_by_name(
        &self,
        input: &str,
        max_results: Option<usize>,
    ) -> Result<SearchResults, QueryError> {
        self.coordinator.search_by_name(input, max_results).await
    }

    pub async fn search_by_annotation_target(
        &self,
        target_key_string: &str,
        max_results: Option<usize>,
    ) -> Result<SearchResults, QueryError> {
        self.coordinator
            .search_by_annotation_target(target_key_string, max_results)
            .await
    }

    pub async fn search_by_tag(
        &self,
        input: &str,
        max_results: Option<usize>,
    ) -> Result<SearchResults, QueryError> {
        self.coordinator.search_by_tag(input, max_results).await
    }

    pub async fn search_by_notebook_entry(
        &self,
        target_key_string: &str,
        entry_id: &str,
        max_results: Option<usize>,
    ) -> Result<SearchResults, QueryError> {
        self.coordinator
            .search_by_notebook_entry(target_key_string, entry_id, max_results)
            .await
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn index_stats(&self) -> IndexStats {
        self.store.stats()
    }

    /// Tear the subsystem down: stop admitting work, stop background
    /// tasks, and release every observer registration exactly once.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.indexer.release_observers();
        let task = self.observer_task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        info!("Search service shut down");
    }
}
