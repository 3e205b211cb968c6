//! Admission-controlled index scheduler.
//!
//! Turns identifiers into fetch+index work, bounded by a concurrency
//! ceiling. Excess identifiers wait in FIFO arrival order; duplicate
//! scheduling before completion is a no-op; fetch failures are logged and
//! dropped, never retried.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, Weak};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use search_source::{ObjectGraph, SourceError};
use search_types::Identifier;

use crate::indexer::Indexer;

#[derive(Default)]
struct SchedState {
    /// Identifiers waiting for admission, FIFO.
    queue: VecDeque<Identifier>,
    /// Enqueued or in flight. A key string is in at most one of
    /// {pending, indexed}.
    pending: HashSet<String>,
    /// Completed successfully.
    indexed: HashSet<String>,
    /// Fetch+index operations currently running.
    active: usize,
}

/// Occupancy snapshot for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    pub queued: usize,
    pub active: usize,
    pub pending: usize,
    pub indexed: usize,
}

/// The scheduler. Construct with [`IndexScheduler::new`], which returns an
/// `Arc` because in-flight tasks hold a reference back to it.
pub struct IndexScheduler {
    graph: Arc<dyn ObjectGraph>,
    indexer: Arc<Indexer>,
    ceiling: usize,
    state: Mutex<SchedState>,
    shutdown: CancellationToken,
    /// Back-reference handed to spawned tasks.
    self_ref: Weak<IndexScheduler>,
}

impl IndexScheduler {
    pub fn new(
        graph: Arc<dyn ObjectGraph>,
        indexer: Arc<Indexer>,
        ceiling: usize,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            graph,
            indexer,
            ceiling,
            state: Mutex::new(SchedState::default()),
            shutdown,
            self_ref: self_ref.clone(),
        })
    }

    /// Enqueue an identifier for indexing.
    ///
    /// No-op when the identifier is already indexed, already pending, or
    /// its provider can search itself (those objects bypass this fallback
    /// path entirely).
    pub fn schedule(&self, identifier: &Identifier) {
        if self.graph.provider(identifier).supports_search {
            debug!(key_string = %identifier, "Provider searches itself, skipping");
            return;
        }

        {
            let mut state = self.state.lock().unwrap();
            let key_string = identifier.key_string();
            if state.indexed.contains(&key_string) || state.pending.contains(&key_string) {
                return;
            }
            state.pending.insert(key_string);
            state.queue.push_back(identifier.clone());
        }
        self.pump();
    }

    /// Whether an identifier has completed indexing.
    pub fn is_indexed(&self, identifier: &Identifier) -> bool {
        self.state
            .lock()
            .unwrap()
            .indexed
            .contains(&identifier.key_string())
    }

    pub fn stats(&self) -> SchedulerStats {
        let state = self.state.lock().unwrap();
        SchedulerStats {
            queued: state.queue.len(),
            active: state.active,
            pending: state.pending.len(),
            indexed: state.indexed.len(),
        }
    }

    /// Stop admitting new work. In-flight operations run to completion;
    /// nothing is withdrawn.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Admit queued identifiers up to the ceiling.
    fn pump(&self) {
        loop {
            if self.shutdown.is_cancelled() {
                return;
            }
            let identifier = {
                let mut state = self.state.lock().unwrap();
                if state.active >= self.ceiling {
                    return;
                }
                match state.queue.pop_front() {
                    Some(identifier) => {
                        state.active += 1;
                        identifier
                    }
                    None => return,
                }
            };

            let Some(scheduler) = self.self_ref.upgrade() else {
                return;
            };
            tokio::spawn(async move {
                let result = scheduler.run_one(&identifier).await;
                // Completion is decoupled from the call that produced the
                // result so admission never grows the producing stack.
                let scheduler = Arc::clone(&scheduler);
                tokio::spawn(async move {
                    scheduler.complete(&identifier, result);
                });
            });
        }
    }

    async fn run_one(&self, identifier: &Identifier) -> Result<(), SourceError> {
        let object = self.graph.get(identifier).await?;
        let children = self.indexer.index(&object).await?;
        for child in &children {
            self.schedule(child);
        }
        Ok(())
    }

    fn complete(&self, identifier: &Identifier, result: Result<(), SourceError>) {
        {
            let mut state = self.state.lock().unwrap();
            state.active -= 1;
            let key_string = identifier.key_string();
            state.pending.remove(&key_string);
            match result {
                Ok(()) => {
                    state.indexed.insert(key_string);
                }
                Err(error) => {
                    warn!(key_string = %identifier, %error, "Indexing failed, dropping identifier");
                }
            }
        }
        self.pump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use search_source::{
        ChangeSink, InMemoryGraph, ObservedProperty, ObserverHandle, ProviderInfo,
    };
    use search_store::IndexStore;
    use search_types::DomainObject;

    fn folder(key: &str, name: &str) -> DomainObject {
        DomainObject::new(Identifier::bare(key), "folder", name)
    }

    fn wire(graph: Arc<dyn ObjectGraph>, ceiling: usize) -> (Arc<IndexStore>, Arc<IndexScheduler>) {
        let store = Arc::new(IndexStore::new());
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let indexer = Arc::new(Indexer::new(graph.clone(), store.clone(), tx));
        let scheduler = IndexScheduler::new(graph, indexer, ceiling, CancellationToken::new());
        (store, scheduler)
    }

    async fn settle(scheduler: &Arc<IndexScheduler>) {
        loop {
            let stats = scheduler.stats();
            if stats.active == 0 && stats.queued == 0 && stats.pending == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_schedule_fetches_and_indexes() {
        let graph = Arc::new(InMemoryGraph::new());
        graph.insert(folder("a", "Alpha"));
        let (store, scheduler) = wire(graph, 4);

        scheduler.schedule(&Identifier::bare("a"));
        settle(&scheduler).await;

        assert!(store.contains("a"));
        assert!(scheduler.is_indexed(&Identifier::bare("a")));
    }

    #[tokio::test]
    async fn test_schedule_walks_children() {
        let graph = Arc::new(InMemoryGraph::new());
        let root = graph.root();
        graph.insert_under(folder("a", "Alpha"), &root).unwrap();
        graph.insert_under(folder("b", "Beta"), &root).unwrap();
        let (store, scheduler) = wire(graph, 4);

        scheduler.schedule(&root);
        settle(&scheduler).await;

        assert!(store.contains("a"));
        assert!(store.contains("b"));
        // The root is traversed but never stored.
        assert!(!store.contains(&root.key_string()));
    }

    #[tokio::test]
    async fn test_duplicate_schedule_is_noop() {
        let graph = Arc::new(InMemoryGraph::new());
        graph.insert(folder("a", "Alpha"));
        let (_store, scheduler) = wire(graph, 4);

        scheduler.schedule(&Identifier::bare("a"));
        scheduler.schedule(&Identifier::bare("a"));
        settle(&scheduler).await;

        scheduler.schedule(&Identifier::bare("a"));
        assert_eq!(scheduler.stats().queued, 0);
        assert_eq!(scheduler.stats().indexed, 1);
    }

    #[tokio::test]
    async fn test_natively_searchable_provider_bypasses() {
        let graph = Arc::new(InMemoryGraph::new());
        graph.insert(DomainObject::new(
            Identifier::new("tlm", "x"),
            "telemetry",
            "Power",
        ));
        graph.mark_searchable("tlm");
        let (store, scheduler) = wire(graph, 4);

        scheduler.schedule(&Identifier::new("tlm", "x"));
        settle(&scheduler).await;

        assert!(!store.contains("tlm:x"));
        assert_eq!(scheduler.stats().pending, 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_drops_identifier() {
        let graph = Arc::new(InMemoryGraph::new());
        graph.insert(folder("a", "Alpha"));
        graph.fail_fetch(&Identifier::bare("a"));
        let (store, scheduler) = wire(graph.clone(), 4);

        scheduler.schedule(&Identifier::bare("a"));
        settle(&scheduler).await;

        // Dropped, not retried, and no longer pending.
        assert!(!store.contains("a"));
        assert!(!scheduler.is_indexed(&Identifier::bare("a")));

        // A later explicit schedule may try again from scratch.
        scheduler.schedule(&Identifier::bare("a"));
        settle(&scheduler).await;
        assert!(store.contains("a"));
    }

    /// Graph wrapper that stalls fetches and records peak concurrency.
    struct SlowGraph {
        inner: InMemoryGraph,
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowGraph {
        fn new(inner: InMemoryGraph) -> Self {
            Self {
                inner,
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ObjectGraph for SlowGraph {
        async fn get(&self, identifier: &Identifier) -> Result<DomainObject, SourceError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            let result = self.inner.get(identifier).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            result
        }

        fn provider(&self, identifier: &Identifier) -> ProviderInfo {
            self.inner.provider(identifier)
        }

        async fn composition(
            &self,
            object: &DomainObject,
        ) -> Result<Vec<Identifier>, SourceError> {
            self.inner.composition(object).await
        }

        fn observe(
            &self,
            identifier: &Identifier,
            property: ObservedProperty,
            sink: ChangeSink,
        ) -> ObserverHandle {
            self.inner.observe(identifier, property, sink)
        }

        fn root(&self) -> Identifier {
            self.inner.root()
        }

        async fn loaded_annotations(&self) -> Vec<Identifier> {
            self.inner.loaded_annotations().await
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ceiling_bounds_concurrent_operations() {
        let inner = InMemoryGraph::new();
        for i in 0..30 {
            inner.insert(folder(&format!("obj-{i}"), &format!("Object {i}")));
        }
        let graph = Arc::new(SlowGraph::new(inner));
        let (store, scheduler) = wire(graph.clone(), 3);

        for i in 0..30 {
            scheduler.schedule(&Identifier::bare(format!("obj-{i}")));
        }
        settle(&scheduler).await;

        assert_eq!(store.len(), 30);
        assert!(
            graph.peak.load(Ordering::SeqCst) <= 3,
            "peak concurrency {} exceeded ceiling",
            graph.peak.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_admission() {
        let graph = Arc::new(InMemoryGraph::new());
        graph.insert(folder("a", "Alpha"));
        let (store, scheduler) = wire(graph, 4);

        scheduler.shutdown();
        scheduler.schedule(&Identifier::bare("a"));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!store.contains("a"));
    }
}
