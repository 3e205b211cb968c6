//! Shared harness for graph-search integration tests.

use std::sync::Arc;
use std::time::Duration;

use search_query::SearchService;
use search_source::InMemoryGraph;
use search_types::{BackendMode, DomainObject, Identifier, SearchConfig};

/// Initialize tracing for a test binary. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_test_writer()
        .try_init();
}

/// An in-memory graph wired to a search service.
pub struct TestHarness {
    pub graph: Arc<InMemoryGraph>,
    pub service: SearchService,
}

impl TestHarness {
    /// Harness with the local backend and default config.
    pub fn new() -> Self {
        Self::with_backend(BackendMode::Local)
    }

    pub fn with_backend(backend: BackendMode) -> Self {
        Self::with_config(SearchConfig {
            backend,
            ..Default::default()
        })
    }

    pub fn with_config(config: SearchConfig) -> Self {
        init_tracing();
        let graph = Arc::new(InMemoryGraph::new());
        let service = SearchService::new(graph.clone(), config);
        Self { graph, service }
    }

    /// Kick off indexing and wait for the scheduler to drain.
    pub async fn start_and_settle(&self) {
        self.service.start_indexing().await.unwrap();
        self.settle().await;
    }

    /// Wait until no indexing work is queued, pending, or in flight.
    pub async fn settle(&self) {
        for _ in 0..400 {
            let stats = self.service.scheduler_stats();
            if stats.active == 0 && stats.queued == 0 && stats.pending == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("indexing never settled: {:?}", self.service.scheduler_stats());
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A folder-kind object with a bare identifier.
pub fn folder(key: &str, name: &str) -> DomainObject {
    DomainObject::new(Identifier::bare(key), "folder", name)
}
