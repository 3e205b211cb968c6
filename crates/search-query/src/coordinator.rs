//! Query coordination.
//!
//! Each outstanding search is correlated by a unique query id. The
//! coordinator stores the pending resolution, dispatches to the active
//! backend variant, and, once the result message arrives on the shared
//! result channel, hydrates each raw hit into a full object in backend
//! order before resolving.
//!
//! Per-query state: created -> dispatched -> awaiting-result -> resolved.
//! A query whose backend call failed is left awaiting-result; the failure
//! is logged through the dedicated error channel and no timeout exists.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

use search_source::ObjectGraph;
use search_store::IndexStore;
use search_types::{BackendMode, DomainObject, Identifier, SearchConfig};

use crate::backend::{ExecutionBackend, LocalBackend, OffloadedBackend};
use crate::error::QueryError;
use crate::message::{Operation, QueryInput, QueryRequest, QueryResponse};

/// A resolved search: pre-truncation match count plus hydrated hits in
/// backend order.
#[derive(Debug)]
pub struct SearchResults {
    pub total: usize,
    pub hits: Vec<DomainObject>,
}

type PendingMap = Arc<Mutex<HashMap<Uuid, oneshot::Sender<SearchResults>>>>;

/// Correlates outstanding searches with backend results.
pub struct QueryCoordinator {
    backend: Box<dyn ExecutionBackend>,
    pending: PendingMap,
    default_max_results: usize,
}

impl QueryCoordinator {
    /// Build the coordinator and its background plumbing: the backend
    /// variant named by the config (chosen once, held for the session),
    /// the result-handler task, and the error-channel consumer.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(
        graph: Arc<dyn ObjectGraph>,
        store: Arc<IndexStore>,
        config: &SearchConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let (result_tx, result_rx) = mpsc::unbounded_channel::<QueryResponse>();
        let (error_tx, error_rx) = mpsc::unbounded_channel::<QueryError>();

        let backend: Box<dyn ExecutionBackend> = match config.backend {
            BackendMode::Offloaded => Box::new(OffloadedBackend::new(
                store,
                result_tx,
                error_tx,
                shutdown.clone(),
            )),
            BackendMode::Local => Box::new(LocalBackend::new(store, result_tx, error_tx)),
        };

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        Self::spawn_result_handler(graph, pending.clone(), result_rx, shutdown.clone());
        Self::spawn_error_consumer(error_rx, shutdown);

        Self {
            backend,
            pending,
            default_max_results: config.default_max_results,
        }
    }

    /// Mint a fresh query id and its deferred resolution.
    pub fn generate_query(&self) -> (Uuid, oneshot::Receiver<SearchResults>) {
        let query_id = Uuid::new_v4();
        let (resolve, receiver) = oneshot::channel();
        self.pending.lock().unwrap().insert(query_id, resolve);
        (query_id, receiver)
    }

    /// Outstanding queries, including any abandoned by backend failures.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub async fn search_by_name(
        &self,
        input: &str,
        max_results: Option<usize>,
    ) -> Result<SearchResults, QueryError> {
        self.run(
            Operation::SearchByName,
            QueryInput::Text(input.to_string()),
            max_results,
        )
        .await
    }

    pub async fn search_by_annotation_target(
        &self,
        target_key_string: &str,
        max_results: Option<usize>,
    ) -> Result<SearchResults, QueryError> {
        self.run(
            Operation::SearchByAnnotationTarget,
            QueryInput::Text(target_key_string.to_string()),
            max_results,
        )
        .await
    }

    pub async fn search_by_tag(
        &self,
        input: &str,
        max_results: Option<usize>,
    ) -> Result<SearchResults, QueryError> {
        self.run(
            Operation::SearchByTag,
            QueryInput::Text(input.to_string()),
            max_results,
        )
        .await
    }

    pub async fn search_by_notebook_entry(
        &self,
        target_key_string: &str,
        entry_id: &str,
        max_results: Option<usize>,
    ) -> Result<SearchResults, QueryError> {
        self.run(
            Operation::SearchByNotebookEntry,
            QueryInput::NotebookEntry {
                target_key_string: target_key_string.to_string(),
                entry_id: entry_id.to_string(),
            },
            max_results,
        )
        .await
    }

    /// Dispatch to the active backend, for tests that drive raw requests.
    pub fn dispatch(&self, request: QueryRequest) {
        self.backend.dispatch(request);
    }

    async fn run(
        &self,
        operation: Operation,
        input: QueryInput,
        max_results: Option<usize>,
    ) -> Result<SearchResults, QueryError> {
        let (query_id, receiver) = self.generate_query();
        let request = QueryRequest {
            operation,
            input,
            max_results: max_results.unwrap_or(self.default_max_results),
            query_id,
        };
        debug!(%query_id, ?operation, "Dispatching query");
        self.backend.dispatch(request);

        receiver.await.map_err(|_| QueryError::CoordinatorClosed)
    }

    fn spawn_result_handler(
        graph: Arc<dyn ObjectGraph>,
        pending: PendingMap,
        mut result_rx: mpsc::UnboundedReceiver<QueryResponse>,
        shutdown: CancellationToken,
    ) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    response = result_rx.recv() => match response {
                        Some(response) => {
                            Self::handle_response(&graph, &pending, response).await;
                        }
                        None => break,
                    },
                }
            }
        });
    }

    async fn handle_response(
        graph: &Arc<dyn ObjectGraph>,
        pending: &PendingMap,
        response: QueryResponse,
    ) {
        let resolve = pending.lock().unwrap().remove(&response.query_id);
        let Some(resolve) = resolve else {
            warn!(query_id = %response.query_id, "Result for unknown query, discarding");
            return;
        };

        // Hydrate raw hits in backend order. A hit whose object can no
        // longer be fetched is skipped; total still reflects the backend's
        // pre-truncation count.
        let mut hits = Vec::with_capacity(response.results.len());
        for raw in &response.results {
            let identifier = match Identifier::from_str(&raw.key_string) {
                Ok(identifier) => identifier,
                Err(err) => {
                    warn!(key_string = %raw.key_string, %err, "Unparseable hit, skipping");
                    continue;
                }
            };
            match graph.get(&identifier).await {
                Ok(object) => hits.push(object),
                Err(err) => {
                    warn!(key_string = %raw.key_string, %err, "Hydration failed, skipping hit");
                }
            }
        }

        debug!(query_id = %response.query_id, total = response.total, hits = hits.len(), "Query resolved");
        let _ = resolve.send(SearchResults {
            total: response.total,
            hits,
        });
    }

    fn spawn_error_consumer(
        mut error_rx: mpsc::UnboundedReceiver<QueryError>,
        shutdown: CancellationToken,
    ) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    err = error_rx.recv() => match err {
                        Some(err) => {
                            // Engineer-facing diagnostic only; the query
                            // awaiting this call stays pending.
                            error!(%err, "Search backend error");
                        }
                        None => break,
                    },
                }
            }
        });
    }
}
