//! Execution backends.
//!
//! Two variants implement the same dispatch contract. The offloaded
//! variant runs matches in a single shared background worker fed by a
//! request channel; the local variant evaluates synchronously in-process.
//! Both produce the identical response shape and feed it into the same
//! result channel, so callers observe one contract regardless of which
//! variant is active. Worker-side failures are routed to a dedicated
//! error channel, logged, never thrown into caller code.

use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use search_store::IndexStore;

use crate::error::QueryError;
use crate::message::{Operation, QueryInput, QueryRequest, QueryResponse};

/// The four-operation execution contract.
///
/// Dispatch is fire-and-forget; responses arrive on the shared result
/// channel keyed by query id.
pub trait ExecutionBackend: Send + Sync {
    fn dispatch(&self, request: QueryRequest);
}

/// Evaluate one request against the index store.
///
/// All four operations truncate output to `max_results` but report the
/// pre-truncation match count as `total`.
fn evaluate(store: &IndexStore, request: &QueryRequest) -> Result<QueryResponse, QueryError> {
    let matches = match (&request.operation, &request.input) {
        (Operation::SearchByName, QueryInput::Text(text)) => store.matches_by_name(text),
        (Operation::SearchByAnnotationTarget, QueryInput::Text(target)) => {
            store.matches_by_target(target)
        }
        (Operation::SearchByTag, QueryInput::Text(text)) => store.matches_by_tag_text(text),
        (
            Operation::SearchByNotebookEntry,
            QueryInput::NotebookEntry {
                target_key_string,
                entry_id,
            },
        ) => store.matches_by_notebook_entry(target_key_string, entry_id),
        (operation, _) => {
            return Err(QueryError::Malformed {
                operation: *operation,
                reason: "input shape does not fit the operation".to_string(),
            })
        }
    };

    let total = matches.len();
    let results = matches.into_iter().take(request.max_results).collect();
    Ok(QueryResponse {
        query_id: request.query_id,
        total,
        results,
    })
}

/// Shared background execution context.
///
/// The worker task is spawned lazily on the first dispatch and reused for
/// every subsequent request; teardown goes through the cancellation token.
pub struct OffloadedBackend {
    store: Arc<IndexStore>,
    result_tx: UnboundedSender<QueryResponse>,
    error_tx: UnboundedSender<QueryError>,
    shutdown: CancellationToken,
    worker: OnceLock<UnboundedSender<QueryRequest>>,
}

impl OffloadedBackend {
    pub fn new(
        store: Arc<IndexStore>,
        result_tx: UnboundedSender<QueryResponse>,
        error_tx: UnboundedSender<QueryError>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            result_tx,
            error_tx,
            shutdown,
            worker: OnceLock::new(),
        }
    }

    fn worker_tx(&self) -> &UnboundedSender<QueryRequest> {
        self.worker.get_or_init(|| {
            let (request_tx, mut request_rx) = mpsc::unbounded_channel::<QueryRequest>();
            let store = self.store.clone();
            let result_tx = self.result_tx.clone();
            let error_tx = self.error_tx.clone();
            let shutdown = self.shutdown.clone();

            tokio::spawn(async move {
                info!("Offloaded search worker started");
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        request = request_rx.recv() => match request {
                            Some(request) => {
                                debug!(query_id = %request.query_id, operation = ?request.operation, "Worker executing");
                                match evaluate(&store, &request) {
                                    Ok(response) => {
                                        let _ = result_tx.send(response);
                                    }
                                    Err(error) => {
                                        let _ = error_tx.send(error);
                                    }
                                }
                            }
                            None => break,
                        },
                    }
                }
                info!("Offloaded search worker stopped");
            });
            request_tx
        })
    }
}

impl ExecutionBackend for OffloadedBackend {
    fn dispatch(&self, request: QueryRequest) {
        if self.worker_tx().send(request).is_err() {
            // Worker gone during teardown; the query stays pending by
            // design, matching a worker-side failure.
            let _ = self.error_tx.send(QueryError::CoordinatorClosed);
        }
    }
}

/// Synchronous in-process variant.
///
/// Executes against the index store on the dispatching task, then feeds
/// the response through the same result channel as the offloaded variant.
pub struct LocalBackend {
    store: Arc<IndexStore>,
    result_tx: UnboundedSender<QueryResponse>,
    error_tx: UnboundedSender<QueryError>,
}

impl LocalBackend {
    pub fn new(
        store: Arc<IndexStore>,
        result_tx: UnboundedSender<QueryResponse>,
        error_tx: UnboundedSender<QueryError>,
    ) -> Self {
        Self {
            store,
            result_tx,
            error_tx,
        }
    }
}

impl ExecutionBackend for LocalBackend {
    fn dispatch(&self, request: QueryRequest) {
        match evaluate(&self.store, &request) {
            Ok(response) => {
                let _ = self.result_tx.send(response);
            }
            Err(error) => {
                let _ = self.error_tx.send(error);
            }
        }
    }
}
