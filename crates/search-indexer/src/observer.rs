//! Reaction to mutation notifications.
//!
//! A background task drains the change-event channel the indexer's
//! observers feed. Name mutations re-index the single affected object;
//! composition mutations schedule exactly the newly added children.
//! Identifiers removed from composition are left in the index.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use search_source::{Change, ChangeEvent, ObjectGraph};

use crate::indexer::Indexer;
use crate::scheduler::IndexScheduler;

/// Consumes change events and feeds the indexer and scheduler.
pub struct ChangeObserver {
    graph: Arc<dyn ObjectGraph>,
    indexer: Arc<Indexer>,
    scheduler: Arc<IndexScheduler>,
}

impl ChangeObserver {
    pub fn new(
        graph: Arc<dyn ObjectGraph>,
        indexer: Arc<Indexer>,
        scheduler: Arc<IndexScheduler>,
    ) -> Self {
        Self {
            graph,
            indexer,
            scheduler,
        }
    }

    /// Start the observer task. Runs until the channel closes or the
    /// token is cancelled.
    pub fn spawn(
        self,
        mut events: UnboundedReceiver<ChangeEvent>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => self.handle(event).await,
                        None => break,
                    },
                }
            }
            info!("Change observer stopped");
        })
    }

    async fn handle(&self, event: ChangeEvent) {
        match event.change {
            Change::NameChanged(name) => {
                debug!(key_string = %event.identifier, %name, "Name changed, re-indexing");
                match self.graph.get(&event.identifier).await {
                    Ok(object) => {
                        if let Err(error) = self.indexer.index(&object).await {
                            warn!(key_string = %event.identifier, %error, "Re-index failed");
                        }
                    }
                    Err(error) => {
                        warn!(key_string = %event.identifier, %error, "Fetch for re-index failed");
                    }
                }
            }
            Change::CompositionChanged(children) => {
                let added = self.indexer.composition_changed(&event.identifier, children);
                debug!(
                    key_string = %event.identifier,
                    added = added.len(),
                    "Composition changed"
                );
                for child in &added {
                    self.scheduler.schedule(child);
                }
            }
        }
    }
}
