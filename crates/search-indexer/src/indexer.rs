//! Conversion of fetched objects into index entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use search_source::{ChangeSink, ObjectGraph, ObservedProperty, ObserverHandle, SourceError};
use search_store::IndexStore;
use search_types::{DomainObject, Identifier, IndexEntry};

/// Turns domain objects into denormalized index entries.
///
/// Indexing is idempotent with respect to observer registration: the first
/// time an identifier is seen, mutation observers are registered on its
/// name and composition and persist for the index's lifetime; later calls
/// only refresh the denormalized snapshot. The synthetic root is traversed
/// but never forwarded to the store, so it cannot surface in results.
pub struct Indexer {
    graph: Arc<dyn ObjectGraph>,
    store: Arc<IndexStore>,
    change_tx: ChangeSink,
    root_key: String,
    /// keyString -> the two observer handles, released at teardown.
    observed: Mutex<HashMap<String, Vec<ObserverHandle>>>,
    /// keyString -> last-known child-identifier list, the baseline for
    /// composition diffs.
    compositions: Mutex<HashMap<String, Vec<Identifier>>>,
}

impl Indexer {
    pub fn new(graph: Arc<dyn ObjectGraph>, store: Arc<IndexStore>, change_tx: ChangeSink) -> Self {
        let root_key = graph.root().key_string();
        Self {
            graph,
            store,
            change_tx,
            root_key,
            observed: Mutex::new(HashMap::new()),
            compositions: Mutex::new(HashMap::new()),
        }
    }

    /// Index one fetched object and return the child identifiers it
    /// exposes, for the scheduler to admit.
    pub async fn index(&self, object: &DomainObject) -> Result<Vec<Identifier>, SourceError> {
        self.ensure_observed(&object.identifier);

        let key_string = object.identifier.key_string();
        if key_string != self.root_key {
            self.store.insert(IndexEntry::from_object(object));
        } else {
            debug!("Skipping store entry for the synthetic root");
        }

        let children = if object.composition.is_some() {
            self.graph.composition(object).await?
        } else {
            Vec::new()
        };

        if !children.is_empty() {
            let mut compositions = self.compositions.lock().unwrap();
            compositions.insert(key_string, children.clone());
        }

        Ok(children)
    }

    /// Diff a composition notification against the last-known list using
    /// identifier equality. Returns only the additions; removals are left
    /// in the index untouched. Updates the baseline.
    pub fn composition_changed(
        &self,
        identifier: &Identifier,
        new_children: Vec<Identifier>,
    ) -> Vec<Identifier> {
        let mut compositions = self.compositions.lock().unwrap();
        let key_string = identifier.key_string();
        let previous = compositions.get(&key_string).cloned().unwrap_or_default();
        let added: Vec<Identifier> = new_children
            .iter()
            .filter(|child| !previous.contains(child))
            .cloned()
            .collect();
        compositions.insert(key_string, new_children);
        added
    }

    /// Whether observers were already registered for an identifier.
    pub fn is_observed(&self, identifier: &Identifier) -> bool {
        self.observed
            .lock()
            .unwrap()
            .contains_key(&identifier.key_string())
    }

    /// Release every observer registration exactly once. Called during
    /// system teardown so callbacks cannot fire into a torn-down graph.
    pub fn release_observers(&self) {
        let mut observed = self.observed.lock().unwrap();
        let count = observed.len();
        for (_, handles) in observed.drain() {
            for mut handle in handles {
                handle.release();
            }
        }
        debug!(identifiers = count, "Released all observer registrations");
    }

    fn ensure_observed(&self, identifier: &Identifier) {
        let key_string = identifier.key_string();
        let mut observed = self.observed.lock().unwrap();
        if observed.contains_key(&key_string) {
            return;
        }
        let handles = vec![
            self.graph
                .observe(identifier, ObservedProperty::Name, self.change_tx.clone()),
            self.graph.observe(
                identifier,
                ObservedProperty::Composition,
                self.change_tx.clone(),
            ),
        ];
        observed.insert(key_string, handles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_source::InMemoryGraph;
    use tokio::sync::mpsc;

    fn setup() -> (Arc<InMemoryGraph>, Arc<IndexStore>, Indexer) {
        let graph = Arc::new(InMemoryGraph::new());
        let store = Arc::new(IndexStore::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let indexer = Indexer::new(graph.clone() as Arc<dyn ObjectGraph>, store.clone(), tx);
        (graph, store, indexer)
    }

    fn folder(key: &str, name: &str) -> DomainObject {
        DomainObject::new(Identifier::bare(key), "folder", name)
    }

    #[tokio::test]
    async fn test_index_records_entry() {
        let (_graph, store, indexer) = setup();
        let object = folder("a", "Alpha");

        let children = indexer.index(&object).await.unwrap();
        assert!(children.is_empty());
        assert!(store.contains("a"));
    }

    #[tokio::test]
    async fn test_root_is_traversed_but_not_stored() {
        let (graph, store, indexer) = setup();
        let root = graph.root();
        graph.insert_under(folder("a", "Alpha"), &root).unwrap();

        let root_object = graph.get(&root).await.unwrap();
        let children = indexer.index(&root_object).await.unwrap();

        assert_eq!(children, vec![Identifier::bare("a")]);
        assert!(!store.contains(&root.key_string()));
    }

    #[tokio::test]
    async fn test_observers_registered_once() {
        let graph = Arc::new(InMemoryGraph::new());
        let store = Arc::new(IndexStore::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let indexer = Indexer::new(graph.clone() as Arc<dyn ObjectGraph>, store, tx);

        let object = folder("a", "Alpha");
        graph.insert(object.clone());

        assert!(!indexer.is_observed(&object.identifier));
        indexer.index(&object).await.unwrap();
        assert!(indexer.is_observed(&object.identifier));

        // Re-indexing must not register duplicate observers: a single
        // rename produces a single notification.
        indexer.index(&object).await.unwrap();
        graph.set_name(&object.identifier, "Renamed").unwrap();

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reindex_refreshes_snapshot() {
        let (_graph, store, indexer) = setup();
        indexer.index(&folder("a", "Before")).await.unwrap();
        indexer.index(&folder("a", "After")).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().name, "After");
    }

    #[tokio::test]
    async fn test_composition_diff_returns_only_additions() {
        let (graph, _store, indexer) = setup();
        let root = graph.root();
        graph.insert_under(folder("a", "Alpha"), &root).unwrap();
        let root_object = graph.get(&root).await.unwrap();
        indexer.index(&root_object).await.unwrap();

        let added = indexer.composition_changed(
            &root,
            vec![Identifier::bare("a"), Identifier::bare("b")],
        );
        assert_eq!(added, vec![Identifier::bare("b")]);

        // A second notification with the same list adds nothing.
        let added = indexer.composition_changed(
            &root,
            vec![Identifier::bare("a"), Identifier::bare("b")],
        );
        assert!(added.is_empty());
    }

    #[tokio::test]
    async fn test_composition_diff_ignores_removals() {
        let (graph, _store, indexer) = setup();
        let root = graph.root();
        graph.insert_under(folder("a", "Alpha"), &root).unwrap();
        graph.insert_under(folder("b", "Beta"), &root).unwrap();
        let root_object = graph.get(&root).await.unwrap();
        indexer.index(&root_object).await.unwrap();

        // "a" removed, "c" added: only the addition comes back.
        let added = indexer.composition_changed(
            &root,
            vec![Identifier::bare("b"), Identifier::bare("c")],
        );
        assert_eq!(added, vec![Identifier::bare("c")]);
    }

    #[tokio::test]
    async fn test_release_observers() {
        let (graph, _store, indexer) = setup();
        let object = folder("a", "Alpha");
        graph.insert(object.clone());
        indexer.index(&object).await.unwrap();

        indexer.release_observers();
        assert!(!indexer.is_observed(&object.identifier));
    }
}
