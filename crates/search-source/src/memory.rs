//! In-memory object graph.
//!
//! Reference implementation of [`ObjectGraph`] used by tests and by hosts
//! that keep their object graph in process. Mutations through `set_name`,
//! `set_composition`, and the annotation operations fire any registered
//! observer sinks.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use search_types::{
    AnnotationKind, AnnotationPayload, DomainObject, Identifier, TargetDetail, KIND_ANNOTATION,
    KIND_ROOT,
};

use crate::error::{AnnotationError, SourceError};
use crate::graph::{Change, ChangeEvent, ChangeSink, ObjectGraph, ObservedProperty, ProviderInfo};
use crate::handle::ObserverHandle;

type ObserverKey = (String, ObservedProperty);

#[derive(Default)]
struct GraphState {
    objects: HashMap<String, DomainObject>,
    observers: HashMap<ObserverKey, HashMap<u64, ChangeSink>>,
    next_observer_id: u64,
    next_annotation_seq: u64,
    searchable_namespaces: HashSet<String>,
    failing_fetches: HashSet<String>,
}

impl GraphState {
    fn notify(&mut self, identifier: &Identifier, property: ObservedProperty, change: Change) {
        let key = (identifier.key_string(), property);
        if let Some(sinks) = self.observers.get_mut(&key) {
            let event = ChangeEvent {
                identifier: identifier.clone(),
                change,
            };
            // Drop sinks whose receiver side has gone away.
            sinks.retain(|_, sink| sink.send(event.clone()).is_ok());
        }
    }
}

/// In-memory [`ObjectGraph`] implementation.
pub struct InMemoryGraph {
    root: Identifier,
    state: Arc<Mutex<GraphState>>,
}

impl InMemoryGraph {
    /// Create a graph with a synthetic root object and empty composition.
    pub fn new() -> Self {
        let root = Identifier::bare("ROOT");
        let mut root_object = DomainObject::new(root.clone(), KIND_ROOT, "The root object");
        root_object.composition = Some(Vec::new());

        let mut state = GraphState::default();
        state.objects.insert(root.key_string(), root_object);

        Self {
            root,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Insert or replace an object.
    pub fn insert(&self, object: DomainObject) {
        let mut state = self.state.lock().unwrap();
        state.objects.insert(object.identifier.key_string(), object);
    }

    /// Insert an object and append it to a parent's composition, firing
    /// composition observers on the parent.
    pub fn insert_under(&self, object: DomainObject, parent: &Identifier) -> Result<(), SourceError> {
        let child = object.identifier.clone();
        self.insert(object);

        let mut state = self.state.lock().unwrap();
        let parent_object = state
            .objects
            .get_mut(&parent.key_string())
            .ok_or_else(|| SourceError::NotFound(parent.key_string()))?;
        let children = parent_object.composition.get_or_insert_with(Vec::new);
        children.push(child);
        let updated = children.clone();
        state.notify(parent, ObservedProperty::Composition, Change::CompositionChanged(updated));
        Ok(())
    }

    /// Rename an object, firing name observers.
    pub fn set_name(&self, identifier: &Identifier, name: impl Into<String>) -> Result<(), SourceError> {
        let name = name.into();
        let mut state = self.state.lock().unwrap();
        let object = state
            .objects
            .get_mut(&identifier.key_string())
            .ok_or_else(|| SourceError::NotFound(identifier.key_string()))?;
        object.name = name.clone();
        state.notify(identifier, ObservedProperty::Name, Change::NameChanged(name));
        Ok(())
    }

    /// Replace an object's composition, firing composition observers.
    pub fn set_composition(
        &self,
        identifier: &Identifier,
        children: Vec<Identifier>,
    ) -> Result<(), SourceError> {
        let mut state = self.state.lock().unwrap();
        let object = state
            .objects
            .get_mut(&identifier.key_string())
            .ok_or_else(|| SourceError::NotFound(identifier.key_string()))?;
        object.composition = Some(children.clone());
        state.notify(
            identifier,
            ObservedProperty::Composition,
            Change::CompositionChanged(children),
        );
        Ok(())
    }

    /// Mark a namespace as owned by a provider with native search; its
    /// identifiers bypass the fallback index.
    pub fn mark_searchable(&self, namespace: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state.searchable_namespaces.insert(namespace.into());
    }

    /// Make the next `get` for an identifier fail, for failure-path tests.
    pub fn fail_fetch(&self, identifier: &Identifier) {
        let mut state = self.state.lock().unwrap();
        state.failing_fetches.insert(identifier.key_string());
    }

    /// Create an annotation object.
    ///
    /// Validates synchronously: the kind must be known and at least one
    /// target is required.
    pub fn create_annotation(
        &self,
        name: impl Into<String>,
        kind: &str,
        targets: BTreeMap<String, TargetDetail>,
        tags: Vec<String>,
    ) -> Result<DomainObject, AnnotationError> {
        let annotation_kind: AnnotationKind = kind
            .parse()
            .map_err(|_| AnnotationError::UnknownKind(kind.to_string()))?;
        if targets.is_empty() {
            return Err(AnnotationError::MissingTarget);
        }

        let mut state = self.state.lock().unwrap();
        state.next_annotation_seq += 1;
        let identifier = Identifier::new(
            "annotations",
            format!("annotation-{}", state.next_annotation_seq),
        );

        let mut object = DomainObject::new(identifier.clone(), KIND_ANNOTATION, name);
        object.annotation = Some(AnnotationPayload {
            annotation_kind,
            targets,
            tags,
        });
        state.objects.insert(identifier.key_string(), object.clone());
        debug!(key_string = %identifier, "Created annotation");
        Ok(object)
    }

    /// Append a tag to an existing annotation, firing name observers so
    /// the index refreshes its snapshot.
    pub fn add_tag(&self, identifier: &Identifier, tag: impl Into<String>) -> Result<(), AnnotationError> {
        self.with_annotation(identifier, |payload| {
            payload.tags.push(tag.into());
            Ok(())
        })
    }

    /// Remove a tag from an annotation. Removing a tag the annotation does
    /// not carry is a caller error, not a silent no-op.
    pub fn remove_tag(&self, identifier: &Identifier, tag: &str) -> Result<(), AnnotationError> {
        self.with_annotation(identifier, |payload| {
            let before = payload.tags.len();
            payload.tags.retain(|t| t != tag);
            if payload.tags.len() == before {
                return Err(AnnotationError::TagNotPresent {
                    tag: tag.to_string(),
                    key_string: identifier.key_string(),
                });
            }
            Ok(())
        })
    }

    /// Update an existing annotation's payload.
    pub fn change_annotation(
        &self,
        identifier: &Identifier,
        update: impl FnOnce(&mut AnnotationPayload),
    ) -> Result<(), AnnotationError> {
        self.with_annotation(identifier, |payload| {
            update(payload);
            Ok(())
        })
    }

    fn with_annotation(
        &self,
        identifier: &Identifier,
        apply: impl FnOnce(&mut AnnotationPayload) -> Result<(), AnnotationError>,
    ) -> Result<(), AnnotationError> {
        let mut state = self.state.lock().unwrap();
        let object = state
            .objects
            .get_mut(&identifier.key_string())
            .ok_or_else(|| AnnotationError::NotFound(identifier.key_string()))?;
        let payload = object
            .annotation
            .as_mut()
            .ok_or_else(|| AnnotationError::NotAnAnnotation(identifier.key_string()))?;
        apply(payload)?;

        let name = object.name.clone();
        state.notify(identifier, ObservedProperty::Name, Change::NameChanged(name));
        Ok(())
    }
}

impl Default for InMemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectGraph for InMemoryGraph {
    async fn get(&self, identifier: &Identifier) -> Result<DomainObject, SourceError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_fetches.remove(&identifier.key_string()) {
            return Err(SourceError::FetchFailed {
                key_string: identifier.key_string(),
                reason: "injected fetch failure".to_string(),
            });
        }
        state
            .objects
            .get(&identifier.key_string())
            .cloned()
            .ok_or_else(|| SourceError::NotFound(identifier.key_string()))
    }

    fn provider(&self, identifier: &Identifier) -> ProviderInfo {
        let state = self.state.lock().unwrap();
        ProviderInfo {
            supports_search: state.searchable_namespaces.contains(&identifier.namespace),
        }
    }

    async fn composition(&self, object: &DomainObject) -> Result<Vec<Identifier>, SourceError> {
        // Load the current list from the graph, not the caller's snapshot.
        let state = self.state.lock().unwrap();
        Ok(state
            .objects
            .get(&object.identifier.key_string())
            .and_then(|o| o.composition.clone())
            .unwrap_or_default())
    }

    fn observe(
        &self,
        identifier: &Identifier,
        property: ObservedProperty,
        sink: ChangeSink,
    ) -> ObserverHandle {
        let key = (identifier.key_string(), property);
        let id = {
            let mut state = self.state.lock().unwrap();
            let id = state.next_observer_id;
            state.next_observer_id += 1;
            state.observers.entry(key.clone()).or_default().insert(id, sink);
            id
        };

        let state = Arc::clone(&self.state);
        ObserverHandle::new(move || {
            let mut state = state.lock().unwrap();
            if let Some(sinks) = state.observers.get_mut(&key) {
                sinks.remove(&id);
            }
        })
    }

    fn root(&self) -> Identifier {
        self.root.clone()
    }

    async fn loaded_annotations(&self) -> Vec<Identifier> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .values()
            .filter(|o| o.is_annotation())
            .map(|o| o.identifier.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn folder(key: &str, name: &str) -> DomainObject {
        DomainObject::new(Identifier::bare(key), "folder", name)
    }

    #[tokio::test]
    async fn test_get_and_not_found() {
        let graph = InMemoryGraph::new();
        graph.insert(folder("a", "Alpha"));

        let fetched = graph.get(&Identifier::bare("a")).await.unwrap();
        assert_eq!(fetched.name, "Alpha");

        let missing = graph.get(&Identifier::bare("nope")).await;
        assert!(matches!(missing, Err(SourceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_name_notifies_observers() {
        let graph = InMemoryGraph::new();
        graph.insert(folder("a", "Alpha"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = graph.observe(&Identifier::bare("a"), ObservedProperty::Name, tx);

        graph.set_name(&Identifier::bare("a"), "Renamed").unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.identifier, Identifier::bare("a"));
        assert!(matches!(event.change, Change::NameChanged(ref n) if n == "Renamed"));
    }

    #[tokio::test]
    async fn test_released_observer_receives_nothing() {
        let graph = InMemoryGraph::new();
        graph.insert(folder("a", "Alpha"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handle = graph.observe(&Identifier::bare("a"), ObservedProperty::Name, tx);
        handle.release();

        graph.set_name(&Identifier::bare("a"), "Renamed").unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_insert_under_notifies_composition() {
        let graph = InMemoryGraph::new();
        let root = graph.root();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = graph.observe(&root, ObservedProperty::Composition, tx);

        graph.insert_under(folder("a", "Alpha"), &root).unwrap();

        let event = rx.recv().await.unwrap();
        match event.change {
            Change::CompositionChanged(children) => {
                assert_eq!(children, vec![Identifier::bare("a")]);
            }
            other => panic!("unexpected change: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_composition_loads_current_list() {
        let graph = InMemoryGraph::new();
        let root = graph.root();
        let stale_root = graph.get(&root).await.unwrap();

        graph.insert_under(folder("a", "Alpha"), &root).unwrap();

        // Loading through a stale snapshot still sees the new child.
        let children = graph.composition(&stale_root).await.unwrap();
        assert_eq!(children, vec![Identifier::bare("a")]);
    }

    #[tokio::test]
    async fn test_provider_capability() {
        let graph = InMemoryGraph::new();
        graph.mark_searchable("tlm");

        assert!(graph.provider(&Identifier::new("tlm", "x")).supports_search);
        assert!(!graph.provider(&Identifier::bare("x")).supports_search);
    }

    #[tokio::test]
    async fn test_fail_fetch_is_one_shot() {
        let graph = InMemoryGraph::new();
        graph.insert(folder("a", "Alpha"));
        graph.fail_fetch(&Identifier::bare("a"));

        assert!(graph.get(&Identifier::bare("a")).await.is_err());
        assert!(graph.get(&Identifier::bare("a")).await.is_ok());
    }

    #[test]
    fn test_create_annotation_unknown_kind() {
        let graph = InMemoryGraph::new();
        let mut targets = BTreeMap::new();
        targets.insert("a".to_string(), TargetDetail::default());

        let err = graph
            .create_annotation("note", "doodle", targets, vec![])
            .unwrap_err();
        assert!(matches!(err, AnnotationError::UnknownKind(_)));
    }

    #[test]
    fn test_create_annotation_requires_target() {
        let graph = InMemoryGraph::new();
        let err = graph
            .create_annotation("note", "notebook", BTreeMap::new(), vec![])
            .unwrap_err();
        assert!(matches!(err, AnnotationError::MissingTarget));
    }

    #[test]
    fn test_remove_tag_not_present() {
        let graph = InMemoryGraph::new();
        let mut targets = BTreeMap::new();
        targets.insert("a".to_string(), TargetDetail::default());
        let annotation = graph
            .create_annotation("note", "notebook", targets, vec!["t1".to_string()])
            .unwrap();

        let err = graph.remove_tag(&annotation.identifier, "t2").unwrap_err();
        assert!(matches!(err, AnnotationError::TagNotPresent { .. }));

        graph.remove_tag(&annotation.identifier, "t1").unwrap();
    }

    #[test]
    fn test_change_missing_annotation() {
        let graph = InMemoryGraph::new();
        let err = graph
            .change_annotation(&Identifier::bare("nope"), |_| {})
            .unwrap_err();
        assert!(matches!(err, AnnotationError::NotFound(_)));
    }

    #[test]
    fn test_change_non_annotation() {
        let graph = InMemoryGraph::new();
        graph.insert(folder("a", "Alpha"));
        let err = graph
            .change_annotation(&Identifier::bare("a"), |_| {})
            .unwrap_err();
        assert!(matches!(err, AnnotationError::NotAnAnnotation(_)));
    }

    #[tokio::test]
    async fn test_loaded_annotations() {
        let graph = InMemoryGraph::new();
        let mut targets = BTreeMap::new();
        targets.insert("a".to_string(), TargetDetail::default());
        let annotation = graph
            .create_annotation("note", "notebook", targets, vec![])
            .unwrap();

        let loaded = graph.loaded_annotations().await;
        assert_eq!(loaded, vec![annotation.identifier]);
    }
}
