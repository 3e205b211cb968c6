//! The consumed surface of the object graph source.

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use search_types::{DomainObject, Identifier};

use crate::error::SourceError;
use crate::handle::ObserverHandle;

/// The observable properties of a domain object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservedProperty {
    Name,
    Composition,
}

/// The payload of a mutation notification.
#[derive(Debug, Clone)]
pub enum Change {
    NameChanged(String),
    CompositionChanged(Vec<Identifier>),
}

/// One mutation notification delivered to an observer sink.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub identifier: Identifier,
    pub change: Change,
}

/// Where mutation notifications are delivered.
pub type ChangeSink = UnboundedSender<ChangeEvent>;

/// Capabilities of the provider owning an identifier's namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderInfo {
    /// Providers that can search themselves bypass the fallback index
    /// entirely; their objects are never scheduled.
    pub supports_search: bool,
}

/// Access to the hierarchical object graph.
///
/// Implemented by the host application's storage layer; the subsystem only
/// consumes this surface. All methods must be callable from concurrent
/// tasks.
#[async_trait]
pub trait ObjectGraph: Send + Sync {
    /// Fetch the object named by an identifier. May fail; indexing treats
    /// failures as droppable, not retryable.
    async fn get(&self, identifier: &Identifier) -> Result<DomainObject, SourceError>;

    /// Capability probe for the provider owning this identifier.
    fn provider(&self, identifier: &Identifier) -> ProviderInfo;

    /// Load the current child-identifier list for an object that exposes
    /// composition. Returns an empty list for leaf objects.
    async fn composition(&self, object: &DomainObject) -> Result<Vec<Identifier>, SourceError>;

    /// Register a mutation observer on (object, property). Notifications
    /// are delivered to `sink`; the returned handle releases the
    /// registration exactly once.
    fn observe(
        &self,
        identifier: &Identifier,
        property: ObservedProperty,
        sink: ChangeSink,
    ) -> ObserverHandle;

    /// The synthetic root identifier of the graph.
    fn root(&self) -> Identifier;

    /// Identifiers of annotation objects already materialized; seeded into
    /// the index at startup.
    async fn loaded_annotations(&self) -> Vec<Identifier>;
}
