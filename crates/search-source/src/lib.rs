//! # search-source
//!
//! The object graph source seam: the trait through which the indexing
//! subsystem fetches objects, loads composition, probes provider
//! capabilities, and observes mutations. Also ships an in-memory reference
//! implementation used by tests and embedding hosts.
//!
//! The graph itself (persistence, business rules) belongs to the host
//! application; this crate only defines the consumed surface.

pub mod error;
pub mod graph;
pub mod handle;
pub mod memory;

pub use error::{AnnotationError, SourceError};
pub use graph::{Change, ChangeEvent, ChangeSink, ObjectGraph, ObservedProperty, ProviderInfo};
pub use handle::ObserverHandle;
pub use memory::InMemoryGraph;
