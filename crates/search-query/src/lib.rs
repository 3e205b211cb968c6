//! # search-query
//!
//! The query half of the subsystem:
//! - [`ExecutionBackend`]: one four-operation contract with two variants,
//!   offloaded (shared background worker, message passing) and local
//!   (synchronous evaluation), both funneling through one shared
//!   result-handling path
//! - [`QueryCoordinator`]: correlates outstanding searches by query id and
//!   hydrates raw matches into full objects
//! - [`SearchService`]: the facade embedding hosts call

pub mod backend;
pub mod coordinator;
pub mod error;
pub mod message;
pub mod service;

pub use backend::{ExecutionBackend, LocalBackend, OffloadedBackend};
pub use coordinator::{QueryCoordinator, SearchResults};
pub use error::QueryError;
pub use message::{Operation, QueryInput, QueryRequest, QueryResponse};
pub use service::SearchService;
