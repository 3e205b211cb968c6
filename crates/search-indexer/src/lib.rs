//! # search-indexer
//!
//! Incremental index construction over the object graph:
//! - [`IndexScheduler`]: admission-controlled queue turning identifiers
//!   into fetch+index work, bounded by a concurrency ceiling
//! - [`Indexer`]: converts fetched objects into index entries, registers
//!   mutation observers, and discovers children to schedule
//! - [`ChangeObserver`]: drains mutation notifications and feeds the
//!   indexer and scheduler
//!
//! The index is built as a lazy breadth-first walk from the root, not an
//! eager upfront traversal.

pub mod error;
pub mod indexer;
pub mod observer;
pub mod scheduler;

pub use error::IndexingError;
pub use indexer::Indexer;
pub use observer::ChangeObserver;
pub use scheduler::{IndexScheduler, SchedulerStats};
