//! # search-store
//!
//! The denormalized index store: primary, target-centric, and tag-centric
//! maps, plus the match evaluation both execution backend variants rely
//! on.
//!
//! Writers: the indexer only. Readers: the execution backends. All maps
//! live behind one `RwLock`, never held across an await point.

pub mod store;

pub use store::{IndexStats, IndexStore};
