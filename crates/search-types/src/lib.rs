//! # search-types
//!
//! Shared domain types for the graph-search subsystem.
//!
//! This crate defines the core data structures used throughout the system:
//! - Identifiers: structural `{namespace, key}` names with a canonical
//!   key-string encoding
//! - Domain objects: nodes of the hierarchical object graph being indexed
//! - Index entries: denormalized snapshots used for matching
//! - Tags: the consumed `{id, label}` shape of the tag dictionary
//! - Config: layered configuration for the subsystem

pub mod config;
pub mod entry;
pub mod error;
pub mod identifier;
pub mod object;
pub mod tag;

pub use config::{BackendMode, SearchConfig};
pub use entry::{IndexEntry, TargetDetail};
pub use error::CoreError;
pub use identifier::Identifier;
pub use object::{AnnotationKind, AnnotationPayload, DomainObject, KIND_ANNOTATION, KIND_ROOT};
pub use tag::TagDefinition;
