//! Error types for object graph access and annotation operations.

use thiserror::Error;

/// Errors raised by an object graph source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No object exists for the identifier
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The underlying source failed to produce the object
    #[error("Fetch failed for {key_string}: {reason}")]
    FetchFailed { key_string: String, reason: String },
}

/// Caller-facing validation errors for annotation operations.
///
/// These are raised synchronously at the call site rather than failing
/// silently.
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// Annotation kind not in the known set
    #[error("Unknown annotation kind: {0}")]
    UnknownKind(String),

    /// Annotations require at least one target
    #[error("Annotation must have at least one target")]
    MissingTarget,

    /// Attempted to remove a tag the annotation does not carry
    #[error("Tag '{tag}' is not present on annotation {key_string}")]
    TagNotPresent { tag: String, key_string: String },

    /// Attempted to change an annotation that does not exist
    #[error("No annotation exists for {0}")]
    NotFound(String),

    /// The identifier names an object that is not an annotation
    #[error("Object {0} is not an annotation")]
    NotAnAnnotation(String),
}
