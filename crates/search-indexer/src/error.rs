//! Indexing error types.

use thiserror::Error;

use search_source::SourceError;

/// Errors that can occur during indexing operations.
#[derive(Debug, Error)]
pub enum IndexingError {
    /// Object graph access failed
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The observer task was already started
    #[error("Change observer is already running")]
    AlreadyRunning,

    /// The observer task was never started
    #[error("Change observer is not running")]
    NotRunning,
}
