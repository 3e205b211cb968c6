//! Query error types.

use thiserror::Error;

use crate::message::Operation;

/// Errors from query dispatch and execution.
///
/// Backend-side execution failures never reach callers as errors; they go
/// to the dedicated error channel and the affected query stays pending.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Request input does not fit the operation
    #[error("Malformed {operation:?} request: {reason}")]
    Malformed {
        operation: Operation,
        reason: String,
    },

    /// The coordinator's result path was torn down while a query waited
    #[error("Query coordinator is shut down")]
    CoordinatorClosed,
}
