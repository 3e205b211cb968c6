//! Backend message shapes.
//!
//! Both backend variants honor these identically: requests carry
//! `{operation, input, maxResults, queryId}`, responses carry
//! `{queryId, total, results}` with results in backend order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use search_types::IndexEntry;

/// The four search operations of the backend contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    SearchByName,
    SearchByAnnotationTarget,
    SearchByTag,
    SearchByNotebookEntry,
}

/// Operation input: free text for name/target/tag search, a structured
/// pair for notebook-entry search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, rename_all = "camelCase")]
pub enum QueryInput {
    Text(String),
    NotebookEntry {
        #[serde(rename = "targetKeyString")]
        target_key_string: String,
        #[serde(rename = "entryId")]
        entry_id: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub operation: Operation,
    pub input: QueryInput,
    pub max_results: usize,
    pub query_id: Uuid,
}

/// Result message. `total` is the pre-truncation match count; `results`
/// is truncated to the request's `max_results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub query_id: Uuid,
    pub total: usize,
    pub results: Vec<IndexEntry>,
}
