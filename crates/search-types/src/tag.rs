//! The consumed shape of the tag dictionary.
//!
//! The dictionary's content is owned by the surrounding system; this
//! subsystem only consumes `{id, label}` pairs for tag-expansion during
//! tag search.

use serde::{Deserialize, Serialize};

/// One tag definition from the host's tag dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDefinition {
    pub id: String,
    pub label: String,
}

impl TagDefinition {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Case-insensitive label substring match, the expansion rule for
    /// text tag queries.
    pub fn label_matches(&self, text: &str) -> bool {
        self.label.to_lowercase().contains(&text.to_lowercase())
    }
}
