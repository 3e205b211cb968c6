//! Structural object identifiers and their canonical key-string encoding.
//!
//! Identifiers are compared by value, never by reference: two `Identifier`
//! values naming the same object are equal regardless of where they came
//! from. The key string is the universal index key used by every map in the
//! index store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Structural `{namespace, key}` pair naming an object in the graph.
///
/// The canonical string encoding (`Display` / `FromStr`) is
/// `namespace:key`, or the bare key when the namespace is empty.
/// Namespaces must not contain `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier {
    pub namespace: String,
    pub key: String,
}

impl Identifier {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    /// Identifier with an empty namespace.
    pub fn bare(key: impl Into<String>) -> Self {
        Self::new("", key)
    }

    /// Canonical key-string encoding, the universal index key.
    pub fn key_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}:{}", self.namespace, self.key)
        }
    }
}

impl FromStr for Identifier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CoreError::InvalidIdentifier(
                "key string must not be empty".to_string(),
            ));
        }
        match s.split_once(':') {
            Some((namespace, key)) => {
                if key.is_empty() {
                    return Err(CoreError::InvalidIdentifier(format!(
                        "key string '{}' has an empty key",
                        s
                    )));
                }
                Ok(Self::new(namespace, key))
            }
            None => Ok(Self::bare(s)),
        }
    }
}
