//! Denormalized index entries.
//!
//! An `IndexEntry` is a point-in-time copy of the fields search matches
//! against; its lifetime is independent of the source object and it is
//! refreshed only by explicit re-indexing. The same shape travels in
//! backend response messages, so it serializes with the wire field names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::object::DomainObject;

/// Per-target detail on an annotation entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDetail {
    /// Notebook entry id, when the target is a specific entry rather than
    /// the whole object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
}

/// Denormalized snapshot of one indexed object.
///
/// `tags` and `targets` are present only for annotation-kind entries, which
/// are additionally indexed under each target key string and each tag id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub key_string: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<BTreeMap<String, TargetDetail>>,
}

impl IndexEntry {
    /// Snapshot the matchable fields of a domain object.
    pub fn from_object(object: &DomainObject) -> Self {
        let (tags, targets) = match &object.annotation {
            Some(payload) => (
                Some(payload.tags.clone()),
                Some(payload.targets.clone()),
            ),
            None => (None, None),
        };
        Self {
            key_string: object.identifier.key_string(),
            kind: object.kind.clone(),
            name: object.name.clone(),
            tags,
            targets,
        }
    }

    pub fn is_annotation(&self) -> bool {
        self.tags.is_some() || self.targets.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use crate::object::{AnnotationKind, AnnotationPayload, KIND_ANNOTATION};

    #[test]
    fn test_snapshot_generic_object() {
        let obj = DomainObject::new(Identifier::new("ns", "a"), "folder", "Alpha");
        let entry = IndexEntry::from_object(&obj);
        assert_eq!(entry.key_string, "ns:a");
        assert_eq!(entry.kind, "folder");
        assert_eq!(entry.name, "Alpha");
        assert!(!entry.is_annotation());
    }

    #[test]
    fn test_snapshot_is_independent_of_source() {
        let mut obj = DomainObject::new(Identifier::bare("a"), "folder", "Before");
        let entry = IndexEntry::from_object(&obj);
        obj.name = "After".to_string();
        // Point-in-time copy: mutating the object does not touch the entry.
        assert_eq!(entry.name, "Before");
    }

    #[test]
    fn test_snapshot_annotation() {
        let mut targets = BTreeMap::new();
        targets.insert(
            "ns:a".to_string(),
            TargetDetail {
                entry_id: Some("entry-1".to_string()),
            },
        );
        let mut obj = DomainObject::new(Identifier::bare("ann"), KIND_ANNOTATION, "A note");
        obj.annotation = Some(AnnotationPayload {
            annotation_kind: AnnotationKind::Notebook,
            targets,
            tags: vec!["tag-1".to_string()],
        });

        let entry = IndexEntry::from_object(&obj);
        assert!(entry.is_annotation());
        assert_eq!(entry.tags.as_ref().unwrap(), &["tag-1".to_string()]);
        assert!(entry.targets.as_ref().unwrap().contains_key("ns:a"));
    }

    #[test]
    fn test_wire_field_names() {
        let obj = DomainObject::new(Identifier::new("ns", "a"), "folder", "Alpha");
        let json = serde_json::to_value(IndexEntry::from_object(&obj)).unwrap();
        assert_eq!(json["keyString"], "ns:a");
        assert_eq!(json["type"], "folder");
        assert_eq!(json["name"], "Alpha");
        assert!(json.get("tags").is_none());
    }
}
