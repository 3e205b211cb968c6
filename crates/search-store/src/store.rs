//! The index store proper.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use search_types::{IndexEntry, TagDefinition};

#[derive(Default)]
struct StoreState {
    /// keyString -> denormalized entry. The universal map.
    primary: HashMap<String, IndexEntry>,
    /// tag id -> entry keyStrings carrying that tag, insertion-ordered.
    by_tag: HashMap<String, Vec<String>>,
    /// target keyString -> annotation entry keyStrings about that target.
    by_target: HashMap<String, Vec<String>>,
    /// Consumed tag dictionary, in definition order for deterministic
    /// tag expansion.
    tags: Vec<TagDefinition>,
}

impl StoreState {
    /// Remove an entry key from every secondary bucket. Used before
    /// re-inserting so a refreshed snapshot rebuilds its own membership.
    fn evict_from_buckets(&mut self, key_string: &str) {
        for bucket in self.by_tag.values_mut() {
            bucket.retain(|k| k != key_string);
        }
        for bucket in self.by_target.values_mut() {
            bucket.retain(|k| k != key_string);
        }
    }

    fn resolve(&self, keys: &[String]) -> Vec<IndexEntry> {
        keys.iter()
            .filter_map(|k| self.primary.get(k).cloned())
            .collect()
    }
}

/// Snapshot of store occupancy, for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub entries: usize,
    pub annotation_entries: usize,
    pub tags_defined: usize,
}

/// The in-memory index store.
///
/// Entries are point-in-time snapshots; re-inserting under the same
/// key string replaces the primary snapshot and rebuilds that entry's
/// secondary bucket membership. Distinct entries sharing a tag or target
/// simply accumulate in the bucket.
#[derive(Default)]
pub struct IndexStore {
    state: RwLock<StoreState>,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh one entry.
    pub fn insert(&self, entry: IndexEntry) {
        let mut state = self.state.write().unwrap();
        state.evict_from_buckets(&entry.key_string);

        if let Some(tags) = &entry.tags {
            for tag in tags {
                state
                    .by_tag
                    .entry(tag.clone())
                    .or_default()
                    .push(entry.key_string.clone());
            }
        }
        if let Some(targets) = &entry.targets {
            for target_key in targets.keys() {
                state
                    .by_target
                    .entry(target_key.clone())
                    .or_default()
                    .push(entry.key_string.clone());
            }
        }

        debug!(key_string = %entry.key_string, kind = %entry.kind, "Indexed entry");
        state.primary.insert(entry.key_string.clone(), entry);
    }

    pub fn contains(&self, key_string: &str) -> bool {
        self.state.read().unwrap().primary.contains_key(key_string)
    }

    pub fn get(&self, key_string: &str) -> Option<IndexEntry> {
        self.state.read().unwrap().primary.get(key_string).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap().primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.state.read().unwrap();
        IndexStats {
            entries: state.primary.len(),
            annotation_entries: state.primary.values().filter(|e| e.is_annotation()).count(),
            tags_defined: state.tags.len(),
        }
    }

    /// Register or update one tag definition from the host's dictionary.
    pub fn define_tag(&self, tag: TagDefinition) {
        let mut state = self.state.write().unwrap();
        if let Some(existing) = state.tags.iter_mut().find(|t| t.id == tag.id) {
            *existing = tag;
        } else {
            state.tags.push(tag);
        }
    }

    /// Case-insensitive substring match over entry names. Empty or
    /// whitespace-only input matches nothing.
    pub fn matches_by_name(&self, input: &str) -> Vec<IndexEntry> {
        let needle = input.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let state = self.state.read().unwrap();
        state
            .primary
            .values()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Direct key lookup: annotations about a target.
    pub fn matches_by_target(&self, target_key: &str) -> Vec<IndexEntry> {
        let state = self.state.read().unwrap();
        state
            .by_target
            .get(target_key)
            .map(|keys| state.resolve(keys))
            .unwrap_or_default()
    }

    /// Expand a text query to tag ids by label substring, then look each
    /// id up in the tag-centric map. Per-tag result lists are concatenated
    /// as-is: an entry carrying two matching tags appears twice.
    pub fn matches_by_tag_text(&self, input: &str) -> Vec<IndexEntry> {
        let needle = input.trim();
        if needle.is_empty() {
            return Vec::new();
        }
        let state = self.state.read().unwrap();
        let mut results = Vec::new();
        for tag in state.tags.iter().filter(|t| t.label_matches(needle)) {
            if let Some(keys) = state.by_tag.get(&tag.id) {
                results.extend(state.resolve(keys));
            }
        }
        results
    }

    /// Target lookup narrowed to annotations whose target detail carries
    /// exactly this entry id.
    pub fn matches_by_notebook_entry(&self, target_key: &str, entry_id: &str) -> Vec<IndexEntry> {
        self.matches_by_target(target_key)
            .into_iter()
            .filter(|e| {
                e.targets
                    .as_ref()
                    .and_then(|targets| targets.get(target_key))
                    .and_then(|detail| detail.entry_id.as_deref())
                    .is_some_and(|id| id == entry_id)
            })
            .collect()
    }
}
