//! Namespace/collection filter for private data reads.

use std::collections::{HashMap, HashSet};

/// A set of `(namespace, collection)` pairs.
///
/// An absent filter (`None` at the query surface) is the identity; an empty
/// filter matches nothing.
#[derive(Debug, Clone, Default)]
pub struct PvtNsCollFilter {
    entries: HashMap<String, HashSet<String>>,
}

impl PvtNsCollFilter {
    /// Create an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `(namespace, collection)` pair.
    pub fn add(&mut self, namespace: &str, collection: &str) {
        self.entries
            .entry(namespace.to_string())
            .or_default()
            .insert(collection.to_string());
    }

    /// Whether any collection of `namespace` is in the filter.
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.entries.contains_key(namespace)
    }

    /// Whether `(namespace, collection)` is in the filter.
    pub fn contains(&self, namespace: &str, collection: &str) -> bool {
        self.entries.get(namespace).is_some_and(|colls| colls.contains(collection))
    }
}
