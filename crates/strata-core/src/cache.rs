//! In-process layer cache
//!
//! Maps fully-qualified paths (root prefix included, attribute suffix
//! stripped) to the last layer fetched or written. Unbounded and never
//! evicted; owned by a single [`ConfigManager`](crate::ConfigManager).

use std::collections::BTreeMap;
use strata_store::{Attributes, KeyPattern};

use crate::{Document, Result};

/// One stored layer: raw text plus optional version attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub text: String,
    pub attrs: Option<Attributes>,
}

impl Layer {
    pub fn new(text: impl Into<String>, attrs: Option<Attributes>) -> Self {
        Self {
            text: text.into(),
            attrs,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct LayerCache {
    layers: BTreeMap<String, Layer>,
}

impl LayerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&Layer> {
        self.layers.get(path)
    }

    pub fn insert(&mut self, path: impl Into<String>, layer: Layer) {
        self.layers.insert(path.into(), layer);
    }

    pub fn remove(&mut self, path: &str) -> Option<Layer> {
        self.layers.remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.layers.contains_key(path)
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Cached paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Nested view of cached paths starting with `pattern`.
    ///
    /// Each path segment becomes a mapping level; leaves are empty mappings.
    /// `*` in the pattern matches any run of characters.
    pub fn tree(&self, pattern: &str) -> Result<Document> {
        let pattern = KeyPattern::prefix(pattern)?;
        let mut tree = serde_json::Map::new();
        for path in self.paths().filter(|p| pattern.matches(p)) {
            let mut node = &mut tree;
            for segment in path.split(':') {
                let child = node
                    .entry(segment.to_string())
                    .or_insert_with(|| Document::Object(serde_json::Map::new()));
                if !child.is_object() {
                    *child = Document::Object(serde_json::Map::new());
                }
                let Document::Object(map) = child else {
                    unreachable!("node was just made a mapping");
                };
                node = map;
            }
        }
        Ok(Document::Object(tree))
    }
}
