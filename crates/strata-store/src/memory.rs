//! In-memory storage backend

use std::collections::BTreeMap;

use crate::{KeyPattern, Result, Storage};

/// A [`Storage`] adapter over an ordered in-process map.
///
/// Useful for tests and for embedding fixed configuration trees.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
    closed: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            closed: false,
        }
    }

    /// Direct view of the stored entries.
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn matching(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = KeyPattern::new(pattern)?;
        if pattern.is_literal() {
            return Ok(self
                .entries
                .contains_key(pattern.as_str())
                .then(|| pattern.as_str().to_string())
                .into_iter()
                .collect());
        }
        Ok(self
            .entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect())
    }
}

impl Storage for MemoryStorage {
    fn get(&mut self, pattern: &str) -> Result<Option<String>> {
        Ok(self
            .matching(pattern)?
            .first()
            .and_then(|key| self.entries.get(key))
            .cloned())
    }

    fn get_many(
        &mut self,
        pattern: &str,
        exclude: Option<&str>,
    ) -> Result<BTreeMap<String, String>> {
        let exclude = exclude.map(KeyPattern::new).transpose()?;
        Ok(self
            .matching(pattern)?
            .into_iter()
            .filter(|key| !exclude.as_ref().is_some_and(|p| p.matches(key)))
            .filter_map(|key| self.entries.get(&key).map(|v| (key, v.clone())))
            .collect())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<bool> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    fn keys(&mut self, pattern: &str) -> Result<Vec<String>> {
        self.matching(pattern)
    }

    fn delete(&mut self, pattern: &str) -> Result<Vec<String>> {
        let keys = self.matching(pattern)?;
        for key in &keys {
            self.entries.remove(key);
        }
        Ok(keys)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
