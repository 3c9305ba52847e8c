//! The storage port
//!
//! Every backend kind implements [`Storage`]. Keys are `:`-delimited
//! hierarchical strings and every `pattern` argument accepts `*` as a
//! wildcard (see [`KeyPattern`](crate::KeyPattern)).
//!
//! Calls are synchronous and block the caller; any timeout or retry
//! behaviour belongs to the adapter.

use std::collections::BTreeMap;

use crate::Result;

/// Minimal key-value interface a configuration backend must provide.
pub trait Storage: Send {
    /// Fetch the value of the first key matching `pattern`.
    fn get(&mut self, pattern: &str) -> Result<Option<String>>;

    /// Fetch every key matching `pattern`, skipping keys matching `exclude`.
    ///
    /// An empty map means nothing matched.
    fn get_many(&mut self, pattern: &str, exclude: Option<&str>)
    -> Result<BTreeMap<String, String>>;

    /// Upsert one key. Returns whether the backend reports a write.
    fn set(&mut self, key: &str, value: &str) -> Result<bool>;

    /// Upsert many keys. Returns false when there was nothing to write.
    fn set_many(&mut self, entries: &BTreeMap<String, String>) -> Result<bool> {
        if entries.is_empty() {
            return Ok(false);
        }
        let mut written = false;
        for (key, value) in entries {
            written |= self.set(key, value)?;
        }
        Ok(written)
    }

    /// List keys matching `pattern`, sorted.
    fn keys(&mut self, pattern: &str) -> Result<Vec<String>>;

    /// Delete every key matching `pattern`, returning the deleted keys.
    fn delete(&mut self, pattern: &str) -> Result<Vec<String>>;

    /// Delete every key matching any of `patterns`.
    fn delete_many(&mut self, patterns: &[String]) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for pattern in patterns {
            deleted.extend(self.delete(pattern)?);
        }
        Ok(deleted)
    }

    /// Release the backend's resources.
    fn close(&mut self) -> Result<()>;

    /// Whether stored keys may carry `#name=value` attribute suffixes.
    fn supports_attributes(&self) -> bool {
        true
    }
}
