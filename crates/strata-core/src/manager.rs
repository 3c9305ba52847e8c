//! Resolution orchestrator
//!
//! [`ConfigManager`] resolves a path by walking its prefixes from general to
//! specific, expanding each prefix's alternation groups, and folding every
//! layer found onto an accumulator with the [`MergeEngine`]. Placeholders are
//! expanded during the merge by looking other paths up through the same
//! manager.
//!
//! # Versioning
//!
//! With [`ManagerOptions::versioning`] enabled every write carries
//! [`Attributes`] encoded as a key suffix (`rc:app#rev=2#time=...#user=...`).
//! A rewrite deletes the previous revision's key and then writes the next
//! one. The two steps are not atomic: a reader in between sees the path as
//! absent, and two writers can both read revision `n` and both write `n + 1`.
//! Nothing here detects that race.

use chrono::Utc;
use std::collections::BTreeMap;
use strata_store::{
    ATTR_SUFFIX_PATTERN, Attributes, BackendConfig, Storage, logical_path, make_key, split_key,
};

use crate::cache::{Layer, LayerCache};
use crate::codec::{DocumentCodec, YamlCodec};
use crate::merge::MergeEngine;
use crate::placeholder::{self, PlaceholderError, PlaceholderResolver, PlaceholderSource};
use crate::{Document, Error, ManagerOptions, Result, combinator, path};

/// Resolves layered configuration from a storage backend.
///
/// Single-threaded: the cache is owned by this instance and every storage
/// call blocks.
pub struct ConfigManager {
    storage: Box<dyn Storage>,
    codec: Box<dyn DocumentCodec>,
    cache: LayerCache,
    engine: MergeEngine,
    options: ManagerOptions,
    /// Paths currently being looked up on behalf of a placeholder.
    resolving: Vec<String>,
}

impl ConfigManager {
    /// Create a manager over `storage`.
    ///
    /// Versioning is switched off when the backend cannot store attribute
    /// suffixes.
    pub fn new(storage: Box<dyn Storage>, mut options: ManagerOptions) -> Self {
        if options.versioning && !storage.supports_attributes() {
            tracing::warn!("Storage backend cannot carry attributes; versioning disabled");
            options.versioning = false;
        }
        Self {
            storage,
            codec: Box::new(YamlCodec),
            cache: LayerCache::new(),
            engine: MergeEngine::new(options.list_merge),
            options,
            resolving: Vec::new(),
        }
    }

    /// Open the backend described by `backend` and wrap it.
    pub fn open(backend: &BackendConfig, options: ManagerOptions) -> Result<Self> {
        let storage = strata_store::open(backend)?;
        Ok(Self::new(storage, options))
    }

    /// Replace the document codec.
    pub fn with_codec(mut self, codec: Box<dyn DocumentCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    pub fn is_versioned(&self) -> bool {
        self.options.versioning
    }

    pub fn cache(&self) -> &LayerCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn codec(&self) -> &dyn DocumentCodec {
        self.codec.as_ref()
    }

    /// Direct access to the storage backend, bypassing the cache.
    pub fn storage_mut(&mut self) -> &mut dyn Storage {
        self.storage.as_mut()
    }

    /// Resolve `path` through its full hierarchy.
    ///
    /// For `app:prod` the layers at `app` and then `app:prod` (each expanded
    /// by the combinator) are merged in order, later layers overriding
    /// earlier ones. Returns `None` when no layer exists at any prefix.
    pub fn get(&mut self, path: &str) -> Result<Option<Document>> {
        path::validate(path)?;
        let engine = self.engine;
        let mut config = Document::Null;
        let mut found = false;

        for prefix in path::prefixes(path) {
            for candidate in combinator::expand(&prefix) {
                let Some(layer) = self.get_one(&candidate)? else {
                    continue;
                };
                if placeholder::is_empty(&layer) {
                    continue;
                }
                tracing::debug!(path, layer = %candidate, "Folding layer");
                let mut resolver = PlaceholderResolver::new(self);
                config = engine.merge(config, layer, &mut resolver);
                found = true;
            }
        }

        Ok(found.then_some(config))
    }

    /// Resolve `path`, or with `recurse == false` return only the layer
    /// stored exactly at `path`.
    pub fn get_with(&mut self, path: &str, recurse: bool) -> Result<Option<Document>> {
        if recurse {
            self.get(path)
        } else {
            self.get_one(path)
        }
    }

    /// Decode the single layer stored at `path`.
    ///
    /// A miss is `None`, except in versioning mode where it is an empty
    /// mapping.
    pub fn get_one(&mut self, path: &str) -> Result<Option<Document>> {
        let document = match self.fetch(path)? {
            Some(layer) => self.decode(path, &layer.text)?,
            None => Document::Null,
        };
        if document.is_null() {
            return Ok(self
                .options
                .versioning
                .then(|| Document::Object(serde_json::Map::new())));
        }
        Ok(Some(document))
    }

    /// The raw text and attributes stored at `path`.
    pub fn get_one_source(&mut self, path: &str) -> Result<Option<Layer>> {
        self.fetch(path)
    }

    /// Store `value` at `path`.
    pub fn set(&mut self, path: &str, value: &str) -> Result<bool> {
        self.set_as(path, value, None)
    }

    /// Store `value` at `path`, recording `user` on versioned writes.
    ///
    /// Writing the text already stored is a successful no-op.
    pub fn set_as(&mut self, path: &str, value: &str, user: Option<&str>) -> Result<bool> {
        path::validate(path)?;
        if !self.options.versioning {
            return self.write_plain(path, value);
        }

        let existing = self.fetch(path)?;
        if existing.as_ref().is_some_and(|layer| layer.text == value) {
            tracing::debug!(path, "Layer unchanged; skipping write");
            return Ok(true);
        }
        let user = user.map_or_else(|| self.options.default_user.clone(), str::to_string);
        let attrs = next_attributes(existing.as_ref(), user)?;
        self.write_versioned(path, value, existing, attrs)
    }

    /// Store `value` at `path` with caller-supplied attributes.
    ///
    /// Attributes are ignored when versioning is off.
    pub fn set_with_attrs(&mut self, path: &str, value: &str, attrs: Attributes) -> Result<bool> {
        path::validate(path)?;
        if !self.options.versioning {
            tracing::debug!(path, "Versioning disabled; attributes ignored");
            return self.write_plain(path, value);
        }

        let existing = self.fetch(path)?;
        if existing.as_ref().is_some_and(|layer| layer.text == value) {
            return Ok(true);
        }
        self.write_versioned(path, value, existing, attrs)
    }

    /// Store several layers at once.
    ///
    /// Under versioning, unchanged paths are skipped, new revisions are
    /// written first and the superseded keys deleted afterwards. When the
    /// backend refuses the new revisions the previous ones stay in place.
    pub fn set_many(&mut self, values: &BTreeMap<String, String>) -> Result<bool> {
        for path in values.keys() {
            path::validate(path)?;
        }

        if !self.options.versioning {
            if values.is_empty() {
                return Ok(true);
            }
            let entries: BTreeMap<String, String> = values
                .iter()
                .map(|(path, value)| (self.full_path(path), value.clone()))
                .collect();
            let written = self.storage.set_many(&entries)?;
            if written {
                for (full, text) in entries {
                    self.cache.insert(full, Layer::new(text, None));
                }
            }
            return Ok(written);
        }

        let user = self.options.default_user.clone();
        let mut new_entries = BTreeMap::new();
        let mut superseded = Vec::new();
        let mut layers = Vec::new();
        for (path, value) in values {
            let existing = self.fetch(path)?;
            if existing.as_ref().is_some_and(|layer| &layer.text == value) {
                continue;
            }
            let full = self.full_path(path);
            if let Some(prev) = existing.as_ref().and_then(|layer| layer.attrs.as_ref()) {
                superseded.push(make_key(&full, Some(prev)));
            }
            let attrs = next_attributes(existing.as_ref(), user.clone())?;
            new_entries.insert(make_key(&full, Some(&attrs)), value.clone());
            layers.push((full, Layer::new(value.clone(), Some(attrs))));
        }

        if new_entries.is_empty() {
            return Ok(true);
        }
        if !self.storage.set_many(&new_entries)? {
            tracing::warn!(count = new_entries.len(), "Backend refused revisions; keeping previous ones");
            return Ok(false);
        }
        if !superseded.is_empty() {
            let deleted = self.storage.delete_many(&superseded)?;
            tracing::debug!(count = deleted.len(), "Deleted superseded revisions");
        }
        for (full, layer) in layers {
            self.cache.insert(full, layer);
        }
        Ok(true)
    }

    /// Delete the layers matching `pattern`. Returns whether anything was
    /// deleted.
    pub fn delete(&mut self, pattern: &str) -> Result<bool> {
        let storage_pattern = self.storage_pattern(pattern);
        let deleted = self.storage.delete(&storage_pattern)?;
        self.forget(&deleted);
        Ok(!deleted.is_empty())
    }

    /// Delete the layers matching any of `patterns`.
    pub fn delete_many<P: AsRef<str>>(&mut self, patterns: &[P]) -> Result<bool> {
        let storage_patterns: Vec<String> = patterns
            .iter()
            .map(|p| self.storage_pattern(p.as_ref()))
            .collect();
        let deleted = self.storage.delete_many(&storage_patterns)?;
        self.forget(&deleted);
        Ok(!deleted.is_empty())
    }

    /// Logical paths of stored layers matching `pattern`, sorted.
    pub fn keys(&mut self, pattern: &str) -> Result<Vec<String>> {
        let storage_pattern = self.storage_pattern(pattern);
        let mut paths: Vec<String> = self
            .storage
            .keys(&storage_pattern)?
            .iter()
            .filter_map(|key| self.strip_root(logical_path(key)).map(str::to_string))
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Fill the cache with every layer matching `pattern` and not `exclude`
    /// in one backend call. Returns the number of layers loaded.
    pub fn load_cache(&mut self, pattern: &str, exclude: Option<&str>) -> Result<usize> {
        let storage_pattern = self.storage_pattern(pattern);
        let exclude = exclude.map(|e| self.storage_pattern(e));
        let found = self
            .storage
            .get_many(&storage_pattern, exclude.as_deref())?;

        let mut loaded = 0;
        for (key, text) in found {
            let (full, attrs) = split_key(&key)?;
            let newer = match (self.cache.get(&full).and_then(|l| l.attrs.as_ref()), &attrs) {
                (Some(cached), Some(incoming)) => incoming.revision >= cached.revision,
                _ => true,
            };
            if newer {
                self.cache.insert(full, Layer::new(text, attrs));
                loaded += 1;
            }
        }
        tracing::debug!(pattern, loaded, "Preloaded layer cache");
        Ok(loaded)
    }

    /// Nested view of cached paths matching `pattern`, without the root
    /// namespace level. Reads only the cache.
    pub fn get_tree(&self, pattern: &str) -> Result<Document> {
        let mut tree = self.cache.tree(&self.full_path(pattern))?;
        if self.options.root.is_empty() {
            return Ok(tree);
        }
        for segment in self.options.root.split(':') {
            tree = match tree {
                Document::Object(mut map) => map.remove(segment).unwrap_or(Document::Null),
                _ => Document::Null,
            };
        }
        Ok(match tree {
            Document::Null => Document::Object(serde_json::Map::new()),
            other => other,
        })
    }

    /// Drop the cache and close the backend.
    pub fn close(&mut self) -> Result<()> {
        self.cache.clear();
        self.storage.close()?;
        Ok(())
    }

    fn full_path(&self, path: &str) -> String {
        if self.options.root.is_empty() {
            path.to_string()
        } else {
            format!("{}:{}", self.options.root, path)
        }
    }

    fn strip_root<'k>(&self, key: &'k str) -> Option<&'k str> {
        if self.options.root.is_empty() {
            return Some(key);
        }
        key.strip_prefix(self.options.root.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
    }

    /// Storage pattern for a logical path pattern, covering attribute
    /// suffixes when versioning.
    fn storage_pattern(&self, pattern: &str) -> String {
        let full = self.full_path(pattern);
        if self.options.versioning {
            format!("{full}{ATTR_SUFFIX_PATTERN}")
        } else {
            full
        }
    }

    fn forget(&mut self, deleted: &[String]) {
        for key in deleted {
            self.cache.remove(logical_path(key));
        }
        tracing::debug!(count = deleted.len(), "Deleted layers");
    }

    fn decode(&self, path: &str, text: &str) -> Result<Document> {
        self.codec.decode(text).map_err(|source| Error::Decode {
            path: path.to_string(),
            source,
        })
    }

    /// Cache-first fetch of the layer at `path`.
    fn fetch(&mut self, path: &str) -> Result<Option<Layer>> {
        path::validate(path)?;
        let full = self.full_path(path);
        if let Some(layer) = self.cache.get(&full) {
            tracing::debug!(path = %full, "Layer cache hit");
            return Ok(Some(layer.clone()));
        }

        let layer = if self.options.versioning {
            self.fetch_latest_revision(&full)?
        } else {
            self.storage
                .get(&full)?
                .map(|text| Layer::new(text, None))
        };

        match &layer {
            Some(found) => {
                tracing::debug!(path = %full, "Layer fetched from storage");
                self.cache.insert(full, found.clone());
            }
            None => tracing::debug!(path = %full, "Layer not found"),
        }
        Ok(layer)
    }

    fn fetch_latest_revision(&mut self, full: &str) -> Result<Option<Layer>> {
        let keys = self.storage.keys(&format!("{full}{ATTR_SUFFIX_PATTERN}"))?;
        if keys.len() > 1 {
            tracing::warn!(path = full, count = keys.len(), "Several revisions stored; using the highest");
        }

        let mut latest: Option<(String, Attributes)> = None;
        for key in keys {
            let (_, attrs) = split_key(&key)?;
            let attrs = attrs.unwrap_or_default();
            match &latest {
                Some((_, best)) if best.revision >= attrs.revision => {}
                _ => latest = Some((key, attrs)),
            }
        }

        let Some((key, attrs)) = latest else {
            return Ok(None);
        };
        Ok(self
            .storage
            .get(&key)?
            .map(|text| Layer::new(text, Some(attrs))))
    }

    fn write_plain(&mut self, path: &str, value: &str) -> Result<bool> {
        let full = self.full_path(path);
        let written = self.storage.set(&full, value)?;
        if written {
            self.cache.insert(full, Layer::new(value, None));
        }
        tracing::debug!(path, written, "Stored layer");
        Ok(written)
    }

    fn write_versioned(
        &mut self,
        path: &str,
        value: &str,
        existing: Option<Layer>,
        attrs: Attributes,
    ) -> Result<bool> {
        let full = self.full_path(path);
        if let Some(old) = existing {
            let old_key = make_key(&full, old.attrs.as_ref());
            let deleted = self.storage.delete(&old_key)?;
            self.cache.remove(&full);
            if deleted.is_empty() {
                tracing::warn!(key = %old_key, "Previous revision missing; write abandoned");
                return Ok(false);
            }
        }

        let key = make_key(&full, Some(&attrs));
        let written = self.storage.set(&key, value)?;
        if written {
            tracing::debug!(path, revision = attrs.revision, "Stored layer revision");
            self.cache.insert(full, Layer::new(value, Some(attrs)));
        }
        Ok(written)
    }
}

impl PlaceholderSource for ConfigManager {
    fn lookup(&mut self, path: &str) -> std::result::Result<Option<Document>, PlaceholderError> {
        if self.resolving.iter().any(|p| p == path)
            || self.resolving.len() >= self.options.max_placeholder_depth
        {
            return Err(PlaceholderError::Cycle {
                path: path.to_string(),
            });
        }

        self.resolving.push(path.to_string());
        let result = self.get(path);
        self.resolving.pop();

        result.map_err(|e| PlaceholderError::Resolve {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn next_attributes(existing: Option<&Layer>, user: String) -> Result<Attributes> {
    match existing.and_then(|layer| layer.attrs.as_ref()) {
        Some(prev) => Ok(prev.next(timestamp(), user)?),
        None => Ok(Attributes::new(1, timestamp(), user)),
    }
}
