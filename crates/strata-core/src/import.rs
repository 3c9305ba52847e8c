//! Bulk import of layers from a directory tree
//!
//! Directories map to path segments and files with the configured extension
//! hold layer text:
//!
//! ```text
//! configs/app/prod.yaml      -> app        (or app:prod with file_as_path)
//! configs/app/:eu.yaml       -> app:eu
//! configs/base.yaml          -> base       (no directory segments)
//! ```
//!
//! Files mapping to the same path are concatenated in file-name order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::path::SEGMENT_SEPARATOR;
use crate::{ConfigManager, Error, Result};

/// How a directory tree maps onto layer paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Path prefix prepended to every imported layer.
    pub root: Option<String>,

    /// File extension to import, without the dot.
    pub extension: String,

    /// Append each file stem as the final path segment.
    pub file_as_path: bool,

    /// Directory names and file stems to skip.
    pub exclude: Vec<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            root: None,
            extension: "yaml".to_string(),
            file_as_path: false,
            exclude: Vec::new(),
        }
    }
}

/// Read every layer under `dir` into a path to text map.
pub fn collect_layers(dir: &Path, options: &ImportOptions) -> Result<BTreeMap<String, String>> {
    let mut layers = BTreeMap::new();
    collect_into(dir, &mut Vec::new(), options, &mut layers)?;
    layers.retain(|_, text: &mut String| !text.is_empty());
    Ok(layers)
}

fn collect_into(
    dir: &Path,
    segments: &mut Vec<String>,
    options: &ImportOptions,
    layers: &mut BTreeMap<String, String>,
) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| Error::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()).map_err(|e| Error::io(dir, e)))
        .collect::<Result<_>>()?;
    entries.sort();

    for entry in entries {
        let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if entry.is_dir() {
            if options.exclude.iter().any(|e| e == name) {
                tracing::debug!(dir = %entry.display(), "Skipping excluded directory");
                continue;
            }
            segments.push(name.to_string());
            collect_into(&entry, segments, options, layers)?;
            segments.pop();
            continue;
        }

        if entry.extension().and_then(|e| e.to_str()) != Some(options.extension.as_str()) {
            continue;
        }
        let Some(stem) = entry.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if options.exclude.iter().any(|e| e == stem) {
            continue;
        }

        let mut text = fs::read_to_string(&entry).map_err(|e| Error::io(&entry, e))?;
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        let path = layer_path(segments, stem, options);
        tracing::debug!(file = %entry.display(), path, "Collected layer");
        layers.entry(path).or_default().push_str(&text);
    }
    Ok(())
}

fn layer_path(segments: &[String], stem: &str, options: &ImportOptions) -> String {
    let mut parts: Vec<&str> = options.root.as_deref().into_iter().collect();
    parts.extend(segments.iter().map(String::as_str));

    if let Some(suffix) = stem.strip_prefix(SEGMENT_SEPARATOR) {
        parts.push(suffix);
    } else if options.file_as_path || parts.is_empty() {
        parts.push(stem);
    }
    let separator = SEGMENT_SEPARATOR.to_string();
    parts.join(separator.as_str())
}

/// Import every layer under `dir` in one bulk write. Returns the number of
/// paths collected.
pub fn import_directory(
    manager: &mut ConfigManager,
    dir: &Path,
    options: &ImportOptions,
) -> Result<usize> {
    let layers = collect_layers(dir, options)?;
    if layers.is_empty() {
        tracing::info!(dir = %dir.display(), "No layers found to import");
        return Ok(0);
    }
    manager.set_many(&layers)?;
    tracing::info!(dir = %dir.display(), count = layers.len(), "Imported layers");
    Ok(layers.len())
}

/// Store the contents of `file` at `path`.
pub fn set_from_file(manager: &mut ConfigManager, path: &str, file: &Path) -> Result<bool> {
    let text = fs::read_to_string(file).map_err(|e| Error::io(file, e))?;
    manager.set(path, &text)
}

/// Delete every layer listed by `keys(pattern)`. Returns how many were
/// deleted.
pub fn delete_matching(manager: &mut ConfigManager, pattern: &str) -> Result<usize> {
    let mut deleted = 0;
    for path in manager.keys(pattern)? {
        if manager.delete(&path)? {
            deleted += 1;
        }
    }
    Ok(deleted)
}
