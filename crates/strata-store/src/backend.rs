//! Backend selection
//!
//! A backend is chosen by an explicit [`BackendConfig`] variant carrying the
//! typed parameters for that kind, then built by [`open`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::{FileStorage, MemoryStorage, Result, Storage};

fn default_extension() -> String {
    "yaml".to_string()
}

/// Parameters for the in-memory backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryParams {
    /// Entries present when the store is opened, keyed by full stored key.
    #[serde(default)]
    pub seed: BTreeMap<String, String>,
}

/// Parameters for the directory-tree backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileParams {
    /// Directory holding the key tree.
    pub root: PathBuf,

    /// Extension of value files, without the leading dot.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// File stems ignored when reading a layer.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl FileParams {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: default_extension(),
            exclude: Vec::new(),
        }
    }
}

/// Backend kinds this crate can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Memory,
    File,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Backend configuration: one variant per kind.
///
/// Deserializes from a table tagged with `kind`:
///
/// ```toml
/// kind = "file"
/// root = "/etc/strata"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Memory(MemoryParams),
    File(FileParams),
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Memory(_) => BackendKind::Memory,
            Self::File(_) => BackendKind::File,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Memory(MemoryParams::default())
    }
}

/// Build the storage adapter described by `config`.
///
/// Connection or layout problems surface here as errors.
pub fn open(config: &BackendConfig) -> Result<Box<dyn Storage>> {
    tracing::debug!(kind = %config.kind(), "Opening storage backend");
    match config {
        BackendConfig::Memory(params) => {
            Ok(Box::new(MemoryStorage::with_entries(params.seed.clone())))
        }
        BackendConfig::File(params) => Ok(Box::new(FileStorage::open(params)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_file_backend_with_defaults() {
        let config: BackendConfig = toml::from_str(
            r#"
kind = "file"
root = "/srv/config"
"#,
        )
        .unwrap();
        assert_eq!(config.kind(), BackendKind::File);
        assert_eq!(config, BackendConfig::File(FileParams::new("/srv/config")));
    }

    #[test]
    fn test_deserialize_memory_backend_with_seed() {
        let config: BackendConfig = toml::from_str(
            r#"
kind = "memory"

[seed]
"rc:app" = "a: 1"
"#,
        )
        .unwrap();
        let mut storage = open(&config).unwrap();
        assert_eq!(storage.get("rc:app").unwrap().as_deref(), Some("a: 1"));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: std::result::Result<BackendConfig, _> = toml::from_str(r#"kind = "redis""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(BackendKind::File.to_string(), "file");
        assert_eq!(BackendConfig::default().kind(), BackendKind::Memory);
    }
}
