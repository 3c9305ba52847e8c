//! Settings file handling
//!
//! ```toml
//! [backend]
//! kind = "file"
//! root = "/srv/config"
//!
//! [manager]
//! root = "rc"
//! list_merge = "legacy"
//! ```

use serde::Deserialize;
use std::path::Path;
use strata_core::ManagerOptions;
use strata_store::{BackendConfig, FileParams};

use crate::error::{CliError, Result};

/// Everything needed to open a [`strata_core::ConfigManager`].
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: Option<BackendConfig>,
    pub manager: ManagerOptions,
}

impl Settings {
    /// Parse a settings file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|source| CliError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Combine an optional settings file with an optional `--store`
    /// directory, which takes precedence over the file's backend.
    pub fn resolve(config: Option<&Path>, store: Option<&Path>) -> Result<(BackendConfig, ManagerOptions)> {
        let settings = match config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let backend = match (store, settings.backend) {
            (Some(dir), _) => BackendConfig::File(FileParams::new(dir)),
            (None, Some(backend)) => backend,
            (None, None) => {
                return Err(CliError::user(
                    "No backend configured; pass --store <dir> or a --config file with a [backend] table",
                ));
            }
        };
        tracing::debug!(backend = %backend.kind(), "Resolved backend");
        Ok((backend, settings.manager))
    }
}
