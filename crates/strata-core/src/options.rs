//! Configuration manager options

use serde::{Deserialize, Serialize};

use crate::merge::ListMergeMode;

fn default_root() -> String {
    "rc".to_string()
}

fn default_user() -> String {
    "anonymous".to_string()
}

fn default_max_placeholder_depth() -> usize {
    32
}

/// Options controlling a [`ConfigManager`](crate::ConfigManager).
///
/// Every field has a default, so an empty table deserializes to
/// [`ManagerOptions::default`]:
///
/// ```
/// use strata_core::{ListMergeMode, ManagerOptions};
///
/// let options: ManagerOptions = serde_json::from_str(r#"{"versioning": true}"#).unwrap();
/// assert!(options.versioning);
/// assert_eq!(options.root, "rc");
/// assert_eq!(options.list_merge, ListMergeMode::Concatenate);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerOptions {
    /// Namespace prefix prepended to every stored key.
    pub root: String,

    /// How sequences from different layers are combined.
    pub list_merge: ListMergeMode,

    /// Attach revision attributes to every write.
    pub versioning: bool,

    /// User recorded on versioned writes when none is given.
    pub default_user: String,

    /// Maximum nesting of placeholder lookups.
    pub max_placeholder_depth: usize,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            root: default_root(),
            list_merge: ListMergeMode::default(),
            versioning: false,
            default_user: default_user(),
            max_placeholder_depth: default_max_placeholder_depth(),
        }
    }
}

impl ManagerOptions {
    pub fn versioned() -> Self {
        Self {
            versioning: true,
            ..Self::default()
        }
    }

    pub fn with_list_merge(mut self, mode: ListMergeMode) -> Self {
        self.list_merge = mode;
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }
}
