//! Hierarchical layered configuration
//!
//! Configuration is stored as independent text layers addressed by
//! `:`-separated paths. Reading `app:prod:eu` folds the layers at `app`,
//! `app:prod` and `app:prod:eu` together, the more specific overriding the
//! more general, expanding `$$path.key$$` placeholders on the way.
//!
//! ```
//! use serde_json::json;
//! use strata_core::{ConfigManager, ManagerOptions};
//! use strata_store::MemoryStorage;
//!
//! let mut manager = ConfigManager::new(Box::new(MemoryStorage::new()), ManagerOptions::default());
//! manager.set("app", "db:\n  host: h1\n").unwrap();
//! manager.set("app:prod", "db:\n  port: 5432\n").unwrap();
//!
//! let config = manager.get("app:prod").unwrap();
//! assert_eq!(config, Some(json!({"db": {"host": "h1", "port": 5432}})));
//! ```
//!
//! Storage is abstracted behind [`strata_store::Storage`]; this crate adds
//! decoding ([`codec`]), alternation expansion ([`combinator`]), merging
//! ([`merge`]), placeholders ([`placeholder`]) and the [`ConfigManager`]
//! orchestrating them.

pub mod cache;
pub mod codec;
pub mod combinator;
pub mod error;
pub mod import;
pub mod manager;
pub mod merge;
pub mod options;
pub mod path;
pub mod placeholder;

/// A decoded configuration layer or merge result.
pub type Document = serde_json::Value;

pub use cache::{Layer, LayerCache};
pub use codec::{CodecError, DocumentCodec, YamlCodec};
pub use error::{Error, Result};
pub use import::{ImportOptions, collect_layers, delete_matching, import_directory, set_from_file};
pub use manager::ConfigManager;
pub use merge::{ListMergeMode, MergeEngine, NoSubstitution, Substitute};
pub use options::ManagerOptions;
pub use placeholder::{PlaceholderError, PlaceholderResolver, PlaceholderSource, Substitution};
