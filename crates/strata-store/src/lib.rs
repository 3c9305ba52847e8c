//! Storage port for Strata layered configuration
//!
//! Defines the [`Storage`] trait every backend implements, the glob-style
//! [`KeyPattern`] used to address keys, the `#name=value` attribute-suffix
//! key encoding, and two reference adapters:
//!
//! - [`MemoryStorage`] - an ordered in-process map
//! - [`FileStorage`] - a directory tree of YAML files
//!
//! Backends are selected through [`BackendConfig`] and built with [`open`].

pub mod backend;
pub mod error;
pub mod file;
pub mod key;
pub mod memory;
pub mod pattern;
pub mod storage;

pub use backend::{BackendConfig, BackendKind, FileParams, MemoryParams, open};
pub use error::{Error, Result};
pub use file::FileStorage;
pub use key::{ATTR_SEPARATOR, ATTR_SUFFIX_PATTERN, Attributes, logical_path, make_key, split_key};
pub use memory::MemoryStorage;
pub use pattern::{KeyPattern, WILDCARD};
pub use storage::Storage;
