//! Attribute-suffix key encoding
//!
//! Backends without native metadata columns carry layer attributes inside
//! the stored key itself:
//!
//! ```text
//! rc:app:prod#rev=3#time=2024-05-01T10:00:00.000000#user=deploy
//! ```
//!
//! The text before the first `#` is the logical path; every following
//! `#`-segment is one `name=value` attribute.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Error, Result};

/// Separator between a logical path and its attribute segments.
pub const ATTR_SEPARATOR: char = '#';

/// Suffix pattern selecting every attributed variant of a path.
pub const ATTR_SUFFIX_PATTERN: &str = "#*";

const REVISION: &str = "rev";
const TIMESTAMP: &str = "time";
const USER: &str = "user";

/// Version metadata attached to a stored layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub revision: u64,
    pub timestamp: String,
    pub user: String,
    /// Attributes written by other tools, kept so they survive a rewrite.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Attributes {
    pub fn new(revision: u64, timestamp: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            revision,
            timestamp: timestamp.into(),
            user: user.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Attributes for the revision following this one.
    ///
    /// Fails with [`Error::MalformedKey`] when the stored revision is already
    /// `u64::MAX`.
    pub fn next(&self, timestamp: impl Into<String>, user: impl Into<String>) -> Result<Self> {
        let revision = self.revision.checked_add(1).ok_or_else(|| {
            Error::malformed_key(make_key("", Some(self)), "revision counter is exhausted")
        })?;
        Ok(Self {
            revision,
            timestamp: timestamp.into(),
            user: user.into(),
            extra: self.extra.clone(),
        })
    }
}

/// Build a stored key from a logical path and optional attributes.
///
/// # Examples
///
/// ```
/// use strata_store::{Attributes, make_key};
///
/// let attrs = Attributes::new(2, "2024-01-01T00:00:00", "ops");
/// assert_eq!(
///     make_key("rc:app", Some(&attrs)),
///     "rc:app#rev=2#time=2024-01-01T00:00:00#user=ops"
/// );
/// assert_eq!(make_key("rc:app", None), "rc:app");
/// ```
pub fn make_key(path: &str, attrs: Option<&Attributes>) -> String {
    let Some(attrs) = attrs else {
        return path.to_string();
    };
    let mut key = format!(
        "{path}#{REVISION}={}#{TIMESTAMP}={}#{USER}={}",
        attrs.revision, attrs.timestamp, attrs.user
    );
    for (name, value) in &attrs.extra {
        key.push(ATTR_SEPARATOR);
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

/// Split a stored key into its logical path and attributes.
///
/// A key without any `#` segment yields `None` for the attributes.
pub fn split_key(key: &str) -> Result<(String, Option<Attributes>)> {
    let mut parts = key.split(ATTR_SEPARATOR);
    let path = parts.next().unwrap_or_default().to_string();

    let mut attrs = Attributes::default();
    let mut seen = false;
    for part in parts {
        seen = true;
        let (name, value) = part
            .split_once('=')
            .ok_or_else(|| Error::malformed_key(key, format!("attribute {part:?} has no '='")))?;
        match name {
            REVISION => {
                attrs.revision = value.parse().map_err(|_| {
                    Error::malformed_key(key, format!("revision {value:?} is not an integer"))
                })?;
            }
            TIMESTAMP => attrs.timestamp = value.to_string(),
            USER => attrs.user = value.to_string(),
            _ => {
                attrs.extra.insert(name.to_string(), value.to_string());
            }
        }
    }

    Ok((path, seen.then_some(attrs)))
}

/// The logical path portion of a stored key.
pub fn logical_path(key: &str) -> &str {
    key.split(ATTR_SEPARATOR).next().unwrap_or(key)
}
