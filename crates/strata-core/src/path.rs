//! Configuration path handling
//!
//! A path is a `:`-separated list of non-empty segments, ordered from most
//! general to most specific: `app:prod:eu`. A segment may hold an
//! alternation group of `+`-separated tokens (`app:prod+canary`), expanded
//! by the [combinator](crate::combinator).

use crate::{Error, Result};

/// Separator between path segments.
pub const SEGMENT_SEPARATOR: char = ':';

/// Separator between alternation tokens within one segment.
pub const ALTERNATION: char = '+';

/// Check that no segment or alternation token is empty.
pub fn validate(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::invalid_path(path, "path is empty"));
    }
    for (index, segment) in path.split(SEGMENT_SEPARATOR).enumerate() {
        if segment.is_empty() {
            return Err(Error::invalid_path(
                path,
                format!("segment {index} is empty"),
            ));
        }
        if segment.split(ALTERNATION).any(str::is_empty) {
            return Err(Error::invalid_path(
                path,
                format!("segment {segment:?} has an empty alternative"),
            ));
        }
    }
    Ok(())
}

/// Every prefix of `path`, from the first segment to the whole path.
///
/// # Examples
///
/// ```
/// use strata_core::path::prefixes;
///
/// assert_eq!(prefixes("a:b:c"), vec!["a", "a:b", "a:b:c"]);
/// ```
pub fn prefixes(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split(SEGMENT_SEPARATOR).collect();
    (1..=segments.len())
        .map(|end| segments[..end].join(":"))
        .collect()
}
