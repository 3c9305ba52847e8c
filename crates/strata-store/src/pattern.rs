//! Glob-style key patterns
//!
//! Storage keys are `:`-delimited strings. Patterns use `*` as the only
//! wildcard, matching any run of characters (including `:` and `#`), the
//! same way a SQL `LIKE` with `%` or a Redis `KEYS` glob would.

use regex::Regex;

use crate::{Error, Result};

/// The wildcard character accepted in key patterns.
pub const WILDCARD: char = '*';

/// A compiled key pattern.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compile a pattern anchored at both ends.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_store::KeyPattern;
    ///
    /// let pattern = KeyPattern::new("rc:app*").unwrap();
    /// assert!(pattern.matches("rc:app"));
    /// assert!(pattern.matches("rc:app:prod"));
    /// assert!(!pattern.matches("rc:other"));
    /// ```
    pub fn new(pattern: &str) -> Result<Self> {
        Self::compile(pattern, true)
    }

    /// Compile a pattern anchored only at the start, so any key that begins
    /// with a match is accepted.
    pub fn prefix(pattern: &str) -> Result<Self> {
        Self::compile(pattern, false)
    }

    fn compile(pattern: &str, anchor_end: bool) -> Result<Self> {
        let body = pattern
            .split(WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let expr = if anchor_end {
            format!("^{body}$")
        } else {
            format!("^{body}")
        };
        let regex = Regex::new(&expr).map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern text as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True when the pattern has no wildcard and names exactly one key.
    pub fn is_literal(&self) -> bool {
        !self.source.contains(WILDCARD)
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}
