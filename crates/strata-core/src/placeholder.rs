//! Placeholder substitution
//!
//! String scalars may reference other resolved configuration:
//!
//! ```text
//! url: "postgres://$$db:prod.host$$:5432"    # splice a string in place
//! pool: $$defaults:pool$$                    # a non-string replaces the scalar
//! ```
//!
//! A reference is `$$[:]<path>[.<key>...][:]$$`. `<path>` is resolved through
//! the full hierarchy and the dotted keys walk into the result.
//!
//! Mapping keys can pull a value in under a local name: a key written
//! `<<alias` or `alias:$$` is renamed to `alias` and its value, either a
//! `$$...$$` reference or a bare path, is replaced by what it resolves to.

use regex::Regex;
use std::sync::LazyLock;

use crate::Document;
use crate::merge::Substitute;

static VALUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$:?([\w.:-]+):?\$?\$?").expect("value placeholder pattern is valid")
});

static KEY_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"^<<(\S+)$").expect("key placeholder pattern is valid"),
        Regex::new(r"^(\S+):\$\$$").expect("key placeholder pattern is valid"),
    ]
});

/// Reasons a placeholder could not be expanded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaceholderError {
    #[error("Placeholder {placeholder:?} resolved to nothing")]
    NotFound { placeholder: String },

    #[error("Placeholder {placeholder:?}: value before key {key:?} is not a mapping")]
    NotAMapping { placeholder: String, key: String },

    #[error("Placeholder path {path:?} is already being resolved")]
    Cycle { path: String },

    #[error("Failed to resolve placeholder path {path:?}: {message}")]
    Resolve { path: String, message: String },
}

/// Where placeholder paths are looked up.
pub trait PlaceholderSource {
    /// Resolve `path` to its merged document, `None` when nothing exists.
    fn lookup(&mut self, path: &str) -> Result<Option<Document>, PlaceholderError>;
}

/// The outcome of a successful substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub value: Document,
    pub key: Option<String>,
}

/// Expands placeholders against a [`PlaceholderSource`].
///
/// Used as the merge [`Substitute`] hook, it is fail-open: any error is
/// logged and the original value and key are kept.
pub struct PlaceholderResolver<'a, S: PlaceholderSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: PlaceholderSource + ?Sized> PlaceholderResolver<'a, S> {
    pub fn new(source: &'a mut S) -> Self {
        Self { source }
    }

    /// Expand placeholders in `value` and, if it carries an alias marker,
    /// in `key`.
    ///
    /// Non-string values pass through unchanged.
    pub fn try_substitute(
        &mut self,
        value: &Document,
        key: Option<&str>,
    ) -> Result<Substitution, PlaceholderError> {
        let Document::String(text) = value else {
            return Ok(Substitution {
                value: value.clone(),
                key: key.map(str::to_string),
            });
        };

        let mut out_key = key.map(str::to_string);
        let mut value = value.clone();
        if let Some(alias) = key.and_then(key_alias) {
            value = self.resolve_key_value(text)?;
            out_key = Some(alias);
        }

        let value = match value {
            Document::String(text) => self.substitute_text(&text)?,
            other => other,
        };
        Ok(Substitution { value, key: out_key })
    }

    /// Replace every `$$...$$` token in `text`.
    ///
    /// String results are spliced in place; a non-string result replaces the
    /// whole scalar and later string results are discarded. References that
    /// resolve to null are skipped.
    fn substitute_text(&mut self, text: &str) -> Result<Document, PlaceholderError> {
        let tokens: Vec<(String, String)> = VALUE_PATTERN
            .captures_iter(text)
            .map(|caps| (caps[0].to_string(), caps[1].to_string()))
            .collect();
        if tokens.is_empty() {
            return Ok(Document::String(text.to_string()));
        }

        let mut result = Document::String(text.to_string());
        for (matched, token) in tokens {
            match self.resolve(&token)? {
                Document::Null => continue,
                Document::String(replacement) => {
                    if let Document::String(current) = &mut result {
                        *current = current.replacen(&matched, &replacement, 1);
                    }
                }
                other => result = other,
            }
        }
        Ok(result)
    }

    /// Resolve the value paired with an alias key: the first `$$...$$`
    /// token if present, else the whole text as a path.
    fn resolve_key_value(&mut self, text: &str) -> Result<Document, PlaceholderError> {
        match VALUE_PATTERN.captures(text) {
            Some(caps) => self.resolve(&caps[1]),
            None => self.resolve(text),
        }
    }

    /// Resolve `path[.key...]` to a document.
    pub fn resolve(&mut self, placeholder: &str) -> Result<Document, PlaceholderError> {
        let trimmed = placeholder.trim_matches(':');
        let mut parts = trimmed.split('.');
        let path = parts.next().unwrap_or_default();
        let keys: Vec<&str> = parts.collect();

        let holder = self.source.lookup(path)?;
        let Some(mut holder) = holder.filter(|doc| !is_empty(doc)) else {
            return Err(PlaceholderError::NotFound {
                placeholder: placeholder.to_string(),
            });
        };

        for key in keys {
            let Document::Object(mut map) = holder else {
                return Err(PlaceholderError::NotAMapping {
                    placeholder: placeholder.to_string(),
                    key: key.to_string(),
                });
            };
            holder = map.remove(key).unwrap_or(Document::Null);
        }
        Ok(holder)
    }
}

impl<S: PlaceholderSource + ?Sized> Substitute for PlaceholderResolver<'_, S> {
    fn substitute(&mut self, value: Document, key: Option<&str>) -> (Document, Option<String>) {
        if !value.is_string() {
            return (value, key.map(str::to_string));
        }
        match self.try_substitute(&value, key) {
            Ok(Substitution { value, key }) => (value, key),
            Err(e) => {
                tracing::warn!(error = %e, ?key, "Placeholder substitution skipped");
                (value, key.map(str::to_string))
            }
        }
    }
}

/// The alias named by a key placeholder marker, if `key` is one.
pub fn key_alias(key: &str) -> Option<String> {
    KEY_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(key))
        .map(|caps| caps[1].to_string())
}

/// True for null and for empty strings, sequences and mappings.
pub fn is_empty(document: &Document) -> bool {
    match document {
        Document::Null => true,
        Document::String(s) => s.is_empty(),
        Document::Array(items) => items.is_empty(),
        Document::Object(map) => map.is_empty(),
        _ => false,
    }
}
