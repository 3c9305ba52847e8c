//! Recursive document merge
//!
//! [`MergeEngine::merge`] folds an overlay document `b` onto a base `a`:
//!
//! - if either side is a sequence the two are merged as lists;
//! - otherwise if either side is a mapping they are merged key by key;
//! - otherwise the overlay wins unless it is null.
//!
//! Every value that ends up in the result passes through a [`Substitute`]
//! hook, which is how placeholders get expanded during the merge.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::Document;

/// How two sequences are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMergeMode {
    /// Scalar lists are concatenated base-then-overlay.
    #[default]
    Concatenate,
    /// A scalar overlay list replaces the base; an empty overlay keeps it.
    Legacy,
}

/// Substitution hook applied to values (and mapping keys) during a merge.
pub trait Substitute {
    /// Rewrite `value`, and `key` when the value sits under a mapping key.
    ///
    /// Returns the new value and, when a key was given, the key to store it
    /// under.
    fn substitute(&mut self, value: Document, key: Option<&str>) -> (Document, Option<String>);
}

/// A hook that leaves everything untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSubstitution;

impl Substitute for NoSubstitution {
    fn substitute(&mut self, value: Document, key: Option<&str>) -> (Document, Option<String>) {
        (value, key.map(str::to_string))
    }
}

/// Type-driven merge of two documents.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeEngine {
    list_mode: ListMergeMode,
}

impl MergeEngine {
    pub fn new(list_mode: ListMergeMode) -> Self {
        Self { list_mode }
    }

    pub fn list_mode(&self) -> ListMergeMode {
        self.list_mode
    }

    /// Merge overlay `b` onto base `a`.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use strata_core::merge::{MergeEngine, NoSubstitution};
    ///
    /// let merged = MergeEngine::default().merge(
    ///     json!({"db": {"host": "h1"}, "tags": ["a"]}),
    ///     json!({"db": {"port": 5432}, "tags": ["b"]}),
    ///     &mut NoSubstitution,
    /// );
    /// assert_eq!(merged, json!({"db": {"host": "h1", "port": 5432}, "tags": ["a", "b"]}));
    /// ```
    pub fn merge(&self, a: Document, b: Document, hook: &mut dyn Substitute) -> Document {
        self.merge_values(a, b, hook, false)
    }

    /// `pairwise` is set when merging aligned list elements: two present
    /// scalars are then both kept instead of the overlay replacing the base.
    fn merge_values(
        &self,
        a: Document,
        b: Document,
        hook: &mut dyn Substitute,
        pairwise: bool,
    ) -> Document {
        if a.is_array() || b.is_array() {
            return Document::Array(self.merge_list(a, b, hook));
        }

        match (a, b) {
            (a @ (Document::Object(_) | Document::Null), b @ Document::Object(_))
            | (a @ Document::Object(_), b @ Document::Null) => self.merge_dict(a, b, hook),
            (Document::Object(_), b) => hook.substitute(b, None).0,
            (_, b @ Document::Object(_)) => self.merge_dict(Document::Null, b, hook),
            (a, b) if pairwise && !a.is_null() && !b.is_null() => Document::Array(vec![
                hook.substitute(a, None).0,
                hook.substitute(b, None).0,
            ]),
            (a, Document::Null) => hook.substitute(a, None).0,
            (_, b) => hook.substitute(b, None).0,
        }
    }

    /// Merge two mappings over the sorted union of their keys.
    ///
    /// The hook may rename a key; values landing on the same output key are
    /// merged together in visiting order.
    fn merge_dict(&self, a: Document, b: Document, hook: &mut dyn Substitute) -> Document {
        let mut a_map = into_map(a);
        let mut b_map = into_map(b);
        let keys: BTreeSet<String> = a_map.keys().chain(b_map.keys()).cloned().collect();

        let mut merged = serde_json::Map::new();
        for key in keys {
            let a_val = a_map.remove(&key).unwrap_or(Document::Null);
            let b_val = b_map.remove(&key).unwrap_or(Document::Null);

            let (b_val, out_key) = hook.substitute(b_val, Some(&key));
            let out_key = out_key.unwrap_or(key);
            let value = self.merge_values(a_val, b_val, hook, false);

            let previous = merged.remove(&out_key).unwrap_or(Document::Null);
            let value = self.merge_values(previous, value, hook, false);
            merged.insert(out_key, value);
        }
        Document::Object(merged)
    }

    fn merge_list(&self, a: Document, b: Document, hook: &mut dyn Substitute) -> Vec<Document> {
        let a_list = into_list(a);
        let b_list = into_list(b);

        match self.list_mode {
            ListMergeMode::Concatenate => {
                if a_list.iter().chain(&b_list).all(is_primitive) {
                    return a_list
                        .into_iter()
                        .chain(b_list)
                        .map(|item| hook.substitute(item, None).0)
                        .collect();
                }
            }
            ListMergeMode::Legacy => {
                if b_list.is_empty() {
                    return a_list;
                }
                if b_list.iter().all(is_primitive) {
                    return b_list
                        .into_iter()
                        .map(|item| hook.substitute(item, None).0)
                        .collect();
                }
            }
        }

        self.merge_pairwise(a_list, b_list, hook)
    }

    /// Merge lists element by element, padding the shorter side with null.
    /// List results are flattened into the output.
    fn merge_pairwise(
        &self,
        a_list: Vec<Document>,
        b_list: Vec<Document>,
        hook: &mut dyn Substitute,
    ) -> Vec<Document> {
        let len = a_list.len().max(b_list.len());
        let mut a_iter = a_list.into_iter();
        let mut b_iter = b_list.into_iter();

        let mut merged = Vec::with_capacity(len);
        for _ in 0..len {
            let a_val = a_iter.next().unwrap_or(Document::Null);
            let b_val = b_iter.next().unwrap_or(Document::Null);
            match self.merge_values(a_val, b_val, hook, true) {
                Document::Array(items) => merged.extend(items),
                other => merged.push(other),
            }
        }
        merged
    }
}

fn is_primitive(value: &Document) -> bool {
    matches!(
        value,
        Document::String(_) | Document::Number(_) | Document::Bool(_)
    )
}

fn into_map(value: Document) -> serde_json::Map<String, Document> {
    match value {
        Document::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

fn into_list(value: Document) -> Vec<Document> {
    match value {
        Document::Array(items) => items,
        Document::Null => Vec::new(),
        other => vec![other],
    }
}
