//! Raw provider rows.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of a provider table: column name -> nullable text value.
///
/// Column names are case-sensitive; the provider mixes conventions
/// (`name` on engines, `NAME` on markets).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(HashMap<String, Option<String>>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
        )
    }

    /// Value of `column`, `None` when absent or null.
    #[inline]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(|v| v.as_deref())
    }

    /// Value of `column`, failing with `MissingField` when absent or null.
    pub fn require(&self, column: &str) -> Result<&str> {
        self.get(column)
            .ok_or_else(|| CoreError::MissingField(column.to_string()))
    }

    /// Non-null values as an owned attribute map.
    pub fn attributes(&self) -> HashMap<String, String> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, Option<String>)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
