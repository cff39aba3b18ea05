//! Partial variable assignments used for evidence and queries.

use std::collections::BTreeMap;

/// An ordered mapping from variable name to a concrete value index.
///
/// The same shape serves as evidence and as a query. Assignments are partial:
/// variables that are not mentioned are unconstrained. Iteration order is the
/// lexicographic order of the variable names, which keeps filtering and
/// logging deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Assignment {
    values: BTreeMap<String, usize>,
}

impl Assignment {
    /// Creates an empty assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: usize) -> Option<usize> {
        self.values.insert(name.into(), value)
    }

    /// Builder-style variant of [`Assignment::insert`].
    pub fn with(mut self, name: impl Into<String>, value: usize) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, usize)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (K, usize)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<K: Into<String>, const N: usize> From<[(K, usize); N]> for Assignment {
    fn from(pairs: [(K, usize); N]) -> Self {
        pairs.into_iter().collect()
    }
}
