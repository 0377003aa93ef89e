//! Multi-valued form data with indexed keys for repeated fields.
//!
//! A key holding one value is stored bare (`tags`). Once a second value is
//! added the bare entry moves to `tags.0` and the new value lands in
//! `tags.1`; later values continue at `tags.2`, `tags.3`, ... This is the
//! shape the content API expects for slice-typed fields.
//!
//! The bare-to-indexed migration means `get("tags")` changes shape between
//! the first and second `add`. Callers that know a field is a sequence can
//! `declare` it `Arity::Repeated`, which stores every value indexed from the
//! start. Undeclared keys keep the migrating layout so single values stay
//! bare on the wire.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Separator between a key and its value index.
///
/// Logical keys are not checked for it. A key that already contains the
/// separator shares the stored-key namespace with indexed entries, so
/// `add("tags.0", ..)` on a set whose `tags` holds two values overwrites the
/// stored `tags.0`. Callers mixing such keys must keep them disjoint.
pub const INDEX_SEPARATOR: char = '.';

/// How values for a key are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Arity {
    /// One value is stored bare; a second value migrates to indexed keys.
    #[default]
    Single,
    /// Values are always stored as `key.0 … key.(n-1)`.
    Repeated,
}

/// Result of `ValueSet::get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Scalar(String),
    Repeated(Vec<String>),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(s) => Some(s),
            FieldValue::Repeated(_) => None,
        }
    }

    /// All values in order; a scalar yields a one-element list.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            FieldValue::Scalar(s) => vec![s],
            FieldValue::Repeated(v) => v,
        }
    }
}

impl PartialEq<&str> for FieldValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_scalar() == Some(*other)
    }
}

impl PartialEq<Vec<&str>> for FieldValue {
    fn eq(&self, other: &Vec<&str>) -> bool {
        match self {
            FieldValue::Repeated(v) => v.iter().map(String::as_str).eq(other.iter().copied()),
            FieldValue::Scalar(_) => false,
        }
    }
}

/// Ordered, multi-valued key/value container used to build form bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueSet {
    /// Stored (possibly indexed) key → value.
    values: BTreeMap<String, String>,
    /// Logical key → number of values.
    counts: BTreeMap<String, usize>,
    repeated: BTreeSet<String>,
}

fn indexed(key: &str, i: usize) -> String {
    format!("{key}{INDEX_SEPARATOR}{i}")
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the layout of `key`. Values already present are re-laid out
    /// in their original order.
    pub fn declare(&mut self, key: &str, arity: Arity) {
        if self.arity(key) == arity {
            return;
        }
        let existing = self.get(key).into_vec();
        let had_values = self.count(key) > 0;
        self.del(key);
        match arity {
            Arity::Repeated => {
                self.repeated.insert(key.to_string());
            }
            Arity::Single => {
                self.repeated.remove(key);
            }
        }
        if had_values {
            for value in existing {
                self.add(key, value);
            }
        }
    }

    pub fn arity(&self, key: &str) -> Arity {
        if self.repeated.contains(key) {
            Arity::Repeated
        } else {
            Arity::Single
        }
    }

    /// Number of values held for `key`.
    pub fn count(&self, key: &str) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Append a value for `key`.
    pub fn add(&mut self, key: &str, value: impl Into<String>) {
        let n = self.count(key);
        let value = value.into();

        if n == 0 && self.arity(key) == Arity::Single {
            self.values.insert(key.to_string(), value);
        } else {
            if n == 1 && self.arity(key) == Arity::Single {
                if let Some(bare) = self.values.remove(key) {
                    self.values.insert(indexed(key, 0), bare);
                }
            }
            self.values.insert(indexed(key, n), value);
        }

        self.counts.insert(key.to_string(), n + 1);
    }

    /// Replace every value of `key` with a single value.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.del(key);
        self.add(key, value);
    }

    /// Look up `key`. A dotted key (`tags.1`) addresses one stored entry
    /// directly; an absent key yields an empty scalar.
    pub fn get(&self, key: &str) -> FieldValue {
        if key.contains(INDEX_SEPARATOR) {
            return FieldValue::Scalar(self.values.get(key).cloned().unwrap_or_default());
        }

        match (self.count(key), self.arity(key)) {
            (0, _) => FieldValue::Scalar(String::new()),
            (1, Arity::Single) => {
                FieldValue::Scalar(self.values.get(key).cloned().unwrap_or_default())
            }
            (n, _) => FieldValue::Repeated(
                (0..n)
                    .map(|i| self.values.get(&indexed(key, i)).cloned().unwrap_or_default())
                    .collect(),
            ),
        }
    }

    /// Remove `key` and all of its indexed entries.
    pub fn del(&mut self, key: &str) {
        let n = self.count(key);
        self.values.remove(key);
        for i in 0..n {
            self.values.remove(&indexed(key, i));
        }
        self.counts.remove(key);
    }

    /// Stored `(field name, value)` pairs for `key` in index order, exactly as
    /// they go on the wire.
    pub fn entries(&self, key: &str) -> Vec<(String, &str)> {
        let n = self.count(key);
        if n == 1 && self.arity(key) == Arity::Single {
            return self
                .values
                .get(key)
                .map(|v| vec![(key.to_string(), v.as_str())])
                .unwrap_or_default();
        }
        (0..n)
            .filter_map(|i| {
                let name = indexed(key, i);
                self.values.get(&name).map(|v| (name, v.as_str()))
            })
            .collect()
    }

    /// Logical keys (as passed to `add`/`set`) in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Number of logical keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// URL query encoding of every stored entry, sorted by stored key.
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.values {
            serializer.append_pair(k, v);
        }
        serializer.finish()
    }
}

impl fmt::Display for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
