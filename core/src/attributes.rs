//! Ordered key/value attribute lists.
//!
//! XML elements carry their attributes as an ordered list in which the same
//! key may appear more than once at parse time. [`Attributes`] keeps that
//! list intact while offering the map-style operations the merge engine
//! needs (`get`, `put_if_absent`, `insert`, `remove`), all of which preserve
//! first-insertion order.

use serde::{Deserialize, Serialize};

/// One key/value pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered attribute list with map-style helpers.
///
/// # Examples
///
/// ```
/// use xts_report_core::Attributes;
///
/// let mut attrs = Attributes::new();
/// attrs.push("devices", "A");
/// attrs.push("devices", "B"); // duplicates are accepted on input
/// assert_eq!(attrs.get("devices"), Some("A"));
///
/// attrs.put_if_absent("suite_name", "CTS");
/// attrs.put_if_absent("suite_name", "GTS");
/// assert_eq!(attrs.get("suite_name"), Some("CTS"));
///
/// attrs.insert("devices", "A,B");
/// assert_eq!(attrs.keys().collect::<Vec<_>>(), ["devices", "suite_name"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a pair without checking for an existing key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push(Attribute::new(key, value));
    }

    /// Returns the value of the first pair with `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|attr| attr.key == key)
    }

    /// Appends the pair only if `key` is not present yet.
    ///
    /// Returns `true` if the pair was added.
    pub fn put_if_absent(&mut self, key: &str, value: &str) -> bool {
        if self.contains_key(key) {
            return false;
        }
        self.push(key, value);
        true
    }

    /// Sets `key` to `value`.
    ///
    /// The first existing pair keeps its position and any later duplicates
    /// are dropped; an absent key is appended.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter().position(|attr| attr.key == key) {
            Some(index) => {
                self.0[index].value = value;
                let mut seen = false;
                self.0.retain(|attr| {
                    if attr.key != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.push(key, value),
        }
    }

    /// Removes every pair with `key`, returning the first removed value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let first = self.get(key).map(String::from);
        self.0.retain(|attr| attr.key != key);
        first
    }

    /// Keeps only the pairs for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Attribute) -> bool) {
        self.0.retain(|attr| keep(attr));
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|attr| attr.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| Attribute::new(key, value))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Attributes {
    type Item = Attribute;
    type IntoIter = std::vec::IntoIter<Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
