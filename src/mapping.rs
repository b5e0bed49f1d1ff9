//! Mapping tables: logical package name -> specificity key -> candidate value.
//!
//! One table exists per package-manager ecosystem (the native table plus one
//! per secondary manager). Tables are built once, validated while being built,
//! and are read-only afterwards.
//!
//! # Raw value rules
//!
//! | Raw value            | Candidate            |
//! |----------------------|----------------------|
//! | `"name"`             | `Name("name")`       |
//! | `["a", "b"]`         | `Names(["a", "b"])`  |
//! | `null`               | `Remove`             |
//! | anything else        | `MalformedCandidate` |
//!
//! Keys are not checked against the specificity tiers: keys the resolver does
//! not know about (e.g. cross-build policies used by other tooling) are kept
//! and simply never match.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{ResolveError, Result};

/// Raw value stored in a mapping table for one (logical name, key) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CandidateValue {
    /// A single concrete package name
    Name(String),
    /// Several concrete packages standing in for one logical package
    Names(Vec<String>),
    /// Explicit "do not install this package here"
    Remove,
}

impl CandidateValue {
    pub fn is_remove(&self) -> bool {
        matches!(self, Self::Remove)
    }

    /// Concrete names carried by this value (none for `Remove`)
    pub fn names(&self) -> &[String] {
        match self {
            Self::Name(name) => std::slice::from_ref(name),
            Self::Names(names) => names,
            Self::Remove => &[],
        }
    }

    /// Convert one raw table value, naming its location on failure
    pub fn from_raw(table: &str, package: &str, key: &str, raw: &Value) -> Result<Self> {
        let malformed = |found: String| ResolveError::MalformedCandidate {
            table: table.to_string(),
            package: package.to_string(),
            key: key.to_string(),
            found,
        };

        match raw {
            Value::Null => Ok(Self::Remove),
            Value::String(name) => Ok(Self::Name(name.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(name) => Ok(name.clone()),
                    other => Err(malformed(format!(
                        "list containing {}",
                        describe(other)
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Names),
            other => Err(malformed(describe(other))),
        }
    }
}

impl From<&str> for CandidateValue {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for CandidateValue {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl<S: Into<String>> From<Vec<S>> for CandidateValue {
    fn from(names: Vec<S>) -> Self {
        Self::Names(names.into_iter().map(Into::into).collect())
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string '{s}'"),
        Value::Array(_) => "nested list".to_string(),
        Value::Object(_) => "map".to_string(),
    }
}

/// Candidate values for one logical package, keyed by specificity key
pub type KeyedCandidates = BTreeMap<String, CandidateValue>;

/// Mapping table for a single package-manager ecosystem
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    name: String,
    entries: BTreeMap<String, KeyedCandidates>,
}

impl MappingTable {
    /// Create an empty table; `name` identifies the ecosystem in logs and errors
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Build a table from loosely typed data (one section of a mappings file).
    ///
    /// A package whose entry is `null` gets no keys at all. Every value is
    /// validated here, so a malformed table never reaches the resolver.
    pub fn from_raw(name: impl Into<String>, raw: &BTreeMap<String, Value>) -> Result<Self> {
        let mut table = Self::new(name);

        for (package, entry) in raw {
            let keyed = match entry {
                Value::Null => KeyedCandidates::new(),
                Value::Object(keys) => keys
                    .iter()
                    .map(|(key, value)| {
                        CandidateValue::from_raw(&table.name, package, key, value)
                            .map(|candidate| (key.clone(), candidate))
                    })
                    .collect::<Result<KeyedCandidates>>()?,
                other => {
                    return Err(ResolveError::MalformedCandidate {
                        table: table.name.clone(),
                        package: package.clone(),
                        key: "<entry>".to_string(),
                        found: format!("{} instead of a key map", describe(other)),
                    })
                }
            };
            table.entries.insert(package.clone(), keyed);
        }

        Ok(table)
    }

    /// Add or replace one candidate, returning the previous value for that key
    pub fn insert(
        &mut self,
        package: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<CandidateValue>,
    ) -> Option<CandidateValue> {
        self.entries
            .entry(package.into())
            .or_default()
            .insert(key.into(), value.into())
    }

    /// Builder form of [`insert`](Self::insert), handy for literal tables
    pub fn with(
        mut self,
        package: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<CandidateValue>,
    ) -> Self {
        self.insert(package, key, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, package: &str) -> Option<&KeyedCandidates> {
        self.entries.get(package)
    }

    pub fn contains(&self, package: &str) -> bool {
        self.entries.contains_key(package)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Logical package names in the table, sorted
    pub fn packages(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_raw_accepts_all_value_shapes() {
        let table = MappingTable::from_raw(
            "native",
            &raw(json!({
                "git": {"default": "git"},
                "meson": {"default": ["meson", "ninja-build"], "FreeBSD": null},
                "unused": null,
            })),
        )
        .unwrap();

        assert_eq!(table.len(), 3);
        let meson = table.get("meson").unwrap();
        assert_eq!(meson["default"], CandidateValue::from(vec!["meson", "ninja-build"]));
        assert_eq!(meson["FreeBSD"], CandidateValue::Remove);
        assert!(table.get("unused").unwrap().is_empty());
    }

    #[test]
    fn test_from_raw_rejects_number() {
        let err = MappingTable::from_raw("pypi", &raw(json!({"meson": {"default": 3}})))
            .unwrap_err();

        assert_eq!(
            err,
            ResolveError::MalformedCandidate {
                table: "pypi".to_string(),
                package: "meson".to_string(),
                key: "default".to_string(),
                found: "number 3".to_string(),
            }
        );
    }

    #[test]
    fn test_from_raw_rejects_list_with_non_strings() {
        let err = MappingTable::from_raw(
            "native",
            &raw(json!({"glib2": {"deb": ["libglib2.0-dev", null]}})),
        )
        .unwrap_err();

        match err {
            ResolveError::MalformedCandidate { key, found, .. } => {
                assert_eq!(key, "deb");
                assert_eq!(found, "list containing null");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_from_raw_rejects_scalar_entry() {
        let err = MappingTable::from_raw("native", &raw(json!({"git": "git"}))).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedCandidate { ref key, .. } if key == "<entry>"));
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(CandidateValue::from("git").names(), ["git".to_string()]);
        assert!(CandidateValue::Remove.names().is_empty());
        assert!(CandidateValue::Remove.is_remove());
    }

    #[test]
    fn test_remove_serializes_as_null() {
        let value = serde_json::to_value(CandidateValue::Remove).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_insert_returns_previous() {
        let mut table = MappingTable::new("native");
        assert!(table.insert("git", "default", "git").is_none());
        assert_eq!(
            table.insert("git", "default", "git-core"),
            Some(CandidateValue::from("git"))
        );
        assert_eq!(table.packages().collect::<Vec<_>>(), vec!["git"]);
    }
}
