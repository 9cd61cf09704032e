// ABOUTME: Schema-agnostic row model shared by every reconciliation stage
// ABOUTME: Value scalars, Row column maps, snapshot keys and row equality

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A nullable scalar as stored in a table cell.
///
/// Values are compared exactly as stored. The only ordering the engine ever
/// applies is string ordering of timestamps (see `reconcile::resolver`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value as text, or `None` for NULL.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(i.to_string()),
            Value::UInt(u) => Some(u.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}", u),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Primary key of a row, in its text rendering.
///
/// Keys from the two sides are matched by text so that `5` (integer) on one
/// server and `"5"` (text protocol) on the other still pair up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Key(String);

impl Key {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maximum length of the row fragment included in error and warning reports.
const DESCRIBE_LIMIT: usize = 80;

/// One table row: column name to value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    columns: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, mostly for tests and fixtures.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.columns.insert(column.to_string(), value.into());
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.columns.iter()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &String> {
        self.columns.keys()
    }

    pub(crate) fn columns_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.columns.iter_mut()
    }

    /// Extract the key from `key_column`. `None` when missing or NULL.
    pub fn key(&self, key_column: &str) -> Option<Key> {
        self.get(key_column).and_then(Value::to_text).map(Key)
    }

    /// Column-wise equality where a NULL value and an absent column are the same.
    pub fn same_content(&self, other: &Row) -> bool {
        let names: BTreeSet<&String> = self.column_names().chain(other.column_names()).collect();
        names.into_iter().all(|name| {
            let a = self.get(name).unwrap_or(&Value::Null);
            let b = other.get(name).unwrap_or(&Value::Null);
            a == b
        })
    }

    /// Short human-readable identity for reports: key first, then a truncated
    /// rendering of the remaining columns.
    pub fn describe(&self, key_column: &str) -> String {
        let key = self
            .get(key_column)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string());

        let mut rest = String::new();
        for (name, value) in self.columns.iter().filter(|(n, _)| *n != key_column) {
            if !rest.is_empty() {
                rest.push_str(", ");
            }
            rest.push_str(&format!("{}={}", name, value));
            if rest.len() > DESCRIBE_LIMIT {
                break;
            }
        }
        if rest.len() > DESCRIBE_LIMIT {
            let mut cut = DESCRIBE_LIMIT;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            rest.truncate(cut);
            rest.push_str("...");
        }

        format!("{}={} ({})", key_column, key, rest)
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.same_content(other)
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}
