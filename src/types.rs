//! Core types for change tracking.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Lifecycle event that triggers a snapshot capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Instance materialization (construction-time capture).
    Init,
    Save,
    Delete,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Init => write!(f, "init"),
            EventKind::Save => write!(f, "save"),
            EventKind::Delete => write!(f, "delete"),
        }
    }
}

/// Position of a capture in a tracker's event stream.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Sequence(pub u64);

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.0)
    }
}

impl Sequence {
    /// The following sequence, or `None` once the counter is exhausted.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Sequence)
    }
}

/// A field value held in a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Cached value of a related record.
    Related(RelatedRef),
}

static NULL: Value = Value::Null;

impl Value {
    /// Whether the value counts as "set" for identity purposes.
    ///
    /// Null, false, zero and empty values are unset. This is the test
    /// applied to primary keys by the persistence queries.
    pub fn is_set(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::Related(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_related(&self) -> Option<&RelatedRef> {
        match self {
            Value::Related(r) => Some(r),
            _ => None,
        }
    }

    /// Short name of the variant, used in type mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Related(_) => "related",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<RelatedRef> for Value {
    fn from(v: RelatedRef) -> Self {
        Value::Related(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Cached related record held by a relation field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelatedRecord {
    /// Model name of the related record.
    pub model: String,
    /// Field values of the related record as cached on the owner.
    pub fields: Snapshot,
}

/// Shared reference to a cached related record.
///
/// Two references are equal when they point at the same cache entry or
/// when the cached values are equal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelatedRef(Arc<RelatedRecord>);

impl RelatedRef {
    pub fn new(model: impl Into<String>, fields: Snapshot) -> Self {
        RelatedRef(Arc::new(RelatedRecord {
            model: model.into(),
            fields,
        }))
    }

    pub fn model(&self) -> &str {
        &self.0.model
    }

    pub fn fields(&self) -> &Snapshot {
        &self.0.fields
    }

    pub fn ptr_eq(&self, other: &RelatedRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for RelatedRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

/// Immutable field name -> value mapping captured at one lifecycle event.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    fields: BTreeMap<String, Value>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used by field readers.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Value of a field, `Null` when the field is absent.
    pub fn value(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&NULL)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl FromIterator<(String, Value)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// A single field's value on both sides of a comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub previous: Value,
    pub current: Value,
}

impl FieldChange {
    pub fn new(previous: impl Into<Value>, current: impl Into<Value>) -> Self {
        Self {
            previous: previous.into(),
            current: current.into(),
        }
    }
}

/// Field name -> change mapping, ordered by field name.
pub type Changes = BTreeMap<String, FieldChange>;

/// Compare two snapshots of the same model.
///
/// Iterates the key set of `earlier`; a key is included iff its value
/// differs in `later` (a key missing from `later` compares as `Null`).
pub fn diff(earlier: &Snapshot, later: &Snapshot) -> Changes {
    earlier
        .iter()
        .filter_map(|(name, was)| {
            let now = later.value(name);
            if was != now {
                Some((name.clone(), FieldChange::new(was.clone(), now.clone())))
            } else {
                None
            }
        })
        .collect()
}
