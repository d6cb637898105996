//! Field reader/writer capability implemented by tracked record types.
//!
//! Each tracked type declares its fields statically and knows how to read
//! itself into a [`Snapshot`] and rebuild a detached instance from one. The
//! tracker never inspects a record any other way.

use crate::types::{Snapshot, Value};
use thiserror::Error;

/// Errors raised by a model's field reader or constructor.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("Missing field {field} on {model}")]
    Missing { model: String, field: String },

    #[error("Type mismatch for {field}: expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("Model {0} declares no primary key")]
    NoPrimaryKey(String),
}

/// How a declared field is stored on the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain column stored on the instance.
    Local,
    /// Relation whose related record may be cached on the instance.
    ///
    /// `cache` names the snapshot key the cached value is stored under. The
    /// reader emits it only when the cache is populated.
    Relation { cache: &'static str },
}

/// Statically declared field of a tracked model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub primary_key: bool,
}

impl FieldDescriptor {
    pub const fn local(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Local,
            primary_key: false,
        }
    }

    pub const fn primary_key(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Local,
            primary_key: true,
        }
    }

    /// Relation stored as a foreign key column `name` with cache key `cache`.
    pub const fn relation(name: &'static str, cache: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Relation { cache },
            primary_key: false,
        }
    }
}

/// A record type whose instances can be tracked.
pub trait TrackedModel: Sized {
    /// Name used in registry lookups, events and errors.
    const MODEL_NAME: &'static str;

    /// Declared fields, including exactly one primary key.
    fn fields() -> &'static [FieldDescriptor];

    /// Abstract models have no instances and cannot be registered.
    fn is_abstract() -> bool {
        false
    }

    /// Read every local field, plus the cached value of each relation whose
    /// cache is already populated. Must not load uncached relations.
    fn read_fields(&self) -> Result<Snapshot, FieldError>;

    /// Build a detached instance assigned field by field from `state`.
    fn construct(state: &Snapshot) -> Result<Self, FieldError>;

    /// Live primary key value.
    fn primary_key(&self) -> Value;

    /// Reset the primary key to its unset value.
    fn clear_primary_key(&mut self);

    /// Name of the primary key field.
    fn primary_key_field() -> Result<&'static str, FieldError> {
        Self::fields()
            .iter()
            .find(|field| field.primary_key)
            .map(|field| field.name)
            .ok_or_else(|| FieldError::NoPrimaryKey(Self::MODEL_NAME.to_string()))
    }
}

/// Take a required field from a snapshot, for use in `construct`.
pub fn require<'a, M: TrackedModel>(state: &'a Snapshot, field: &str) -> Result<&'a Value, FieldError> {
    state.get(field).ok_or_else(|| FieldError::Missing {
        model: M::MODEL_NAME.to_string(),
        field: field.to_string(),
    })
}

/// Convert a nullable integer field.
pub fn opt_int(field: &str, value: &Value) -> Result<Option<i64>, FieldError> {
    match value {
        Value::Null => Ok(None),
        Value::Int(i) => Ok(Some(*i)),
        other => Err(FieldError::TypeMismatch {
            field: field.to_string(),
            expected: "int",
            got: other.kind(),
        }),
    }
}

/// Convert a text field.
pub fn text(field: &str, value: &Value) -> Result<String, FieldError> {
    match value {
        Value::Text(s) => Ok(s.clone()),
        other => Err(FieldError::TypeMismatch {
            field: field.to_string(),
            expected: "text",
            got: other.kind(),
        }),
    }
}
