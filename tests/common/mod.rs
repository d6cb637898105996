//! Models shared by the integration tests.

#![allow(dead_code)]

use tracked_changes::model::{opt_int, require, text};
use tracked_changes::{FieldDescriptor, FieldError, Snapshot, TrackedModel, Value};

/// A user record with a nullable primary key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    /// When set, the field reader fails.
    pub broken: bool,
}

impl User {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn persisted(id: i64, name: &str) -> Self {
        Self {
            id: Some(id),
            name: name.to_string(),
            ..Default::default()
        }
    }
}

static USER_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor::primary_key("id"),
    FieldDescriptor::local("name"),
    FieldDescriptor::local("email"),
];

impl TrackedModel for User {
    const MODEL_NAME: &'static str = "user";

    fn fields() -> &'static [FieldDescriptor] {
        &USER_FIELDS
    }

    fn read_fields(&self) -> Result<Snapshot, FieldError> {
        if self.broken {
            return Err(FieldError::Missing {
                model: Self::MODEL_NAME.to_string(),
                field: "name".to_string(),
            });
        }
        Ok(Snapshot::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
            .with("email", self.email.clone()))
    }

    fn construct(state: &Snapshot) -> Result<Self, FieldError> {
        let email = match require::<Self>(state, "email")? {
            Value::Null => None,
            value => Some(text("email", value)?),
        };
        Ok(Self {
            id: opt_int("id", require::<Self>(state, "id")?)?,
            name: text("name", require::<Self>(state, "name")?)?,
            email,
            broken: false,
        })
    }

    fn primary_key(&self) -> Value {
        self.id.into()
    }

    fn clear_primary_key(&mut self) {
        self.id = None;
    }
}

/// A model that forgot to declare its primary key.
#[derive(Clone, Debug, Default)]
pub struct Keyless {
    pub label: String,
}

static KEYLESS_FIELDS: [FieldDescriptor; 1] = [FieldDescriptor::local("label")];

impl TrackedModel for Keyless {
    const MODEL_NAME: &'static str = "keyless";

    fn fields() -> &'static [FieldDescriptor] {
        &KEYLESS_FIELDS
    }

    fn read_fields(&self) -> Result<Snapshot, FieldError> {
        Ok(Snapshot::new().with("label", self.label.as_str()))
    }

    fn construct(state: &Snapshot) -> Result<Self, FieldError> {
        Ok(Self {
            label: text("label", require::<Self>(state, "label")?)?,
        })
    }

    fn primary_key(&self) -> Value {
        Value::Null
    }

    fn clear_primary_key(&mut self) {}
}
