//! Native records
//!
//! A `Record` is the constructed value of a record type: its schema plus one
//! native value per declared field, in declaration order. Records of frozen
//! types are sealed after construction and reject assignment.

mod orchestrator;

pub use orchestrator::{deserialise, serialise, validate, validate_with};

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::mapping::Mapping;
use crate::schema::{Schema, SchemaError, SchemaResult};
use crate::value::Value;

/// A constructed record
#[derive(Clone)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
    sealed: bool,
}

impl Record {
    pub(crate) fn new(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self {
            schema,
            values,
            sealed: false,
        }
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn type_name(&self) -> &str {
        self.schema.type_name()
    }

    /// Whether assignment is rejected
    pub fn is_frozen(&self) -> bool {
        self.sealed
    }

    /// Value of the named field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.position(name).map(|position| &self.values[position])
    }

    /// `(field name, value)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema.field_names().zip(self.values.iter())
    }

    /// Assigns a field, converting and validating the new value through the
    /// field's codec.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if:
    /// - the record is frozen (`FrozenRecord`)
    /// - the record type has no such field (`UnknownField`)
    /// - the value fails the field's validation (`Field`)
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> SchemaResult<()> {
        if self.sealed {
            return Err(SchemaError::FrozenRecord {
                record: self.type_name().to_string(),
                field: name.to_string(),
            });
        }

        let position = self
            .schema
            .position(name)
            .ok_or_else(|| SchemaError::UnknownField {
                record: self.type_name().to_string(),
                field: name.to_string(),
            })?;

        let field = &self.schema.fields()[position];
        let value = value.into();
        let converted = if value.is_null() && field.codec().is_nullable() {
            Value::Null
        } else {
            field.deserialise(&value).map_err(|err| err.in_field(name))?
        };
        self.values[position] = converted;
        Ok(())
    }

    /// Serialises into the wire shape, applying `mapping` if given
    pub fn serialise(&self, mapping: Option<&Mapping>) -> SchemaResult<JsonValue> {
        self.schema.serialise(self, mapping)
    }

    /// Plain rendering of every emitted field, without codecs or directives
    pub fn to_json(&self) -> JsonValue {
        let mut out = Map::with_capacity(self.values.len());
        for (field, value) in self.schema.fields().iter().zip(&self.values) {
            if !field.is_write_only() {
                out.insert(field.name().to_string(), value.to_json());
            }
        }
        JsonValue::Object(out)
    }

    pub(crate) fn values(&self) -> &[Value] {
        &self.values
    }
}

impl PartialEq for Record {
    /// Records are equal when they share a type and every comparable field
    /// is equal
    fn eq(&self, other: &Self) -> bool {
        self.schema.describes(other)
            && self
                .schema
                .fields()
                .iter()
                .zip(self.values.iter().zip(&other.values))
                .filter(|(field, _)| field.compares())
                .all(|(_, (a, b))| a == b)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.type_name())?;
        let mut first = true;
        for (field, value) in self.schema.fields().iter().zip(&self.values) {
            if !field.represents() {
                continue;
            }
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}={}", field.name(), value)?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(self.type_name());
        for (field, value) in self.schema.fields().iter().zip(&self.values) {
            if field.represents() {
                out.field(field.name(), value);
            }
        }
        out.finish()
    }
}
