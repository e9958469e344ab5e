//! Built schemas and field descriptors
//!
//! A `Schema` is the ordered set of `FieldDescriptor`s for one record type.
//! It is built once by the registry and never mutated afterwards.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde_json::Value as JsonValue;

use super::declaration::{
    DeserialiserFn, FieldDecl, FieldDefault, PostInitFn, RecordTypeId, SerialiserFn, ValidatorFn,
};
use super::errors::SchemaResult;
use crate::codec::Codec;
use crate::config::ValidationConfig;
use crate::mapping::Reshape;
use crate::record::Record;
use crate::value::Value;

/// A field's codec plus its defaults, visibility and overrides
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    codec: Codec,
    default: Option<FieldDefault>,
    read_only: bool,
    write_only: bool,
    compare: bool,
    represent: bool,
    validator: Option<ValidatorFn>,
    serialiser: Option<SerialiserFn>,
    deserialiser: Option<DeserialiserFn>,
}

impl FieldDescriptor {
    pub(crate) fn from_decl(decl: &FieldDecl, codec: Codec) -> Self {
        Self {
            name: decl.name.clone(),
            codec,
            default: decl.default.clone(),
            read_only: decl.read_only,
            write_only: decl.write_only,
            compare: decl.compare,
            represent: decl.represent,
            validator: decl.validator.clone(),
            serialiser: decl.serialiser.clone(),
            deserialiser: decl.deserialiser.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Optional fields have a default, admit null, or are read-only
    pub fn is_optional(&self) -> bool {
        self.default.is_some() || self.codec.is_nullable() || self.read_only
    }

    pub fn is_required(&self) -> bool {
        !self.is_optional()
    }

    /// Whether the field holds nested records
    pub fn is_reference(&self) -> bool {
        self.codec.is_reference()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_write_only(&self) -> bool {
        self.write_only
    }

    pub fn compares(&self) -> bool {
        self.compare
    }

    pub fn represents(&self) -> bool {
        self.represent
    }

    pub fn has_custom_serialiser(&self) -> bool {
        self.serialiser.is_some()
    }

    pub fn has_custom_deserialiser(&self) -> bool {
        self.deserialiser.is_some()
    }

    /// Produces the default value; a factory runs on every call
    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().map(FieldDefault::produce)
    }

    /// Validates a present value with the custom validator, or the codec
    pub fn validate(&self, value: &Value, config: &ValidationConfig) -> SchemaResult<()> {
        match &self.validator {
            Some(validator) => {
                validator(value)?;
            }
            None => {
                self.codec.validate_with(value, config)?;
            }
        }
        Ok(())
    }

    /// Converts a present value with the custom deserialiser (or the codec),
    /// then runs the custom validator if there is one
    pub fn deserialise(&self, value: &Value) -> SchemaResult<Value> {
        let converted = match &self.deserialiser {
            Some(deserialiser) => deserialiser(value)?,
            None => self.codec.deserialise(value)?,
        };
        match &self.validator {
            Some(validator) => Ok(validator(&converted)?),
            None => Ok(converted),
        }
    }

    /// Serialises with the custom serialiser, or the codec
    pub fn serialise(&self, value: &Value) -> SchemaResult<JsonValue> {
        match &self.serialiser {
            Some(serialiser) => Ok(serialiser(value)?),
            None => self.codec.serialise(value, None),
        }
    }

    /// Serialises through the codec with a reshape directive, bypassing any
    /// custom serialiser
    pub fn serialise_shaped(&self, value: &Value, shape: &Reshape) -> SchemaResult<JsonValue> {
        self.codec.serialise(value, Some(shape))
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("type", &self.codec.type_name())
            .field("optional", &self.is_optional())
            .field("read_only", &self.read_only)
            .field("write_only", &self.write_only)
            .finish_non_exhaustive()
    }
}

/// Ordered field descriptors for one record type
pub struct Schema {
    type_id: RecordTypeId,
    type_name: String,
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
    frozen: bool,
    post_init: Option<PostInitFn>,
}

impl Schema {
    pub(crate) fn new(
        type_id: RecordTypeId,
        type_name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
        frozen: bool,
        post_init: Option<PostInitFn>,
    ) -> Self {
        let index = fields
            .iter()
            .enumerate()
            .map(|(position, field)| (field.name.clone(), position))
            .collect();
        Self {
            type_id,
            type_name: type_name.into(),
            fields,
            index,
            frozen,
            post_init,
        }
    }

    /// Identity of the owning record type
    pub fn type_id(&self) -> RecordTypeId {
        self.type_id
    }

    /// Name of the owning record type
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether `record` was built for this schema's record type
    pub fn describes(&self, record: &Record) -> bool {
        record.schema().type_id == self.type_id
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.position(name).map(|position| &self.fields[position])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldDescriptor::name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub(crate) fn post_init(&self) -> Option<&PostInitFn> {
        self.post_init.as_ref()
    }

    /// Whether `keys` is exactly this schema's field set
    pub fn has_exact_fields<'a, I>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        let keys: HashSet<&str> = keys.into_iter().map(String::as_str).collect();
        keys.len() == self.fields.len() && self.field_names().all(|name| keys.contains(name))
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type_id", &self.type_id)
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .field("frozen", &self.frozen)
            .finish()
    }
}
