//! Plug-in codecs for third-party value types
//!
//! An external codec is registered by name in a `CodecTable` and referenced
//! from declarations with `TypeDescriptor::External(name)`. When nothing is
//! registered under the name, mapping the declaration fails with a
//! `TypeMapError`.

use std::fmt;

use serde_json::Value as JsonValue;

use crate::schema::{SerialisationError, ValidationError};
use crate::validators::validate_object_id;
use crate::value::Value;

/// A codec implemented outside the built-in kinds
pub trait ExternalCodec: fmt::Debug + Send + Sync {
    /// Name declarations use to refer to this codec
    fn type_name(&self) -> &str;

    /// Checks `value` and returns its canonical native form
    fn validate(&self, value: &Value) -> Result<Value, ValidationError>;

    /// Converts loosely-typed input into the native form
    fn deserialise(&self, value: &Value) -> Result<Value, ValidationError> {
        self.validate(value)
    }

    /// Renders a native value in the wire shape
    fn serialise(&self, value: &Value) -> Result<JsonValue, SerialisationError>;

    /// Whether `value` is a native value of this codec; used to pick a
    /// union alternative on serialisation
    fn matches(&self, value: &Value) -> bool;
}

/// Codec for BSON object identifiers kept as 24-digit lowercase hex strings
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectIdCodec;

impl ObjectIdCodec {
    pub const TYPE_NAME: &'static str = "bson-object-id";
}

impl ExternalCodec for ObjectIdCodec {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        let text = value
            .as_str()
            .ok_or_else(|| ValidationError::type_error(Self::TYPE_NAME))?;
        validate_object_id(text)?;
        Ok(Value::String(text.to_ascii_lowercase()))
    }

    fn serialise(&self, value: &Value) -> Result<JsonValue, SerialisationError> {
        match value {
            Value::String(s) => Ok(JsonValue::String(s.clone())),
            other => Err(SerialisationError::unexpected(Self::TYPE_NAME, other.kind_name())),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        value
            .as_str()
            .is_some_and(|s| validate_object_id(s).is_ok())
    }
}
