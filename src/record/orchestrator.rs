//! Whole-record deserialisation and serialisation
//!
//! Deserialisation resolves every field in declaration order (input, then
//! default, then null for optional fields), converts it through the field's
//! deserialiser and validator, and aborts on the first failure. No partial
//! record is ever returned.
//!
//! Serialisation walks the fields in declaration order, always omits
//! write-only fields and applies the per-call mapping when one is given.

use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};
use tracing::trace;

use super::Record;
use crate::config::ValidationConfig;
use crate::mapping::{Directive, Mapping};
use crate::schema::{
    FieldDescriptor, FieldError, RecordType, Schema, SchemaResult, SerialisationError,
    ValidationError,
};
use crate::value::Value;

impl Schema {
    /// Builds a record from loosely-typed input.
    ///
    /// Unknown keys are ignored. The record type's post-init hook runs on the
    /// new record, which is then sealed if the type is frozen.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if:
    /// - the input is neither a map nor a record of this type
    /// - a required field is missing (`Field` with a type error)
    /// - a field fails conversion or validation (`Field`)
    /// - the post-init hook rejects the record
    pub fn deserialise(self: &Arc<Self>, input: &Value) -> SchemaResult<Record> {
        let map = match input {
            Value::Record(record) if self.describes(record) => {
                return Ok(record.clone())
            }
            Value::Map(map) => map,
            _ => return Err(ValidationError::type_error(self.type_name()).into()),
        };

        let mut values = Vec::with_capacity(self.len());
        for field in self.fields() {
            let value = if field.is_read_only() {
                field.default_value().unwrap_or(Value::Null)
            } else {
                match map.get(field.name()) {
                    Some(Value::Null) if field.codec().is_nullable() => Value::Null,
                    Some(value) if !value.is_null() => field
                        .deserialise(value)
                        .map_err(|err| err.in_field(field.name()))?,
                    // A custom deserialiser decides what an absent key means
                    None if field.has_custom_deserialiser() => field
                        .deserialise(&Value::Null)
                        .map_err(|err| err.in_field(field.name()))?,
                    _ => missing(field)?,
                }
            };
            trace!(record = self.type_name(), field = field.name(), "deserialised field");
            values.push(value);
        }

        let mut record = Record::new(Arc::clone(self), values);
        if let Some(hook) = self.post_init() {
            hook(&mut record)?;
        }
        if self.is_frozen() {
            record.seal();
        }
        Ok(record)
    }

    /// Renders a record of this type into the wire shape.
    ///
    /// A directive for a field takes precedence over the field's custom
    /// serialiser, except a plain rename, which keeps it.
    pub fn serialise(&self, record: &Record, mapping: Option<&Mapping>) -> SchemaResult<JsonValue> {
        if !self.describes(record) {
            return Err(SerialisationError::unexpected(self.type_name(), record.type_name()).into());
        }

        let mut out = Map::with_capacity(self.len());
        for (field, value) in self.fields().iter().zip(record.values()) {
            if field.is_write_only() {
                continue;
            }

            let directive = mapping.and_then(|mapping| mapping.get(field.name()));
            let emitted = match directive {
                Some(Directive::Exclude) => None,
                Some(Directive::Rename(to)) => Some((to.clone(), field.serialise(value))),
                Some(Directive::Custom(custom)) => {
                    let (key, rendered) = custom(value);
                    Some((key, Ok(rendered)))
                }
                Some(Directive::Reshape(reshape)) => {
                    let key = reshape.rename_to().unwrap_or(field.name()).to_string();
                    Some((key, field.serialise_shaped(value, reshape)))
                }
                None => Some((field.name().to_string(), field.serialise(value))),
            };

            if let Some((key, rendered)) = emitted {
                let rendered = rendered.map_err(|err| err.in_field(field.name()))?;
                trace!(record = self.type_name(), field = field.name(), key = %key, "serialised field");
                out.insert(key, rendered);
            }
        }
        Ok(JsonValue::Object(out))
    }
}

/// Value for a field absent from input
fn missing(field: &FieldDescriptor) -> SchemaResult<Value> {
    if let Some(default) = field.default_value() {
        return Ok(default);
    }
    if field.is_optional() {
        return Ok(Value::Null);
    }
    Err(FieldError::new(field.name(), ValidationError::type_error(field.codec().type_name())).into())
}

/// Validates `input` against the record type's schema with the strict
/// default config
pub fn validate(record_type: &RecordType, input: &Value) -> SchemaResult<()> {
    record_type.schema()?.validate(input)
}

/// Validates `input` against the record type's schema
pub fn validate_with(
    record_type: &RecordType,
    input: &Value,
    config: &ValidationConfig,
) -> SchemaResult<()> {
    record_type.schema()?.validate_with(input, config)
}

/// Builds a record of `record_type` from loosely-typed input
pub fn deserialise(record_type: &RecordType, input: &Value) -> SchemaResult<Record> {
    record_type.schema()?.deserialise(input)
}

/// Serialises a record, applying `mapping` if given
pub fn serialise(record: &Record, mapping: Option<&Mapping>) -> SchemaResult<JsonValue> {
    record.serialise(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TypeDescriptor;
    use crate::mapping::Reshape;
    use crate::schema::{FieldDecl, SchemaError, SchemaRegistry};
    use serde_json::json;

    fn schema_for(record_type: &RecordType) -> Arc<Schema> {
        SchemaRegistry::new().schema_for(record_type).unwrap()
    }

    fn input(json: JsonValue) -> Value {
        Value::from_json(&json)
    }

    fn profile() -> RecordType {
        RecordType::builder("Profile")
            .field(FieldDecl::string("name"))
            .field(FieldDecl::new("born", TypeDescriptor::Date))
            .field(FieldDecl::integer("id").init(false).default(7))
            .field(FieldDecl::string("password").write_only())
            .field(
                FieldDecl::string("email").serialiser(|value| {
                    Ok(json!(value.as_str().unwrap_or_default().to_uppercase()))
                }),
            )
            .build()
    }

    // =========================================================================
    // Deserialisation
    // =========================================================================

    #[test]
    fn test_deserialise_converts_fields() {
        let schema = schema_for(&profile());
        let record = schema
            .deserialise(&input(json!({
                "name": "Ada",
                "born": "1815-12-10",
                "password": "pw",
                "email": "ada@example.com"
            })))
            .unwrap();

        assert!(matches!(record.get("born"), Some(Value::Date(_))));
        assert_eq!(record.get("password"), Some(&Value::from("pw")));
    }

    #[test]
    fn test_read_only_field_takes_default() {
        let schema = schema_for(&profile());
        let record = schema
            .deserialise(&input(json!({
                "name": "Ada",
                "born": "1815-12-10",
                "id": 99,
                "password": "pw",
                "email": "a@b.co"
            })))
            .unwrap();
        assert_eq!(record.get("id"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_missing_required_field_is_field_error() {
        let schema = schema_for(&profile());
        let err = schema.deserialise(&input(json!({"name": "Ada"}))).unwrap_err();
        let field = err.as_field_error().unwrap();
        assert_eq!(field.field_name(), "born");
        assert_eq!(field.cause().context()["expected_type"], json!("date"));
    }

    #[test]
    fn test_custom_deserialiser_sees_absent_key_as_null() {
        let visit = RecordType::builder("Visit")
            .field(FieldDecl::string("page"))
            .field(FieldDecl::integer("hits").deserialiser(|value| match value {
                Value::Null => Ok(Value::Int(1)),
                other => Ok(other.clone()),
            }))
            .build();

        let schema = schema_for(&visit);
        let record = schema.deserialise(&input(json!({"page": "/"}))).unwrap();
        assert_eq!(record.get("hits"), Some(&Value::Int(1)));

        let record = schema
            .deserialise(&input(json!({"page": "/", "hits": 9})))
            .unwrap();
        assert_eq!(record.get("hits"), Some(&Value::Int(9)));
    }

    #[test]
    fn test_post_init_and_frozen() {
        let counter = RecordType::builder("Counter")
            .field(FieldDecl::integer("start"))
            .field(FieldDecl::integer("next").init(false).default(0))
            .post_init(|record| {
                let start = record.get("start").and_then(Value::as_i64).unwrap_or(0);
                record
                    .set("next", start + 1)
                    .map_err(|_| ValidationError::custom("post_init", "could not set next"))
            })
            .frozen()
            .build();

        let schema = schema_for(&counter);
        let mut record = schema.deserialise(&input(json!({"start": 41}))).unwrap();
        assert_eq!(record.get("next"), Some(&Value::Int(42)));
        assert!(record.is_frozen());

        let err = record.set("start", 1).unwrap_err();
        assert!(matches!(err, SchemaError::FrozenRecord { .. }));
    }

    // =========================================================================
    // Serialisation
    // =========================================================================

    fn ada() -> Record {
        schema_for(&profile())
            .deserialise(&input(json!({
                "name": "Ada",
                "born": "1815-12-10",
                "password": "pw",
                "email": "ada@example.com"
            })))
            .unwrap()
    }

    #[test]
    fn test_serialise_in_declaration_order() {
        let out = ada().serialise(None).unwrap();
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["name", "born", "id", "email"]);
        assert_eq!(out["born"], json!("1815-12-10"));
        assert_eq!(out["email"], json!("ADA@EXAMPLE.COM"));
    }

    #[test]
    fn test_directives() {
        let mapping = Mapping::new()
            .exclude("id")
            .rename("email", "contact")
            .custom("name", |value| ("display".to_string(), json!(format!("<{value}>"))));

        let out = ada().serialise(Some(&mapping)).unwrap();
        assert_eq!(
            out,
            json!({
                "display": "<\"Ada\">",
                "born": "1815-12-10",
                "contact": "ADA@EXAMPLE.COM"
            })
        );
    }

    #[test]
    fn test_reshape_bypasses_custom_serialiser() {
        let mapping = Mapping::new().reshape("email", Reshape::new().rename("mail"));
        let out = ada().serialise(Some(&mapping)).unwrap();
        assert_eq!(out["mail"], json!("ada@example.com"));
    }

    #[test]
    fn test_projection_on_scalar_is_serialisation_error() {
        let mapping = Mapping::new().reshape("name", Reshape::new().item("first"));
        let err = ada().serialise(Some(&mapping)).unwrap_err();
        match err {
            SchemaError::Serialisation(err) => assert_eq!(err.path(), ["name"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
