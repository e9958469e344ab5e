//! Whole-record validation
//!
//! Validation semantics:
//! - Unknown input keys are rejected unless the config allows them
//! - Fields are checked in declaration order; the first failure wins
//! - Read-only fields are never read from input
//! - Absent or null optional fields are skipped
//! - Failures are attributed to the field path
//!
//! Validation never builds a record and never mutates its input.

use super::errors::{SchemaError, SchemaResult, ValidationError};
use super::types::Schema;
use crate::config::ValidationConfig;
use crate::value::Value;

impl Schema {
    /// Validates `input` with the strict default config.
    pub fn validate(&self, input: &Value) -> SchemaResult<()> {
        self.validate_with(input, &ValidationConfig::default())
    }

    /// Validates `input` against this schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if:
    /// - the input is neither a map nor a record of this type
    /// - the map has a key this record does not declare (strict config only)
    /// - a field fails validation (`SchemaError::Field`)
    pub fn validate_with(&self, input: &Value, config: &ValidationConfig) -> SchemaResult<()> {
        let map = match input {
            // An already constructed record was validated when it was built
            Value::Record(record) if self.describes(record) => return Ok(()),
            Value::Map(map) => map,
            _ => return Err(ValidationError::type_error(self.type_name()).into()),
        };

        if !config.allows_unknown_fields() {
            if let Some(unknown) = map.keys().find(|key| !self.contains(key)) {
                return Err(SchemaError::UnknownField {
                    record: self.type_name().to_string(),
                    field: unknown.clone(),
                });
            }
        }

        for field in self.fields() {
            if field.is_read_only() {
                continue;
            }

            let value = match map.get(field.name()) {
                Some(value) => value.clone(),
                None => field.default_value().unwrap_or(Value::Null),
            };

            if value.is_null() && field.is_optional() {
                continue;
            }

            field
                .validate(&value, config)
                .map_err(|err| err.in_field(field.name()))?;
        }

        Ok(())
    }
}
