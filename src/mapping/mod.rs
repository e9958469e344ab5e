//! Serialisation mapping DSL
//!
//! A `Mapping` is a per-call, output-only description of how a record's
//! fields are emitted:
//! - `Exclude` drops the field
//! - `Rename` emits it under another key
//! - `Reshape` renames it, applies nested directives to the records it
//!   holds, and can project one sub-field out of each item
//! - `Custom` hands the native value to a callable that picks the key and
//!   the wire value
//!
//! Mappings never affect validation or deserialisation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::schema::{SchemaError, SchemaResult};
use crate::value::Value;

/// Key naming the reshaped field's own new name
pub const SELF_KEY: &str = "$self";

/// Key naming the sub-field projected out of each item
pub const ITEM_KEY: &str = "$item";

/// Caller-supplied field serialiser returning `(output_key, output_value)`
pub type CustomFn = Arc<dyn Fn(&Value) -> (String, JsonValue) + Send + Sync>;

/// What to do with one field on output
#[derive(Clone)]
pub enum Directive {
    Exclude,
    Rename(String),
    Reshape(Reshape),
    Custom(CustomFn),
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Exclude => f.write_str("Exclude"),
            Directive::Rename(name) => f.debug_tuple("Rename").field(name).finish(),
            Directive::Reshape(reshape) => f.debug_tuple("Reshape").field(reshape).finish(),
            Directive::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Rename, nested directives and item projection for a record or
/// collection field
#[derive(Debug, Clone, Default)]
pub struct Reshape {
    rename: Option<String>,
    item: Option<String>,
    nested: Mapping,
}

impl Reshape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits the field under `name`
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }

    /// Replaces each serialised item (or the nested record itself) with its
    /// `key` sub-field
    pub fn item(mut self, key: impl Into<String>) -> Self {
        self.item = Some(key.into());
        self
    }

    /// Directives applied to the nested record's own fields
    pub fn nested(mut self, mapping: Mapping) -> Self {
        self.nested = mapping;
        self
    }

    pub fn rename_to(&self) -> Option<&str> {
        self.rename.as_deref()
    }

    pub fn item_key(&self) -> Option<&str> {
        self.item.as_deref()
    }

    pub fn nested_mapping(&self) -> &Mapping {
        &self.nested
    }
}

/// Directives keyed by field name
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    directives: HashMap<String, Directive>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude(self, field: impl Into<String>) -> Self {
        self.directive(field, Directive::Exclude)
    }

    pub fn rename(self, field: impl Into<String>, to: impl Into<String>) -> Self {
        self.directive(field, Directive::Rename(to.into()))
    }

    pub fn reshape(self, field: impl Into<String>, reshape: Reshape) -> Self {
        self.directive(field, Directive::Reshape(reshape))
    }

    pub fn custom<F>(self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> (String, JsonValue) + Send + Sync + 'static,
    {
        self.directive(field, Directive::Custom(Arc::new(f)))
    }

    /// Sets the directive for `field`, replacing any earlier one
    pub fn directive(mut self, field: impl Into<String>, directive: Directive) -> Self {
        self.directives.insert(field.into(), directive);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Directive> {
        self.directives.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    /// Parses the dictionary form of a mapping.
    ///
    /// - `false` excludes the field
    /// - `true` leaves it untouched
    /// - a string renames it
    /// - an object reshapes it: `$self` renames, `$item` projects, every
    ///   other key is a nested directive
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidMapping` for any other shape.
    pub fn from_json(json: &JsonValue) -> SchemaResult<Mapping> {
        let object = json.as_object().ok_or_else(|| SchemaError::InvalidMapping {
            key: "$root".to_string(),
            reason: "a mapping must be an object".to_string(),
        })?;

        let mut mapping = Mapping::new();
        for (key, value) in object {
            let directive = match value {
                JsonValue::Bool(false) => Directive::Exclude,
                JsonValue::Bool(true) => continue,
                JsonValue::String(name) => Directive::Rename(name.clone()),
                JsonValue::Object(_) => Directive::Reshape(parse_reshape(key, value)?),
                other => {
                    return Err(SchemaError::InvalidMapping {
                        key: key.clone(),
                        reason: format!("unsupported directive `{other}`"),
                    })
                }
            };
            mapping.directives.insert(key.clone(), directive);
        }
        Ok(mapping)
    }
}

fn parse_reshape(key: &str, json: &JsonValue) -> SchemaResult<Reshape> {
    let mut reshape = Reshape::new();
    let mut nested = serde_json::Map::new();

    if let Some(object) = json.as_object() {
        for (inner_key, value) in object {
            match inner_key.as_str() {
                SELF_KEY | ITEM_KEY => {
                    let name = value.as_str().ok_or_else(|| SchemaError::InvalidMapping {
                        key: format!("{key}.{inner_key}"),
                        reason: "expected a field name".to_string(),
                    })?;
                    reshape = if inner_key == SELF_KEY {
                        reshape.rename(name)
                    } else {
                        reshape.item(name)
                    };
                }
                _ => {
                    nested.insert(inner_key.clone(), value.clone());
                }
            }
        }
    }

    let nested = Mapping::from_json(&JsonValue::Object(nested)).map_err(|err| match err {
        SchemaError::InvalidMapping { key: inner, reason } => SchemaError::InvalidMapping {
            key: format!("{key}.{inner}"),
            reason,
        },
        other => other,
    })?;
    Ok(reshape.nested(nested))
}
