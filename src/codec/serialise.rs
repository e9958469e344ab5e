//! Serialisation into the wire shape
//!
//! Wire shape: null, boolean, integer, float, decimal as string, string,
//! base64 string for bytes, ordered list, ordered string-keyed map.

use serde_json::{Map, Value as JsonValue};

use super::{Codec, CodecKind, TupleItems};
use crate::mapping::{Mapping, Reshape};
use crate::schema::{SchemaResult, SerialisationError};
use crate::value::Value;

impl Codec {
    /// Renders a native value in the wire shape.
    ///
    /// `shape` carries the nested directives and item projection of a
    /// `Reshape` directive targeting the field this codec belongs to.
    pub fn serialise(&self, value: &Value, shape: Option<&Reshape>) -> SchemaResult<JsonValue> {
        let nested = shape
            .map(Reshape::nested_mapping)
            .filter(|mapping| !mapping.is_empty());
        match shape.and_then(Reshape::item_key) {
            Some(key) => self.project(value, nested, key),
            None => self.render(value, nested),
        }
    }

    fn project(&self, value: &Value, nested: Option<&Mapping>, key: &str) -> SchemaResult<JsonValue> {
        if value.is_null() {
            return Ok(JsonValue::Null);
        }

        match (&self.kind, value) {
            (CodecKind::Record(_), _) => {
                let rendered = self.render(value, nested)?;
                rendered.get(key).cloned().ok_or_else(|| {
                    SerialisationError::new(format!(
                        "record `{}` has no field `{}` to project",
                        self.type_name(),
                        key
                    ))
                    .into()
                })
            }
            (CodecKind::List { item, .. }, _)
            | (CodecKind::Set { item, .. }, _)
            | (CodecKind::FrozenSet { item, .. }, _)
            | (CodecKind::Tuple(TupleItems::Variadic(item)), _) => {
                let items = value
                    .as_items()
                    .ok_or_else(|| SerialisationError::unexpected(&self.type_name(), value.kind_name()))?;
                let mut projected = Vec::with_capacity(items.len());
                for item_value in items {
                    // Items that do not carry the key are skipped.
                    if let Some(found) = item.render(item_value, nested)?.get(key) {
                        projected.push(found.clone());
                    }
                }
                Ok(JsonValue::Array(projected))
            }
            (CodecKind::Tuple(TupleItems::Fixed(codecs)), _) if !codecs.is_empty() => {
                let items = value
                    .as_items()
                    .ok_or_else(|| SerialisationError::unexpected(&self.type_name(), value.kind_name()))?;
                let mut projected = Vec::with_capacity(items.len());
                for (codec, item_value) in codecs.iter().zip(items) {
                    if let Some(found) = codec.render(item_value, nested)?.get(key) {
                        projected.push(found.clone());
                    }
                }
                Ok(JsonValue::Array(projected))
            }
            (CodecKind::Union(_), _) => self.alternative_for(value)?.project(value, nested, key),
            _ => Err(SerialisationError::new(format!(
                "cannot project item `{}` from a {} value",
                key,
                self.type_name()
            ))
            .into()),
        }
    }

    fn render(&self, value: &Value, nested: Option<&Mapping>) -> SchemaResult<JsonValue> {
        if value.is_null() {
            return Ok(JsonValue::Null);
        }

        match (&self.kind, value) {
            (CodecKind::Any, _) => Ok(value.to_json()),
            (CodecKind::Boolean, Value::Bool(_))
            | (CodecKind::Integer { .. }, Value::Int(_))
            | (CodecKind::Float { .. }, Value::Float(_))
            | (CodecKind::Decimal { .. }, Value::Decimal(_))
            | (CodecKind::String(_), Value::String(_))
            | (CodecKind::Bytes { .. }, Value::Bytes(_))
            | (CodecKind::Date(_), Value::Date(_))
            | (CodecKind::DateTime(_), Value::DateTime(_))
            | (CodecKind::Time(_), Value::Time(_))
            | (CodecKind::Duration(_), Value::Duration(_))
            | (CodecKind::Uuid, Value::Uuid(_))
            | (CodecKind::Pattern, Value::Pattern(_))
            | (CodecKind::Ipv4, Value::Ipv4(_))
            | (CodecKind::Ipv6, Value::Ipv6(_)) => Ok(value.to_json()),
            (CodecKind::Float { .. }, Value::Int(i)) => Ok(Value::Float(*i as f64).to_json()),
            (CodecKind::Literal(values), _) if values.contains(value) => Ok(value.to_json()),
            (CodecKind::Enum(_), Value::Enum(member)) => Ok(member.value().to_json()),
            (CodecKind::List { item, .. }, _)
            | (CodecKind::Set { item, .. }, _)
            | (CodecKind::FrozenSet { item, .. }, _)
            | (CodecKind::Tuple(TupleItems::Variadic(item)), _)
                if value.as_items().is_some() =>
            {
                let items = value.as_items().unwrap_or_default();
                let rendered = items
                    .iter()
                    .map(|i| item.render(i, nested))
                    .collect::<SchemaResult<Vec<_>>>()?;
                Ok(JsonValue::Array(rendered))
            }
            (CodecKind::Tuple(TupleItems::Fixed(codecs)), _) if value.as_items().is_some() => {
                if codecs.is_empty() {
                    return Err(
                        SerialisationError::new("cannot serialise an unparameterised tuple").into(),
                    );
                }
                let items = value.as_items().unwrap_or_default();
                if items.len() != codecs.len() {
                    return Err(SerialisationError::new(format!(
                        "expected {} tuple items, got {}",
                        codecs.len(),
                        items.len()
                    ))
                    .into());
                }
                let rendered = codecs
                    .iter()
                    .zip(items)
                    .map(|(codec, i)| codec.render(i, nested))
                    .collect::<SchemaResult<Vec<_>>>()?;
                Ok(JsonValue::Array(rendered))
            }
            (CodecKind::Dict { value: item, .. }, Value::Dict(entries)) => {
                let mut out = Map::with_capacity(entries.len());
                for (k, v) in entries {
                    out.insert(k.key_string(), item.render(v, nested)?);
                }
                Ok(JsonValue::Object(out))
            }
            (CodecKind::Dict { value: item, .. }, Value::Map(map)) => {
                let mut out = Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), item.render(v, nested)?);
                }
                Ok(JsonValue::Object(out))
            }
            (CodecKind::Record(schema), Value::Record(record)) => {
                schema.serialise(record, nested)
            }
            (CodecKind::Union(_), _) => self.alternative_for(value)?.render(value, nested),
            (CodecKind::External(codec), _) => Ok(codec.serialise(value)?),
            _ => Err(SerialisationError::unexpected(&self.type_name(), value.kind_name()).into()),
        }
    }

    /// First union alternative whose native kind matches `value`
    fn alternative_for(&self, value: &Value) -> SchemaResult<&Codec> {
        let alternatives = match &self.kind {
            CodecKind::Union(alternatives) => alternatives.as_slice(),
            _ => std::slice::from_ref(self),
        };
        alternatives
            .iter()
            .find(|alternative| alternative.matches_native(value))
            .ok_or_else(|| {
                SerialisationError::new(format!(
                    "{} value matches no alternative of `{}`",
                    value.kind_name(),
                    self.type_name()
                ))
                .into()
            })
    }
}
