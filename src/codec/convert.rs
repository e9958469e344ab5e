//! Validation and deserialisation
//!
//! Both operations walk the same conversion: validation is strict and never
//! builds records, deserialisation hydrates loose input (boolean tokens,
//! integers for floats, any sequence for lists) and constructs nested
//! records.

use serde_json::Value as JsonValue;

use super::{Codec, CodecKind, TupleItems};
use crate::config::ValidationConfig;
use crate::schema::{DeserialisationError, SchemaResult, ValidationError};
use crate::validators::{
    hydrate_boolean, validate_boolean, validate_bytes, validate_date, validate_datetime,
    validate_decimal, validate_duration, validate_float, validate_format, validate_integer,
    validate_ipv4, validate_ipv6, validate_multiple_of, validate_pattern, validate_string,
    validate_time, validate_uuid,
};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Validate,
    Deserialise,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Pass<'a> {
    pub(crate) mode: Mode,
    pub(crate) config: &'a ValidationConfig,
}

impl Codec {
    /// Validates `value` strictly and returns its canonical native form.
    ///
    /// Nested records are checked against their schema but not constructed.
    pub fn validate(&self, value: &Value) -> SchemaResult<Value> {
        self.validate_with(value, &ValidationConfig::default())
    }

    /// Validates with an explicit configuration
    pub fn validate_with(&self, value: &Value, config: &ValidationConfig) -> SchemaResult<Value> {
        self.convert(
            value,
            Pass {
                mode: Mode::Validate,
                config,
            },
        )
    }

    /// Converts loosely-typed input into a native value, validating it on
    /// the way
    pub fn deserialise(&self, value: &Value) -> SchemaResult<Value> {
        self.convert(
            value,
            Pass {
                mode: Mode::Deserialise,
                config: &ValidationConfig::default(),
            },
        )
    }

    pub(crate) fn convert(&self, value: &Value, pass: Pass<'_>) -> SchemaResult<Value> {
        if value.is_null() && self.nullable {
            return Ok(Value::Null);
        }

        match &self.kind {
            CodecKind::Any => Ok(value.clone()),
            CodecKind::Boolean => {
                let b = match pass.mode {
                    Mode::Validate => validate_boolean(value)?,
                    Mode::Deserialise => hydrate_boolean(value)?,
                };
                Ok(Value::Bool(b))
            }
            CodecKind::Integer { range, multiple_of } => {
                let i = validate_integer(value)?;
                range.check(&i)?;
                if let Some(factor) = multiple_of {
                    validate_multiple_of(&i, factor)?;
                }
                Ok(Value::Int(i))
            }
            CodecKind::Float { range, multiple_of } => {
                let f = match (pass.mode, value) {
                    (Mode::Deserialise, Value::Int(i)) => *i as f64,
                    _ => validate_float(value)?,
                };
                range.check(&f)?;
                if let Some(factor) = multiple_of {
                    validate_multiple_of(&f, factor)?;
                }
                Ok(Value::Float(f))
            }
            CodecKind::Decimal { range, multiple_of } => {
                let d = validate_decimal(value)?;
                range.check(&d)?;
                if let Some(factor) = multiple_of {
                    validate_multiple_of(&d, factor)?;
                }
                Ok(Value::Decimal(d))
            }
            CodecKind::String(rules) => {
                let s = validate_string(value)?;
                rules.length.check_length(s.chars().count())?;
                if let Some(pattern) = &rules.pattern {
                    if !pattern.is_match(s) {
                        return Err(ValidationError::format_error(pattern.as_str()).into());
                    }
                }
                if let Some(format) = rules.format {
                    validate_format(s, format)?;
                }
                Ok(Value::String(s.to_string()))
            }
            CodecKind::Bytes { length } => {
                let bytes = validate_bytes(value)?;
                length.check_length(bytes.len())?;
                Ok(Value::Bytes(bytes))
            }
            CodecKind::Date(range) => {
                let date = validate_date(value)?;
                range.check(&date)?;
                Ok(Value::Date(date))
            }
            CodecKind::DateTime(range) => {
                let datetime = validate_datetime(value)?;
                range.check(&datetime)?;
                Ok(Value::DateTime(datetime))
            }
            CodecKind::Time(range) => {
                let time = validate_time(value)?;
                range.check(&time)?;
                Ok(Value::Time(time))
            }
            CodecKind::Duration(range) => {
                let duration = validate_duration(value)?;
                range.check(&duration)?;
                Ok(Value::Duration(duration))
            }
            CodecKind::Uuid => Ok(Value::Uuid(validate_uuid(value)?)),
            CodecKind::Pattern => Ok(Value::Pattern(validate_pattern(value)?)),
            CodecKind::Ipv4 => Ok(Value::Ipv4(validate_ipv4(value)?)),
            CodecKind::Ipv6 => Ok(Value::Ipv6(validate_ipv6(value)?)),
            CodecKind::Literal(values) => {
                if values.contains(value) {
                    Ok(value.clone())
                } else {
                    let allowed = JsonValue::Array(values.iter().map(Value::to_json).collect());
                    Err(ValidationError::literal_error(allowed).into())
                }
            }
            CodecKind::Enum(enum_type) => match value {
                Value::Enum(member) if enum_type.contains(member) => Ok(value.clone()),
                other => enum_type
                    .member_by_value(other)
                    .map(Value::Enum)
                    .ok_or_else(|| ValidationError::type_error(enum_type.name()).into()),
            },
            CodecKind::List {
                item,
                length,
                unique,
            } => {
                let items = match (pass.mode, value) {
                    (_, Value::List(items)) => items.as_slice(),
                    (Mode::Deserialise, other) => other
                        .as_items()
                        .ok_or_else(|| ValidationError::type_error("list"))?,
                    _ => return Err(ValidationError::type_error("list").into()),
                };
                length.check_length(items.len())?;
                let converted = convert_items(item, items, pass)?;
                if *unique {
                    ensure_unique(&converted)?;
                }
                Ok(Value::List(converted))
            }
            CodecKind::Set { item, length } => {
                let converted = convert_unique(item, value, pass)?;
                length.check_length(converted.len())?;
                Ok(Value::Set(converted))
            }
            CodecKind::FrozenSet { item, length } => {
                let converted = convert_unique(item, value, pass)?;
                length.check_length(converted.len())?;
                Ok(Value::FrozenSet(converted))
            }
            CodecKind::Tuple(items) => self.convert_tuple(items, value, pass),
            CodecKind::Dict { key, value: item, length } => {
                let entries: Vec<(Value, &Value)> = match value {
                    Value::Map(map) => map
                        .iter()
                        .map(|(k, v)| (key_from_wire(key, k), v))
                        .collect(),
                    Value::Dict(entries) => entries.iter().map(|(k, v)| (k.clone(), v)).collect(),
                    _ => return Err(ValidationError::type_error("dict").into()),
                };
                length.check_length(entries.len())?;

                let mut converted = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    converted.push((key.convert(&k, pass)?, item.convert(v, pass)?));
                }
                Ok(Value::Dict(converted))
            }
            CodecKind::Record(schema) => match value {
                // An already-constructed record of the target type was
                // validated when it was built.
                Value::Record(record) if schema.describes(record) => {
                    Ok(value.clone())
                }
                Value::Map(_) => match pass.mode {
                    Mode::Validate => {
                        schema.validate_with(value, pass.config)?;
                        Ok(value.clone())
                    }
                    Mode::Deserialise => Ok(Value::Record(schema.deserialise(value)?)),
                },
                _ => Err(ValidationError::type_error(schema.type_name()).into()),
            },
            CodecKind::Union(alternatives) => {
                if pass.mode == Mode::Deserialise {
                    if let Value::Map(map) = value {
                        let exact = alternatives.iter().find(|alt| match &alt.kind {
                            CodecKind::Record(schema) => schema.has_exact_fields(map.keys()),
                            _ => false,
                        });
                        if let Some(alternative) = exact {
                            return alternative.convert(value, pass);
                        }
                    }
                }

                for alternative in alternatives {
                    match alternative.convert(value, pass) {
                        Ok(converted) => return Ok(converted),
                        Err(error) if error.is_fatal() => return Err(error),
                        Err(_) => continue,
                    }
                }
                Err(ValidationError::any_error(
                    alternatives.iter().map(Codec::type_name).collect(),
                )
                .into())
            }
            CodecKind::External(codec) => {
                let converted = match pass.mode {
                    Mode::Validate => codec.validate(value)?,
                    Mode::Deserialise => codec.deserialise(value)?,
                };
                Ok(converted)
            }
        }
    }

    fn convert_tuple(&self, items: &TupleItems, value: &Value, pass: Pass<'_>) -> SchemaResult<Value> {
        let values = match value {
            Value::Tuple(values) | Value::List(values) => values,
            _ => return Err(ValidationError::type_error("tuple").into()),
        };

        match items {
            TupleItems::Fixed(codecs) if codecs.is_empty() => match pass.mode {
                Mode::Validate => Ok(Value::Tuple(values.clone())),
                Mode::Deserialise => Err(DeserialisationError::new(
                    "cannot deserialise an unparameterised tuple",
                )
                .into()),
            },
            TupleItems::Fixed(codecs) => {
                if codecs.len() != values.len() {
                    return Err(ValidationError::type_error(self.type_name()).into());
                }
                let converted = codecs
                    .iter()
                    .zip(values)
                    .map(|(codec, v)| codec.convert(v, pass))
                    .collect::<SchemaResult<Vec<_>>>()?;
                Ok(Value::Tuple(converted))
            }
            TupleItems::Variadic(item) => Ok(Value::Tuple(convert_items(item, values, pass)?)),
        }
    }
}

fn convert_items(item: &Codec, items: &[Value], pass: Pass<'_>) -> SchemaResult<Vec<Value>> {
    items.iter().map(|i| item.convert(i, pass)).collect()
}

fn convert_unique(item: &Codec, value: &Value, pass: Pass<'_>) -> SchemaResult<Vec<Value>> {
    let items = value.as_items().ok_or_else(ValidationError::iterable_error)?;
    let converted = convert_items(item, items, pass)?;
    ensure_unique(&converted)?;
    Ok(converted)
}

fn ensure_unique(items: &[Value]) -> Result<(), ValidationError> {
    for (index, item) in items.iter().enumerate() {
        if items[..index].contains(item) {
            return Err(ValidationError::unique_error());
        }
    }
    Ok(())
}

/// Recovers a typed dict key from its wire string
fn key_from_wire(codec: &Codec, key: &str) -> Value {
    let parsed = match &codec.kind {
        CodecKind::Integer { .. } => key.parse::<i64>().ok().map(Value::Int),
        CodecKind::Float { .. } => key.parse::<f64>().ok().map(Value::Float),
        CodecKind::Boolean => match key {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        CodecKind::Enum(enum_type) => enum_type
            .variants()
            .iter()
            .find(|(_, value)| value.key_string() == key)
            .map(|(_, value)| value.clone()),
        CodecKind::Literal(values) => values.iter().find(|v| v.key_string() == key).cloned(),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{EnumType, Range, StringRules};
    use crate::schema::ErrorKind;

    fn integer() -> Codec {
        Codec::new(CodecKind::Integer {
            range: Range::default(),
            multiple_of: None,
        })
    }

    fn float() -> Codec {
        Codec::new(CodecKind::Float {
            range: Range::default(),
            multiple_of: None,
        })
    }

    fn string() -> Codec {
        Codec::new(CodecKind::String(StringRules::default()))
    }

    fn kind_of(result: SchemaResult<Value>) -> ErrorKind {
        result
            .unwrap_err()
            .validation_error()
            .map(|e| e.kind().clone())
            .unwrap()
    }

    #[test]
    fn test_boolean_modes() {
        let codec = Codec::new(CodecKind::Boolean);
        assert!(codec.validate(&Value::from("yes")).is_err());
        assert_eq!(codec.deserialise(&Value::from("yes")).unwrap(), Value::Bool(true));
        assert_eq!(codec.deserialise(&Value::Int(0)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_float_accepts_integers_only_when_deserialising() {
        assert_eq!(kind_of(float().validate(&Value::Int(2))), ErrorKind::Type);
        assert_eq!(float().deserialise(&Value::Int(2)).unwrap(), Value::Float(2.0));
    }

    #[test]
    fn test_nullable() {
        assert_eq!(kind_of(integer().validate(&Value::Null)), ErrorKind::Type);
        assert_eq!(integer().nullable().validate(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_list_items_and_uniqueness() {
        let codec = Codec::new(CodecKind::List {
            item: Box::new(integer()),
            length: Range::default(),
            unique: true,
        });
        let ok = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(codec.validate(&ok).unwrap(), ok);

        let dup = Value::List(vec![Value::Int(1), Value::Int(1)]);
        assert_eq!(kind_of(codec.validate(&dup)), ErrorKind::Unique);

        let bad = Value::List(vec![Value::Int(1), Value::from("x")]);
        assert_eq!(kind_of(codec.validate(&bad)), ErrorKind::Type);
    }

    #[test]
    fn test_set_rejects_duplicates_and_non_iterables() {
        let codec = Codec::new(CodecKind::Set {
            item: Box::new(string()),
            length: Range::default(),
        });
        let value = codec
            .deserialise(&Value::List(vec![Value::from("a"), Value::from("b")]))
            .unwrap();
        assert_eq!(value, Value::Set(vec![Value::from("a"), Value::from("b")]));

        let dup = Value::List(vec![Value::from("a"), Value::from("a")]);
        assert_eq!(kind_of(codec.validate(&dup)), ErrorKind::Unique);
        assert_eq!(kind_of(codec.validate(&Value::from("ab"))), ErrorKind::Iterable);
    }

    #[test]
    fn test_tuples() {
        let fixed = Codec::new(CodecKind::Tuple(TupleItems::Fixed(vec![integer(), string()])));
        let input = Value::List(vec![Value::Int(1), Value::from("a")]);
        assert_eq!(
            fixed.deserialise(&input).unwrap(),
            Value::Tuple(vec![Value::Int(1), Value::from("a")])
        );
        assert!(fixed.validate(&Value::List(vec![Value::Int(1)])).is_err());

        let variadic = Codec::new(CodecKind::Tuple(TupleItems::Variadic(Box::new(integer()))));
        assert!(variadic
            .validate(&Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
            .is_ok());

        let generic = Codec::new(CodecKind::Tuple(TupleItems::Fixed(Vec::new())));
        assert!(generic.validate(&input).is_ok());
        assert!(matches!(
            generic.deserialise(&input),
            Err(crate::schema::SchemaError::Deserialisation(_))
        ));
    }

    #[test]
    fn test_dict_keys_parsed_from_wire() {
        let codec = Codec::new(CodecKind::Dict {
            key: Box::new(integer()),
            value: Box::new(string()),
            length: Range::default(),
        });
        let input = Value::map([("1", Value::from("one")), ("2", Value::from("two"))]);
        assert_eq!(
            codec.deserialise(&input).unwrap(),
            Value::Dict(vec![
                (Value::Int(1), Value::from("one")),
                (Value::Int(2), Value::from("two")),
            ])
        );

        let bad = Value::map([("one", Value::from("one"))]);
        assert_eq!(kind_of(codec.validate(&bad)), ErrorKind::Type);
    }

    #[test]
    fn test_enum_by_underlying_value() {
        let codec = Codec::new(CodecKind::Enum(
            EnumType::new("Size").variant("SMALL", 1).variant("LARGE", 2),
        ));
        let member = codec.deserialise(&Value::Int(2)).unwrap();
        match &member {
            Value::Enum(m) => assert_eq!(m.variant(), "LARGE"),
            other => panic!("expected enum member, got {:?}", other),
        }
        assert_eq!(codec.validate(&member).unwrap(), member);
        assert_eq!(kind_of(codec.validate(&Value::Int(3))), ErrorKind::Type);
    }

    #[test]
    fn test_literal() {
        let codec = Codec::new(CodecKind::Literal(vec![Value::from("a"), Value::from("b")]));
        assert!(codec.validate(&Value::from("a")).is_ok());
        assert_eq!(kind_of(codec.validate(&Value::from("c"))), ErrorKind::Literal);
    }

    #[test]
    fn test_union_first_match_in_declaration_order() {
        let codec = Codec::new(CodecKind::Union(vec![integer(), string()]));
        assert_eq!(codec.validate(&Value::Int(1)).unwrap(), Value::Int(1));
        assert_eq!(codec.validate(&Value::from("x")).unwrap(), Value::from("x"));
        assert_eq!(kind_of(codec.validate(&Value::Bool(true))), ErrorKind::Any);

        let widening = Codec::new(CodecKind::Union(vec![float(), integer()]));
        assert_eq!(widening.deserialise(&Value::Int(3)).unwrap(), Value::Float(3.0));
        assert_eq!(widening.validate(&Value::Int(3)).unwrap(), Value::Int(3));
    }
}
