//! Declared-type descriptors
//!
//! A `TypeDescriptor` is the explicit, language-neutral type tree a record
//! declaration hands to the codec table:
//! - scalars: boolean, integer, float, string, bytes, decimal
//! - temporal: date, datetime, time, duration
//! - identifiers: uuid, pattern, ipv4, ipv6
//! - containers: list, set, frozenset, tuple, dict
//! - choice: union, literal, enumeration
//! - nested records and external plug-in types

use std::fmt;

use crate::schema::RecordType;
use crate::value::{EnumValue, Value};

/// Declared type of a field
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Boolean,
    Integer,
    Float,
    String,
    Bytes,
    Decimal,
    Date,
    DateTime,
    Time,
    Duration,
    Uuid,
    Pattern,
    Ipv4,
    Ipv6,
    /// Accepts any value unchanged
    Any,
    /// Absence of a value; only meaningful as a union member
    None,
    /// An unparameterised collection; treated as `Any`
    Collection,
    /// One of a fixed set of values
    Literal(Vec<Value>),
    Enum(EnumType),
    List(Box<TypeDescriptor>),
    Set(Box<TypeDescriptor>),
    FrozenSet(Box<TypeDescriptor>),
    /// Fixed-arity tuple, one type per position; empty means unparameterised
    Tuple(Vec<TypeDescriptor>),
    /// Tuple of any length with a single item type
    VariadicTuple(Box<TypeDescriptor>),
    Dict(Box<TypeDescriptor>, Box<TypeDescriptor>),
    Union(Vec<TypeDescriptor>),
    Record(RecordType),
    /// A plug-in codec registered by name
    External(String),
}

impl TypeDescriptor {
    /// `T | None`
    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Union(vec![inner, TypeDescriptor::None])
    }

    pub fn list(item: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(item))
    }

    pub fn set(item: TypeDescriptor) -> Self {
        TypeDescriptor::Set(Box::new(item))
    }

    pub fn frozen_set(item: TypeDescriptor) -> Self {
        TypeDescriptor::FrozenSet(Box::new(item))
    }

    pub fn tuple(items: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor::Tuple(items)
    }

    pub fn variadic_tuple(item: TypeDescriptor) -> Self {
        TypeDescriptor::VariadicTuple(Box::new(item))
    }

    pub fn dict(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Dict(Box::new(key), Box::new(value))
    }

    pub fn union(alternatives: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor::Union(alternatives)
    }

    pub fn record(record_type: &RecordType) -> Self {
        TypeDescriptor::Record(record_type.clone())
    }

    pub fn external(name: impl Into<String>) -> Self {
        TypeDescriptor::External(name.into())
    }

    pub fn literal<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        TypeDescriptor::Literal(values.into_iter().map(Into::into).collect())
    }

    /// Whether this descriptor is the absence marker
    pub fn is_none(&self) -> bool {
        matches!(self, TypeDescriptor::None)
    }

    /// Human-readable type name
    pub fn type_name(&self) -> String {
        match self {
            TypeDescriptor::Boolean => "boolean".into(),
            TypeDescriptor::Integer => "integer".into(),
            TypeDescriptor::Float => "float".into(),
            TypeDescriptor::String => "string".into(),
            TypeDescriptor::Bytes => "bytes".into(),
            TypeDescriptor::Decimal => "decimal".into(),
            TypeDescriptor::Date => "date".into(),
            TypeDescriptor::DateTime => "datetime".into(),
            TypeDescriptor::Time => "time".into(),
            TypeDescriptor::Duration => "duration".into(),
            TypeDescriptor::Uuid => "uuid".into(),
            TypeDescriptor::Pattern => "pattern".into(),
            TypeDescriptor::Ipv4 => "ipv4".into(),
            TypeDescriptor::Ipv6 => "ipv6".into(),
            TypeDescriptor::Any => "any".into(),
            TypeDescriptor::None => "none".into(),
            TypeDescriptor::Collection => "collection".into(),
            TypeDescriptor::Literal(_) => "literal".into(),
            TypeDescriptor::Enum(e) => e.name().to_string(),
            TypeDescriptor::List(item) => format!("list[{}]", item.type_name()),
            TypeDescriptor::Set(item) => format!("set[{}]", item.type_name()),
            TypeDescriptor::FrozenSet(item) => format!("frozenset[{}]", item.type_name()),
            TypeDescriptor::Tuple(items) if items.is_empty() => "tuple".into(),
            TypeDescriptor::Tuple(items) => format!("tuple[{}]", join_names(items)),
            TypeDescriptor::VariadicTuple(item) => format!("tuple[{}, ...]", item.type_name()),
            TypeDescriptor::Dict(key, value) => {
                format!("dict[{}, {}]", key.type_name(), value.type_name())
            }
            TypeDescriptor::Union(alternatives) => alternatives
                .iter()
                .map(TypeDescriptor::type_name)
                .collect::<Vec<_>>()
                .join(" | "),
            TypeDescriptor::Record(record) => record.name().to_string(),
            TypeDescriptor::External(name) => name.clone(),
        }
    }
}

fn join_names(items: &[TypeDescriptor]) -> String {
    items
        .iter()
        .map(TypeDescriptor::type_name)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

/// A declared enumeration: a name plus ordered `(variant, value)` pairs.
///
/// Underlying values are either all integers or all strings.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    name: String,
    variants: Vec<(String, Value)>,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
        }
    }

    /// Adds a variant
    pub fn variant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variants.push((name.into(), value.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &[(String, Value)] {
        &self.variants
    }

    /// Returns the member with the given variant name
    pub fn member(&self, variant: &str) -> Option<EnumValue> {
        self.variants
            .iter()
            .find(|(name, _)| name == variant)
            .map(|(name, value)| EnumValue::new(&self.name, name, value.clone()))
    }

    /// Returns the member whose underlying value equals `value`
    pub fn member_by_value(&self, value: &Value) -> Option<EnumValue> {
        self.variants
            .iter()
            .find(|(_, candidate)| candidate == value)
            .map(|(name, value)| EnumValue::new(&self.name, name, value.clone()))
    }

    /// Whether `member` is one of this enumeration's members
    pub fn contains(&self, member: &EnumValue) -> bool {
        member.type_name() == self.name
            && self
                .variants
                .iter()
                .any(|(name, value)| name == member.variant() && value == member.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color() -> EnumType {
        EnumType::new("Color")
            .variant("RED", "red")
            .variant("GREEN", "green")
    }

    #[test]
    fn test_type_names() {
        assert_eq!(
            TypeDescriptor::list(TypeDescriptor::Integer).type_name(),
            "list[integer]"
        );
        assert_eq!(
            TypeDescriptor::optional(TypeDescriptor::String).type_name(),
            "string | none"
        );
        assert_eq!(
            TypeDescriptor::variadic_tuple(TypeDescriptor::Float).type_name(),
            "tuple[float, ...]"
        );
        assert_eq!(
            TypeDescriptor::dict(TypeDescriptor::String, TypeDescriptor::Any).to_string(),
            "dict[string, any]"
        );
    }

    #[test]
    fn test_enum_lookup() {
        let color = color();
        let red = color.member("RED").unwrap();
        assert_eq!(red.value(), &Value::from("red"));
        assert_eq!(color.member_by_value(&Value::from("green")).unwrap().variant(), "GREEN");
        assert!(color.member_by_value(&Value::from("blue")).is_none());
        assert!(color.contains(&red));
        assert!(!color.contains(&EnumValue::new("Shade", "RED", Value::from("red"))));
    }
}
