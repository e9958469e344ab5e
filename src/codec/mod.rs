//! Codec table and codecs
//!
//! A `Codec` is the validate / deserialise / serialise capability for one
//! declared type. Codecs are produced by `CodecTable::map` from a
//! `TypeDescriptor` plus `Constraints`, are immutable once built, and nest:
//! container, union and record codecs hold their child codecs.
//!
//! Dispatch is a closed `match` over `CodecKind`, so every kind implements
//! every operation.

mod constraints;
mod convert;
mod external;
mod serialise;
mod table;
mod types;

pub use constraints::{anchor_pattern, Constraints, FromBound, Range};
pub use external::{ExternalCodec, ObjectIdCodec};
pub use table::CodecTable;
pub use types::{EnumType, TypeDescriptor};

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::schema::Schema;
use crate::validators::StringFormat;
use crate::value::{IsoDateTime, IsoTime, PatternValue, Value};

/// Rules applied to string values
#[derive(Debug, Clone, Default)]
pub struct StringRules {
    pub length: Range<usize>,
    pub pattern: Option<PatternValue>,
    pub format: Option<StringFormat>,
}

/// Item codecs of a tuple
#[derive(Debug, Clone)]
pub enum TupleItems {
    /// One codec per position; empty for an unparameterised tuple
    Fixed(Vec<Codec>),
    /// A single codec applied to every position
    Variadic(Box<Codec>),
}

/// One variant per supported kind
#[derive(Debug, Clone)]
pub enum CodecKind {
    Any,
    Boolean,
    Integer {
        range: Range<i64>,
        multiple_of: Option<i64>,
    },
    Float {
        range: Range<f64>,
        multiple_of: Option<f64>,
    },
    Decimal {
        range: Range<Decimal>,
        multiple_of: Option<Decimal>,
    },
    String(StringRules),
    Bytes {
        length: Range<usize>,
    },
    Date(Range<NaiveDate>),
    DateTime(Range<IsoDateTime>),
    Time(Range<IsoTime>),
    Duration(Range<Duration>),
    Uuid,
    Pattern,
    Ipv4,
    Ipv6,
    Literal(Vec<Value>),
    Enum(EnumType),
    List {
        item: Box<Codec>,
        length: Range<usize>,
        unique: bool,
    },
    Set {
        item: Box<Codec>,
        length: Range<usize>,
    },
    FrozenSet {
        item: Box<Codec>,
        length: Range<usize>,
    },
    Tuple(TupleItems),
    Dict {
        key: Box<Codec>,
        value: Box<Codec>,
        length: Range<usize>,
    },
    Record(Arc<Schema>),
    Union(Vec<Codec>),
    External(Arc<dyn ExternalCodec>),
}

/// Validate / deserialise / serialise capability for one declared type
#[derive(Debug, Clone)]
pub struct Codec {
    kind: CodecKind,
    nullable: bool,
}

impl Codec {
    pub fn new(kind: CodecKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    /// Marks the codec as accepting null
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub(crate) fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = self.nullable || nullable;
        self
    }

    pub fn kind(&self) -> &CodecKind {
        &self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether values of this codec are (or contain) nested records
    pub fn is_reference(&self) -> bool {
        match &self.kind {
            CodecKind::Record(_) => true,
            CodecKind::List { item, .. }
            | CodecKind::Set { item, .. }
            | CodecKind::FrozenSet { item, .. } => item.is_reference(),
            CodecKind::Tuple(TupleItems::Variadic(item)) => item.is_reference(),
            CodecKind::Tuple(TupleItems::Fixed(items)) => items.iter().any(Codec::is_reference),
            CodecKind::Dict { value, .. } => value.is_reference(),
            CodecKind::Union(alternatives) => alternatives.iter().any(Codec::is_reference),
            _ => false,
        }
    }

    /// Name used in type errors
    pub fn type_name(&self) -> String {
        match &self.kind {
            CodecKind::Any => "any".into(),
            CodecKind::Boolean => "boolean".into(),
            CodecKind::Integer { .. } => "integer".into(),
            CodecKind::Float { .. } => "float".into(),
            CodecKind::Decimal { .. } => "decimal".into(),
            CodecKind::String(_) => "string".into(),
            CodecKind::Bytes { .. } => "bytes".into(),
            CodecKind::Date(_) => "date".into(),
            CodecKind::DateTime(_) => "datetime".into(),
            CodecKind::Time(_) => "time".into(),
            CodecKind::Duration(_) => "duration".into(),
            CodecKind::Uuid => "uuid".into(),
            CodecKind::Pattern => "pattern".into(),
            CodecKind::Ipv4 => "ipv4".into(),
            CodecKind::Ipv6 => "ipv6".into(),
            CodecKind::Literal(_) => "literal".into(),
            CodecKind::Enum(e) => e.name().to_string(),
            CodecKind::List { item, .. } => format!("list[{}]", item.type_name()),
            CodecKind::Set { item, .. } => format!("set[{}]", item.type_name()),
            CodecKind::FrozenSet { item, .. } => format!("frozenset[{}]", item.type_name()),
            CodecKind::Tuple(TupleItems::Fixed(items)) if items.is_empty() => "tuple".into(),
            CodecKind::Tuple(TupleItems::Fixed(items)) => format!(
                "tuple[{}]",
                items
                    .iter()
                    .map(Codec::type_name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            CodecKind::Tuple(TupleItems::Variadic(item)) => {
                format!("tuple[{}, ...]", item.type_name())
            }
            CodecKind::Dict { key, value, .. } => {
                format!("dict[{}, {}]", key.type_name(), value.type_name())
            }
            CodecKind::Record(schema) => schema.type_name().to_string(),
            CodecKind::Union(alternatives) => alternatives
                .iter()
                .map(Codec::type_name)
                .collect::<Vec<_>>()
                .join(" | "),
            CodecKind::External(codec) => codec.type_name().to_string(),
        }
    }

    /// Whether `value` is already a native value of this codec
    pub fn matches_native(&self, value: &Value) -> bool {
        if value.is_null() {
            return self.nullable || matches!(self.kind, CodecKind::Any);
        }

        match (&self.kind, value) {
            (CodecKind::Any, _) => true,
            (CodecKind::Boolean, Value::Bool(_)) => true,
            (CodecKind::Integer { .. }, Value::Int(_)) => true,
            (CodecKind::Float { .. }, Value::Float(_)) => true,
            (CodecKind::Decimal { .. }, Value::Decimal(_)) => true,
            (CodecKind::String(_), Value::String(_)) => true,
            (CodecKind::Bytes { .. }, Value::Bytes(_)) => true,
            (CodecKind::Date(_), Value::Date(_)) => true,
            (CodecKind::DateTime(_), Value::DateTime(_)) => true,
            (CodecKind::Time(_), Value::Time(_)) => true,
            (CodecKind::Duration(_), Value::Duration(_)) => true,
            (CodecKind::Uuid, Value::Uuid(_)) => true,
            (CodecKind::Pattern, Value::Pattern(_)) => true,
            (CodecKind::Ipv4, Value::Ipv4(_)) => true,
            (CodecKind::Ipv6, Value::Ipv6(_)) => true,
            (CodecKind::Literal(values), value) => values.contains(value),
            (CodecKind::Enum(e), Value::Enum(member)) => e.contains(member),
            (CodecKind::List { item, .. }, Value::List(items))
            | (CodecKind::Set { item, .. }, Value::Set(items))
            | (CodecKind::FrozenSet { item, .. }, Value::FrozenSet(items)) => {
                items.iter().all(|i| item.matches_native(i))
            }
            (CodecKind::Tuple(TupleItems::Fixed(codecs)), Value::Tuple(items)) => {
                codecs.is_empty()
                    || (codecs.len() == items.len()
                        && codecs.iter().zip(items).all(|(c, i)| c.matches_native(i)))
            }
            (CodecKind::Tuple(TupleItems::Variadic(item)), Value::Tuple(items)) => {
                items.iter().all(|i| item.matches_native(i))
            }
            (CodecKind::Dict { key, value, .. }, Value::Dict(entries)) => entries
                .iter()
                .all(|(k, v)| key.matches_native(k) && value.matches_native(v)),
            (CodecKind::Record(schema), Value::Record(record)) => schema.describes(record),
            (CodecKind::Union(alternatives), value) => {
                alternatives.iter().any(|alt| alt.matches_native(value))
            }
            (CodecKind::External(codec), value) => codec.matches(value),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integer() -> Codec {
        Codec::new(CodecKind::Integer {
            range: Range::default(),
            multiple_of: None,
        })
    }

    #[test]
    fn test_type_names() {
        let list = Codec::new(CodecKind::List {
            item: Box::new(integer()),
            length: Range::default(),
            unique: false,
        });
        assert_eq!(list.type_name(), "list[integer]");

        let union = Codec::new(CodecKind::Union(vec![integer(), Codec::new(CodecKind::Boolean)]));
        assert_eq!(union.type_name(), "integer | boolean");
    }

    #[test]
    fn test_matches_native() {
        assert!(integer().matches_native(&Value::Int(1)));
        assert!(!integer().matches_native(&Value::Bool(true)));
        assert!(!integer().matches_native(&Value::Null));
        assert!(integer().nullable().matches_native(&Value::Null));

        let tuple = Codec::new(CodecKind::Tuple(TupleItems::Fixed(vec![
            integer(),
            Codec::new(CodecKind::Boolean),
        ])));
        assert!(tuple.matches_native(&Value::Tuple(vec![Value::Int(1), Value::Bool(false)])));
        assert!(!tuple.matches_native(&Value::Tuple(vec![Value::Int(1)])));
    }

    #[test]
    fn test_reference_detection() {
        assert!(!integer().is_reference());
        let list = Codec::new(CodecKind::List {
            item: Box::new(integer()),
            length: Range::default(),
            unique: false,
        });
        assert!(!list.is_reference());
    }
}
