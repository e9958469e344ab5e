//! Native value model
//!
//! A single `Value` enum carries both loosely-typed input (null, booleans,
//! numbers, strings, lists and string-keyed maps as they arrive from the
//! wire) and the strongly-typed native values codecs produce (dates,
//! decimals, UUIDs, enum members, nested records, ...).

mod temporal;

pub use temporal::{IsoDateTime, IsoTime};

use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{Duration, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value as JsonValue};
use uuid::Uuid;

use crate::record::Record;
use crate::validators::temporal::{format_iso_date, format_iso_duration};

/// A compiled regular expression. Two patterns are equal when their source
/// text is equal.
#[derive(Debug, Clone)]
pub struct PatternValue(Regex);

impl PatternValue {
    pub fn new(regex: Regex) -> Self {
        Self(regex)
    }

    /// Source text of the expression
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn regex(&self) -> &Regex {
        &self.0
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for PatternValue {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// A member of a declared enumeration
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    type_name: String,
    variant: String,
    value: Box<Value>,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, variant: impl Into<String>, value: Value) -> Self {
        Self {
            type_name: type_name.into(),
            variant: variant.into(),
            value: Box::new(value),
        }
    }

    /// Name of the enumeration this member belongs to
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Member name
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Underlying value, emitted on serialisation
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Any value the engine consumes or produces
///
/// Equality ignores order for `Set`, `FrozenSet` and `Dict`.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(IsoDateTime),
    Time(IsoTime),
    Duration(Duration),
    Uuid(Uuid),
    Pattern(PatternValue),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Enum(EnumValue),
    List(Vec<Value>),
    Set(Vec<Value>),
    FrozenSet(Vec<Value>),
    Tuple(Vec<Value>),
    /// Mapping with arbitrary (non-string) keys, in insertion order
    Dict(Vec<(Value, Value)>),
    /// String-keyed mapping as read from the wire
    Map(BTreeMap<String, Value>),
    Record(Record),
}

impl Value {
    /// Builds a string-keyed map value
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    /// Name of the value's kind, used in error context
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Time(_) => "time",
            Value::Duration(_) => "duration",
            Value::Uuid(_) => "uuid",
            Value::Pattern(_) => "pattern",
            Value::Ipv4(_) => "ipv4",
            Value::Ipv6(_) => "ipv6",
            Value::Enum(_) => "enum",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::FrozenSet(_) => "frozenset",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and integers widened to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Items of any sequence-like value
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) | Value::FrozenSet(items) | Value::Tuple(items) => {
                Some(items)
            }
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Converts wire JSON into a loosely-typed value
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => Value::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Renders the value in the wire shape without consulting a codec.
    ///
    /// Records are rendered field by field, omitting write-only fields and
    /// ignoring custom serialisers.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
            Value::Decimal(d) => JsonValue::String(d.to_string()),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Bytes(bytes) => JsonValue::String(STANDARD.encode(bytes)),
            Value::Date(date) => JsonValue::String(format_iso_date(date)),
            Value::DateTime(datetime) => JsonValue::String(datetime.to_string()),
            Value::Time(time) => JsonValue::String(time.to_string()),
            Value::Duration(duration) => JsonValue::String(format_iso_duration(duration)),
            Value::Uuid(uuid) => JsonValue::String(uuid.to_string()),
            Value::Pattern(pattern) => JsonValue::String(pattern.as_str().to_string()),
            Value::Ipv4(addr) => JsonValue::String(addr.to_string()),
            Value::Ipv6(addr) => JsonValue::String(addr.to_string()),
            Value::Enum(member) => member.value().to_json(),
            Value::List(items) | Value::Set(items) | Value::FrozenSet(items) | Value::Tuple(items) => {
                JsonValue::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Dict(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.key_string(), value.to_json()))
                    .collect::<Map<String, JsonValue>>(),
            ),
            Value::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect::<Map<String, JsonValue>>(),
            ),
            Value::Record(record) => record.to_json(),
        }
    }

    /// Renders a dict key as a wire string
    pub(crate) fn key_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Enum(member) => member.value().key_string(),
            other => match other.to_json() {
                JsonValue::String(s) => s,
                json => json.to_string(),
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Pattern(a), Value::Pattern(b)) => a == b,
            (Value::Ipv4(a), Value::Ipv4(b)) => a == b,
            (Value::Ipv6(a), Value::Ipv6(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Set(a), Value::Set(b)) | (Value::FrozenSet(a), Value::FrozenSet(b)) => {
                same_items(a, b)
            }
            (Value::Dict(a), Value::Dict(b)) => same_items(a, b),
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

/// Multiset equality; every item of `a` pairs with a distinct equal item of `b`
fn same_items<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|item| {
        match (0..b.len()).find(|&i| !used[i] && b[i] == *item) {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Record(record) => write!(f, "{}", record),
            Value::Enum(member) => write!(f, "{}.{}", member.type_name(), member.variant()),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        Value::from_json(&json)
    }
}

impl From<&JsonValue> for Value {
    fn from(json: &JsonValue) -> Self {
        Value::from_json(json)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Value::Date(date)
    }
}

impl From<IsoDateTime> for Value {
    fn from(datetime: IsoDateTime) -> Self {
        Value::DateTime(datetime)
    }
}

impl From<IsoTime> for Value {
    fn from(time: IsoTime) -> Self {
        Value::Time(time)
    }
}

impl From<Duration> for Value {
    fn from(duration: Duration) -> Self {
        Value::Duration(duration)
    }
}

impl From<Uuid> for Value {
    fn from(uuid: Uuid) -> Self {
        Value::Uuid(uuid)
    }
}

impl From<Ipv4Addr> for Value {
    fn from(addr: Ipv4Addr) -> Self {
        Value::Ipv4(addr)
    }
}

impl From<Ipv6Addr> for Value {
    fn from(addr: Ipv6Addr) -> Self {
        Value::Ipv6(addr)
    }
}

impl From<EnumValue> for Value {
    fn from(member: EnumValue) -> Self {
        Value::Enum(member)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
