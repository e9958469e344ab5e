//! Scalar validators
//!
//! Each validator takes a loosely-typed value and returns the canonical
//! native value, or the `ValidationError` describing why it was rejected.
//! Already-native values pass through unchanged.

use std::cmp::Ordering;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{Duration, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::formats::StringFormat;
use super::temporal::{
    format_iso_date, format_iso_duration, parse_iso_date, parse_iso_datetime, parse_iso_duration,
    parse_iso_time,
};
use crate::schema::ValidationError;
use crate::value::{IsoDateTime, IsoTime, PatternValue, Value};

const FALSY_TOKENS: [&str; 7] = ["0", "no", "n", "nope", "false", "f", "off"];
const TRUTHY_TOKENS: [&str; 8] = ["1", "ok", "yes", "y", "yup", "true", "t", "on"];

/// Accepts only the two canonical booleans
pub fn validate_boolean(value: &Value) -> Result<bool, ValidationError> {
    value
        .as_bool()
        .ok_or_else(|| ValidationError::type_error("boolean"))
}

/// Accepts booleans plus the truthy/falsy token sets used when hydrating
/// loosely-typed input
pub fn hydrate_boolean(value: &Value) -> Result<bool, ValidationError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(0) => Ok(false),
        Value::Int(1) => Ok(true),
        Value::String(s) if FALSY_TOKENS.contains(&s.as_str()) => Ok(false),
        Value::String(s) if TRUTHY_TOKENS.contains(&s.as_str()) => Ok(true),
        _ => Err(ValidationError::type_error("boolean")),
    }
}

/// Integers only; booleans are a distinct kind
pub fn validate_integer(value: &Value) -> Result<i64, ValidationError> {
    value
        .as_i64()
        .ok_or_else(|| ValidationError::type_error("integer"))
}

/// Floats only; integers are rejected
pub fn validate_float(value: &Value) -> Result<f64, ValidationError> {
    match value {
        Value::Float(f) => Ok(*f),
        _ => Err(ValidationError::type_error("float")),
    }
}

/// Decimals, integers, floats and numeric strings; non-finite input is
/// rejected
pub fn validate_decimal(value: &Value) -> Result<Decimal, ValidationError> {
    let invalid = || ValidationError::type_error("decimal");
    match value {
        Value::Decimal(d) => Ok(*d),
        Value::Int(i) => Ok(Decimal::from(*i)),
        Value::Float(f) if f.is_finite() => Decimal::try_from(*f).map_err(|_| invalid()),
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

pub fn validate_string(value: &Value) -> Result<&str, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| ValidationError::type_error("string"))
}

/// Raw bytes, or standard base64 text
pub fn validate_bytes(value: &Value) -> Result<Vec<u8>, ValidationError> {
    match value {
        Value::Bytes(bytes) => Ok(bytes.clone()),
        Value::String(s) => STANDARD
            .decode(s)
            .map_err(|_| ValidationError::type_error("bytes")),
        _ => Err(ValidationError::type_error("bytes")),
    }
}

pub fn validate_date(value: &Value) -> Result<NaiveDate, ValidationError> {
    match value {
        Value::Date(date) => Ok(*date),
        Value::String(s) => parse_iso_date(s),
        _ => Err(ValidationError::type_error("date")),
    }
}

pub fn validate_datetime(value: &Value) -> Result<IsoDateTime, ValidationError> {
    match value {
        Value::DateTime(datetime) => Ok(*datetime),
        Value::String(s) => parse_iso_datetime(s),
        _ => Err(ValidationError::type_error("datetime")),
    }
}

pub fn validate_time(value: &Value) -> Result<IsoTime, ValidationError> {
    match value {
        Value::Time(time) => Ok(*time),
        Value::String(s) => parse_iso_time(s),
        _ => Err(ValidationError::type_error("time")),
    }
}

pub fn validate_duration(value: &Value) -> Result<Duration, ValidationError> {
    match value {
        Value::Duration(duration) => Ok(*duration),
        Value::String(s) => parse_iso_duration(s),
        _ => Err(ValidationError::type_error("duration")),
    }
}

pub fn validate_uuid(value: &Value) -> Result<Uuid, ValidationError> {
    match value {
        Value::Uuid(uuid) => Ok(*uuid),
        Value::String(s) => {
            Uuid::parse_str(s).map_err(|_| ValidationError::format_error(StringFormat::Uuid.as_str()))
        }
        _ => Err(ValidationError::format_error(StringFormat::Uuid.as_str())),
    }
}

/// Compiles a regular expression
pub fn validate_pattern(value: &Value) -> Result<PatternValue, ValidationError> {
    match value {
        Value::Pattern(pattern) => Ok(pattern.clone()),
        Value::String(s) => Regex::new(s)
            .map(PatternValue::new)
            .map_err(|_| ValidationError::type_error("pattern")),
        _ => Err(ValidationError::type_error("pattern")),
    }
}

pub fn validate_ipv4(value: &Value) -> Result<Ipv4Addr, ValidationError> {
    match value {
        Value::Ipv4(addr) => Ok(*addr),
        Value::String(s) => s
            .parse()
            .map_err(|_| ValidationError::format_error(StringFormat::Ipv4.as_str())),
        _ => Err(ValidationError::format_error(StringFormat::Ipv4.as_str())),
    }
}

pub fn validate_ipv6(value: &Value) -> Result<Ipv6Addr, ValidationError> {
    match value {
        Value::Ipv6(addr) => Ok(*addr),
        Value::String(s) => s
            .parse()
            .map_err(|_| ValidationError::format_error(StringFormat::Ipv6.as_str())),
        _ => Err(ValidationError::format_error(StringFormat::Ipv6.as_str())),
    }
}

/// Checks a length against optional inclusive bounds
pub fn validate_length(
    length: usize,
    minimum: Option<usize>,
    maximum: Option<usize>,
) -> Result<(), ValidationError> {
    if let Some(minimum) = minimum {
        if length < minimum {
            return Err(ValidationError::minimum_length(minimum));
        }
    }
    if let Some(maximum) = maximum {
        if length > maximum {
            return Err(ValidationError::maximum_length(maximum));
        }
    }
    Ok(())
}

/// A value that can be range-checked and rendered into error context
pub trait Bounded {
    fn compare(&self, other: &Self) -> Option<Ordering>;
    fn render(&self) -> JsonValue;
}

/// A numeric value supporting multiple-of checks
pub trait Divisible: Bounded {
    fn is_multiple_of(&self, factor: &Self) -> bool;
}

/// Checks a value against optional inclusive bounds
pub fn validate_range<T: Bounded>(
    value: &T,
    minimum: Option<&T>,
    maximum: Option<&T>,
) -> Result<(), ValidationError> {
    if let Some(minimum) = minimum {
        if value.compare(minimum) == Some(Ordering::Less) {
            return Err(ValidationError::minimum_bound(minimum.render()));
        }
    }
    if let Some(maximum) = maximum {
        if value.compare(maximum) == Some(Ordering::Greater) {
            return Err(ValidationError::maximum_bound(maximum.render()));
        }
    }
    Ok(())
}

pub fn validate_multiple_of<T: Divisible>(value: &T, factor: &T) -> Result<(), ValidationError> {
    if value.is_multiple_of(factor) {
        Ok(())
    } else {
        Err(ValidationError::multiple_of(factor.render()))
    }
}

impl Bounded for i64 {
    fn compare(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }

    fn render(&self) -> JsonValue {
        JsonValue::from(*self)
    }
}

impl Divisible for i64 {
    fn is_multiple_of(&self, factor: &Self) -> bool {
        // i64::MIN % -1 overflows; every integer is a multiple of -1
        *factor != 0 && self.checked_rem(*factor).map_or(true, |rem| rem == 0)
    }
}

impl Bounded for f64 {
    fn compare(&self, other: &Self) -> Option<Ordering> {
        self.partial_cmp(other)
    }

    fn render(&self) -> JsonValue {
        Value::Float(*self).to_json()
    }
}

impl Divisible for f64 {
    fn is_multiple_of(&self, factor: &Self) -> bool {
        *factor != 0.0 && self % factor == 0.0
    }
}

impl Bounded for Decimal {
    fn compare(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }

    fn render(&self) -> JsonValue {
        JsonValue::String(self.to_string())
    }
}

impl Divisible for Decimal {
    fn is_multiple_of(&self, factor: &Self) -> bool {
        !factor.is_zero() && self.checked_rem(*factor).is_some_and(|rem| rem.is_zero())
    }
}

impl Bounded for NaiveDate {
    fn compare(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }

    fn render(&self) -> JsonValue {
        JsonValue::String(format_iso_date(self))
    }
}

impl Bounded for IsoDateTime {
    fn compare(&self, other: &Self) -> Option<Ordering> {
        Some(IsoDateTime::compare(self, other))
    }

    fn render(&self) -> JsonValue {
        JsonValue::String(self.to_string())
    }
}

impl Bounded for IsoTime {
    fn compare(&self, other: &Self) -> Option<Ordering> {
        Some(IsoTime::compare(self, other))
    }

    fn render(&self) -> JsonValue {
        JsonValue::String(self.to_string())
    }
}

impl Bounded for Duration {
    fn compare(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }

    fn render(&self) -> JsonValue {
        JsonValue::String(format_iso_duration(self))
    }
}
