//! Field constraint bundle and its conversion into typed bounds
//!
//! Constraints are declared loosely (bounds are plain `Value`s) and checked
//! once, when the codec is mapped. A bound the codec cannot interpret, or a
//! constraint a kind does not accept, is a `TypeMapError`.

use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;

use crate::schema::TypeMapError;
use crate::validators::{
    parse_iso_date, parse_iso_datetime, parse_iso_duration, parse_iso_time, validate_length,
    validate_range, Bounded, StringFormat,
};
use crate::schema::ValidationError;
use crate::value::{IsoDateTime, IsoTime, PatternValue, Value};

/// Per-field constraints
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    /// Inclusive lower bound; a length for strings, bytes and collections
    pub minimum: Option<Value>,
    /// Inclusive upper bound; a length for strings, bytes and collections
    pub maximum: Option<Value>,
    pub multiple_of: Option<Value>,
    /// Regular expression a string must match in full
    pub pattern: Option<String>,
    pub string_format: Option<StringFormat>,
    /// Reject duplicate items in a list
    pub unique_items: bool,
    /// Constraints applied to each item of a collection
    pub items: Option<Box<Constraints>>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn minimum(mut self, value: impl Into<Value>) -> Self {
        self.minimum = Some(value.into());
        self
    }

    pub fn maximum(mut self, value: impl Into<Value>) -> Self {
        self.maximum = Some(value.into());
        self
    }

    pub fn multiple_of(mut self, value: impl Into<Value>) -> Self {
        self.multiple_of = Some(value.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn string_format(mut self, format: StringFormat) -> Self {
        self.string_format = Some(format);
        self
    }

    pub fn unique_items(mut self) -> Self {
        self.unique_items = true;
        self
    }

    pub fn items(mut self, items: Constraints) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.minimum.is_none()
            && self.maximum.is_none()
            && self.multiple_of.is_none()
            && self.pattern.is_none()
            && self.string_format.is_none()
            && !self.unique_items
            && self.items.is_none()
    }

    /// Item constraints, or none
    pub(crate) fn item_constraints(&self) -> Constraints {
        self.items.as_deref().cloned().unwrap_or_default()
    }

    /// Fails unless every set constraint is in `allowed`
    pub(crate) fn allow_only(&self, type_name: &str, allowed: &[&str]) -> Result<(), TypeMapError> {
        let present = [
            ("minimum", self.minimum.is_some()),
            ("maximum", self.maximum.is_some()),
            ("multiple_of", self.multiple_of.is_some()),
            ("pattern", self.pattern.is_some()),
            ("string_format", self.string_format.is_some()),
            ("unique_items", self.unique_items),
            ("items", self.items.is_some()),
        ];
        match present
            .iter()
            .find(|(name, set)| *set && !allowed.contains(name))
        {
            Some((name, _)) => Err(TypeMapError::new(
                type_name,
                format!("constraint `{}` is not supported", name),
            )),
            None => Ok(()),
        }
    }

    /// Typed range from `minimum` / `maximum`
    pub(crate) fn range<T: FromBound>(&self, type_name: &str) -> Result<Range<T>, TypeMapError> {
        Ok(Range {
            minimum: convert_bound(type_name, "minimum", self.minimum.as_ref())?,
            maximum: convert_bound(type_name, "maximum", self.maximum.as_ref())?,
        })
    }

    /// Length range from `minimum` / `maximum`
    pub(crate) fn length(&self, type_name: &str) -> Result<Range<usize>, TypeMapError> {
        self.range::<usize>(type_name)
    }

    /// Typed, non-zero `multiple_of` factor
    pub(crate) fn factor<T: FromBound + Zero>(&self, type_name: &str) -> Result<Option<T>, TypeMapError> {
        let factor = convert_bound::<T>(type_name, "multiple_of", self.multiple_of.as_ref())?;
        match factor {
            Some(f) if f.is_zero() => Err(TypeMapError::new(type_name, "`multiple_of` must not be zero")),
            other => Ok(other),
        }
    }

    /// Compiles `pattern`, anchored at both ends
    pub(crate) fn compiled_pattern(&self, type_name: &str) -> Result<Option<PatternValue>, TypeMapError> {
        let Some(pattern) = self.pattern.as_deref() else {
            return Ok(None);
        };
        Regex::new(&anchor_pattern(pattern))
            .map(|regex| Some(PatternValue::new(regex)))
            .map_err(|e| TypeMapError::new(type_name, format!("invalid pattern: {}", e)))
    }
}

/// Wraps a pattern so it has to match the whole input
pub fn anchor_pattern(pattern: &str) -> String {
    if pattern.starts_with('^') && pattern.ends_with('$') && !pattern.ends_with("\\$") {
        return pattern.to_string();
    }
    let core = pattern.strip_prefix('^').unwrap_or(pattern);
    let core = match core.strip_suffix('$') {
        Some(stripped) if !stripped.ends_with('\\') => stripped,
        _ => core,
    };
    format!("^(?:{})$", core)
}

fn convert_bound<T: FromBound>(
    type_name: &str,
    constraint: &str,
    bound: Option<&Value>,
) -> Result<Option<T>, TypeMapError> {
    match bound {
        None => Ok(None),
        Some(value) => T::from_bound(value).map(Some).ok_or_else(|| {
            TypeMapError::new(
                type_name,
                format!("`{}` bound {} is not a valid {}", constraint, value, T::BOUND_KIND),
            )
        }),
    }
}

/// Inclusive bounds of one comparable kind
#[derive(Debug, Clone, PartialEq)]
pub struct Range<T> {
    pub minimum: Option<T>,
    pub maximum: Option<T>,
}

impl<T> Default for Range<T> {
    fn default() -> Self {
        Self {
            minimum: None,
            maximum: None,
        }
    }
}

impl<T> Range<T> {
    pub fn is_unbounded(&self) -> bool {
        self.minimum.is_none() && self.maximum.is_none()
    }
}

impl<T: Bounded> Range<T> {
    pub fn check(&self, value: &T) -> Result<(), ValidationError> {
        validate_range(value, self.minimum.as_ref(), self.maximum.as_ref())
    }
}

impl Range<usize> {
    pub fn check_length(&self, length: usize) -> Result<(), ValidationError> {
        validate_length(length, self.minimum, self.maximum)
    }
}

/// Conversion from a declared bound value
pub trait FromBound: Sized {
    const BOUND_KIND: &'static str;
    fn from_bound(value: &Value) -> Option<Self>;
}

/// Zero test for `multiple_of` factors
pub trait Zero {
    fn is_zero(&self) -> bool;
}

impl FromBound for usize {
    const BOUND_KIND: &'static str = "length";

    fn from_bound(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|i| usize::try_from(i).ok())
    }
}

impl FromBound for i64 {
    const BOUND_KIND: &'static str = "integer";

    fn from_bound(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl Zero for i64 {
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl FromBound for f64 {
    const BOUND_KIND: &'static str = "number";

    fn from_bound(value: &Value) -> Option<Self> {
        value.as_f64().filter(|f| f.is_finite())
    }
}

impl Zero for f64 {
    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl FromBound for Decimal {
    const BOUND_KIND: &'static str = "decimal";

    fn from_bound(value: &Value) -> Option<Self> {
        match value {
            Value::Decimal(d) => Some(*d),
            Value::Int(i) => Some(Decimal::from(*i)),
            Value::Float(f) => Decimal::try_from(*f).ok(),
            Value::String(s) => Decimal::from_str(s).ok(),
            _ => None,
        }
    }
}

impl Zero for Decimal {
    fn is_zero(&self) -> bool {
        Decimal::is_zero(self)
    }
}

impl FromBound for NaiveDate {
    const BOUND_KIND: &'static str = "date";

    fn from_bound(value: &Value) -> Option<Self> {
        match value {
            Value::Date(date) => Some(*date),
            Value::String(s) => parse_iso_date(s).ok(),
            _ => None,
        }
    }
}

impl FromBound for IsoDateTime {
    const BOUND_KIND: &'static str = "datetime";

    fn from_bound(value: &Value) -> Option<Self> {
        match value {
            Value::DateTime(datetime) => Some(*datetime),
            Value::String(s) => parse_iso_datetime(s).ok(),
            _ => None,
        }
    }
}

impl FromBound for IsoTime {
    const BOUND_KIND: &'static str = "time";

    fn from_bound(value: &Value) -> Option<Self> {
        match value {
            Value::Time(time) => Some(*time),
            Value::String(s) => parse_iso_time(s).ok(),
            _ => None,
        }
    }
}

impl FromBound for Duration {
    const BOUND_KIND: &'static str = "duration";

    fn from_bound(value: &Value) -> Option<Self> {
        match value {
            Value::Duration(duration) => Some(*duration),
            Value::String(s) => parse_iso_duration(s).ok(),
            _ => None,
        }
    }
}
