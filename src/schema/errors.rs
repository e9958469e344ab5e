//! Error types for validation, type mapping and (de)serialisation
//!
//! Data errors (REJECT):
//! - `type_error`, `iterable_error`, `unique_error`
//! - `format_error`
//! - `minimum_bound`, `maximum_bound`
//! - `minimum_length`, `maximum_length`
//! - `multiple_of_error`
//! - `any_error`, `literal_error`
//!
//! Declaration errors (FATAL):
//! - `TypeMapError`, raised only while a schema is being built

use std::fmt;

use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller input rejected
    Reject,
    /// Record declaration is unusable; a programming error
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Machine-readable kind of a validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Value has the wrong representation kind
    Type,
    /// Value is not an iterable collection
    Iterable,
    /// Collection contains duplicate items
    Unique,
    /// String does not match a named format or pattern
    Format,
    /// Value is lower than the declared minimum
    MinimumBound,
    /// Value is greater than the declared maximum
    MaximumBound,
    /// Value is shorter than the declared minimum length
    MinimumLength,
    /// Value is longer than the declared maximum length
    MaximumLength,
    /// Value is not a multiple of the declared factor
    MultipleOf,
    /// No union alternative accepted the value
    Any,
    /// Value is not one of the allowed literals
    Literal,
    /// Failure raised by a caller-supplied validator
    Custom {
        /// Caller-chosen code
        code: String,
        /// Caller-chosen message template
        message: String,
    },
}

impl ErrorKind {
    /// Returns the string code of this kind
    pub fn code(&self) -> &str {
        match self {
            ErrorKind::Type => "type_error",
            ErrorKind::Iterable => "iterable_error",
            ErrorKind::Unique => "unique_error",
            ErrorKind::Format => "format_error",
            ErrorKind::MinimumBound => "minimum_bound",
            ErrorKind::MaximumBound => "maximum_bound",
            ErrorKind::MinimumLength => "minimum_length",
            ErrorKind::MaximumLength => "maximum_length",
            ErrorKind::MultipleOf => "multiple_of_error",
            ErrorKind::Any => "any_error",
            ErrorKind::Literal => "literal_error",
            ErrorKind::Custom { code, .. } => code,
        }
    }

    /// Returns the human message template; `{name}` placeholders are
    /// filled from the error context
    pub fn message_template(&self) -> &str {
        match self {
            ErrorKind::Type => "Passed value must be valid {expected_type} type.",
            ErrorKind::Iterable => "Passed value is not expected iterable type.",
            ErrorKind::Unique => "Passed value must contain only unique items.",
            ErrorKind::Format => "Passed value must be valid string format: {expected_format}.",
            ErrorKind::MinimumBound => {
                "Passed value must be greater than set minimum `{expected_minimum}`."
            }
            ErrorKind::MaximumBound => {
                "Passed value must be lower than set maximum `{expected_maximum}`."
            }
            ErrorKind::MinimumLength => {
                "Passed value's length must be greater than set minimum `{expected_minimum}`."
            }
            ErrorKind::MaximumLength => {
                "Passed value's length must be lower than set maximum `{expected_maximum}`."
            }
            ErrorKind::MultipleOf => "Passed value must be a multiple of `{multiple_of}`.",
            ErrorKind::Any => "Passed value could not be validated against any of {expected_types}.",
            ErrorKind::Literal => "Passed value must be one of {allowed_values}.",
            ErrorKind::Custom { message, .. } => message,
        }
    }

    /// Type errors include iterable and uniqueness failures
    pub fn is_type_error(&self) -> bool {
        matches!(self, ErrorKind::Type | ErrorKind::Iterable | ErrorKind::Unique)
    }

    /// Numeric or temporal range violation
    pub fn is_bound_error(&self) -> bool {
        matches!(self, ErrorKind::MinimumBound | ErrorKind::MaximumBound)
    }

    /// String, bytes or collection length violation
    pub fn is_length_error(&self) -> bool {
        matches!(self, ErrorKind::MinimumLength | ErrorKind::MaximumLength)
    }

    /// Bounds, lengths and multiple-of violations
    pub fn is_arithmetic_error(&self) -> bool {
        self.is_bound_error() || self.is_length_error() || *self == ErrorKind::MultipleOf
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single validation failure with structured context
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", self.message())]
pub struct ValidationError {
    kind: ErrorKind,
    context: Map<String, JsonValue>,
}

impl ValidationError {
    /// Creates an error of the given kind with empty context
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: Map::new(),
        }
    }

    /// Value has the wrong representation kind
    pub fn type_error(expected_type: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type).with_context("expected_type", expected_type.into())
    }

    /// Value is not an iterable collection
    pub fn iterable_error() -> Self {
        Self::new(ErrorKind::Iterable)
    }

    /// Collection contains duplicates
    pub fn unique_error() -> Self {
        Self::new(ErrorKind::Unique)
    }

    /// String fails the named format
    pub fn format_error(expected_format: impl Into<String>) -> Self {
        Self::new(ErrorKind::Format).with_context("expected_format", expected_format.into())
    }

    /// Value below the minimum bound
    pub fn minimum_bound(expected_minimum: impl Into<JsonValue>) -> Self {
        Self::new(ErrorKind::MinimumBound).with_context("expected_minimum", expected_minimum)
    }

    /// Value above the maximum bound
    pub fn maximum_bound(expected_maximum: impl Into<JsonValue>) -> Self {
        Self::new(ErrorKind::MaximumBound).with_context("expected_maximum", expected_maximum)
    }

    /// Length below the minimum
    pub fn minimum_length(expected_minimum: usize) -> Self {
        Self::new(ErrorKind::MinimumLength).with_context("expected_minimum", expected_minimum)
    }

    /// Length above the maximum
    pub fn maximum_length(expected_maximum: usize) -> Self {
        Self::new(ErrorKind::MaximumLength).with_context("expected_maximum", expected_maximum)
    }

    /// Value is not a multiple of `multiple_of`
    pub fn multiple_of(multiple_of: impl Into<JsonValue>) -> Self {
        Self::new(ErrorKind::MultipleOf).with_context("multiple_of", multiple_of)
    }

    /// No union alternative matched
    pub fn any_error(expected_types: Vec<String>) -> Self {
        Self::new(ErrorKind::Any).with_context("expected_types", expected_types.join(" | "))
    }

    /// Value outside the allowed literal set
    pub fn literal_error(allowed_values: JsonValue) -> Self {
        Self::new(ErrorKind::Literal).with_context("allowed_values", allowed_values)
    }

    /// Failure raised by a caller-supplied validator
    pub fn custom(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Custom {
            code: code.into(),
            message: message.into(),
        })
    }

    /// Adds a context entry
    pub fn with_context(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    /// Returns the error kind
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the machine-readable code
    pub fn code(&self) -> &str {
        self.kind.code()
    }

    /// Returns the unrendered message template
    pub fn message_template(&self) -> &str {
        self.kind.message_template()
    }

    /// Returns the structured context
    pub fn context(&self) -> &Map<String, JsonValue> {
        &self.context
    }

    /// Data errors are always rejections
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }

    /// Renders the message template against the context
    pub fn message(&self) -> String {
        render_template(self.kind.message_template(), &self.context)
    }
}

/// A validation failure annotated with the field path where it occurred.
///
/// The path is ordered outermost first, so `Album.artist.name` failing
/// renders as `artist.name`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Field error `{}`: {cause}", self.path_string())]
pub struct FieldError {
    path: Vec<String>,
    cause: ValidationError,
}

impl FieldError {
    /// Wraps a validation error with a single field name
    pub fn new(field: impl Into<String>, cause: ValidationError) -> Self {
        Self {
            path: vec![field.into()],
            cause,
        }
    }

    /// Wraps this error in an outer field, extending the path
    pub fn within(mut self, field: impl Into<String>) -> Self {
        self.path.insert(0, field.into());
        self
    }

    /// The outermost field name
    pub fn field_name(&self) -> &str {
        self.path.first().map(String::as_str).unwrap_or_default()
    }

    /// The full field path, outermost first
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The path joined with dots
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }

    /// The underlying validation error
    pub fn cause(&self) -> &ValidationError {
        &self.cause
    }

    /// Field errors share a single code
    pub fn code(&self) -> &'static str {
        "field_error"
    }

    /// Cause context plus the rendered `field_name`
    pub fn context(&self) -> Map<String, JsonValue> {
        let mut context = Map::new();
        context.insert("field_name".to_string(), JsonValue::String(self.path_string()));
        for (key, value) in &self.cause.context {
            context.insert(key.clone(), value.clone());
        }
        context
    }
}

/// A declared type could not be mapped to a codec.
///
/// Raised while building a schema, never while handling data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot map type `{type_name}`{}: {reason}", render_path(&self.path))]
pub struct TypeMapError {
    type_name: String,
    reason: String,
    path: Vec<String>,
}

impl TypeMapError {
    pub fn new(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            reason: reason.into(),
            path: Vec::new(),
        }
    }

    /// Adds an outer field or record name to the path
    pub fn within(mut self, name: impl Into<String>) -> Self {
        self.path.insert(0, name.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }
}

/// A native value could not be rendered in the wire shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("serialisation failed{}: {message}", render_path(&self.path))]
pub struct SerialisationError {
    message: String,
    path: Vec<String>,
}

impl SerialisationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }

    /// Value does not have the kind the codec serialises
    pub fn unexpected(expected: &str, found: &str) -> Self {
        Self::new(format!("expected native {} value, got {}", expected, found))
    }

    pub fn within(mut self, field: impl Into<String>) -> Self {
        self.path.insert(0, field.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }
}

/// Input could not be converted structurally into a native value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("deserialisation failed{}: {message}", render_path(&self.path))]
pub struct DeserialisationError {
    message: String,
    path: Vec<String>,
}

impl DeserialisationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }

    pub fn within(mut self, field: impl Into<String>) -> Self {
        self.path.insert(0, field.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }
}

/// Crate-level error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A value failed validation outside of any field
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A field (or nested field) failed validation
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Input map contains a key the record does not declare
    #[error("unknown field `{field}` passed to record `{record}`")]
    UnknownField {
        /// Record type name
        record: String,
        /// Offending key
        field: String,
    },

    /// Attempt to assign to a sealed record
    #[error("cannot modify field `{field}` of `{record}`, the record is frozen")]
    FrozenRecord {
        /// Record type name
        record: String,
        /// Field the caller tried to assign
        field: String,
    },

    /// A mapping description has an unsupported shape
    #[error("invalid mapping for `{key}`: {reason}")]
    InvalidMapping {
        /// Mapping key
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// Declared type cannot be mapped (FATAL)
    #[error(transparent)]
    TypeMap(#[from] TypeMapError),

    /// Native value cannot be serialised
    #[error(transparent)]
    Serialisation(#[from] SerialisationError),

    /// Input cannot be deserialised
    #[error(transparent)]
    Deserialisation(#[from] DeserialisationError),
}

impl SchemaError {
    /// Attributes this error to a field of the enclosing record.
    ///
    /// Validation errors become field errors; errors that already carry a
    /// path have the field prepended.
    pub fn in_field(self, field: &str) -> Self {
        match self {
            SchemaError::Validation(error) => SchemaError::Field(FieldError::new(field, error)),
            SchemaError::Field(error) => SchemaError::Field(error.within(field)),
            SchemaError::Serialisation(error) => SchemaError::Serialisation(error.within(field)),
            SchemaError::Deserialisation(error) => {
                SchemaError::Deserialisation(error.within(field))
            }
            SchemaError::TypeMap(error) => SchemaError::TypeMap(error.within(field)),
            other => other,
        }
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        match self {
            SchemaError::TypeMap(_) => Severity::Fatal,
            _ => Severity::Reject,
        }
    }

    /// Returns whether this error signals a broken declaration
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Returns the field error, if this is one
    pub fn as_field_error(&self) -> Option<&FieldError> {
        match self {
            SchemaError::Field(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the innermost validation error, if any
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            SchemaError::Validation(error) => Some(error),
            SchemaError::Field(error) => Some(error.cause()),
            _ => None,
        }
    }
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

fn render_template(template: &str, context: &Map<String, JsonValue>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in context {
        let placeholder = format!("{{{}}}", key);
        if !rendered.contains(&placeholder) {
            continue;
        }
        let text = match value {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        rendered = rendered.replace(&placeholder, &text);
    }
    rendered
}

fn render_path(path: &[String]) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" at `{}`", path.join("."))
    }
}
