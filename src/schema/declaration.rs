//! Record type declarations
//!
//! A `RecordType` is the explicit declaration a host hands to the engine:
//! an ordered list of `FieldDecl`s plus record-level metadata. Schemas are
//! built from declarations lazily, once per record type.
//!
//! Every `build()` mints a new `RecordTypeId`. Two declarations that share
//! a name are still distinct types. A declaration is immutable once built
//! and can only nest types that already exist, so record types never form
//! a cycle.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::errors::{SchemaResult, SerialisationError, ValidationError};
use super::registry::SchemaRegistry;
use super::types::Schema;
use crate::codec::{Constraints, TypeDescriptor};
use crate::record::Record;
use crate::validators::StringFormat;
use crate::value::Value;

/// Caller-supplied validator; returns the accepted value
pub type ValidatorFn = Arc<dyn Fn(&Value) -> Result<Value, ValidationError> + Send + Sync>;

/// Caller-supplied serialiser for a single field
pub type SerialiserFn = Arc<dyn Fn(&Value) -> Result<JsonValue, SerialisationError> + Send + Sync>;

/// Caller-supplied deserialiser for a single field
pub type DeserialiserFn = Arc<dyn Fn(&Value) -> Result<Value, ValidationError> + Send + Sync>;

/// Produces a fresh default value on every call
pub type DefaultFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Runs after a record is constructed and before it is sealed
pub type PostInitFn = Arc<dyn Fn(&mut Record) -> Result<(), ValidationError> + Send + Sync>;

/// Default for an omitted field
#[derive(Clone)]
pub enum FieldDefault {
    Value(Value),
    Factory(DefaultFactory),
}

impl FieldDefault {
    /// Produces the default; factories are invoked anew each time
    pub fn produce(&self) -> Value {
        match self {
            FieldDefault::Value(value) => value.clone(),
            FieldDefault::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Value(value) => f.debug_tuple("Value").field(value).finish(),
            FieldDefault::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Declaration of one field
#[derive(Clone)]
pub struct FieldDecl {
    pub(crate) name: String,
    pub(crate) ty: TypeDescriptor,
    pub(crate) default: Option<FieldDefault>,
    pub(crate) constraints: Constraints,
    pub(crate) read_only: bool,
    pub(crate) write_only: bool,
    pub(crate) compare: bool,
    pub(crate) represent: bool,
    pub(crate) validator: Option<ValidatorFn>,
    pub(crate) serialiser: Option<SerialiserFn>,
    pub(crate) deserialiser: Option<DeserialiserFn>,
}

impl FieldDecl {
    /// A required field of the given type
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            constraints: Constraints::default(),
            read_only: false,
            write_only: false,
            compare: true,
            represent: true,
            validator: None,
            serialiser: None,
            deserialiser: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, TypeDescriptor::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, TypeDescriptor::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, TypeDescriptor::Boolean)
    }

    /// A `T | None` field
    pub fn optional(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self::new(name, TypeDescriptor::optional(ty))
    }

    /// A nested record field
    pub fn record(name: impl Into<String>, record_type: &RecordType) -> Self {
        Self::new(name, TypeDescriptor::record(record_type))
    }

    /// A list field
    pub fn list(name: impl Into<String>, item: TypeDescriptor) -> Self {
        Self::new(name, TypeDescriptor::list(item))
    }

    /// Default value used when the field is omitted
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    /// Default produced by calling `factory` each time the field is omitted
    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(FieldDefault::Factory(Arc::new(factory)));
        self
    }

    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn minimum(mut self, value: impl Into<Value>) -> Self {
        self.constraints.minimum = Some(value.into());
        self
    }

    pub fn maximum(mut self, value: impl Into<Value>) -> Self {
        self.constraints.maximum = Some(value.into());
        self
    }

    pub fn multiple_of(mut self, value: impl Into<Value>) -> Self {
        self.constraints.multiple_of = Some(value.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.constraints.pattern = Some(pattern.into());
        self
    }

    pub fn string_format(mut self, format: StringFormat) -> Self {
        self.constraints.string_format = Some(format);
        self
    }

    /// Constraints for each item of a collection field
    pub fn items(mut self, items: Constraints) -> Self {
        self.constraints.items = Some(Box::new(items));
        self
    }

    pub fn unique_items(mut self) -> Self {
        self.constraints.unique_items = true;
        self
    }

    /// Never read from input; set from the default on construction
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Accepted from input, never emitted on serialisation
    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    /// `init(false)` excludes the field from construction input, making it
    /// read-only
    pub fn init(mut self, init: bool) -> Self {
        if !init {
            self.read_only = true;
        }
        self
    }

    /// Whether the field takes part in record equality
    pub fn compare(mut self, compare: bool) -> Self {
        self.compare = compare;
        self
    }

    /// Whether the field appears in the record's textual representation
    pub fn represent(mut self, represent: bool) -> Self {
        self.represent = represent;
        self
    }

    /// Replaces codec validation for this field
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Replaces codec serialisation for this field
    pub fn serialiser<F>(mut self, serialiser: F) -> Self
    where
        F: Fn(&Value) -> Result<JsonValue, SerialisationError> + Send + Sync + 'static,
    {
        self.serialiser = Some(Arc::new(serialiser));
        self
    }

    /// Replaces codec deserialisation for this field
    pub fn deserialiser<F>(mut self, deserialiser: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        self.deserialiser = Some(Arc::new(deserialiser));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }
}

impl fmt::Debug for FieldDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDecl")
            .field("name", &self.name)
            .field("ty", &self.ty.type_name())
            .field("default", &self.default)
            .field("read_only", &self.read_only)
            .field("write_only", &self.write_only)
            .finish_non_exhaustive()
    }
}

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a declared record type; clones of a `RecordType` share it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordTypeId(u64);

impl RecordTypeId {
    pub(crate) fn next() -> Self {
        RecordTypeId(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RecordTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct RecordTypeInner {
    id: RecordTypeId,
    name: String,
    fields: Vec<FieldDecl>,
    frozen: bool,
    post_init: Option<PostInitFn>,
}

/// A declared record type. Cheap to clone.
///
/// Identity is the `RecordTypeId` minted by the builder, not the name.
#[derive(Clone)]
pub struct RecordType {
    inner: Arc<RecordTypeInner>,
}

impl RecordType {
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder {
            name: name.into(),
            fields: Vec::new(),
            frozen: false,
            post_init: None,
        }
    }

    pub fn id(&self) -> RecordTypeId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.inner.fields
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.frozen
    }

    pub(crate) fn post_init(&self) -> Option<&PostInitFn> {
        self.inner.post_init.as_ref()
    }

    /// Schema for this type from the process-wide registry
    pub fn schema(&self) -> SchemaResult<Arc<Schema>> {
        Ok(SchemaRegistry::global().schema_for(self)?)
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field(
                "fields",
                &self.inner.fields.iter().map(FieldDecl::name).collect::<Vec<_>>(),
            )
            .field("frozen", &self.inner.frozen)
            .finish()
    }
}

/// Builder for `RecordType`
pub struct RecordTypeBuilder {
    name: String,
    fields: Vec<FieldDecl>,
    frozen: bool,
    post_init: Option<PostInitFn>,
}

impl RecordTypeBuilder {
    /// Appends a field; declaration order is preserved
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    /// Records of this type cannot be modified once constructed
    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    /// Hook run on every newly constructed record
    pub fn post_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Record) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.post_init = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> RecordType {
        RecordType {
            inner: Arc::new(RecordTypeInner {
                id: RecordTypeId::next(),
                name: self.name,
                fields: self.fields,
                frozen: self.frozen,
                post_init: self.post_init,
            }),
        }
    }
}
