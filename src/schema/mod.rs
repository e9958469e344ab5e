//! Record schemas
//!
//! A schema binds every declared field of a record type to a codec plus the
//! field's defaults, visibility and overrides.
//!
//! # Design Principles
//!
//! - Declarations are explicit `RecordType` values, never reflection
//! - One schema per record type identity, built lazily and never mutated
//! - Concurrent first use builds exactly once
//! - The first failing field aborts validation
//! - Declaration errors are fatal `TypeMapError`s raised at build time

mod declaration;
mod errors;
mod registry;
mod types;
mod validator;

pub use declaration::{
    DefaultFactory, DeserialiserFn, FieldDecl, FieldDefault, PostInitFn, RecordType,
    RecordTypeBuilder, RecordTypeId, SerialiserFn, ValidatorFn,
};
pub use errors::{
    DeserialisationError, ErrorKind, FieldError, SchemaError, SchemaResult, SerialisationError,
    Severity, TypeMapError, ValidationError,
};
pub use registry::SchemaRegistry;
pub use types::{FieldDescriptor, Schema};
