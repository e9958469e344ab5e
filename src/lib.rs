//! recordcodec - A strict, schema-driven record validation and serialisation engine
//!
//! Declared record types are mapped once to schemas of codecs, which then
//! validate loose input, build native records from it, and render records
//! back into a plain JSON wire shape.

pub mod codec;
pub mod config;
pub mod mapping;
pub mod record;
pub mod schema;
pub mod validators;
pub mod value;

pub use codec::{Codec, CodecKind, CodecTable, Constraints, EnumType, ExternalCodec, TypeDescriptor};
pub use config::ValidationConfig;
pub use mapping::{Directive, Mapping, Reshape};
pub use record::{deserialise, serialise, validate, validate_with, Record};
pub use schema::{
    FieldDecl, FieldError, RecordType, Schema, SchemaError, SchemaRegistry, SchemaResult,
    TypeMapError, ValidationError,
};
pub use validators::StringFormat;
pub use value::Value;
