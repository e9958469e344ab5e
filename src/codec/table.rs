//! Type mapping: declared types to codecs

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::constraints::Constraints;
use super::external::ExternalCodec;
use super::types::{EnumType, TypeDescriptor};
use super::{Codec, CodecKind, StringRules, TupleItems};
use crate::schema::{SchemaRegistry, TypeMapError};
use crate::value::Value;

const NUMERIC: &[&str] = &["minimum", "maximum", "multiple_of"];
const RANGE: &[&str] = &["minimum", "maximum"];
const STRING: &[&str] = &["minimum", "maximum", "pattern", "string_format"];
const COLLECTION: &[&str] = &["minimum", "maximum", "items"];
const LIST: &[&str] = &["minimum", "maximum", "items", "unique_items"];

/// Maps declared types to codecs and holds the registered external codecs
#[derive(Default)]
pub struct CodecTable {
    external: RwLock<HashMap<String, Arc<dyn ExternalCodec>>>,
}

impl CodecTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an external codec under its type name, replacing any
    /// codec registered under the same name
    pub fn register(&self, codec: Arc<dyn ExternalCodec>) {
        let mut external = self.external.write().unwrap_or_else(PoisonError::into_inner);
        external.insert(codec.type_name().to_string(), codec);
    }

    /// Looks up an external codec by name
    pub fn external(&self, name: &str) -> Option<Arc<dyn ExternalCodec>> {
        let external = self.external.read().unwrap_or_else(PoisonError::into_inner);
        external.get(name).cloned()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.external(name).is_some()
    }

    /// Builds the codec for a declared type.
    ///
    /// Nested record types resolve their schema through `registry`.
    ///
    /// # Errors
    ///
    /// Returns `TypeMapError` if:
    /// - the type is `None` outside a union, or an empty union
    /// - an enumeration or literal has no values, or mixes value kinds
    /// - a dict key type cannot be rendered as a wire string
    /// - a constraint is malformed or not accepted by the kind
    /// - an external codec is not registered
    /// - a nested record type fails to build
    pub fn map(
        &self,
        descriptor: &TypeDescriptor,
        constraints: &Constraints,
        registry: &SchemaRegistry,
    ) -> Result<Codec, TypeMapError> {
        let name = descriptor.type_name();
        let c = constraints;

        let kind = match descriptor {
            TypeDescriptor::Any | TypeDescriptor::Collection => {
                c.allow_only(&name, &[])?;
                CodecKind::Any
            }
            TypeDescriptor::Boolean => {
                c.allow_only(&name, &[])?;
                CodecKind::Boolean
            }
            TypeDescriptor::Integer => {
                c.allow_only(&name, NUMERIC)?;
                CodecKind::Integer {
                    range: c.range(&name)?,
                    multiple_of: c.factor(&name)?,
                }
            }
            TypeDescriptor::Float => {
                c.allow_only(&name, NUMERIC)?;
                CodecKind::Float {
                    range: c.range(&name)?,
                    multiple_of: c.factor(&name)?,
                }
            }
            TypeDescriptor::Decimal => {
                c.allow_only(&name, NUMERIC)?;
                CodecKind::Decimal {
                    range: c.range(&name)?,
                    multiple_of: c.factor(&name)?,
                }
            }
            TypeDescriptor::String => {
                c.allow_only(&name, STRING)?;
                CodecKind::String(StringRules {
                    length: c.length(&name)?,
                    pattern: c.compiled_pattern(&name)?,
                    format: c.string_format,
                })
            }
            TypeDescriptor::Bytes => {
                c.allow_only(&name, RANGE)?;
                CodecKind::Bytes {
                    length: c.length(&name)?,
                }
            }
            TypeDescriptor::Date => {
                c.allow_only(&name, RANGE)?;
                CodecKind::Date(c.range(&name)?)
            }
            TypeDescriptor::DateTime => {
                c.allow_only(&name, RANGE)?;
                CodecKind::DateTime(c.range(&name)?)
            }
            TypeDescriptor::Time => {
                c.allow_only(&name, RANGE)?;
                CodecKind::Time(c.range(&name)?)
            }
            TypeDescriptor::Duration => {
                c.allow_only(&name, RANGE)?;
                CodecKind::Duration(c.range(&name)?)
            }
            TypeDescriptor::Uuid => {
                c.allow_only(&name, &[])?;
                CodecKind::Uuid
            }
            TypeDescriptor::Pattern => {
                c.allow_only(&name, &[])?;
                CodecKind::Pattern
            }
            TypeDescriptor::Ipv4 => {
                c.allow_only(&name, &[])?;
                CodecKind::Ipv4
            }
            TypeDescriptor::Ipv6 => {
                c.allow_only(&name, &[])?;
                CodecKind::Ipv6
            }
            TypeDescriptor::None => {
                return Err(TypeMapError::new(
                    name,
                    "absence is only valid as a union member",
                ))
            }
            TypeDescriptor::Literal(values) => {
                c.allow_only(&name, &[])?;
                if values.is_empty() {
                    return Err(TypeMapError::new(name, "a literal needs at least one value"));
                }
                CodecKind::Literal(values.clone())
            }
            TypeDescriptor::Enum(enum_type) => {
                c.allow_only(&name, &[])?;
                check_enum(enum_type)?;
                CodecKind::Enum(enum_type.clone())
            }
            TypeDescriptor::List(item) => {
                c.allow_only(&name, LIST)?;
                CodecKind::List {
                    item: Box::new(self.map(item, &c.item_constraints(), registry)?),
                    length: c.length(&name)?,
                    unique: c.unique_items,
                }
            }
            TypeDescriptor::Set(item) => {
                c.allow_only(&name, COLLECTION)?;
                CodecKind::Set {
                    item: Box::new(self.map(item, &c.item_constraints(), registry)?),
                    length: c.length(&name)?,
                }
            }
            TypeDescriptor::FrozenSet(item) => {
                c.allow_only(&name, COLLECTION)?;
                CodecKind::FrozenSet {
                    item: Box::new(self.map(item, &c.item_constraints(), registry)?),
                    length: c.length(&name)?,
                }
            }
            TypeDescriptor::Tuple(items) => {
                c.allow_only(&name, &[])?;
                let codecs = items
                    .iter()
                    .map(|item| self.map(item, &Constraints::default(), registry))
                    .collect::<Result<Vec<_>, _>>()?;
                CodecKind::Tuple(TupleItems::Fixed(codecs))
            }
            TypeDescriptor::VariadicTuple(item) => {
                c.allow_only(&name, &["items"])?;
                let item = self.map(item, &c.item_constraints(), registry)?;
                CodecKind::Tuple(TupleItems::Variadic(Box::new(item)))
            }
            TypeDescriptor::Dict(key, value) => {
                c.allow_only(&name, COLLECTION)?;
                let key = self.map(key, &Constraints::default(), registry)?;
                check_dict_key(&key)?;
                CodecKind::Dict {
                    key: Box::new(key),
                    value: Box::new(self.map(value, &c.item_constraints(), registry)?),
                    length: c.length(&name)?,
                }
            }
            TypeDescriptor::Union(alternatives) => {
                return self.map_union(&name, alternatives, c, registry)
            }
            TypeDescriptor::Record(record_type) => {
                c.allow_only(&name, &[])?;
                CodecKind::Record(registry.schema_for(record_type)?)
            }
            TypeDescriptor::External(external) => {
                c.allow_only(&name, &[])?;
                let codec = self.external(external).ok_or_else(|| {
                    TypeMapError::new(external.as_str(), "no external codec is registered under this name")
                })?;
                CodecKind::External(codec)
            }
        };

        Ok(Codec::new(kind))
    }

    /// `T | None` collapses to a nullable `T`; wider unions keep their
    /// alternatives in declaration order
    fn map_union(
        &self,
        name: &str,
        alternatives: &[TypeDescriptor],
        constraints: &Constraints,
        registry: &SchemaRegistry,
    ) -> Result<Codec, TypeMapError> {
        let nullable = alternatives.iter().any(TypeDescriptor::is_none);
        let members: Vec<&TypeDescriptor> = alternatives.iter().filter(|a| !a.is_none()).collect();

        match members.as_slice() {
            [] => Err(TypeMapError::new(
                name,
                "a union needs at least one alternative besides none",
            )),
            [single] => Ok(self.map(single, constraints, registry)?.with_nullable(nullable)),
            _ => {
                constraints.allow_only(name, &[])?;
                let codecs = members
                    .iter()
                    .map(|member| self.map(member, &Constraints::default(), registry))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Codec::new(CodecKind::Union(codecs)).with_nullable(nullable))
            }
        }
    }
}

impl fmt::Debug for CodecTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let external = self.external.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<&String> = external.keys().collect();
        names.sort();
        f.debug_struct("CodecTable").field("external", &names).finish()
    }
}

fn check_enum(enum_type: &EnumType) -> Result<(), TypeMapError> {
    let variants = enum_type.variants();
    if variants.is_empty() {
        return Err(TypeMapError::new(enum_type.name(), "an enumeration needs at least one variant"));
    }
    let all_int = variants.iter().all(|(_, v)| matches!(v, Value::Int(_)));
    let all_str = variants.iter().all(|(_, v)| matches!(v, Value::String(_)));
    if !all_int && !all_str {
        return Err(TypeMapError::new(
            enum_type.name(),
            "enumeration values must be all integers or all strings",
        ));
    }
    Ok(())
}

fn check_dict_key(key: &Codec) -> Result<(), TypeMapError> {
    match key.kind() {
        CodecKind::Any
        | CodecKind::Boolean
        | CodecKind::Integer { .. }
        | CodecKind::Float { .. }
        | CodecKind::Decimal { .. }
        | CodecKind::String(_)
        | CodecKind::Date(_)
        | CodecKind::DateTime(_)
        | CodecKind::Time(_)
        | CodecKind::Duration(_)
        | CodecKind::Uuid
        | CodecKind::Ipv4
        | CodecKind::Ipv6
        | CodecKind::Enum(_)
        | CodecKind::Literal(_) => Ok(()),
        _ => Err(TypeMapError::new(
            key.type_name(),
            "dict keys must be representable as strings",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ObjectIdCodec;
    use crate::validators::StringFormat;

    fn map(descriptor: TypeDescriptor, constraints: Constraints) -> Result<Codec, TypeMapError> {
        let registry = SchemaRegistry::new();
        registry.codecs().map(&descriptor, &constraints, &registry)
    }

    #[test]
    fn test_primitive_mapping() {
        let codec = map(TypeDescriptor::Integer, Constraints::new().minimum(1)).unwrap();
        assert!(matches!(codec.kind(), CodecKind::Integer { .. }));
        assert!(!codec.is_nullable());
    }

    #[test]
    fn test_optional_collapses_to_nullable() {
        let codec = map(
            TypeDescriptor::optional(TypeDescriptor::String),
            Constraints::new().minimum(2),
        )
        .unwrap();
        assert!(matches!(codec.kind(), CodecKind::String(_)));
        assert!(codec.is_nullable());
    }

    #[test]
    fn test_wide_union_keeps_order() {
        let codec = map(
            TypeDescriptor::union(vec![
                TypeDescriptor::Integer,
                TypeDescriptor::String,
                TypeDescriptor::None,
            ]),
            Constraints::default(),
        )
        .unwrap();
        assert!(codec.is_nullable());
        assert_eq!(codec.type_name(), "integer | string");
    }

    #[test]
    fn test_unparameterised_collection_is_any() {
        let codec = map(TypeDescriptor::Collection, Constraints::default()).unwrap();
        assert!(matches!(codec.kind(), CodecKind::Any));
    }

    #[test]
    fn test_type_map_errors() {
        assert!(map(TypeDescriptor::None, Constraints::default()).is_err());
        assert!(map(TypeDescriptor::union(vec![]), Constraints::default()).is_err());
        assert!(map(TypeDescriptor::Enum(EnumType::new("Empty")), Constraints::default()).is_err());
        assert!(map(
            TypeDescriptor::Enum(EnumType::new("Mixed").variant("A", 1).variant("B", "b")),
            Constraints::default()
        )
        .is_err());
        assert!(map(
            TypeDescriptor::dict(TypeDescriptor::list(TypeDescriptor::Integer), TypeDescriptor::Any),
            Constraints::default()
        )
        .is_err());
        assert!(map(TypeDescriptor::Boolean, Constraints::new().minimum(1)).is_err());
        assert!(map(
            TypeDescriptor::Integer,
            Constraints::new().string_format(StringFormat::Email)
        )
        .is_err());
    }

    #[test]
    fn test_external_codec_lookup() {
        let err = map(TypeDescriptor::external("bson-object-id"), Constraints::default()).unwrap_err();
        assert_eq!(err.type_name(), "bson-object-id");

        let registry = SchemaRegistry::new();
        registry.register_codec(Arc::new(ObjectIdCodec));
        let codec = registry
            .codecs()
            .map(&TypeDescriptor::external("bson-object-id"), &Constraints::default(), &registry)
            .unwrap();
        assert!(matches!(codec.kind(), CodecKind::External(_)));
    }

    #[test]
    fn test_item_constraints_reach_items() {
        let codec = map(
            TypeDescriptor::list(TypeDescriptor::String),
            Constraints::new().items(Constraints::new().maximum(3)),
        )
        .unwrap();
        assert!(codec
            .validate(&Value::List(vec![Value::from("abc")]))
            .is_ok());
        assert!(codec
            .validate(&Value::List(vec![Value::from("abcd")]))
            .is_err());
    }
}
