//! Process-wide schema registry
//!
//! Schemas are built lazily the first time a record type is seen and are
//! never evicted. Each `RecordTypeId` owns a `OnceLock` slot, so
//! concurrent first use builds exactly one schema and every reader observes
//! either no schema or a fully built one.
//!
//! Nested record types are built through the same registry while the outer
//! slot is being initialised. A declaration can only nest types built
//! before it, so the nesting graph is acyclic and no build waits on a slot
//! that is waiting on it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, LazyLock, OnceLock, PoisonError, RwLock};

use tracing::{debug, warn};

use super::declaration::{RecordType, RecordTypeId};
use super::errors::TypeMapError;
use super::types::{FieldDescriptor, Schema};
use crate::codec::{CodecTable, ExternalCodec};

type Slot = Arc<OnceLock<Result<Arc<Schema>, TypeMapError>>>;

static GLOBAL: LazyLock<SchemaRegistry> = LazyLock::new(SchemaRegistry::new);

/// Memoizes one schema per record type, plus the codec table used to
/// build them
#[derive(Default)]
pub struct SchemaRegistry {
    codecs: CodecTable,
    schemas: RwLock<HashMap<RecordTypeId, Slot>>,
}

impl SchemaRegistry {
    /// An isolated registry with its own codec table
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry used by `RecordType::schema` and the free functions
    pub fn global() -> &'static SchemaRegistry {
        &GLOBAL
    }

    pub fn codecs(&self) -> &CodecTable {
        &self.codecs
    }

    /// Registers an external codec for use by schemas built afterwards
    pub fn register_codec(&self, codec: Arc<dyn ExternalCodec>) {
        debug!(codec = codec.type_name(), "registered external codec");
        self.codecs.register(codec);
    }

    /// Whether a schema (or a build failure) is already cached for `record_type`
    pub fn is_built(&self, record_type: &RecordType) -> bool {
        let schemas = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
        schemas
            .get(&record_type.id())
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Returns the schema for `record_type`, building it on first use.
    ///
    /// Build failures are cached as well; the declaration is the same on
    /// every later call.
    pub fn schema_for(&self, record_type: &RecordType) -> Result<Arc<Schema>, TypeMapError> {
        let name = record_type.name();
        let id = record_type.id();

        let slot = self.slot(id);
        if let Some(cached) = slot.get() {
            debug!(record = name, %id, "schema cache hit");
            return cached.clone();
        }

        slot.get_or_init(|| {
            let built = self.build(record_type);
            match &built {
                Ok(schema) => debug!(record = name, %id, fields = schema.len(), "built schema"),
                Err(err) => warn!(record = name, %id, error = %err, "schema build failed"),
            }
            built
        })
        .clone()
    }

    fn slot(&self, id: RecordTypeId) -> Slot {
        {
            let schemas = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = schemas.get(&id) {
                return Arc::clone(slot);
            }
        }
        let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(schemas.entry(id).or_default())
    }

    fn build(&self, record_type: &RecordType) -> Result<Arc<Schema>, TypeMapError> {
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(record_type.fields().len());

        for decl in record_type.fields() {
            if !seen.insert(decl.name()) {
                return Err(TypeMapError::new(
                    record_type.name(),
                    format!("field `{}` is declared more than once", decl.name()),
                ));
            }
            let codec = self
                .codecs
                .map(decl.ty(), &decl.constraints, self)
                .map_err(|err| err.within(decl.name()))?;
            fields.push(FieldDescriptor::from_decl(decl, codec));
        }

        Ok(Arc::new(Schema::new(
            record_type.id(),
            record_type.name(),
            fields,
            record_type.is_frozen(),
            record_type.post_init().cloned(),
        )))
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schemas = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<&RecordTypeId> = schemas.keys().collect();
        ids.sort();
        f.debug_struct("SchemaRegistry")
            .field("codecs", &self.codecs)
            .field("schemas", &ids)
            .finish()
    }
}
