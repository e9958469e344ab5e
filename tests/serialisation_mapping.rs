//! Serialisation and Mapping Tests
//!
//! Output shaping per call:
//! - Fields are emitted in declaration order, write-only fields never
//! - Exclude, rename, custom and reshape directives
//! - Item projection over nested records and collections of records
//! - Union fields resolve to the alternative whose field set matches

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use recordcodec::codec::{EnumType, TypeDescriptor};
use recordcodec::mapping::{Mapping, Reshape};
use recordcodec::schema::{FieldDecl, RecordType, SchemaError, SchemaRegistry};
use recordcodec::{deserialise, serialise, Record, Value};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn artist() -> RecordType {
    RecordType::builder("Artist")
        .field(FieldDecl::string("name"))
        .build()
}

fn song() -> RecordType {
    RecordType::builder("Song")
        .field(FieldDecl::string("title"))
        .field(FieldDecl::integer("length").default(0))
        .build()
}

fn album() -> RecordType {
    RecordType::builder("Album")
        .field(FieldDecl::string("name"))
        .field(FieldDecl::record("artist", &artist()))
        .field(FieldDecl::list("songs", TypeDescriptor::record(&song())))
        .field(FieldDecl::string("upc").write_only().default(""))
        .build()
}

fn blue() -> Record {
    deserialise(
        &album(),
        &Value::from_json(&json!({
            "name": "Blue",
            "artist": {"name": "Joni"},
            "songs": [
                {"title": "All I Want", "length": 214},
                {"title": "My Old Man", "length": 215}
            ],
            "upc": "0075992"
        })),
    )
    .unwrap()
}

// =============================================================================
// Plain Serialisation Tests
// =============================================================================

#[test]
fn test_plain_serialisation() {
    let out = serialise(&blue(), None).unwrap();
    assert_eq!(
        out,
        json!({
            "name": "Blue",
            "artist": {"name": "Joni"},
            "songs": [
                {"title": "All I Want", "length": 214},
                {"title": "My Old Man", "length": 215}
            ]
        })
    );

    let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["name", "artist", "songs"]);
}

#[test]
fn test_scalar_wire_shapes() {
    let invoice = RecordType::builder("Invoice")
        .field(FieldDecl::new("total", TypeDescriptor::Decimal))
        .field(FieldDecl::new("issued", TypeDescriptor::DateTime))
        .field(FieldDecl::new("due", TypeDescriptor::Duration))
        .field(FieldDecl::new("scan", TypeDescriptor::Bytes))
        .field(FieldDecl::new("ref", TypeDescriptor::Uuid))
        .build();

    let record = deserialise(
        &invoice,
        &Value::from_json(&json!({
            "total": "12.50",
            "issued": "2021-03-04T05:06:07Z",
            "due": "P1DT2H",
            "scan": "aGk=",
            "ref": "936da01f-9abd-4d9d-80c7-02af85c822a8"
        })),
    )
    .unwrap();

    assert_eq!(record.get("scan"), Some(&Value::Bytes(b"hi".to_vec())));
    assert_eq!(
        record.serialise(None).unwrap(),
        json!({
            "total": "12.50",
            "issued": "2021-03-04T05:06:07Z",
            "due": "P1DT2H",
            "scan": "aGk=",
            "ref": "936da01f-9abd-4d9d-80c7-02af85c822a8"
        })
    );
}

#[test]
fn test_enum_serialises_underlying_value() {
    let size = EnumType::new("Size").variant("SMALL", "s").variant("LARGE", "l");
    let shirt = RecordType::builder("Shirt")
        .field(FieldDecl::new("size", TypeDescriptor::Enum(size)))
        .build();

    let record = deserialise(&shirt, &Value::from_json(&json!({"size": "l"}))).unwrap();
    assert_eq!(record.to_string(), "Shirt(size=Size.LARGE)");
    assert_eq!(record.serialise(None).unwrap(), json!({"size": "l"}));
}

// =============================================================================
// Directive Tests
// =============================================================================

/// Projection flattens a record to one field and a list of records to a
/// list of scalars.
#[test]
fn test_item_projection() {
    let mapping = Mapping::new()
        .reshape("artist", Reshape::new().item("name"))
        .reshape("songs", Reshape::new().item("title"));

    let out = blue().serialise(Some(&mapping)).unwrap();
    assert_eq!(out["artist"], json!("Joni"));
    assert_eq!(out["songs"], json!(["All I Want", "My Old Man"]));
}

#[test]
fn test_mapping_from_dictionary_form() {
    let mapping = Mapping::from_json(&json!({
        "name": "title",
        "artist": {"$self": "performer", "name": "full_name"},
        "songs": {"length": false}
    }))
    .unwrap();

    let out = blue().serialise(Some(&mapping)).unwrap();
    assert_eq!(
        out,
        json!({
            "title": "Blue",
            "performer": {"full_name": "Joni"},
            "songs": [{"title": "All I Want"}, {"title": "My Old Man"}]
        })
    );
}

#[test]
fn test_exclude_and_custom() {
    let mapping = Mapping::new().exclude("songs").custom("artist", |value| {
        let name = value
            .as_record()
            .and_then(|artist| artist.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        ("by".to_string(), json!(name))
    });

    let out = blue().serialise(Some(&mapping)).unwrap();
    assert_eq!(out, json!({"name": "Blue", "by": "Joni"}));
}

/// Projecting a key that records do not have is a serialisation error.
#[test]
fn test_projection_of_missing_key_on_record() {
    let mapping = Mapping::new().reshape("artist", Reshape::new().item("label"));
    let err = blue().serialise(Some(&mapping)).unwrap_err();
    assert!(matches!(err, SchemaError::Serialisation(_)));
}

/// Collection items lacking the projected key are skipped.
#[test]
fn test_projection_skips_items_without_key() {
    let mapping = Mapping::new().reshape("songs", Reshape::new().item("label"));
    let out = blue().serialise(Some(&mapping)).unwrap();
    assert_eq!(out["songs"], json!([]));
}

/// A custom field serialiser survives a rename but not a reshape.
#[test]
fn test_custom_serialiser_precedence() {
    let badge = RecordType::builder("Badge")
        .field(FieldDecl::string("label").serialiser(|value| {
            Ok(json!(format!("[{}]", value.as_str().unwrap_or_default())))
        }))
        .build();
    let record = deserialise(&badge, &Value::from_json(&json!({"label": "new"}))).unwrap();

    let renamed = record
        .serialise(Some(&Mapping::new().rename("label", "text")))
        .unwrap();
    assert_eq!(renamed, json!({"text": "[new]"}));

    let reshaped = record
        .serialise(Some(&Mapping::new().reshape("label", Reshape::new().rename("text"))))
        .unwrap();
    assert_eq!(reshaped, json!({"text": "new"}));
}

// =============================================================================
// Union Tests
// =============================================================================

fn pet() -> RecordType {
    let dog = RecordType::builder("Dog")
        .field(FieldDecl::integer("age"))
        .field(FieldDecl::string("group"))
        .field(FieldDecl::optional("good_boy", TypeDescriptor::Boolean))
        .build();
    let fish = RecordType::builder("Fish")
        .field(FieldDecl::integer("age"))
        .field(FieldDecl::string("group"))
        .field(FieldDecl::integer("fins"))
        .build();
    let animal = RecordType::builder("Animal")
        .field(FieldDecl::integer("age"))
        .field(FieldDecl::string("group"))
        .build();

    RecordType::builder("Pet")
        .field(FieldDecl::new(
            "animal",
            TypeDescriptor::union(vec![
                TypeDescriptor::record(&dog),
                TypeDescriptor::record(&fish),
                TypeDescriptor::record(&animal),
            ]),
        ))
        .build()
}

/// The alternative whose field set matches the input wins.
#[test]
fn test_union_picks_exact_record() {
    let record = deserialise(
        &pet(),
        &Value::from_json(&json!({"animal": {"age": 10, "group": "fish", "fins": 2}})),
    )
    .unwrap();

    let animal = record.get("animal").and_then(Value::as_record).unwrap();
    assert_eq!(animal.type_name(), "Fish");
    assert_eq!(
        record.serialise(None).unwrap(),
        json!({"animal": {"age": 10, "group": "fish", "fins": 2}})
    );
}

/// Without an exact field-set match the first alternative that accepts the
/// input wins, in declaration order.
#[test]
fn test_union_falls_back_to_declaration_order() {
    let record = deserialise(
        &pet(),
        &Value::from_json(&json!({"animal": {"age": 3, "group": "mammal", "colour": "red"}})),
    )
    .unwrap();
    let animal = record.get("animal").and_then(Value::as_record).unwrap();
    assert_eq!(animal.type_name(), "Dog");
}

// =============================================================================
// Default Tests
// =============================================================================

/// Every omission of a factory-defaulted field gets a fresh value.
#[test]
fn test_default_factory_is_fresh() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let playlist = RecordType::builder("Playlist")
        .field(FieldDecl::string("name"))
        .field(
            FieldDecl::list("tags", TypeDescriptor::String).default_factory(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Value::List(Vec::new())
            }),
        )
        .build();

    let schema = SchemaRegistry::new().schema_for(&playlist).unwrap();
    let input = Value::from_json(&json!({"name": "mix"}));
    let mut first = schema.deserialise(&input).unwrap();
    let second = schema.deserialise(&input).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    first.set("tags", vec![Value::from("chill")]).unwrap();
    assert_eq!(second.get("tags"), Some(&Value::List(Vec::new())));
    assert_ne!(first, second);
}
