//! Round Trip Tests
//!
//! For every record that passes validation, deserialising its serialised
//! form yields an equal record (equality limited to comparable fields).

use recordcodec::codec::{EnumType, TypeDescriptor};
use recordcodec::schema::{FieldDecl, RecordType, ValidationError};
use recordcodec::{deserialise, serialise, validate, Record, Value};
use serde_json::json;
use std::sync::LazyLock;

// =============================================================================
// Helper Functions
// =============================================================================

fn dimensions() -> RecordType {
    RecordType::builder("Dimensions")
        .field(FieldDecl::new("width", TypeDescriptor::Float).minimum(0))
        .field(FieldDecl::new("height", TypeDescriptor::Float).minimum(0))
        .build()
}

static PRODUCT: LazyLock<RecordType> = LazyLock::new(|| {
    let status = EnumType::new("Status")
        .variant("DRAFT", 0)
        .variant("LIVE", 1);

    RecordType::builder("Product")
        .field(FieldDecl::string("sku").pattern("[A-Z]{3}-[0-9]{4}"))
        .field(FieldDecl::new("price", TypeDescriptor::Decimal).minimum(0))
        .field(FieldDecl::new("status", TypeDescriptor::Enum(status)))
        .field(FieldDecl::record("size", &dimensions()))
        .field(FieldDecl::new("tags", TypeDescriptor::set(TypeDescriptor::String)))
        .field(FieldDecl::new(
            "stock",
            TypeDescriptor::dict(TypeDescriptor::Integer, TypeDescriptor::Integer),
        ))
        .field(FieldDecl::new(
            "origin",
            TypeDescriptor::tuple(vec![TypeDescriptor::String, TypeDescriptor::Integer]),
        ))
        .field(FieldDecl::new("launch", TypeDescriptor::Date))
        .field(FieldDecl::new("opens", TypeDescriptor::Time))
        .field(FieldDecl::new("warranty", TypeDescriptor::Duration))
        .field(FieldDecl::new("host", TypeDescriptor::Ipv4))
        .field(FieldDecl::optional("note", TypeDescriptor::String))
        .field(FieldDecl::boolean("featured").default(false))
        .field(FieldDecl::integer("views").default(0).compare(false))
        .build()
});

fn product_input() -> serde_json::Value {
    json!({
        "sku": "ABC-1234",
        "price": "19.99",
        "status": 1,
        "size": {"width": 2.5, "height": 4},
        "tags": ["new", "sale"],
        "stock": {"1": 10, "2": 0},
        "origin": ["NL", 1999],
        "launch": "2021-06-01",
        "opens": "09:30:00.5+02:00",
        "warranty": "PT90M",
        "host": "192.0.2.1",
        "featured": "yes",
        "views": 12
    })
}

fn round_trip(record_type: &RecordType, record: &Record) -> Record {
    let wire = serialise(record, None).unwrap();
    deserialise(record_type, &Value::from_json(&wire)).unwrap()
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_product_round_trip() {
    let input = Value::from_json(&product_input());
    let record = deserialise(&PRODUCT, &input).unwrap();

    assert_eq!(record.get("featured"), Some(&Value::Bool(true)));
    assert_eq!(record.get("note"), Some(&Value::Null));
    assert!(matches!(record.get("stock"), Some(Value::Dict(_))));

    assert_eq!(round_trip(&PRODUCT, &record), record);
}

#[test]
fn test_serialised_form_validates() {
    let record = deserialise(&PRODUCT, &Value::from_json(&product_input())).unwrap();
    let wire = serialise(&record, None).unwrap();

    assert_eq!(wire["stock"], json!({"1": 10, "2": 0}));
    assert_eq!(wire["opens"], json!("09:30:00.500+02:00"));
    assert_eq!(wire["warranty"], json!("PT1H30M"));
    assert_eq!(wire["size"], json!({"width": 2.5, "height": 4.0}));
    assert_eq!(wire["featured"], json!(true));
}

#[test]
fn test_non_comparable_field_still_serialised() {
    let record = deserialise(&PRODUCT, &Value::from_json(&product_input())).unwrap();
    let wire = serialise(&record, None).unwrap();
    assert_eq!(wire["views"], json!(12));

    let mut changed = round_trip(&PRODUCT, &record);
    changed.set("views", 99).unwrap();
    assert_eq!(changed, record);
}

#[test]
fn test_pattern_is_anchored() {
    let mut input = product_input();
    input["sku"] = json!("xABC-1234");
    let err = validate(&PRODUCT, &Value::from_json(&input)).unwrap_err();
    assert_eq!(err.as_field_error().unwrap().field_name(), "sku");
}

#[test]
fn test_record_input_is_returned_as_is() {
    let record = deserialise(&PRODUCT, &Value::from_json(&product_input())).unwrap();
    let again = deserialise(&PRODUCT, &Value::Record(record.clone())).unwrap();
    assert_eq!(again, record);
    assert!(validate(&PRODUCT, &Value::Record(record)).is_ok());
}

/// Dicts and sets compare without regard to order, so a dict assigned in
/// non-sorted key order survives the trip through a sorted wire map.
#[test]
fn test_unordered_collections_round_trip() {
    let shelf = RecordType::builder("Shelf")
        .field(FieldDecl::new(
            "counts",
            TypeDescriptor::dict(TypeDescriptor::String, TypeDescriptor::Integer),
        ))
        .field(FieldDecl::new("labels", TypeDescriptor::set(TypeDescriptor::String)))
        .build();

    let mut record = deserialise(
        &shelf,
        &Value::from_json(&json!({"counts": {}, "labels": []})),
    )
    .unwrap();
    record
        .set(
            "counts",
            Value::Dict(vec![
                (Value::from("b"), Value::Int(1)),
                (Value::from("a"), Value::Int(2)),
            ]),
        )
        .unwrap();
    record
        .set("labels", Value::Set(vec![Value::from("z"), Value::from("y")]))
        .unwrap();

    let wire = serialise(&record, None).unwrap();
    assert_eq!(wire["counts"], json!({"b": 1, "a": 2}));
    assert_eq!(round_trip(&shelf, &record), record);

    let reordered = deserialise(
        &shelf,
        &Value::from_json(&json!({"counts": {"a": 2, "b": 1}, "labels": ["y", "z"]})),
    )
    .unwrap();
    assert_eq!(reordered, record);
}

// =============================================================================
// Frozen Record Tests
// =============================================================================

static TICKET: LazyLock<RecordType> = LazyLock::new(|| {
    RecordType::builder("Ticket")
        .field(FieldDecl::string("code"))
        .field(FieldDecl::string("label").init(false).default(""))
        .post_init(|record| {
            let code = record
                .get("code")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_uppercase();
            record
                .set("label", format!("#{code}"))
                .map_err(|_| ValidationError::custom("label_error", "Could not derive label."))
        })
        .frozen()
        .build()
});

#[test]
fn test_frozen_round_trip_reruns_post_init() {
    let record = deserialise(&TICKET, &Value::from_json(&json!({"code": "ab1"}))).unwrap();
    assert_eq!(record.get("label"), Some(&Value::from("#AB1")));
    assert!(record.is_frozen());

    let wire = serialise(&record, None).unwrap();
    assert_eq!(wire, json!({"code": "ab1", "label": "#AB1"}));
    assert_eq!(round_trip(&TICKET, &record), record);
}

#[test]
fn test_frozen_record_rejects_assignment() {
    let mut record = deserialise(&TICKET, &Value::from_json(&json!({"code": "ab1"}))).unwrap();
    assert!(record.set("code", "zz9").is_err());
    assert_eq!(record.get("code"), Some(&Value::from("ab1")));
}
