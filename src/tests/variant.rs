use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec;

use crate::{Array, Document, JsonFormat, Value, Variant};

#[test]
fn map_becomes_object_document() {
    let mut map = BTreeMap::new();
    map.insert(String::from("flag"), Variant::Bool(true));
    map.insert(String::from("n"), Variant::Double(4.0));
    map.insert(
        String::from("inner"),
        Variant::List(vec![Variant::Null, Variant::String("x".into())]),
    );

    let doc = Document::from_variant(&Variant::Map(map.clone())).unwrap();
    assert!(doc.is_object());
    assert_eq!(doc.to_json(JsonFormat::Compact), r#"{"flag":true,"inner":[null,"x"],"n":4}"#);
    assert_eq!(doc.to_variant(), Variant::Map(map));
}

#[test]
fn string_list_becomes_array_document() {
    let list = Variant::StringList(vec!["one".into(), "two".into()]);
    let doc = Document::from_variant(&list).unwrap();
    assert!(doc.is_array());
    assert_eq!(doc.to_json(JsonFormat::Compact), r#"["one","two"]"#);
    // Reading back yields a generic list; the string-list shape is one-way.
    assert_eq!(
        doc.to_variant(),
        Variant::List(vec![
            Variant::String("one".into()),
            Variant::String("two".into())
        ])
    );
}

#[test]
fn scalars_cannot_root_a_document() {
    assert!(Document::from_variant(&Variant::Null).is_none());
    assert!(Document::from_variant(&Variant::Bool(true)).is_none());
    assert!(Document::from_variant(&Variant::Double(1.0)).is_none());
    assert!(Document::from_variant(&Variant::String("s".into())).is_none());
}

#[test]
fn null_document_is_a_null_variant() {
    assert_eq!(Document::new().to_variant(), Variant::Null);
}

#[test]
fn array_from_string_list() {
    let arr = Array::from_string_list(["a", "b"]);
    assert_eq!(arr.len(), 2);
    assert_eq!(arr.at(1), Some(Value::String("b".into())));
}

#[test]
fn value_variant_round_trip() {
    let variant = Variant::List(vec![
        Variant::Double(2.5),
        Variant::Map(BTreeMap::from([(String::from("k"), Variant::Null)])),
    ]);
    let value = Value::from(variant.clone());
    assert_eq!(Variant::from(&value), variant);
}
