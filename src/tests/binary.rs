use alloc::vec::Vec;

use crate::layout;
use crate::{Document, JsonFormat, Validation, Value};

fn binary(json: &str) -> Vec<u8> {
    Document::from_json(json.as_bytes()).unwrap().to_binary_data()
}

#[test]
fn round_trip() {
    let json = r#"{"name": "café", "list": [1, 2.5, null, true], "nested": {"x": "日本"}}"#;
    let doc = Document::from_json(json.as_bytes()).unwrap();
    let bytes = doc.to_binary_data();
    let loaded = Document::from_binary_data(&bytes, Validation::Validate).unwrap();
    assert_eq!(doc, loaded);
    assert_eq!(doc.to_json(JsonFormat::Compact), loaded.to_json(JsonFormat::Compact));
}

#[test]
fn null_document_has_no_binary_form() {
    assert!(Document::new().to_binary_data().is_empty());
    assert!(Document::from_binary_data(&[], Validation::Validate).is_none());
}

#[test]
fn header_starts_with_tag_and_version() {
    let bytes = binary("[1]");
    assert_eq!(&bytes[0..4], b"jbuf");
    assert_eq!(layout::read_u32(&bytes, 4), 1);
}

#[test]
fn wrong_tag_is_rejected() {
    let mut bytes = binary("[1]");
    bytes[0] ^= 0xFF;
    assert!(Document::from_binary_data(&bytes, Validation::Validate).is_none());
    // The header check runs even in bypass mode.
    assert!(Document::from_binary_data(&bytes, Validation::BypassValidation).is_none());
}

#[test]
fn wrong_version_is_rejected() {
    let mut bytes = binary("[1]");
    layout::write_u32(&mut bytes, 4, 2);
    assert!(Document::from_binary_data(&bytes, Validation::Validate).is_none());
}

#[test]
fn truncated_buffer_is_rejected() {
    let bytes = binary(r#"{"a": [1, 2, 3]}"#);
    for len in 0..bytes.len() {
        assert!(
            Document::from_binary_data(&bytes[..len], Validation::Validate).is_none(),
            "truncation to {len} bytes must not load"
        );
    }
}

#[test]
fn trailing_bytes_are_ignored() {
    let doc = Document::from_json(b"[1, 2]").unwrap();
    let mut bytes = doc.to_binary_data();
    bytes.extend_from_slice(b"trailing junk");
    let loaded = Document::from_binary_data(&bytes, Validation::Validate).unwrap();
    assert_eq!(doc, loaded);
}

#[test]
fn corrupt_table_offset_is_rejected() {
    let mut bytes = binary(r#"["hello"]"#);
    // Root base sits right after the 8-byte header; its table offset is the
    // third field.
    layout::write_u32(&mut bytes, 16, 0x00FF_FFFF);
    assert!(Document::from_binary_data(&bytes, Validation::Validate).is_none());
}

#[test]
fn unsorted_object_keys_are_rejected() {
    let mut bytes = binary(r#"{"a": 1, "b": 2}"#);
    // Swap the two table slots so "b" sorts before "a".
    let root = 8;
    let table = root + layout::read_u32(&bytes, root + 8);
    let first = layout::read_u32(&bytes, table);
    let second = layout::read_u32(&bytes, table + 4);
    layout::write_u32(&mut bytes, table, second);
    layout::write_u32(&mut bytes, table + 4, first);

    assert!(Document::from_binary_data(&bytes, Validation::Validate).is_none());
    // Bypass skips the structural check; the buffer still loads.
    assert!(Document::from_binary_data(&bytes, Validation::BypassValidation).is_some());
}

#[test]
fn mismatched_container_tag_is_rejected() {
    // An object record whose payload points at an array node.
    let mut bytes = binary(r#"[[1]]"#);
    let root = 8;
    let table = root + layout::read_u32(&bytes, root + 8);
    let rec = layout::read_u32(&bytes, table);
    assert_eq!(rec & 0x7, 4); // array tag
    layout::write_u32(&mut bytes, table, (rec & !0x7) | 5);
    assert!(Document::from_binary_data(&bytes, Validation::Validate).is_none());
}

#[test]
fn loaded_documents_are_mutable() {
    let bytes = binary(r#"{"a": 1}"#);
    let doc = Document::from_binary_data(&bytes, Validation::Validate).unwrap();
    let mut obj = doc.object().unwrap();
    obj.insert("b", Value::Double(2.0));
    assert_eq!(obj.len(), 2);
    assert_eq!(doc.object().unwrap().len(), 1);
}

#[test]
fn binary_survives_mutation_round_trip() {
    let doc = Document::from_json(br#"{"a": 1}"#).unwrap();
    let mut obj = doc.object().unwrap();
    obj.insert("b", Value::String("two".into()));
    obj.remove("a");

    let round = Document::from(obj.clone());
    let loaded =
        Document::from_binary_data(&round.to_binary_data(), Validation::Validate).unwrap();
    assert_eq!(loaded.object().unwrap(), obj);
}
