use alloc::string::String;
use alloc::vec::Vec;

use crate::data::SharedData;
use crate::{Array, Document, Object, Validation, Value};

#[test]
fn array_push_insert_replace() {
    let mut arr = Array::new();
    assert!(arr.is_empty());

    arr.push(Value::Double(1.0));
    arr.push(Value::String("two".into()));
    arr.insert(0, Value::Bool(true));

    assert_eq!(arr.len(), 3);
    assert_eq!(arr.at(0), Some(Value::Bool(true)));
    assert_eq!(arr.at(1), Some(Value::Double(1.0)));
    assert_eq!(arr.at(2), Some(Value::String("two".into())));
    assert_eq!(arr.first(), arr.at(0));
    assert_eq!(arr.last(), arr.at(2));

    arr.replace(2, Value::Null);
    assert_eq!(arr.at(2), Some(Value::Null));
    assert_eq!(arr.len(), 3);
}

#[test]
fn array_remove_and_take() {
    let doc = Document::from_json(b"[10, 20, 30]").unwrap();
    let mut arr = doc.array().unwrap();

    arr.remove(1);
    assert_eq!(arr.len(), 2);
    assert_eq!(arr.at(0), Some(Value::Double(10.0)));
    assert_eq!(arr.at(1), Some(Value::Double(30.0)));

    assert_eq!(arr.take(0), Some(Value::Double(10.0)));
    assert_eq!(arr.take(5), None);
    assert_eq!(arr.len(), 1);

    arr.remove(7); // out of range, ignored
    assert_eq!(arr.len(), 1);
}

#[test]
fn array_contains_and_iter() {
    let doc = Document::from_json(br#"[1, "x", null]"#).unwrap();
    let arr = doc.array().unwrap();
    assert!(arr.contains(&Value::Double(1.0)));
    assert!(arr.contains(&Value::Null));
    assert!(!arr.contains(&Value::Bool(false)));

    let collected: Vec<Value> = arr.iter().collect();
    assert_eq!(collected.len(), 3);
    assert_eq!(collected[1], Value::String("x".into()));
}

#[test]
fn object_insert_get_remove() {
    let mut obj = Object::new();
    assert_eq!(obj.insert("b", Value::Double(2.0)), None);
    assert_eq!(obj.insert("a", Value::Bool(true)), None);
    assert_eq!(obj.insert("c", Value::String("x".into())), None);

    assert_eq!(obj.len(), 3);
    assert_eq!(obj.get("a"), Some(Value::Bool(true)));
    assert_eq!(obj.get("b"), Some(Value::Double(2.0)));
    assert_eq!(obj.get("missing"), None);

    // Replacing returns the old value and does not grow the object.
    assert_eq!(obj.insert("b", Value::Null), Some(Value::Double(2.0)));
    assert_eq!(obj.len(), 3);
    assert_eq!(obj.get("b"), Some(Value::Null));

    assert_eq!(obj.take("a"), Some(Value::Bool(true)));
    assert_eq!(obj.take("a"), None);
    obj.remove("c");
    assert_eq!(obj.len(), 1);
}

#[test]
fn object_keys_stay_sorted_through_mutation() {
    let mut obj = Object::new();
    for key in ["delta", "alpha", "echo", "bravo", "charlie"] {
        obj.insert(key, Value::Double(1.0));
    }
    obj.remove("bravo");
    obj.insert("apple", Value::Double(2.0));

    let keys: Vec<String> = obj.keys().collect();
    assert_eq!(keys, ["alpha", "apple", "charlie", "delta", "echo"]);
}

#[test]
fn nested_containers_are_copied_in() {
    let mut inner = Array::new();
    inner.push(Value::Double(1.0));
    inner.push(Value::Double(2.0));

    let mut obj = Object::new();
    obj.insert("nums", Value::Array(inner.clone()));
    obj.insert("empty", Value::Object(Object::new()));

    // Mutating the source handle afterwards does not reach the copy.
    inner.push(Value::Double(3.0));
    let stored = obj.get("nums").unwrap();
    assert_eq!(stored.as_array().unwrap().len(), 2);
    assert!(obj.get("empty").unwrap().as_object().unwrap().is_empty());
}

#[test]
fn replace_churn_triggers_compaction() {
    let mut obj = Object::new();
    obj.insert("k", Value::String("start".into()));
    for i in 0..40 {
        obj.insert("k", Value::Double(f64::from(i)));
    }
    assert_eq!(obj.len(), 1);
    assert_eq!(obj.get("k"), Some(Value::Double(39.0)));

    // Compaction must have dropped the orphaned storage: the buffer holds a
    // single small entry, nowhere near 40 entries' worth.
    let doc = Document::from(obj);
    assert!(doc.to_binary_data().len() < 64);
}

#[test]
fn remove_churn_triggers_compaction() {
    let mut arr = Array::new();
    for i in 0..100 {
        arr.push(Value::Double(f64::from(i) + 0.5));
    }
    for _ in 0..80 {
        arr.remove(0);
    }
    assert_eq!(arr.len(), 20);
    assert_eq!(arr.at(0), Some(Value::Double(80.5)));

    let doc = Document::from(arr);
    // 20 stored doubles plus table and base: far less than the 100-element
    // buffer before compaction.
    assert!(doc.to_binary_data().len() < 500);
}

#[test]
fn compaction_is_idempotent() {
    let mut obj = Object::new();
    for i in 0..50 {
        obj.insert(&alloc::format!("key{i:02}"), Value::Double(f64::from(i)));
    }
    for i in 0..40 {
        obj.remove(&alloc::format!("key{i:02}"));
    }

    // Adoption squeezes the removal holes out of the buffer.
    let doc = Document::from(obj);
    let bytes = doc.to_binary_data();

    // Forcing another rebuild of the already-tight buffer reproduces it byte
    // for byte.
    let mut shared = SharedData::from_buffer(bytes.clone());
    shared.compaction_counter = 1;
    shared.compact();
    assert_eq!(shared.buffer, bytes);

    // So does reloading and adopting a second time.
    let loaded = Document::from_binary_data(&bytes, Validation::Validate).unwrap();
    let again = Document::from(loaded.object().unwrap());
    assert_eq!(again.to_binary_data(), bytes);
    assert_eq!(again, doc);
}

#[test]
fn insert_counts_replacements_only() {
    let mut obj = Object::new();
    obj.insert("a", Value::Double(1.0));
    obj.insert("b", Value::Double(2.0));
    assert_eq!(obj.compaction_counter(), 0);

    // Fresh inserts leave no holes behind; only replacements do.
    obj.insert("a", Value::Null);
    assert_eq!(obj.compaction_counter(), 1);
    obj.insert("c", Value::Bool(true));
    assert_eq!(obj.compaction_counter(), 1);
}

#[test]
fn equality_is_structural() {
    let a = Document::from_json(br#"{"x": [1, 2], "y": null}"#).unwrap();
    let b = Document::from_json(br#"{"y": null, "x": [1, 2]}"#).unwrap();
    let c = Document::from_json(br#"{"x": [1, 3], "y": null}"#).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, Document::new());
    assert_eq!(Document::new(), Document::new());

    // Detached empty handles equal empty parsed ones.
    assert_eq!(Array::new(), Document::from_json(b"[]").unwrap().array().unwrap());
    assert_eq!(Object::new(), Document::from_json(b"{}").unwrap().object().unwrap());
}
