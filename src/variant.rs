//! A plain owned tree type bridging documents to ordinary Rust data.
//!
//! [`Variant`] is the fully materialized counterpart of a document: no
//! shared buffers, no handles, just nested `Vec`s and maps. It is the
//! convenient form for building documents programmatically and, with the
//! `serde` feature, for moving them across other serialization formats.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::array::Array;
use crate::document::Document;
use crate::object::Object;
use crate::value::Value;

/// An owned, buffer-free JSON-like tree.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variant {
    /// No value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// Any number.
    Double(f64),
    /// A string.
    String(String),
    /// A homogeneous list of strings.
    StringList(Vec<String>),
    /// A list of arbitrary variants.
    List(Vec<Variant>),
    /// String-keyed mapping. `BTreeMap` so iteration order matches the
    /// sorted key order documents keep anyway.
    Map(BTreeMap<String, Variant>),
}

impl Variant {
    /// Converts an array handle into an owned list.
    pub fn from_array(array: &Array) -> Variant {
        Variant::List(array.iter().map(|v| Variant::from_value(&v)).collect())
    }

    /// Converts an object handle into an owned map.
    pub fn from_object(object: &Object) -> Variant {
        Variant::Map(
            object
                .iter()
                .map(|(k, v)| (k, Variant::from_value(&v)))
                .collect(),
        )
    }

    fn from_value(value: &Value) -> Variant {
        match value {
            Value::Null => Variant::Null,
            Value::Bool(b) => Variant::Bool(*b),
            Value::Double(d) => Variant::Double(*d),
            Value::String(s) => Variant::String(s.clone()),
            Value::Array(a) => Variant::from_array(a),
            Value::Object(o) => Variant::from_object(o),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Variant::Null => Value::Null,
            Variant::Bool(b) => Value::Bool(*b),
            Variant::Double(d) => Value::Double(*d),
            Variant::String(s) => Value::String(s.clone()),
            Variant::StringList(list) => {
                Value::Array(Array::from_string_list(list.iter().cloned()))
            }
            Variant::List(list) => Value::Array(array_from_list(list)),
            Variant::Map(map) => Value::Object(object_from_map(map)),
        }
    }
}

fn array_from_list(list: &[Variant]) -> Array {
    list.iter().map(Variant::to_value).collect()
}

fn object_from_map(map: &BTreeMap<String, Variant>) -> Object {
    map.iter()
        .map(|(k, v)| (k.clone(), v.to_value()))
        .collect()
}

/// Only container variants can become a document root.
pub(crate) fn document_from_variant(variant: &Variant) -> Option<Document> {
    match variant {
        Variant::StringList(list) => {
            Some(Document::from(Array::from_string_list(list.iter().cloned())))
        }
        Variant::List(list) => Some(Document::from(array_from_list(list))),
        Variant::Map(map) => Some(Document::from(object_from_map(map))),
        _ => None,
    }
}

impl From<Variant> for Value {
    fn from(variant: Variant) -> Value {
        variant.to_value()
    }
}

impl From<&Value> for Variant {
    fn from(value: &Value) -> Variant {
        Variant::from_value(value)
    }
}
