//! The top-level document type: parse, serialize, save and load.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::array::Array;
use crate::data::{self, SharedData};
use crate::error::ParseError;
use crate::layout::{
    self, BASE_SIZE, BINARY_FORMAT_TAG, BINARY_FORMAT_VERSION, HEADER_SIZE,
};
use crate::object::Object;
use crate::parser;
use crate::variant::Variant;
use crate::writer::{self, JsonFormat};

/// How much checking [`Document::from_binary_data`] performs on its input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Validation {
    /// Full structural validation. The only safe choice for untrusted data.
    #[default]
    Validate,
    /// Header checks only. Only for buffers this library produced and that
    /// were stored in a trusted place.
    BypassValidation,
}

/// A complete JSON document: either null, or rooted in an array or object.
///
/// A document owns one contiguous binary buffer. Cloning a document (or
/// pulling container handles out of it) shares that buffer; copies are only
/// made when a holder mutates.
#[derive(Clone, Debug, Default)]
pub struct Document {
    data: Option<Arc<SharedData>>,
}

impl Document {
    /// An empty (null) document.
    pub fn new() -> Self {
        Document::default()
    }

    pub(crate) fn from_data(data: SharedData) -> Self {
        Document { data: Some(Arc::new(data)) }
    }

    /// Parses a JSON text into a document. The whole input must be one JSON
    /// array or object; anything else is rejected with a [`ParseError`]
    /// locating the problem.
    pub fn from_json(json: &[u8]) -> Result<Document, ParseError> {
        parser::parse(json)
    }

    /// Serializes the document. A null document produces an empty string.
    pub fn to_json(&self, format: JsonFormat) -> String {
        match &self.data {
            None => String::new(),
            Some(d) => {
                if d.root_is_object() {
                    writer::object_to_json(&d.buffer, HEADER_SIZE, format)
                } else {
                    writer::array_to_json(&d.buffer, HEADER_SIZE, format)
                }
            }
        }
    }

    /// Reconstitutes a document from the binary interchange format.
    ///
    /// The header and root size are always checked; with
    /// [`Validation::Validate`] the whole buffer is structurally validated
    /// before any of it is trusted. Returns `None` for anything that fails.
    /// Trailing bytes past the root node are ignored.
    pub fn from_binary_data(data: &[u8], validation: Validation) -> Option<Document> {
        if data.len() < (HEADER_SIZE + BASE_SIZE) as usize {
            return None;
        }
        if layout::read_u32(data, 0) != BINARY_FORMAT_TAG
            || layout::read_u32(data, 4) != BINARY_FORMAT_VERSION
        {
            return None;
        }
        let root_size = u64::from(layout::base_size(data, HEADER_SIZE));
        if root_size < u64::from(BASE_SIZE)
            || u64::from(HEADER_SIZE) + root_size > data.len() as u64
        {
            return None;
        }
        let buffer = data[..(u64::from(HEADER_SIZE) + root_size) as usize].to_vec();
        if validation == Validation::Validate && !data::validate_binary(&buffer) {
            return None;
        }
        Some(Document::from_data(SharedData::from_buffer(buffer)))
    }

    /// The binary interchange form of this document: the buffer as-is,
    /// including any holes not yet compacted. A null document produces an
    /// empty vector.
    pub fn to_binary_data(&self) -> Vec<u8> {
        match &self.data {
            None => Vec::new(),
            Some(d) => d.buffer.clone(),
        }
    }

    /// Builds a document from a [`Variant`]. Only lists, string lists and
    /// maps can form a document root; everything else returns `None`.
    pub fn from_variant(variant: &Variant) -> Option<Document> {
        crate::variant::document_from_variant(variant)
    }

    /// The document's content as a [`Variant`] tree: a map for object
    /// roots, a list for array roots, null for a null document.
    pub fn to_variant(&self) -> Variant {
        match (self.object(), self.array()) {
            (Some(o), _) => Variant::from_object(&o),
            (_, Some(a)) => Variant::from_array(&a),
            _ => Variant::Null,
        }
    }

    /// True for a default-constructed document with no content at all.
    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    /// True when the document is null or its root container has no elements.
    pub fn is_empty(&self) -> bool {
        match &self.data {
            None => true,
            Some(d) => layout::base_length(&d.buffer, HEADER_SIZE) == 0,
        }
    }

    pub fn is_array(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.root_is_object())
    }

    pub fn is_object(&self) -> bool {
        self.data.as_ref().is_some_and(|d| d.root_is_object())
    }

    /// The root array, when this document holds one.
    pub fn array(&self) -> Option<Array> {
        match &self.data {
            Some(d) if !d.root_is_object() => {
                Some(Array::from_parts(Arc::clone(d), HEADER_SIZE))
            }
            _ => None,
        }
    }

    /// The root object, when this document holds one.
    pub fn object(&self) -> Option<Object> {
        match &self.data {
            Some(d) if d.root_is_object() => {
                Some(Object::from_parts(Arc::clone(d), HEADER_SIZE))
            }
            _ => None,
        }
    }

    /// Makes `array` the document's root. The handle's buffer is shared when
    /// possible and copied (compacted) otherwise.
    pub fn set_array(&mut self, array: &Array) {
        self.data = Some(array.to_root());
    }

    /// Makes `object` the document's root. The handle's buffer is shared
    /// when possible and copied (compacted) otherwise.
    pub fn set_object(&mut self, object: &Object) {
        self.data = Some(object.to_root());
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        match (&self.data, &other.data) {
            (None, None) => true,
            (None, Some(_)) | (Some(_), None) => false,
            (Some(a), Some(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                if a.root_is_object() != b.root_is_object() {
                    return false;
                }
                if a.root_is_object() {
                    self.object() == other.object()
                } else {
                    self.array() == other.array()
                }
            }
        }
    }
}

impl From<Array> for Document {
    fn from(array: Array) -> Self {
        let mut doc = Document::new();
        doc.set_array(&array);
        doc
    }
}

impl From<Object> for Document {
    fn from(object: Object) -> Self {
        let mut doc = Document::new();
        doc.set_object(&object);
        doc
    }
}
