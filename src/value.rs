//! The owned value type: what handles hand out and what mutations take.

use alloc::string::String;
use alloc::sync::Arc;

use crate::array::Array;
use crate::data::SharedData;
use crate::layout::{self, BASE_SIZE, INLINE_INT_BOUND, Tag, ValueRecord};
use crate::object::Object;

/// A single JSON value.
///
/// Scalars are plain owned data. [`Array`] and [`Object`] values are handles:
/// reading a container out of a document shares the document's buffer rather
/// than deep-copying it, and the handle only materializes its own buffer when
/// mutated.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// JSON `null`.
    #[default]
    Null,
    /// `true` or `false`.
    Bool(bool),
    /// Any JSON number.
    Double(f64),
    /// A string.
    String(String),
    /// A nested array.
    Array(Array),
    /// A nested object.
    Object(Object),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Materializes the value behind a record, relative to node `base`.
    /// Containers come back as handles sharing `data`.
    pub(crate) fn read(data: &Arc<SharedData>, base: u32, rec: ValueRecord) -> Value {
        match rec.tag() {
            Some(Tag::Bool) => Value::Bool(rec.payload() != 0),
            Some(Tag::Double) => {
                if rec.latin_or_int() {
                    Value::Double(f64::from(rec.int_value()))
                } else {
                    Value::Double(layout::read_f64(&data.buffer, base + rec.payload()))
                }
            }
            Some(Tag::String) => Value::String(layout::string_value(&data.buffer, base, rec).0),
            Some(Tag::Array) => {
                Value::Array(Array::from_parts(Arc::clone(data), base + rec.payload()))
            }
            Some(Tag::Object) => {
                Value::Object(Object::from_parts(Arc::clone(data), base + rec.payload()))
            }
            Some(Tag::Null) | None => Value::Null,
        }
    }

    /// Record tag for this value.
    pub(crate) fn tag(&self) -> Tag {
        match self {
            Value::Null => Tag::Null,
            Value::Bool(_) => Tag::Bool,
            Value::Double(_) => Tag::Double,
            Value::String(_) => Tag::String,
            Value::Array(_) => Tag::Array,
            Value::Object(_) => Tag::Object,
        }
    }

    /// Out-of-line bytes this value needs inside a node, and the record's
    /// `latin_or_int` flag. Zero bytes means the value lives inline in the
    /// record payload.
    pub(crate) fn required_storage(&self) -> (u32, bool) {
        match self {
            Value::Null | Value::Bool(_) => (0, false),
            Value::Double(d) => {
                if double_fits_inline(*d) {
                    (0, true)
                } else {
                    (8, false)
                }
            }
            Value::String(s) => {
                let latin = layout::is_latin1(s);
                (layout::string_storage_size(s, latin), latin)
            }
            Value::Array(a) => (a.node_size(), false),
            Value::Object(o) => (o.node_size(), false),
        }
    }

    /// Record payload: an inline scalar, or `offset` for out-of-line values.
    pub(crate) fn payload_for(&self, offset: u32) -> u32 {
        match self {
            Value::Null => 0,
            Value::Bool(b) => u32::from(*b),
            Value::Double(d) if double_fits_inline(*d) => {
                layout::inline_int_payload(*d as i32)
            }
            _ => offset,
        }
    }

    /// Writes the out-of-line storage at absolute offset `dest`. The region
    /// was zero-initialized by the reservation, so padding is already in
    /// place. No-op for inline values.
    pub(crate) fn write_storage(&self, buf: &mut [u8], dest: u32, latin: bool) {
        match self {
            Value::Null | Value::Bool(_) => {}
            Value::Double(d) => {
                if !double_fits_inline(*d) {
                    layout::write_f64(buf, dest, *d);
                }
            }
            Value::String(s) => layout::write_string(buf, dest, s, latin),
            Value::Array(a) => a.write_node(buf, dest),
            Value::Object(o) => o.write_node(buf, dest),
        }
    }
}

/// True when the double is an integer small enough for the record's 27-bit
/// inline payload.
pub(crate) fn double_fits_inline(d: f64) -> bool {
    let i = d as i32;
    #[allow(clippy::float_cmp)]
    let integral = f64::from(i) == d;
    integral && i < INLINE_INT_BOUND && i > -INLINE_INT_BOUND
}

/// Writes an empty array or object node at `dest`; used when a detached
/// (bufferless) handle is inserted into a document.
pub(crate) fn write_empty_base(buf: &mut [u8], dest: u32, is_object: bool) {
    layout::write_base(buf, dest, BASE_SIZE, is_object, 0, BASE_SIZE);
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Double(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(String::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}
