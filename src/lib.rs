//! A binary JSON document engine.
//!
//! JSON text is parsed once into a compact binary buffer; after that, reads
//! are zero-parse offset chasing and the buffer can be saved and reloaded
//! as-is. Documents, arrays and objects are cheap copy-on-write handles over
//! the shared buffer.
//!
//! ```
//! use jsonbuf::{Document, Value};
//!
//! let doc = Document::from_json(br#"{"name": "alice", "tags": ["a", "b"]}"#)?;
//! let obj = doc.object().unwrap();
//! assert_eq!(obj.get("name"), Some(Value::String("alice".into())));
//!
//! let mut edited = obj.clone();
//! edited.insert("age", Value::Double(30.0));
//! assert!(!obj.contains_key("age")); // the original is untouched
//!
//! let bytes = Document::from(edited).to_binary_data();
//! # let _ = bytes;
//! # Ok::<(), jsonbuf::ParseError>(())
//! ```
//!
//! The crate is `no_std` (it requires `alloc`). Enable the `serde` feature
//! to derive `Serialize`/`Deserialize` on [`Variant`].

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

mod array;
mod data;
mod document;
mod error;
mod layout;
mod object;
mod parser;
mod value;
mod variant;
mod writer;

#[cfg(test)]
mod tests;

pub use array::{Array, Iter as ArrayIter};
pub use document::{Document, Validation};
pub use error::{ParseError, ParseErrorKind};
pub use object::{Iter as ObjectIter, Keys, Object};
pub use value::Value;
pub use variant::Variant;
pub use writer::JsonFormat;
