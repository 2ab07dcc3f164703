//! Object handles.

use alloc::string::String;
use alloc::sync::Arc;
use core::cmp::Ordering;

use crate::data::{self, SharedData};
use crate::layout::{self, BASE_SIZE, ValueRecord};
use crate::value::{self, Value};

/// A handle to a JSON object inside a document buffer.
///
/// Entries are kept sorted by key (by UTF-16 code unit), so lookup is a
/// binary search and iteration yields keys in that order. Keys are unique;
/// inserting an existing key replaces its value.
///
/// Cloning shares the buffer; handles detach onto their own buffer on first
/// mutation, exactly like [`Array`](crate::Array).
#[derive(Clone, Debug, Default)]
pub struct Object {
    data: Option<Arc<SharedData>>,
    node: u32,
}

impl Object {
    /// An empty object, not yet backed by a buffer.
    pub fn new() -> Self {
        Object::default()
    }

    pub(crate) fn from_parts(data: Arc<SharedData>, node: u32) -> Self {
        Object { data: Some(data), node }
    }

    /// The buffer with this node as root, for adoption by a document. Shares
    /// the existing buffer when the handle already is a hole-free root;
    /// otherwise the subtree is copied out and compacted.
    pub(crate) fn to_root(&self) -> Arc<SharedData> {
        match &self.data {
            None => Arc::new(SharedData::new_empty(true)),
            Some(arc) if self.node == layout::HEADER_SIZE && arc.compaction_counter == 0 => {
                Arc::clone(arc)
            }
            Some(arc) => {
                let mut data = arc.clone_subtree(self.node);
                data.compact();
                Arc::new(data)
            }
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        match &self.data {
            Some(d) => layout::base_length(&d.buffer, self.node) as usize,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        let data = self.data.as_ref()?;
        let i = self.find(key).ok()?;
        let entry = layout::object_entry_at(&data.buffer, self.node, i);
        Some(Value::read(data, self.node, layout::entry_value(&data.buffer, entry)))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.is_some() && self.find(key).is_ok()
    }

    /// The keys, in sorted order.
    pub fn keys(&self) -> Keys<'_> {
        Keys { object: self, index: 0, len: self.len() }
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter { object: self, index: 0, len: self.len() }
    }

    /// Inserts `value` under `key`, returning the previous value if the key
    /// already existed. A replaced entry's storage becomes a hole until the
    /// next compaction.
    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        let previous = self.get(key);

        let latin_key = layout::is_latin1(key);
        let entry_size = 4 + layout::string_storage_size(key, latin_key);
        let (val_size, latin_value) = value.required_storage();
        if !data::detach(&mut self.data, &mut self.node, true, entry_size + val_size + 4) {
            return previous;
        }

        let pos = match self.find(key) {
            Ok(i) => i,
            Err(i) => i,
        };
        let exists = previous.is_some();

        let Some(shared) = self.data.as_mut().map(Arc::make_mut) else {
            return previous;
        };
        let Some(offset) =
            shared.reserve_in_node(self.node, entry_size + val_size, pos, 1, exists)
        else {
            log::warn!("jsonbuf: object insert would exceed the size ceiling, ignored");
            return previous;
        };
        if exists {
            // The replaced entry's storage is now a hole.
            shared.compaction_counter += 1;
        }

        // Entry layout: value record, inline key, then the value's
        // out-of-line storage. The table slot written by the reservation
        // already holds the entry offset.
        let payload = value.payload_for(offset + entry_size);
        let rec = ValueRecord::new(value.tag(), latin_value, latin_key, payload);
        layout::write_u32(&mut shared.buffer, self.node + offset, rec.0);
        layout::write_string(&mut shared.buffer, self.node + offset + 4, key, latin_key);
        value.write_storage(&mut shared.buffer, self.node + offset + entry_size, latin_value);

        self.maybe_compact();
        previous
    }

    /// Removes `key`. Missing keys are ignored.
    pub fn remove(&mut self, key: &str) {
        self.take(key);
    }

    /// Removes `key` and returns its value.
    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.data.as_ref()?;
        let i = self.find(key).ok()?;
        let previous = self.value_at(i);
        if !data::detach(&mut self.data, &mut self.node, true, 0) {
            return None;
        }
        let Some(shared) = self.data.as_mut().map(Arc::make_mut) else {
            return None;
        };
        shared.remove_items(self.node, i, 1);
        shared.compaction_counter += 1;
        self.maybe_compact();
        previous
    }

    fn value_at(&self, i: u32) -> Option<Value> {
        let data = self.data.as_ref()?;
        let entry = layout::object_entry_at(&data.buffer, self.node, i);
        Some(Value::read(data, self.node, layout::entry_value(&data.buffer, entry)))
    }

    fn key_at(&self, i: u32) -> Option<String> {
        let data = self.data.as_ref()?;
        let entry = layout::object_entry_at(&data.buffer, self.node, i);
        Some(layout::entry_key(&data.buffer, entry))
    }

    /// Binary search by key over the sorted entry table: the entry's index
    /// when present, otherwise the insertion position.
    fn find(&self, key: &str) -> Result<u32, u32> {
        let Some(data) = self.data.as_ref() else {
            return Err(0);
        };
        let buf = &data.buffer;
        let length = layout::base_length(buf, self.node);
        let mut lo = 0;
        let mut n = length;
        while n > 0 {
            let half = n / 2;
            let mid = lo + half;
            let entry = layout::object_entry_at(buf, self.node, mid);
            let ord = layout::entry_key_units(buf, entry).cmp(key.encode_utf16());
            if ord == Ordering::Less {
                lo = mid + 1;
                n -= half + 1;
            } else {
                n = half;
            }
        }
        if lo < length {
            let entry = layout::object_entry_at(buf, self.node, lo);
            if layout::entry_key_units(buf, entry).eq(key.encode_utf16()) {
                return Ok(lo);
            }
        }
        Err(lo)
    }

    #[cfg(test)]
    pub(crate) fn compaction_counter(&self) -> u32 {
        self.data.as_ref().map_or(0, |d| d.compaction_counter)
    }

    fn maybe_compact(&mut self) {
        if let Some(shared) = self.data.as_mut().map(Arc::make_mut) {
            if shared.should_compact() {
                shared.compact();
            }
        }
    }

    /// Byte size of this node when copied into another buffer.
    pub(crate) fn node_size(&self) -> u32 {
        match &self.data {
            Some(d) => layout::base_size(&d.buffer, self.node),
            None => BASE_SIZE,
        }
    }

    /// Copies this node's subtree to absolute offset `dest` in `buf`.
    pub(crate) fn write_node(&self, buf: &mut [u8], dest: u32) {
        match &self.data {
            Some(d) => {
                let size = layout::base_size(&d.buffer, self.node) as usize;
                let from = self.node as usize;
                buf[dest as usize..dest as usize + size]
                    .copy_from_slice(&d.buffer[from..from + size]);
            }
            None => value::write_empty_base(buf, dest, true),
        }
    }
}

impl PartialEq for Object {
    /// A detached handle compares equal to an empty object; otherwise
    /// comparison is entry-wise (both sides iterate in key order), with a
    /// shortcut when both handles point at the same node of the same buffer.
    fn eq(&self, other: &Self) -> bool {
        match (&self.data, &other.data) {
            (None, None) => true,
            (None, Some(_)) => other.is_empty(),
            (Some(_), None) => self.is_empty(),
            (Some(a), Some(b)) => {
                (Arc::ptr_eq(a, b) && self.node == other.node)
                    || (self.len() == other.len() && self.iter().eq(other.iter()))
            }
        }
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (key, value) in iter {
            object.insert(&key.into(), value);
        }
        object
    }
}

/// Iterator over an object's keys, in sorted order.
pub struct Keys<'a> {
    object: &'a Object,
    index: u32,
    len: usize,
}

impl Iterator for Keys<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.index as usize >= self.len {
            return None;
        }
        let key = self.object.key_at(self.index);
        self.index += 1;
        key
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Keys<'_> {}

/// Iterator over `(key, value)` pairs, in key order.
pub struct Iter<'a> {
    object: &'a Object,
    index: u32,
    len: usize,
}

impl Iterator for Iter<'_> {
    type Item = (String, Value);

    fn next(&mut self) -> Option<(String, Value)> {
        if self.index as usize >= self.len {
            return None;
        }
        let pair = self
            .object
            .key_at(self.index)
            .zip(self.object.value_at(self.index));
        self.index += 1;
        pair
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a Object {
    type Item = (String, Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
