//! Array handles.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::data::{self, SharedData};
use crate::layout::{self, BASE_SIZE, ValueRecord};
use crate::value::{self, Value};

/// A handle to a JSON array inside a document buffer.
///
/// Cloning an `Array` is cheap: both handles share the buffer until one of
/// them mutates. A handle obtained from inside a document is detached onto
/// its own buffer on first mutation, so mutating it never changes the
/// document it came from.
#[derive(Clone, Debug, Default)]
pub struct Array {
    data: Option<Arc<SharedData>>,
    node: u32,
}

impl Array {
    /// An empty array, not yet backed by a buffer.
    pub fn new() -> Self {
        Array::default()
    }

    pub(crate) fn from_parts(data: Arc<SharedData>, node: u32) -> Self {
        Array { data: Some(data), node }
    }

    /// The buffer with this node as root, for adoption by a document. Shares
    /// the existing buffer when the handle already is a hole-free root;
    /// otherwise the subtree is copied out and compacted.
    pub(crate) fn to_root(&self) -> Arc<SharedData> {
        match &self.data {
            None => Arc::new(SharedData::new_empty(false)),
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

    /// Number of elements.
    pub fn len(&self) -> usize {
        match &self.data {
            Some(d) => layout::base_length(&d.buffer, self.node) as usize,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element at `i`, or `None` past the end.
    pub fn at(&self, i: usize) -> Option<Value> {
        let data = self.data.as_ref()?;
        if i >= layout::base_length(&data.buffer, self.node) as usize {
            return None;
        }
        let rec = layout::array_value_at(&data.buffer, self.node, i as u32);
        Some(Value::read(data, self.node, rec))
    }

    pub fn first(&self) -> Option<Value> {
        self.at(0)
    }

    pub fn last(&self) -> Option<Value> {
        self.len().checked_sub(1).and_then(|i| self.at(i))
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.iter().any(|v| v == *value)
    }

    /// Appends `value` at the end.
    pub fn push(&mut self, value: Value) {
        self.insert(self.len(), value);
    }

    /// Inserts `value` at the front.
    pub fn prepend(&mut self, value: Value) {
        self.insert(0, value);
    }

    /// An array of strings.
    pub fn from_string_list<I, S>(list: I) -> Array
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        list.into_iter()
            .map(|s| Value::String(s.into()))
            .collect()
    }

    /// Inserts `value` at position `i`, shifting later elements up.
    ///
    /// # Panics
    ///
    /// Panics if `i > len()`.
    pub fn insert(&mut self, i: usize, value: Value) {
        assert!(i <= self.len(), "insert index out of bounds");
        let (size, latin) = value.required_storage();
        if !data::detach(&mut self.data, &mut self.node, false, size + 4) {
            return;
        }
        let Some(shared) = self.data.as_mut().map(Arc::make_mut) else {
            return;
        };
        let Some(offset) = shared.reserve_in_node(self.node, size, i as u32, 1, false) else {
            log::warn!("jsonbuf: array insert would exceed the size ceiling, ignored");
            return;
        };
        let rec = ValueRecord::new(value.tag(), latin, false, value.payload_for(offset));
        layout::set_table_at(&mut shared.buffer, self.node, i as u32, rec.0);
        value.write_storage(&mut shared.buffer, self.node + offset, latin);
    }

    /// Replaces the element at `i`. The old element's storage becomes a hole
    /// until the next compaction.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    pub fn replace(&mut self, i: usize, value: Value) {
        assert!(i < self.len(), "replace index out of bounds");
        let (size, latin) = value.required_storage();
        if !data::detach(&mut self.data, &mut self.node, false, size) {
            return;
        }
        let Some(shared) = self.data.as_mut().map(Arc::make_mut) else {
            return;
        };
        let Some(offset) = shared.reserve_in_node(self.node, size, i as u32, 1, true) else {
            log::warn!("jsonbuf: array replace would exceed the size ceiling, ignored");
            return;
        };
        let rec = ValueRecord::new(value.tag(), latin, false, value.payload_for(offset));
        layout::set_table_at(&mut shared.buffer, self.node, i as u32, rec.0);
        value.write_storage(&mut shared.buffer, self.node + offset, latin);
        shared.compaction_counter += 1;
        self.maybe_compact();
    }

    /// Removes the element at `i`; elements past it shift down. Out of range
    /// indices are ignored.
    pub fn remove(&mut self, i: usize) {
        if i >= self.len() {
            return;
        }
        if !data::detach(&mut self.data, &mut self.node, false, 0) {
            return;
        }
        let Some(shared) = self.data.as_mut().map(Arc::make_mut) else {
            return;
        };
        shared.remove_items(self.node, i as u32, 1);
        shared.compaction_counter += 1;
        self.maybe_compact();
    }

    /// Removes and returns the element at `i`.
    pub fn take(&mut self, i: usize) -> Option<Value> {
        let value = self.at(i)?;
        self.remove(i);
        Some(value)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter { array: self, index: 0, len: self.len() }
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
            None => value::write_empty_base(buf, dest, false),
        }
    }
}

impl PartialEq for Array {
    /// A detached handle compares equal to an empty array; otherwise
    /// comparison is element-wise, with a shortcut when both handles point
    /// at the same node of the same buffer.
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

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut array = Array::new();
        for value in iter {
            array.push(value);
        }
        array
    }
}

impl From<Vec<Value>> for Array {
    fn from(values: Vec<Value>) -> Self {
        values.into_iter().collect()
    }
}

/// Iterator over an array's elements, yielding owned [`Value`]s.
pub struct Iter<'a> {
    array: &'a Array,
    index: usize,
    len: usize,
}

impl Iterator for Iter<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        if self.index >= self.len {
            return None;
        }
        let value = self.array.at(self.index);
        self.index += 1;
        value
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a Array {
    type Item = Value;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
