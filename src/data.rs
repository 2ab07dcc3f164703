//! The shared buffer behind every handle: reference counting, clone-on-write
//! detach, in-place node mutation and compaction.
//!
//! A [`SharedData`] owns exactly one document buffer. Handles (`Document`,
//! `Array`, `Object`) share it through an `Arc`; the strong count *is* the
//! reference count of the copy-on-write scheme. Because every offset in the
//! buffer is node-relative, privatizing a shared buffer is a plain byte copy
//! (`Arc::make_mut` cloning the `Vec`), and re-rooting an interior node is a
//! single `extend_from_slice` of its subtree.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::layout::{
    self, BASE_SIZE, BINARY_FORMAT_TAG, BINARY_FORMAT_VERSION, HEADER_SIZE, MAX_SIZE, Tag,
    ValueRecord,
};

/// Nodes nested deeper than this are rejected, both by the parser and by
/// binary validation.
pub(crate) const NESTING_LIMIT: u32 = 1024;

/// In-place removals and replacements leave holes; once more than this many
/// have accumulated (and they amount to at least half the node's length) the
/// buffer is rebuilt tightly.
const COMPACTION_THRESHOLD: u32 = 32;

/// One reference-counted document buffer plus the bookkeeping for lazy
/// compaction.
#[derive(Clone, Debug)]
pub(crate) struct SharedData {
    pub(crate) buffer: Vec<u8>,
    /// Number of in-place removals/replacements since the last compaction.
    pub(crate) compaction_counter: u32,
}

impl SharedData {
    /// A document holding a single empty array or object.
    pub(crate) fn new_empty(is_object: bool) -> Self {
        let mut buffer = Vec::with_capacity((HEADER_SIZE + BASE_SIZE) as usize);
        buffer.resize((HEADER_SIZE + BASE_SIZE) as usize, 0);
        write_header(&mut buffer);
        layout::write_base(&mut buffer, HEADER_SIZE, BASE_SIZE, is_object, 0, BASE_SIZE);
        SharedData { buffer, compaction_counter: 0 }
    }

    /// Adopts a buffer produced by the parser or loaded from binary data.
    pub(crate) fn from_buffer(buffer: Vec<u8>) -> Self {
        SharedData { buffer, compaction_counter: 0 }
    }

    pub(crate) fn root_is_object(&self) -> bool {
        layout::base_is_object(&self.buffer, HEADER_SIZE)
    }

    /// Copies the subtree rooted at `node` into a fresh single-node document.
    /// Relative offsets make this a verbatim byte copy. The compaction
    /// counter carries over only when `node` is already the root, since holes
    /// are only ever tracked for the root node.
    pub(crate) fn clone_subtree(&self, node: u32) -> SharedData {
        let size = layout::base_size(&self.buffer, node);
        let mut buffer = Vec::with_capacity((HEADER_SIZE + size) as usize);
        buffer.resize(HEADER_SIZE as usize, 0);
        write_header(&mut buffer);
        buffer.extend_from_slice(&self.buffer[node as usize..(node + size) as usize]);
        SharedData {
            buffer,
            compaction_counter: if node == HEADER_SIZE { self.compaction_counter } else { 0 },
        }
    }

    /// Opens a `space`-byte gap at the end of the root node's content region
    /// (where the index table currently starts) and claims `num_items` table
    /// slots at `pos`: fresh slots when inserting, the existing slots when
    /// `replace` is set. Returns the node-relative offset of the gap, which
    /// is where the caller writes the new entry or out-of-line data.
    ///
    /// Fails (returning `None`) when the node would outgrow the format's
    /// offset range.
    pub(crate) fn reserve_in_node(
        &mut self,
        node: u32,
        space: u32,
        pos: u32,
        num_items: u32,
        replace: bool,
    ) -> Option<u32> {
        let size = layout::base_size(&self.buffer, node);
        let table_growth = if replace { 0 } else { 4 * num_items };
        if size + space + table_growth >= MAX_SIZE {
            return None;
        }
        debug_assert_eq!(self.buffer.len() as u32, node + size);

        let old_table = layout::base_table_offset(&self.buffer, node);

        // Shift the table (and nothing else; the table is last) up by
        // `space` bytes to make room for the new data region.
        let gap_at = (node + old_table) as usize;
        let old_len = self.buffer.len();
        self.buffer.resize(old_len + (space + table_growth) as usize, 0);
        self.buffer.copy_within(gap_at..old_len, gap_at + space as usize);

        let table_at = gap_at + space as usize;
        let length = layout::base_length(&self.buffer, node);
        if !replace {
            // Open `num_items` slots inside the shifted table.
            let slot = table_at + (4 * pos) as usize;
            let table_end = table_at + (4 * length) as usize;
            self.buffer.copy_within(slot..table_end, slot + (4 * num_items) as usize);
        }

        layout::set_base_table_offset(&mut self.buffer, node, old_table + space);
        layout::set_base_size(&mut self.buffer, node, size + space + table_growth);
        if !replace {
            layout::set_base_length(&mut self.buffer, node, length + num_items);
        }
        for i in 0..num_items {
            layout::set_table_at(&mut self.buffer, node, pos + i, old_table);
        }
        Some(old_table)
    }

    /// Drops `num_items` table slots starting at `pos`. The items' storage
    /// stays behind as a hole until the next compaction.
    pub(crate) fn remove_items(&mut self, node: u32, pos: u32, num_items: u32) {
        let length = layout::base_length(&self.buffer, node);
        let table = (node + layout::base_table_offset(&self.buffer, node)) as usize;
        let from = table + (4 * (pos + num_items)) as usize;
        let to = table + (4 * pos) as usize;
        let end = table + (4 * length) as usize;
        self.buffer.copy_within(from..end, to);
        layout::set_base_length(&mut self.buffer, node, length - num_items);
    }

    pub(crate) fn should_compact(&self) -> bool {
        self.compaction_counter > COMPACTION_THRESHOLD
            && self.compaction_counter >= layout::base_length(&self.buffer, HEADER_SIZE) / 2
    }

    /// Rebuilds the buffer without the holes left by removals and
    /// replacements. Live entries are walked in table order, so key ordering
    /// is preserved; child subtrees are copied verbatim.
    pub(crate) fn compact(&mut self) {
        if self.compaction_counter == 0 {
            return;
        }
        let root = HEADER_SIZE;
        let is_object = layout::base_is_object(&self.buffer, root);
        let length = layout::base_length(&self.buffer, root);

        let mut out: Vec<u8> = Vec::with_capacity(self.buffer.len());
        out.resize((HEADER_SIZE + BASE_SIZE) as usize, 0);
        write_header(&mut out);

        let mut slots: Vec<u32> = Vec::with_capacity(length as usize);
        if is_object {
            for i in 0..length {
                let entry = layout::object_entry_at(&self.buffer, root, i);
                let entry_size = layout::entry_size(&self.buffer, entry);
                let dest = out.len() as u32 - root;
                slots.push(dest);
                out.extend_from_slice(
                    &self.buffer[entry as usize..(entry + entry_size) as usize],
                );
                let rec = layout::entry_value(&self.buffer, entry);
                let fixed = copy_value_storage(&self.buffer, root, rec, &mut out, root);
                layout::write_u32(&mut out, root + dest, fixed.0);
            }
        } else {
            for i in 0..length {
                let rec = layout::array_value_at(&self.buffer, root, i);
                let fixed = copy_value_storage(&self.buffer, root, rec, &mut out, root);
                slots.push(fixed.0);
            }
        }

        let table_offset = out.len() as u32 - root;
        for slot in &slots {
            out.extend_from_slice(&slot.to_le_bytes());
        }
        let size = out.len() as u32 - root;
        layout::write_base(&mut out, root, size, is_object, length, table_offset);

        self.buffer = out;
        self.compaction_counter = 0;
    }
}

fn write_header(buffer: &mut [u8]) {
    layout::write_u32(buffer, 0, BINARY_FORMAT_TAG);
    layout::write_u32(buffer, 4, BINARY_FORMAT_VERSION);
}

/// Appends the out-of-line storage behind `rec` (double, string or child
/// subtree) to `out` and returns the record rewritten to point at the copy.
/// Inline values come back unchanged.
fn copy_value_storage(
    src: &[u8],
    src_base: u32,
    rec: ValueRecord,
    out: &mut Vec<u8>,
    out_base: u32,
) -> ValueRecord {
    let used = match rec.tag() {
        Some(Tag::Double) if !rec.latin_or_int() => 8,
        Some(Tag::String) => {
            let at = src_base + rec.payload();
            if rec.latin_or_int() {
                layout::aligned4(2 + u32::from(layout::read_u16(src, at)))
            } else {
                layout::aligned4(4 + 2 * layout::read_u32(src, at))
            }
        }
        Some(Tag::Array | Tag::Object) => {
            layout::base_size(src, src_base + rec.payload())
        }
        _ => return rec,
    };
    let from = (src_base + rec.payload()) as usize;
    let dest = out.len() as u32 - out_base;
    out.extend_from_slice(&src[from..from + used as usize]);
    ValueRecord((rec.0 & 0x1F) | (dest << 5))
}

// ------------------------------------------------------------------------
// Detach (copy-on-write)
// ------------------------------------------------------------------------

/// Privatizes the buffer behind a handle before mutation, making sure the
/// handle's node is the root of a uniquely owned buffer with room for
/// `reserve` more bytes.
///
/// * No buffer yet: a fresh empty document is allocated.
/// * Root handle: `Arc::make_mut` clones the buffer if other handles share
///   it (a straight copy, thanks to relative offsets) and is a no-op
///   otherwise.
/// * Interior handle: the node's subtree is re-rooted into a fresh buffer,
///   so the mutation can never disturb the surrounding document.
///
/// Returns `false` (leaving everything untouched) if the result would exceed
/// the format's size ceiling.
pub(crate) fn detach(
    data: &mut Option<Arc<SharedData>>,
    node: &mut u32,
    is_object: bool,
    reserve: u32,
) -> bool {
    match data {
        None => {
            *data = Some(Arc::new(SharedData::new_empty(is_object)));
            *node = HEADER_SIZE;
            true
        }
        Some(arc) => {
            let size = layout::base_size(&arc.buffer, *node);
            if size.saturating_add(reserve) >= MAX_SIZE {
                log::warn!("jsonbuf: node would exceed {MAX_SIZE} bytes, mutation ignored");
                return false;
            }
            if *node == HEADER_SIZE {
                Arc::make_mut(arc);
            } else {
                let rerooted = arc.clone_subtree(*node);
                *arc = Arc::new(rerooted);
                *node = HEADER_SIZE;
            }
            true
        }
    }
}

// ------------------------------------------------------------------------
// Binary validation
// ------------------------------------------------------------------------

/// Structural validation of an untrusted binary buffer. Every offset
/// arithmetic step downstream trusts the buffer, so everything is bounds-
/// checked here first: header, node sizes, table ranges, entry offsets, key
/// storage, sorted keys and value payloads, recursively to the nesting
/// limit. All arithmetic is done in `u64` so hostile lengths cannot wrap.
pub(crate) fn validate_binary(buffer: &[u8]) -> bool {
    if buffer.len() < (HEADER_SIZE + BASE_SIZE) as usize {
        return false;
    }
    if layout::read_u32(buffer, 0) != BINARY_FORMAT_TAG
        || layout::read_u32(buffer, 4) != BINARY_FORMAT_VERSION
    {
        return false;
    }
    let root_size = u64::from(layout::base_size(buffer, HEADER_SIZE));
    if u64::from(HEADER_SIZE) + root_size > buffer.len() as u64 {
        return false;
    }
    valid_base(buffer, HEADER_SIZE, 0)
}

fn valid_base(buf: &[u8], base: u32, depth: u32) -> bool {
    if depth >= NESTING_LIMIT {
        return false;
    }
    let size = layout::base_size(buf, base);
    if size < BASE_SIZE
        || size % 4 != 0
        || u64::from(size) > u64::from(MAX_SIZE)
        || u64::from(base) + u64::from(size) > buf.len() as u64
    {
        return false;
    }
    let length = layout::base_length(buf, base);
    let table = layout::base_table_offset(buf, base);
    if u64::from(table) + 4 * u64::from(length) > u64::from(size) || table % 4 != 0 {
        return false;
    }

    if layout::base_is_object(buf, base) {
        let mut prev: Option<u32> = None;
        for i in 0..length {
            let off = layout::table_at(buf, base, i);
            if !valid_entry(buf, base, off, table, size) {
                return false;
            }
            let entry = base + off;
            if let Some(p) = prev {
                // Keys must be unique and sorted for binary search to work.
                let ordered = layout::entry_key_units(buf, base + p)
                    .lt(layout::entry_key_units(buf, entry));
                if !ordered {
                    return false;
                }
            }
            prev = Some(off);
            if !valid_value(buf, base, size, layout::entry_value(buf, entry), depth) {
                return false;
            }
        }
    } else {
        for i in 0..length {
            if !valid_value(buf, base, size, layout::array_value_at(buf, base, i), depth) {
                return false;
            }
        }
    }
    true
}

fn valid_entry(buf: &[u8], base: u32, off: u32, table: u32, size: u32) -> bool {
    // The entry header must sit between the base header and the table.
    if off < BASE_SIZE || off % 4 != 0 || u64::from(off) + 4 > u64::from(table) {
        return false;
    }
    let entry = u64::from(base) + u64::from(off);
    let rec = layout::entry_value(buf, (entry) as u32);
    let key_storage = if rec.latin_key() {
        if entry + 6 > u64::from(base) + u64::from(size) {
            return false;
        }
        u64::from(layout::aligned4(2 + u32::from(layout::read_u16(buf, (entry + 4) as u32))))
    } else {
        if entry + 8 > u64::from(base) + u64::from(size) {
            return false;
        }
        let units = u64::from(layout::read_u32(buf, (entry + 4) as u32));
        4 + 2 * units + (2 * units) % 4
    };
    u64::from(off) + 4 + key_storage <= u64::from(table)
}

fn valid_value(buf: &[u8], base: u32, size: u32, rec: ValueRecord, depth: u32) -> bool {
    let end = u64::from(size);
    let off = u64::from(rec.payload());
    match rec.tag() {
        Some(Tag::Null) => true,
        Some(Tag::Bool) => rec.payload() <= 1,
        Some(Tag::Double) => rec.latin_or_int() || (off >= u64::from(BASE_SIZE) && off + 8 <= end),
        Some(Tag::String) => {
            if off < u64::from(BASE_SIZE) || off % 4 != 0 || off + 4 > end {
                return false;
            }
            let at = (base + rec.payload()) as u32;
            if rec.latin_or_int() {
                off + 2 + u64::from(layout::read_u16(buf, at)) <= end
            } else {
                off + 4 + 2 * u64::from(layout::read_u32(buf, at)) <= end
            }
        }
        Some(tag @ (Tag::Array | Tag::Object)) => {
            if off < u64::from(BASE_SIZE) || off % 4 != 0 || off + u64::from(BASE_SIZE) > end {
                return false;
            }
            let child = base + rec.payload();
            if u64::from(layout::base_size(buf, child)) > end - off {
                return false;
            }
            if layout::base_is_object(buf, child) != (tag == Tag::Object) {
                return false;
            }
            valid_base(buf, child, depth + 1)
        }
        None => false,
    }
}
