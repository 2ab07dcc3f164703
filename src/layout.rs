//! Binary layout primitives.
//!
//! A document is a single contiguous byte buffer: an 8-byte header followed
//! by one root node. Nodes (arrays and objects) are variable-length records
//! that reference their children through byte offsets *relative to the node's
//! own position*, never absolute, so any node subtree can be relocated with a
//! plain byte copy. All multi-byte fields are little-endian and are accessed
//! through `from_le_bytes`/`to_le_bytes`, so the buffer has no alignment
//! requirements and no `unsafe` is involved.
//!
//! Node shape:
//!
//! ```text
//! Base   { size: u32, is_object:1 | length:31, table_offset: u32 }
//! Array  = Base + out-of-line storage + table of `length` value records
//! Object = Base + entries + out-of-line storage + table of `length` offsets
//! Entry  = value record (4 bytes) + inline key string
//! ```
//!
//! The index table is always the last thing inside a node; object tables are
//! kept sorted by key so lookup is a binary search.

use alloc::string::String;

/// Size of the document header: 4-byte format tag plus 4-byte version.
pub(crate) const HEADER_SIZE: u32 = 8;

/// Size of the common node header (`size`, `is_object`/`length`,
/// `table_offset`).
pub(crate) const BASE_SIZE: u32 = 12;

/// Hard ceiling on any node size and on the whole document. Dictated by the
/// 27-bit payload field of a value record: no offset above this is
/// representable.
pub(crate) const MAX_SIZE: u32 = 1 << 27;

/// Magic tag identifying the binary format.
pub(crate) const BINARY_FORMAT_TAG: u32 = u32::from_le_bytes(*b"jbuf");

/// Only version 1 exists.
pub(crate) const BINARY_FORMAT_VERSION: u32 = 1;

/// Latin-1 string storage carries a 16-bit length; strings at or above this
/// many bytes fall back to UTF-16 storage.
pub(crate) const LATIN1_MAX_LEN: u32 = 0x8000;

/// Integers with an absolute value below this bound are stored inline in the
/// 27-bit payload instead of as an out-of-line double.
pub(crate) const INLINE_INT_BOUND: i32 = 1 << 25;

pub(crate) fn read_u16(buf: &[u8], off: u32) -> u16 {
    let o = off as usize;
    u16::from_le_bytes([buf[o], buf[o + 1]])
}

pub(crate) fn write_u16(buf: &mut [u8], off: u32, v: u16) {
    let o = off as usize;
    buf[o..o + 2].copy_from_slice(&v.to_le_bytes());
}

pub(crate) fn read_u32(buf: &[u8], off: u32) -> u32 {
    let o = off as usize;
    u32::from_le_bytes([buf[o], buf[o + 1], buf[o + 2], buf[o + 3]])
}

pub(crate) fn write_u32(buf: &mut [u8], off: u32, v: u32) {
    let o = off as usize;
    buf[o..o + 4].copy_from_slice(&v.to_le_bytes());
}

pub(crate) fn read_f64(buf: &[u8], off: u32) -> f64 {
    let o = off as usize;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[o..o + 8]);
    f64::from_le_bytes(raw)
}

pub(crate) fn write_f64(buf: &mut [u8], off: u32, v: f64) {
    let o = off as usize;
    buf[o..o + 8].copy_from_slice(&v.to_le_bytes());
}

/// Rounds a byte count up to the 4-byte boundary every record sits on.
pub(crate) fn aligned4(n: u32) -> u32 {
    (n + 3) & !3
}

// ------------------------------------------------------------------------
// Value records
// ------------------------------------------------------------------------

/// Type tag of a value record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tag {
    Null = 0,
    Bool = 1,
    Double = 2,
    String = 3,
    Array = 4,
    Object = 5,
}

/// One fixed-size tagged record: an array element or the value half of an
/// object entry.
///
/// Bit layout: bits 0..3 type tag, bit 3 `latin_or_int` (inline integer for
/// doubles, Latin-1 storage for strings), bit 4 `latin_key` (meaningful in
/// entries only), bits 5..32 payload. The payload is either an inline scalar
/// (bool, small integer) or a node-relative offset to out-of-line data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ValueRecord(pub(crate) u32);

impl ValueRecord {
    pub(crate) fn new(tag: Tag, latin_or_int: bool, latin_key: bool, payload: u32) -> Self {
        ValueRecord(
            (tag as u32)
                | (u32::from(latin_or_int) << 3)
                | (u32::from(latin_key) << 4)
                | (payload << 5),
        )
    }

    pub(crate) fn tag(self) -> Option<Tag> {
        match self.0 & 0x7 {
            0 => Some(Tag::Null),
            1 => Some(Tag::Bool),
            2 => Some(Tag::Double),
            3 => Some(Tag::String),
            4 => Some(Tag::Array),
            5 => Some(Tag::Object),
            _ => None,
        }
    }

    pub(crate) fn latin_or_int(self) -> bool {
        self.0 & (1 << 3) != 0
    }

    pub(crate) fn latin_key(self) -> bool {
        self.0 & (1 << 4) != 0
    }

    /// The 27-bit payload interpreted as an unsigned offset or scalar.
    pub(crate) fn payload(self) -> u32 {
        self.0 >> 5
    }

    /// The payload sign-extended to an inline integer.
    pub(crate) fn int_value(self) -> i32 {
        (self.0 as i32) >> 5
    }
}

/// Packs an integer into the 27-bit inline payload. The caller guarantees
/// `|n| < INLINE_INT_BOUND`.
pub(crate) fn inline_int_payload(n: i32) -> u32 {
    (n as u32) & 0x07FF_FFFF
}

// ------------------------------------------------------------------------
// Base (node header) accessors
// ------------------------------------------------------------------------

pub(crate) fn base_size(buf: &[u8], base: u32) -> u32 {
    read_u32(buf, base)
}

pub(crate) fn set_base_size(buf: &mut [u8], base: u32, size: u32) {
    write_u32(buf, base, size);
}

pub(crate) fn base_is_object(buf: &[u8], base: u32) -> bool {
    read_u32(buf, base + 4) & 1 == 1
}

pub(crate) fn base_length(buf: &[u8], base: u32) -> u32 {
    read_u32(buf, base + 4) >> 1
}

pub(crate) fn set_base_length(buf: &mut [u8], base: u32, length: u32) {
    let is_object = read_u32(buf, base + 4) & 1;
    write_u32(buf, base + 4, (length << 1) | is_object);
}

pub(crate) fn base_table_offset(buf: &[u8], base: u32) -> u32 {
    read_u32(buf, base + 8)
}

pub(crate) fn set_base_table_offset(buf: &mut [u8], base: u32, table_offset: u32) {
    write_u32(buf, base + 8, table_offset);
}

pub(crate) fn write_base(
    buf: &mut [u8],
    base: u32,
    size: u32,
    is_object: bool,
    length: u32,
    table_offset: u32,
) {
    write_u32(buf, base, size);
    write_u32(buf, base + 4, (length << 1) | u32::from(is_object));
    write_u32(buf, base + 8, table_offset);
}

/// Reads slot `i` of a node's index table: a value record for arrays, an
/// entry offset for objects (both 4 bytes wide, which is what lets the
/// in-place table shuffling treat them uniformly).
pub(crate) fn table_at(buf: &[u8], base: u32, i: u32) -> u32 {
    read_u32(buf, base + base_table_offset(buf, base) + 4 * i)
}

pub(crate) fn set_table_at(buf: &mut [u8], base: u32, i: u32, v: u32) {
    let off = base + base_table_offset(buf, base) + 4 * i;
    write_u32(buf, off, v);
}

pub(crate) fn array_value_at(buf: &[u8], base: u32, i: u32) -> ValueRecord {
    ValueRecord(table_at(buf, base, i))
}

/// Absolute offset of object entry `i`.
pub(crate) fn object_entry_at(buf: &[u8], base: u32, i: u32) -> u32 {
    base + table_at(buf, base, i)
}

// ------------------------------------------------------------------------
// Entries and string storage
// ------------------------------------------------------------------------

/// Storage footprint of a key or string value: length prefix plus data,
/// padded to the 4-byte boundary. `latin` keys carry a `u16` length and one
/// byte per character; UTF-16 keys carry a `u32` length and two bytes per
/// code unit.
pub(crate) fn string_storage_size(s: &str, latin: bool) -> u32 {
    if latin {
        aligned4(2 + s.chars().count() as u32)
    } else {
        aligned4(4 + 2 * s.encode_utf16().count() as u32)
    }
}

/// True if every char fits in Latin-1 and the char count stays below
/// [`LATIN1_MAX_LEN`]. The same cap applies when parsing text, so a string
/// is stored in the same form whichever way it enters a buffer.
pub(crate) fn is_latin1(s: &str) -> bool {
    let mut count = 0u32;
    for c in s.chars() {
        if c as u32 > 0xFF {
            return false;
        }
        count += 1;
        if count >= LATIN1_MAX_LEN {
            return false;
        }
    }
    true
}

/// Writes a length-prefixed string at `off`, in Latin-1 or UTF-16 form.
/// The destination bytes are already zeroed, so padding needs no work.
pub(crate) fn write_string(buf: &mut [u8], off: u32, s: &str, latin: bool) {
    if latin {
        write_u16(buf, off, s.chars().count() as u16);
        let mut o = (off + 2) as usize;
        for c in s.chars() {
            buf[o] = c as u8;
            o += 1;
        }
    } else {
        let units = s.encode_utf16().count() as u32;
        write_u32(buf, off, units);
        let mut o = off + 4;
        for unit in s.encode_utf16() {
            write_u16(buf, o, unit);
            o += 2;
        }
    }
}

pub(crate) fn entry_value(buf: &[u8], entry: u32) -> ValueRecord {
    ValueRecord(read_u32(buf, entry))
}

/// Byte footprint of an entry: the value record plus the inline key.
pub(crate) fn entry_size(buf: &[u8], entry: u32) -> u32 {
    let key_storage = if entry_value(buf, entry).latin_key() {
        aligned4(2 + u32::from(read_u16(buf, entry + 4)))
    } else {
        aligned4(4 + 2 * read_u32(buf, entry + 4))
    };
    4 + key_storage
}

/// Iterator over a stored key as UTF-16 code units, used for ordered
/// comparisons without materializing a `String`.
pub(crate) struct KeyUnits<'a> {
    buf: &'a [u8],
    off: u32,
    remaining: u32,
    latin: bool,
}

impl Iterator for KeyUnits<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let unit = if self.latin {
            u16::from(self.buf[self.off as usize])
        } else {
            read_u16(self.buf, self.off)
        };
        self.off += if self.latin { 1 } else { 2 };
        Some(unit)
    }
}

pub(crate) fn entry_key_units(buf: &[u8], entry: u32) -> KeyUnits<'_> {
    if entry_value(buf, entry).latin_key() {
        KeyUnits {
            buf,
            off: entry + 6,
            remaining: u32::from(read_u16(buf, entry + 4)),
            latin: true,
        }
    } else {
        KeyUnits {
            buf,
            off: entry + 8,
            remaining: read_u32(buf, entry + 4),
            latin: false,
        }
    }
}

pub(crate) fn entry_key(buf: &[u8], entry: u32) -> String {
    read_string(buf, entry + 4, entry_value(buf, entry).latin_key())
}

/// Materializes a length-prefixed string at `off`. Unpaired surrogates in
/// UTF-16 storage are substituted with U+FFFD.
pub(crate) fn read_string(buf: &[u8], off: u32, latin: bool) -> String {
    if latin {
        let len = u32::from(read_u16(buf, off));
        let start = (off + 2) as usize;
        buf[start..start + len as usize]
            .iter()
            .map(|&b| char::from(b))
            .collect()
    } else {
        let len = read_u32(buf, off);
        let units: alloc::vec::Vec<u16> =
            (0..len).map(|i| read_u16(buf, off + 4 + 2 * i)).collect();
        String::from_utf16_lossy(&units)
    }
}

/// Materializes a string value record relative to its node; returns the text
/// and whether it was stored on the Latin-1 path (the writer escapes those
/// differently).
pub(crate) fn string_value(buf: &[u8], base: u32, rec: ValueRecord) -> (String, bool) {
    let latin = rec.latin_or_int();
    (read_string(buf, base + rec.payload(), latin), latin)
}
