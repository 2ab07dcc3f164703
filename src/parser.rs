//! Single-pass JSON text parser.
//!
//! The parser never builds an intermediate tree: it writes the binary buffer
//! directly while walking the input once. Container nodes reserve a
//! base-sized placeholder up front, parse their members, append the index
//! table and backpatch the placeholder. Object members are binary-search
//! inserted into the table as they are parsed, so objects always come out
//! with unique, sorted keys.
//!
//! Strings are scanned optimistically as Latin-1, writing one byte per
//! character; the moment a code point above 0xFF (or an overlong string)
//! shows up, the scan restarts from the start of the string in UTF-16 mode.

use alloc::vec::Vec;

use bstr::decode_utf8;

use crate::data::{NESTING_LIMIT, SharedData};
use crate::document::Document;
use crate::error::{ParseError, ParseErrorKind};
use crate::layout::{
    self, BASE_SIZE, BINARY_FORMAT_TAG, BINARY_FORMAT_VERSION, HEADER_SIZE, INLINE_INT_BOUND,
    LATIN1_MAX_LEN, MAX_SIZE, Tag, ValueRecord,
};

/// Parses a complete JSON document (one top-level array or object).
pub(crate) fn parse(input: &[u8]) -> Result<Document, ParseError> {
    Parser::new(input).document()
}

/// A parsed value before it is packed into a 4-byte record. `latin_key` is
/// filled in by the member parser.
#[derive(Clone, Copy)]
struct Val {
    tag: Tag,
    latin_or_int: bool,
    payload: u32,
}

impl Val {
    fn record(self, latin_key: bool) -> ValueRecord {
        ValueRecord::new(self.tag, self.latin_or_int, latin_key, self.payload)
    }
}

struct Parser<'a> {
    input: &'a [u8],
    /// Forward cursor through `input`.
    pos: usize,
    /// The binary buffer under construction.
    data: Vec<u8>,
    /// Write cursor; always equal to `data.len()`.
    current: u32,
    nesting: u32,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Parser {
            input,
            pos: 0,
            data: Vec::with_capacity(input.len().max(256)),
            current: 0,
            nesting: 0,
        }
    }

    fn document(mut self) -> Result<Document, ParseError> {
        match self.run() {
            Ok(()) => Ok(Document::from_data(SharedData::from_buffer(self.data))),
            Err(kind) => Err(ParseError { kind, offset: self.pos }),
        }
    }

    fn run(&mut self) -> Result<(), ParseErrorKind> {
        self.reserve_space(HEADER_SIZE)?;
        layout::write_u32(&mut self.data, 0, BINARY_FORMAT_TAG);
        layout::write_u32(&mut self.data, 4, BINARY_FORMAT_VERSION);

        self.eat_bom();
        match self.next_token() {
            Some(b'[') => self.parse_array()?,
            Some(b'{') => self.parse_object()?,
            _ => return Err(ParseErrorKind::IllegalValue),
        }

        self.eat_space();
        if self.pos < self.input.len() {
            return Err(ParseErrorKind::GarbageAtEnd);
        }
        Ok(())
    }

    // --------------------------------------------------------------------
    // Output buffer
    // --------------------------------------------------------------------

    /// Claims `n` zeroed bytes at the write cursor.
    fn reserve_space(&mut self, n: u32) -> Result<u32, ParseErrorKind> {
        if self.current + n > MAX_SIZE {
            return Err(ParseErrorKind::DocumentTooLarge);
        }
        let pos = self.current;
        self.current += n;
        self.data.resize(self.current as usize, 0);
        Ok(pos)
    }

    /// Pads the write cursor to the next 4-byte boundary.
    fn pad4(&mut self) -> Result<(), ParseErrorKind> {
        let pad = (4 - (self.current & 3)) & 3;
        self.reserve_space(pad)?;
        Ok(())
    }

    // --------------------------------------------------------------------
    // Input cursor
    // --------------------------------------------------------------------

    fn eat_bom(&mut self) {
        if self.input.starts_with(b"\xef\xbb\xbf") {
            self.pos = 3;
        }
    }

    /// Skips insignificant whitespace; false once the input is exhausted.
    fn eat_space(&mut self) -> bool {
        while let Some(&b) = self.input.get(self.pos) {
            if !matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
                return true;
            }
            self.pos += 1;
        }
        false
    }

    /// Returns the next significant byte, consuming it only if it is a
    /// structural character or a quote.
    fn next_token(&mut self) -> Option<u8> {
        if !self.eat_space() {
            return None;
        }
        let token = self.input[self.pos];
        if matches!(token, b'[' | b'{' | b']' | b'}' | b':' | b',' | b'"') {
            self.pos += 1;
        }
        Some(token)
    }

    // --------------------------------------------------------------------
    // Grammar
    // --------------------------------------------------------------------

    /// `object = begin-object [ member *( value-separator member ) ] end-object`
    ///
    /// The opening brace has been consumed.
    fn parse_object(&mut self) -> Result<(), ParseErrorKind> {
        self.nesting += 1;
        if self.nesting > NESTING_LIMIT {
            return Err(ParseErrorKind::DeepNesting);
        }

        let object_offset = self.reserve_space(BASE_SIZE)?;
        let mut offsets: Vec<u32> = Vec::new();

        let mut token = self.next_token();
        while token == Some(b'"') {
            let entry = self.current - object_offset;
            self.parse_member(object_offset)?;
            self.insert_sorted(object_offset, &mut offsets, entry);
            token = self.next_token();
            if token != Some(b',') {
                break;
            }
            token = self.next_token();
            if token == Some(b'}') {
                return Err(ParseErrorKind::MissingObject);
            }
        }
        if token != Some(b'}') {
            return Err(ParseErrorKind::UnterminatedObject);
        }

        let mut table = object_offset + BASE_SIZE;
        if !offsets.is_empty() {
            table = self.reserve_space(4 * offsets.len() as u32)?;
            for (i, off) in offsets.iter().enumerate() {
                layout::write_u32(&mut self.data, table + 4 * i as u32, *off);
            }
        }
        layout::write_base(
            &mut self.data,
            object_offset,
            self.current - object_offset,
            true,
            offsets.len() as u32,
            table - object_offset,
        );

        self.nesting -= 1;
        Ok(())
    }

    /// Binary-search insertion keeping the offset table sorted by key. A
    /// duplicate key overwrites the earlier slot; the earlier entry's bytes
    /// become an unreferenced hole in the buffer.
    fn insert_sorted(&self, base: u32, offsets: &mut Vec<u32>, new_off: u32) {
        let key = |off: u32| layout::entry_key_units(&self.data, base + off);
        let mut lo = 0usize;
        let mut n = offsets.len();
        while n > 0 {
            let half = n / 2;
            let mid = lo + half;
            if key(offsets[mid]).ge(key(new_off)) {
                n = half;
            } else {
                lo = mid + 1;
                n -= half + 1;
            }
        }
        if lo < offsets.len() && key(offsets[lo]).eq(key(new_off)) {
            offsets[lo] = new_off;
        } else {
            offsets.insert(lo, new_off);
        }
    }

    /// `member = string name-separator value`
    ///
    /// The key's opening quote has been consumed.
    fn parse_member(&mut self, base_offset: u32) -> Result<(), ParseErrorKind> {
        let entry_offset = self.reserve_space(4)?;
        let latin_key = self.parse_string()?;
        if self.next_token() != Some(b':') {
            return Err(ParseErrorKind::MissingNameSeparator);
        }
        if !self.eat_space() {
            return Err(ParseErrorKind::UnterminatedObject);
        }
        let val = self.parse_value(base_offset)?;
        layout::write_u32(&mut self.data, entry_offset, val.record(latin_key).0);
        Ok(())
    }

    /// `array = begin-array [ value *( value-separator value ) ] end-array`
    ///
    /// The opening bracket has been consumed.
    fn parse_array(&mut self) -> Result<(), ParseErrorKind> {
        self.nesting += 1;
        if self.nesting > NESTING_LIMIT {
            return Err(ParseErrorKind::DeepNesting);
        }

        let array_offset = self.reserve_space(BASE_SIZE)?;
        let mut values: Vec<ValueRecord> = Vec::new();

        if !self.eat_space() {
            return Err(ParseErrorKind::UnterminatedArray);
        }
        if self.input[self.pos] == b']' {
            self.pos += 1;
        } else {
            loop {
                if !self.eat_space() {
                    return Err(ParseErrorKind::UnterminatedArray);
                }
                let val = self.parse_value(array_offset)?;
                values.push(val.record(false));
                match self.next_token() {
                    Some(b']') => break,
                    Some(b',') => {}
                    Some(_) => return Err(ParseErrorKind::MissingValueSeparator),
                    None => return Err(ParseErrorKind::UnterminatedArray),
                }
            }
        }

        let mut table = array_offset + BASE_SIZE;
        if !values.is_empty() {
            table = self.reserve_space(4 * values.len() as u32)?;
            for (i, rec) in values.iter().enumerate() {
                layout::write_u32(&mut self.data, table + 4 * i as u32, rec.0);
            }
        }
        layout::write_base(
            &mut self.data,
            array_offset,
            self.current - array_offset,
            false,
            values.len() as u32,
            table - array_offset,
        );

        self.nesting -= 1;
        Ok(())
    }

    /// `value = false / null / true / object / array / number / string`
    fn parse_value(&mut self, base_offset: u32) -> Result<Val, ParseErrorKind> {
        let Some(&b) = self.input.get(self.pos) else {
            return Err(ParseErrorKind::IllegalValue);
        };
        match b {
            b'n' => {
                self.literal(b"null")?;
                Ok(Val { tag: Tag::Null, latin_or_int: false, payload: 0 })
            }
            b't' => {
                self.literal(b"true")?;
                Ok(Val { tag: Tag::Bool, latin_or_int: false, payload: 1 })
            }
            b'f' => {
                self.literal(b"false")?;
                Ok(Val { tag: Tag::Bool, latin_or_int: false, payload: 0 })
            }
            b'"' => {
                self.pos += 1;
                let payload = self.current - base_offset;
                if payload >= MAX_SIZE {
                    return Err(ParseErrorKind::DocumentTooLarge);
                }
                let latin = self.parse_string()?;
                Ok(Val { tag: Tag::String, latin_or_int: latin, payload })
            }
            b'[' => {
                self.pos += 1;
                let payload = self.current - base_offset;
                if payload >= MAX_SIZE {
                    return Err(ParseErrorKind::DocumentTooLarge);
                }
                self.parse_array()?;
                Ok(Val { tag: Tag::Array, latin_or_int: false, payload })
            }
            b'{' => {
                self.pos += 1;
                let payload = self.current - base_offset;
                if payload >= MAX_SIZE {
                    return Err(ParseErrorKind::DocumentTooLarge);
                }
                self.parse_object()?;
                Ok(Val { tag: Tag::Object, latin_or_int: false, payload })
            }
            b']' | b'}' => Err(ParseErrorKind::MissingObject),
            b'-' | b'0'..=b'9' => self.parse_number(base_offset),
            _ => Err(ParseErrorKind::IllegalValue),
        }
    }

    /// Exact keyword match; partial or extended tokens are illegal.
    fn literal(&mut self, keyword: &[u8]) -> Result<(), ParseErrorKind> {
        if self.input[self.pos..].starts_with(keyword) {
            self.pos += keyword.len();
            Ok(())
        } else {
            Err(ParseErrorKind::IllegalValue)
        }
    }

    /// `number = [ minus ] int [ frac ] [ exp ]`
    ///
    /// Integers without fraction or exponent that fit the inline bound are
    /// stored in the record itself, saving the 8-byte allocation.
    fn parse_number(&mut self, base_offset: u32) -> Result<Val, ParseErrorKind> {
        let start = self.pos;

        if self.input.get(self.pos) == Some(&b'-') {
            self.pos += 1;
        }
        if self.input.get(self.pos) == Some(&b'0') {
            self.pos += 1;
        } else {
            self.eat_digits();
        }
        let mut is_int = true;
        if self.input.get(self.pos) == Some(&b'.') {
            is_int = false;
            self.pos += 1;
            self.eat_digits();
        }
        if matches!(self.input.get(self.pos), Some(b'e' | b'E')) {
            is_int = false;
            self.pos += 1;
            if matches!(self.input.get(self.pos), Some(b'-' | b'+')) {
                self.pos += 1;
            }
            self.eat_digits();
        }
        if self.pos >= self.input.len() {
            return Err(ParseErrorKind::TerminationByNumber);
        }

        let text = core::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| ParseErrorKind::IllegalNumber)?;

        if is_int {
            if let Ok(n) = text.parse::<i32>() {
                if n < INLINE_INT_BOUND && n > -INLINE_INT_BOUND {
                    return Ok(Val {
                        tag: Tag::Double,
                        latin_or_int: true,
                        payload: layout::inline_int_payload(n),
                    });
                }
            }
        }

        let d: f64 = text.parse().map_err(|_| ParseErrorKind::IllegalNumber)?;
        let pos = self.reserve_space(8)?;
        layout::write_f64(&mut self.data, pos, d);
        let payload = pos - base_offset;
        if payload >= MAX_SIZE {
            return Err(ParseErrorKind::DocumentTooLarge);
        }
        Ok(Val { tag: Tag::Double, latin_or_int: false, payload })
    }

    fn eat_digits(&mut self) {
        while matches!(self.input.get(self.pos), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
    }

    /// Parses a string whose opening quote has been consumed, writing it as
    /// length-prefixed Latin-1 or UTF-16 storage at the current position.
    /// Returns whether the Latin-1 fast path held.
    fn parse_string(&mut self) -> Result<bool, ParseErrorKind> {
        let start = self.pos;
        let out_start = self.current;
        let string_pos = self.reserve_space(2)?;

        let mut latin = true;
        loop {
            let Some(&b) = self.input.get(self.pos) else {
                break;
            };
            if b == b'"' {
                break;
            }
            let ch = if b == b'\\' { self.scan_escape()? } else { self.scan_utf8_char()? };
            // Bail out the moment the string is not pure Latin-1, or writing
            // this char would reach the length cap. Strings of LATIN1_MAX_LEN
            // chars or more are always stored wide, matching
            // `layout::is_latin1`.
            if ch > 0xFF || self.current - out_start - 1 >= LATIN1_MAX_LEN {
                latin = false;
                break;
            }
            let pos = self.reserve_space(1)?;
            self.data[pos as usize] = ch as u8;
        }

        if latin {
            if self.pos >= self.input.len() {
                return Err(ParseErrorKind::UnterminatedString);
            }
            self.pos += 1; // closing quote
            layout::write_u16(&mut self.data, string_pos, (self.current - out_start - 2) as u16);
            self.pad4()?;
            return Ok(true);
        }

        // Restart from the beginning of the string in UTF-16 mode.
        self.pos = start;
        self.current = out_start;
        self.data.truncate(out_start as usize);
        let string_pos = self.reserve_space(4)?;

        loop {
            let Some(&b) = self.input.get(self.pos) else {
                return Err(ParseErrorKind::UnterminatedString);
            };
            if b == b'"' {
                self.pos += 1;
                break;
            }
            let ch = if b == b'\\' { self.scan_escape()? } else { self.scan_utf8_char()? };
            if ch >= 0x10000 {
                let pos = self.reserve_space(4)?;
                let c = ch - 0x10000;
                layout::write_u16(&mut self.data, pos, (0xD800 | (c >> 10)) as u16);
                layout::write_u16(&mut self.data, pos + 2, (0xDC00 | (c & 0x3FF)) as u16);
            } else {
                let pos = self.reserve_space(2)?;
                layout::write_u16(&mut self.data, pos, ch as u16);
            }
        }

        layout::write_u32(&mut self.data, string_pos, (self.current - out_start - 4) / 2);
        self.pad4()?;
        Ok(false)
    }

    /// Scans one backslash escape. Unrecognized escapes pass the escaped
    /// character through verbatim, keeping compatibility with documents that
    /// were stored with that leniency.
    fn scan_escape(&mut self) -> Result<u32, ParseErrorKind> {
        self.pos += 1;
        let Some(&escaped) = self.input.get(self.pos) else {
            return Err(ParseErrorKind::IllegalEscapeSequence);
        };
        self.pos += 1;
        match escaped {
            b'"' => Ok(u32::from(b'"')),
            b'\\' => Ok(u32::from(b'\\')),
            b'/' => Ok(u32::from(b'/')),
            b'b' => Ok(0x8),
            b'f' => Ok(0xC),
            b'n' => Ok(0xA),
            b'r' => Ok(0xD),
            b't' => Ok(0x9),
            b'u' => {
                if self.pos + 4 > self.input.len() {
                    return Err(ParseErrorKind::IllegalEscapeSequence);
                }
                let mut ch = 0u32;
                for _ in 0..4 {
                    let digit = match self.input[self.pos] {
                        d @ b'0'..=b'9' => u32::from(d - b'0'),
                        d @ b'a'..=b'f' => u32::from(d - b'a') + 10,
                        d @ b'A'..=b'F' => u32::from(d - b'A') + 10,
                        _ => return Err(ParseErrorKind::IllegalEscapeSequence),
                    };
                    ch = (ch << 4) | digit;
                    self.pos += 1;
                }
                Ok(ch)
            }
            other => Ok(u32::from(other)),
        }
    }

    /// Decodes one UTF-8 scalar from the input.
    fn scan_utf8_char(&mut self) -> Result<u32, ParseErrorKind> {
        let (ch, size) = decode_utf8(&self.input[self.pos..]);
        let Some(ch) = ch else {
            return Err(ParseErrorKind::IllegalUtf8String);
        };
        self.pos += size;
        Ok(ch as u32)
    }
}
