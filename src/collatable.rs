//! Module `collatable` implements the order-preserving binary codec for
//! JSON-like values: the invariant the rest of the index engine is
//! built on is that byte comparison of two encodings equals the
//! semantic comparison of the values they encode.
//!
//! Grounded on `examples/original_source/CBForest/Collatable.cc`/`.hh`:
//! the tag alphabet, the char-priority table (built from the original's
//! `kInverseMap` string), and the "negate all bits of a negative
//! double's big-endian representation" trick for numbers are carried
//! over unchanged — they are the actual wire format, not an
//! implementation detail free to vary.

use crate::error::Error;
use crate::varint::{decode_be_double, encode_be_double};
use crate::Result;

/// Tag byte alphabet, in lexicographic order. `EndSequence` terminates
/// arrays and maps; `Error` is never stored, only returned by `peek_tag`
/// on out-of-band input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    EndSequence = 0,
    Null,
    False,
    True,
    Negative,
    Positive,
    String,
    Array,
    Map,
    Geohash,
    Special,
    FullTextKey,
    GeoJSONKey,
    Error = 255,
}

impl Tag {
    fn from_byte(b: u8) -> Tag {
        match b {
            0 => Tag::EndSequence,
            1 => Tag::Null,
            2 => Tag::False,
            3 => Tag::True,
            4 => Tag::Negative,
            5 => Tag::Positive,
            6 => Tag::String,
            7 => Tag::Array,
            8 => Tag::Map,
            9 => Tag::Geohash,
            10 => Tag::Special,
            11 => Tag::FullTextKey,
            12 => Tag::GeoJSONKey,
            _ => Tag::Error,
        }
    }
}

// Bytes, in the order they must collate before letters: control chars,
// then ASCII punctuation, then digits/letters case-insensitively with
// lowercase before uppercase. Ported verbatim from the original's
// `kInverseMap` so round-tripped strings sort identically.
const INVERSE_MAP: &[u8] = b"\t\n\r `^_-,;:!?.'\"()[]{}@*/\\&#%+<=>|~$0123456789aAbBcCdDeEfFgGhHiIjJkKlLmMnNoOpPqQrRsStTuUvVwWxXyYzZ";

fn char_priority_map() -> &'static [u8; 256] {
    use std::sync::OnceLock;
    static MAP: OnceLock<[u8; 256]> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut table = [0u8; 256];
        let mut priority: u8 = 1;
        for &c in INVERSE_MAP {
            table[c as usize] = priority;
            priority = priority.wrapping_add(1);
        }
        for i in 128..256 {
            table[i] = i as u8;
        }
        table
    })
}

fn inverse_char_priority_map() -> &'static [u8; 256] {
    use std::sync::OnceLock;
    static MAP: OnceLock<[u8; 256]> = OnceLock::new();
    MAP.get_or_init(|| {
        let priority = char_priority_map();
        let mut inverse = [0u8; 256];
        for (i, &p) in priority.iter().enumerate() {
            inverse[p as usize] = i as u8;
        }
        inverse
    })
}

/// Builds a collatable byte string by appending values in order. Each
/// `add_*`/`begin_*` call appends to an internal buffer; `finish()`
/// extracts it.
#[derive(Clone, Debug, Default)]
pub struct CollatableBuilder {
    buf: Vec<u8>,
}

impl CollatableBuilder {
    pub fn new() -> CollatableBuilder {
        CollatableBuilder { buf: Vec::with_capacity(64) }
    }

    fn add_tag(&mut self, tag: Tag) -> &mut Self {
        self.buf.push(tag as u8);
        self
    }

    pub fn add_null(&mut self) -> &mut Self {
        self.add_tag(Tag::Null)
    }

    pub fn add_bool(&mut self, b: bool) -> &mut Self {
        self.add_tag(if b { Tag::True } else { Tag::False })
    }

    /// Append a number. Encoded as 8 big-endian IEEE-754 bytes, preceded
    /// by `Negative`/`Positive`; negatives have all bits inverted so
    /// that numerically smaller negatives compare less.
    pub fn add_number(&mut self, n: f64) -> &mut Self {
        if n < 0.0 {
            self.add_tag(Tag::Negative);
            let mut scratch = Vec::with_capacity(8);
            encode_be_double(n, &mut scratch);
            for b in scratch.iter_mut() {
                *b = !*b;
            }
            self.buf.extend_from_slice(&scratch);
        } else {
            self.add_tag(Tag::Positive);
            encode_be_double(n, &mut self.buf);
        }
        self
    }

    fn add_string_tagged(&mut self, tag: Tag, s: &[u8]) -> &mut Self {
        let priority = char_priority_map();
        self.add_tag(tag);
        self.buf.extend(s.iter().map(|&c| priority[c as usize]));
        self.buf.push(0);
        self
    }

    pub fn add_string(&mut self, s: &str) -> &mut Self {
        self.add_string_tagged(Tag::String, s.as_bytes())
    }

    pub fn add_bytes(&mut self, s: &[u8]) -> &mut Self {
        self.add_string_tagged(Tag::String, s)
    }

    pub fn add_geohash(&mut self, hash: &str) -> &mut Self {
        self.add_string_tagged(Tag::Geohash, hash.as_bytes())
    }

    /// A placeholder value meaning "the value is the source document
    /// itself"; see the index engine's reserved-sentinel handling.
    pub fn add_special(&mut self) -> &mut Self {
        self.add_tag(Tag::Special)
    }

    pub fn begin_array(&mut self) -> &mut Self {
        self.add_tag(Tag::Array)
    }

    pub fn end_array(&mut self) -> &mut Self {
        self.add_tag(Tag::EndSequence)
    }

    pub fn begin_map(&mut self) -> &mut Self {
        self.add_tag(Tag::Map)
    }

    pub fn end_map(&mut self) -> &mut Self {
        self.add_tag(Tag::EndSequence)
    }

    /// Append another, already-built collatable value verbatim (used to
    /// concatenate e.g. `[emittedKey, collatable(sourceID)]`).
    pub fn add_raw(&mut self, other: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(other);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// A cursor over a collatable-encoded byte string.
pub struct CollatableReader<'a> {
    data: &'a [u8],
}

impl<'a> CollatableReader<'a> {
    pub fn new(data: &'a [u8]) -> CollatableReader<'a> {
        CollatableReader { data }
    }

    pub fn at_end(&self) -> bool {
        self.data.is_empty()
    }

    pub fn peek_tag(&self) -> Tag {
        if self.data.is_empty() {
            Tag::EndSequence
        } else {
            Tag::from_byte(self.data[0])
        }
    }

    fn expect_tag(&mut self, expect: Tag) -> Result<()> {
        if self.data.is_empty() {
            return Err(Error::CorruptIndexData("unexpected end of collatable data".into()));
        }
        let got = Tag::from_byte(self.data[0]);
        self.data = &self.data[1..];
        if got as u8 != expect as u8 {
            return Err(Error::CorruptIndexData(format!(
                "expected tag {:?}, found {:?}",
                expect, got
            )));
        }
        Ok(())
    }

    pub fn read_null(&mut self) -> Result<()> {
        self.expect_tag(Tag::Null)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.peek_tag() {
            Tag::True => {
                self.data = &self.data[1..];
                Ok(true)
            }
            Tag::False => {
                self.data = &self.data[1..];
                Ok(false)
            }
            other => Err(Error::CorruptIndexData(format!("expected bool, found {:?}", other))),
        }
    }

    pub fn read_double(&mut self) -> Result<f64> {
        let tag = self.peek_tag();
        match tag {
            Tag::Negative | Tag::Positive => {
                self.data = &self.data[1..];
                if self.data.len() < 8 {
                    return Err(Error::CorruptIndexData("truncated number".into()));
                }
                let (raw, rest) = self.data.split_at(8);
                self.data = rest;
                if tag == Tag::Negative {
                    let inverted: Vec<u8> = raw.iter().map(|b| !b).collect();
                    decode_be_double(&inverted)
                } else {
                    decode_be_double(raw)
                }
            }
            other => Err(Error::CorruptIndexData(format!("expected number, found {:?}", other))),
        }
    }

    /// Read a number and validate it is an exact integer.
    pub fn read_int(&mut self) -> Result<i64> {
        let d = self.read_double()?;
        let i = d as i64;
        if i as f64 != d {
            return Err(Error::CorruptIndexData(format!("{} is not an exact integer", d)));
        }
        Ok(i)
    }

    fn read_string_tagged(&mut self, tag: Tag) -> Result<Vec<u8>> {
        self.expect_tag(tag)?;
        let inverse = inverse_char_priority_map();
        let term = self
            .data
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::CorruptIndexData("unterminated string".into()))?;
        let decoded: Vec<u8> = self.data[..term].iter().map(|&c| inverse[c as usize]).collect();
        self.data = &self.data[term + 1..];
        Ok(decoded)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_string_tagged(Tag::String)?;
        String::from_utf8(bytes).map_err(|e| Error::CorruptIndexData(e.to_string()))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        self.read_string_tagged(Tag::String)
    }

    pub fn read_geohash(&mut self) -> Result<String> {
        let bytes = self.read_string_tagged(Tag::Geohash)?;
        String::from_utf8(bytes).map_err(|e| Error::CorruptIndexData(e.to_string()))
    }

    pub fn begin_array(&mut self) -> Result<()> {
        self.expect_tag(Tag::Array)
    }

    pub fn end_array(&mut self) -> Result<()> {
        self.expect_tag(Tag::EndSequence)
    }

    pub fn begin_map(&mut self) -> Result<()> {
        self.expect_tag(Tag::Map)
    }

    pub fn end_map(&mut self) -> Result<()> {
        self.expect_tag(Tag::EndSequence)
    }

    /// Skip one value of any type, returning its raw (still-encoded)
    /// bytes. Used to copy a nested value without decoding it.
    pub fn read_raw(&mut self) -> Result<&'a [u8]> {
        let start = self.data;
        self.skip_value()?;
        let consumed = start.len() - self.data.len();
        Ok(&start[..consumed])
    }

    fn skip_value(&mut self) -> Result<()> {
        if self.data.is_empty() {
            return Err(Error::CorruptIndexData("unexpected end of collatable data".into()));
        }
        let tag = self.peek_tag();
        self.data = &self.data[1..];
        match tag {
            Tag::EndSequence => {
                return Err(Error::CorruptIndexData("unexpected end-sequence".into()));
            }
            Tag::Null | Tag::False | Tag::True | Tag::Special => {}
            Tag::Negative | Tag::Positive => {
                if self.data.len() < 8 {
                    return Err(Error::CorruptIndexData("truncated number".into()));
                }
                self.data = &self.data[8..];
            }
            Tag::String | Tag::Geohash | Tag::FullTextKey | Tag::GeoJSONKey => {
                let term = self
                    .data
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or_else(|| Error::CorruptIndexData("unterminated string".into()))?;
                self.data = &self.data[term + 1..];
            }
            Tag::Array | Tag::Map => loop {
                if self.peek_tag() == Tag::EndSequence {
                    self.data = &self.data[1..];
                    break;
                }
                self.skip_value()?;
            },
            Tag::Error => return Err(Error::CorruptIndexData("invalid tag byte".into())),
        }
        Ok(())
    }

    pub fn remaining(&self) -> &'a [u8] {
        self.data
    }
}

/// Encode an owned byte string (key or value, used internally by the
/// index row key format) as a collatable string value in one call.
pub fn encode_bytes(s: &[u8]) -> Vec<u8> {
    let mut b = CollatableBuilder::new();
    b.add_bytes(s);
    b.finish()
}

#[cfg(test)]
mod collatable_test {
    use super::*;

    fn encode_num(n: f64) -> Vec<u8> {
        let mut b = CollatableBuilder::new();
        b.add_number(n);
        b.finish()
    }

    fn encode_str(s: &str) -> Vec<u8> {
        let mut b = CollatableBuilder::new();
        b.add_string(s);
        b.finish()
    }

    #[test]
    fn test_number_roundtrip_and_order() {
        let values = [-100.5, -1.0, -0.0001, 0.0, 0.0001, 1.0, 100.5];
        let mut encoded: Vec<Vec<u8>> = values.iter().map(|&n| encode_num(n)).collect();
        let sorted = {
            let mut e = encoded.clone();
            e.sort();
            e
        };
        assert_eq!(encoded, sorted, "encodings must already be in semantic order");
        for (i, enc) in encoded.drain(..).enumerate() {
            let mut r = CollatableReader::new(&enc);
            let got = r.read_double().unwrap();
            assert_eq!(got, values[i]);
        }
    }

    #[test]
    fn test_string_roundtrip() {
        for s in ["", "hello", "Hello World!", "123abc", "z-index"] {
            let enc = encode_str(s);
            let mut r = CollatableReader::new(&enc);
            assert_eq!(r.read_string().unwrap(), s);
            assert!(r.at_end());
        }
    }

    #[test]
    fn test_string_order_case_insensitive_digits_first() {
        // digits < lowercase < uppercase (interleaved by letter), all < non-ascii
        let a = encode_str("9");
        let b = encode_str("a");
        let c = encode_str("A");
        let d = encode_str("b");
        assert!(a < b);
        assert!(b < c);
        assert!(c < d);
    }

    #[test]
    fn test_array_roundtrip() {
        let mut b = CollatableBuilder::new();
        b.begin_array();
        b.add_number(1.0);
        b.add_string("x");
        b.add_bool(true);
        b.end_array();
        let enc = b.finish();

        let mut r = CollatableReader::new(&enc);
        r.begin_array().unwrap();
        assert_eq!(r.read_int().unwrap(), 1);
        assert_eq!(r.read_string().unwrap(), "x");
        assert_eq!(r.read_bool().unwrap(), true);
        r.end_array().unwrap();
        assert!(r.at_end());
    }

    #[test]
    fn test_nested_array_order() {
        let mut a1 = CollatableBuilder::new();
        a1.begin_array();
        a1.add_number(1.0);
        a1.end_array();

        let mut a2 = CollatableBuilder::new();
        a2.begin_array();
        a2.add_number(2.0);
        a2.end_array();

        assert!(a1.finish() < a2.finish());
    }

    #[test]
    fn test_read_int_rejects_non_integer() {
        let enc = encode_num(1.5);
        let mut r = CollatableReader::new(&enc);
        assert!(r.read_int().is_err());
    }

    #[test]
    fn test_truncated_data_is_corrupt_error() {
        let mut r = CollatableReader::new(&[Tag::String as u8, b'h', b'i']); // no terminator
        assert!(r.read_string().is_err());

        let mut r2 = CollatableReader::new(&[]);
        assert!(r2.read_double().is_err());
    }

    #[test]
    fn test_read_raw_skips_without_decoding() {
        let mut b = CollatableBuilder::new();
        b.begin_array();
        b.add_number(42.0);
        b.end_array();
        b.add_string("after");
        let enc = b.finish();
        let mut r = CollatableReader::new(&enc);
        let raw = r.read_raw().unwrap().to_vec();
        assert_eq!(r.read_string().unwrap(), "after");

        let mut r2 = CollatableReader::new(&raw);
        r2.begin_array().unwrap();
        assert_eq!(r2.read_int().unwrap(), 42);
        r2.end_array().unwrap();
    }
}
