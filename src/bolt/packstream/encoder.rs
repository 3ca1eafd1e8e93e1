//! PackStream encoder.
//!
//! Writes values with length-minimal markers: integers pick the narrowest
//! wire width, sized values pick the smallest length prefix. All multi-byte
//! quantities are big-endian.

use bytes::{BufMut, BytesMut};
use std::collections::HashMap;

use super::marker::*;
use super::types::{PackStreamStructure, PackStreamValue};
use super::PackStreamError;

/// Streaming PackStream encoder over a growable byte buffer.
pub struct PackStreamEncoder {
    buffer: BytesMut,
}

impl PackStreamEncoder {
    /// Create an encoder with a default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create an encoder with a specific initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Reset the buffer for reuse.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// View the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the encoder, returning the encoded bytes.
    pub fn into_bytes(self) -> BytesMut {
        self.buffer
    }

    /// Encode any value.
    pub fn encode(&mut self, value: &PackStreamValue) -> Result<(), PackStreamError> {
        match value {
            PackStreamValue::Null => {
                self.encode_null();
                Ok(())
            }
            PackStreamValue::Boolean(b) => {
                self.encode_bool(*b);
                Ok(())
            }
            PackStreamValue::Integer(i) => {
                self.encode_int(*i);
                Ok(())
            }
            PackStreamValue::Float(f) => {
                self.encode_float(*f);
                Ok(())
            }
            PackStreamValue::Bytes(b) => self.encode_bytes(b),
            PackStreamValue::String(s) => self.encode_string(s),
            PackStreamValue::List(l) => self.encode_list(l),
            PackStreamValue::Map(m) => self.encode_map(m),
            PackStreamValue::Structure(s) => self.encode_structure(s),
        }
    }

    /// Encode null.
    pub fn encode_null(&mut self) {
        self.buffer.put_u8(NULL);
    }

    /// Encode a boolean.
    pub fn encode_bool(&mut self, value: bool) {
        self.buffer.put_u8(if value { TRUE } else { FALSE });
    }

    /// Encode an integer with the narrowest representation.
    pub fn encode_int(&mut self, value: i64) {
        if fits_tiny_int(value) {
            self.buffer.put_u8(value as u8);
        } else if i8::try_from(value).is_ok() {
            self.buffer.put_u8(INT_8);
            self.buffer.put_i8(value as i8);
        } else if i16::try_from(value).is_ok() {
            self.buffer.put_u8(INT_16);
            self.buffer.put_i16(value as i16);
        } else if i32::try_from(value).is_ok() {
            self.buffer.put_u8(INT_32);
            self.buffer.put_i32(value as i32);
        } else {
            self.buffer.put_u8(INT_64);
            self.buffer.put_i64(value);
        }
    }

    /// Encode a float. Always 64-bit.
    pub fn encode_float(&mut self, value: f64) {
        self.buffer.put_u8(FLOAT_64);
        self.buffer.put_f64(value);
    }

    /// Encode a byte array.
    pub fn encode_bytes(&mut self, value: &[u8]) -> Result<(), PackStreamError> {
        let len = value.len();
        if len <= u8::MAX as usize {
            self.buffer.put_u8(BYTES_8);
            self.buffer.put_u8(len as u8);
        } else if len <= u16::MAX as usize {
            self.buffer.put_u8(BYTES_16);
            self.buffer.put_u16(len as u16);
        } else if len <= u32::MAX as usize {
            self.buffer.put_u8(BYTES_32);
            self.buffer.put_u32(len as u32);
        } else {
            return Err(PackStreamError::ValueTooLarge("bytes", len));
        }
        self.buffer.put_slice(value);
        Ok(())
    }

    /// Encode a UTF-8 string.
    pub fn encode_string(&mut self, value: &str) -> Result<(), PackStreamError> {
        let bytes = value.as_bytes();
        let len = bytes.len();
        if len <= TINY_SIZE_MAX {
            self.buffer.put_u8(TINY_STRING | len as u8);
        } else if len <= u8::MAX as usize {
            self.buffer.put_u8(STRING_8);
            self.buffer.put_u8(len as u8);
        } else if len <= u16::MAX as usize {
            self.buffer.put_u8(STRING_16);
            self.buffer.put_u16(len as u16);
        } else if len <= u32::MAX as usize {
            self.buffer.put_u8(STRING_32);
            self.buffer.put_u32(len as u32);
        } else {
            return Err(PackStreamError::ValueTooLarge("string", len));
        }
        self.buffer.put_slice(bytes);
        Ok(())
    }

    /// Encode a list header followed by each item.
    pub fn encode_list(&mut self, items: &[PackStreamValue]) -> Result<(), PackStreamError> {
        self.encode_list_header(items.len())?;
        for item in items {
            self.encode(item)?;
        }
        Ok(())
    }

    /// Encode only a list header. The caller supplies the items afterwards.
    pub fn encode_list_header(&mut self, len: usize) -> Result<(), PackStreamError> {
        if len <= TINY_SIZE_MAX {
            self.buffer.put_u8(TINY_LIST | len as u8);
        } else if len <= u8::MAX as usize {
            self.buffer.put_u8(LIST_8);
            self.buffer.put_u8(len as u8);
        } else if len <= u16::MAX as usize {
            self.buffer.put_u8(LIST_16);
            self.buffer.put_u16(len as u16);
        } else if len <= u32::MAX as usize {
            self.buffer.put_u8(LIST_32);
            self.buffer.put_u32(len as u32);
        } else {
            return Err(PackStreamError::ValueTooLarge("list", len));
        }
        Ok(())
    }

    /// Encode a map as key-value pairs. Duplicate keys cannot occur here
    /// since the source is a `HashMap`; on decode the last write wins.
    pub fn encode_map(
        &mut self,
        map: &HashMap<String, PackStreamValue>,
    ) -> Result<(), PackStreamError> {
        self.encode_map_header(map.len())?;
        for (key, value) in map {
            self.encode_string(key)?;
            self.encode(value)?;
        }
        Ok(())
    }

    /// Encode only a map header.
    pub fn encode_map_header(&mut self, len: usize) -> Result<(), PackStreamError> {
        if len <= TINY_SIZE_MAX {
            self.buffer.put_u8(TINY_MAP | len as u8);
        } else if len <= u8::MAX as usize {
            self.buffer.put_u8(MAP_8);
            self.buffer.put_u8(len as u8);
        } else if len <= u16::MAX as usize {
            self.buffer.put_u8(MAP_16);
            self.buffer.put_u16(len as u16);
        } else if len <= u32::MAX as usize {
            self.buffer.put_u8(MAP_32);
            self.buffer.put_u32(len as u32);
        } else {
            return Err(PackStreamError::ValueTooLarge("map", len));
        }
        Ok(())
    }

    /// Encode a structure: `B<n> <tag>` then the fields.
    pub fn encode_structure(&mut self, s: &PackStreamStructure) -> Result<(), PackStreamError> {
        self.encode_struct_header(s.tag, s.fields.len())?;
        for field in &s.fields {
            self.encode(field)?;
        }
        Ok(())
    }

    /// Encode only a structure header.
    pub fn encode_struct_header(&mut self, tag: u8, fields: usize) -> Result<(), PackStreamError> {
        if fields > TINY_SIZE_MAX {
            return Err(PackStreamError::ValueTooLarge("structure fields", fields));
        }
        self.buffer.put_u8(TINY_STRUCT | fields as u8);
        self.buffer.put_u8(tag);
        Ok(())
    }
}

impl Default for PackStreamEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a single value to a fresh buffer.
pub fn encode(value: &PackStreamValue) -> Result<BytesMut, PackStreamError> {
    let mut encoder = PackStreamEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_bool() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_null();
        enc.encode_bool(true);
        enc.encode_bool(false);
        assert_eq!(enc.as_bytes(), &[0xC0, 0xC3, 0xC2]);
    }

    #[test]
    fn tiny_ints() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_int(0);
        enc.encode_int(127);
        enc.encode_int(-16);
        enc.encode_int(-1);
        assert_eq!(enc.as_bytes(), &[0x00, 0x7F, 0xF0, 0xFF]);
    }

    #[test]
    fn widening_ints() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_int(-17);
        assert_eq!(enc.as_bytes(), &[0xC8, 0xEF]);

        enc.clear();
        enc.encode_int(1000);
        assert_eq!(enc.as_bytes(), &[0xC9, 0x03, 0xE8]);

        enc.clear();
        enc.encode_int(100_000);
        assert_eq!(enc.as_bytes(), &[0xCA, 0x00, 0x01, 0x86, 0xA0]);

        enc.clear();
        enc.encode_int(i64::MAX);
        assert_eq!(enc.as_bytes()[0], 0xCB);
        assert_eq!(enc.len(), 9);
    }

    #[test]
    fn float_is_nine_bytes() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_float(3.14);
        assert_eq!(enc.as_bytes()[0], 0xC1);
        assert_eq!(enc.len(), 9);
    }

    #[test]
    fn strings() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_string("").unwrap();
        assert_eq!(enc.as_bytes(), &[0x80]);

        enc.clear();
        enc.encode_string("hello").unwrap();
        assert_eq!(enc.as_bytes()[0], 0x85);
        assert_eq!(&enc.as_bytes()[1..], b"hello");

        enc.clear();
        let long = "a".repeat(20);
        enc.encode_string(&long).unwrap();
        assert_eq!(&enc.as_bytes()[..2], &[0xD0, 20]);

        enc.clear();
        let longer = "b".repeat(300);
        enc.encode_string(&longer).unwrap();
        assert_eq!(&enc.as_bytes()[..3], &[0xD1, 0x01, 0x2C]);
    }

    #[test]
    fn bytes_use_explicit_length() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_bytes(&[1, 2, 3]).unwrap();
        assert_eq!(enc.as_bytes(), &[0xCC, 0x03, 1, 2, 3]);
    }

    #[test]
    fn lists_and_maps() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_list(&[]).unwrap();
        assert_eq!(enc.as_bytes(), &[0x90]);

        enc.clear();
        enc.encode_list(&[
            PackStreamValue::Integer(1),
            PackStreamValue::Integer(2),
            PackStreamValue::Integer(3),
        ])
        .unwrap();
        assert_eq!(enc.as_bytes(), &[0x93, 1, 2, 3]);

        enc.clear();
        let mut map = HashMap::new();
        map.insert("a".to_string(), PackStreamValue::Integer(1));
        enc.encode_map(&map).unwrap();
        assert_eq!(enc.as_bytes(), &[0xA1, 0x81, b'a', 0x01]);
    }

    #[test]
    fn big_list_header() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_list_header(16).unwrap();
        assert_eq!(enc.as_bytes(), &[0xD4, 16]);

        enc.clear();
        enc.encode_list_header(70_000).unwrap();
        assert_eq!(enc.as_bytes(), &[0xD6, 0x00, 0x01, 0x11, 0x70]);
    }

    #[test]
    fn structures() {
        let s = PackStreamStructure::new(0x4E, vec![PackStreamValue::Integer(1)]);
        let mut enc = PackStreamEncoder::new();
        enc.encode_structure(&s).unwrap();
        assert_eq!(enc.as_bytes(), &[0xB1, 0x4E, 0x01]);
    }

    #[test]
    fn structure_field_overflow() {
        let fields = vec![PackStreamValue::Null; 16];
        let s = PackStreamStructure::new(0x01, fields);
        let mut enc = PackStreamEncoder::new();
        let err = enc.encode_structure(&s).unwrap_err();
        assert!(matches!(err, PackStreamError::ValueTooLarge("structure fields", 16)));
    }

    #[test]
    fn nested_value() {
        let mut inner = HashMap::new();
        inner.insert("x".to_string(), PackStreamValue::Integer(1));
        let value = PackStreamValue::List(vec![PackStreamValue::Map(inner)]);
        let bytes = encode(&value).unwrap();
        assert_eq!(bytes[0], 0x91);
        assert_eq!(bytes[1], 0xA1);
    }
}
