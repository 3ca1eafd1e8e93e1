//! PackStream decoder.
//!
//! A streaming cursor over a byte slice that yields one value per call.
//! Integers of every wire width widen to `i64`; floats are always 64-bit.
//! Malformed markers and truncated input are protocol errors; translating
//! structures into domain entities is left to the hydrator.

use bytes::Buf;
use std::collections::HashMap;

use super::marker::*;
use super::types::{PackStreamStructure, PackStreamValue};
use super::PackStreamError;

/// Streaming PackStream decoder.
pub struct PackStreamDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PackStreamDecoder<'a> {
    /// Create a decoder over the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to decode.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Whether the cursor has consumed all input.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> Result<PackStreamValue, PackStreamError> {
        let marker = self.read_u8()?;
        match marker {
            // Tiny ints encode the value in the marker byte itself.
            0x00..=0x7F | 0xF0..=0xFF => Ok(PackStreamValue::Integer(marker as i8 as i64)),
            0x80..=0x8F => self.read_string((marker & 0x0F) as usize),
            0x90..=0x9F => self.read_list((marker & 0x0F) as usize),
            0xA0..=0xAF => self.read_map((marker & 0x0F) as usize),
            0xB0..=0xBF => self.read_structure((marker & 0x0F) as usize),

            NULL => Ok(PackStreamValue::Null),
            TRUE => Ok(PackStreamValue::Boolean(true)),
            FALSE => Ok(PackStreamValue::Boolean(false)),
            FLOAT_64 => Ok(PackStreamValue::Float(self.read_f64()?)),

            INT_8 => Ok(PackStreamValue::Integer(self.read_u8()? as i8 as i64)),
            INT_16 => Ok(PackStreamValue::Integer(self.read_i16()? as i64)),
            INT_32 => Ok(PackStreamValue::Integer(self.read_i32()? as i64)),
            INT_64 => Ok(PackStreamValue::Integer(self.read_i64()?)),

            BYTES_8 => {
                let len = self.read_u8()? as usize;
                self.read_byte_array(len)
            }
            BYTES_16 => {
                let len = self.read_u16()? as usize;
                self.read_byte_array(len)
            }
            BYTES_32 => {
                let len = self.read_u32()? as usize;
                self.read_byte_array(len)
            }

            STRING_8 => {
                let len = self.read_u8()? as usize;
                self.read_string(len)
            }
            STRING_16 => {
                let len = self.read_u16()? as usize;
                self.read_string(len)
            }
            STRING_32 => {
                let len = self.read_u32()? as usize;
                self.read_string(len)
            }

            LIST_8 => {
                let len = self.read_u8()? as usize;
                self.read_list(len)
            }
            LIST_16 => {
                let len = self.read_u16()? as usize;
                self.read_list(len)
            }
            LIST_32 => {
                let len = self.read_u32()? as usize;
                self.read_list(len)
            }

            MAP_8 => {
                let len = self.read_u8()? as usize;
                self.read_map(len)
            }
            MAP_16 => {
                let len = self.read_u16()? as usize;
                self.read_map(len)
            }
            MAP_32 => {
                let len = self.read_u32()? as usize;
                self.read_map(len)
            }

            _ => Err(PackStreamError::UnknownMarker(marker)),
        }
    }

    fn read_byte_array(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Bytes(self.read_raw(len)?.to_vec()))
    }

    fn read_string(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let raw = self.read_raw(len)?;
        let s = std::str::from_utf8(raw).map_err(|e| PackStreamError::InvalidUtf8(e.to_string()))?;
        Ok(PackStreamValue::String(s.to_string()))
    }

    fn read_list(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(self.decode()?);
        }
        Ok(PackStreamValue::List(items))
    }

    fn read_map(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let mut map = HashMap::with_capacity(len.min(1024));
        for _ in 0..len {
            let key = match self.decode()? {
                PackStreamValue::String(s) => s,
                _ => return Err(PackStreamError::InvalidMapKey),
            };
            let value = self.decode()?;
            // Repeated keys: last write wins.
            map.insert(key, value);
        }
        Ok(PackStreamValue::Map(map))
    }

    fn read_structure(&mut self, fields: usize) -> Result<PackStreamValue, PackStreamError> {
        let tag = self.read_u8()?;
        let mut values = Vec::with_capacity(fields);
        for _ in 0..fields {
            values.push(self.decode()?);
        }
        Ok(PackStreamValue::Structure(PackStreamStructure::new(
            tag, values,
        )))
    }

    fn read_u8(&mut self) -> Result<u8, PackStreamError> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or(PackStreamError::UnexpectedEof)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_u16(&mut self) -> Result<u16, PackStreamError> {
        let raw = self.read_raw(2)?;
        Ok(u16::from_be_bytes([raw[0], raw[1]]))
    }

    fn read_i16(&mut self) -> Result<i16, PackStreamError> {
        Ok(self.read_u16()? as i16)
    }

    fn read_u32(&mut self) -> Result<u32, PackStreamError> {
        let mut raw = self.read_raw(4)?;
        Ok(raw.get_u32())
    }

    fn read_i32(&mut self) -> Result<i32, PackStreamError> {
        let mut raw = self.read_raw(4)?;
        Ok(raw.get_i32())
    }

    fn read_i64(&mut self) -> Result<i64, PackStreamError> {
        let mut raw = self.read_raw(8)?;
        Ok(raw.get_i64())
    }

    fn read_f64(&mut self) -> Result<f64, PackStreamError> {
        let mut raw = self.read_raw(8)?;
        Ok(raw.get_f64())
    }

    fn read_raw(&mut self, len: usize) -> Result<&'a [u8], PackStreamError> {
        if self.remaining() < len {
            return Err(PackStreamError::UnexpectedEof);
        }
        let raw = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(raw)
    }
}

/// Decode a single value from a byte slice.
pub fn decode(data: &[u8]) -> Result<PackStreamValue, PackStreamError> {
    PackStreamDecoder::new(data).decode()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_bool() {
        assert!(decode(&[0xC0]).unwrap().is_null());
        assert_eq!(decode(&[0xC3]).unwrap(), PackStreamValue::Boolean(true));
        assert_eq!(decode(&[0xC2]).unwrap(), PackStreamValue::Boolean(false));
    }

    #[test]
    fn tiny_ints() {
        assert_eq!(decode(&[0x00]).unwrap(), PackStreamValue::Integer(0));
        assert_eq!(decode(&[0x7F]).unwrap(), PackStreamValue::Integer(127));
        assert_eq!(decode(&[0xF0]).unwrap(), PackStreamValue::Integer(-16));
        assert_eq!(decode(&[0xFF]).unwrap(), PackStreamValue::Integer(-1));
    }

    #[test]
    fn sized_ints_widen_to_i64() {
        assert_eq!(decode(&[0xC8, 0xEF]).unwrap(), PackStreamValue::Integer(-17));
        assert_eq!(
            decode(&[0xC9, 0x03, 0xE8]).unwrap(),
            PackStreamValue::Integer(1000)
        );
        assert_eq!(
            decode(&[0xCA, 0x00, 0x01, 0x86, 0xA0]).unwrap(),
            PackStreamValue::Integer(100_000)
        );
        assert_eq!(
            decode(&[0xCB, 0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap(),
            PackStreamValue::Integer(i64::MAX)
        );
    }

    #[test]
    fn float() {
        let data = [0xC1, 0x40, 0x09, 0x1E, 0xB8, 0x51, 0xEB, 0x85, 0x1F];
        match decode(&data).unwrap() {
            PackStreamValue::Float(f) => assert!((f - 3.14).abs() < 1e-9),
            other => panic!("expected float, got {:?}", other),
        }
    }

    #[test]
    fn strings() {
        assert_eq!(
            decode(&[0x80]).unwrap(),
            PackStreamValue::String(String::new())
        );
        assert_eq!(
            decode(&[0x85, b'h', b'e', b'l', b'l', b'o']).unwrap(),
            PackStreamValue::String("hello".into())
        );

        let mut data = vec![0xD0, 20];
        data.extend_from_slice(&[b'a'; 20]);
        assert_eq!(
            decode(&data).unwrap(),
            PackStreamValue::String("a".repeat(20))
        );
    }

    #[test]
    fn byte_arrays() {
        assert_eq!(
            decode(&[0xCC, 0x03, 1, 2, 3]).unwrap(),
            PackStreamValue::Bytes(vec![1, 2, 3])
        );
    }

    #[test]
    fn lists() {
        assert_eq!(decode(&[0x90]).unwrap(), PackStreamValue::List(vec![]));
        assert_eq!(
            decode(&[0x93, 1, 2, 3]).unwrap(),
            PackStreamValue::List(vec![
                PackStreamValue::Integer(1),
                PackStreamValue::Integer(2),
                PackStreamValue::Integer(3),
            ])
        );
    }

    #[test]
    fn maps() {
        let value = decode(&[0xA1, 0x81, b'a', 0x01]).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a"), Some(&PackStreamValue::Integer(1)));
    }

    #[test]
    fn map_repeated_keys_last_write_wins() {
        // {"k": 1, "k": 2} encoded with both entries present
        let data = [0xA2, 0x81, b'k', 0x01, 0x81, b'k', 0x02];
        let value = decode(&data).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("k"), Some(&PackStreamValue::Integer(2)));
    }

    #[test]
    fn map_key_must_be_string() {
        let data = [0xA1, 0x01, 0x02];
        assert!(matches!(
            decode(&data).unwrap_err(),
            PackStreamError::InvalidMapKey
        ));
    }

    #[test]
    fn structures() {
        let value = decode(&[0xB1, 0x4E, 0x01]).unwrap();
        let s = value.as_structure().unwrap();
        assert_eq!(s.tag, 0x4E);
        assert_eq!(s.fields, vec![PackStreamValue::Integer(1)]);
    }

    #[test]
    fn truncated_input() {
        assert!(matches!(
            decode(&[0xC9]).unwrap_err(),
            PackStreamError::UnexpectedEof
        ));
        assert!(matches!(
            decode(&[0x85, b'h', b'i']).unwrap_err(),
            PackStreamError::UnexpectedEof
        ));
    }

    #[test]
    fn invalid_utf8() {
        assert!(matches!(
            decode(&[0x82, 0xFF, 0xFE]).unwrap_err(),
            PackStreamError::InvalidUtf8(_)
        ));
    }

    #[test]
    fn unknown_marker() {
        // 0xDC is a struct8 marker in other formats; not part of this grammar
        assert!(matches!(
            decode(&[0xC7]).unwrap_err(),
            PackStreamError::UnknownMarker(0xC7)
        ));
    }

    #[test]
    fn nested() {
        let data = [0x91, 0xA1, 0x81, b'x', 0x05];
        let value = decode(&data).unwrap();
        let list = value.as_list().unwrap();
        let map = list[0].as_map().unwrap();
        assert_eq!(map.get("x"), Some(&PackStreamValue::Integer(5)));
    }

    #[test]
    fn cursor_advances() {
        let data = [0x01, 0x02];
        let mut dec = PackStreamDecoder::new(&data);
        assert_eq!(dec.remaining(), 2);
        dec.decode().unwrap();
        assert_eq!(dec.position(), 1);
        dec.decode().unwrap();
        assert!(dec.is_exhausted());
    }
}
