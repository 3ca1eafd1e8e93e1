//! PackStream serialization format.
//!
//! PackStream is the tagged, self-describing binary value format that the
//! Bolt protocol carries. The grammar is small: null, booleans, 64-bit
//! integers (variable width on the wire), 64-bit floats, UTF-8 strings,
//! byte arrays, lists, maps with string keys, and tagged structures of up
//! to 15 fields.
//!
//! The encoder and decoder here deal only in that grammar. Structures are
//! passed through as `(tag, fields)`; the hydrator decides what a tag
//! means for the negotiated protocol version.

pub mod decoder;
pub mod encoder;
pub mod marker;
pub mod types;

pub use decoder::{decode, PackStreamDecoder};
pub use encoder::{encode, PackStreamEncoder};
pub use types::{PackStreamStructure, PackStreamValue};

use std::fmt;

/// PackStream serialization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackStreamError {
    /// Input ended inside a value
    UnexpectedEof,
    /// Marker byte outside the grammar
    UnknownMarker(u8),
    /// String bytes were not valid UTF-8
    InvalidUtf8(String),
    /// Map key was not a string
    InvalidMapKey,
    /// Value exceeds the largest encodable size
    ValueTooLarge(&'static str, usize),
}

impl fmt::Display for PackStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackStreamError::UnexpectedEof => write!(f, "Unexpected end of PackStream data"),
            PackStreamError::UnknownMarker(m) => {
                write!(f, "Unknown PackStream marker: 0x{:02X}", m)
            }
            PackStreamError::InvalidUtf8(e) => write!(f, "Invalid UTF-8 in string: {}", e),
            PackStreamError::InvalidMapKey => write!(f, "Map keys must be strings"),
            PackStreamError::ValueTooLarge(what, size) => {
                write!(f, "{} too large: {} bytes", what, size)
            }
        }
    }
}

impl std::error::Error for PackStreamError {}
