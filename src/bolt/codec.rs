//! Chunked message framing.
//!
//! A Bolt message is a concatenation of chunks, each prefixed with a
//! big-endian `u16` payload length, terminated by a zero-length chunk.
//! Only one message is in flight per direction; there is no multiplexing.
//!
//! The codec plugs into `tokio_util`'s [`Decoder`]/[`Encoder`] machinery.
//! Decoding yields one raw [`PackStreamValue`] per complete message;
//! encoding takes a request structure through the outgoing buffer and
//! splits it into chunks.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::error::BoltError;
use super::packstream::{decode, PackStreamEncoder, PackStreamStructure, PackStreamValue};

/// Largest chunk payload the framing allows (`u16` length prefix).
pub const MAX_CHUNK_PAYLOAD: usize = 0xFFFF;

/// Zero-length chunk marking the end of a message.
pub const MESSAGE_END: [u8; 2] = [0x00, 0x00];

/// Default cap on a reassembled message.
const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Chunking codec for Bolt messages.
#[derive(Debug)]
pub struct BoltCodec {
    /// Upper bound on a reassembled message body
    max_message_size: usize,
    /// Accumulates chunk payloads until the zero chunk arrives
    message: BytesMut,
}

impl BoltCodec {
    /// Create a codec with the default message size cap.
    pub fn new() -> Self {
        Self::with_max_message_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create a codec with a custom message size cap.
    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            message: BytesMut::with_capacity(4096),
        }
    }

    /// Split a message body into chunks and append them to `dst`,
    /// including the terminating zero chunk.
    fn write_chunked(&self, body: &[u8], dst: &mut BytesMut) {
        dst.reserve(body.len() + (body.len() / MAX_CHUNK_PAYLOAD + 1) * 2 + 2);
        for chunk in body.chunks(MAX_CHUNK_PAYLOAD) {
            dst.put_u16(chunk.len() as u16);
            dst.put_slice(chunk);
        }
        dst.put_slice(&MESSAGE_END);
    }
}

impl Default for BoltCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for BoltCodec {
    type Item = PackStreamValue;
    type Error = BoltError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < 2 {
                return Ok(None);
            }

            let payload_len = u16::from_be_bytes([src[0], src[1]]) as usize;

            if payload_len == 0 {
                src.advance(2);
                if self.message.is_empty() {
                    // A bare zero chunk is a NOOP keepalive; skip it.
                    continue;
                }
                let body = self.message.split();
                let value = decode(&body).map_err(BoltError::PackStream)?;
                return Ok(Some(value));
            }

            if src.len() < 2 + payload_len {
                return Ok(None);
            }

            if self.message.len() + payload_len > self.max_message_size {
                return Err(BoltError::MessageTooLarge {
                    size: self.message.len() + payload_len,
                    max: self.max_message_size,
                });
            }

            src.advance(2);
            self.message.extend_from_slice(&src[..payload_len]);
            src.advance(payload_len);
        }
    }
}

impl Encoder<&PackStreamStructure> for BoltCodec {
    type Error = BoltError;

    fn encode(
        &mut self,
        item: &PackStreamStructure,
        dst: &mut BytesMut,
    ) -> Result<(), Self::Error> {
        let mut outgoing = Outgoing::new();
        outgoing.append(item)?;
        outgoing.chunk_into(self, dst);
        Ok(())
    }
}

/// Outgoing message buffer.
///
/// Assembles a structure header plus fields with the PackStream encoder,
/// then hands the finished body to the chunker.
pub struct Outgoing {
    encoder: PackStreamEncoder,
}

impl Outgoing {
    /// Create an empty outgoing buffer.
    pub fn new() -> Self {
        Self {
            encoder: PackStreamEncoder::new(),
        }
    }

    /// Append a message structure to the buffer.
    pub fn append(&mut self, message: &PackStreamStructure) -> Result<(), BoltError> {
        self.encoder
            .encode_struct_header(message.tag, message.fields.len())
            .map_err(BoltError::PackStream)?;
        for field in &message.fields {
            self.encoder.encode(field).map_err(BoltError::PackStream)?;
        }
        Ok(())
    }

    /// Current body size in bytes.
    pub fn len(&self) -> usize {
        self.encoder.len()
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty()
    }

    /// Emit the buffered body as chunks into `dst` and reset the buffer.
    pub fn chunk_into(&mut self, codec: &BoltCodec, dst: &mut BytesMut) {
        codec.write_chunked(self.encoder.as_bytes(), dst);
        self.encoder.clear();
    }
}

impl Default for Outgoing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::packstream::encode;

    fn chunk_message(body: &[u8]) -> BytesMut {
        let codec = BoltCodec::new();
        let mut dst = BytesMut::new();
        codec.write_chunked(body, &mut dst);
        dst
    }

    #[test]
    fn roundtrip_small_message() {
        let mut codec = BoltCodec::new();
        let value = PackStreamValue::String("Hello, Bolt!".into());
        let mut buf = chunk_message(&encode(&value).unwrap());

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, value);
        assert!(buf.is_empty());
    }

    #[test]
    fn roundtrip_message_larger_than_one_chunk() {
        let mut codec = BoltCodec::new();
        let value = PackStreamValue::String("x".repeat(MAX_CHUNK_PAYLOAD * 2 + 100));
        let mut buf = chunk_message(&encode(&value).unwrap());

        // Body needs at least three chunks plus the terminator.
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn dechunk_is_split_agnostic() {
        // The same body cut into arbitrary chunk sizes reassembles equally.
        let value = PackStreamValue::String("abcdefghij".into());
        let body = encode(&value).unwrap();

        let mut buf = BytesMut::new();
        for chunk in body.chunks(3) {
            buf.put_u16(chunk.len() as u16);
            buf.put_slice(chunk);
        }
        buf.put_slice(&MESSAGE_END);

        let mut codec = BoltCodec::new();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn partial_input_yields_none() {
        let mut codec = BoltCodec::new();
        let full = chunk_message(&encode(&PackStreamValue::Integer(42)).unwrap());

        for cut in 1..full.len() {
            let mut partial = BytesMut::from(&full[..cut]);
            assert!(codec.decode(&mut partial).unwrap().is_none(), "cut at {}", cut);
            // Drop partial state so the next iteration starts clean.
            codec.message.clear();
        }

        let mut complete = full;
        let decoded = codec.decode(&mut complete).unwrap().unwrap();
        assert_eq!(decoded.as_int(), Some(42));
    }

    #[test]
    fn noop_chunks_are_skipped() {
        let mut codec = BoltCodec::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&MESSAGE_END);
        buf.put_slice(&MESSAGE_END);
        buf.extend_from_slice(&chunk_message(&encode(&PackStreamValue::Boolean(true)).unwrap()));

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.as_bool(), Some(true));
    }

    #[test]
    fn multiple_messages_in_one_buffer() {
        let mut codec = BoltCodec::new();
        let mut buf = BytesMut::new();
        for i in 1..=3 {
            buf.extend_from_slice(&chunk_message(&encode(&PackStreamValue::Integer(i)).unwrap()));
        }

        for i in 1..=3 {
            let decoded = codec.decode(&mut buf).unwrap().unwrap();
            assert_eq!(decoded.as_int(), Some(i));
        }
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn message_size_cap() {
        let mut codec = BoltCodec::with_max_message_size(100);
        let mut buf = BytesMut::new();
        buf.put_u16(200);
        buf.extend_from_slice(&[0u8; 200]);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(BoltError::MessageTooLarge { size: 200, max: 100 })
        ));
    }

    #[test]
    fn encoder_emits_header_fields_and_terminator() {
        let mut codec = BoltCodec::new();
        let mut buf = BytesMut::new();
        let structure = PackStreamStructure::new(0x0F, vec![]);
        codec.encode(&structure, &mut buf).unwrap();

        // 2-byte length, B0 0F body, zero chunk
        assert_eq!(&buf[..], &[0x00, 0x02, 0xB0, 0x0F, 0x00, 0x00]);
    }

    #[test]
    fn outgoing_buffer_assembles_structure() {
        let mut outgoing = Outgoing::new();
        assert!(outgoing.is_empty());

        let structure = PackStreamStructure::new(0x10, vec![PackStreamValue::String("Q".into())]);
        outgoing.append(&structure).unwrap();
        assert_eq!(outgoing.len(), 4); // B1 10 81 'Q'

        let codec = BoltCodec::new();
        let mut dst = BytesMut::new();
        outgoing.chunk_into(&codec, &mut dst);
        assert_eq!(&dst[..], &[0x00, 0x04, 0xB1, 0x10, 0x81, b'Q', 0x00, 0x00]);
        assert!(outgoing.is_empty());
    }
}
