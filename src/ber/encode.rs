//! BER encoding.
//!
//! Content is pushed in reverse: callers emit the last field of a structure
//! first, and the constructed helpers prepend the header once the content
//! length is known.

use super::length::encode_length;
use super::tag;
use crate::oid::Oid;
use bytes::Bytes;

/// Reverse-order encode buffer.
#[derive(Debug, Default)]
pub struct EncodeBuf {
    // Stored back to front; `finish` flips it.
    buf: Vec<u8>,
}

impl EncodeBuf {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer with reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Prepend a single byte.
    pub fn push_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Prepend raw bytes.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buf.extend(data.iter().rev());
    }

    /// Prepend a tag octet.
    pub fn push_tag(&mut self, tag: u8) {
        self.push_byte(tag);
    }

    /// Prepend length octets.
    pub fn push_length(&mut self, len: usize) {
        let (octets, n) = encode_length(len);
        self.buf.extend_from_slice(&octets[..n]);
    }

    /// Prepend a constructed TLV whose content is written by `f`.
    pub fn push_constructed(&mut self, tag: u8, f: impl FnOnce(&mut Self)) {
        let start = self.len();
        f(self);
        let content_len = self.len() - start;
        self.push_length(content_len);
        self.push_tag(tag);
    }

    /// Prepend a SEQUENCE whose content is written by `f`.
    pub fn push_sequence(&mut self, f: impl FnOnce(&mut Self)) {
        self.push_constructed(tag::universal::SEQUENCE, f);
    }

    /// Prepend a signed INTEGER in minimal two's complement form.
    pub fn push_integer(&mut self, value: i32) {
        self.push_signed(tag::universal::INTEGER, value);
    }

    fn push_signed(&mut self, tag: u8, value: i32) {
        let bytes = value.to_be_bytes();
        let mut start = 0;
        // Drop leading octets that only repeat the sign bit.
        while start < 3 {
            let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
                || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
            if !redundant {
                break;
            }
            start += 1;
        }
        self.push_primitive(tag, &bytes[start..]);
    }

    /// Prepend an unsigned 32-bit application value (Counter32, Gauge32, TimeTicks).
    pub fn push_unsigned32(&mut self, tag: u8, value: u32) {
        self.push_unsigned(tag, u64::from(value));
    }

    /// Prepend a Counter64.
    pub fn push_counter64(&mut self, value: u64) {
        self.push_unsigned(tag::application::COUNTER64, value);
    }

    fn push_unsigned(&mut self, tag: u8, value: u64) {
        let bytes = value.to_be_bytes();
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(7);
        let start = first.min(7);
        if bytes[start] & 0x80 != 0 {
            // Leading zero keeps the value positive.
            let mut padded = [0u8; 9];
            padded[1..].copy_from_slice(&bytes);
            self.push_primitive(tag, &padded[start..]);
        } else {
            self.push_primitive(tag, &bytes[start..]);
        }
    }

    /// Prepend an OCTET STRING.
    pub fn push_octet_string(&mut self, data: &[u8]) {
        self.push_primitive(tag::universal::OCTET_STRING, data);
    }

    /// Prepend a NULL.
    pub fn push_null(&mut self) {
        self.push_length(0);
        self.push_tag(tag::universal::NULL);
    }

    /// Prepend an OBJECT IDENTIFIER.
    pub fn push_oid(&mut self, oid: &Oid) {
        self.push_primitive(tag::universal::OBJECT_IDENTIFIER, &oid.to_ber());
    }

    /// Prepend an IpAddress.
    pub fn push_ip_address(&mut self, addr: [u8; 4]) {
        self.push_primitive(tag::application::IP_ADDRESS, &addr);
    }

    /// Prepend an arbitrary primitive TLV.
    pub fn push_primitive(&mut self, tag: u8, content: &[u8]) {
        self.push_bytes(content);
        self.push_length(content.len());
        self.push_tag(tag);
    }

    /// Consume the buffer and return the encoded bytes in wire order.
    pub fn finish(mut self) -> Bytes {
        self.buf.reverse();
        Bytes::from(self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn encoded(f: impl FnOnce(&mut EncodeBuf)) -> Vec<u8> {
        let mut buf = EncodeBuf::new();
        f(&mut buf);
        buf.finish().to_vec()
    }

    #[test]
    fn integers_are_minimal() {
        assert_eq!(encoded(|b| b.push_integer(0)), [0x02, 0x01, 0x00]);
        assert_eq!(encoded(|b| b.push_integer(127)), [0x02, 0x01, 0x7F]);
        assert_eq!(encoded(|b| b.push_integer(128)), [0x02, 0x02, 0x00, 0x80]);
        assert_eq!(encoded(|b| b.push_integer(-1)), [0x02, 0x01, 0xFF]);
        assert_eq!(encoded(|b| b.push_integer(-129)), [0x02, 0x02, 0xFF, 0x7F]);
        assert_eq!(
            encoded(|b| b.push_integer(i32::MIN)),
            [0x02, 0x04, 0x80, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn unsigned_gets_leading_zero() {
        assert_eq!(
            encoded(|b| b.push_unsigned32(tag::application::TIMETICKS, 0)),
            [0x43, 0x01, 0x00]
        );
        assert_eq!(
            encoded(|b| b.push_unsigned32(tag::application::GAUGE32, 0xFF)),
            [0x42, 0x02, 0x00, 0xFF]
        );
        assert_eq!(
            encoded(|b| b.push_counter64(u64::MAX)),
            [0x46, 0x09, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn sequence_wraps_content() {
        let bytes = encoded(|b| {
            b.push_sequence(|b| {
                b.push_null();
                b.push_oid(&oid!(1, 3, 6, 1));
            })
        });
        assert_eq!(bytes, [0x30, 0x07, 0x06, 0x03, 0x2B, 0x06, 0x01, 0x05, 0x00]);
    }

    #[test]
    fn long_content_uses_long_length() {
        let data = vec![0xAB; 200];
        let bytes = encoded(|b| b.push_octet_string(&data));
        assert_eq!(&bytes[..3], &[0x04, 0x81, 200]);
        assert_eq!(bytes.len(), 203);
    }
}
