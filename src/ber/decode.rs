//! BER decoding.
//!
//! Zero-copy decoding over `Bytes`. Every failure is logged with its
//! detailed kind at debug level and reported to callers as
//! [`Error::MalformedResponse`] for the peer the bytes came from.

use std::net::SocketAddr;

use super::length::decode_length;
use super::tag;
use crate::error::{DecodeErrorKind, Error, Result, UNKNOWN_TARGET};
use crate::oid::Oid;
use bytes::Bytes;

/// BER decoder that reads from a byte buffer.
pub struct Decoder {
    data: Bytes,
    offset: usize,
    target: Option<SocketAddr>,
}

impl Decoder {
    /// Create a new decoder from bytes.
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            offset: 0,
            target: None,
        }
    }

    /// Create a decoder with a peer address for error context.
    pub fn with_target(data: Bytes, target: SocketAddr) -> Self {
        Self {
            data,
            offset: 0,
            target: Some(target),
        }
    }

    /// Create a decoder from a byte slice (copies the data).
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    fn target(&self) -> SocketAddr {
        self.target.unwrap_or(UNKNOWN_TARGET)
    }

    /// Log `kind` and build the error callers see.
    pub(crate) fn malformed(&self, kind: DecodeErrorKind) -> Box<Error> {
        tracing::debug!(target: "rack_pdu::ber", { snmp.offset = self.offset, snmp.target = %self.target(), kind = %kind }, "malformed BER");
        Error::MalformedResponse {
            target: self.target(),
        }
        .boxed()
    }

    /// Current offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Remaining bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Whether all input has been consumed.
    pub fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Peek at the next tag without consuming it.
    pub fn peek_tag(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    /// Read a tag octet.
    pub fn read_tag(&mut self) -> Result<u8> {
        match self.peek_tag() {
            Some(tag) => {
                self.offset += 1;
                Ok(tag)
            }
            None => Err(self.malformed(DecodeErrorKind::TruncatedData)),
        }
    }

    /// Read length octets.
    pub fn read_length(&mut self) -> Result<usize> {
        let (len, consumed) =
            decode_length(&self.data[self.offset..]).map_err(|kind| self.malformed(kind))?;
        self.offset += consumed;
        Ok(len)
    }

    /// Read raw bytes without copying.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        if self.offset.saturating_add(len) > self.data.len() {
            return Err(self.malformed(DecodeErrorKind::InsufficientData {
                needed: len,
                available: self.remaining(),
            }));
        }
        let bytes = self.data.slice(self.offset..self.offset + len);
        self.offset += len;
        Ok(bytes)
    }

    /// Read and expect a specific tag, returning the content length.
    pub fn expect_tag(&mut self, expected: u8) -> Result<usize> {
        let actual = self.read_tag()?;
        if actual != expected {
            return Err(self.malformed(DecodeErrorKind::UnexpectedTag { expected, actual }));
        }
        self.read_length()
    }

    /// Read an INTEGER.
    pub fn read_integer(&mut self) -> Result<i32> {
        let len = self.expect_tag(tag::universal::INTEGER)?;
        self.read_integer_value(len)
    }

    /// Read INTEGER content of the given length.
    ///
    /// Non-minimal encodings are accepted. Content wider than four octets is
    /// rejected rather than truncated.
    pub fn read_integer_value(&mut self, len: usize) -> Result<i32> {
        if len == 0 {
            return Err(self.malformed(DecodeErrorKind::ZeroLengthInteger));
        }
        let bytes = self.read_bytes(len)?;
        let negative = bytes[0] & 0x80 != 0;
        let significant = bytes
            .iter()
            .skip_while(|&&b| b == if negative { 0xFF } else { 0x00 })
            .count();
        if significant > 4 {
            return Err(self.malformed(DecodeErrorKind::IntegerOverflow));
        }

        let init: i64 = if negative { -1 } else { 0 };
        let value = bytes.iter().fold(init, |acc, &b| (acc << 8) | i64::from(b));
        i32::try_from(value).map_err(|_| self.malformed(DecodeErrorKind::IntegerOverflow))
    }

    /// Read unsigned content of the given length (Counter32, Gauge32, TimeTicks, Counter64).
    pub fn read_unsigned_value(&mut self, len: usize, max: u64) -> Result<u64> {
        if len == 0 {
            return Err(self.malformed(DecodeErrorKind::ZeroLengthInteger));
        }
        let bytes = self.read_bytes(len)?;
        let significant: Vec<u8> = bytes.iter().copied().skip_while(|&b| b == 0).collect();
        if significant.len() > 8 {
            return Err(self.malformed(DecodeErrorKind::IntegerOverflow));
        }
        let value = significant
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        if value > max {
            return Err(self.malformed(DecodeErrorKind::IntegerOverflow));
        }
        Ok(value)
    }

    /// Read an OCTET STRING.
    pub fn read_octet_string(&mut self) -> Result<Bytes> {
        let len = self.expect_tag(tag::universal::OCTET_STRING)?;
        self.read_bytes(len)
    }

    /// Read a NULL.
    pub fn read_null(&mut self) -> Result<()> {
        let len = self.expect_tag(tag::universal::NULL)?;
        if len != 0 {
            return Err(self.malformed(DecodeErrorKind::InvalidNull));
        }
        Ok(())
    }

    /// Read an OBJECT IDENTIFIER.
    pub fn read_oid(&mut self) -> Result<Oid> {
        let len = self.expect_tag(tag::universal::OBJECT_IDENTIFIER)?;
        self.read_oid_value(len)
    }

    /// Read OBJECT IDENTIFIER content of the given length.
    pub fn read_oid_value(&mut self, len: usize) -> Result<Oid> {
        let bytes = self.read_bytes(len)?;
        Oid::from_ber(&bytes).map_err(|kind| self.malformed(kind))
    }

    /// Read a SEQUENCE, returning a decoder over its contents.
    pub fn read_sequence(&mut self) -> Result<Decoder> {
        self.read_constructed(tag::universal::SEQUENCE)
    }

    /// Read a constructed TLV with the given tag, returning a decoder over its contents.
    pub fn read_constructed(&mut self, expected_tag: u8) -> Result<Decoder> {
        let len = self.expect_tag(expected_tag)?;
        self.sub_decoder(len)
    }

    /// Split off the next `len` bytes as their own decoder.
    pub fn sub_decoder(&mut self, len: usize) -> Result<Decoder> {
        let data = self.read_bytes(len)?;
        Ok(Decoder {
            data,
            offset: 0,
            target: self.target,
        })
    }

    /// Fail if any input remains.
    pub fn finish(&self) -> Result<()> {
        if !self.is_empty() {
            return Err(self.malformed(DecodeErrorKind::TrailingData {
                remaining: self.remaining(),
            }));
        }
        Ok(())
    }
}
