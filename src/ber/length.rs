//! BER length octets (X.690 Section 8.1.3).
//!
//! Short form for lengths up to 127, long form otherwise. The indefinite
//! form is rejected; SNMP never uses it.

use crate::error::DecodeErrorKind;

/// Largest length accepted when decoding.
///
/// A PDU answer is a few hundred bytes; anything near this is garbage.
pub const MAX_LENGTH: usize = 0x10000;

/// Encode a length, returning the octets in reverse order for prepending.
pub(crate) fn encode_length(len: usize) -> ([u8; 5], usize) {
    let mut buf = [0u8; 5];

    if len <= 127 {
        buf[0] = len as u8;
        return (buf, 1);
    }

    let octets = (usize::BITS - len.leading_zeros()).div_ceil(8) as usize;
    for (i, slot) in buf.iter_mut().take(octets).enumerate() {
        *slot = (len >> (8 * i)) as u8;
    }
    buf[octets] = 0x80 | octets as u8;
    (buf, octets + 1)
}

/// Decode a length, returning `(length, octets consumed)`.
pub(crate) fn decode_length(data: &[u8]) -> Result<(usize, usize), DecodeErrorKind> {
    let first = *data.first().ok_or(DecodeErrorKind::TruncatedData)?;

    if first == 0x80 {
        return Err(DecodeErrorKind::IndefiniteLength);
    }
    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let octets = (first & 0x7F) as usize;
    if octets > 4 {
        return Err(DecodeErrorKind::LengthTooLong { octets });
    }
    let bytes = data
        .get(1..=octets)
        .ok_or(DecodeErrorKind::TruncatedData)?;

    let len = bytes
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);
    if len > MAX_LENGTH {
        return Err(DecodeErrorKind::LengthExceedsMax {
            length: len,
            max: MAX_LENGTH,
        });
    }

    Ok((len, 1 + octets))
}
