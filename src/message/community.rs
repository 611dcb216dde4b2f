//! Community-based SNMP message format (v1/v2c).
//!
//! `SEQUENCE { version INTEGER, community OCTET STRING, pdu PDU }`

use std::net::SocketAddr;

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Result};
use crate::pdu::Pdu;
use crate::version::Version;
use bytes::Bytes;

/// Community-based SNMP message (v1/v2c).
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityMessage {
    pub version: Version,
    pub community: Bytes,
    pub pdu: Pdu,
}

impl CommunityMessage {
    /// Create a new community message.
    pub fn new(version: Version, community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            version,
            community: community.into(),
            pdu,
        }
    }

    /// Encode to BER.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::with_capacity(128);

        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.community);
            buf.push_integer(self.version.as_i32());
        });

        buf.finish()
    }

    /// Decode a datagram received from `source`.
    ///
    /// Any structural problem, a v3 header included, is reported as
    /// `MalformedResponse` for `source`.
    pub fn decode(data: Bytes, source: SocketAddr) -> Result<Self> {
        let mut outer = Decoder::with_target(data, source);
        let mut seq = outer.read_sequence()?;
        outer.finish()?;

        let raw_version = seq.read_integer()?;
        let version = match Version::from_i32(raw_version) {
            Some(v @ (Version::V1 | Version::V2c)) => v,
            _ => return Err(seq.malformed(DecodeErrorKind::UnknownVersion(raw_version))),
        };

        let community = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;
        seq.finish()?;

        Ok(CommunityMessage {
            version,
            community,
            pdu,
        })
    }

    /// Consume and return the PDU.
    pub fn into_pdu(self) -> Pdu {
        self.pdu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, UNKNOWN_TARGET};
    use crate::oid;

    #[test]
    fn v1_get_bytes() {
        let msg = CommunityMessage::new(
            Version::V1,
            Bytes::from_static(b"public"),
            Pdu::get_request(1, &[oid!(1, 3, 6, 1)]),
        );
        let bytes = msg.encode();

        assert_eq!(
            &bytes[..13],
            &[
                0x30, 0x20, // message
                0x02, 0x01, 0x00, // version 0 (v1)
                0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c',
            ]
        );
        assert_eq!(bytes[13], 0xA0);
        assert_eq!(CommunityMessage::decode(bytes, UNKNOWN_TARGET).unwrap(), msg);
    }

    #[test]
    fn v3_header_is_malformed() {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            Pdu::response(1, vec![]).encode(buf);
            buf.push_octet_string(b"public");
            buf.push_integer(3);
        });
        let source: SocketAddr = "192.0.2.1:161".parse().unwrap();
        let err = CommunityMessage::decode(buf.finish(), source).unwrap_err();
        assert!(matches!(*err, Error::MalformedResponse { target } if target == source));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = CommunityMessage::decode(Bytes::from_static(b"hello"), UNKNOWN_TARGET)
            .unwrap_err();
        assert!(err.is_transport());
    }
}
