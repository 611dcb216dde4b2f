//! Detailed decode failure kinds.
//!
//! These never reach callers; they are logged at debug level before a
//! decode failure is collapsed into [`Error::MalformedResponse`](super::Error).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeErrorKind {
    TruncatedData,
    InsufficientData { needed: usize, available: usize },
    UnexpectedTag { expected: u8, actual: u8 },
    IndefiniteLength,
    LengthTooLong { octets: usize },
    LengthExceedsMax { length: usize, max: usize },
    ZeroLengthInteger,
    IntegerOverflow,
    InvalidNull,
    InvalidIpAddressLength { length: usize },
    OidTooLong { count: usize, max: usize },
    UnknownVersion(i32),
    UnknownPduType(u8),
    TrailingData { remaining: usize },
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedData => write!(f, "unexpected end of data"),
            Self::InsufficientData { needed, available } => {
                write!(f, "need {} bytes, {} available", needed, available)
            }
            Self::UnexpectedTag { expected, actual } => {
                write!(f, "expected tag 0x{:02X}, got 0x{:02X}", expected, actual)
            }
            Self::IndefiniteLength => write!(f, "indefinite length encoding"),
            Self::LengthTooLong { octets } => write!(f, "length field of {} octets", octets),
            Self::LengthExceedsMax { length, max } => {
                write!(f, "length {} exceeds maximum {}", length, max)
            }
            Self::ZeroLengthInteger => write!(f, "zero-length integer"),
            Self::IntegerOverflow => write!(f, "integer overflow"),
            Self::InvalidNull => write!(f, "NULL with content"),
            Self::InvalidIpAddressLength { length } => {
                write!(f, "IpAddress of {} bytes", length)
            }
            Self::OidTooLong { count, max } => {
                write!(f, "OID has {} arcs, maximum is {}", count, max)
            }
            Self::UnknownVersion(v) => write!(f, "unknown SNMP version {}", v),
            Self::UnknownPduType(tag) => write!(f, "unknown PDU type 0x{:02X}", tag),
            Self::TrailingData { remaining } => {
                write!(f, "{} bytes after message", remaining)
            }
        }
    }
}
