//! Error types for rack-pdu.
//!
//! This module provides:
//!
//! - [`Error`] - The main error type covering transport, per-varbind and
//!   caller-side failures
//! - [`VarbindFault`] - Why a device refused one specific OID
//! - [`ErrorStatus`] - SNMP protocol error status codes (RFC 3416)
//!
//! # Error Classes
//!
//! Errors are boxed for efficiency: `Result<T> = Result<T, Box<Error>>`.
//!
//! ```rust
//! use rack_pdu::{Error, Result};
//!
//! fn describe(result: Result<String>) -> String {
//!     match result {
//!         Ok(name) => name,
//!         Err(e) if e.is_transport() => format!("device unreachable: {e}"),
//!         Err(e) => match &*e {
//!             Error::Varbind { oid, fault, .. } => format!("{oid} refused: {fault}"),
//!             _ => format!("error: {e}"),
//!         },
//!     }
//! }
//! ```

pub(crate) mod internal;

use std::net::SocketAddr;
use std::time::Duration;

use crate::oid::Oid;

pub(crate) use internal::DecodeErrorKind;

/// Placeholder target address used when no target is known.
pub(crate) const UNKNOWN_TARGET: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)), 0);

/// Result type alias using the library's boxed Error type.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// The main error type for all rack-pdu operations.
///
/// Variants fall into three classes:
///
/// - **transport** (see [`Error::is_transport`]): the request/response
///   exchange itself failed. Nothing is retried by the batch engines.
/// - **varbind**: the device answered but flagged one OID. The enclosing
///   batch is aborted and no partial result is returned.
/// - **caller**: a precondition was violated before anything was sent.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Socket failure (connection refused, unreachable, etc.)
    #[error("network error communicating with {target}: {source}")]
    Network {
        target: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// No response within the session timeout (after wire-level retries).
    #[error("timeout after {elapsed:?} waiting for {target} ({retries} retries)")]
    Timeout {
        target: SocketAddr,
        elapsed: Duration,
        retries: u32,
    },

    /// Response could not be decoded or did not match the request.
    #[error("malformed response from {target}")]
    MalformedResponse { target: SocketAddr },

    /// The session was closed before or during the call.
    #[error("session to {target} is closed")]
    SessionClosed { target: SocketAddr },

    /// Agent rejected the whole PDU without naming a varbind.
    #[error("SNMP error from {target}: {status}")]
    Snmp {
        target: SocketAddr,
        status: ErrorStatus,
    },

    /// Device could not read or write one specific OID.
    #[error("{target} rejected {oid}: {fault}")]
    Varbind {
        target: SocketAddr,
        oid: Oid,
        fault: VarbindFault,
    },

    /// The same OID appears twice in one batch.
    #[error("duplicate OID {oid} in request batch")]
    DuplicateOid { oid: Oid },

    /// Outlet ids are 1-based.
    #[error("invalid outlet id {id}")]
    InvalidOutlet { id: u32 },

    /// Bank numbers are 1-based.
    #[error("invalid bank number {bank}")]
    InvalidBank { bank: u32 },

    /// An outlet name pattern failed to compile.
    #[error("invalid outlet pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: Box<str>,
        #[source]
        source: regex::Error,
    },

    /// A value did not have the type or range the attribute requires.
    #[error("unexpected value for {oid}: expected {expected}")]
    UnexpectedValue { oid: Oid, expected: &'static str },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(Box<str>),

    /// Invalid OID format.
    #[error("invalid OID: {0}")]
    InvalidOid(Box<str>),
}

impl Error {
    /// Box this error (convenience for constructing boxed errors).
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Whether the failure happened at the session level rather than on a
    /// specific OID or before dispatch.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Network { .. }
                | Error::Timeout { .. }
                | Error::MalformedResponse { .. }
                | Error::SessionClosed { .. }
                | Error::Snmp { .. }
        )
    }

    /// Whether the device reported that an object or instance does not exist.
    ///
    /// During outlet enumeration this is the expected outcome of the outlet
    /// count changing between the count fetch and the per-outlet batch.
    pub fn is_missing_object(&self) -> bool {
        matches!(
            self,
            Error::Varbind {
                fault: VarbindFault::NoSuchObject
                    | VarbindFault::NoSuchInstance
                    | VarbindFault::Status(ErrorStatus::NoSuchName),
                ..
            }
        )
    }

    /// The OID this error is about, if any.
    pub fn oid(&self) -> Option<&Oid> {
        match self {
            Error::Varbind { oid, .. }
            | Error::DuplicateOid { oid }
            | Error::UnexpectedValue { oid, .. } => Some(oid),
            _ => None,
        }
    }
}

/// Why a device refused one varbind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarbindFault {
    /// noSuchObject exception (v2c).
    NoSuchObject,
    /// noSuchInstance exception (v2c).
    NoSuchInstance,
    /// endOfMibView exception (v2c).
    EndOfMibView,
    /// Non-zero error-status whose error-index names this varbind.
    Status(ErrorStatus),
}

impl std::fmt::Display for VarbindFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSuchObject => write!(f, "noSuchObject"),
            Self::NoSuchInstance => write!(f, "noSuchInstance"),
            Self::EndOfMibView => write!(f, "endOfMibView"),
            Self::Status(status) => write!(f, "{}", status),
        }
    }
}

/// SNMP protocol error status codes (RFC 3416).
///
/// ```
/// use rack_pdu::ErrorStatus;
///
/// let status = ErrorStatus::from_i32(2);
/// assert_eq!(status, ErrorStatus::NoSuchName);
/// assert_eq!(status.as_i32(), 2);
/// assert_eq!(status.to_string(), "noSuchName");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorStatus {
    NoError,
    TooBig,
    /// SNMPv1 only; v2c agents answer with exception values instead.
    NoSuchName,
    BadValue,
    ReadOnly,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    AuthorizationError,
    NotWritable,
    InconsistentName,
    /// Unknown or future error status code.
    Unknown(i32),
}

const STATUS_TABLE: [(ErrorStatus, &str); 19] = [
    (ErrorStatus::NoError, "noError"),
    (ErrorStatus::TooBig, "tooBig"),
    (ErrorStatus::NoSuchName, "noSuchName"),
    (ErrorStatus::BadValue, "badValue"),
    (ErrorStatus::ReadOnly, "readOnly"),
    (ErrorStatus::GenErr, "genErr"),
    (ErrorStatus::NoAccess, "noAccess"),
    (ErrorStatus::WrongType, "wrongType"),
    (ErrorStatus::WrongLength, "wrongLength"),
    (ErrorStatus::WrongEncoding, "wrongEncoding"),
    (ErrorStatus::WrongValue, "wrongValue"),
    (ErrorStatus::NoCreation, "noCreation"),
    (ErrorStatus::InconsistentValue, "inconsistentValue"),
    (ErrorStatus::ResourceUnavailable, "resourceUnavailable"),
    (ErrorStatus::CommitFailed, "commitFailed"),
    (ErrorStatus::UndoFailed, "undoFailed"),
    (ErrorStatus::AuthorizationError, "authorizationError"),
    (ErrorStatus::NotWritable, "notWritable"),
    (ErrorStatus::InconsistentName, "inconsistentName"),
];

impl ErrorStatus {
    /// Create from raw status code.
    pub fn from_i32(value: i32) -> Self {
        match usize::try_from(value).ok().and_then(|i| STATUS_TABLE.get(i)) {
            Some((status, _)) => *status,
            None => {
                tracing::warn!(target: "rack_pdu::error", { snmp.error_status = value }, "unknown SNMP error status");
                Self::Unknown(value)
            }
        }
    }

    /// Convert to raw status code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Unknown(code) => *code,
            known => STATUS_TABLE
                .iter()
                .position(|(status, _)| status == known)
                .map_or(-1, |i| i as i32),
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown({})", code),
            known => {
                let name = STATUS_TABLE
                    .iter()
                    .find(|(status, _)| status == known)
                    .map_or("unknown", |(_, name)| name);
                f.write_str(name)
            }
        }
    }
}
