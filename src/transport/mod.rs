//! Transport layer abstraction.
//!
//! A [`Session`] performs one SNMP request/response exchange per call against
//! a single agent with fixed credentials. Correlating the answer with the
//! request is left to [`crate::engine`].

mod udp;

#[cfg(any(test, feature = "testing"))]
mod mock;

pub use udp::{DEFAULT_RETRIES, DEFAULT_TIMEOUT, SessionConfig, UdpSession};

#[cfg(any(test, feature = "testing"))]
pub use mock::*;

use crate::error::{ErrorStatus, Result};
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::varbind::VarBind;
use std::future::Future;
use std::net::SocketAddr;

/// One agent, one community, one exchange at a time.
///
/// Implementations report transport failures (`Network`, `Timeout`,
/// `MalformedResponse`, `SessionClosed`) as errors and hand back whatever
/// the agent answered otherwise, error status included.
pub trait Session: Send + Sync {
    /// Send one GET for all `oids`.
    fn get(&self, oids: &[Oid]) -> impl Future<Output = Result<Response>> + Send;

    /// Send one SET for all `varbinds`.
    fn set(&self, varbinds: &[VarBind]) -> impl Future<Output = Result<Response>> + Send;

    /// Release the session. Later calls fail with `SessionClosed`.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;

    /// The agent this session talks to.
    fn peer_addr(&self) -> SocketAddr;
}

/// What an agent answered to one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub error_status: ErrorStatus,
    /// 1-based index into `varbinds`; 0 when the status covers the whole PDU.
    pub error_index: i32,
    pub varbinds: Vec<VarBind>,
}

impl Response {
    /// Successful response.
    pub fn ok(varbinds: Vec<VarBind>) -> Self {
        Self {
            error_status: ErrorStatus::NoError,
            error_index: 0,
            varbinds,
        }
    }

    /// Whether the agent reported an error status.
    pub fn is_error(&self) -> bool {
        self.error_status != ErrorStatus::NoError
    }
}

impl From<Pdu> for Response {
    fn from(pdu: Pdu) -> Self {
        Self {
            error_status: pdu.error_status_enum(),
            error_index: pdu.error_index,
            varbinds: pdu.varbinds,
        }
    }
}
