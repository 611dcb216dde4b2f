//! Read/write session pair for one device.

use crate::error::Result;
use crate::transport::Session;
use std::net::SocketAddr;

/// Community used for reads.
pub const READ_COMMUNITY: &str = "public";

/// Community used for writes.
pub const WRITE_COMMUNITY: &str = "private";

/// The two sessions a device is driven through: GETs go to `read`, SETs
/// to `write`.
#[derive(Debug)]
pub struct SessionPair<S> {
    read: S,
    write: S,
}

impl<S: Session> SessionPair<S> {
    pub fn new(read: S, write: S) -> Self {
        Self { read, write }
    }

    /// Session bound to the read community.
    pub fn read(&self) -> &S {
        &self.read
    }

    /// Session bound to the write community.
    pub fn write(&self) -> &S {
        &self.write
    }

    /// Device address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.read.peer_addr()
    }

    /// Close both sessions.
    ///
    /// The write session is closed even when closing the read session
    /// fails; the first error is returned.
    pub async fn close(&self) -> Result<()> {
        let read = self.read.close().await;
        let write = self.write.close().await;

        if let Err(e) = &read {
            tracing::warn!(target: "rack_pdu::session", { snmp.target = %self.peer_addr(), error = %e }, "closing read session failed");
        }
        if let Err(e) = &write {
            tracing::warn!(target: "rack_pdu::session", { snmp.target = %self.peer_addr(), error = %e }, "closing write session failed");
        }

        read.and(write)
    }
}
