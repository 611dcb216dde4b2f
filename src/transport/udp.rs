//! UDP session for SNMPv1/v2c community messages.

use super::{Response, Session};
use crate::error::{Error, Result};
use crate::message::CommunityMessage;
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::util::bind_ephemeral_udp_socket;
use crate::varbind::VarBind;
use crate::version::Version;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Span, instrument};

/// Default time to wait for each answer.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default number of resends after a timeout.
pub const DEFAULT_RETRIES: u32 = 1;

/// Largest datagram accepted from an agent.
const MAX_DATAGRAM: usize = 65_507;

static NEXT_REQUEST_ID: AtomicI32 = AtomicI32::new(1);

fn next_request_id() -> i32 {
    // Request ids stay positive; some agents mishandle negative ones.
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed) & 0x7FFF_FFFF
}

/// Per-session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub version: Version,
    pub community: Bytes,
    /// Wait per attempt.
    pub timeout: Duration,
    /// Resends after a timeout; 0 sends once.
    pub retries: u32,
}

impl SessionConfig {
    /// Defaults for `community`: v1, 10 s timeout, one retry.
    pub fn new(community: impl Into<Bytes>) -> Self {
        Self {
            version: Version::V1,
            community: community.into(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
        }
    }
}

/// SNMP session over a connected UDP socket.
///
/// Exchanges are serialised: a second caller waits until the first one has
/// its answer, so responses can never be handed to the wrong request.
/// Closing cancels any pending exchange with `SessionClosed` and drops the
/// socket.
pub struct UdpSession {
    socket: Mutex<Option<UdpSocket>>,
    closed: CancellationToken,
    target: SocketAddr,
    config: SessionConfig,
}

impl UdpSession {
    /// Bind an ephemeral socket and connect it to `target`.
    ///
    /// SNMPv3 is refused with [`Error::Config`]; only community messages are
    /// implemented.
    pub async fn open(target: SocketAddr, config: SessionConfig) -> Result<Self> {
        if config.version == Version::V3 {
            return Err(
                Error::Config("SNMPv3 sessions are not supported, use v1 or v2c".into()).boxed(),
            );
        }

        tracing::debug!(target: "rack_pdu::transport", { snmp.target = %target, snmp.version = %config.version }, "opening UDP session");

        let network = |source| Error::Network { target, source }.boxed();
        let socket = bind_ephemeral_udp_socket(target).map_err(network)?;
        socket.connect(target).await.map_err(network)?;

        Ok(Self {
            socket: Mutex::new(Some(socket)),
            closed: CancellationToken::new(),
            target,
            config,
        })
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(
            snmp.target = %self.target,
            snmp.request_id = pdu.request_id,
            snmp.pdu_type = %pdu.pdu_type,
            snmp.attempt = tracing::field::Empty,
        )
    )]
    async fn exchange(&self, pdu: Pdu) -> Result<Response> {
        let closed = || {
            Error::SessionClosed {
                target: self.target,
            }
            .boxed()
        };

        let guard = tokio::select! {
            guard = self.socket.lock() => guard,
            _ = self.closed.cancelled() => return Err(closed()),
        };
        let socket = guard.as_ref().ok_or_else(closed)?;

        let request_id = pdu.request_id;
        let data = CommunityMessage::new(self.config.version, self.config.community.clone(), pdu)
            .encode();
        let start = Instant::now();
        let mut buf = vec![0u8; MAX_DATAGRAM];

        for attempt in 0..=self.config.retries {
            Span::current().record("snmp.attempt", attempt);
            if attempt > 0 {
                tracing::debug!(target: "rack_pdu::transport", "retrying request");
            }

            tracing::trace!(target: "rack_pdu::transport", { snmp.bytes = data.len() }, "sending request");
            socket.send(&data).await.map_err(|source| {
                Error::Network {
                    target: self.target,
                    source,
                }
                .boxed()
            })?;

            let received = tokio::select! {
                received = self.recv_matching(socket, request_id, &mut buf) => received?,
                _ = self.closed.cancelled() => {
                    tracing::debug!(target: "rack_pdu::transport", "session closed while waiting for response");
                    return Err(closed());
                }
            };
            if let Some(pdu) = received {
                tracing::debug!(target: "rack_pdu::transport", { snmp.varbind_count = pdu.varbinds.len(), snmp.error_status = pdu.error_status, snmp.error_index = pdu.error_index }, "received response");
                return Ok(pdu.into());
            }
        }

        let elapsed = start.elapsed();
        tracing::debug!(target: "rack_pdu::transport", { ?elapsed, retries = self.config.retries }, "request timed out");
        Err(Error::Timeout {
            target: self.target,
            elapsed,
            retries: self.config.retries,
        }
        .boxed())
    }

    /// Wait for the response carrying `request_id`.
    ///
    /// Datagrams answering other (earlier, timed out) requests are dropped,
    /// as are datagrams that do not decode or carry another version.
    /// Returns `None` when the timeout expires first.
    async fn recv_matching(
        &self,
        socket: &UdpSocket,
        request_id: i32,
        buf: &mut [u8],
    ) -> Result<Option<Pdu>> {
        let deadline = Instant::now() + self.config.timeout;

        loop {
            let len = match tokio::time::timeout_at(deadline, socket.recv(buf)).await {
                Err(_) => return Ok(None),
                Ok(Err(source)) => {
                    return Err(Error::Network {
                        target: self.target,
                        source,
                    }
                    .boxed());
                }
                Ok(Ok(len)) => len,
            };

            let message =
                match CommunityMessage::decode(Bytes::copy_from_slice(&buf[..len]), self.target) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::debug!(target: "rack_pdu::transport", { snmp.bytes = len, error = %e }, "discarding undecodable datagram");
                        continue;
                    }
                };

            if message.version != self.config.version {
                tracing::debug!(target: "rack_pdu::transport", { expected = %self.config.version, actual = %message.version }, "discarding response with other version");
                continue;
            }

            let pdu = message.into_pdu();
            if pdu.request_id != request_id {
                tracing::debug!(target: "rack_pdu::transport", { expected_request_id = request_id, actual_request_id = pdu.request_id }, "discarding stale response");
                continue;
            }
            if pdu.pdu_type != PduType::Response {
                tracing::warn!(target: "rack_pdu::transport", { pdu_type = %pdu.pdu_type }, "unexpected PDU type in response");
                return Err(Error::MalformedResponse {
                    target: self.target,
                }
                .boxed());
            }

            return Ok(Some(pdu));
        }
    }
}

impl Session for UdpSession {
    async fn get(&self, oids: &[Oid]) -> Result<Response> {
        self.exchange(Pdu::get_request(next_request_id(), oids))
            .await
    }

    async fn set(&self, varbinds: &[VarBind]) -> Result<Response> {
        self.exchange(Pdu::set_request(next_request_id(), varbinds.to_vec()))
            .await
    }

    async fn close(&self) -> Result<()> {
        // Cancel first: a pending exchange holds the socket lock.
        self.closed.cancel();
        if self.socket.lock().await.take().is_some() {
            tracing::debug!(target: "rack_pdu::transport", { snmp.target = %self.target }, "UDP session closed");
        }
        Ok(())
    }

    fn peer_addr(&self) -> SocketAddr {
        self.target
    }
}

impl std::fmt::Debug for UdpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpSession")
            .field("target", &self.target)
            .field("version", &self.config.version)
            .field("timeout", &self.config.timeout)
            .field("retries", &self.config.retries)
            .finish()
    }
}
