//! Connection settings for a rack PDU.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::session::{READ_COMMUNITY, WRITE_COMMUNITY};
use crate::transport::{DEFAULT_RETRIES, DEFAULT_TIMEOUT, SessionConfig, UdpSession};
use crate::version::Version;

use super::RackPdu;

/// Default SNMP agent port.
pub const DEFAULT_PORT: u16 = 161;

/// Builder for [`RackPdu`] over UDP.
///
/// # Example
///
/// ```rust,no_run
/// use rack_pdu::{RackPdu, Version};
/// use std::time::Duration;
///
/// # async fn example() -> rack_pdu::Result<()> {
/// let pdu = RackPdu::builder("10.0.0.5")
///     .version(Version::V2c)
///     .timeout(Duration::from_secs(3))
///     .retries(2)
///     .connect()
///     .await?;
/// println!("{}", pdu.get_name().await?);
/// pdu.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PduBuilder {
    host: String,
    port: u16,
    version: Version,
    timeout: Duration,
    retries: u32,
}

impl PduBuilder {
    /// Settings for `host`, which may be a name, an address, or either
    /// followed by `:port`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            version: Version::V1,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
        }
    }

    /// SNMP version (default: v1).
    ///
    /// V3 is accepted here but [`connect`](Self::connect) refuses it.
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Time to wait for each answer (default: 10 s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resends after a timeout (default: 1).
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Port used when the host carries none (default: 161).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Host as given.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Open the read and write sessions.
    pub async fn connect(self) -> Result<RackPdu<UdpSession>> {
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".into()).boxed());
        }
        let target = self.resolve_target().await?;

        let read = UdpSession::open(target, self.session_config(READ_COMMUNITY)).await?;
        let write = UdpSession::open(target, self.session_config(WRITE_COMMUNITY)).await?;

        tracing::debug!(target: "rack_pdu::device", { snmp.target = %target, snmp.version = %self.version }, "connected");
        Ok(RackPdu::from_sessions(read, write))
    }

    fn session_config(&self, community: &'static str) -> SessionConfig {
        SessionConfig {
            version: self.version,
            community: community.as_bytes().to_vec().into(),
            timeout: self.timeout,
            retries: self.retries,
        }
    }

    /// Resolve the host to one socket address.
    pub(crate) async fn resolve_target(&self) -> Result<SocketAddr> {
        let host = self.host.trim();
        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }
        if let Ok(ip) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }

        let resolved = match host.rsplit_once(':') {
            Some((name, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    Error::Config(format!("invalid port in '{}'", self.host).into()).boxed()
                })?;
                tokio::net::lookup_host((name, port)).await
            }
            None => tokio::net::lookup_host((host, self.port)).await,
        };

        resolved
            .map_err(|e| {
                Error::Config(format!("could not resolve address '{}': {}", self.host, e).into())
                    .boxed()
            })?
            .next()
            .ok_or_else(|| {
                Error::Config(format!("could not resolve address '{}'", self.host).into()).boxed()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let builder = PduBuilder::new("10.0.0.5");
        assert_eq!(builder.version, Version::V1);
        assert_eq!(builder.timeout, Duration::from_millis(10_000));
        assert_eq!(builder.retries, 1);
        assert_eq!(builder.port, 161);
    }

    #[tokio::test]
    async fn resolve_forms() {
        let cases = [
            ("10.0.0.5", "10.0.0.5:161"),
            ("10.0.0.5:1161", "10.0.0.5:1161"),
            ("::1", "[::1]:161"),
            ("[::1]:1161", "[::1]:1161"),
            ("[::1]", "[::1]:161"),
        ];
        for (host, expected) in cases {
            let addr = PduBuilder::new(host).resolve_target().await.unwrap();
            assert_eq!(addr, expected.parse::<SocketAddr>().unwrap(), "{host}");
        }
    }

    #[tokio::test]
    async fn custom_default_port() {
        let addr = PduBuilder::new("127.0.0.1")
            .port(16100)
            .resolve_target()
            .await
            .unwrap();
        assert_eq!(addr.port(), 16100);
    }

    #[tokio::test]
    async fn localhost_resolves() {
        let addr = PduBuilder::new("localhost:1161")
            .resolve_target()
            .await
            .unwrap();
        assert_eq!(addr.port(), 1161);
        assert!(addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn bad_port_is_config_error() {
        let err = PduBuilder::new("pdu.example:http")
            .resolve_target()
            .await
            .unwrap_err();
        assert!(matches!(*err, Error::Config(_)));
    }

    #[tokio::test]
    async fn v3_refused_on_connect() {
        let err = PduBuilder::new("127.0.0.1")
            .version(Version::V3)
            .connect()
            .await
            .unwrap_err();
        assert!(matches!(*err, Error::Config(_)));
    }

    #[tokio::test]
    async fn zero_timeout_refused() {
        let err = PduBuilder::new("127.0.0.1")
            .timeout(Duration::ZERO)
            .connect()
            .await
            .unwrap_err();
        assert!(matches!(*err, Error::Config(_)));
    }
}
