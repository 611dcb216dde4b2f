//! Host-level operations with a guaranteed close.
//!
//! Each function opens a session pair for one host, runs a single operation
//! inside [`scoped`], and closes both sessions on every exit path. Errors are
//! logged at warn level and returned to the caller after the close.
//!
//! ```rust,no_run
//! use rack_pdu::bulk;
//!
//! # async fn example() -> rack_pdu::Result<()> {
//! let rebooted = bulk::outlets_reboot("10.0.0.5", &["^web-", "db0[12]"]).await?;
//! println!("rebooted: {}", rebooted.join(", "));
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};

use crate::command::OutletCommand;
use crate::device::{PduBuilder, RackPdu};
use crate::error::{Error, Result};
use crate::transport::Session;

/// Compile outlet name patterns: case-insensitive, matched anywhere.
pub fn compile_patterns<P: AsRef<str>>(patterns: &[P]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| {
                    Error::InvalidPattern {
                        pattern: pattern.into(),
                        source,
                    }
                    .boxed()
                })
        })
        .collect()
}

/// Run `body` on `device`, then close it whatever happened.
///
/// The body's error takes precedence; a close error is returned only when
/// the body succeeded.
pub async fn scoped<S, T, F>(device: RackPdu<S>, body: F) -> Result<T>
where
    S: Session,
    F: AsyncFnOnce(&RackPdu<S>) -> Result<T>,
{
    let result = body(&device).await;
    let closed = device.close().await;

    match (result, closed) {
        (Err(e), Err(close)) => {
            tracing::debug!(target: "rack_pdu::bulk", { snmp.target = %device.peer_addr(), error = %close }, "close failed after operation error");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(_), Err(close)) => Err(close),
        (Ok(value), Ok(())) => Ok(value),
    }
}

/// Connect with `builder`, run `body` in [`scoped`], and log any failure.
async fn connected<T>(
    builder: PduBuilder,
    operation: &'static str,
    body: impl AsyncFnOnce(&RackPdu) -> Result<T>,
) -> Result<T> {
    let host = builder.host().to_owned();
    let result = match builder.connect().await {
        Ok(device) => scoped(device, body).await,
        Err(e) => Err(e),
    };
    result.inspect_err(|e| warn_failed(&host, operation, e))
}

fn warn_failed(host: &str, operation: &'static str, error: &Error) {
    tracing::warn!(target: "rack_pdu::bulk", { host, operation, %error }, "bulk operation failed");
}

/// Reboot every outlet of `host` whose name matches one of `patterns`.
///
/// Patterns are compiled before connecting, so an invalid one fails with
/// [`Error::InvalidPattern`] without any traffic. Returns the rebooted
/// outlet names in outlet id order.
pub async fn outlets_reboot<P: AsRef<str>>(host: &str, patterns: &[P]) -> Result<Vec<String>> {
    outlets_reboot_with(PduBuilder::new(host), patterns).await
}

/// [`outlets_reboot`] with explicit connection settings.
pub async fn outlets_reboot_with<P: AsRef<str>>(
    builder: PduBuilder,
    patterns: &[P],
) -> Result<Vec<String>> {
    let patterns = compile_patterns(patterns)
        .inspect_err(|e| warn_failed(builder.host(), "outlets_reboot", e))?;
    connected(builder, "outlets_reboot", async |pdu| {
        pdu.reboot_compiled(&patterns).await
    })
    .await
}

/// Names of all outlets of `host`.
pub async fn outlets_names(host: &str) -> Result<BTreeMap<u32, String>> {
    outlets_names_with(PduBuilder::new(host)).await
}

/// [`outlets_names`] with explicit connection settings.
pub async fn outlets_names_with(builder: PduBuilder) -> Result<BTreeMap<u32, String>> {
    connected(builder, "outlets_names", async |pdu| {
        pdu.get_outlets_names().await
    })
    .await
}

/// Send `command` to outlet `id` of `host`. Returns the accepted value.
pub async fn outlet_run_command(host: &str, id: u32, command: OutletCommand) -> Result<i64> {
    outlet_run_command_with(PduBuilder::new(host), id, command).await
}

/// [`outlet_run_command`] with explicit connection settings.
pub async fn outlet_run_command_with(
    builder: PduBuilder,
    id: u32,
    command: OutletCommand,
) -> Result<i64> {
    if id == 0 {
        let e = Error::InvalidOutlet { id };
        warn_failed(builder.host(), "outlet_run_command", &e);
        return Err(e.boxed());
    }
    connected(builder, "outlet_run_command", async |pdu| {
        let accepted = pdu.run_outlets_command(command, &[id]).await?;
        accepted.into_iter().next().ok_or_else(|| {
            Error::MalformedResponse {
                target: pdu.peer_addr(),
            }
            .boxed()
        })
    })
    .await
}

/// Switch outlet `id` of `host` on immediately.
pub async fn outlet_on(host: &str, id: u32) -> Result<i64> {
    outlet_run_command(host, id, OutletCommand::ImmediateOn).await
}

/// Switch outlet `id` of `host` off immediately.
pub async fn outlet_off(host: &str, id: u32) -> Result<i64> {
    outlet_run_command(host, id, OutletCommand::ImmediateOff).await
}

/// Reboot outlet `id` of `host` immediately.
pub async fn outlet_reboot(host: &str, id: u32) -> Result<i64> {
    outlet_run_command(host, id, OutletCommand::ImmediateReboot).await
}

/// [`outlet_on`] with explicit connection settings.
pub async fn outlet_on_with(builder: PduBuilder, id: u32) -> Result<i64> {
    outlet_run_command_with(builder, id, OutletCommand::ImmediateOn).await
}

/// [`outlet_off`] with explicit connection settings.
pub async fn outlet_off_with(builder: PduBuilder, id: u32) -> Result<i64> {
    outlet_run_command_with(builder, id, OutletCommand::ImmediateOff).await
}

/// [`outlet_reboot`] with explicit connection settings.
pub async fn outlet_reboot_with(builder: PduBuilder, id: u32) -> Result<i64> {
    outlet_run_command_with(builder, id, OutletCommand::ImmediateReboot).await
}

/// Whether `host` answers a name query. Never fails; connection problems
/// count as not alive.
pub async fn is_alive(host: &str) -> bool {
    is_alive_with(PduBuilder::new(host)).await
}

/// [`is_alive`] with explicit connection settings.
pub async fn is_alive_with(builder: PduBuilder) -> bool {
    let host = builder.host().to_owned();
    let device = match builder.connect().await {
        Ok(device) => device,
        Err(e) => {
            tracing::debug!(target: "rack_pdu::bulk", { host = %host, error = %e }, "liveness probe could not connect");
            return false;
        }
    };
    let alive = device.is_alive().await;
    if let Err(e) = device.close().await {
        tracing::debug!(target: "rack_pdu::bulk", { host = %host, error = %e }, "close after liveness probe failed");
    }
    alive
}
