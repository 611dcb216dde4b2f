//! Batch request engines.
//!
//! [`query`] and [`execute`] turn an ordered OID batch into one GET or SET
//! and hand back one [`Reading`] per requested OID, in request order,
//! whatever order the agent answered in. A fault on any varbind fails the
//! whole batch; nothing partial is returned and nothing is retried here.

use crate::error::{Error, Result, VarbindFault};
use crate::oid::Oid;
use crate::transport::{Response, Session};
use crate::value::Value;
use crate::varbind::VarBind;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use tracing::instrument;

/// How OCTET STRING values are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringMode {
    /// Decode as UTF-8, replacing invalid sequences.
    #[default]
    Text,
    /// Keep the raw octets.
    Raw,
}

/// One result of a batch, aligned with the requested OID.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// INTEGER, Counter32, Gauge32 or TimeTicks.
    Integer(i64),
    /// OCTET STRING under [`StringMode::Text`].
    Text(String),
    /// OCTET STRING under [`StringMode::Raw`].
    Octets(Bytes),
    /// Any other type, untouched.
    Other(Value),
}

impl Reading {
    /// Convert a wire value.
    ///
    /// ```
    /// use bytes::Bytes;
    /// use rack_pdu::{Reading, StringMode, Value};
    ///
    /// let name = Value::OctetString(Bytes::from_static(b"Server-A"));
    /// assert_eq!(
    ///     Reading::from_value(name.clone(), StringMode::Text),
    ///     Reading::Text("Server-A".into())
    /// );
    /// assert_eq!(
    ///     Reading::from_value(name, StringMode::Raw),
    ///     Reading::Octets(Bytes::from_static(b"Server-A"))
    /// );
    /// assert_eq!(Reading::from_value(Value::Gauge32(217), StringMode::Text), Reading::Integer(217));
    /// ```
    pub fn from_value(value: Value, strings: StringMode) -> Self {
        if let Some(n) = value.as_i64() {
            return Reading::Integer(n);
        }
        match (value, strings) {
            (Value::OctetString(data), StringMode::Text) => {
                Reading::Text(String::from_utf8_lossy(&data).into_owned())
            }
            (Value::OctetString(data), StringMode::Raw) => Reading::Octets(data),
            (other, _) => Reading::Other(other),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Reading::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Reading::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Reading::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_octets(self) -> Option<Bytes> {
        match self {
            Reading::Octets(data) => Some(data),
            _ => None,
        }
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reading::Integer(n) => write!(f, "{}", n),
            Reading::Text(s) => f.write_str(s),
            Reading::Octets(data) => {
                for b in data.iter() {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Reading::Other(value) => write!(f, "{}", value),
        }
    }
}

/// Fetch `oids` with one GET.
///
/// An empty batch returns immediately. Duplicate OIDs are refused before
/// anything is sent.
#[instrument(
    level = "debug",
    skip_all,
    err,
    fields(snmp.target = %session.peer_addr(), snmp.oid_count = oids.len())
)]
pub async fn query<S: Session>(
    session: &S,
    oids: &[Oid],
    strings: StringMode,
) -> Result<Vec<Reading>> {
    if oids.is_empty() {
        return Ok(Vec::new());
    }
    reject_duplicates(oids.iter())?;

    let response = session.get(oids).await?;
    let values = correlate(session.peer_addr(), oids, response)?;

    Ok(values
        .into_iter()
        .map(|value| Reading::from_value(value, strings))
        .collect())
}

/// Write INTEGER `commands` with one SET.
///
/// Same batch rules as [`query`]. The readings are what the agent echoed
/// back. Commands are not idempotent: sending one twice acts twice.
#[instrument(
    level = "debug",
    skip_all,
    err,
    fields(snmp.target = %session.peer_addr(), snmp.oid_count = commands.len())
)]
pub async fn execute<S: Session>(session: &S, commands: &[(Oid, i32)]) -> Result<Vec<Reading>> {
    if commands.is_empty() {
        return Ok(Vec::new());
    }
    reject_duplicates(commands.iter().map(|(oid, _)| oid))?;

    let varbinds: Vec<VarBind> = commands
        .iter()
        .map(|(oid, code)| VarBind::new(oid.clone(), Value::Integer(*code)))
        .collect();
    let oids: Vec<Oid> = commands.iter().map(|(oid, _)| oid.clone()).collect();

    let response = session.set(&varbinds).await?;
    let values = correlate(session.peer_addr(), &oids, response)?;

    Ok(values
        .into_iter()
        .map(|value| Reading::from_value(value, StringMode::Text))
        .collect())
}

fn reject_duplicates<'a>(oids: impl Iterator<Item = &'a Oid>) -> Result<()> {
    let mut seen = HashSet::new();
    for oid in oids {
        if !seen.insert(oid) {
            tracing::debug!(target: "rack_pdu::engine", { snmp.oid = %oid }, "duplicate OID in batch");
            return Err(Error::DuplicateOid { oid: oid.clone() }.boxed());
        }
    }
    Ok(())
}

/// Place every answered varbind at the position of its OID in `requested`.
fn correlate(target: SocketAddr, requested: &[Oid], response: Response) -> Result<Vec<Value>> {
    if response.is_error() {
        let status = response.error_status;
        let named = usize::try_from(response.error_index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| response.varbinds.get(i));

        return Err(match named {
            Some(vb) => {
                tracing::debug!(target: "rack_pdu::engine", { snmp.target = %target, snmp.oid = %vb.oid, snmp.error_status = %status }, "agent rejected varbind");
                Error::Varbind {
                    target,
                    oid: vb.oid.clone(),
                    fault: VarbindFault::Status(status),
                }
            }
            None => {
                tracing::debug!(target: "rack_pdu::engine", { snmp.target = %target, snmp.error_status = %status, snmp.error_index = response.error_index }, "agent rejected request");
                Error::Snmp { target, status }
            }
        }
        .boxed());
    }

    let malformed = |reason: &str, oid: &Oid| {
        tracing::debug!(target: "rack_pdu::engine", { snmp.target = %target, snmp.oid = %oid, reason }, "response does not match request");
        Error::MalformedResponse { target }.boxed()
    };

    let positions: HashMap<&Oid, usize> = requested.iter().zip(0..).collect();
    let mut slots: Vec<Option<Value>> = vec![None; requested.len()];

    for vb in response.varbinds {
        let Some(&position) = positions.get(&vb.oid) else {
            return Err(malformed("unrequested OID", &vb.oid));
        };
        if slots[position].is_some() {
            return Err(malformed("OID answered twice", &vb.oid));
        }
        if let Some(fault) = vb.value.fault() {
            tracing::debug!(target: "rack_pdu::engine", { snmp.target = %target, snmp.oid = %vb.oid, %fault }, "varbind exception");
            return Err(Error::Varbind {
                target,
                oid: vb.oid,
                fault,
            }
            .boxed());
        }
        slots[position] = Some(vb.value);
    }

    slots
        .into_iter()
        .zip(requested)
        .map(|(slot, oid)| slot.ok_or_else(|| malformed("OID not answered", oid)))
        .collect()
}
