//! Typed operations on one rack PDU.
//!
//! [`RackPdu`] composes the [`catalog`](crate::catalog) with the batch
//! [`engine`](crate::engine): reads go through the `public` session, commands
//! through the `private` one, and every wire value is converted to the type
//! the attribute calls for.
//!
//! # Example
//!
//! ```rust,no_run
//! use rack_pdu::{OutletCommand, RackPdu};
//!
//! # async fn example() -> rack_pdu::Result<()> {
//! let pdu = RackPdu::connect("10.0.0.5").await?;
//!
//! for (id, name) in pdu.get_outlets_names().await? {
//!     println!("{id:>2} {name}");
//! }
//! pdu.run_outlets_command(OutletCommand::ImmediateOff, &[3, 4]).await?;
//!
//! pdu.close().await?;
//! # Ok(())
//! # }
//! ```

mod builder;

pub use builder::{DEFAULT_PORT, PduBuilder};

use std::collections::BTreeMap;
use std::net::SocketAddr;

use bytes::Bytes;
use regex::Regex;
use tracing::instrument;

use crate::catalog::{self, Attribute};
use crate::command::{DeviceCommand, LoadState, OutletCommand, OutletState};
use crate::engine::{self, Reading, StringMode};
use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::session::SessionPair;
use crate::transport::{Session, UdpSession};

/// Load thresholds of the device, in amps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadThresholds {
    pub low: u32,
    pub near_overload: u32,
    pub overload: u32,
}

/// Client for one rack PDU.
///
/// Holds a read session and a write session; nothing is cached between
/// calls. Batches on one instance should not be interleaved by concurrent
/// callers.
pub struct RackPdu<S = UdpSession> {
    sessions: SessionPair<S>,
}

impl RackPdu<UdpSession> {
    /// Start configuring a connection to `host`.
    pub fn builder(host: impl Into<String>) -> PduBuilder {
        PduBuilder::new(host)
    }

    /// Connect to `host` with default settings.
    pub async fn connect(host: impl Into<String>) -> Result<Self> {
        PduBuilder::new(host).connect().await
    }
}

impl<S: Session> RackPdu<S> {
    /// Drive a device through existing sessions.
    pub fn from_sessions(read: S, write: S) -> Self {
        Self {
            sessions: SessionPair::new(read, write),
        }
    }

    /// The underlying session pair.
    pub fn sessions(&self) -> &SessionPair<S> {
        &self.sessions
    }

    /// Device address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.sessions.peer_addr()
    }

    /// Batch GET through the read session. See [`engine::query`].
    pub async fn query(&self, oids: &[Oid], strings: StringMode) -> Result<Vec<Reading>> {
        engine::query(self.sessions.read(), oids, strings).await
    }

    /// Batch SET through the write session. See [`engine::execute`].
    pub async fn execute(&self, commands: &[(Oid, i32)]) -> Result<Vec<Reading>> {
        engine::execute(self.sessions.write(), commands).await
    }

    async fn get_one(&self, oid: Oid, strings: StringMode) -> Result<(Oid, Reading)> {
        let reading = self
            .query(std::slice::from_ref(&oid), strings)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::MalformedResponse {
                    target: self.peer_addr(),
                }
                .boxed()
            })?;
        Ok((oid, reading))
    }

    async fn get_text(&self, attribute: Attribute) -> Result<String> {
        let (oid, reading) = self.get_one(attribute.oid(), StringMode::Text).await?;
        text(oid, reading)
    }

    async fn get_integer(&self, oid: Oid) -> Result<(Oid, i64)> {
        let (oid, reading) = self.get_one(oid, StringMode::Text).await?;
        let n = integer(&oid, reading)?;
        Ok((oid, n))
    }

    async fn get_u32(&self, attribute: Attribute, expected: &'static str) -> Result<u32> {
        let (oid, n) = self.get_integer(attribute.oid()).await?;
        narrow(oid, n, expected)
    }

    /// Device name (rPDUIdentName).
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_name(&self) -> Result<String> {
        self.get_text(Attribute::Name).await
    }

    /// Hardware revision.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_hardware_revision(&self) -> Result<String> {
        self.get_text(Attribute::HardwareRevision).await
    }

    /// Firmware revision.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_firmware_revision(&self) -> Result<String> {
        self.get_text(Attribute::FirmwareRevision).await
    }

    /// Date of manufacture, as the device formats it.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_manufacture_date(&self) -> Result<String> {
        self.get_text(Attribute::ManufactureDate).await
    }

    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_model_number(&self) -> Result<String> {
        self.get_text(Attribute::ModelNumber).await
    }

    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_serial_number(&self) -> Result<String> {
        self.get_text(Attribute::SerialNumber).await
    }

    /// System description (MIB-II sysDescr).
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_description(&self) -> Result<String> {
        self.get_text(Attribute::Description).await
    }

    /// Number of outlets, read fresh on every call.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_outlets_count(&self) -> Result<u32> {
        self.get_u32(Attribute::OutletsCount, "outlet count").await
    }

    /// Name of outlet `id` (1-based).
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_outlet_name(&self, id: u32) -> Result<String> {
        check_outlet(id)?;
        let (oid, reading) = self.get_one(catalog::outlet_name(id), StringMode::Text).await?;
        text(oid, reading)
    }

    /// Names of all outlets, keyed by outlet id.
    ///
    /// Two round trips: the outlet count, then one batch over `1..=count`.
    /// If the outlet count shrinks in between, the second batch fails with a
    /// varbind error for which [`Error::is_missing_object`] holds.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_outlets_names(&self) -> Result<BTreeMap<u32, String>> {
        self.get_outlet_column(catalog::outlet_name, text).await
    }

    /// Power state of all outlets, keyed by outlet id.
    ///
    /// Same two-step protocol as [`get_outlets_names`](Self::get_outlets_names).
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_outlets_states(&self) -> Result<BTreeMap<u32, OutletState>> {
        self.get_outlet_column(catalog::outlet_state, outlet_state)
            .await
    }

    async fn get_outlet_column<T>(
        &self,
        column: fn(u32) -> Oid,
        convert: fn(Oid, Reading) -> Result<T>,
    ) -> Result<BTreeMap<u32, T>> {
        let count = self.get_outlets_count().await?;
        let ids: Vec<u32> = (1..=count).collect();
        let oids: Vec<Oid> = ids.iter().map(|&id| column(id)).collect();

        let readings = self.query(&oids, StringMode::Text).await?;

        ids.into_iter()
            .zip(oids.into_iter().zip(readings))
            .map(|(id, (oid, reading))| Ok((id, convert(oid, reading)?)))
            .collect()
    }

    /// Power state of outlet `id`.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_outlet_state(&self, id: u32) -> Result<OutletState> {
        check_outlet(id)?;
        let (oid, reading) = self
            .get_one(catalog::outlet_state(id), StringMode::Text)
            .await?;
        outlet_state(oid, reading)
    }

    /// Agent uptime in milliseconds.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_uptime(&self) -> Result<u64> {
        let (oid, ticks) = self.get_integer(Attribute::Uptime.oid()).await?;
        // TimeTicks are hundredths of a second.
        u64::try_from(ticks)
            .map(|t| t * 10)
            .map_err(|_| unexpected(oid, "non-negative TimeTicks"))
    }

    /// Total current draw in amps.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_power_draw(&self) -> Result<f64> {
        let (_, tenths) = self.get_integer(Attribute::PowerDraw.oid()).await?;
        Ok(tenths as f64 / 10.0)
    }

    /// Total power in watts.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_power_watts(&self) -> Result<u32> {
        self.get_u32(Attribute::PowerWatts, "power in watts").await
    }

    /// Number of load banks.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_banks_count(&self) -> Result<u32> {
        self.get_u32(Attribute::BanksCount, "bank count").await
    }

    /// Current draw of one load row in amps; row 1 is the device total,
    /// banks follow from row 2.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_bank_load(&self, bank: u32) -> Result<f64> {
        if bank == 0 {
            return Err(Error::InvalidBank { bank }.boxed());
        }
        let (_, tenths) = self.get_integer(catalog::bank_load(bank)).await?;
        Ok(tenths as f64 / 10.0)
    }

    /// Load state of the device.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_load_state(&self) -> Result<LoadState> {
        let (oid, code) = self.get_integer(Attribute::LoadState.oid()).await?;
        i32::try_from(code)
            .ok()
            .and_then(|code| LoadState::try_from(code).ok())
            .ok_or_else(|| unexpected(oid, "load state 1..=4"))
    }

    /// Configured load thresholds, fetched in one batch.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_load_thresholds(&self) -> Result<LoadThresholds> {
        let oids = [
            Attribute::LowLoadThreshold.oid(),
            Attribute::NearOverloadThreshold.oid(),
            Attribute::OverloadThreshold.oid(),
        ];
        let readings = self.query(&oids, StringMode::Text).await?;

        let amps = oids
            .into_iter()
            .zip(readings)
            .map(|(oid, reading)| {
                let n = integer(&oid, reading)?;
                narrow(oid, n, "threshold in amps")
            })
            .collect::<Result<Vec<u32>>>()?;

        match amps[..] {
            [low, near_overload, overload] => Ok(LoadThresholds {
                low,
                near_overload,
                overload,
            }),
            _ => Err(Error::MalformedResponse {
                target: self.peer_addr(),
            }
            .boxed()),
        }
    }

    /// Raw octets of any OCTET STRING object.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn get_raw(&self, oid: &Oid) -> Result<Bytes> {
        let (oid, reading) = self.get_one(oid.clone(), StringMode::Raw).await?;
        reading
            .into_octets()
            .ok_or_else(|| unexpected(oid, "octet string"))
    }

    /// Issue a command to all outlets at once.
    ///
    /// Returns the value the device accepted.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn run_device_command(&self, command: DeviceCommand) -> Result<i64> {
        let oid = Attribute::DeviceCommand.oid();
        let reading = self
            .execute(&[(oid.clone(), command.code())])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::MalformedResponse {
                    target: self.peer_addr(),
                }
                .boxed()
            })?;
        integer(&oid, reading)
    }

    /// Issue `command` to the outlets in `ids`, all in one SET.
    ///
    /// An empty `ids` means every outlet; the outlet count is fetched
    /// first. Returns the accepted values in `ids` order.
    ///
    /// The device may have acted even when this fails with a transport
    /// error: a lost answer looks the same as a lost request.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn run_outlets_command(&self, command: OutletCommand, ids: &[u32]) -> Result<Vec<i64>> {
        let ids: Vec<u32> = if ids.is_empty() {
            (1..=self.get_outlets_count().await?).collect()
        } else {
            ids.iter().try_for_each(|&id| check_outlet(id))?;
            ids.to_vec()
        };

        let commands: Vec<(Oid, i32)> = ids
            .iter()
            .map(|&id| (catalog::outlet_command(id), command.code()))
            .collect();
        let readings = self.execute(&commands).await?;

        commands
            .iter()
            .zip(readings)
            .map(|((oid, _), reading)| integer(oid, reading))
            .collect()
    }

    /// Whether the device answers a name query with any value. Never fails.
    pub async fn is_alive(&self) -> bool {
        match self.get_one(Attribute::Name.oid(), StringMode::Raw).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(target: "rack_pdu::device", { snmp.target = %self.peer_addr(), error = %e }, "liveness probe failed");
                false
            }
        }
    }

    /// Reboot every outlet whose name matches any of `patterns`.
    ///
    /// Patterns are case-insensitive regular expressions searched anywhere
    /// in the name. Matching outlets are rebooted with a single SET; an
    /// outlet matched by several patterns is rebooted once. Returns the
    /// rebooted names in outlet order.
    #[instrument(skip_all, err, fields(snmp.target = %self.peer_addr()))]
    pub async fn reboot_matching<P: AsRef<str>>(&self, patterns: &[P]) -> Result<Vec<String>> {
        let patterns = crate::bulk::compile_patterns(patterns)?;
        self.reboot_compiled(&patterns).await
    }

    pub(crate) async fn reboot_compiled(&self, patterns: &[Regex]) -> Result<Vec<String>> {
        let names = self.get_outlets_names().await?;

        let matched: BTreeMap<u32, String> = names
            .into_iter()
            .filter(|(_, name)| patterns.iter().any(|re| re.is_match(name)))
            .collect();

        if !matched.is_empty() {
            let ids: Vec<u32> = matched.keys().copied().collect();
            tracing::info!(target: "rack_pdu::device", { snmp.target = %self.peer_addr(), outlets = ?ids }, "rebooting outlets");
            self.run_outlets_command(OutletCommand::ImmediateReboot, &ids)
                .await?;
        }

        Ok(matched.into_values().collect())
    }

    /// Close both sessions. Later calls fail with [`Error::SessionClosed`].
    pub async fn close(&self) -> Result<()> {
        self.sessions.close().await
    }
}

impl<S: Session> std::fmt::Debug for RackPdu<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RackPdu")
            .field("target", &self.peer_addr())
            .finish()
    }
}

fn check_outlet(id: u32) -> Result<()> {
    if id == 0 {
        return Err(Error::InvalidOutlet { id }.boxed());
    }
    Ok(())
}

fn unexpected(oid: Oid, expected: &'static str) -> Box<Error> {
    tracing::debug!(target: "rack_pdu::device", { snmp.oid = %oid, expected }, "unexpected value");
    Error::UnexpectedValue { oid, expected }.boxed()
}

fn text(oid: Oid, reading: Reading) -> Result<String> {
    reading
        .into_text()
        .ok_or_else(|| unexpected(oid, "octet string"))
}

fn integer(oid: &Oid, reading: Reading) -> Result<i64> {
    reading
        .as_i64()
        .ok_or_else(|| unexpected(oid.clone(), "integer"))
}

fn narrow(oid: Oid, n: i64, expected: &'static str) -> Result<u32> {
    u32::try_from(n).map_err(|_| unexpected(oid, expected))
}

fn outlet_state(oid: Oid, reading: Reading) -> Result<OutletState> {
    let code = integer(&oid, reading)?;
    i32::try_from(code)
        .ok()
        .and_then(|code| OutletState::try_from(code).ok())
        .ok_or_else(|| unexpected(oid, "outlet state 1 (on) or 2 (off)"))
}
