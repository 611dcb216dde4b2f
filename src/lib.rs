//! # rack-pdu
//!
//! Async SNMP client for APC-style rack power distribution units.
//!
//! ## Features
//!
//! - Typed getters for device identity, outlet names and states, power and
//!   load metrics
//! - Outlet and device commands batched into a single SET
//! - Reboot outlets by name pattern with one call
//! - SNMPv1 and v2c community sessions over UDP, built on Tokio
//! - Every batch is answered all-or-nothing: a refused OID fails the whole
//!   call and names the OID
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rack_pdu::{OutletCommand, RackPdu, Version};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> rack_pdu::Result<()> {
//!     let pdu = RackPdu::builder("10.0.0.5")
//!         .version(Version::V2c)
//!         .timeout(Duration::from_secs(2))
//!         .connect()
//!         .await?;
//!
//!     println!("{} ({} outlets)", pdu.get_name().await?, pdu.get_outlets_count().await?);
//!     for (id, state) in pdu.get_outlets_states().await? {
//!         println!("{id:>2}: {state}");
//!     }
//!
//!     pdu.run_outlets_command(OutletCommand::ImmediateReboot, &[4]).await?;
//!     pdu.close().await
//! }
//! ```
//!
//! ## One-shot Operations
//!
//! The [`bulk`] functions connect, run one operation and always close:
//!
//! ```rust,no_run
//! # async fn example() -> rack_pdu::Result<()> {
//! let rebooted = rack_pdu::bulk::outlets_reboot("10.0.0.5", &["^web-"]).await?;
//! assert!(rack_pdu::bulk::is_alive("10.0.0.5").await);
//! # let _ = rebooted;
//! # Ok(())
//! # }
//! ```
//!
//! ## Raw Batches
//!
//! ```rust,no_run
//! use rack_pdu::catalog::Attribute;
//! use rack_pdu::{RackPdu, Reading, StringMode};
//!
//! # async fn example() -> rack_pdu::Result<()> {
//! let pdu = RackPdu::connect("10.0.0.5").await?;
//! let readings = pdu
//!     .query(&[Attribute::Name.oid(), Attribute::Uptime.oid()], StringMode::Text)
//!     .await?;
//! if let [Reading::Text(name), Reading::Integer(ticks)] = &readings[..] {
//!     println!("{name} up for {} ms", ticks * 10);
//! }
//! # Ok(())
//! # }
//! ```

#![recursion_limit = "256"]
#![doc(test(attr(recursion_limit = "256")))]

pub mod ber;
pub mod bulk;
pub mod catalog;
pub mod command;
pub mod device;
pub mod engine;
pub mod error;
pub mod message;
pub mod oid;
pub mod pdu;
pub mod session;
pub mod transport;
pub mod value;
pub mod varbind;
pub mod version;

pub(crate) mod util;

// Re-exports for convenience
pub use command::{DeviceCommand, LoadState, OutletCommand, OutletState};
pub use device::{LoadThresholds, PduBuilder, RackPdu};
pub use engine::{Reading, StringMode};
pub use error::{Error, ErrorStatus, Result, VarbindFault};
pub use oid::Oid;
pub use session::SessionPair;
pub use transport::{Session, SessionConfig, UdpSession};
pub use value::Value;
pub use varbind::VarBind;
pub use version::Version;
