//! OID catalog for APC rack PDUs (PowerNet-MIB `rPDU` branch plus MIB-II).
//!
//! Scalars are addressed through [`Attribute`]; table columns take a 1-based
//! row index. Nothing here talks to a device.

use crate::oid::Oid;

/// MIB-II root, `1.3.6.1.2.1`.
pub const MIB2: [u32; 6] = [1, 3, 6, 1, 2, 1];

/// PowerNet-MIB `rPDU` root, `1.3.6.1.4.1.318.1.1.12`.
pub const RPDU: [u32; 10] = [1, 3, 6, 1, 4, 1, 318, 1, 1, 12];

fn rpdu(suffix: &[u32]) -> Oid {
    Oid::from_slice(&RPDU).join(suffix)
}

fn mib2(suffix: &[u32]) -> Oid {
    Oid::from_slice(&MIB2).join(suffix)
}

/// Scalar attributes of a rack PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// rPDUIdentName
    Name,
    /// rPDUIdentHardwareRev
    HardwareRevision,
    /// rPDUIdentFirmwareRev
    FirmwareRevision,
    /// rPDUIdentDateOfManufacture
    ManufactureDate,
    /// rPDUIdentModelNumber
    ModelNumber,
    /// rPDUIdentSerialNumber
    SerialNumber,
    /// rPDUIdentDeviceNumOutlets
    OutletsCount,
    /// rPDUIdentDevicePowerWatts
    PowerWatts,
    /// rPDULoadDevNumBanks
    BanksCount,
    /// rPDULoadPhaseConfigLowLoadThreshold.1
    LowLoadThreshold,
    /// rPDULoadPhaseConfigNearOverloadThreshold.1
    NearOverloadThreshold,
    /// rPDULoadPhaseConfigOverloadThreshold.1
    OverloadThreshold,
    /// rPDULoadStatusLoad.1, tenths of an amp for the whole device.
    PowerDraw,
    /// rPDULoadStatusLoadState.1
    LoadState,
    /// rPDUOutletDevCommand
    DeviceCommand,
    /// sysDescr
    Description,
    /// sysUpTime, in TimeTicks.
    Uptime,
}

impl Attribute {
    /// Every attribute, in table order.
    pub const ALL: [Attribute; 17] = [
        Attribute::Name,
        Attribute::HardwareRevision,
        Attribute::FirmwareRevision,
        Attribute::ManufactureDate,
        Attribute::ModelNumber,
        Attribute::SerialNumber,
        Attribute::OutletsCount,
        Attribute::PowerWatts,
        Attribute::BanksCount,
        Attribute::LowLoadThreshold,
        Attribute::NearOverloadThreshold,
        Attribute::OverloadThreshold,
        Attribute::PowerDraw,
        Attribute::LoadState,
        Attribute::DeviceCommand,
        Attribute::Description,
        Attribute::Uptime,
    ];

    /// OID of the attribute instance.
    ///
    /// ```
    /// use rack_pdu::catalog::Attribute;
    ///
    /// assert_eq!(Attribute::Name.oid().to_string(), "1.3.6.1.4.1.318.1.1.12.1.1.0");
    /// assert_eq!(Attribute::Uptime.oid().to_string(), "1.3.6.1.2.1.1.3.0");
    /// ```
    pub fn oid(self) -> Oid {
        match self {
            Attribute::Name => rpdu(&[1, 1, 0]),
            Attribute::HardwareRevision => rpdu(&[1, 2, 0]),
            Attribute::FirmwareRevision => rpdu(&[1, 3, 0]),
            Attribute::ManufactureDate => rpdu(&[1, 4, 0]),
            Attribute::ModelNumber => rpdu(&[1, 5, 0]),
            Attribute::SerialNumber => rpdu(&[1, 6, 0]),
            Attribute::OutletsCount => rpdu(&[1, 8, 0]),
            Attribute::PowerWatts => rpdu(&[1, 16, 0]),
            Attribute::BanksCount => rpdu(&[2, 1, 4, 0]),
            Attribute::LowLoadThreshold => rpdu(&[2, 2, 1, 1, 2, 1]),
            Attribute::NearOverloadThreshold => rpdu(&[2, 2, 1, 1, 3, 1]),
            Attribute::OverloadThreshold => rpdu(&[2, 2, 1, 1, 4, 1]),
            Attribute::PowerDraw => bank_load(1),
            Attribute::LoadState => rpdu(&[2, 3, 1, 1, 3, 1]),
            Attribute::DeviceCommand => rpdu(&[3, 1, 1, 0]),
            Attribute::Description => mib2(&[1, 1, 0]),
            Attribute::Uptime => mib2(&[1, 3, 0]),
        }
    }

    /// Short name, as accepted by the command-line tool.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Name => "name",
            Attribute::HardwareRevision => "hardware-revision",
            Attribute::FirmwareRevision => "firmware-revision",
            Attribute::ManufactureDate => "manufacture-date",
            Attribute::ModelNumber => "model-number",
            Attribute::SerialNumber => "serial-number",
            Attribute::OutletsCount => "outlets-count",
            Attribute::PowerWatts => "power-watts",
            Attribute::BanksCount => "banks-count",
            Attribute::LowLoadThreshold => "low-load-threshold",
            Attribute::NearOverloadThreshold => "near-overload-threshold",
            Attribute::OverloadThreshold => "overload-threshold",
            Attribute::PowerDraw => "power-draw",
            Attribute::LoadState => "load-state",
            Attribute::DeviceCommand => "device-command",
            Attribute::Description => "description",
            Attribute::Uptime => "uptime",
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Attribute {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        Attribute::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown attribute '{}'", s))
    }
}

/// rPDUOutletStatusOutletName.`id`
pub fn outlet_name(id: u32) -> Oid {
    rpdu(&[3, 5, 1, 1, 2, id])
}

/// rPDUOutletStatusOutletState.`id`
pub fn outlet_state(id: u32) -> Oid {
    rpdu(&[3, 5, 1, 1, 4, id])
}

/// rPDUOutletControlOutletCommand.`id`
pub fn outlet_command(id: u32) -> Oid {
    rpdu(&[3, 3, 1, 1, 4, id])
}

/// rPDULoadStatusLoad.`bank`; bank 1 is the device total.
pub fn bank_load(bank: u32) -> Oid {
    rpdu(&[2, 3, 1, 1, 2, bank])
}
