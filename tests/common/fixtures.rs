//! A three-outlet PDU with a full identity and metric set.

use rack_pdu::catalog::{self, Attribute};
use rack_pdu::transport::{MockDevice, MockSession};
use rack_pdu::{RackPdu, Value};
use std::net::SocketAddr;

pub const TARGET: &str = "192.0.2.10:161";

pub const OUTLET_NAMES: [&str; 3] = ["Server-A", "db", "server-b"];

/// Outlets 1 and 3 on, outlet 2 off.
pub const OUTLET_STATES: [i32; 3] = [1, 2, 1];

pub fn fixture_device() -> MockDevice {
    let target: SocketAddr = TARGET.parse().unwrap();
    let mut device = MockDevice::new(target)
        .with_value(Attribute::Name.oid(), "rack-7-pdu-a")
        .with_value(Attribute::HardwareRevision.oid(), "HW05")
        .with_value(Attribute::FirmwareRevision.oid(), "v6.5.6")
        .with_value(Attribute::ManufactureDate.oid(), "03/14/2019")
        .with_value(Attribute::ModelNumber.oid(), "AP8941")
        .with_value(Attribute::SerialNumber.oid(), "ZA1911012345")
        .with_value(Attribute::Description.oid(), "APC Web/SNMP Management Card")
        .with_value(Attribute::Uptime.oid(), Value::TimeTicks(12345))
        .with_value(Attribute::OutletsCount.oid(), 3)
        .with_value(Attribute::PowerWatts.oid(), 2300)
        .with_value(Attribute::BanksCount.oid(), 2)
        .with_value(Attribute::LowLoadThreshold.oid(), 1)
        .with_value(Attribute::NearOverloadThreshold.oid(), 13)
        .with_value(Attribute::OverloadThreshold.oid(), 16)
        .with_value(Attribute::PowerDraw.oid(), Value::Gauge32(217))
        .with_value(catalog::bank_load(2), Value::Gauge32(54))
        .with_value(Attribute::LoadState.oid(), 1)
        .with_value(Attribute::DeviceCommand.oid(), 1);

    for (i, (name, state)) in OUTLET_NAMES.iter().zip(OUTLET_STATES).enumerate() {
        let id = i as u32 + 1;
        device = device
            .with_value(catalog::outlet_name(id), *name)
            .with_value(catalog::outlet_state(id), state)
            .with_value(catalog::outlet_command(id), state);
    }
    device
}

/// A facade over `device` with the usual community pair.
pub fn fixture_pdu(device: &MockDevice) -> RackPdu<MockSession> {
    RackPdu::from_sessions(device.session("public"), device.session("private"))
}
