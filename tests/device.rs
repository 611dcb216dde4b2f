//! Facade behavior against the simulated device.

mod common;

use common::fixtures::OUTLET_NAMES;
use common::{fixture_device, fixture_pdu};
use rack_pdu::catalog::{self, Attribute};
use rack_pdu::transport::{MissingObject, MockFault, RequestKind};
use rack_pdu::{
    DeviceCommand, Error, ErrorStatus, LoadState, LoadThresholds, OutletCommand, OutletState,
    Reading, StringMode, Value, VarBind, VarbindFault,
};

#[tokio::test]
async fn identity_getters() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    assert_eq!(pdu.get_name().await.unwrap(), "rack-7-pdu-a");
    assert_eq!(pdu.get_hardware_revision().await.unwrap(), "HW05");
    assert_eq!(pdu.get_firmware_revision().await.unwrap(), "v6.5.6");
    assert_eq!(pdu.get_manufacture_date().await.unwrap(), "03/14/2019");
    assert_eq!(pdu.get_model_number().await.unwrap(), "AP8941");
    assert_eq!(pdu.get_serial_number().await.unwrap(), "ZA1911012345");
    assert_eq!(
        pdu.get_description().await.unwrap(),
        "APC Web/SNMP Management Card"
    );

    // Reads only ever go through the read community.
    assert!(device.requests().iter().all(|r| r.community == "public"));
}

#[tokio::test]
async fn uptime_is_reported_in_milliseconds() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);
    assert_eq!(pdu.get_uptime().await.unwrap(), 123_450);
}

#[tokio::test]
async fn power_draw_is_reported_in_amps() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);
    assert_eq!(pdu.get_power_draw().await.unwrap(), 21.7);
    assert_eq!(pdu.get_bank_load(2).await.unwrap(), 5.4);
    assert_eq!(pdu.get_power_watts().await.unwrap(), 2300);
    assert_eq!(pdu.get_banks_count().await.unwrap(), 2);
}

#[tokio::test]
async fn bank_zero_is_rejected_without_traffic() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    let err = pdu.get_bank_load(0).await.unwrap_err();
    assert!(matches!(*err, Error::InvalidBank { bank: 0 }));
    assert!(device.requests().is_empty());
}

#[tokio::test]
async fn load_state_and_thresholds() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    assert_eq!(pdu.get_load_state().await.unwrap(), LoadState::Normal);
    device.set_value(Attribute::LoadState.oid(), 4);
    assert_eq!(pdu.get_load_state().await.unwrap(), LoadState::Overload);

    device.clear_requests();
    assert_eq!(
        pdu.get_load_thresholds().await.unwrap(),
        LoadThresholds {
            low: 1,
            near_overload: 13,
            overload: 16,
        }
    );
    // One batch for all three thresholds.
    let requests = device.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].oids().len(), 3);
}

#[tokio::test]
async fn unknown_load_state_is_an_unexpected_value() {
    let device = fixture_device();
    device.set_value(Attribute::LoadState.oid(), 9);
    let pdu = fixture_pdu(&device);

    let err = pdu.get_load_state().await.unwrap_err();
    assert!(matches!(*err, Error::UnexpectedValue { .. }));
    assert_eq!(err.oid(), Some(&Attribute::LoadState.oid()));
}

#[tokio::test]
async fn string_where_integer_expected() {
    let device = fixture_device();
    device.set_value(Attribute::OutletsCount.oid(), "three");
    let pdu = fixture_pdu(&device);

    let err = pdu.get_outlets_count().await.unwrap_err();
    match *err {
        Error::UnexpectedValue { ref oid, expected } => {
            assert_eq!(*oid, Attribute::OutletsCount.oid());
            assert_eq!(expected, "integer");
        }
        ref other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn outlets_names_keys_run_from_one_to_count() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    let names = pdu.get_outlets_names().await.unwrap();
    assert_eq!(names.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(names.values().cloned().collect::<Vec<_>>(), OUTLET_NAMES);

    // Count first, then one batch for every name.
    let requests = device.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].oids(), vec![Attribute::OutletsCount.oid()]);
    assert_eq!(
        requests[1].oids(),
        (1..=3).map(catalog::outlet_name).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn outlets_states() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    let states = pdu.get_outlets_states().await.unwrap();
    assert_eq!(states[&1], OutletState::On);
    assert_eq!(states[&2], OutletState::Off);
    assert_eq!(states[&3], OutletState::On);

    assert_eq!(pdu.get_outlet_state(2).await.unwrap(), OutletState::Off);
    assert_eq!(pdu.get_outlet_name(3).await.unwrap(), "server-b");
}

#[tokio::test]
async fn zero_outlets_is_one_round_trip() {
    let device = fixture_device();
    device.set_value(Attribute::OutletsCount.oid(), 0);
    let pdu = fixture_pdu(&device);

    assert!(pdu.get_outlets_names().await.unwrap().is_empty());
    assert_eq!(device.requests().len(), 1);
}

#[tokio::test]
async fn outlet_removed_between_count_and_batch() {
    let device = fixture_device();
    device.set_value(Attribute::OutletsCount.oid(), 4);
    let pdu = fixture_pdu(&device);

    let err = pdu.get_outlets_names().await.unwrap_err();
    assert!(err.is_missing_object());
    assert_eq!(err.oid(), Some(&catalog::outlet_name(4)));

    // A v1 agent reports the same race through noSuchName.
    device.set_missing(MissingObject::NoSuchName);
    let err = pdu.get_outlets_states().await.unwrap_err();
    assert!(err.is_missing_object());
    match *err {
        Error::Varbind { fault, .. } => {
            assert_eq!(fault, VarbindFault::Status(ErrorStatus::NoSuchName))
        }
        ref other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn outlet_zero_is_invalid() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    let err = pdu.get_outlet_state(0).await.unwrap_err();
    assert!(matches!(*err, Error::InvalidOutlet { id: 0 }));
    let err = pdu
        .run_outlets_command(OutletCommand::ImmediateOn, &[2, 0])
        .await
        .unwrap_err();
    assert!(matches!(*err, Error::InvalidOutlet { id: 0 }));
    assert!(device.requests().is_empty());
}

#[tokio::test]
async fn command_on_all_outlets_is_one_set() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    let accepted = pdu
        .run_outlets_command(OutletCommand::ImmediateOff, &[])
        .await
        .unwrap();
    assert_eq!(accepted, vec![2, 2, 2]);

    let requests = device.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].is_get());
    assert_eq!(requests[1].community, "private");
    match &requests[1].kind {
        RequestKind::Set(varbinds) => {
            let expected: Vec<VarBind> = (1..=3)
                .map(|id| VarBind::new(catalog::outlet_command(id), Value::Integer(2)))
                .collect();
            assert_eq!(*varbinds, expected);
        }
        other => panic!("expected a SET, got {other:?}"),
    }
}

#[tokio::test]
async fn command_on_selected_outlets_keeps_order() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    let accepted = pdu
        .run_outlets_command(OutletCommand::ImmediateOn, &[3, 1])
        .await
        .unwrap();
    assert_eq!(accepted, vec![1, 1]);
    assert_eq!(
        device.requests()[0].oids(),
        vec![catalog::outlet_command(3), catalog::outlet_command(1)]
    );
}

#[tokio::test]
async fn device_command() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    let accepted = pdu
        .run_device_command(DeviceCommand::ImmediateAllReboot)
        .await
        .unwrap();
    assert_eq!(accepted, 4);
    assert_eq!(
        device.value(&Attribute::DeviceCommand.oid()),
        Some(Value::Integer(4))
    );
}

#[tokio::test]
async fn refused_command_names_the_oid() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    let err = pdu
        .run_outlets_command(OutletCommand::ImmediateOn, &[1, 9])
        .await
        .unwrap_err();
    match *err {
        Error::Varbind { ref oid, fault, .. } => {
            assert_eq!(*oid, catalog::outlet_command(9));
            assert_eq!(fault, VarbindFault::Status(ErrorStatus::NoCreation));
        }
        ref other => panic!("unexpected {other:?}"),
    }
    // All or nothing.
    assert_eq!(
        device.value(&catalog::outlet_command(1)),
        Some(Value::Integer(1))
    );
}

#[tokio::test]
async fn pattern_reboot() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    let rebooted = pdu.reboot_matching(&["^Server"]).await.unwrap();
    assert_eq!(rebooted, vec!["Server-A", "server-b"]);

    let sets: Vec<_> = device.requests().into_iter().filter(|r| r.is_set()).collect();
    assert_eq!(sets.len(), 1);
    match &sets[0].kind {
        RequestKind::Set(varbinds) => {
            assert_eq!(
                *varbinds,
                vec![
                    VarBind::new(catalog::outlet_command(1), Value::Integer(3)),
                    VarBind::new(catalog::outlet_command(3), Value::Integer(3)),
                ]
            );
        }
        other => panic!("expected a SET, got {other:?}"),
    }
}

#[tokio::test]
async fn overlapping_patterns_reboot_once() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    let rebooted = pdu.reboot_matching(&["server", "-a$", "^db"]).await.unwrap();
    assert_eq!(rebooted, vec!["Server-A", "db", "server-b"]);

    let sets: Vec<_> = device.requests().into_iter().filter(|r| r.is_set()).collect();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].oids().len(), 3);
}

#[tokio::test]
async fn no_match_sends_no_set() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    assert!(pdu.reboot_matching(&["^nothing"]).await.unwrap().is_empty());
    assert!(device.requests().iter().all(|r| r.is_get()));
}

#[tokio::test]
async fn is_alive_on_any_value() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);
    assert!(pdu.is_alive().await);

    device.set_value(Attribute::Name.oid(), 42);
    assert!(pdu.is_alive().await);

    device.queue_fault(MockFault::Timeout);
    assert!(!pdu.is_alive().await);

    device.remove_value(&Attribute::Name.oid());
    assert!(!pdu.is_alive().await);
}

#[tokio::test]
async fn raw_query_and_bytes() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    let raw = pdu.get_raw(&Attribute::SerialNumber.oid()).await.unwrap();
    assert_eq!(&raw[..], b"ZA1911012345");

    let readings = pdu
        .query(
            &[Attribute::Name.oid(), Attribute::Uptime.oid()],
            StringMode::Raw,
        )
        .await
        .unwrap();
    assert_eq!(
        readings,
        vec![
            Reading::Octets(bytes::Bytes::from_static(b"rack-7-pdu-a")),
            Reading::Integer(12345),
        ]
    );
}

#[tokio::test]
async fn closed_device_reports_transport_error() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);

    pdu.close().await.unwrap();
    let err = pdu.get_name().await.unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(*err, Error::SessionClosed { .. }));

    let err = pdu
        .run_device_command(DeviceCommand::ImmediateAllOn)
        .await
        .unwrap_err();
    assert!(matches!(*err, Error::SessionClosed { .. }));
    assert!(device.requests().is_empty());
}

#[tokio::test]
async fn close_attempts_both_sessions() {
    let device = fixture_device();
    let pdu = fixture_pdu(&device);
    pdu.sessions().read().fail_close();

    assert!(pdu.close().await.is_err());
    assert!(pdu.sessions().read().is_closed());
    assert!(pdu.sessions().write().is_closed());
}
