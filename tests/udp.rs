//! `UdpSession` against a local agent.

mod common;

use common::{TestAgent, fixture_device};
use rack_pdu::catalog::Attribute;
use rack_pdu::transport::{MockFault, Session};
use rack_pdu::{Error, ErrorStatus, SessionConfig, UdpSession, Value, VarBind, Version};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;

fn config(community: &'static str) -> SessionConfig {
    SessionConfig {
        version: Version::V2c,
        timeout: Duration::from_millis(300),
        retries: 0,
        ..SessionConfig::new(community)
    }
}

#[tokio::test]
async fn get_over_udp() {
    let agent = TestAgent::start(fixture_device()).await;
    let session = UdpSession::open(agent.addr(), config("public")).await.unwrap();

    let response = session
        .get(&[Attribute::Name.oid(), Attribute::Uptime.oid()])
        .await
        .unwrap();
    assert!(!response.is_error());
    assert_eq!(
        response.varbinds,
        vec![
            VarBind::new(Attribute::Name.oid(), "rack-7-pdu-a".into()),
            VarBind::new(Attribute::Uptime.oid(), Value::TimeTicks(12345)),
        ]
    );
    assert_eq!(session.peer_addr(), agent.addr());
}

#[tokio::test]
async fn v1_messages() {
    let agent = TestAgent::start(fixture_device()).await;
    let config = SessionConfig {
        version: Version::V1,
        ..config("public")
    };
    let session = UdpSession::open(agent.addr(), config).await.unwrap();

    let response = session.get(&[Attribute::OutletsCount.oid()]).await.unwrap();
    assert_eq!(response.varbinds[0].value, Value::Integer(3));
}

#[tokio::test]
async fn set_over_udp_reports_error_status() {
    let agent = TestAgent::start(fixture_device()).await;
    let session = UdpSession::open(agent.addr(), config("private")).await.unwrap();

    let response = session
        .set(&[VarBind::new(
            rack_pdu::catalog::outlet_command(40),
            Value::Integer(1),
        )])
        .await
        .unwrap();
    assert_eq!(response.error_status, ErrorStatus::NoCreation);
    assert_eq!(response.error_index, 1);
    assert_eq!(agent.device().requests()[0].community, "private");
}

#[tokio::test]
async fn retries_after_lost_request() {
    let agent = TestAgent::start(fixture_device()).await;
    agent.drop_next(1);
    let config = SessionConfig {
        timeout: Duration::from_millis(150),
        retries: 1,
        ..config("public")
    };
    let session = UdpSession::open(agent.addr(), config).await.unwrap();

    let response = session.get(&[Attribute::Name.oid()]).await.unwrap();
    assert_eq!(response.varbinds.len(), 1);
    assert_eq!(agent.received(), 2);
}

#[tokio::test]
async fn timeout_after_retries() {
    let agent = TestAgent::start(fixture_device()).await;
    agent.device().queue_fault(MockFault::Timeout);
    agent.device().queue_fault(MockFault::Timeout);
    agent.device().queue_fault(MockFault::Timeout);
    let config = SessionConfig {
        timeout: Duration::from_millis(100),
        retries: 2,
        ..config("public")
    };
    let session = UdpSession::open(agent.addr(), config).await.unwrap();

    let start = Instant::now();
    let err = session.get(&[Attribute::Name.oid()]).await.unwrap_err();
    let elapsed = start.elapsed();

    match *err {
        Error::Timeout {
            target, retries, ..
        } => {
            assert_eq!(target, agent.addr());
            assert_eq!(retries, 2);
        }
        ref other => panic!("unexpected {other:?}"),
    }
    assert!(err.is_transport());
    assert_eq!(agent.received(), 3);
    assert!(elapsed >= Duration::from_millis(250));
    assert!(elapsed < Duration::from_secs(2));
}

#[tokio::test]
async fn stale_answers_are_discarded() {
    let agent = TestAgent::start(fixture_device()).await;
    agent.send_stale_first();
    let session = UdpSession::open(agent.addr(), config("public")).await.unwrap();

    let response = session.get(&[Attribute::ModelNumber.oid()]).await.unwrap();
    assert_eq!(response.varbinds[0].value, Value::from("AP8941"));
}

#[tokio::test]
async fn close_is_idempotent_and_final() {
    let agent = TestAgent::start(fixture_device()).await;
    let session = UdpSession::open(agent.addr(), config("public")).await.unwrap();

    session.close().await.unwrap();
    session.close().await.unwrap();

    let err = session.get(&[Attribute::Name.oid()]).await.unwrap_err();
    assert!(matches!(*err, Error::SessionClosed { .. }));
    assert_eq!(agent.received(), 0);
}

#[tokio::test]
async fn undecodable_datagrams_are_discarded() {
    let agent = TestAgent::start(fixture_device()).await;
    agent.send_garbage_first();
    let session = UdpSession::open(agent.addr(), config("public")).await.unwrap();

    let response = session.get(&[Attribute::SerialNumber.oid()]).await.unwrap();
    assert_eq!(response.varbinds[0].value, Value::from("ZA1911012345"));
}

#[tokio::test]
async fn other_version_answers_are_discarded() {
    let agent = TestAgent::start(fixture_device()).await;
    agent.device().set_value(Attribute::Name.oid(), "renamed");
    agent.send_other_version_first();
    let session = UdpSession::open(agent.addr(), config("public")).await.unwrap();

    let response = session.get(&[Attribute::Name.oid()]).await.unwrap();
    assert_eq!(response.varbinds[0].value, Value::from("renamed"));
    assert_eq!(agent.received(), 1);
}

#[tokio::test]
async fn close_cancels_pending_request() {
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let config = SessionConfig {
        timeout: Duration::from_secs(5),
        retries: 0,
        ..config("public")
    };
    let session = Arc::new(
        UdpSession::open(silent.local_addr().unwrap(), config)
            .await
            .unwrap(),
    );

    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.get(&[Attribute::Name.oid()]).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let start = Instant::now();
    tokio::time::timeout(Duration::from_secs(1), session.close())
        .await
        .expect("close waited for the pending request")
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(*err, Error::SessionClosed { .. }));
    assert!(err.is_transport());
}

#[tokio::test]
async fn close_releases_waiting_callers() {
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let config = SessionConfig {
        timeout: Duration::from_secs(5),
        retries: 0,
        ..config("public")
    };
    let session = Arc::new(
        UdpSession::open(silent.local_addr().unwrap(), config)
            .await
            .unwrap(),
    );

    let callers: Vec<_> = (0..3)
        .map(|_| {
            let session = session.clone();
            tokio::spawn(async move { session.get(&[Attribute::Uptime.oid()]).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.close().await.unwrap();

    for caller in callers {
        let err = tokio::time::timeout(Duration::from_secs(1), caller)
            .await
            .expect("caller still waiting after close")
            .unwrap()
            .unwrap_err();
        assert!(matches!(*err, Error::SessionClosed { .. }));
    }
}
