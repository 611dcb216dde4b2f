//! In-process UDP agent backed by a `MockDevice`.
//!
//! Each datagram is decoded as a community message and dispatched to a
//! session on the device opened with the message's community. Faults queued
//! on the device apply as usual; `Timeout` and `Network` faults become
//! silence.

use bytes::Bytes;
use rack_pdu::message::CommunityMessage;
use rack_pdu::pdu::{Pdu, PduType};
use rack_pdu::Version;
use rack_pdu::transport::{MockDevice, Response, Session};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Controls {
    received: AtomicUsize,
    drop_next: AtomicUsize,
    stale_first: AtomicBool,
    garbage_first: AtomicBool,
    other_version_first: AtomicBool,
}

pub struct TestAgent {
    addr: SocketAddr,
    device: MockDevice,
    controls: Arc<Controls>,
    task: JoinHandle<()>,
}

impl TestAgent {
    /// Bind on localhost and start answering from `device`.
    pub async fn start(device: MockDevice) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test agent");
        let addr = socket.local_addr().unwrap();
        let controls = Arc::new(Controls::default());

        let task = tokio::spawn(serve(socket, device.clone(), controls.clone()));

        Self {
            addr,
            device,
            controls,
            task,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `host:port` string for builders.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn device(&self) -> &MockDevice {
        &self.device
    }

    /// Datagrams decoded so far, dropped ones included.
    pub fn received(&self) -> usize {
        self.controls.received.load(Ordering::SeqCst)
    }

    /// Ignore the next `n` requests.
    pub fn drop_next(&self, n: usize) {
        self.controls.drop_next.store(n, Ordering::SeqCst);
    }

    /// Precede the next answer with a datagram that is not an SNMP message.
    pub fn send_garbage_first(&self) {
        self.controls.garbage_first.store(true, Ordering::SeqCst);
    }

    /// Precede the next answer with a copy in the other community version.
    pub fn send_other_version_first(&self) {
        self.controls.other_version_first.store(true, Ordering::SeqCst);
    }

    /// Precede the next answer with one carrying a different request id.
    pub fn send_stale_first(&self) {
        self.controls.stale_first.store(true, Ordering::SeqCst);
    }
}

impl Drop for TestAgent {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(socket: UdpSocket, device: MockDevice, controls: Arc<Controls>) {
    let mut buf = vec![0u8; 65_535];
    loop {
        let Ok((len, source)) = socket.recv_from(&mut buf).await else {
            return;
        };
        let Ok(message) = CommunityMessage::decode(Bytes::copy_from_slice(&buf[..len]), source)
        else {
            continue;
        };
        controls.received.fetch_add(1, Ordering::SeqCst);

        let dropping = controls
            .drop_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if dropping {
            continue;
        }

        let session = device.session(message.community.clone());
        let request = &message.pdu;
        let answer = match request.pdu_type {
            PduType::GetRequest => {
                let oids: Vec<_> = request.varbinds.iter().map(|vb| vb.oid.clone()).collect();
                session.get(&oids).await
            }
            PduType::SetRequest => session.set(&request.varbinds).await,
            PduType::Response => continue,
        };
        let Ok(answer) = answer else {
            continue;
        };

        if controls.garbage_first.swap(false, Ordering::SeqCst) {
            let _ = socket.send_to(&[0x30, 0x05, 0x02, 0x01], source).await;
        }
        if controls.other_version_first.swap(false, Ordering::SeqCst) {
            let other = match message.version {
                Version::V1 => Version::V2c,
                _ => Version::V1,
            };
            let mut pdu = Pdu::response(request.request_id, answer.varbinds.clone());
            pdu.error_status = answer.error_status.as_i32();
            pdu.error_index = answer.error_index;
            let foreign = CommunityMessage::new(other, message.community.clone(), pdu).encode();
            let _ = socket.send_to(&foreign, source).await;
        }
        if controls.stale_first.swap(false, Ordering::SeqCst) {
            let stale = encode(&message, request.request_id.wrapping_add(1), answer.clone());
            let _ = socket.send_to(&stale, source).await;
        }
        let reply = encode(&message, request.request_id, answer);
        let _ = socket.send_to(&reply, source).await;
    }
}

fn encode(request: &CommunityMessage, request_id: i32, answer: Response) -> Bytes {
    let mut pdu = Pdu::response(request_id, answer.varbinds);
    pdu.error_status = answer.error_status.as_i32();
    pdu.error_index = answer.error_index;
    CommunityMessage::new(request.version, request.community.clone(), pdu).encode()
}
