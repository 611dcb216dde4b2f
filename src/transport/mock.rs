//! In-memory simulated agent for tests.
//!
//! A [`MockDevice`] holds an OID store and answers GET/SET the way a rack PDU
//! does. Any number of [`MockSession`]s can be opened on one device, which is
//! how a read/write session pair sees its own SETs. Faults can be queued to
//! exercise error paths without a network.

use super::{Response, Session};
use crate::error::{Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::value::Value;
use crate::varbind::VarBind;
use bytes::Bytes;
use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A request as the device received it.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    /// Community of the session that sent it.
    pub community: Bytes,
    pub kind: RequestKind,
}

/// GET or SET payload.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestKind {
    Get(Vec<Oid>),
    Set(Vec<VarBind>),
}

impl RecordedRequest {
    /// OIDs of the request, in order.
    pub fn oids(&self) -> Vec<Oid> {
        match &self.kind {
            RequestKind::Get(oids) => oids.clone(),
            RequestKind::Set(varbinds) => varbinds.iter().map(|vb| vb.oid.clone()).collect(),
        }
    }

    pub fn is_get(&self) -> bool {
        matches!(self.kind, RequestKind::Get(_))
    }

    pub fn is_set(&self) -> bool {
        matches!(self.kind, RequestKind::Set(_))
    }
}

/// How the device orders varbinds in its answers.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ResponseOrder {
    #[default]
    AsRequested,
    Reversed,
    /// `answer[i] = request[perm[i]]`; ignored unless `perm` is a
    /// permutation of the request's indices.
    Permuted(Vec<usize>),
}

/// Failure injected into the next request.
#[derive(Clone, Debug, PartialEq)]
pub enum MockFault {
    /// No answer.
    Timeout,
    /// Socket error.
    Network,
    /// Answer with this error status and index, varbinds echoed.
    Status { status: ErrorStatus, index: i32 },
    /// Answer with this value for the varbind at `position`.
    Exception { position: usize, value: Value },
    /// Drop the last varbind from the answer.
    MissingVarbind,
    /// Append a varbind nobody asked for.
    ExtraVarbind(Oid),
    /// Repeat the first varbind at the end.
    DuplicateVarbind,
}

/// How the device reports an OID it does not have.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingObject {
    /// v2c: a `noSuchInstance` value in place.
    #[default]
    Exception,
    /// v1: `noSuchName` error status naming the varbind.
    NoSuchName,
}

struct DeviceInner {
    target: SocketAddr,
    store: BTreeMap<Oid, Value>,
    requests: Vec<RecordedRequest>,
    faults: VecDeque<MockFault>,
    order: ResponseOrder,
    missing: MissingObject,
}

/// Simulated agent shared by every session opened on it.
///
/// ```rust,ignore
/// use rack_pdu::transport::{MockDevice, Session};
/// use rack_pdu::{Value, oid};
///
/// let device = MockDevice::new("10.0.0.5:161".parse().unwrap())
///     .with_value(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(12345));
/// let session = device.session("public");
///
/// let response = session.get(&[oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)]).await?;
/// assert_eq!(response.varbinds[0].value, Value::TimeTicks(12345));
/// assert_eq!(device.requests().len(), 1);
/// ```
#[derive(Clone)]
pub struct MockDevice {
    inner: Arc<Mutex<DeviceInner>>,
}

impl MockDevice {
    /// Create an empty device answering as `target`.
    pub fn new(target: SocketAddr) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DeviceInner {
                target,
                store: BTreeMap::new(),
                requests: Vec::new(),
                faults: VecDeque::new(),
                order: ResponseOrder::AsRequested,
                missing: MissingObject::Exception,
            })),
        }
    }

    /// Builder form of [`set_value`](Self::set_value).
    pub fn with_value(self, oid: Oid, value: impl Into<Value>) -> Self {
        self.set_value(oid, value);
        self
    }

    /// Store a value.
    pub fn set_value(&self, oid: Oid, value: impl Into<Value>) {
        self.inner.lock().unwrap().store.insert(oid, value.into());
    }

    /// Remove a value so the OID reads as missing.
    pub fn remove_value(&self, oid: &Oid) -> Option<Value> {
        self.inner.lock().unwrap().store.remove(oid)
    }

    /// Current value of an OID.
    pub fn value(&self, oid: &Oid) -> Option<Value> {
        self.inner.lock().unwrap().store.get(oid).cloned()
    }

    /// Queue a fault for the next request (FIFO).
    pub fn queue_fault(&self, fault: MockFault) {
        self.inner.lock().unwrap().faults.push_back(fault);
    }

    /// Set the varbind order of answers.
    pub fn set_order(&self, order: ResponseOrder) {
        self.inner.lock().unwrap().order = order;
    }

    /// Choose how missing OIDs are reported.
    pub fn set_missing(&self, missing: MissingObject) {
        self.inner.lock().unwrap().missing = missing;
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Forget recorded requests.
    pub fn clear_requests(&self) {
        self.inner.lock().unwrap().requests.clear();
    }

    /// Address the device answers as.
    pub fn target(&self) -> SocketAddr {
        self.inner.lock().unwrap().target
    }

    /// Open a session with `community`.
    pub fn session(&self, community: impl Into<Bytes>) -> MockSession {
        MockSession {
            device: self.clone(),
            community: community.into(),
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    fn handle(&self, community: &Bytes, kind: RequestKind) -> Result<Response> {
        let mut inner = self.inner.lock().unwrap();
        let target = inner.target;
        inner.requests.push(RecordedRequest {
            community: community.clone(),
            kind: kind.clone(),
        });
        let fault = inner.faults.pop_front();

        match fault {
            Some(MockFault::Timeout) => {
                return Err(Error::Timeout {
                    target,
                    elapsed: Duration::ZERO,
                    retries: 0,
                }
                .boxed());
            }
            Some(MockFault::Network) => {
                return Err(Error::Network {
                    target,
                    source: std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "simulated network failure",
                    ),
                }
                .boxed());
            }
            _ => {}
        }

        let mut response = match kind {
            RequestKind::Get(oids) => inner.answer_get(oids),
            RequestKind::Set(varbinds) => inner.answer_set(varbinds),
        };

        if !response.is_error() {
            let answer = std::mem::take(&mut response.varbinds);
            response.varbinds = inner.order.apply(answer);
        }

        match fault {
            Some(MockFault::Status { status, index }) => {
                response.error_status = status;
                response.error_index = index;
            }
            Some(MockFault::Exception { position, value }) => {
                if let Some(vb) = response.varbinds.get_mut(position) {
                    vb.value = value;
                }
            }
            Some(MockFault::MissingVarbind) => {
                response.varbinds.pop();
            }
            Some(MockFault::ExtraVarbind(oid)) => {
                response.varbinds.push(VarBind::new(oid, Value::Integer(0)));
            }
            Some(MockFault::DuplicateVarbind) => {
                if let Some(first) = response.varbinds.first().cloned() {
                    response.varbinds.push(first);
                }
            }
            _ => {}
        }

        Ok(response)
    }
}

impl DeviceInner {
    fn answer_get(&self, oids: Vec<Oid>) -> Response {
        let mut varbinds = Vec::with_capacity(oids.len());
        for (i, oid) in oids.into_iter().enumerate() {
            match self.store.get(&oid) {
                Some(value) => varbinds.push(VarBind::new(oid, value.clone())),
                None => match self.missing {
                    MissingObject::Exception => {
                        varbinds.push(VarBind::new(oid, Value::NoSuchInstance))
                    }
                    MissingObject::NoSuchName => {
                        return no_such_name(varbinds, oid, i);
                    }
                },
            }
        }
        Response::ok(varbinds)
    }

    fn answer_set(&mut self, varbinds: Vec<VarBind>) -> Response {
        // All or nothing, like an agent: validate first, then apply.
        if let Some(i) = varbinds
            .iter()
            .position(|vb| !self.store.contains_key(&vb.oid))
        {
            return Response {
                error_status: match self.missing {
                    MissingObject::Exception => ErrorStatus::NoCreation,
                    MissingObject::NoSuchName => ErrorStatus::NoSuchName,
                },
                error_index: i as i32 + 1,
                varbinds,
            };
        }

        for vb in &varbinds {
            self.store.insert(vb.oid.clone(), vb.value.clone());
        }
        Response::ok(varbinds)
    }
}

fn no_such_name(mut answered: Vec<VarBind>, oid: Oid, index: usize) -> Response {
    answered.push(VarBind::null(oid));
    Response {
        error_status: ErrorStatus::NoSuchName,
        error_index: index as i32 + 1,
        varbinds: answered,
    }
}

impl ResponseOrder {
    fn apply(&self, mut varbinds: Vec<VarBind>) -> Vec<VarBind> {
        match self {
            ResponseOrder::AsRequested => varbinds,
            ResponseOrder::Reversed => {
                varbinds.reverse();
                varbinds
            }
            ResponseOrder::Permuted(perm) => {
                let mut seen = vec![false; varbinds.len()];
                let valid = perm.len() == varbinds.len()
                    && perm
                        .iter()
                        .all(|&i| i < seen.len() && !std::mem::replace(&mut seen[i], true));
                if valid {
                    perm.iter().map(|&i| varbinds[i].clone()).collect()
                } else {
                    varbinds
                }
            }
        }
    }
}

#[derive(Default)]
struct SessionState {
    closed: bool,
    close_calls: usize,
    fail_close: bool,
}

/// A session on a [`MockDevice`].
///
/// Clones share the same session state.
#[derive(Clone)]
pub struct MockSession {
    device: MockDevice,
    community: Bytes,
    state: Arc<Mutex<SessionState>>,
}

impl MockSession {
    /// The device behind this session.
    pub fn device(&self) -> &MockDevice {
        &self.device
    }

    /// Make `close` report a network error (the session still closes).
    pub fn fail_close(&self) {
        self.state.lock().unwrap().fail_close = true;
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// How many times `close` has been called.
    pub fn close_calls(&self) -> usize {
        self.state.lock().unwrap().close_calls
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SessionClosed {
                target: self.device.target(),
            }
            .boxed());
        }
        Ok(())
    }
}

impl Session for MockSession {
    async fn get(&self, oids: &[Oid]) -> Result<Response> {
        self.ensure_open()?;
        self.device
            .handle(&self.community, RequestKind::Get(oids.to_vec()))
    }

    async fn set(&self, varbinds: &[VarBind]) -> Result<Response> {
        self.ensure_open()?;
        self.device
            .handle(&self.community, RequestKind::Set(varbinds.to_vec()))
    }

    async fn close(&self) -> Result<()> {
        let fail = {
            let mut state = self.state.lock().unwrap();
            state.closed = true;
            state.close_calls += 1;
            state.fail_close
        };
        if fail {
            return Err(Error::Network {
                target: self.device.target(),
                source: std::io::Error::other("simulated close failure"),
            }
            .boxed());
        }
        Ok(())
    }

    fn peer_addr(&self) -> SocketAddr {
        self.device.target()
    }
}
