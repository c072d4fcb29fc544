//
// Copyright (c) 2023 ZettaScale Technology
//
// This program and the accompanying materials are made available under the
// terms of the Eclipse Public License 2.0 which is available at
// http://www.eclipse.org/legal/epl-2.0, or the Apache License, Version 2.0
// which is available at https://www.apache.org/licenses/LICENSE-2.0.
//
// SPDX-License-Identifier: EPL-2.0 OR Apache-2.0
//
// Contributors:
//   ZettaScale Zenoh Team, <zenoh@zettascale.tech>
//
#![allow(dead_code)]
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    time::{Duration, Instant},
};

use flume::{Receiver, RecvTimeoutError, Sender};
use zpico::{
    config::Config,
    transport::{Link, TransportPeer},
    Session, WhatAmI, ZenohId,
};
use zpico_codec::transport::batch;
use zpico_core::zlock;
use zpico_protocol::{
    core::{Encoding, Reliability, WireExpr},
    network::{push, NetworkMessage, Push},
    transport::{BatchSize, Frame, TransportBody, TransportSn},
    zenoh::{self, PushBody},
};
use zpico_result::{errno, zerror, ZResult};

pub const TIMEOUT: Duration = Duration::from_secs(10);
pub const SLEEP: Duration = Duration::from_millis(100);

pub fn push(key: &str, payload: &str) -> Push {
    Push {
        wire_expr: WireExpr::from(key.to_string()),
        ext_qos: push::ext::QoSType::PUSH,
        ext_tstamp: None,
        ext_nodeid: push::ext::NodeIdType::DEFAULT,
        payload: PushBody::Put(zenoh::Put {
            timestamp: None,
            encoding: Encoding::empty(),
            ext_sinfo: None,
            ext_unknown: vec![],
            payload: payload.into(),
        }),
    }
}

/// One end of an in-memory datagram link.
pub struct LoopbackLink {
    tx: Mutex<Option<Sender<Vec<u8>>>>,
    rx: Receiver<Vec<u8>>,
    closed: AtomicBool,
}

impl LoopbackLink {
    pub fn pair() -> (LoopbackLink, LoopbackLink) {
        let (a_tx, b_rx) = flume::unbounded();
        let (b_tx, a_rx) = flume::unbounded();
        let new = |tx, rx| LoopbackLink {
            tx: Mutex::new(Some(tx)),
            rx,
            closed: AtomicBool::new(false),
        };
        (new(a_tx, a_rx), new(b_tx, b_rx))
    }

    fn recv_timeout(&self, timeout: Duration) -> Option<Vec<u8>> {
        self.rx.recv_timeout(timeout).ok()
    }
}

impl Link for LoopbackLink {
    fn read(&self, buffer: &mut [u8]) -> ZResult<usize> {
        while !self.closed.load(Ordering::Acquire) {
            match self.rx.recv_timeout(Duration::from_millis(10)) {
                Ok(datagram) => {
                    let n = datagram.len().min(buffer.len());
                    buffer[..n].copy_from_slice(&datagram[..n]);
                    return Ok(n);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }
        Ok(0)
    }

    fn write_all(&self, buffer: &[u8]) -> ZResult<()> {
        let tx = zlock!(self.tx);
        let tx = tx
            .as_ref()
            .ok_or_else(|| zerror!((errno::LINK_ERROR) "Loopback link closed"))?;
        tx.send(buffer.to_vec())
            .map_err(|e| zerror!((errno::LINK_ERROR) "Loopback link closed: {}", e))?;
        Ok(())
    }

    fn close(&self) -> ZResult<()> {
        self.closed.store(true, Ordering::Release);
        zlock!(self.tx).take();
        Ok(())
    }

    fn is_streamed(&self) -> bool {
        false
    }

    fn mtu(&self) -> BatchSize {
        BatchSize::MAX
    }
}

/// The remote side of a session, driven by the test.
pub struct FakePeer {
    pub zid: ZenohId,
    link: LoopbackLink,
    sn: Mutex<TransportSn>,
    pending: Mutex<VecDeque<NetworkMessage>>,
    closed: AtomicBool,
}

impl FakePeer {
    pub fn send<M: Into<NetworkMessage>>(&self, msg: M) {
        let mut sn = zlock!(self.sn);
        let frame = Frame {
            reliability: Reliability::Reliable,
            sn: *sn,
            payload: vec![msg.into()],
        };
        *sn = sn.wrapping_add(1);
        let batch = batch::serialize(&[frame.into()], false, BatchSize::MAX).unwrap();
        self.link.write_all(&batch).unwrap();
    }

    /// The next network message sent by the session, keep-alives skipped.
    pub fn recv(&self, timeout: Duration) -> Option<NetworkMessage> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(msg) = zlock!(self.pending).pop_front() {
                return Some(msg);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let datagram = self.link.recv_timeout(deadline - now)?;
            for msg in batch::deserialize(&datagram).unwrap() {
                match msg.body {
                    TransportBody::Frame(frame) => zlock!(self.pending).extend(frame.payload),
                    TransportBody::Close(_) => self.closed.store(true, Ordering::Release),
                    TransportBody::KeepAlive(_) => {}
                }
            }
        }
    }

    /// Skip messages until one for which `f` returns something.
    pub fn expect<T, F>(&self, mut f: F) -> T
    where
        F: FnMut(NetworkMessage) -> Option<T>,
    {
        let deadline = Instant::now() + TIMEOUT;
        while let Some(msg) = self.recv(deadline.saturating_duration_since(Instant::now())) {
            if let Some(t) = f(msg) {
                return t;
            }
        }
        panic!("Timed out waiting for a message");
    }

    /// Collect what the session sends during `duration`.
    pub fn drain(&self, duration: Duration) -> Vec<NetworkMessage> {
        let deadline = Instant::now() + duration;
        let mut msgs = Vec::new();
        while let Some(msg) = self.recv(deadline.saturating_duration_since(Instant::now())) {
            msgs.push(msg);
        }
        msgs
    }

    /// Whether the session sent a `Close`.
    pub fn got_close(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drop the link without any `Close`.
    pub fn disconnect(&self) {
        let _ = self.link.close();
    }
}

pub fn open_session(config: Config) -> (Session, FakePeer) {
    zpico::try_init_log_from_env();
    let (ours, theirs) = LoopbackLink::pair();
    let peer = FakePeer {
        zid: ZenohId::rand(),
        link: theirs,
        sn: Mutex::new(0),
        pending: Mutex::new(VecDeque::new()),
        closed: AtomicBool::new(false),
    };
    let session = zpico::open(
        config,
        ours,
        TransportPeer {
            zid: peer.zid,
            whatami: WhatAmI::Router,
        },
    )
    .unwrap();
    (session, peer)
}
