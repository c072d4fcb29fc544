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
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, Weak,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use zpico_codec::transport::batch;
use zpico_core::zlock;
use zpico_protocol::{
    core::Reliability,
    network::{
        interest::Interest, Declare, NetworkBody, NetworkMessage, Push, Request, Response,
        ResponseFinal,
    },
    transport::{
        close::{self, reason_to_str},
        BatchSize, Close, Frame, KeepAlive, TransportBody, TransportMessage, TransportSn,
    },
};
use zpico_result::{bail, errno, zerror, ZResult};

use super::{Link, TransportPeer, TransportPeerEventHandler};
use crate::{
    config::{defaults, Config, TaskConf},
    net::primitives::Primitives,
};

#[derive(Default)]
struct TransportTx {
    sn_reliable: TransportSn,
    sn_best_effort: TransportSn,
}

impl TransportTx {
    fn next(&mut self, reliability: Reliability, mask: TransportSn) -> TransportSn {
        let sn = match reliability {
            Reliability::Reliable => &mut self.sn_reliable,
            Reliability::BestEffort => &mut self.sn_best_effort,
        };
        let current = *sn;
        *sn = sn.wrapping_add(1) & mask;
        current
    }
}

pub(crate) struct TransportUnicast {
    link: Arc<dyn Link>,
    peer: TransportPeer,
    batch_size: BatchSize,
    sn_mask: TransportSn,
    lease: Duration,
    keep_alive: Duration,
    // Held while writing so that frames leave in sequence number order
    tx: Mutex<TransportTx>,
    transmitted: AtomicBool,
    received: AtomicBool,
    alive: AtomicBool,
    callback: Weak<dyn TransportPeerEventHandler>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TransportUnicast {
    pub(crate) fn new(
        config: &Config,
        link: Arc<dyn Link>,
        peer: TransportPeer,
        callback: Weak<dyn TransportPeerEventHandler>,
    ) -> Arc<Self> {
        let batch_size = config.transport.batch_size.min(link.mtu());
        Arc::new(Self {
            link,
            peer,
            batch_size,
            sn_mask: config.sn_mask(),
            lease: config.lease(),
            keep_alive: config.keep_alive_interval(),
            tx: Mutex::new(TransportTx::default()),
            transmitted: AtomicBool::new(false),
            received: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            callback,
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Spawn the read and lease tasks.
    pub(crate) fn start(self: &Arc<Self>, config: &Config) -> ZResult<()> {
        let t = self.clone();
        let read = spawn(&config.tasks.read, defaults::READ_TASK_NAME, move || {
            if let Err(e) = t.read_loop() {
                if t.is_alive() {
                    tracing::warn!("Read task of transport with {} failed: {}", t.peer, e);
                }
            }
            t.delete();
        })?;
        zlock!(self.tasks).push(read);

        let t = self.clone();
        let lease = spawn(&config.tasks.lease, defaults::LEASE_TASK_NAME, move || {
            t.lease_loop()
        })?;
        zlock!(self.tasks).push(lease);
        Ok(())
    }

    fn write(&self, msg: TransportMessage) -> ZResult<()> {
        let batch = batch::serialize(&[msg], self.link.is_streamed(), self.batch_size)
            .map_err(|_| zerror!((errno::MALFORMED_MESSAGE) "Message does not fit a batch of {} bytes", self.batch_size))?;
        self.link
            .write_all(&batch)
            .map_err(|e| zerror!((errno::LINK_ERROR) e => "Unable to write to {}", self.peer))?;
        self.transmitted.store(true, Ordering::Release);
        Ok(())
    }

    fn send_network(&self, body: NetworkBody, reliability: Reliability) -> ZResult<()> {
        if !self.is_alive() {
            bail!((errno::SESSION_CLOSED) "Transport with {} is closed", self.peer);
        }
        let msg = NetworkMessage { body, reliability };
        tracing::trace!("Sending {} to {}", msg, self.peer);

        let mut tx = zlock!(self.tx);
        let frame = Frame {
            reliability,
            sn: tx.next(reliability, self.sn_mask),
            payload: vec![msg],
        };
        self.write(frame.into())
    }

    fn read_loop(&self) -> ZResult<()> {
        let streamed = self.link.is_streamed();
        let mut buffer = vec![0_u8; BatchSize::MAX as usize];
        let mut expected_sn: Option<TransportSn> = None;

        while self.is_alive() {
            let n = if streamed {
                let mut len = [0_u8; batch::LENGTH_BYTES];
                self.link.read_exact(&mut len)?;
                let n = batch::decode_len(len);
                self.link.read_exact(&mut buffer[..n])?;
                n
            } else {
                self.link.read(&mut buffer)?
            };
            if n == 0 {
                bail!((errno::LINK_ERROR) "Link with {} closed", self.peer);
            }
            self.received.store(true, Ordering::Release);

            let msgs = match batch::deserialize(&buffer[..n]) {
                Ok(msgs) => msgs,
                Err(_) => {
                    tracing::warn!("Dropping malformed batch of {} bytes from {}", n, self.peer);
                    continue;
                }
            };
            for msg in msgs {
                match msg.body {
                    TransportBody::Frame(frame) => {
                        if frame.reliability == Reliability::Reliable {
                            if let Some(sn) = expected_sn.filter(|sn| *sn != frame.sn) {
                                tracing::debug!(
                                    "Frame from {} out of sequence: expected {}, got {}",
                                    self.peer,
                                    sn,
                                    frame.sn
                                );
                            }
                            expected_sn = Some(frame.sn.wrapping_add(1) & self.sn_mask);
                        }
                        self.dispatch(frame.payload);
                    }
                    TransportBody::KeepAlive(_) => {}
                    TransportBody::Close(Close { reason, .. }) => {
                        bail!((errno::LINK_ERROR) "Closed by {}: {}", self.peer, reason_to_str(reason))
                    }
                }
            }
        }
        Ok(())
    }

    fn dispatch(&self, msgs: Vec<NetworkMessage>) {
        let Some(callback) = self.callback.upgrade() else {
            return;
        };
        for msg in msgs {
            tracing::trace!("Received {} from {}", msg, self.peer);
            if let Err(e) = callback.handle_message(msg) {
                tracing::debug!("Error handling message from {}: {}", self.peer, e);
            }
        }
    }

    fn lease_loop(&self) {
        let mut last_rx = Instant::now();
        while self.is_alive() {
            let wake = Instant::now() + self.keep_alive;
            while self.is_alive() {
                let now = Instant::now();
                if now >= wake {
                    break;
                }
                thread::park_timeout(wake - now);
            }
            if !self.is_alive() {
                break;
            }

            if !self.transmitted.swap(false, Ordering::AcqRel) {
                // Keep the tx lock so the keep-alive does not interleave with a frame
                let _tx = zlock!(self.tx);
                if let Err(e) = self.write(KeepAlive.into()) {
                    tracing::debug!("Unable to send keep-alive to {}: {}", self.peer, e);
                }
            }

            if let Some(callback) = self.callback.upgrade() {
                callback.tick();
            }

            if self.received.swap(false, Ordering::AcqRel) {
                last_rx = Instant::now();
            } else if last_rx.elapsed() >= self.lease {
                tracing::warn!(
                    "Transport with {} expired after {} milliseconds",
                    self.peer,
                    self.lease.as_millis()
                );
                if let Err(e) = self.close(close::reason::EXPIRED) {
                    tracing::debug!("{}", e);
                }
                self.notify_closed();
            }
        }
    }

    fn notify_closed(&self) {
        if let Some(callback) = self.callback.upgrade() {
            callback.closed();
        }
    }

    /// Tear the transport down after a link failure and tell the session.
    fn delete(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            if let Err(e) = self.link.close() {
                tracing::debug!("Error closing link with {}: {}", self.peer, e);
            }
            self.unpark_tasks();
            self.notify_closed();
        }
    }

    fn unpark_tasks(&self) {
        for task in zlock!(self.tasks).iter() {
            task.thread().unpark();
        }
    }

    /// Send `Close` to the peer, close the link and join the tasks. Does nothing if the
    /// transport is already closed.
    pub(crate) fn close(&self, reason: u8) -> ZResult<()> {
        if !self.alive.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!("Closing transport with {}", self.peer);

        let res = {
            let _tx = zlock!(self.tx);
            self.write(
                Close {
                    reason,
                    session: true,
                }
                .into(),
            )
        };
        if let Err(e) = res {
            tracing::debug!("Unable to send close to {}: {}", self.peer, e);
        }
        let res = self.link.close();

        let tasks = std::mem::take(&mut *zlock!(self.tasks));
        let current = thread::current().id();
        for task in tasks {
            task.thread().unpark();
            // A task closing its own transport cannot join itself
            if task.thread().id() != current && task.join().is_err() {
                tracing::error!("A task of the transport with {} panicked", self.peer);
            }
        }
        res
    }
}

fn spawn<F>(conf: &TaskConf, default_name: &str, f: F) -> ZResult<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let mut builder =
        thread::Builder::new().name(conf.name.clone().unwrap_or_else(|| default_name.to_string()));
    if let Some(size) = conf.stack_size {
        builder = builder.stack_size(size);
    }
    builder
        .spawn(f)
        .map_err(|e| zerror!((errno::GENERIC) e => "Unable to spawn task {}", default_name).into())
}

impl Primitives for TransportUnicast {
    fn send_interest(&self, msg: Interest) -> ZResult<()> {
        self.send_network(NetworkBody::Interest(msg), Reliability::Reliable)
    }

    fn send_declare(&self, msg: Declare) -> ZResult<()> {
        self.send_network(NetworkBody::Declare(msg), Reliability::Reliable)
    }

    fn send_push(&self, msg: Push, reliability: Reliability) -> ZResult<()> {
        self.send_network(NetworkBody::Push(msg), reliability)
    }

    fn send_request(&self, msg: Request) -> ZResult<()> {
        self.send_network(NetworkBody::Request(msg), Reliability::Reliable)
    }

    fn send_response(&self, msg: Response) -> ZResult<()> {
        self.send_network(NetworkBody::Response(msg), Reliability::Reliable)
    }

    fn send_response_final(&self, msg: ResponseFinal) -> ZResult<()> {
        self.send_network(NetworkBody::ResponseFinal(msg), Reliability::Reliable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_wrap_on_resolution() {
        let mut tx = TransportTx::default();
        let mask = u8::MAX as TransportSn;
        for expected in 0..=255 {
            assert_eq!(tx.next(Reliability::Reliable, mask), expected);
        }
        assert_eq!(tx.next(Reliability::Reliable, mask), 0);
        assert_eq!(tx.next(Reliability::BestEffort, mask), 0);
    }
}
