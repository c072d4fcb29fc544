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

//! Callback handler trait.
use std::{
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

use zpico_collections::RingBuffer;
use zpico_core::zlock;
use zpico_result::{bail, errno, ZResult};

use super::{callback::Callback, IntoHandler, API_DATA_RECEPTION_CHANNEL_SIZE};

/// A synchronous ring channel with a limited size that keeps the last N elements.
///
/// Pushing never blocks: when the ring is full the oldest element is dropped.
pub struct RingChannel {
    capacity: usize,
}

impl RingChannel {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl Default for RingChannel {
    fn default() -> Self {
        Self::new(*API_DATA_RECEPTION_CHANNEL_SIZE)
    }
}

struct RingState<T> {
    ring: RingBuffer<T>,
    closed: bool,
}

struct RingChannelInner<T> {
    state: Mutex<RingState<T>>,
    not_empty: Condvar,
}

impl<T> RingChannelInner<T> {
    fn push(&self, t: T) {
        let mut guard = zlock!(self.state);
        if guard.closed {
            return;
        }
        let was_empty = guard.ring.is_empty();
        if guard.ring.push_force(t).is_some() {
            tracing::trace!("Ring channel full: dropped the oldest element");
        }
        drop(guard);
        if was_empty {
            self.not_empty.notify_one();
        }
    }

    fn close(&self) {
        zlock!(self.state).closed = true;
        self.not_empty.notify_all();
    }
}

/// The producing side, owned by the declaration callback. Dropping it closes the channel.
struct RingChannelSender<T> {
    inner: Arc<RingChannelInner<T>>,
}

impl<T> Drop for RingChannelSender<T> {
    fn drop(&mut self) {
        self.inner.close();
    }
}

/// The receiving side of a [`RingChannel`].
pub struct RingChannelHandler<T> {
    inner: Arc<RingChannelInner<T>>,
}

impl<T> RingChannelHandler<T> {
    /// Receive from the ring channel, blocking until an element is available.
    ///
    /// Remaining elements are still returned after the channel is closed; an error is
    /// returned once it is both closed and empty.
    pub fn recv(&self) -> ZResult<T> {
        let mut guard = zlock!(self.inner.state);
        loop {
            if let Some(t) = guard.ring.pull() {
                let more = !guard.ring.is_empty();
                drop(guard);
                if more {
                    self.inner.not_empty.notify_one();
                }
                return Ok(t);
            }
            if guard.closed {
                bail!((errno::SESSION_CLOSED) "The ring channel has been closed.");
            }
            guard = self
                .inner
                .not_empty
                .wait(guard)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Like [`recv`](Self::recv), giving up with `Ok(None)` after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> ZResult<Option<T>> {
        let deadline = Instant::now() + timeout;
        let mut guard = zlock!(self.inner.state);
        loop {
            if let Some(t) = guard.ring.pull() {
                return Ok(Some(t));
            }
            if guard.closed {
                bail!((errno::SESSION_CLOSED) "The ring channel has been closed.");
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            guard = self
                .inner
                .not_empty
                .wait_timeout(guard, deadline - now)
                .map(|(g, _)| g)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    /// Receive from the ring channel without blocking.
    pub fn try_recv(&self) -> ZResult<Option<T>> {
        let mut guard = zlock!(self.inner.state);
        match guard.ring.pull() {
            Some(t) => Ok(Some(t)),
            None if guard.closed => {
                bail!((errno::SESSION_CLOSED) "The ring channel has been closed.")
            }
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        zlock!(self.inner.state).ring.len()
    }

    pub fn is_empty(&self) -> bool {
        zlock!(self.inner.state).ring.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        zlock!(self.inner.state).closed
    }
}

impl<T: Send + 'static> IntoHandler<T> for RingChannel {
    type Handler = RingChannelHandler<T>;

    fn into_handler(self) -> (Callback<T>, Self::Handler) {
        let inner = Arc::new(RingChannelInner {
            state: Mutex::new(RingState {
                ring: RingBuffer::new(self.capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
        });
        let handler = RingChannelHandler {
            inner: inner.clone(),
        };
        let sender = RingChannelSender { inner };
        (
            Callback::new(Arc::new(move |t| sender.inner.push(t))),
            handler,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn overwrite_keeps_most_recent() {
        let (cb, rx) = RingChannel::new(3).into_handler();
        for i in 0..4u32 {
            cb.call(i);
        }
        assert_eq!(rx.len(), 3);
        assert_eq!(rx.recv().unwrap(), 1);
        assert_eq!(rx.recv().unwrap(), 2);
        assert_eq!(rx.recv().unwrap(), 3);
        assert_eq!(rx.try_recv().unwrap(), None);
    }

    #[test]
    fn close_wakes_blocked_consumer() {
        let (cb, rx) = RingChannel::new(2).into_handler();
        let consumer = thread::spawn(move || {
            let first: u8 = rx.recv().unwrap();
            (first, rx.recv())
        });
        cb.call(7u8);
        thread::sleep(Duration::from_millis(50));
        drop(cb);
        let (first, second) = consumer.join().unwrap();
        assert_eq!(first, 7);
        assert!(second.is_err());
    }

    #[test]
    fn elements_survive_close() {
        let (cb, rx) = RingChannel::new(2).into_handler();
        cb.call("a");
        drop(cb);
        assert!(rx.is_closed());
        assert_eq!(rx.try_recv().unwrap(), Some("a"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn recv_timeout_expires() {
        let (_cb, rx) = RingChannel::new(1).into_handler();
        let r: Option<u8> = rx.recv_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(r, None);
    }
}
