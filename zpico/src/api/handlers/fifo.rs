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
use super::{callback::Callback, IntoHandler, API_DATA_RECEPTION_CHANNEL_SIZE};

/// A handler implementing FIFO semantics.
///
/// Pushing on a full [`FifoChannel`] blocks until a slot is available, so a slow consumer
/// stalls the read task of the session. [`RingChannel`](super::RingChannel) drops the
/// oldest samples instead.
pub struct FifoChannel {
    capacity: usize,
}

impl FifoChannel {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl Default for FifoChannel {
    fn default() -> Self {
        Self::new(*API_DATA_RECEPTION_CHANNEL_SIZE)
    }
}

impl<T: Send + 'static> IntoHandler<T> for FifoChannel {
    type Handler = flume::Receiver<T>;

    fn into_handler(self) -> (Callback<T>, Self::Handler) {
        flume::bounded(self.capacity).into_handler()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_keeps_everything_in_order() {
        let (cb, rx) = FifoChannel::new(4).into_handler();
        for i in 0..4u8 {
            cb.call(i);
        }
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), [0, 1, 2, 3]);
        drop(cb);
        assert!(rx.recv().is_err());
    }
}
