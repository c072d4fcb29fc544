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

//! The unicast transport between this session and its single peer.
//!
//! The transport starts from an established link: opening the link and negotiating the
//! peer parameters happen beforehand.
mod unicast;

use std::fmt;

pub(crate) use unicast::TransportUnicast;
use zpico_protocol::{
    core::{WhatAmI, ZenohId},
    network::NetworkMessage,
    transport::BatchSize,
};
use zpico_result::{bail, errno, ZResult};

/// A point-to-point link, stream or datagram oriented.
///
/// Implementations are expected to block. `close` must unblock a pending `read`.
pub trait Link: Send + Sync {
    /// Read whatever is available, at most `buffer.len()` bytes. Datagram links return
    /// one whole datagram.
    fn read(&self, buffer: &mut [u8]) -> ZResult<usize>;

    fn read_exact(&self, buffer: &mut [u8]) -> ZResult<()> {
        let mut filled = 0;
        while filled < buffer.len() {
            match self.read(&mut buffer[filled..])? {
                0 => bail!(
                    (errno::LINK_ERROR)
                    "Link closed after {} of {} bytes",
                    filled,
                    buffer.len()
                ),
                n => filled += n,
            }
        }
        Ok(())
    }

    fn write_all(&self, buffer: &[u8]) -> ZResult<()>;

    fn close(&self) -> ZResult<()>;

    /// Whether batches need a length prefix.
    fn is_streamed(&self) -> bool;

    fn mtu(&self) -> BatchSize;
}

/// The peer at the other end of the link, as negotiated when the link was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPeer {
    pub zid: ZenohId,
    pub whatami: WhatAmI,
}

impl fmt::Display for TransportPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.zid, self.whatami)
    }
}

/// Receives what the transport gets from the peer.
pub(crate) trait TransportPeerEventHandler: Send + Sync {
    fn handle_message(&self, msg: NetworkMessage) -> ZResult<()>;

    /// Called by the lease task on every keep-alive period.
    fn tick(&self);

    /// The link is gone: no more message will be handled.
    fn closed(&self);
}
