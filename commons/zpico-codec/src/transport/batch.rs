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
//! Batch framing.
//!
//! A batch is a sequence of transport messages serialized back to back. Over stream-oriented
//! links each batch is prefixed by its length as a little-endian `u16`; over datagram links
//! a batch is exactly one datagram.
use zpico_buffers::{
    reader::{DidntRead, HasReader, Reader},
    writer::{DidntWrite, HasWriter},
};
use zpico_protocol::transport::{BatchSize, TransportMessage};

use crate::{RCodec, WCodec, Zenoh080};

pub const LENGTH_BYTES: usize = 2;

/// Encode the length prefix of a streamed batch.
pub fn encode_len(len: usize) -> Result<[u8; LENGTH_BYTES], DidntWrite> {
    let len: BatchSize = len.try_into().map_err(|_| DidntWrite)?;
    Ok(len.to_le_bytes())
}

/// Decode the length prefix of a streamed batch.
pub fn decode_len(bytes: [u8; LENGTH_BYTES]) -> usize {
    BatchSize::from_le_bytes(bytes) as usize
}

/// Serialize `msgs` into a single batch of at most `batch_size` bytes, length prefix
/// included when `streamed`.
pub fn serialize(
    msgs: &[TransportMessage],
    streamed: bool,
    batch_size: BatchSize,
) -> Result<Vec<u8>, DidntWrite> {
    let codec = Zenoh080::new();

    let mut buff: Vec<u8> = Vec::with_capacity(batch_size as usize);
    if streamed {
        buff.extend_from_slice(&[0; LENGTH_BYTES]);
    }

    let mut writer = buff.writer();
    for m in msgs.iter() {
        codec.write(&mut writer, m)?;
    }

    if buff.len() > batch_size as usize {
        return Err(DidntWrite);
    }

    if streamed {
        let len = encode_len(buff.len() - LENGTH_BYTES)?;
        buff[..LENGTH_BYTES].copy_from_slice(&len);
    }

    Ok(buff)
}

/// Deserialize every transport message in a batch, without the length prefix.
pub fn deserialize(batch: &[u8]) -> Result<Vec<TransportMessage>, DidntRead> {
    let codec = Zenoh080::new();
    let mut reader = batch.reader();

    let mut msgs = Vec::new();
    while reader.can_read() {
        let msg: TransportMessage = codec.read(&mut reader)?;
        msgs.push(msg);
    }

    Ok(msgs)
}

#[cfg(test)]
mod tests {
    use zpico_protocol::transport::{batch_size, Close, KeepAlive};

    use super::*;

    #[test]
    fn streamed_prefix() {
        let msgs: Vec<TransportMessage> = vec![KeepAlive.into(), KeepAlive.into()];
        let batch = serialize(&msgs, true, batch_size::CONSTRAINED).unwrap();
        assert_eq!(batch.len(), LENGTH_BYTES + 2);
        assert_eq!(decode_len([batch[0], batch[1]]), 2);
        assert_eq!(deserialize(&batch[LENGTH_BYTES..]).unwrap(), msgs);
    }

    #[test]
    fn oversized_batch_is_refused() {
        let msgs: Vec<TransportMessage> = (0..16)
            .map(|_| {
                Close {
                    reason: 0,
                    session: true,
                }
                .into()
            })
            .collect();
        assert!(serialize(&msgs, false, 8).is_err());
        assert!(encode_len(usize::from(BatchSize::MAX) + 1).is_err());
    }

    #[test]
    fn truncated_batch_fails() {
        let msgs: Vec<TransportMessage> = vec![Close {
            reason: 2,
            session: false,
        }
        .into()];
        let batch = serialize(&msgs, false, batch_size::CONSTRAINED).unwrap();
        assert!(deserialize(&batch[..batch.len() - 1]).is_err());
    }
}
