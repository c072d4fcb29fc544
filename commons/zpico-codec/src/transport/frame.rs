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
use zpico_buffers::{
    reader::{BacktrackableReader, DidntRead, Reader},
    writer::{DidntWrite, Writer},
};
use zpico_protocol::{
    common::imsg,
    core::Reliability,
    network::NetworkMessage,
    transport::{
        frame::{flag, Frame, FrameHeader},
        id, TransportSn,
    },
};

use crate::{common::extension, RCodec, WCodec, Zenoh080, Zenoh080Bounded, Zenoh080Header};

impl<W> WCodec<&FrameHeader, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &FrameHeader) -> Self::Output {
        let reliable = x.reliability == Reliability::Reliable;
        self.write(&mut *writer, id::FRAME | imsg::flag_if(reliable, flag::R))?;
        Zenoh080Bounded::<TransportSn>::new().write(&mut *writer, x.sn)
    }
}

impl<R> RCodec<FrameHeader, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<FrameHeader, Self::Error> {
        self.expect(id::FRAME)?;
        let reliability = if self.has(flag::R) {
            Reliability::Reliable
        } else {
            Reliability::BestEffort
        };
        let sn: TransportSn = Zenoh080Bounded::<TransportSn>::new().read(&mut *reader)?;
        if self.has(flag::Z) {
            extension::skip_all(reader, "Frame")?;
        }
        Ok(FrameHeader { reliability, sn })
    }
}

read_after_header!(FrameHeader);

impl<W> WCodec<&Frame, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Frame) -> Self::Output {
        let header = FrameHeader {
            reliability: x.reliability,
            sn: x.sn,
        };
        self.write(&mut *writer, &header)?;
        x.payload
            .iter()
            .try_for_each(|m| self.write(&mut *writer, m))
    }
}

impl<R> RCodec<Frame, &mut R> for Zenoh080
where
    R: Reader + BacktrackableReader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Frame, Self::Error> {
        let header: u8 = self.read(&mut *reader)?;
        Zenoh080Header::new(header).read(reader)
    }
}

// A frame runs until the batch ends or a byte that does not start a network message.
// That byte is left in the reader for the next transport message.
impl<R> RCodec<Frame, &mut R> for Zenoh080Header
where
    R: Reader + BacktrackableReader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Frame, Self::Error> {
        let header: FrameHeader = self.read(&mut *reader)?;

        let mut payload = Vec::new();
        while reader.can_read() {
            let mark = reader.mark();
            let msg: Result<NetworkMessage, DidntRead> = self.codec.read(&mut *reader);
            match msg {
                Ok(mut msg) => {
                    msg.reliability = header.reliability;
                    payload.push(msg);
                }
                Err(_) => {
                    if !reader.rewind(mark) {
                        return Err(DidntRead);
                    }
                    break;
                }
            }
        }

        Ok(Frame {
            reliability: header.reliability,
            sn: header.sn,
            payload,
        })
    }
}
