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
mod hello;
mod scout;

use zpico_buffers::{
    reader::{DidntRead, Reader},
    writer::{DidntWrite, Writer},
};
use zpico_protocol::{
    common::imsg,
    core::ZenohId,
    scouting::{id, ScoutingBody, ScoutingMessage},
};

use crate::{RCodec, WCodec, Zenoh080, Zenoh080Header, Zenoh080Length};

// Scouting messages carry the zid length minus one in the high nibble of their flags byte.
fn zid_len_bits(zid: &ZenohId) -> u8 {
    ((zid.size() - 1) as u8) << 4
}

fn write_zid<W: Writer>(writer: &mut W, zid: &ZenohId) -> Result<(), DidntWrite> {
    Zenoh080Length::new(zid.size()).write(writer, zid)
}

fn read_zid<R: Reader>(reader: &mut R, flags: u8) -> Result<ZenohId, DidntRead> {
    Zenoh080Length::new(1 + (flags >> 4) as usize).read(reader)
}

impl<W> WCodec<&ScoutingMessage, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &ScoutingMessage) -> Self::Output {
        match &x.body {
            ScoutingBody::Scout(s) => self.write(&mut *writer, s),
            ScoutingBody::Hello(h) => self.write(&mut *writer, h),
        }
    }
}

impl<R> RCodec<ScoutingMessage, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<ScoutingMessage, Self::Error> {
        let body = match imsg::mid(self.header) {
            id::SCOUT => ScoutingBody::Scout(self.read(&mut *reader)?),
            id::HELLO => ScoutingBody::Hello(self.read(&mut *reader)?),
            _ => return Err(DidntRead),
        };
        Ok(body.into())
    }
}

read_after_header!(ScoutingMessage);
