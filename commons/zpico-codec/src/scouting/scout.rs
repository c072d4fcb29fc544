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
    reader::{DidntRead, Reader},
    writer::{DidntWrite, Writer},
};
use zpico_protocol::{
    common::imsg,
    core::WhatAmIMatcher,
    scouting::{
        id,
        scout::{flag, Scout},
    },
};

use super::{read_zid, write_zid, zid_len_bits};
use crate::{common::extension, RCodec, WCodec, Zenoh080, Zenoh080Header};

const WHAT_MASK: u8 = 0b111;

impl<W> WCodec<&Scout, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Scout) -> Self::Output {
        self.write(&mut *writer, id::SCOUT)?;
        self.write(&mut *writer, x.version)?;

        let zid_bits = x.zid.as_ref().map_or(0, |zid| flag::I | zid_len_bits(zid));
        self.write(&mut *writer, (x.what.bits() & WHAT_MASK) | zid_bits)?;
        match x.zid.as_ref() {
            Some(zid) => write_zid(writer, zid),
            None => Ok(()),
        }
    }
}

impl<R> RCodec<Scout, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Scout, Self::Error> {
        self.expect(id::SCOUT)?;
        let version: u8 = self.codec.read(&mut *reader)?;
        let flags: u8 = self.codec.read(&mut *reader)?;
        let zid = if imsg::has_flag(flags, flag::I) {
            Some(read_zid(&mut *reader, flags)?)
        } else {
            None
        };
        if self.has(flag::Z) {
            extension::skip_all(reader, "Scout")?;
        }

        Ok(Scout {
            version,
            what: WhatAmIMatcher::from_bits(flags & WHAT_MASK),
            zid,
        })
    }
}

read_after_header!(Scout);
