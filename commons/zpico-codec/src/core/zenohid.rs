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
use zpico_protocol::core::{EntityGlobalId, EntityId, ZenohId};

use crate::{LCodec, RCodec, WCodec, Zenoh080, Zenoh080Length};

fn read_raw<R: Reader>(reader: &mut R, size: usize) -> Result<ZenohId, DidntRead> {
    let mut id = [0; ZenohId::MAX_SIZE];
    let raw = id.get_mut(..size).ok_or(DidntRead)?;
    reader.read_exact(raw)?;
    ZenohId::try_from(&*raw).map_err(|_| DidntRead)
}

impl LCodec<&ZenohId> for Zenoh080 {
    fn w_len(self, x: &ZenohId) -> usize {
        x.size()
    }
}

// Length-prefixed, as in Hello and Scout
impl<W> WCodec<&ZenohId, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &ZenohId) -> Self::Output {
        self.write(&mut *writer, &x.to_le_bytes()[..x.size()])
    }
}

impl<R> RCodec<ZenohId, &mut R> for Zenoh080
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<ZenohId, Self::Error> {
        let size: usize = self.read(&mut *reader)?;
        read_raw(reader, size)
    }
}

// Raw bytes, the enclosing message carries the size
impl<W> WCodec<&ZenohId, &mut W> for Zenoh080Length
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &ZenohId) -> Self::Output {
        let bytes = x.to_le_bytes();
        writer.write_exact(bytes.get(..self.length).ok_or(DidntWrite)?)
    }
}

impl<R> RCodec<ZenohId, &mut R> for Zenoh080Length
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<ZenohId, Self::Error> {
        read_raw(reader, self.length)
    }
}

// Entity ids prefix the zid with its size minus one in the high nibble.
impl LCodec<&EntityGlobalId> for Zenoh080 {
    fn w_len(self, x: &EntityGlobalId) -> usize {
        1 + x.zid.size() + self.w_len(x.eid)
    }
}

impl<W> WCodec<&EntityGlobalId, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &EntityGlobalId) -> Self::Output {
        let size = x.zid.size();
        self.write(&mut *writer, ((size - 1) as u8) << 4)?;
        Zenoh080Length::new(size).write(&mut *writer, &x.zid)?;
        self.write(&mut *writer, x.eid)
    }
}

impl<R> RCodec<EntityGlobalId, &mut R> for Zenoh080
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<EntityGlobalId, Self::Error> {
        let flags: u8 = self.read(&mut *reader)?;
        let zid = read_raw(reader, 1 + (flags >> 4) as usize)?;
        let eid: EntityId = self.read(&mut *reader)?;
        Ok(EntityGlobalId { zid, eid })
    }
}
