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
use zpico_protocol::core::{Timestamp, ZenohId};

use crate::{LCodec, RCodec, WCodec, Zenoh080};

impl LCodec<&Timestamp> for Zenoh080 {
    fn w_len(self, x: &Timestamp) -> usize {
        let id = x.get_id();
        self.w_len(x.get_time().as_u64()) + self.w_len(&id.to_le_bytes()[..id.size()])
    }
}

impl<W> WCodec<&Timestamp, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Timestamp) -> Self::Output {
        self.write(&mut *writer, x.get_time().as_u64())?;
        let id = x.get_id();
        self.write(&mut *writer, &id.to_le_bytes()[..id.size()])?;
        Ok(())
    }
}

impl<R> RCodec<Timestamp, &mut R> for Zenoh080
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Timestamp, Self::Error> {
        let time: u64 = self.read(&mut *reader)?;
        let id: ZenohId = self.read(&mut *reader)?;
        Ok(Timestamp::new(uhlc::NTP64(time), id.into()))
    }
}
