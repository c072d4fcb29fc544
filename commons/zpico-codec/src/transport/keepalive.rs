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
use zpico_protocol::transport::{
    id,
    keepalive::{flag, KeepAlive},
};

use crate::{common::extension, RCodec, WCodec, Zenoh080, Zenoh080Header};

impl<W> WCodec<&KeepAlive, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, _x: &KeepAlive) -> Self::Output {
        self.write(&mut *writer, id::KEEP_ALIVE)
    }
}

impl<R> RCodec<KeepAlive, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<KeepAlive, Self::Error> {
        self.expect(id::KEEP_ALIVE)?;
        if self.has(flag::Z) {
            extension::skip_all(reader, "KeepAlive")?;
        }
        Ok(KeepAlive)
    }
}

read_after_header!(KeepAlive);
