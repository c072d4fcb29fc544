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
    transport::{
        close::{flag, Close},
        id,
    },
};

use crate::{common::extension, RCodec, WCodec, Zenoh080, Zenoh080Header};

// The S flag tells whether the whole session goes down or only the link.
impl<W> WCodec<&Close, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Close) -> Self::Output {
        self.write(&mut *writer, id::CLOSE | imsg::flag_if(x.session, flag::S))?;
        self.write(&mut *writer, x.reason)
    }
}

impl<R> RCodec<Close, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Close, Self::Error> {
        self.expect(id::CLOSE)?;
        let reason: u8 = self.codec.read(&mut *reader)?;
        if self.has(flag::Z) {
            extension::skip_all(reader, "Close")?;
        }
        Ok(Close {
            reason,
            session: self.has(flag::S),
        })
    }
}

read_after_header!(Close);
