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
    zenoh::{
        id,
        put::{flag, Put},
    },
};

use super::{read_sinfo_exts, write_sinfo_exts};
use crate::{RCodec, WCodec, Zenoh080, Zenoh080Bounded, Zenoh080Header};

impl<W> WCodec<&Put, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Put) -> Self::Output {
        let has_exts = x.ext_sinfo.is_some() || !x.ext_unknown.is_empty();
        let header = id::PUT
            | imsg::flag_if(x.timestamp.is_some(), flag::T)
            | imsg::flag_if(!x.encoding.is_empty(), flag::E)
            | imsg::flag_if(has_exts, flag::Z);
        self.write(&mut *writer, header)?;

        if let Some(ts) = x.timestamp.as_ref() {
            self.write(&mut *writer, ts)?;
        }
        if !x.encoding.is_empty() {
            self.write(&mut *writer, &x.encoding)?;
        }
        write_sinfo_exts(&mut *writer, x.ext_sinfo.as_ref(), &x.ext_unknown)?;
        Zenoh080Bounded::<u32>::new().write(&mut *writer, &x.payload)
    }
}

impl<R> RCodec<Put, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Put, Self::Error> {
        self.expect(id::PUT)?;
        let timestamp = self.read_if(flag::T, &mut *reader)?;
        let encoding = self.read_if(flag::E, &mut *reader)?.unwrap_or_default();
        let (ext_sinfo, ext_unknown) = read_sinfo_exts(&mut *reader, self.has(flag::Z), "Put")?;
        let payload = Zenoh080Bounded::<u32>::new().read(&mut *reader)?;
        Ok(Put {
            timestamp,
            encoding,
            ext_sinfo,
            ext_unknown,
            payload,
        })
    }
}

read_after_header!(Put);
