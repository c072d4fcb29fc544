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
        del::{flag, Del},
        id,
    },
};

use super::{read_sinfo_exts, write_sinfo_exts};
use crate::{RCodec, WCodec, Zenoh080, Zenoh080Header};

impl<W> WCodec<&Del, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Del) -> Self::Output {
        let has_exts = x.ext_sinfo.is_some() || !x.ext_unknown.is_empty();
        let header = id::DEL
            | imsg::flag_if(x.timestamp.is_some(), flag::T)
            | imsg::flag_if(has_exts, flag::Z);
        self.write(&mut *writer, header)?;
        if let Some(ts) = x.timestamp.as_ref() {
            self.write(&mut *writer, ts)?;
        }
        write_sinfo_exts(writer, x.ext_sinfo.as_ref(), &x.ext_unknown)
    }
}

impl<R> RCodec<Del, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Del, Self::Error> {
        self.expect(id::DEL)?;
        let timestamp = self.read_if(flag::T, &mut *reader)?;
        let (ext_sinfo, ext_unknown) = read_sinfo_exts(reader, self.has(flag::Z), "Del")?;
        Ok(Del {
            timestamp,
            ext_sinfo,
            ext_unknown,
        })
    }
}

read_after_header!(Del);
