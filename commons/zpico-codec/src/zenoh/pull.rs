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
        pull::{flag, Pull},
    },
};

use super::{read_sinfo_exts, write_sinfo_exts};
use crate::{RCodec, WCodec, Zenoh080, Zenoh080Header};

impl<W> WCodec<&Pull, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Pull) -> Self::Output {
        let has_exts = x.ext_sinfo.is_some() || !x.ext_unknown.is_empty();
        self.write(&mut *writer, id::PULL | imsg::flag_if(has_exts, flag::Z))?;
        write_sinfo_exts(writer, x.ext_sinfo.as_ref(), &x.ext_unknown)
    }
}

impl<R> RCodec<Pull, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Pull, Self::Error> {
        self.expect(id::PULL)?;
        let (ext_sinfo, ext_unknown) = read_sinfo_exts(reader, self.has(flag::Z), "Pull")?;
        Ok(Pull {
            ext_sinfo,
            ext_unknown,
        })
    }
}

read_after_header!(Pull);
