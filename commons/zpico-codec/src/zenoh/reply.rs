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
    common::{iext, imsg},
    zenoh::{
        id,
        reply::{ext, flag, Reply},
        ConsolidationMode,
    },
};

use crate::{
    common::extension::{self, ExtChain},
    RCodec, WCodec, Zenoh080, Zenoh080Bounded, Zenoh080Header,
};

impl<W> WCodec<&Reply, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Reply) -> Self::Output {
        // Auto is what a receiver assumes when the extension is missing.
        let consolidation = (x.ext_consolidation != ConsolidationMode::Auto)
            .then_some(x.ext_consolidation);
        let mut exts = ExtChain::new(
            &[x.ext_sinfo.is_some(), consolidation.is_some()],
            &x.ext_unknown,
        );
        let header = id::REPLY
            | imsg::flag_if(x.timestamp.is_some(), flag::T)
            | imsg::flag_if(!x.encoding.is_empty(), flag::E)
            | exts.flag(flag::Z);
        self.write(&mut *writer, header)?;

        if let Some(ts) = x.timestamp.as_ref() {
            self.write(&mut *writer, ts)?;
        }
        if !x.encoding.is_empty() {
            self.write(&mut *writer, &x.encoding)?;
        }
        exts.write_opt(&mut *writer, x.ext_sinfo.as_ref())?;
        exts.write_opt(&mut *writer, consolidation)?;
        exts.finish(&mut *writer, &x.ext_unknown)?;
        Zenoh080Bounded::<u32>::new().write(&mut *writer, &x.payload)
    }
}

impl<R> RCodec<Reply, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Reply, Self::Error> {
        self.expect(id::REPLY)?;
        let timestamp = self.read_if(flag::T, &mut *reader)?;
        let encoding = self.read_if(flag::E, &mut *reader)?.unwrap_or_default();

        let mut ext_sinfo: Option<ext::SourceInfoType> = None;
        let mut consolidation: Option<ConsolidationMode> = None;
        let mut ext_unknown = Vec::new();
        extension::read_chain(reader, "Reply", self.has(flag::Z), &mut ext_unknown, |h, r| {
            match iext::eid(h.header) {
                ext::SourceInfo::ID => Ok(extension::store(&mut ext_sinfo, h.read(&mut *r)?)),
                ext::Consolidation::ID => {
                    Ok(extension::store(&mut consolidation, h.read(&mut *r)?))
                }
                _ => Ok(None),
            }
        })?;

        let payload = Zenoh080Bounded::<u32>::new().read(&mut *reader)?;
        Ok(Reply {
            timestamp,
            encoding,
            ext_sinfo,
            ext_consolidation: consolidation.unwrap_or(ConsolidationMode::Auto),
            ext_unknown,
            payload,
        })
    }
}

read_after_header!(Reply);
