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
        err::{ext, flag, Err},
        id,
    },
};

use crate::{
    common::extension::{self, ExtChain},
    RCodec, WCodec, Zenoh080, Zenoh080Header,
};

impl<W> WCodec<&Err, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Err) -> Self::Output {
        let mut exts = ExtChain::new(&[x.ext_sinfo.is_some(), x.ext_body.is_some()], &x.ext_unknown);
        let header = id::ERR
            | imsg::flag_if(x.timestamp.is_some(), flag::T)
            | imsg::flag_if(x.is_infrastructure, flag::I)
            | exts.flag(flag::Z);
        self.write(&mut *writer, header)?;

        self.write(&mut *writer, x.code)?;
        if let Some(ts) = x.timestamp.as_ref() {
            self.write(&mut *writer, ts)?;
        }
        exts.write_opt(&mut *writer, x.ext_sinfo.as_ref())?;
        exts.write_opt(&mut *writer, x.ext_body.as_ref())?;
        exts.finish(writer, &x.ext_unknown)
    }
}

impl<R> RCodec<Err, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Err, Self::Error> {
        self.expect(id::ERR)?;
        // Codes past u16::MAX are rejected by the u16 decoder
        let code: u16 = self.codec.read(&mut *reader)?;
        let timestamp = self.read_if(flag::T, &mut *reader)?;

        let mut ext_sinfo: Option<ext::SourceInfoType> = None;
        let mut ext_body: Option<ext::ErrBodyType> = None;
        let mut ext_unknown = Vec::new();
        extension::read_chain(reader, "Err", self.has(flag::Z), &mut ext_unknown, |h, r| {
            match iext::eid(h.header) {
                ext::SourceInfo::ID => Ok(extension::store(&mut ext_sinfo, h.read(&mut *r)?)),
                ext::ErrBody::ID => Ok(extension::store(&mut ext_body, h.read(&mut *r)?)),
                _ => Ok(None),
            }
        })?;

        Ok(Err {
            code,
            is_infrastructure: self.has(flag::I),
            timestamp,
            ext_sinfo,
            ext_body,
            ext_unknown,
        })
    }
}

read_after_header!(Err);

#[cfg(test)]
mod tests {
    use zpico_buffers::{reader::HasReader, writer::HasWriter};

    use super::*;

    #[test]
    fn code_wider_than_u16_is_rejected() {
        let codec = Zenoh080::new();
        let mut buffer = vec![];
        let mut writer = buffer.writer();
        codec.write(&mut writer, id::ERR).unwrap();
        codec.write(&mut writer, u16::MAX as u64 + 1).unwrap();

        let mut reader = buffer.reader();
        let r: Result<Err, _> = codec.read(&mut reader);
        assert!(r.is_err());
    }

    #[test]
    fn infrastructure_flag_round_trips() {
        let codec = Zenoh080::new();
        let x = Err {
            code: 7,
            is_infrastructure: true,
            timestamp: None,
            ext_sinfo: None,
            ext_body: None,
            ext_unknown: vec![],
        };
        let mut buffer = vec![];
        let mut writer = buffer.writer();
        codec.write(&mut writer, &x).unwrap();
        assert_eq!(buffer, vec![id::ERR | flag::I, 7]);

        let mut reader = buffer.reader();
        let y: Err = codec.read(&mut reader).unwrap();
        assert_eq!(x, y);
    }
}
