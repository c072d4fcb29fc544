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
    common::{iext, ZExtBody},
    network::{
        id,
        oam::{ext, flag, Oam, OamId},
    },
};

use super::{non_default_qos, read_exts};
use crate::{
    common::extension::{store, ExtChain},
    RCodec, WCodec, Zenoh080, Zenoh080Bounded, Zenoh080Header,
};

impl<W> WCodec<&Oam, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Oam) -> Self::Output {
        let qos = non_default_qos(&x.ext_qos);
        let mut exts = ExtChain::new(&[qos.is_some(), x.ext_tstamp.is_some()], &[]);
        // The body encoding takes the bits extensions use for theirs
        let enc = match &x.body {
            ZExtBody::Unit => iext::ENC_UNIT,
            ZExtBody::Z64(_) => iext::ENC_Z64,
            ZExtBody::ZBuf(_) => iext::ENC_ZBUF,
        };
        self.write(&mut *writer, id::OAM | enc | exts.flag(flag::Z))?;

        self.write(&mut *writer, x.id)?;
        exts.write_opt(&mut *writer, qos)?;
        exts.write_opt(&mut *writer, x.ext_tstamp.as_ref())?;
        match &x.body {
            ZExtBody::Unit => Ok(()),
            ZExtBody::Z64(v) => self.write(&mut *writer, *v),
            ZExtBody::ZBuf(v) => Zenoh080Bounded::<u32>::new().write(&mut *writer, v),
        }
    }
}

impl<R> RCodec<Oam, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Oam, Self::Error> {
        self.expect(id::OAM)?;
        let id: OamId = self.codec.read(&mut *reader)?;

        let mut qos: Option<ext::QoSType> = None;
        let mut ext_tstamp: Option<ext::TimestampType> = None;
        read_exts(reader, "OAM", self.has(flag::Z), |h, r| match iext::eid(h.header) {
            ext::QoS::ID => Ok(store(&mut qos, h.read(&mut *r)?)),
            ext::Timestamp::ID => Ok(store(&mut ext_tstamp, h.read(&mut *r)?)),
            _ => Ok(None),
        })?;

        let body = match self.header & iext::ENC_MASK {
            iext::ENC_UNIT => ZExtBody::Unit,
            iext::ENC_Z64 => ZExtBody::Z64(self.codec.read(&mut *reader)?),
            iext::ENC_ZBUF => ZExtBody::ZBuf(Zenoh080Bounded::<u32>::new().read(&mut *reader)?),
            _ => return Err(DidntRead),
        };
        Ok(Oam {
            id,
            body,
            ext_qos: qos.unwrap_or(ext::QoSType::DEFAULT),
            ext_tstamp,
        })
    }
}

read_after_header!(Oam);
