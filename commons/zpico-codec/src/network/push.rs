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
    common::iext,
    network::{
        id,
        push::{ext, flag},
        Push,
    },
};

use super::{non_default_qos, read_exts, read_wire_expr, wire_expr_flags};
use crate::{
    common::extension::{store, ExtChain},
    RCodec, WCodec, Zenoh080, Zenoh080Header,
};

impl<W> WCodec<&Push, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Push) -> Self::Output {
        let qos = non_default_qos(&x.ext_qos);
        let nodeid = (x.ext_nodeid != ext::NodeIdType::DEFAULT).then_some(x.ext_nodeid);
        let mut exts =
            ExtChain::new(&[qos.is_some(), x.ext_tstamp.is_some(), nodeid.is_some()], &[]);
        let header = id::PUSH | wire_expr_flags(&x.wire_expr, flag::N, flag::M) | exts.flag(flag::Z);
        self.write(&mut *writer, header)?;

        self.write(&mut *writer, &x.wire_expr)?;
        exts.write_opt(&mut *writer, qos)?;
        exts.write_opt(&mut *writer, x.ext_tstamp.as_ref())?;
        exts.write_opt(&mut *writer, nodeid)?;
        self.write(&mut *writer, &x.payload)
    }
}

impl<R> RCodec<Push, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Push, Self::Error> {
        self.expect(id::PUSH)?;
        let wire_expr = read_wire_expr(&mut *reader, &self, flag::N, flag::M)?;

        let mut qos: Option<ext::QoSType> = None;
        let mut ext_tstamp: Option<ext::TimestampType> = None;
        let mut nodeid: Option<ext::NodeIdType> = None;
        read_exts(reader, "Push", self.has(flag::Z), |h, r| match iext::eid(h.header) {
            ext::QoS::ID => Ok(store(&mut qos, h.read(&mut *r)?)),
            ext::Timestamp::ID => Ok(store(&mut ext_tstamp, h.read(&mut *r)?)),
            ext::NodeId::ID => Ok(store(&mut nodeid, h.read(&mut *r)?)),
            _ => Ok(None),
        })?;

        Ok(Push {
            wire_expr,
            ext_qos: qos.unwrap_or(ext::QoSType::DEFAULT),
            ext_tstamp,
            ext_nodeid: nodeid.unwrap_or(ext::NodeIdType::DEFAULT),
            payload: self.codec.read(&mut *reader)?,
        })
    }
}

read_after_header!(Push);
