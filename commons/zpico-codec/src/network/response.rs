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
        response::{ext, flag},
        RequestId, Response, ResponseFinal,
    },
};

use super::{non_default_qos, read_exts, read_wire_expr, wire_expr_flags};
use crate::{
    common::extension::{store, ExtChain},
    RCodec, WCodec, Zenoh080, Zenoh080Bounded, Zenoh080Header,
};

impl<W> WCodec<&Response, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Response) -> Self::Output {
        let qos = non_default_qos(&x.ext_qos);
        let mut exts = ExtChain::new(
            &[qos.is_some(), x.ext_tstamp.is_some(), x.ext_respid.is_some()],
            &[],
        );
        let header =
            id::RESPONSE | wire_expr_flags(&x.wire_expr, flag::N, flag::M) | exts.flag(flag::Z);
        self.write(&mut *writer, header)?;

        self.write(&mut *writer, x.rid)?;
        self.write(&mut *writer, &x.wire_expr)?;
        exts.write_opt(&mut *writer, qos)?;
        exts.write_opt(&mut *writer, x.ext_tstamp.as_ref())?;
        exts.write_opt(&mut *writer, x.ext_respid.as_ref())?;
        self.write(&mut *writer, &x.payload)
    }
}

impl<R> RCodec<Response, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Response, Self::Error> {
        self.expect(id::RESPONSE)?;
        let rid: RequestId = Zenoh080Bounded::<RequestId>::new().read(&mut *reader)?;
        let wire_expr = read_wire_expr(&mut *reader, &self, flag::N, flag::M)?;

        let mut qos: Option<ext::QoSType> = None;
        let mut ext_tstamp: Option<ext::TimestampType> = None;
        let mut ext_respid: Option<ext::ResponderIdType> = None;
        read_exts(reader, "Response", self.has(flag::Z), |h, r| match iext::eid(h.header) {
            ext::QoS::ID => Ok(store(&mut qos, h.read(&mut *r)?)),
            ext::Timestamp::ID => Ok(store(&mut ext_tstamp, h.read(&mut *r)?)),
            ext::ResponderId::ID => Ok(store(&mut ext_respid, h.read(&mut *r)?)),
            _ => Ok(None),
        })?;

        Ok(Response {
            rid,
            wire_expr,
            payload: self.codec.read(&mut *reader)?,
            ext_qos: qos.unwrap_or(ext::QoSType::DEFAULT),
            ext_tstamp,
            ext_respid,
        })
    }
}

impl<W> WCodec<&ResponseFinal, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &ResponseFinal) -> Self::Output {
        let qos = non_default_qos(&x.ext_qos);
        let mut exts = ExtChain::new(&[qos.is_some(), x.ext_tstamp.is_some()], &[]);
        self.write(&mut *writer, id::RESPONSE_FINAL | exts.flag(flag::Z))?;

        self.write(&mut *writer, x.rid)?;
        exts.write_opt(&mut *writer, qos)?;
        exts.write_opt(&mut *writer, x.ext_tstamp.as_ref())
    }
}

impl<R> RCodec<ResponseFinal, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<ResponseFinal, Self::Error> {
        self.expect(id::RESPONSE_FINAL)?;
        let rid: RequestId = Zenoh080Bounded::<RequestId>::new().read(&mut *reader)?;

        let mut qos: Option<ext::QoSType> = None;
        let mut ext_tstamp: Option<ext::TimestampType> = None;
        read_exts(reader, "ResponseFinal", self.has(flag::Z), |h, r| {
            match iext::eid(h.header) {
                ext::QoS::ID => Ok(store(&mut qos, h.read(&mut *r)?)),
                ext::Timestamp::ID => Ok(store(&mut ext_tstamp, h.read(&mut *r)?)),
                _ => Ok(None),
            }
        })?;

        Ok(ResponseFinal {
            rid,
            ext_qos: qos.unwrap_or(ext::QoSType::DEFAULT),
            ext_tstamp,
        })
    }
}

read_after_header!(Response, ResponseFinal);
