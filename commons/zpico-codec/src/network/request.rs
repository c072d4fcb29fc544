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
        request::{ext, flag},
        Request, RequestId,
    },
};

use super::{non_default_qos, read_exts, read_wire_expr, wire_expr_flags};
use crate::{
    common::extension::{store, ExtChain},
    RCodec, WCodec, Zenoh080, Zenoh080Bounded, Zenoh080Header,
};

// Extension: Target
impl<W> WCodec<(ext::TargetType, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (x, more): (ext::TargetType, bool)) -> Self::Output {
        self.write(&mut *writer, (&ext::Target::new(x as u64), more))
    }
}

impl<R> RCodec<(ext::TargetType, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(ext::TargetType, bool), Self::Error> {
        let (ext, more): (ext::Target, bool) = self.read(&mut *reader)?;
        let target = ext::TargetType::try_from(ext.value).map_err(|_| DidntRead)?;
        Ok((target, more))
    }
}

impl<W> WCodec<&Request, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Request) -> Self::Output {
        let qos = non_default_qos(&x.ext_qos);
        let nodeid = (x.ext_nodeid != ext::NodeIdType::DEFAULT).then_some(x.ext_nodeid);
        let target = (x.ext_target != ext::TargetType::DEFAULT).then_some(x.ext_target);
        let budget = x.ext_budget.map(|b| ext::Budget::new(b.get() as u64));
        let timeout = x.ext_timeout.map(|t| ext::Timeout::new(t.as_millis() as u64));
        let mut exts = ExtChain::new(
            &[
                qos.is_some(),
                x.ext_tstamp.is_some(),
                nodeid.is_some(),
                target.is_some(),
                budget.is_some(),
                timeout.is_some(),
            ],
            &[],
        );
        let header =
            id::REQUEST | wire_expr_flags(&x.wire_expr, flag::N, flag::M) | exts.flag(flag::Z);
        self.write(&mut *writer, header)?;

        self.write(&mut *writer, x.id)?;
        self.write(&mut *writer, &x.wire_expr)?;
        exts.write_opt(&mut *writer, qos)?;
        exts.write_opt(&mut *writer, x.ext_tstamp.as_ref())?;
        exts.write_opt(&mut *writer, nodeid)?;
        exts.write_opt(&mut *writer, target)?;
        exts.write_opt(&mut *writer, budget.as_ref())?;
        exts.write_opt(&mut *writer, timeout.as_ref())?;
        self.write(&mut *writer, &x.payload)
    }
}

impl<R> RCodec<Request, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Request, Self::Error> {
        self.expect(id::REQUEST)?;
        let id: RequestId = Zenoh080Bounded::<RequestId>::new().read(&mut *reader)?;
        let wire_expr = read_wire_expr(&mut *reader, &self, flag::N, flag::M)?;

        let mut qos: Option<ext::QoSType> = None;
        let mut ext_tstamp: Option<ext::TimestampType> = None;
        let mut nodeid: Option<ext::NodeIdType> = None;
        let mut target: Option<ext::TargetType> = None;
        let mut budget: Option<ext::Budget> = None;
        let mut timeout: Option<ext::Timeout> = None;
        read_exts(reader, "Request", self.has(flag::Z), |h, r| match iext::eid(h.header) {
            ext::QoS::ID => Ok(store(&mut qos, h.read(&mut *r)?)),
            ext::Timestamp::ID => Ok(store(&mut ext_tstamp, h.read(&mut *r)?)),
            ext::NodeId::ID => Ok(store(&mut nodeid, h.read(&mut *r)?)),
            ext::Target::ID => Ok(store(&mut target, h.read(&mut *r)?)),
            ext::Budget::ID => Ok(store(&mut budget, h.read(&mut *r)?)),
            ext::Timeout::ID => Ok(store(&mut timeout, h.read(&mut *r)?)),
            _ => Ok(None),
        })?;

        let ext_budget = match budget {
            Some(b) => ext::BudgetType::new(u32::try_from(b.value).map_err(|_| DidntRead)?),
            None => None,
        };
        Ok(Request {
            id,
            wire_expr,
            ext_qos: qos.unwrap_or(ext::QoSType::DEFAULT),
            ext_tstamp,
            ext_nodeid: nodeid.unwrap_or(ext::NodeIdType::DEFAULT),
            ext_target: target.unwrap_or(ext::TargetType::DEFAULT),
            ext_budget,
            ext_timeout: timeout.map(|t| ext::TimeoutType::from_millis(t.value)),
            payload: self.codec.read(&mut *reader)?,
        })
    }
}

read_after_header!(Request);
