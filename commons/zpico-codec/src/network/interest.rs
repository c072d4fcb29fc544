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
        interest::{self, Interest, InterestMode, InterestOptions},
        Mapping,
    },
};

use super::{non_default_qos, read_exts};
use crate::{
    common::extension::{store, ExtChain},
    core::wire_expr,
    RCodec, WCodec, Zenoh080, Zenoh080Header,
};

// The mode lives in the two header bits left free by the Z flag.
const MODE_SHIFT: u8 = 5;
const MODE_MASK: u8 = 0b11;

impl<W> WCodec<&Interest, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Interest) -> Self::Output {
        let qos = non_default_qos(&x.ext_qos);
        let nodeid =
            (x.ext_nodeid != interest::ext::NodeIdType::DEFAULT).then_some(x.ext_nodeid);
        let mut exts =
            ExtChain::new(&[qos.is_some(), x.ext_tstamp.is_some(), nodeid.is_some()], &[]);
        let header =
            id::INTEREST | ((x.mode as u8) << MODE_SHIFT) | exts.flag(interest::flag::Z);
        self.write(&mut *writer, header)?;

        self.write(&mut *writer, x.id)?;
        if x.mode != InterestMode::Final {
            self.write(&mut *writer, x.options())?;
            if let Some(we) = x.wire_expr.as_ref() {
                self.write(&mut *writer, we)?;
            }
        }

        exts.write_opt(&mut *writer, qos)?;
        exts.write_opt(&mut *writer, x.ext_tstamp.as_ref())?;
        exts.write_opt(&mut *writer, nodeid)
    }
}

impl<R> RCodec<Interest, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Interest, Self::Error> {
        self.expect(id::INTEREST)?;
        let id: interest::InterestId = self.codec.read(&mut *reader)?;
        let mode = InterestMode::try_from((self.header >> MODE_SHIFT) & MODE_MASK)
            .map_err(|_| DidntRead)?;

        let mut options = InterestOptions::empty();
        let mut wire_expr = None;
        if mode != InterestMode::Final {
            let byte: u8 = self.codec.read(&mut *reader)?;
            options = InterestOptions::from(byte);
            if options.restricted() {
                let mut we = wire_expr::read(&mut *reader, options.named())?;
                if options.mapping() {
                    we.mapping = Mapping::Sender;
                }
                wire_expr = Some(we);
            }
            // The key expression carries these bits itself
            options -= InterestOptions::RESTRICTED;
            options -= InterestOptions::NAMED;
            options -= InterestOptions::MAPPING;
        }

        let mut qos: Option<interest::ext::QoSType> = None;
        let mut ext_tstamp: Option<interest::ext::TimestampType> = None;
        let mut nodeid: Option<interest::ext::NodeIdType> = None;
        read_exts(reader, "Interest", self.has(interest::flag::Z), |h, r| {
            match iext::eid(h.header) {
                interest::ext::QoS::ID => Ok(store(&mut qos, h.read(&mut *r)?)),
                interest::ext::Timestamp::ID => Ok(store(&mut ext_tstamp, h.read(&mut *r)?)),
                interest::ext::NodeId::ID => Ok(store(&mut nodeid, h.read(&mut *r)?)),
                _ => Ok(None),
            }
        })?;

        Ok(Interest {
            id,
            mode,
            options,
            wire_expr,
            ext_qos: qos.unwrap_or(interest::ext::QoSType::DEFAULT),
            ext_tstamp,
            ext_nodeid: nodeid.unwrap_or(interest::ext::NodeIdType::DEFAULT),
        })
    }
}

read_after_header!(Interest);
