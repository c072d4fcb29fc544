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
mod declare;
mod interest;
mod oam;
mod push;
mod request;
mod response;

use zpico_buffers::{
    reader::{DidntRead, Reader},
    writer::{DidntWrite, Writer},
};
use zpico_protocol::{
    common::{imsg, ZExtZ64, ZExtZBufHeader},
    core::{EntityGlobalId, Timestamp, WireExpr},
    network::{ext, id, Mapping, NetworkBody, NetworkMessage},
};

use crate::{common::extension, core::wire_expr, LCodec, RCodec, WCodec, Zenoh080, Zenoh080Header};

/// Header flags announcing a key expression: `n` when it carries a suffix, `m` when the
/// numerical scope belongs to the sender.
pub(crate) fn wire_expr_flags(wire_expr: &WireExpr<'_>, n: u8, m: u8) -> u8 {
    imsg::flag_if(wire_expr.has_suffix(), n) | imsg::flag_if(wire_expr.mapping == Mapping::Sender, m)
}

pub(crate) fn read_wire_expr<R>(
    reader: &mut R,
    codec: &Zenoh080Header,
    n: u8,
    m: u8,
) -> Result<WireExpr<'static>, DidntRead>
where
    R: Reader,
{
    let mut expr = wire_expr::read(reader, codec.has(n))?;
    if codec.has(m) {
        expr.mapping = Mapping::Sender;
    }
    Ok(expr)
}

/// Network messages drop the extensions they do not know instead of keeping them.
pub(crate) fn read_exts<R, F>(
    reader: &mut R,
    s: &str,
    present: bool,
    known: F,
) -> Result<(), DidntRead>
where
    R: Reader,
    F: FnMut(Zenoh080Header, &mut R) -> Result<Option<bool>, DidntRead>,
{
    let mut dropped = Vec::new();
    extension::read_chain(reader, s, present, &mut dropped, known)
}

/// The QoS extension only travels when it differs from the default.
pub(crate) fn non_default_qos<const ID: u8>(
    qos: &ext::QoSType<{ ID }>,
) -> Option<ext::QoSType<{ ID }>> {
    (*qos != ext::QoSType::DEFAULT).then_some(*qos)
}

impl<W> WCodec<&NetworkMessage, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &NetworkMessage) -> Self::Output {
        match &x.body {
            NetworkBody::Push(b) => self.write(&mut *writer, b),
            NetworkBody::Request(b) => self.write(&mut *writer, b),
            NetworkBody::Response(b) => self.write(&mut *writer, b),
            NetworkBody::ResponseFinal(b) => self.write(&mut *writer, b),
            NetworkBody::Interest(b) => self.write(&mut *writer, b),
            NetworkBody::Declare(b) => self.write(&mut *writer, b),
            NetworkBody::OAM(b) => self.write(&mut *writer, b),
        }
    }
}

// Reliability is not on the wire, the enclosing frame sets it.
impl<R> RCodec<NetworkMessage, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<NetworkMessage, Self::Error> {
        let body = match imsg::mid(self.header) {
            id::PUSH => NetworkBody::Push(self.read(&mut *reader)?),
            id::REQUEST => NetworkBody::Request(self.read(&mut *reader)?),
            id::RESPONSE => NetworkBody::Response(self.read(&mut *reader)?),
            id::RESPONSE_FINAL => NetworkBody::ResponseFinal(self.read(&mut *reader)?),
            id::INTEREST => NetworkBody::Interest(self.read(&mut *reader)?),
            id::DECLARE => NetworkBody::Declare(self.read(&mut *reader)?),
            id::OAM => NetworkBody::OAM(self.read(&mut *reader)?),
            _ => return Err(DidntRead),
        };
        Ok(body.into())
    }
}

read_after_header!(NetworkMessage);

// Extension: QoS
impl<W, const ID: u8> WCodec<(ext::QoSType<{ ID }>, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (x, more): (ext::QoSType<{ ID }>, bool)) -> Self::Output {
        let ext: ZExtZ64<{ ID }> = x.into();
        self.write(&mut *writer, (&ext, more))
    }
}

impl<R, const ID: u8> RCodec<(ext::QoSType<{ ID }>, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(ext::QoSType<{ ID }>, bool), Self::Error> {
        let (ext, more): (ZExtZ64<{ ID }>, bool) = self.read(&mut *reader)?;
        Ok((ext.into(), more))
    }
}

// Extension: Timestamp
impl<W, const ID: u8> WCodec<(&ext::TimestampType<{ ID }>, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (x, more): (&ext::TimestampType<{ ID }>, bool)) -> Self::Output {
        let header: ZExtZBufHeader<{ ID }> = ZExtZBufHeader::new(self.w_len(&x.timestamp));
        self.write(&mut *writer, (&header, more))?;
        self.write(&mut *writer, &x.timestamp)
    }
}

impl<R, const ID: u8> RCodec<(ext::TimestampType<{ ID }>, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(ext::TimestampType<{ ID }>, bool), Self::Error> {
        let (_, more): (ZExtZBufHeader<{ ID }>, bool) = self.read(&mut *reader)?;
        let timestamp: Timestamp = self.codec.read(&mut *reader)?;
        Ok((ext::TimestampType { timestamp }, more))
    }
}

// Extension: NodeId
impl<W, const ID: u8> WCodec<(ext::NodeIdType<{ ID }>, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (x, more): (ext::NodeIdType<{ ID }>, bool)) -> Self::Output {
        let ext: ZExtZ64<{ ID }> = x.into();
        self.write(&mut *writer, (&ext, more))
    }
}

impl<R, const ID: u8> RCodec<(ext::NodeIdType<{ ID }>, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(ext::NodeIdType<{ ID }>, bool), Self::Error> {
        let (ext, more): (ZExtZ64<{ ID }>, bool) = self.read(&mut *reader)?;
        Ok((ext.into(), more))
    }
}

// Extension: EntityGlobalId
impl<W, const ID: u8> WCodec<(&ext::EntityGlobalIdType<{ ID }>, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(
        self,
        writer: &mut W,
        (x, more): (&ext::EntityGlobalIdType<{ ID }>, bool),
    ) -> Self::Output {
        let header: ZExtZBufHeader<{ ID }> = ZExtZBufHeader::new(self.w_len(&x.id));
        self.write(&mut *writer, (&header, more))?;
        self.write(&mut *writer, &x.id)
    }
}

impl<R, const ID: u8> RCodec<(ext::EntityGlobalIdType<{ ID }>, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(ext::EntityGlobalIdType<{ ID }>, bool), Self::Error> {
        let (_, more): (ZExtZBufHeader<{ ID }>, bool) = self.read(&mut *reader)?;
        let id: EntityGlobalId = self.codec.read(&mut *reader)?;
        Ok((ext::EntityGlobalIdType { id }, more))
    }
}
