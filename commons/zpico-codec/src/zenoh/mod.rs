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
pub mod ack;
pub mod del;
pub mod err;
pub mod pull;
pub mod put;
pub mod query;
pub mod reply;

use zpico_buffers::{
    reader::{DidntRead, Reader},
    writer::{DidntWrite, Writer},
    ZBuf,
};
use zpico_protocol::{
    common::{iext, imsg, ZExtUnknown, ZExtZBufHeader},
    core::{Encoding, EntityGlobalId},
    zenoh::{ext, id, put as proto_put, PushBody, RequestBody, ResponseBody},
};

use crate::{
    common::extension::{self, ExtChain},
    LCodec, RCodec, WCodec, Zenoh080, Zenoh080Bounded, Zenoh080Header,
};

macro_rules! body_codec {
    ($body:ident { $($mid:ident => $variant:ident),* $(,)? }) => {
        impl<W> WCodec<&$body, &mut W> for Zenoh080
        where
            W: Writer,
        {
            type Output = Result<(), DidntWrite>;

            fn write(self, writer: &mut W, x: &$body) -> Self::Output {
                match x {
                    $($body::$variant(b) => self.write(&mut *writer, b),)*
                }
            }
        }

        impl<R> RCodec<$body, &mut R> for Zenoh080Header
        where
            R: Reader,
        {
            type Error = DidntRead;

            fn read(self, reader: &mut R) -> Result<$body, Self::Error> {
                match imsg::mid(self.header) {
                    $(id::$mid => self.read(&mut *reader).map($body::$variant),)*
                    _ => Result::Err(DidntRead),
                }
            }
        }

        read_after_header!($body);
    };
}

body_codec!(PushBody { PUT => Put, DEL => Del });
body_codec!(RequestBody { QUERY => Query, PUT => Put, DEL => Del, PULL => Pull });
body_codec!(ResponseBody { REPLY => Reply, ERR => Err, ACK => Ack, PUT => Put });

type SourceInfo = proto_put::ext::SourceInfoType;

/// Writes the extensions of a message that only knows about the source info.
pub(crate) fn write_sinfo_exts<W>(
    writer: &mut W,
    ext_sinfo: Option<&SourceInfo>,
    ext_unknown: &[ZExtUnknown],
) -> Result<(), DidntWrite>
where
    W: Writer,
{
    let mut exts = ExtChain::new(&[ext_sinfo.is_some()], ext_unknown);
    exts.write_opt(&mut *writer, ext_sinfo)?;
    exts.finish(writer, ext_unknown)
}

pub(crate) fn read_sinfo_exts<R>(
    reader: &mut R,
    present: bool,
    s: &str,
) -> Result<(Option<SourceInfo>, Vec<ZExtUnknown>), DidntRead>
where
    R: Reader,
{
    let mut ext_sinfo: Option<proto_put::ext::SourceInfoType> = None;
    let mut ext_unknown = Vec::new();
    extension::read_chain(reader, s, present, &mut ext_unknown, |h, r| {
        match iext::eid(h.header) {
            proto_put::ext::SourceInfo::ID => Ok(extension::store(&mut ext_sinfo, h.read(&mut *r)?)),
            _ => Ok(None),
        }
    })?;
    Ok((ext_sinfo, ext_unknown))
}

// Extension: SourceInfo, the entity followed by its sequence number
impl<const ID: u8> LCodec<&ext::SourceInfoType<{ ID }>> for Zenoh080 {
    fn w_len(self, x: &ext::SourceInfoType<{ ID }>) -> usize {
        self.w_len(&x.id) + self.w_len(x.sn)
    }
}

impl<W, const ID: u8> WCodec<(&ext::SourceInfoType<{ ID }>, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (x, more): (&ext::SourceInfoType<{ ID }>, bool)) -> Self::Output {
        let header: ZExtZBufHeader<{ ID }> = ZExtZBufHeader::new(self.w_len(x));
        self.write(&mut *writer, (&header, more))?;
        self.write(&mut *writer, &x.id)?;
        self.write(&mut *writer, x.sn)
    }
}

impl<R, const ID: u8> RCodec<(ext::SourceInfoType<{ ID }>, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(ext::SourceInfoType<{ ID }>, bool), Self::Error> {
        let (_, more): (ZExtZBufHeader<{ ID }>, bool) = self.read(&mut *reader)?;
        let id: EntityGlobalId = self.codec.read(&mut *reader)?;
        let sn: u32 = self.codec.read(&mut *reader)?;
        Ok((ext::SourceInfoType { id, sn }, more))
    }
}

// Extension: Value, an encoding followed by a length-prefixed payload
impl<const ID: u8> LCodec<&ext::ValueType<{ ID }>> for Zenoh080 {
    fn w_len(self, x: &ext::ValueType<{ ID }>) -> usize {
        self.w_len(&x.encoding) + self.w_len(&x.payload)
    }
}

impl<W, const ID: u8> WCodec<(&ext::ValueType<{ ID }>, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (x, more): (&ext::ValueType<{ ID }>, bool)) -> Self::Output {
        let header: ZExtZBufHeader<{ ID }> = ZExtZBufHeader::new(self.w_len(x));
        self.write(&mut *writer, (&header, more))?;
        self.write(&mut *writer, &x.encoding)?;
        Zenoh080Bounded::<u32>::new().write(&mut *writer, &x.payload)
    }
}

impl<R, const ID: u8> RCodec<(ext::ValueType<{ ID }>, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(ext::ValueType<{ ID }>, bool), Self::Error> {
        let (header, more): (ZExtZBufHeader<{ ID }>, bool) = self.read(&mut *reader)?;
        let end = reader.remaining().checked_sub(header.len).ok_or(DidntRead)?;
        let encoding: Encoding = self.codec.read(&mut *reader)?;
        let payload: ZBuf = Zenoh080Bounded::<u32>::new().read(&mut *reader)?;
        if reader.remaining() != end {
            return Result::Err(DidntRead);
        }
        Ok((ext::ValueType { encoding, payload }, more))
    }
}
