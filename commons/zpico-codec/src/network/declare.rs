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
    common::{iext, imsg, ZExtZ64, ZExtZBufHeader},
    core::{ExprId, ExprLen, WireExpr},
    network::{
        declare::{
            self, common::ext::WireExprType, keyexpr, queryable, subscriber, token, Declare,
            DeclareBody, DeclareFinal,
        },
        id, Mapping,
    },
};

use super::{non_default_qos, read_exts, read_wire_expr, wire_expr_flags};
use crate::{
    common::extension::{self, store, ExtChain},
    core::wire_expr,
    LCodec, RCodec, WCodec, Zenoh080, Zenoh080Bounded, Zenoh080Header,
};

impl<W> WCodec<&DeclareBody, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &DeclareBody) -> Self::Output {
        match x {
            DeclareBody::DeclareKeyExpr(r) => self.write(&mut *writer, r),
            DeclareBody::UndeclareKeyExpr(r) => self.write(&mut *writer, r),
            DeclareBody::DeclareSubscriber(r) => self.write(&mut *writer, r),
            DeclareBody::UndeclareSubscriber(r) => self.write(&mut *writer, r),
            DeclareBody::DeclareQueryable(r) => self.write(&mut *writer, r),
            DeclareBody::UndeclareQueryable(r) => self.write(&mut *writer, r),
            DeclareBody::DeclareToken(r) => self.write(&mut *writer, r),
            DeclareBody::UndeclareToken(r) => self.write(&mut *writer, r),
            DeclareBody::DeclareFinal(r) => self.write(&mut *writer, r),
        }
    }
}

impl<R> RCodec<DeclareBody, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<DeclareBody, Self::Error> {
        use declare::id::*;
        let body = match imsg::mid(self.header) {
            D_KEYEXPR => DeclareBody::DeclareKeyExpr(self.read(&mut *reader)?),
            U_KEYEXPR => DeclareBody::UndeclareKeyExpr(self.read(&mut *reader)?),
            D_SUBSCRIBER => DeclareBody::DeclareSubscriber(self.read(&mut *reader)?),
            U_SUBSCRIBER => DeclareBody::UndeclareSubscriber(self.read(&mut *reader)?),
            D_QUERYABLE => DeclareBody::DeclareQueryable(self.read(&mut *reader)?),
            U_QUERYABLE => DeclareBody::UndeclareQueryable(self.read(&mut *reader)?),
            D_TOKEN => DeclareBody::DeclareToken(self.read(&mut *reader)?),
            U_TOKEN => DeclareBody::UndeclareToken(self.read(&mut *reader)?),
            D_FINAL => DeclareBody::DeclareFinal(self.read(&mut *reader)?),
            _ => return Err(DidntRead),
        };
        Ok(body)
    }
}

impl<W> WCodec<&Declare, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Declare) -> Self::Output {
        let qos = non_default_qos(&x.ext_qos);
        let nodeid = (x.ext_nodeid != declare::ext::NodeIdType::DEFAULT).then_some(x.ext_nodeid);
        let mut exts =
            ExtChain::new(&[qos.is_some(), x.ext_tstamp.is_some(), nodeid.is_some()], &[]);
        let header = id::DECLARE
            | imsg::flag_if(x.interest_id.is_some(), declare::flag::I)
            | exts.flag(declare::flag::Z);
        self.write(&mut *writer, header)?;

        if let Some(interest_id) = x.interest_id {
            self.write(&mut *writer, interest_id)?;
        }
        exts.write_opt(&mut *writer, qos)?;
        exts.write_opt(&mut *writer, x.ext_tstamp.as_ref())?;
        exts.write_opt(&mut *writer, nodeid)?;
        self.write(&mut *writer, &x.body)
    }
}

impl<R> RCodec<Declare, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Declare, Self::Error> {
        self.expect(id::DECLARE)?;
        let interest_id = self.read_if(declare::flag::I, &mut *reader)?;

        let mut qos: Option<declare::ext::QoSType> = None;
        let mut ext_tstamp: Option<declare::ext::TimestampType> = None;
        let mut nodeid: Option<declare::ext::NodeIdType> = None;
        read_exts(reader, "Declare", self.has(declare::flag::Z), |h, r| {
            match iext::eid(h.header) {
                declare::ext::QoS::ID => Ok(store(&mut qos, h.read(&mut *r)?)),
                declare::ext::Timestamp::ID => Ok(store(&mut ext_tstamp, h.read(&mut *r)?)),
                declare::ext::NodeId::ID => Ok(store(&mut nodeid, h.read(&mut *r)?)),
                _ => Ok(None),
            }
        })?;

        Ok(Declare {
            interest_id,
            ext_qos: qos.unwrap_or(declare::ext::QoSType::DEFAULT),
            ext_tstamp,
            ext_nodeid: nodeid.unwrap_or(declare::ext::NodeIdType::DEFAULT),
            body: self.codec.read(&mut *reader)?,
        })
    }
}

impl<W> WCodec<&DeclareFinal, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, _x: &DeclareFinal) -> Self::Output {
        self.write(&mut *writer, declare::id::D_FINAL)
    }
}

impl<R> RCodec<DeclareFinal, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<DeclareFinal, Self::Error> {
        self.expect(declare::id::D_FINAL)?;
        if self.has(declare::flag::Z) {
            extension::skip_all(reader, "DeclareFinal")?;
        }
        Ok(DeclareFinal)
    }
}

// The key expression of an undeclaration. Its suffix runs to the end of the extension.
//
//  7 6 5 4 3 2 1 0
// +-+-+-+-+-+-+-+-+
// |X|X|X|X|X|X|M|N|
// +-+-+-+---------+
// ~ key_scope:z16 ~
// +---------------+
// ~  key_suffix   ~  if N==1
// +---------------+
const WIRE_EXPR_N: u8 = 1;
const WIRE_EXPR_M: u8 = 1 << 1;

type WireExprHeader = ZExtZBufHeader<{ declare::common::ext::WireExprExt::ID }>;

impl LCodec<&WireExprType> for Zenoh080 {
    fn w_len(self, x: &WireExprType) -> usize {
        let suffix = if x.wire_expr.has_suffix() {
            x.wire_expr.suffix.len()
        } else {
            0
        };
        1 + self.w_len(x.wire_expr.scope) + suffix
    }
}

impl<W> WCodec<(&WireExprType, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (x, more): (&WireExprType, bool)) -> Self::Output {
        let expr = &x.wire_expr;
        self.write(&mut *writer, (&WireExprHeader::new(self.w_len(x)), more))?;
        let flags = imsg::flag_if(expr.has_suffix(), WIRE_EXPR_N)
            | imsg::flag_if(expr.mapping == Mapping::Sender, WIRE_EXPR_M);
        self.write(&mut *writer, flags)?;
        Zenoh080Bounded::<ExprId>::new().write(&mut *writer, expr.scope)?;
        if expr.has_suffix() {
            writer.write_exact(expr.suffix.as_bytes())?;
        }
        Ok(())
    }
}

impl<R> RCodec<(WireExprType, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(WireExprType, bool), Self::Error> {
        let (header, more): (WireExprHeader, bool) = self.read(&mut *reader)?;
        let end = reader.remaining().checked_sub(header.len).ok_or(DidntRead)?;

        let flags: u8 = self.codec.read(&mut *reader)?;
        let scope: ExprId = Zenoh080Bounded::<ExprId>::new().read(&mut *reader)?;
        let mut suffix = String::new();
        if imsg::has_flag(flags, WIRE_EXPR_N) {
            let len = reader.remaining().checked_sub(end).ok_or(DidntRead)?;
            if len > ExprLen::MAX as usize {
                return Err(DidntRead);
            }
            let mut buff = vec![0; len];
            reader.read_exact(&mut buff)?;
            suffix = String::from_utf8(buff).map_err(|_| DidntRead)?;
        }
        let mapping = if imsg::has_flag(flags, WIRE_EXPR_M) {
            Mapping::Sender
        } else {
            Mapping::Receiver
        };

        let wire_expr = WireExpr {
            scope,
            suffix: suffix.into(),
            mapping,
        };
        Ok((WireExprType { wire_expr }, more))
    }
}

// Key expressions are always declared in the sender's mapping
impl<W> WCodec<&keyexpr::DeclareKeyExpr, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &keyexpr::DeclareKeyExpr) -> Self::Output {
        let header =
            declare::id::D_KEYEXPR | imsg::flag_if(x.wire_expr.has_suffix(), keyexpr::flag::N);
        self.write(&mut *writer, header)?;
        self.write(&mut *writer, x.id)?;
        self.write(&mut *writer, &x.wire_expr)
    }
}

impl<R> RCodec<keyexpr::DeclareKeyExpr, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<keyexpr::DeclareKeyExpr, Self::Error> {
        self.expect(declare::id::D_KEYEXPR)?;
        let id: ExprId = self.codec.read(&mut *reader)?;
        let wire_expr = wire_expr::read(&mut *reader, self.has(keyexpr::flag::N))?;
        if self.has(keyexpr::flag::Z) {
            extension::skip_all(reader, "DeclareKeyExpr")?;
        }
        Ok(keyexpr::DeclareKeyExpr { id, wire_expr })
    }
}

impl<W> WCodec<&keyexpr::UndeclareKeyExpr, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &keyexpr::UndeclareKeyExpr) -> Self::Output {
        self.write(&mut *writer, declare::id::U_KEYEXPR)?;
        self.write(&mut *writer, x.id)
    }
}

impl<R> RCodec<keyexpr::UndeclareKeyExpr, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<keyexpr::UndeclareKeyExpr, Self::Error> {
        self.expect(declare::id::U_KEYEXPR)?;
        let id: ExprId = self.codec.read(&mut *reader)?;
        if self.has(keyexpr::flag::Z) {
            extension::skip_all(reader, "UndeclareKeyExpr")?;
        }
        Ok(keyexpr::UndeclareKeyExpr { id })
    }
}

// Subscribers and tokens: an entity id and a key expression.
macro_rules! declare_entity {
    ($module:ident::$msg:ident, $did:expr) => {
        impl<W> WCodec<&$module::$msg, &mut W> for Zenoh080
        where
            W: Writer,
        {
            type Output = Result<(), DidntWrite>;

            fn write(self, writer: &mut W, x: &$module::$msg) -> Self::Output {
                let flags = wire_expr_flags(&x.wire_expr, $module::flag::N, $module::flag::M);
                self.write(&mut *writer, $did | flags)?;
                self.write(&mut *writer, x.id)?;
                self.write(&mut *writer, &x.wire_expr)
            }
        }

        impl<R> RCodec<$module::$msg, &mut R> for Zenoh080Header
        where
            R: Reader,
        {
            type Error = DidntRead;

            fn read(self, reader: &mut R) -> Result<$module::$msg, Self::Error> {
                self.expect($did)?;
                let id = self.codec.read(&mut *reader)?;
                let wire_expr =
                    read_wire_expr(&mut *reader, &self, $module::flag::N, $module::flag::M)?;
                if self.has($module::flag::Z) {
                    extension::skip_all(reader, stringify!($msg))?;
                }
                Ok($module::$msg { id, wire_expr })
            }
        }
    };
}

declare_entity!(subscriber::DeclareSubscriber, declare::id::D_SUBSCRIBER);
declare_entity!(token::DeclareToken, declare::id::D_TOKEN);

// Undeclarations: an entity id and, optionally, the key expression it was declared on.
macro_rules! undeclare_entity {
    ($module:ident::$msg:ident, $uid:expr) => {
        impl<W> WCodec<&$module::$msg, &mut W> for Zenoh080
        where
            W: Writer,
        {
            type Output = Result<(), DidntWrite>;

            fn write(self, writer: &mut W, x: &$module::$msg) -> Self::Output {
                let named = !x.ext_wire_expr.is_null();
                self.write(&mut *writer, $uid | imsg::flag_if(named, $module::flag::Z))?;
                self.write(&mut *writer, x.id)?;
                if named {
                    self.write(&mut *writer, (&x.ext_wire_expr, false))?;
                }
                Ok(())
            }
        }

        impl<R> RCodec<$module::$msg, &mut R> for Zenoh080Header
        where
            R: Reader,
        {
            type Error = DidntRead;

            fn read(self, reader: &mut R) -> Result<$module::$msg, Self::Error> {
                self.expect($uid)?;
                let id = self.codec.read(&mut *reader)?;

                let mut ext_wire_expr: Option<WireExprType> = None;
                read_exts(reader, stringify!($msg), self.has($module::flag::Z), |h, r| {
                    match iext::eid(h.header) {
                        declare::common::ext::WireExprExt::ID => {
                            Ok(store(&mut ext_wire_expr, h.read(&mut *r)?))
                        }
                        _ => Ok(None),
                    }
                })?;

                Ok($module::$msg {
                    id,
                    ext_wire_expr: ext_wire_expr.unwrap_or_else(WireExprType::null),
                })
            }
        }
    };
}

undeclare_entity!(subscriber::UndeclareSubscriber, declare::id::U_SUBSCRIBER);
undeclare_entity!(queryable::UndeclareQueryable, declare::id::U_QUERYABLE);
undeclare_entity!(token::UndeclareToken, declare::id::U_TOKEN);

impl<W> WCodec<(queryable::ext::QueryableInfoType, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (x, more): (queryable::ext::QueryableInfoType, bool)) -> Self::Output {
        let ext: queryable::ext::QueryableInfo = x.into();
        self.write(&mut *writer, (&ext, more))
    }
}

impl<R> RCodec<(queryable::ext::QueryableInfoType, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(queryable::ext::QueryableInfoType, bool), Self::Error> {
        let (ext, more): (ZExtZ64<{ queryable::ext::QueryableInfo::ID }>, bool) =
            self.read(&mut *reader)?;
        Ok((ext.into(), more))
    }
}

impl<W> WCodec<&queryable::DeclareQueryable, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &queryable::DeclareQueryable) -> Self::Output {
        let info = (x.ext_info != queryable::ext::QueryableInfoType::DEFAULT).then_some(x.ext_info);
        let mut exts = ExtChain::new(&[info.is_some()], &[]);
        let header = declare::id::D_QUERYABLE
            | wire_expr_flags(&x.wire_expr, queryable::flag::N, queryable::flag::M)
            | exts.flag(queryable::flag::Z);
        self.write(&mut *writer, header)?;
        self.write(&mut *writer, x.id)?;
        self.write(&mut *writer, &x.wire_expr)?;
        exts.write_opt(&mut *writer, info)
    }
}

impl<R> RCodec<queryable::DeclareQueryable, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<queryable::DeclareQueryable, Self::Error> {
        self.expect(declare::id::D_QUERYABLE)?;
        let id: queryable::QueryableId = self.codec.read(&mut *reader)?;
        let wire_expr =
            read_wire_expr(&mut *reader, &self, queryable::flag::N, queryable::flag::M)?;

        let mut info: Option<queryable::ext::QueryableInfoType> = None;
        read_exts(reader, "DeclareQueryable", self.has(queryable::flag::Z), |h, r| {
            match iext::eid(h.header) {
                queryable::ext::QueryableInfo::ID => Ok(store(&mut info, h.read(&mut *r)?)),
                _ => Ok(None),
            }
        })?;

        Ok(queryable::DeclareQueryable {
            id,
            wire_expr,
            ext_info: info.unwrap_or(queryable::ext::QueryableInfoType::DEFAULT),
        })
    }
}

read_after_header!(
    Declare,
    DeclareBody,
    DeclareFinal,
    keyexpr::DeclareKeyExpr,
    keyexpr::UndeclareKeyExpr,
    subscriber::DeclareSubscriber,
    subscriber::UndeclareSubscriber,
    queryable::DeclareQueryable,
    queryable::UndeclareQueryable,
    token::DeclareToken,
    token::UndeclareToken,
);

#[cfg(test)]
mod tests {
    use zpico_buffers::{reader::HasReader, writer::HasWriter};

    use super::*;

    fn encode(x: &subscriber::UndeclareSubscriber) -> Vec<u8> {
        let mut buffer = vec![];
        let mut writer = buffer.writer();
        Zenoh080::new().write(&mut writer, x).unwrap();
        buffer
    }

    #[test]
    fn undeclare_without_key_expr_has_no_extension() {
        let x = subscriber::UndeclareSubscriber {
            id: 9,
            ext_wire_expr: WireExprType::null(),
        };
        let buffer = encode(&x);
        assert_eq!(buffer, vec![declare::id::U_SUBSCRIBER, 9]);

        let y: subscriber::UndeclareSubscriber =
            Zenoh080::new().read(&mut buffer.reader()).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn undeclare_key_expr_suffix_runs_to_extension_end() {
        let x = subscriber::UndeclareSubscriber {
            id: 9,
            ext_wire_expr: WireExprType {
                wire_expr: WireExpr {
                    scope: 3,
                    suffix: "a/b".into(),
                    mapping: Mapping::Sender,
                },
            },
        };
        let buffer = encode(&x);
        let ext = declare::common::ext::WireExprExt::ID;
        assert_eq!(
            buffer,
            vec![
                declare::id::U_SUBSCRIBER | subscriber::flag::Z,
                9,
                ext,
                5,
                WIRE_EXPR_N | WIRE_EXPR_M,
                3,
                b'a',
                b'/',
                b'b',
            ]
        );

        let y: subscriber::UndeclareSubscriber =
            Zenoh080::new().read(&mut buffer.reader()).unwrap();
        assert_eq!(x, y);
    }
}
