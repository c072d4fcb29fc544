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
    ZBuf,
};
use zpico_protocol::common::{
    iext, ZExtBody, ZExtUnit, ZExtUnknown, ZExtZ64, ZExtZBuf, ZExtZBufHeader,
};

use crate::{LCodec, RCodec, WCodec, Zenoh080, Zenoh080Bounded, Zenoh080Header};

/// Read an extension the caller does not know. Unknown mandatory extensions make the whole
/// message undecodable.
pub fn read<R>(reader: &mut R, s: &str, header: u8) -> Result<(ZExtUnknown, bool), DidntRead>
where
    R: Reader,
{
    let (u, more): (ZExtUnknown, bool) = Zenoh080Header::new(header).read(&mut *reader)?;
    if u.is_mandatory() {
        tracing::error!("Unknown {} ext: {:?}", s, u);
        return Err(DidntRead);
    }
    tracing::debug!("Unknown {} ext: {:?}", s, u);
    Ok((u, more))
}

/// Skip an unknown extension and return whether another extension follows.
pub fn skip<R>(reader: &mut R, s: &str, header: u8) -> Result<bool, DidntRead>
where
    R: Reader,
{
    read(reader, s, header).map(|(_, more)| more)
}

/// Skip every extension of a message that defines none.
pub fn skip_all<R>(reader: &mut R, s: &str) -> Result<(), DidntRead>
where
    R: Reader,
{
    let mut dropped = Vec::new();
    read_chain(reader, s, true, &mut dropped, |_, _| Ok(None))
}

/// Walks the extension chain of a message. `known` decodes the extensions the message
/// defines and answers `None`, without consuming anything, for the others. Those are kept
/// in `unknown` unless they are mandatory.
pub fn read_chain<R, F>(
    reader: &mut R,
    s: &str,
    present: bool,
    unknown: &mut Vec<ZExtUnknown>,
    mut known: F,
) -> Result<(), DidntRead>
where
    R: Reader,
    F: FnMut(Zenoh080Header, &mut R) -> Result<Option<bool>, DidntRead>,
{
    let codec = Zenoh080::new();
    let mut more = present;
    while more {
        let header: u8 = codec.read(&mut *reader)?;
        more = match known(Zenoh080Header::new(header), &mut *reader)? {
            Some(more) => more,
            None => {
                let (u, more) = read(reader, s, header)?;
                unknown.push(u);
                more
            }
        };
    }
    Ok(())
}

/// Stores a decoded extension in its slot and forwards the chain flag.
pub fn store<T>(slot: &mut Option<T>, (value, more): (T, bool)) -> Option<bool> {
    *slot = Some(value);
    Some(more)
}

/// Counts the extensions of a message still to be written so that all but the last one
/// carry the `Z` flag. Unknown extensions are always written last.
#[derive(Debug)]
pub struct ExtChain {
    left: usize,
}

impl ExtChain {
    pub fn new(known: &[bool], unknown: &[ZExtUnknown]) -> Self {
        let left = known.iter().filter(|k| **k).count() + unknown.len();
        Self { left }
    }

    /// `z` when at least one extension is pending, 0 otherwise.
    pub const fn flag(&self, z: u8) -> u8 {
        if self.left != 0 {
            z
        } else {
            0
        }
    }

    pub fn write<'w, W, T>(&mut self, writer: &'w mut W, ext: T) -> Result<(), DidntWrite>
    where
        Zenoh080: WCodec<(T, bool), &'w mut W, Output = Result<(), DidntWrite>>,
    {
        self.left = self.left.saturating_sub(1);
        Zenoh080::new().write(writer, (ext, self.left != 0))
    }

    pub fn write_opt<'w, W, T>(
        &mut self,
        writer: &'w mut W,
        ext: Option<T>,
    ) -> Result<(), DidntWrite>
    where
        Zenoh080: WCodec<(T, bool), &'w mut W, Output = Result<(), DidntWrite>>,
    {
        match ext {
            Some(ext) => self.write(writer, ext),
            None => Ok(()),
        }
    }

    pub fn finish<W>(mut self, writer: &mut W, unknown: &[ZExtUnknown]) -> Result<(), DidntWrite>
    where
        W: Writer,
    {
        for u in unknown {
            self.write(&mut *writer, u)?;
        }
        Ok(())
    }
}

/// Write extensions kept verbatim from a decoded message.
pub fn write_unknown<W>(writer: &mut W, exts: &[ZExtUnknown]) -> Result<(), DidntWrite>
where
    W: Writer,
{
    ExtChain::new(&[], exts).finish(writer, exts)
}

const fn ext_header(id: u8, more: bool) -> u8 {
    if more {
        id | iext::FLAG_Z
    } else {
        id
    }
}

fn chained(header: u8) -> bool {
    header & iext::FLAG_Z != 0
}

fn check_id(header: u8, id: u8) -> Result<(), DidntRead> {
    if iext::eid(header) == id {
        Ok(())
    } else {
        Err(DidntRead)
    }
}

macro_rules! ext_read_after_header {
    ($($ext:ident),*) => {
        $(
            impl<const ID: u8, R> RCodec<($ext<{ ID }>, bool), &mut R> for Zenoh080
            where
                R: Reader,
            {
                type Error = DidntRead;

                fn read(self, reader: &mut R) -> Result<($ext<{ ID }>, bool), Self::Error> {
                    let header: u8 = self.read(&mut *reader)?;
                    Zenoh080Header::new(header).read(&mut *reader)
                }
            }
        )*
    };
}

ext_read_after_header!(ZExtUnit, ZExtZ64, ZExtZBuf, ZExtZBufHeader);

impl<const ID: u8, W> WCodec<(&ZExtUnit<{ ID }>, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (_, more): (&ZExtUnit<{ ID }>, bool)) -> Self::Output {
        self.write(&mut *writer, ext_header(ID, more))
    }
}

impl<const ID: u8, R> RCodec<(ZExtUnit<{ ID }>, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, _reader: &mut R) -> Result<(ZExtUnit<{ ID }>, bool), Self::Error> {
        check_id(self.header, ID)?;
        Ok((ZExtUnit::new(), chained(self.header)))
    }
}

impl<const ID: u8, W> WCodec<(&ZExtZ64<{ ID }>, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (x, more): (&ZExtZ64<{ ID }>, bool)) -> Self::Output {
        self.write(&mut *writer, ext_header(ID, more))?;
        self.write(&mut *writer, x.value)
    }
}

impl<const ID: u8, R> RCodec<(ZExtZ64<{ ID }>, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(ZExtZ64<{ ID }>, bool), Self::Error> {
        check_id(self.header, ID)?;
        let value: u64 = self.codec.read(&mut *reader)?;
        Ok((ZExtZ64::new(value), chained(self.header)))
    }
}

impl<const ID: u8, W> WCodec<(&ZExtZBuf<{ ID }>, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (x, more): (&ZExtZBuf<{ ID }>, bool)) -> Self::Output {
        self.write(&mut *writer, ext_header(ID, more))?;
        Zenoh080Bounded::<u32>::new().write(&mut *writer, &x.value)
    }
}

impl<const ID: u8, R> RCodec<(ZExtZBuf<{ ID }>, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(ZExtZBuf<{ ID }>, bool), Self::Error> {
        check_id(self.header, ID)?;
        let value: ZBuf = Zenoh080Bounded::<u32>::new().read(&mut *reader)?;
        Ok((ZExtZBuf::new(value), chained(self.header)))
    }
}

// Only the length is handled here, the caller encodes the body in place.
impl<const ID: u8, W> WCodec<(&ZExtZBufHeader<{ ID }>, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (x, more): (&ZExtZBufHeader<{ ID }>, bool)) -> Self::Output {
        self.write(&mut *writer, ext_header(ID, more))?;
        Zenoh080Bounded::<u32>::new().write(&mut *writer, x.len)
    }
}

impl<const ID: u8, R> RCodec<(ZExtZBufHeader<{ ID }>, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(ZExtZBufHeader<{ ID }>, bool), Self::Error> {
        check_id(self.header, ID)?;
        let len: usize = Zenoh080Bounded::<u32>::new().read(&mut *reader)?;
        if len > reader.remaining() {
            return Err(DidntRead);
        }
        Ok((ZExtZBufHeader::new(len), chained(self.header)))
    }
}

impl LCodec<&ZExtUnknown> for Zenoh080 {
    fn w_len(self, x: &ZExtUnknown) -> usize {
        1 + match &x.body {
            ZExtBody::Unit => 0,
            ZExtBody::Z64(v) => self.w_len(*v),
            ZExtBody::ZBuf(v) => self.w_len(v),
        }
    }
}

impl<W> WCodec<(&ZExtUnknown, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (x, more): (&ZExtUnknown, bool)) -> Self::Output {
        let id = ext_header(x.id & !iext::ENC_MASK, more);
        match &x.body {
            ZExtBody::Unit => self.write(&mut *writer, id | iext::ENC_UNIT),
            ZExtBody::Z64(v) => {
                self.write(&mut *writer, id | iext::ENC_Z64)?;
                self.write(&mut *writer, *v)
            }
            ZExtBody::ZBuf(v) => {
                self.write(&mut *writer, id | iext::ENC_ZBUF)?;
                Zenoh080Bounded::<u32>::new().write(&mut *writer, v)
            }
        }
    }
}

impl<R> RCodec<(ZExtUnknown, bool), &mut R> for Zenoh080
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(ZExtUnknown, bool), Self::Error> {
        let header: u8 = self.read(&mut *reader)?;
        Zenoh080Header::new(header).read(&mut *reader)
    }
}

impl<R> RCodec<(ZExtUnknown, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(ZExtUnknown, bool), Self::Error> {
        let body = match self.header & iext::ENC_MASK {
            iext::ENC_UNIT => ZExtBody::Unit,
            iext::ENC_Z64 => ZExtBody::Z64(self.codec.read(&mut *reader)?),
            iext::ENC_ZBUF => ZExtBody::ZBuf(Zenoh080Bounded::<u32>::new().read(&mut *reader)?),
            _ => return Err(DidntRead),
        };
        let u = ZExtUnknown {
            id: iext::eid(self.header),
            body,
        };
        Ok((u, chained(self.header)))
    }
}

#[cfg(test)]
mod tests {
    use zpico_buffers::{reader::HasReader, writer::HasWriter};
    use zpico_protocol::{zextunit, zextz64, zextzbuf};

    use super::*;

    type Known = zextz64!(0x1, false);

    #[test]
    fn unknown_mandatory_fails() {
        type Mandatory = zextunit!(0x7, true);

        let mut buffer = vec![];
        let mut writer = buffer.writer();
        let codec = Zenoh080::new();
        codec.write(&mut writer, (&Known::new(3), true)).unwrap();
        codec.write(&mut writer, (&Mandatory::new(), false)).unwrap();

        let mut reader = buffer.reader();
        let (k, more): (Known, bool) = codec.read(&mut reader).unwrap();
        assert_eq!(k.value, 3);
        assert!(more);

        let header: u8 = codec.read(&mut reader).unwrap();
        assert!(read(&mut reader, "Test", header).is_err());
    }

    #[test]
    fn unknown_optional_is_skipped() {
        type Optional = zextzbuf!(0x9, false);

        let mut buffer = vec![];
        let mut writer = buffer.writer();
        let codec = Zenoh080::new();
        codec
            .write(&mut writer, (&Optional::new(ZBuf::from(vec![1, 2, 3])), true))
            .unwrap();
        codec.write(&mut writer, (&Known::new(42), false)).unwrap();

        let mut reader = buffer.reader();
        let header: u8 = codec.read(&mut reader).unwrap();
        assert!(skip(&mut reader, "Test", header).unwrap());
        let (k, more): (Known, bool) = codec.read(&mut reader).unwrap();
        assert_eq!(k.value, 42);
        assert!(!more);
    }

    #[test]
    fn mismatching_id_is_rejected() {
        type Other = zextz64!(0x2, false);

        let mut buffer = vec![];
        let mut writer = buffer.writer();
        let codec = Zenoh080::new();
        codec.write(&mut writer, (&Known::new(1), false)).unwrap();

        let mut reader = buffer.reader();
        let r: Result<(Other, bool), _> = codec.read(&mut reader);
        assert!(r.is_err());
    }

    #[test]
    fn chain_flags_all_but_last() {
        let unknown = vec![ZExtUnknown::new(0x0c, false, ZExtBody::Unit)];
        let mut chain = ExtChain::new(&[true, false], &unknown);
        assert_eq!(chain.flag(iext::FLAG_Z), iext::FLAG_Z);

        let mut buffer = vec![];
        let mut writer = buffer.writer();
        chain.write(&mut writer, &Known::new(7)).unwrap();
        chain.finish(&mut writer, &unknown).unwrap();

        let mut reader = buffer.reader();
        let mut value: Option<Known> = None;
        let mut kept = Vec::new();
        read_chain(&mut reader, "Test", true, &mut kept, |h, r| {
            if iext::eid(h.header) == Known::ID {
                Ok(store(&mut value, h.read(&mut *r)?))
            } else {
                Ok(None)
            }
        })
        .unwrap();
        assert_eq!(value.map(|k| k.value), Some(7));
        assert_eq!(kept, unknown);
        assert!(ExtChain::new(&[false], &[]).flag(iext::FLAG_Z) == 0);
    }
}
