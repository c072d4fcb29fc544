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
use std::fmt;

use zpico_buffers::ZBuf;

/// # Zenoh extensions
///
/// A zenoh extension is encoded as TLV as follows:
///
/// ```text
///  7 6 5 4 3 2 1 0
/// +-+-+-+-+-+-+-+-+
/// |Z|ENC|M|   ID  |
/// +-+---+-+-------+
/// %    length     % -- If ENC == Z64 || ENC == ZBuf (z32)
/// +---------------+
/// ~     [u8]      ~ -- If ENC == ZBuf
/// +---------------+
/// ```
///
/// Where:
///
/// - Z: Extension flag. If Z==1 then another extension will follow.
///
/// - ENC: Extension encoding. It indicates the encoding of the extension body.
///        - 0b00: Unit. The extension has no body.
///        - 0b01: Z64. The extension body is a single zint.
///        - 0b10: ZBuf. The extension body is a length-prefixed byte buffer.
///        - 0b11: Reserved.
///
/// - M: Mandatory flag. If M==1 then the extension MUST be understood by the
///      receiver, otherwise the whole message MUST be dropped. If M==0 the
///      receiver can skip the extension it doesn't understand.
///
/// - ID: Extension identifier, unique within a message type.
pub mod iext {
    use std::fmt;

    pub const ID_BITS: u8 = 4;
    pub const ID_MASK: u8 = !(u8::MAX << ID_BITS);

    pub const FLAG_M: u8 = 1 << ID_BITS;
    pub const ENC_UNIT: u8 = 0b00 << 5;
    pub const ENC_Z64: u8 = 0b01 << 5;
    pub const ENC_ZBUF: u8 = 0b10 << 5;
    pub const ENC_MASK: u8 = 0b11 << 5;
    pub const FLAG_Z: u8 = 1 << 7;

    /// The extension identity: id, mandatory bit and encoding.
    pub const fn eid(header: u8) -> u8 {
        header & !FLAG_Z
    }

    pub const fn mid(header: u8) -> u8 {
        header & ID_MASK
    }

    pub const fn is_mandatory(header: u8) -> bool {
        crate::common::imsg::has_flag(header, FLAG_M)
    }

    pub const fn ext_id(id: u8, enc: u8, mandatory: bool) -> u8 {
        let mut eid = (id & ID_MASK) | enc;
        if mandatory {
            eid |= FLAG_M;
        }
        eid
    }

    pub(super) fn fmt(f: &mut fmt::DebugStruct, id: u8) {
        f.field("Id", &(id & ID_MASK))
            .field("Mandatory", &is_mandatory(id))
            .field(
                "Encoding",
                match id & ENC_MASK {
                    ENC_UNIT => &"Unit",
                    ENC_Z64 => &"Z64",
                    ENC_ZBUF => &"ZBuf",
                    _ => &"Unknown",
                },
            );
    }
}

pub struct DidntConvert;

#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ZExtUnit<const ID: u8>;

impl<const ID: u8> Default for ZExtUnit<{ ID }> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const ID: u8> ZExtUnit<{ ID }> {
    pub const ID: u8 = ID;

    pub const fn new() -> Self {
        Self
    }

    pub const fn transmute<const DI: u8>(self) -> ZExtUnit<{ DI }> {
        ZExtUnit::new()
    }

    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        Self::new()
    }
}

impl<const ID: u8> fmt::Debug for ZExtUnit<{ ID }> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ZExtUnit");
        iext::fmt(&mut s, ID);
        s.finish()
    }
}

impl<const ID: u8> TryFrom<ZExtUnknown> for ZExtUnit<{ ID }> {
    type Error = DidntConvert;

    fn try_from(v: ZExtUnknown) -> Result<Self, Self::Error> {
        if v.id != ID {
            return Err(DidntConvert);
        }
        match v.body {
            ZExtBody::Unit => Ok(Self::new()),
            _ => Err(DidntConvert),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ZExtZ64<const ID: u8> {
    pub value: u64,
}

impl<const ID: u8> ZExtZ64<{ ID }> {
    pub const ID: u8 = ID;

    pub const fn new(value: u64) -> Self {
        Self { value }
    }

    pub const fn transmute<const DI: u8>(self) -> ZExtZ64<{ DI }> {
        ZExtZ64::new(self.value)
    }

    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let value: u64 = rng.gen();
        Self { value }
    }
}

impl<const ID: u8> fmt::Debug for ZExtZ64<{ ID }> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ZExtZ64");
        iext::fmt(&mut s, ID);
        s.field("Value", &self.value).finish()
    }
}

impl<const ID: u8> TryFrom<ZExtUnknown> for ZExtZ64<{ ID }> {
    type Error = DidntConvert;

    fn try_from(v: ZExtUnknown) -> Result<Self, Self::Error> {
        if v.id != ID {
            return Err(DidntConvert);
        }
        match v.body {
            ZExtBody::Z64(v) => Ok(Self::new(v)),
            _ => Err(DidntConvert),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ZExtZBuf<const ID: u8> {
    pub value: ZBuf,
}

impl<const ID: u8> ZExtZBuf<{ ID }> {
    pub const ID: u8 = ID;

    pub const fn new(value: ZBuf) -> Self {
        Self { value }
    }

    pub fn transmute<const DI: u8>(self) -> ZExtZBuf<{ DI }> {
        ZExtZBuf::new(self.value)
    }

    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let value = ZBuf::rand(rng.gen_range(0..=64));
        Self { value }
    }
}

impl<const ID: u8> fmt::Debug for ZExtZBuf<{ ID }> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ZExtZBuf");
        iext::fmt(&mut s, ID);
        s.field("Value", &self.value).finish()
    }
}

impl<const ID: u8> TryFrom<ZExtUnknown> for ZExtZBuf<{ ID }> {
    type Error = DidntConvert;

    fn try_from(v: ZExtUnknown) -> Result<Self, Self::Error> {
        if v.id != ID {
            return Err(DidntConvert);
        }
        match v.body {
            ZExtBody::ZBuf(v) => Ok(Self::new(v)),
            _ => Err(DidntConvert),
        }
    }
}

/// The header of a zbuf extension whose body is written in place by a typed codec.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ZExtZBufHeader<const ID: u8> {
    pub len: usize,
}

impl<const ID: u8> ZExtZBufHeader<{ ID }> {
    pub const ID: u8 = ID;

    pub const fn new(len: usize) -> Self {
        Self { len }
    }
}

impl<const ID: u8> fmt::Debug for ZExtZBufHeader<{ ID }> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ZExtZBufHeader");
        iext::fmt(&mut s, ID);
        s.field("Len", &self.len).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZExtBody {
    Unit,
    Z64(u64),
    ZBuf(ZBuf),
}

impl ZExtBody {
    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        match rng.gen_range(0..3) {
            0 => ZExtBody::Unit,
            1 => ZExtBody::Z64(rng.gen()),
            2 => ZExtBody::ZBuf(ZBuf::rand(rng.gen_range(0..=64))),
            _ => unreachable!(),
        }
    }
}

/// An extension whose id the receiver does not understand, kept verbatim.
#[derive(Clone, PartialEq, Eq)]
pub struct ZExtUnknown {
    pub id: u8,
    pub body: ZExtBody,
}

impl ZExtUnknown {
    pub fn new(id: u8, mandatory: bool, body: ZExtBody) -> Self {
        let enc = match &body {
            ZExtBody::Unit => iext::ENC_UNIT,
            ZExtBody::Z64(_) => iext::ENC_Z64,
            ZExtBody::ZBuf(_) => iext::ENC_ZBUF,
        };
        let id = iext::ext_id(id, enc, mandatory);
        Self { id, body }
    }

    pub const fn is_mandatory(&self) -> bool {
        iext::is_mandatory(self.id)
    }

    /// A random non-mandatory extension whose id does not collide with `known`.
    #[cfg(feature = "test")]
    pub fn rand(known: &[u8]) -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        loop {
            let id: u8 = rng.gen_range(0..=iext::ID_MASK);
            let body = ZExtBody::rand();
            let ext = Self::new(id, false, body);
            if !known.iter().any(|k| iext::mid(*k) == id) {
                return ext;
            }
        }
    }

    #[cfg(feature = "test")]
    pub fn rand_vec(known: &[u8]) -> Vec<Self> {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        (0..rng.gen_range(0..3)).map(|_| Self::rand(known)).collect()
    }
}

impl fmt::Debug for ZExtUnknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ZExtUnknown");
        iext::fmt(&mut s, self.id);
        match &self.body {
            ZExtBody::Unit => {}
            ZExtBody::Z64(v) => {
                s.field("Value", v);
            }
            ZExtBody::ZBuf(v) => {
                s.field("Value", v);
            }
        };
        s.finish()
    }
}

impl<const ID: u8> From<ZExtUnit<{ ID }>> for ZExtUnknown {
    fn from(_: ZExtUnit<{ ID }>) -> Self {
        ZExtUnknown {
            id: ID,
            body: ZExtBody::Unit,
        }
    }
}

impl<const ID: u8> From<ZExtZ64<{ ID }>> for ZExtUnknown {
    fn from(e: ZExtZ64<{ ID }>) -> Self {
        ZExtUnknown {
            id: ID,
            body: ZExtBody::Z64(e.value),
        }
    }
}

impl<const ID: u8> From<ZExtZBuf<{ ID }>> for ZExtUnknown {
    fn from(e: ZExtZBuf<{ ID }>) -> Self {
        ZExtUnknown {
            id: ID,
            body: ZExtBody::ZBuf(e.value),
        }
    }
}

// Macros
#[macro_export]
macro_rules! zextunit {
    ($id:expr, $m:expr) => {
        $crate::common::ZExtUnit<{ $crate::common::iext::ext_id($id, $crate::common::iext::ENC_UNIT, $m) }>
    };
}

#[macro_export]
macro_rules! zextz64 {
    ($id:expr, $m:expr) => {
        $crate::common::ZExtZ64<{ $crate::common::iext::ext_id($id, $crate::common::iext::ENC_Z64, $m) }>
    };
}

#[macro_export]
macro_rules! zextzbuf {
    ($id:expr, $m:expr) => {
        $crate::common::ZExtZBuf<{ $crate::common::iext::ext_id($id, $crate::common::iext::ENC_ZBUF, $m) }>
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    type Mandatory = zextz64!(0x2, true);
    type Optional = zextzbuf!(0x3, false);

    #[test]
    fn ids_carry_encoding_and_mandatory_bit() {
        assert_eq!(Mandatory::ID, 0x2 | iext::ENC_Z64 | iext::FLAG_M);
        assert!(iext::is_mandatory(Mandatory::ID));
        assert_eq!(Optional::ID, 0x3 | iext::ENC_ZBUF);
        assert!(!iext::is_mandatory(Optional::ID));
        assert_eq!(iext::eid(Optional::ID | iext::FLAG_Z), Optional::ID);
        assert_eq!(iext::mid(Mandatory::ID), 0x2);
    }

    #[test]
    fn unknown_converts_back() {
        let u: ZExtUnknown = Mandatory::new(42).into();
        assert!(u.is_mandatory());
        let z: Mandatory = u.clone().try_into().ok().unwrap();
        assert_eq!(z.value, 42);
        assert!(Optional::try_from(u).is_err());
    }
}
