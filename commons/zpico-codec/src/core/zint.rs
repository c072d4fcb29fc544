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

use crate::{LCodec, RCodec, WCodec, Zenoh080, Zenoh080Bounded};

/// Maximum number of bytes a zint takes on the wire: ceil(64 / 7).
pub const VLE_LEN_MAX: usize = 10;

const fn vle_len(x: u64) -> usize {
    const B1: u64 = u64::MAX << 7;
    const B2: u64 = u64::MAX << (7 * 2);
    const B3: u64 = u64::MAX << (7 * 3);
    const B4: u64 = u64::MAX << (7 * 4);
    const B5: u64 = u64::MAX << (7 * 5);
    const B6: u64 = u64::MAX << (7 * 6);
    const B7: u64 = u64::MAX << (7 * 7);
    const B8: u64 = u64::MAX << (7 * 8);
    const B9: u64 = u64::MAX << (7 * 9);

    if (x & B1) == 0 {
        1
    } else if (x & B2) == 0 {
        2
    } else if (x & B3) == 0 {
        3
    } else if (x & B4) == 0 {
        4
    } else if (x & B5) == 0 {
        5
    } else if (x & B6) == 0 {
        6
    } else if (x & B7) == 0 {
        7
    } else if (x & B8) == 0 {
        8
    } else if (x & B9) == 0 {
        9
    } else {
        10
    }
}

impl LCodec<u64> for Zenoh080 {
    fn w_len(self, x: u64) -> usize {
        vle_len(x)
    }
}

impl LCodec<usize> for Zenoh080 {
    fn w_len(self, x: usize) -> usize {
        self.w_len(x as u64)
    }
}

impl LCodec<u32> for Zenoh080 {
    fn w_len(self, x: u32) -> usize {
        self.w_len(x as u64)
    }
}

impl LCodec<u16> for Zenoh080 {
    fn w_len(self, x: u16) -> usize {
        self.w_len(x as u64)
    }
}

// u64
impl<W> WCodec<u64, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, mut x: u64) -> Self::Output {
        let mut buffer = [0u8; VLE_LEN_MAX];
        let mut len = 0;
        while x > 0x7f {
            buffer[len] = (x as u8) | 0x80;
            len += 1;
            x >>= 7;
        }
        buffer[len] = x as u8;
        writer.write_exact(&buffer[..len + 1])
    }
}

impl<W> WCodec<&u64, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &u64) -> Self::Output {
        self.write(writer, *x)
    }
}

impl<R> RCodec<u64, &mut R> for Zenoh080
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<u64, Self::Error> {
        let mut b = reader.read_u8()?;

        let mut v = 0;
        let mut i = 0;
        // 7 * 9 = 63 bits are read in the loop, the last byte carries the top bit only.
        while (b & 0x80) != 0 && i != 7 * (VLE_LEN_MAX - 1) {
            v |= ((b & 0x7f) as u64) << i;
            b = reader.read_u8()?;
            i += 7;
        }
        if i == 7 * (VLE_LEN_MAX - 1) && b > 0x01 {
            // Overflow or an 11th byte
            return Err(DidntRead);
        }
        v |= (b as u64) << i;
        Ok(v)
    }
}

// usize
impl<W> WCodec<usize, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: usize) -> Self::Output {
        let x: u64 = x.try_into().map_err(|_| DidntWrite)?;
        self.write(writer, x)
    }
}

impl<R> RCodec<usize, &mut R> for Zenoh080
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<usize, Self::Error> {
        let x: u64 = self.read(reader)?;
        x.try_into().map_err(|_| DidntRead)
    }
}

// Bounded
macro_rules! zint_impl_codec {
    ($zint:ty, $bound:ty) => {
        impl<W> WCodec<$zint, &mut W> for Zenoh080Bounded<$bound>
        where
            W: Writer,
        {
            type Output = Result<(), DidntWrite>;

            fn write(self, writer: &mut W, x: $zint) -> Self::Output {
                if (x as u64) > (<$bound>::MAX as u64) {
                    return Err(DidntWrite);
                }
                Zenoh080::new().write(writer, x as u64)
            }
        }

        impl<R> RCodec<$zint, &mut R> for Zenoh080Bounded<$bound>
        where
            R: Reader,
        {
            type Error = DidntRead;

            fn read(self, reader: &mut R) -> Result<$zint, Self::Error> {
                let x: u64 = Zenoh080::new().read(reader)?;
                if x > (<$bound>::MAX as u64) {
                    return Err(DidntRead);
                }
                Ok(x as $zint)
            }
        }
    };
}

macro_rules! zint_impl {
    ($zint:ty) => {
        zint_impl_codec!($zint, $zint);

        impl<W> WCodec<$zint, &mut W> for Zenoh080
        where
            W: Writer,
        {
            type Output = Result<(), DidntWrite>;

            fn write(self, writer: &mut W, x: $zint) -> Self::Output {
                self.write(writer, x as u64)
            }
        }

        impl<W> WCodec<&$zint, &mut W> for Zenoh080
        where
            W: Writer,
        {
            type Output = Result<(), DidntWrite>;

            fn write(self, writer: &mut W, x: &$zint) -> Self::Output {
                self.write(writer, *x)
            }
        }

        impl<R> RCodec<$zint, &mut R> for Zenoh080
        where
            R: Reader,
        {
            type Error = DidntRead;

            fn read(self, reader: &mut R) -> Result<$zint, Self::Error> {
                Zenoh080Bounded::<$zint>::new().read(reader)
            }
        }
    };
}

// u8 is written as a raw byte by Zenoh080 (headers, flags), only the bounded codec uses a zint.
zint_impl_codec!(u8, u8);
zint_impl!(u16);
zint_impl!(u32);

zint_impl_codec!(u64, u8);
zint_impl_codec!(u64, u16);
zint_impl_codec!(u64, u32);
zint_impl_codec!(u64, u64);
zint_impl_codec!(usize, u8);
zint_impl_codec!(usize, u16);
zint_impl_codec!(usize, u32);
zint_impl_codec!(usize, usize);

#[cfg(test)]
mod tests {
    use zpico_buffers::{reader::HasReader, writer::HasWriter};

    use super::*;

    fn encode(x: u64) -> Vec<u8> {
        let mut buffer = vec![];
        let mut writer = buffer.writer();
        Zenoh080::new().write(&mut writer, x).unwrap();
        buffer
    }

    #[test]
    fn boundaries() {
        assert_eq!(encode(0), [0x00]);
        assert_eq!(encode(127), [0x7f]);
        assert_eq!(encode(128), [0x80, 0x01]);
        assert_eq!(encode(16_383), [0xff, 0x7f]);
        assert_eq!(encode(16_384), [0x80, 0x80, 0x01]);
        assert_eq!(encode(u64::MAX).len(), VLE_LEN_MAX);

        for x in [0, 127, 128, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let buffer = encode(x);
            assert_eq!(buffer.len(), Zenoh080::new().w_len(x));
            let mut reader = buffer.reader();
            let y: u64 = Zenoh080::new().read(&mut reader).unwrap();
            assert_eq!(x, y);
        }
    }

    #[test]
    fn truncated_and_overflowing() {
        let codec = Zenoh080::new();

        let mut reader: &[u8] = &[0x80, 0x80];
        assert!(RCodec::<u64, _>::read(codec, &mut reader).is_err());

        // 11 bytes with continuation
        let mut reader: &[u8] = &[0xff; 11];
        assert!(RCodec::<u64, _>::read(codec, &mut reader).is_err());

        // 10th byte carrying more than the last bit
        let mut bytes = [0xffu8; 10];
        bytes[9] = 0x02;
        let mut reader = bytes.as_slice();
        assert!(RCodec::<u64, _>::read(codec, &mut reader).is_err());

        let mut reader: &[u8] = &[];
        assert!(RCodec::<u64, _>::read(codec, &mut reader).is_err());
    }

    #[test]
    fn bounded() {
        let buffer = encode(u16::MAX as u64 + 1);
        let mut reader = buffer.reader();
        let r: Result<u16, _> = Zenoh080::new().read(&mut reader);
        assert!(r.is_err());

        let buffer = encode(u8::MAX as u64);
        let mut reader = buffer.reader();
        let r: u8 = Zenoh080Bounded::<u8>::new().read(&mut reader).unwrap();
        assert_eq!(r, u8::MAX);
    }
}
