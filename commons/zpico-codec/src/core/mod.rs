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
mod encoding;
mod timestamp;
pub mod wire_expr;
mod zbuf;
mod zenohid;
pub mod zint;
mod zslice;

use zpico_buffers::{
    reader::{DidntRead, Reader},
    writer::{DidntWrite, Writer},
};

use crate::{LCodec, RCodec, WCodec, Zenoh080, Zenoh080Bounded};

// u8
impl<W> WCodec<u8, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: u8) -> Self::Output {
        writer.write_u8(x)
    }
}

impl<W> WCodec<&u8, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &u8) -> Self::Output {
        self.write(writer, *x)
    }
}

impl<R> RCodec<u8, &mut R> for Zenoh080
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<u8, Self::Error> {
        reader.read_u8()
    }
}

// [u8; N]
impl<W, const N: usize> WCodec<[u8; N], &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: [u8; N]) -> Self::Output {
        writer.write_exact(x.as_slice())
    }
}

impl<W, const N: usize> WCodec<&[u8; N], &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &[u8; N]) -> Self::Output {
        self.write(writer, *x)
    }
}

impl<R, const N: usize> RCodec<[u8; N], &mut R> for Zenoh080
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<[u8; N], Self::Error> {
        let mut x = [0u8; N];
        reader.read_exact(&mut x)?;
        Ok(x)
    }
}

// &[u8] / Vec<u8> / &str / String, length-prefixed
macro_rules! vec_impl {
    ($bound:ty) => {
        impl LCodec<&[u8]> for Zenoh080Bounded<$bound> {
            fn w_len(self, x: &[u8]) -> usize {
                Zenoh080::new().w_len(x.len()) + x.len()
            }
        }

        impl<W> WCodec<&[u8], &mut W> for Zenoh080Bounded<$bound>
        where
            W: Writer,
        {
            type Output = Result<(), DidntWrite>;

            fn write(self, writer: &mut W, x: &[u8]) -> Self::Output {
                self.write(&mut *writer, x.len())?;
                writer.write_exact(x)
            }
        }

        impl<R> RCodec<Vec<u8>, &mut R> for Zenoh080Bounded<$bound>
        where
            R: Reader,
        {
            type Error = DidntRead;

            fn read(self, reader: &mut R) -> Result<Vec<u8>, Self::Error> {
                let len: usize = self.read(&mut *reader)?;
                // The length comes from the wire: never allocate more than what is left.
                if len > reader.remaining() {
                    return Err(DidntRead);
                }
                let mut buff = vec![0u8; len];
                if len != 0 {
                    reader.read_exact(&mut buff[..])?;
                }
                Ok(buff)
            }
        }

        impl<W> WCodec<&str, &mut W> for Zenoh080Bounded<$bound>
        where
            W: Writer,
        {
            type Output = Result<(), DidntWrite>;

            fn write(self, writer: &mut W, x: &str) -> Self::Output {
                self.write(&mut *writer, x.as_bytes())
            }
        }

        impl<W> WCodec<&String, &mut W> for Zenoh080Bounded<$bound>
        where
            W: Writer,
        {
            type Output = Result<(), DidntWrite>;

            fn write(self, writer: &mut W, x: &String) -> Self::Output {
                self.write(&mut *writer, x.as_str())
            }
        }

        impl<R> RCodec<String, &mut R> for Zenoh080Bounded<$bound>
        where
            R: Reader,
        {
            type Error = DidntRead;

            fn read(self, reader: &mut R) -> Result<String, Self::Error> {
                let vec: Vec<u8> = self.read(&mut *reader)?;
                String::from_utf8(vec).map_err(|_| DidntRead)
            }
        }
    };
}

vec_impl!(u8);
vec_impl!(u16);
vec_impl!(u32);
vec_impl!(usize);

impl LCodec<&[u8]> for Zenoh080 {
    fn w_len(self, x: &[u8]) -> usize {
        Zenoh080Bounded::<usize>::new().w_len(x)
    }
}

impl LCodec<&str> for Zenoh080 {
    fn w_len(self, x: &str) -> usize {
        self.w_len(x.as_bytes())
    }
}

impl<W> WCodec<&[u8], &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &[u8]) -> Self::Output {
        Zenoh080Bounded::<usize>::new().write(writer, x)
    }
}

impl<R> RCodec<Vec<u8>, &mut R> for Zenoh080
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Vec<u8>, Self::Error> {
        Zenoh080Bounded::<usize>::new().read(reader)
    }
}

impl<W> WCodec<&str, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &str) -> Self::Output {
        Zenoh080Bounded::<usize>::new().write(writer, x)
    }
}

impl<W> WCodec<&String, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &String) -> Self::Output {
        self.write(writer, x.as_str())
    }
}

impl<R> RCodec<String, &mut R> for Zenoh080
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<String, Self::Error> {
        Zenoh080Bounded::<usize>::new().read(reader)
    }
}

#[cfg(test)]
mod tests {
    use zpico_buffers::{reader::HasReader, writer::HasWriter};

    use super::*;

    #[test]
    fn strings_are_not_nul_terminated() {
        let mut buffer = vec![];
        let mut writer = buffer.writer();
        Zenoh080::new().write(&mut writer, "demo").unwrap();
        assert_eq!(buffer, [4, b'd', b'e', b'm', b'o']);

        let mut reader = buffer.reader();
        let s: String = Zenoh080::new().read(&mut reader).unwrap();
        assert_eq!(s, "demo");
    }

    #[test]
    fn slice_length_beyond_buffer() {
        // Claims 200 bytes, carries 2.
        let mut reader: &[u8] = &[0xc8, 0x01, 0xaa, 0xbb];
        let r: Result<Vec<u8>, _> = Zenoh080::new().read(&mut reader);
        assert!(r.is_err());
    }

    #[test]
    fn bounded_slice_length() {
        let mut buffer = vec![];
        let mut writer = buffer.writer();
        let long = vec![0u8; u8::MAX as usize + 1];
        assert!(Zenoh080Bounded::<u8>::new()
            .write(&mut writer, long.as_slice())
            .is_err());
    }

    #[test]
    fn invalid_utf8() {
        let mut reader: &[u8] = &[2, 0xc3, 0x28];
        let r: Result<String, _> = Zenoh080::new().read(&mut reader);
        assert!(r.is_err());
    }
}
