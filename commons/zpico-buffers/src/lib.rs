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
//! ⚠️ WARNING ⚠️
//!
//! This crate is intended for zpico's internal use.
//!
//! Byte buffers plus the [`writer::Writer`] and [`reader::Reader`] traits the codec is
//! generic over. Batches are assembled in a growable `Vec<u8>` and decoded from a bounded
//! `&[u8]`, so a reader never looks past the batch it was handed.
mod slice;
pub mod vec;
mod zbuf;
mod zslice;

pub use zbuf::*;
pub use zslice::*;

pub mod buffer {
    use std::borrow::Cow;

    pub trait Buffer {
        fn len(&self) -> usize;

        fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    /// A buffer made of one or more slices that are not contiguous in memory.
    pub trait SplitBuffer: Buffer {
        type Slices<'a>: Iterator<Item = &'a [u8]> + ExactSizeIterator
        where
            Self: 'a;

        fn slices(&self) -> Self::Slices<'_>;

        /// Borrows the bytes when they sit in a single slice, copies them otherwise.
        fn contiguous(&self) -> Cow<'_, [u8]> {
            let mut slices = self.slices();
            if slices.len() <= 1 {
                return Cow::Borrowed(slices.next().unwrap_or_default());
            }
            let mut bytes = Vec::with_capacity(self.len());
            slices.for_each(|s| bytes.extend_from_slice(s));
            Cow::Owned(bytes)
        }
    }
}

pub mod writer {
    use crate::ZSlice;

    #[derive(Debug, Clone, Copy)]
    pub struct DidntWrite;

    /// Sink for encoded messages. A write either lands whole or fails.
    pub trait Writer {
        fn write_exact(&mut self, bytes: &[u8]) -> Result<(), DidntWrite>;

        fn write_u8(&mut self, byte: u8) -> Result<(), DidntWrite> {
            self.write_exact(&[byte])
        }

        fn write_zslice(&mut self, slice: &ZSlice) -> Result<(), DidntWrite> {
            self.write_exact(slice.as_slice())
        }
    }

    impl<W: Writer + ?Sized> Writer for &mut W {
        fn write_exact(&mut self, bytes: &[u8]) -> Result<(), DidntWrite> {
            (**self).write_exact(bytes)
        }

        fn write_u8(&mut self, byte: u8) -> Result<(), DidntWrite> {
            (**self).write_u8(byte)
        }
    }

    pub trait HasWriter {
        type Writer: Writer;

        fn writer(self) -> Self::Writer;
    }
}

pub mod reader {
    use crate::ZSlice;

    #[derive(Debug, Clone, Copy)]
    pub struct DidntRead;

    /// Source of encoded messages. A read that cannot be satisfied fails without
    /// consuming anything.
    pub trait Reader {
        fn read_exact(&mut self, into: &mut [u8]) -> Result<(), DidntRead>;
        fn read_zslice(&mut self, len: usize) -> Result<ZSlice, DidntRead>;
        fn remaining(&self) -> usize;

        fn read_u8(&mut self) -> Result<u8, DidntRead> {
            let mut byte = [0];
            self.read_exact(&mut byte)?;
            Ok(byte[0])
        }

        fn can_read(&self) -> bool {
            self.remaining() != 0
        }
    }

    impl<R: Reader + ?Sized> Reader for &mut R {
        fn read_exact(&mut self, into: &mut [u8]) -> Result<(), DidntRead> {
            (**self).read_exact(into)
        }

        fn read_zslice(&mut self, len: usize) -> Result<ZSlice, DidntRead> {
            (**self).read_zslice(len)
        }

        fn remaining(&self) -> usize {
            (**self).remaining()
        }

        fn read_u8(&mut self) -> Result<u8, DidntRead> {
            (**self).read_u8()
        }
    }

    /// A reader that can step back to an earlier position, used to stop a frame at the
    /// first byte that does not start a network message.
    pub trait BacktrackableReader: Reader {
        type Mark;

        fn mark(&mut self) -> Self::Mark;
        fn rewind(&mut self, mark: Self::Mark) -> bool;
    }

    impl<R: BacktrackableReader + ?Sized> BacktrackableReader for &mut R {
        type Mark = R::Mark;

        fn mark(&mut self) -> Self::Mark {
            (**self).mark()
        }

        fn rewind(&mut self, mark: Self::Mark) -> bool {
            (**self).rewind(mark)
        }
    }

    pub trait HasReader {
        type Reader: Reader;

        fn reader(self) -> Self::Reader;
    }
}
