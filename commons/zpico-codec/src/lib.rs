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
//! Byte-level encoding of the messages defined in `zpico-protocol`. Every message has a
//! [`WCodec`] and an [`RCodec`] implementation on [`Zenoh080`]; decoding never reads past
//! the end of the [`Reader`](zpico_buffers::reader::Reader) it is given.
#[macro_use]
mod macros {
    /// Decodes the header byte of a message and hands it over to the [`Zenoh080Header`]
    /// codec of that message.
    macro_rules! read_after_header {
        ($($t:ty),* $(,)?) => {
            $(
                impl<R> $crate::RCodec<$t, &mut R> for $crate::Zenoh080
                where
                    R: zpico_buffers::reader::Reader,
                {
                    type Error = zpico_buffers::reader::DidntRead;

                    fn read(self, reader: &mut R) -> Result<$t, Self::Error> {
                        let header: u8 = $crate::RCodec::read(self, &mut *reader)?;
                        $crate::RCodec::read($crate::Zenoh080Header::new(header), reader)
                    }
                }
            )*
        };
    }
}

pub mod common;
pub mod core;
pub mod network;
pub mod scouting;
pub mod transport;
pub mod zenoh;

use ::core::marker::PhantomData;

use zpico_buffers::reader::DidntRead;
use zpico_protocol::common::imsg;

pub trait WCodec<Message, Buffer> {
    type Output;
    fn write(self, buffer: Buffer, message: Message) -> Self::Output;
}

pub trait RCodec<Message, Buffer> {
    type Error;
    fn read(self, buffer: Buffer) -> Result<Message, Self::Error>;
}

// Calculate the length of the value once serialized
pub trait LCodec<Message> {
    fn w_len(self, message: Message) -> usize;
}

#[derive(Clone, Copy, Default)]
pub struct Zenoh080;

impl Zenoh080 {
    pub const fn new() -> Self {
        Self
    }
}

/// A codec for the part of a message that follows its already decoded header byte.
#[derive(Clone, Copy)]
pub struct Zenoh080Header {
    pub header: u8,
    pub codec: Zenoh080,
}

impl Zenoh080Header {
    pub const fn new(header: u8) -> Self {
        Self {
            header,
            codec: Zenoh080::new(),
        }
    }

    pub const fn has(&self, flag: u8) -> bool {
        imsg::has_flag(self.header, flag)
    }

    pub fn expect(&self, mid: u8) -> Result<(), DidntRead> {
        if imsg::mid(self.header) == mid {
            Ok(())
        } else {
            Err(DidntRead)
        }
    }

    /// Decodes a `T` when `flag` is set in the header.
    pub fn read_if<'r, T, R>(&self, flag: u8, reader: &'r mut R) -> Result<Option<T>, DidntRead>
    where
        Zenoh080: RCodec<T, &'r mut R, Error = DidntRead>,
    {
        if self.has(flag) {
            self.codec.read(reader).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Raw bytes whose length is known from the context instead of being written on the wire.
#[derive(Clone, Copy)]
pub struct Zenoh080Length {
    pub length: usize,
    pub codec: Zenoh080,
}

impl Zenoh080Length {
    pub const fn new(length: usize) -> Self {
        Self {
            length,
            codec: Zenoh080::new(),
        }
    }
}

/// Length-prefixed values whose length must fit in `T`.
#[derive(Clone, Copy)]
pub struct Zenoh080Bounded<T> {
    _t: PhantomData<T>,
}

impl<T> Default for Zenoh080Bounded<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Zenoh080Bounded<T> {
    pub const fn new() -> Self {
        Self { _t: PhantomData }
    }
}
