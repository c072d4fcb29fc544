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
    common::imsg,
    core::{Locator, WhatAmI},
    scouting::{
        hello::{flag, Hello},
        id,
    },
};

use super::{read_zid, write_zid, zid_len_bits};
use crate::{common::extension, RCodec, WCodec, Zenoh080, Zenoh080Bounded, Zenoh080Header};

// WhatAmI travels as a 2-bit code in the HELLO control byte
fn whatami_to_code(w: WhatAmI) -> u8 {
    match w {
        WhatAmI::Router => 0b00,
        WhatAmI::Peer => 0b01,
        WhatAmI::Client => 0b10,
    }
}

fn whatami_from_code(c: u8) -> Result<WhatAmI, DidntRead> {
    match c & 0b11 {
        0b00 => Ok(WhatAmI::Router),
        0b01 => Ok(WhatAmI::Peer),
        0b10 => Ok(WhatAmI::Client),
        _ => Err(DidntRead),
    }
}

// Locators
impl<W> WCodec<&[Locator], &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &[Locator]) -> Self::Output {
        self.write(&mut *writer, x.len())?;
        let sodec = Zenoh080Bounded::<u8>::new();
        for l in x.iter() {
            sodec.write(&mut *writer, l.as_str())?;
        }
        Ok(())
    }
}

impl<R> RCodec<Vec<Locator>, &mut R> for Zenoh080
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Vec<Locator>, Self::Error> {
        let num: usize = self.read(&mut *reader)?;
        // Every locator takes at least one byte
        if num > reader.remaining() {
            return Err(DidntRead);
        }

        let sodec = Zenoh080Bounded::<u8>::new();
        let mut locators = Vec::with_capacity(num);
        for _ in 0..num {
            let s: String = sodec.read(&mut *reader)?;
            locators.push(Locator::new(s));
        }
        Ok(locators)
    }
}

impl<W> WCodec<&Hello, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Hello) -> Self::Output {
        let has_locators = !x.locators.is_empty();
        self.write(&mut *writer, id::HELLO | imsg::flag_if(has_locators, flag::L))?;
        self.write(&mut *writer, x.version)?;
        self.write(&mut *writer, whatami_to_code(x.whatami) | zid_len_bits(&x.zid))?;
        write_zid(&mut *writer, &x.zid)?;
        if has_locators {
            self.write(&mut *writer, x.locators.as_slice())?;
        }
        Ok(())
    }
}

impl<R> RCodec<Hello, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Hello, Self::Error> {
        self.expect(id::HELLO)?;
        let version: u8 = self.codec.read(&mut *reader)?;
        let flags: u8 = self.codec.read(&mut *reader)?;
        let whatami = whatami_from_code(flags)?;
        let zid = read_zid(&mut *reader, flags)?;
        let locators = if self.has(flag::L) {
            self.codec.read(&mut *reader)?
        } else {
            Vec::new()
        };
        if self.has(flag::Z) {
            extension::skip_all(reader, "Hello")?;
        }

        Ok(Hello {
            version,
            whatami,
            zid,
            locators,
        })
    }
}

read_after_header!(Hello);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whatami_codes() {
        for w in [WhatAmI::Router, WhatAmI::Peer, WhatAmI::Client] {
            assert_eq!(whatami_from_code(whatami_to_code(w)).unwrap(), w);
        }
        assert!(whatami_from_code(0b11).is_err());
    }
}
