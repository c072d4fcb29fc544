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
use crate::{
    reader::HasReader,
    writer::{DidntWrite, HasWriter, Writer},
};

impl<'a> HasWriter for &'a mut Vec<u8> {
    type Writer = Self;

    fn writer(self) -> Self::Writer {
        self
    }
}

// Allocation failures surface as `DidntWrite` instead of aborting.
impl Writer for &mut Vec<u8> {
    fn write_exact(&mut self, bytes: &[u8]) -> Result<(), DidntWrite> {
        self.try_reserve(bytes.len()).map_err(|_| DidntWrite)?;
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn write_u8(&mut self, byte: u8) -> Result<(), DidntWrite> {
        self.try_reserve(1).map_err(|_| DidntWrite)?;
        self.push(byte);
        Ok(())
    }
}

impl<'a> HasReader for &'a Vec<u8> {
    type Reader = &'a [u8];

    fn reader(self) -> Self::Reader {
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        reader::{HasReader, Reader},
        writer::{HasWriter, Writer},
        ZSlice,
    };

    #[test]
    fn writes_append() {
        let mut buff = vec![0x01];
        let mut writer = buff.writer();
        writer.write_u8(0x02).unwrap();
        writer.write_exact(&[]).unwrap();
        writer.write_zslice(&ZSlice::from(vec![0x03, 0x04])).unwrap();
        assert_eq!(buff, [0x01, 0x02, 0x03, 0x04]);

        let mut reader = buff.reader();
        assert_eq!(reader.remaining(), 4);
    }
}
