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
    reader::{BacktrackableReader, DidntRead, HasReader, Reader},
    ZSlice,
};

impl<'a> HasReader for &'a [u8] {
    type Reader = Self;

    fn reader(self) -> Self::Reader {
        self
    }
}

fn take<'a>(slice: &mut &'a [u8], len: usize) -> Result<&'a [u8], DidntRead> {
    if slice.len() < len {
        return Err(DidntRead);
    }
    let (head, tail) = slice.split_at(len);
    *slice = tail;
    Ok(head)
}

// The slice is the unread part of the batch: reading advances its start.
impl Reader for &[u8] {
    fn read_exact(&mut self, into: &mut [u8]) -> Result<(), DidntRead> {
        let head = take(self, into.len())?;
        into.copy_from_slice(head);
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8, DidntRead> {
        let (&byte, tail) = self.split_first().ok_or(DidntRead)?;
        *self = tail;
        Ok(byte)
    }

    fn read_zslice(&mut self, len: usize) -> Result<ZSlice, DidntRead> {
        Ok(take(self, len)?.to_vec().into())
    }

    fn remaining(&self) -> usize {
        self.len()
    }
}

impl<'a> BacktrackableReader for &'a [u8] {
    type Mark = &'a [u8];

    fn mark(&mut self) -> Self::Mark {
        *self
    }

    fn rewind(&mut self, mark: Self::Mark) -> bool {
        *self = mark;
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::reader::{BacktrackableReader, HasReader, Reader};

    #[test]
    fn bounded_reads() {
        let bytes = [0x01, 0x02, 0x03];
        let mut reader = bytes.as_slice().reader();
        assert_eq!(reader.read_u8().unwrap(), 0x01);
        let mark = reader.mark();
        let mut two = [0u8; 2];
        reader.read_exact(&mut two).unwrap();
        assert_eq!(two, [0x02, 0x03]);
        assert!(!reader.can_read());
        assert!(reader.read_u8().is_err());
        assert!(reader.rewind(mark));
        assert_eq!(reader.remaining(), 2);
        assert!(reader.read_zslice(3).is_err());
        // A failed read leaves the cursor untouched.
        assert_eq!(reader.read_zslice(2).unwrap().as_slice(), &[0x02, 0x03]);
    }
}
