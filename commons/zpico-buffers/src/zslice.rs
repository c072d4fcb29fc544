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
use std::{
    fmt,
    ops::{Deref, Range},
    sync::Arc,
};

use crate::buffer::{Buffer, SplitBuffer};

/// A cheaply clonable view over a reference-counted byte buffer.
#[derive(Clone)]
pub struct ZSlice {
    buf: Arc<Vec<u8>>,
    start: usize,
    end: usize,
}

impl ZSlice {
    pub fn new(buf: Arc<Vec<u8>>, start: usize, end: usize) -> Option<ZSlice> {
        (start <= end && end <= buf.len()).then_some(Self { buf, start, end })
    }

    #[inline]
    pub fn empty() -> Self {
        Self {
            buf: Arc::new(Vec::new()),
            start: 0,
            end: 0,
        }
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[self.range()]
    }

    /// Returns a sub-slice sharing the same backing buffer, or `None` if out of range.
    pub fn subslice(&self, start: usize, end: usize) -> Option<ZSlice> {
        if start <= end && end <= self.len() {
            Some(Self {
                buf: self.buf.clone(),
                start: self.start + start,
                end: self.start + end,
            })
        } else {
            None
        }
    }

    #[cfg(feature = "test")]
    pub fn rand(len: usize) -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        (0..len).map(|_| rng.gen()).collect::<Vec<u8>>().into()
    }
}

impl Deref for ZSlice {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl AsRef<[u8]> for ZSlice {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl PartialEq for ZSlice {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ZSlice {}

impl fmt::Debug for ZSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x?}", self.as_slice())
    }
}

impl From<Vec<u8>> for ZSlice {
    fn from(buf: Vec<u8>) -> Self {
        let end = buf.len();
        Self {
            buf: Arc::new(buf),
            start: 0,
            end,
        }
    }
}

impl From<&[u8]> for ZSlice {
    fn from(buf: &[u8]) -> Self {
        buf.to_vec().into()
    }
}

impl<const N: usize> From<[u8; N]> for ZSlice {
    fn from(buf: [u8; N]) -> Self {
        buf.to_vec().into()
    }
}

impl Buffer for ZSlice {
    fn len(&self) -> usize {
        ZSlice::len(self)
    }
}

impl SplitBuffer for ZSlice {
    type Slices<'a> = std::iter::Once<&'a [u8]>;

    fn slices(&self) -> Self::Slices<'_> {
        std::iter::once(self.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subslice_shares_buffer() {
        let zs: ZSlice = vec![0u8, 1, 2, 3, 4].into();
        let sub = zs.subslice(1, 4).unwrap();
        assert_eq!(sub.as_slice(), &[1, 2, 3]);
        assert_eq!(sub.subslice(1, 2).unwrap().as_slice(), &[2]);
        assert!(sub.subslice(2, 4).is_none());
        assert!(ZSlice::new(Arc::new(vec![0u8; 2]), 1, 3).is_none());
        assert!(ZSlice::empty().is_empty());
    }
}
