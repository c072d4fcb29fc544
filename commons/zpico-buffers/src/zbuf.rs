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
use std::{fmt, iter};

use crate::{
    buffer::{Buffer, SplitBuffer},
    ZSlice,
};

/// A payload made of one or more [`ZSlice`]s.
///
/// Equality is defined on the concatenated bytes, not on how they are split.
#[derive(Clone, Default)]
pub struct ZBuf {
    slices: Vec<ZSlice>,
}

impl ZBuf {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.slices.clear();
    }

    pub fn zslices(&self) -> impl Iterator<Item = &ZSlice> + '_ {
        self.slices.iter()
    }

    pub fn push_zslice(&mut self, zslice: ZSlice) {
        if !zslice.is_empty() {
            self.slices.push(zslice);
        }
    }

    /// Copy the content into a single owned vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.contiguous().into_owned()
    }

    #[cfg(feature = "test")]
    pub fn rand(len: usize) -> Self {
        ZSlice::rand(len).into()
    }
}

impl Buffer for ZBuf {
    #[inline(always)]
    fn len(&self) -> usize {
        self.slices.iter().map(ZSlice::len).sum()
    }
}

pub struct ZBufSlices<'a>(std::slice::Iter<'a, ZSlice>);

impl<'a> Iterator for ZBufSlices<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(ZSlice::as_slice)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for ZBufSlices<'_> {}

impl SplitBuffer for ZBuf {
    type Slices<'a> = ZBufSlices<'a>;

    fn slices(&self) -> Self::Slices<'_> {
        ZBufSlices(self.slices.iter())
    }
}

impl PartialEq for ZBuf {
    fn eq(&self, other: &Self) -> bool {
        let mut a = self.slices().flat_map(|s| s.iter());
        let mut b = other.slices().flat_map(|s| s.iter());
        iter::from_fn(|| match (a.next(), b.next()) {
            (None, None) => None,
            (x, y) => Some(x == y),
        })
        .all(|same| same)
    }
}

impl Eq for ZBuf {}

impl fmt::Debug for ZBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x?}", self.contiguous())
    }
}

impl From<ZSlice> for ZBuf {
    fn from(t: ZSlice) -> Self {
        let mut zbuf = ZBuf::empty();
        zbuf.push_zslice(t);
        zbuf
    }
}

impl From<Vec<u8>> for ZBuf {
    fn from(t: Vec<u8>) -> Self {
        ZSlice::from(t).into()
    }
}

impl From<&[u8]> for ZBuf {
    fn from(t: &[u8]) -> Self {
        ZSlice::from(t).into()
    }
}

impl From<&str> for ZBuf {
    fn from(t: &str) -> Self {
        t.as_bytes().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_fragmentation() {
        let mut a = ZBuf::empty();
        a.push_zslice(vec![1u8, 2].into());
        a.push_zslice(vec![3u8].into());
        a.push_zslice(ZSlice::empty());
        let b: ZBuf = vec![1u8, 2, 3].into();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.zslices().count(), 2);
        assert_eq!(a.to_vec(), vec![1, 2, 3]);

        let c: ZBuf = vec![1u8, 2].into();
        assert_ne!(a, c);
    }
}
