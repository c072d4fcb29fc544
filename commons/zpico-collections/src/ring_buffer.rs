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
/// A fixed-capacity FIFO of element slots addressed by a head cursor.
///
/// The ring never grows: a plain [`push`](Self::push) refuses new elements when full while
/// [`push_force`](Self::push_force) evicts the oldest one. It is not synchronized; shared
/// rings are wrapped in a mutex by their owner.
pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    #[must_use]
    pub fn new(capacity: usize) -> RingBuffer<T> {
        let slots = (0..capacity).map(|_| None).collect::<Vec<_>>();
        RingBuffer {
            slots: slots.into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    #[inline]
    fn tail(&self) -> usize {
        (self.head + self.len) % self.capacity()
    }

    /// Appends `elem`, handing it back when the ring is full.
    #[inline]
    pub fn push(&mut self, elem: T) -> Result<(), T> {
        if self.is_full() {
            return Err(elem);
        }
        let tail = self.tail();
        self.slots[tail] = Some(elem);
        self.len += 1;
        Ok(())
    }

    /// Appends `elem`, evicting and returning the oldest element when the ring is full.
    /// A ring of capacity zero returns `elem` itself.
    #[inline]
    pub fn push_force(&mut self, elem: T) -> Option<T> {
        match self.push(elem) {
            Ok(()) => None,
            Err(elem) if self.capacity() == 0 => Some(elem),
            Err(elem) => {
                let old = self.slots[self.head].replace(elem);
                self.head = (self.head + 1) % self.capacity();
                old
            }
        }
    }

    /// Removes the oldest element.
    #[inline]
    pub fn pull(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let elem = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        elem
    }

    pub fn clear(&mut self) {
        while self.pull().is_some() {}
        self.head = 0;
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<T> Iterator for RingBuffer<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.pull()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use rand::Rng;

    use super::*;

    #[test]
    fn push_refuses_when_full() {
        let mut ring = RingBuffer::new(2);
        assert!(ring.is_empty());
        assert_eq!(ring.push(1), Ok(()));
        assert_eq!(ring.push(2), Ok(()));
        assert!(ring.is_full());
        assert_eq!(ring.push(3), Err(3));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.pull(), Some(1));
        assert_eq!(ring.pull(), Some(2));
        assert_eq!(ring.pull(), None);
    }

    #[test]
    fn push_force_keeps_most_recent() {
        const N: usize = 4;
        let mut ring = RingBuffer::new(N);
        for i in 0..N {
            assert_eq!(ring.push_force(i), None);
        }
        assert_eq!(ring.push_force(N), Some(0));
        assert_eq!(ring.len(), N);
        let pulled: Vec<usize> = ring.by_ref().collect();
        assert_eq!(pulled, (1..=N).collect::<Vec<_>>());
        assert!(ring.is_empty());
    }

    #[test]
    fn zero_capacity() {
        let mut ring = RingBuffer::new(0);
        assert!(ring.is_full());
        assert!(ring.is_empty());
        assert_eq!(ring.push("a"), Err("a"));
        assert_eq!(ring.push_force("b"), Some("b"));
        assert_eq!(ring.pull(), None);
    }

    #[test]
    fn wraps_around() {
        let mut rng = rand::thread_rng();
        let capacity = rng.gen_range(1..16);
        let mut ring = RingBuffer::new(capacity);
        let mut model = std::collections::VecDeque::new();

        for i in 0..1_000u32 {
            if rng.gen_bool(0.6) {
                let dropped = ring.push_force(i);
                model.push_back(i);
                if model.len() > capacity {
                    assert_eq!(dropped, model.pop_front());
                } else {
                    assert_eq!(dropped, None);
                }
            } else {
                assert_eq!(ring.pull(), model.pop_front());
            }
            assert_eq!(ring.len(), model.len());
        }
    }

    #[test]
    fn clear_drops_elements() {
        let drops = Rc::new(Cell::new(0));
        struct Probe(Rc<Cell<usize>>);
        impl Drop for Probe {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let mut ring = RingBuffer::new(3);
        for _ in 0..3 {
            assert!(ring.push(Probe(drops.clone())).is_ok());
        }
        ring.clear();
        assert_eq!(drops.get(), 3);
        assert!(ring.is_empty());
    }
}
