// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Implementation of a ring buffer over caller-provided storage.
//!
//! One slot of the storage is kept free so that `head == tail` always means
//! "empty"; a ring over `N` slots holds at most `N - 1` elements.

use crate::collections::queue;

pub struct RingBuffer<'a, T: 'a> {
    ring: &'a mut [T],
    head: usize,
    tail: usize,
}

impl<'a, T: Copy> RingBuffer<'a, T> {
    pub fn new(ring: &'a mut [T]) -> RingBuffer<'a, T> {
        RingBuffer {
            head: 0,
            tail: 0,
            ring,
        }
    }

    /// Maximum number of elements the buffer can hold at once.
    pub fn capacity(&self) -> usize {
        self.ring.len().saturating_sub(1)
    }

    /// Returns up to 2 slices that together form the contents of the ring buffer.
    ///
    /// Returns:
    /// - `(None, None)` if the buffer is empty.
    /// - `(Some(slice), None)` if the head is before the tail (therefore all the contents is
    ///   contiguous).
    /// - `(Some(left), Some(right))` if the head is after the tail. In that case, the logical
    ///   contents of the buffer is `[left, right].concat()` (although physically the "left" slice is
    ///   stored after the "right" slice).
    pub fn as_slices(&self) -> (Option<&[T]>, Option<&[T]>) {
        if self.head < self.tail {
            (Some(&self.ring[self.head..self.tail]), None)
        } else if self.head > self.tail {
            let (left, right) = self.ring.split_at(self.head);
            (
                Some(right),
                if self.tail == 0 {
                    None
                } else {
                    Some(&left[..self.tail])
                },
            )
        } else {
            (None, None)
        }
    }
}

impl<T: Copy> queue::Queue<T> for RingBuffer<'_, T> {
    fn has_elements(&self) -> bool {
        self.head != self.tail
    }

    fn is_full(&self) -> bool {
        self.ring.len() == 0 || self.head == ((self.tail + 1) % self.ring.len())
    }

    fn len(&self) -> usize {
        if self.tail > self.head {
            self.tail - self.head
        } else if self.tail < self.head {
            (self.ring.len() - self.head) + self.tail
        } else {
            // head equals tail, length is zero
            0
        }
    }

    fn enqueue(&mut self, val: T) -> bool {
        if self.is_full() {
            // Incrementing tail would overwrite head
            false
        } else {
            self.ring[self.tail] = val;
            self.tail = (self.tail + 1) % self.ring.len();
            true
        }
    }

    fn push(&mut self, val: T) -> Option<T> {
        if self.ring.len() < 2 {
            // No room for even one element; the value is evicted at once.
            return Some(val);
        }

        let result = if self.is_full() {
            let val = self.ring[self.head];
            self.head = (self.head + 1) % self.ring.len();
            Some(val)
        } else {
            None
        };

        self.ring[self.tail] = val;
        self.tail = (self.tail + 1) % self.ring.len();
        result
    }

    fn dequeue(&mut self) -> Option<T> {
        if self.has_elements() {
            let val = self.ring[self.head];
            self.head = (self.head + 1) % self.ring.len();
            Some(val)
        } else {
            None
        }
    }

    fn empty(&mut self) {
        self.head = 0;
        self.tail = 0;
    }
}

#[cfg(test)]
mod test {
    use super::super::queue::Queue;
    use super::RingBuffer;

    #[test]
    fn test_enqueue_dequeue() {
        const LEN: usize = 10;
        let mut ring = [0; LEN];
        let mut buf = RingBuffer::new(&mut ring);

        for _ in 0..2 * LEN {
            assert!(buf.enqueue(42));
            assert_eq!(buf.len(), 1);
            assert!(buf.has_elements());

            assert_eq!(buf.dequeue(), Some(42));
            assert_eq!(buf.len(), 0);
            assert!(!buf.has_elements());
        }
    }

    #[test]
    fn test_push_evicts_oldest() {
        const LEN: usize = 10;
        const MAX: usize = 100;
        let mut ring = [0; LEN + 1];
        let mut buf = RingBuffer::new(&mut ring);

        for i in 0..LEN {
            assert_eq!(buf.len(), i);
            assert!(!buf.is_full());
            assert_eq!(buf.push(i), None);
        }

        for i in LEN..MAX {
            assert!(buf.is_full());
            assert_eq!(buf.push(i), Some(i - LEN));
        }

        for i in 0..LEN {
            assert_eq!(buf.len(), LEN - i);
            assert_eq!(buf.dequeue(), Some(MAX - LEN + i));
        }

        assert!(!buf.has_elements());
    }

    #[test]
    fn test_full_rejects_without_corruption() {
        let mut ring = [0u8; 4];
        let mut buf = RingBuffer::new(&mut ring);
        assert_eq!(buf.capacity(), 3);

        assert!(buf.enqueue(1));
        assert!(buf.enqueue(2));
        assert!(buf.enqueue(3));
        assert!(buf.is_full());
        assert_eq!(buf.len(), buf.capacity());
        assert!(!buf.enqueue(4));

        assert_eq!(buf.dequeue(), Some(1));
        assert_eq!(buf.dequeue(), Some(2));
        assert_eq!(buf.dequeue(), Some(3));
        assert_eq!(buf.dequeue(), None);
    }

    #[test]
    fn test_as_slices_after_wrap() {
        let mut ring = [0u8; 5];
        let mut buf = RingBuffer::new(&mut ring);

        // Move the head to the end of the storage.
        for _ in 0..3 {
            assert!(buf.enqueue(0));
            assert_eq!(buf.dequeue(), Some(0));
        }
        for b in 1..=4 {
            assert!(buf.enqueue(b));
        }

        match buf.as_slices() {
            (Some(left), Some(right)) => {
                assert_eq!(left, &[1, 2]);
                assert_eq!(right, &[3, 4]);
            }
            other => panic!("unexpected layout {:?}", other),
        }

        buf.empty();
        assert_eq!(buf.as_slices(), (None, None));
    }

    #[test]
    fn test_degenerate_storage() {
        let mut ring = [0u8; 1];
        let mut buf = RingBuffer::new(&mut ring);
        assert_eq!(buf.capacity(), 0);
        assert!(buf.is_full());
        assert!(!buf.enqueue(7));
        assert_eq!(buf.push(7), Some(7));
        assert!(!buf.has_elements());
    }
}
