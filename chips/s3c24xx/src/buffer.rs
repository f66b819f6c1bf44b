// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Byte rings owned by a port.
//!
//! [`LocalRingBuffer`] accumulates received bytes in interrupt mode. When it
//! is full the incoming byte is dropped and counted; bytes already stored are
//! never touched. [`DiagnosticLog`] keeps the most recent traffic for fault
//! diagnosis and overwrites its oldest bytes instead.

use kernel::collections::queue::Queue;
use kernel::collections::RingBuffer;

pub struct LocalRingBuffer {
    ring: RingBuffer<'static, u8>,
    dropped: usize,
}

impl LocalRingBuffer {
    /// One byte of `storage` is used as the ring's empty marker.
    pub fn new(storage: &'static mut [u8]) -> LocalRingBuffer {
        LocalRingBuffer {
            ring: RingBuffer::new(storage),
            dropped: 0,
        }
    }

    /// Store `byte`. Returns `false`, and counts the byte as lost, if the
    /// ring is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.ring.enqueue(byte) {
            true
        } else {
            self.dropped = self.dropped.wrapping_add(1);
            false
        }
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.ring.dequeue()
    }

    /// Number of bytes waiting to be consumed.
    pub fn available(&self) -> usize {
        self.ring.len()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// The stored bytes in order, as at most two contiguous pieces.
    pub fn as_slices(&self) -> (Option<&[u8]>, Option<&[u8]>) {
        self.ring.as_slices()
    }

    /// Discard everything stored. The loss counter is kept.
    pub fn empty(&mut self) {
        self.ring.empty();
    }

    /// Bytes lost to overflow since the ring was created.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Bounded log of transferred bytes, newest wins.
pub struct DiagnosticLog {
    ring: RingBuffer<'static, u8>,
}

impl DiagnosticLog {
    pub fn new(storage: &'static mut [u8]) -> DiagnosticLog {
        DiagnosticLog {
            ring: RingBuffer::new(storage),
        }
    }

    pub fn record(&mut self, bytes: &[u8]) {
        for &b in bytes {
            let _ = self.ring.push(b);
        }
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Logged bytes, oldest first.
    pub fn contents(&self) -> (Option<&[u8]>, Option<&[u8]>) {
        self.ring.as_slices()
    }

    pub fn clear(&mut self) {
        self.ring.empty();
    }
}
