// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Bounded, allocation-free collections.

pub mod queue;
pub mod ring_buffer;

pub use self::queue::Queue;
pub use self::ring_buffer::RingBuffer;
