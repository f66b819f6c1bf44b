// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Interrupt masking capability.

use spin::Mutex;

/// Runs code with local interrupt delivery masked.
///
/// Drivers use this around read-modify-write sequences on registers that an
/// interrupt top half may also touch. On a single core this disables
/// interrupts for the duration of the closure; on platforms where interrupt
/// context is not naturally exclusive it must additionally serialize against
/// other cores.
pub trait Atomic {
    fn atomic<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R;
}

/// `Atomic` backed by a spin lock.
///
/// Suitable for hosted builds and for platforms where interrupt handlers run
/// on another execution context and masking the local core is not enough.
///
/// The lock does not mask interrupts. It must not be used where an interrupt
/// top half that takes the same lock can preempt a section on the same core:
/// the top half would spin on a lock its own core holds and never return.
/// Such platforms pair the register access with an `Atomic` that disables
/// interrupts instead.
pub struct SpinAtomic {
    lock: Mutex<()>,
}

impl SpinAtomic {
    pub const fn new() -> SpinAtomic {
        SpinAtomic {
            lock: Mutex::new(()),
        }
    }
}

impl Atomic for SpinAtomic {
    fn atomic<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.lock.lock();
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::{Atomic, SpinAtomic};
    use core::cell::Cell;

    #[test]
    fn closure_result_is_returned() {
        let atomic = SpinAtomic::new();
        let hits = Cell::new(0);
        let r = atomic.atomic(|| {
            hits.set(hits.get() + 1);
            42
        });
        assert_eq!(r, 42);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn section_holds_the_lock() {
        let atomic = SpinAtomic::new();
        // Any contender, a preempting top half included, would have to spin.
        let contended = atomic.atomic(|| atomic.lock.try_lock().is_none());
        assert!(contended);
        assert!(atomic.lock.try_lock().is_some());
    }

    #[test]
    fn lock_is_released_between_sections() {
        let atomic = SpinAtomic::new();
        atomic.atomic(|| ());
        // A second section would spin forever if the first leaked the guard.
        assert_eq!(atomic.atomic(|| 7), 7);
    }
}
