// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Hardware agnostic interfaces for time and timers.
//!
//! Only the one-shot [`Alarm`] is defined here; drivers that need to defer
//! work by a duration arm an alarm with a reference time and a delta, and
//! re-arming it replaces the previous expiry.

use crate::ErrorCode;
use core::cmp::Ordering;
use core::fmt;

/// An integer type defining the width of a time value, which allows
/// clients to know when wraparound will occur.
pub trait Ticks: Clone + Copy + From<u32> + fmt::Debug + Ord + PartialOrd + Eq {
    /// Converts the type into a `u32`, truncating it if necessary.
    fn into_u32(self) -> u32;

    /// Add two values, wrapping around on overflow using standard
    /// unsigned arithmetic.
    fn wrapping_add(self, other: Self) -> Self;

    /// Subtract two values, wrapping around on underflow using standard
    /// unsigned arithmetic.
    fn wrapping_sub(self, other: Self) -> Self;

    /// Returns whether the value is in the range of [`start, `end`) using
    /// unsigned arithmetic and considering wraparound. It returns `true`
    /// if, incrementing from `start`, the value will be reached before `end`.
    /// Put another way, it returns `(self - start) < (end - start)` in
    /// unsigned arithmetic.
    fn within_range(self, start: Self, end: Self) -> bool;

    /// Returns the maximum value of this type, which should be (2^width)-1.
    fn max_value() -> Self;
}

/// Represents a clock's frequency in Hz, allowing code to transform
/// between computer time units and wall clock time.
pub trait Frequency {
    /// Returns frequency in Hz.
    fn frequency() -> u32;
}

/// 1KHz `Frequency`
#[derive(Debug)]
pub struct Freq1KHz;
impl Frequency for Freq1KHz {
    fn frequency() -> u32 {
        1_000
    }
}

/// 32.768KHz `Frequency`
#[derive(Debug)]
pub struct Freq32KHz;
impl Frequency for Freq32KHz {
    fn frequency() -> u32 {
        32_768
    }
}

/// An abstraction of a counter that ticks at a known frequency.
pub trait Time {
    /// The number of ticks per second
    type Frequency: Frequency;
    /// The width of a time value
    type Ticks: Ticks;

    /// Return the current time in hardware clock units.
    fn now(&self) -> Self::Ticks;
}

/// Conversion from wall-clock durations to ticks of a [`Time`] source.
pub trait ConvertTicks<T: Ticks> {
    /// Returns the number of ticks in the provided number of milliseconds,
    /// saturating at the maximum value of the tick type.
    fn ticks_from_ms(&self, ms: u32) -> T;
}

impl<T: Time + ?Sized> ConvertTicks<<T as Time>::Ticks> for T {
    fn ticks_from_ms(&self, ms: u32) -> <T as Time>::Ticks {
        let freq = <T::Frequency>::frequency() as u64;
        let ticks = (ms as u64 * freq) / 1_000;
        let max = <T::Ticks>::max_value().into_u32() as u64;
        <T::Ticks>::from(ticks.min(max) as u32)
    }
}

/// Interface for receiving notification when an alarm expires.
pub trait AlarmClient {
    /// Callback signaled when the alarm's clock reaches the value set with
    /// [`Alarm::set_alarm`].
    fn alarm(&self);
}

/// Interface for a one-shot alarm.
///
/// The alarm fires once at `reference + dt`. Calling `set_alarm` on an armed
/// alarm replaces the previous expiry; there is never more than one pending
/// expiry per alarm.
pub trait Alarm<'a>: Time {
    /// Specify the callback for when the counter reaches the alarm
    /// value.
    fn set_alarm_client(&self, client: &'a dyn AlarmClient);

    /// Specify when the callback should be called and enable it. The
    /// callback will be enqueued when `Time::now() == reference + dt`. The
    /// callback itself may not run exactly at this time, due to delays.
    fn set_alarm(&self, reference: Self::Ticks, dt: Self::Ticks);

    /// Return the current alarm value.
    fn get_alarm(&self) -> Self::Ticks;

    /// Disable the alarm and stop it from firing in the future.
    ///
    /// Valid `Result<(), ErrorCode>` codes are:
    ///   - `Ok(())` the alarm has been disarmed and will not invoke the
    ///     callback in the future
    ///   - `FAIL` the alarm could not be disarmed and will invoke the
    ///     callback in the future
    fn disarm(&self) -> Result<(), ErrorCode>;

    /// Returns whether the alarm is currently armed. Note that this does not
    /// reliably indicate whether there will be a future callback: it is
    /// possible that the alarm has triggered (and disarmed) and a callback is
    /// pending and has not been called yet.
    fn is_armed(&self) -> bool;

    /// Return the minimum dt value that is supported. Any dt smaller than
    /// this will automatically be increased to this minimum value.
    fn minimum_dt(&self) -> Self::Ticks;
}

/// 32-bit `Ticks`.
#[derive(Clone, Copy, Debug)]
pub struct Ticks32(u32);

impl From<u32> for Ticks32 {
    fn from(val: u32) -> Self {
        Ticks32(val)
    }
}

impl Ticks for Ticks32 {
    fn into_u32(self) -> u32 {
        self.0
    }

    fn wrapping_add(self, other: Self) -> Self {
        Ticks32(self.0.wrapping_add(other.0))
    }

    fn wrapping_sub(self, other: Self) -> Self {
        Ticks32(self.0.wrapping_sub(other.0))
    }

    fn within_range(self, start: Self, end: Self) -> bool {
        self.wrapping_sub(start).0 < end.wrapping_sub(start).0
    }

    fn max_value() -> Self {
        Ticks32(u32::MAX)
    }
}

impl PartialOrd for Ticks32 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ticks32 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialEq for Ticks32 {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Ticks32 {}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock;

    impl Time for FixedClock {
        type Frequency = Freq32KHz;
        type Ticks = Ticks32;

        fn now(&self) -> Ticks32 {
            Ticks32::from(0)
        }
    }

    #[test]
    fn within_range_handles_wraparound() {
        let start = Ticks32::from(u32::MAX - 5);
        let end = start.wrapping_add(Ticks32::from(10));
        assert!(Ticks32::from(u32::MAX).within_range(start, end));
        assert!(Ticks32::from(3).within_range(start, end));
        assert!(!Ticks32::from(4).within_range(start, end));
    }

    #[test]
    fn ms_conversion() {
        let clock = FixedClock;
        assert_eq!(clock.ticks_from_ms(1000).into_u32(), 32_768);
        assert_eq!(clock.ticks_from_ms(500).into_u32(), 16_384);
    }

    #[test]
    fn ms_conversion_saturates() {
        let clock = FixedClock;
        assert_eq!(clock.ticks_from_ms(u32::MAX), Ticks32::max_value());
    }
}
