// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Interior mutability cells for state shared between a driver and its
//! interrupt bottom halves.
//!
//! All of these are thin layers over `core::cell::Cell<Option<_>>`. They are
//! not `Sync`: every user runs on the single kernel loop, and the cells only
//! make the "value may be lent out right now" state explicit.

use core::cell::Cell;

/// A shared slot for a mutable reference, typically a `&'static mut [u8]`
/// buffer that moves between a driver, its client and the hardware.
///
/// Accessors either move the reference out (`take`) or borrow it for the
/// duration of a closure (`map`). A slot that is currently lent out reads as
/// empty.
pub struct TakeCell<'a, T: 'a + ?Sized> {
    val: Cell<Option<&'a mut T>>,
}

impl<'a, T: ?Sized> TakeCell<'a, T> {
    pub const fn empty() -> TakeCell<'a, T> {
        TakeCell {
            val: Cell::new(None),
        }
    }

    pub const fn new(value: &'a mut T) -> TakeCell<'a, T> {
        TakeCell {
            val: Cell::new(Some(value)),
        }
    }

    pub fn is_none(&self) -> bool {
        let inner = self.val.take();
        let none = inner.is_none();
        self.val.set(inner);
        none
    }

    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Move the reference out, leaving the slot empty.
    pub fn take(&self) -> Option<&'a mut T> {
        self.val.take()
    }

    /// Store `val`, dropping whatever was there.
    pub fn put(&self, val: Option<&'a mut T>) {
        self.val.set(val);
    }

    /// Store `val` and return the previous occupant, if any.
    pub fn replace(&self, val: &'a mut T) -> Option<&'a mut T> {
        self.val.replace(Some(val))
    }

    /// Run `closure` on the stored reference and put it back afterwards.
    ///
    /// Returns `None` without calling `closure` if the slot is empty, which
    /// includes the case of a re-entrant `map` on the same cell.
    pub fn map<F, R>(&self, closure: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let inner = self.val.take();
        inner.map(|val| {
            let res = closure(&mut *val);
            self.val.set(Some(val));
            res
        })
    }

    /// Like `map`, but returns `default` when the slot is empty.
    pub fn map_or<F, R>(&self, default: R, closure: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        self.map(closure).unwrap_or(default)
    }
}

/// A `Cell` holding an optional `Copy` value, such as a client reference or a
/// transfer cookie.
pub struct OptionalCell<T: Copy> {
    value: Cell<Option<T>>,
}

impl<T: Copy> OptionalCell<T> {
    pub const fn new(val: T) -> OptionalCell<T> {
        OptionalCell {
            value: Cell::new(Some(val)),
        }
    }

    pub const fn empty() -> OptionalCell<T> {
        OptionalCell {
            value: Cell::new(None),
        }
    }

    pub fn set(&self, val: T) {
        self.value.set(Some(val));
    }

    /// Store the value of the supplied `Option`, clearing the cell on `None`.
    pub fn insert(&self, opt: Option<T>) {
        self.value.set(opt);
    }

    pub fn replace(&self, val: T) -> Option<T> {
        self.value.replace(Some(val))
    }

    pub fn clear(&self) {
        self.value.set(None);
    }

    pub fn take(&self) -> Option<T> {
        self.value.take()
    }

    pub fn get(&self) -> Option<T> {
        self.value.get()
    }

    pub fn is_some(&self) -> bool {
        self.value.get().is_some()
    }

    pub fn is_none(&self) -> bool {
        self.value.get().is_none()
    }

    pub fn contains(&self, val: &T) -> bool
    where
        T: PartialEq,
    {
        self.value.get().as_ref() == Some(val)
    }

    pub fn unwrap_or(&self, default: T) -> T {
        self.value.get().unwrap_or(default)
    }

    /// Call `closure` with the contained value, if there is one.
    pub fn map<F, R>(&self, closure: F) -> Option<R>
    where
        F: FnOnce(T) -> R,
    {
        self.value.get().map(closure)
    }
}

/// A cell that owns a non-`Copy` value and lends it out to closures.
///
/// Used for driver-owned state that needs `&mut self` methods, such as a ring
/// buffer, behind a shared reference.
pub struct MapCell<T> {
    val: Cell<Option<T>>,
}

impl<T> MapCell<T> {
    pub const fn new(value: T) -> MapCell<T> {
        MapCell {
            val: Cell::new(Some(value)),
        }
    }

    pub const fn empty() -> MapCell<T> {
        MapCell {
            val: Cell::new(None),
        }
    }

    pub fn is_some(&self) -> bool {
        let inner = self.val.take();
        let some = inner.is_some();
        self.val.set(inner);
        some
    }

    pub fn is_none(&self) -> bool {
        !self.is_some()
    }

    pub fn take(&self) -> Option<T> {
        self.val.take()
    }

    pub fn put(&self, val: T) {
        self.val.set(Some(val));
    }

    pub fn replace(&self, val: T) -> Option<T> {
        self.val.replace(Some(val))
    }

    /// Borrow the value mutably for the duration of `closure`.
    pub fn map<F, R>(&self, closure: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut inner = self.val.take()?;
        let res = closure(&mut inner);
        self.val.set(Some(inner));
        Some(res)
    }

    pub fn map_or<F, R>(&self, default: R, closure: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        self.map(closure).unwrap_or(default)
    }
}

/// Counter helpers for `Cell`s of integers.
pub trait NumericCellExt<T> {
    fn increment(&self);
    fn add(&self, val: T);
}

impl NumericCellExt<usize> for Cell<usize> {
    fn increment(&self) {
        self.set(self.get().wrapping_add(1));
    }

    fn add(&self, val: usize) {
        self.set(self.get().wrapping_add(val));
    }
}

impl NumericCellExt<u32> for Cell<u32> {
    fn increment(&self) {
        self.set(self.get().wrapping_add(1));
    }

    fn add(&self, val: u32) {
        self.set(self.get().wrapping_add(val));
    }
}
