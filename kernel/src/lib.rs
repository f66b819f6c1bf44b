// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Core serial kernel.
//!
//! The kernel crate holds the Hardware Interface Layer (HIL) definitions that
//! serial peripheral drivers implement and consume, together with the shared
//! utilities those drivers are built from: the standard error enum, interior
//! mutability cells, the register interface re-export, bounded collections and
//! the platform interrupt-masking capability.
//!
//! Chip crates depend on this crate and implement the HILs for a concrete
//! peripheral. Everything here is `no_std` and allocation free.

#![cfg_attr(not(test), no_std)]

pub mod collections;
pub mod errorcode;
pub mod hil;
pub mod platform;
pub mod utilities;

pub use crate::errorcode::ErrorCode;
