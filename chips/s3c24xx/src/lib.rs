// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! UART data path for the Samsung S3C24xx/S3C64xx/Exynos serial block.
//!
//! Each physical port is a [`uart::Port`], which picks interrupt-driven or
//! DMA-driven transfer per direction, owns the DMA channel bindings and the
//! receive ring, and keeps the CPU and interconnect clocks up while the line
//! is busy.

#![cfg_attr(not(test), no_std)]

pub mod buffer;
pub mod config;
pub mod dma;
pub mod info;
pub mod mode;
pub mod qos;
pub mod regs;
pub mod uart;

#[cfg(test)]
mod mock;
