// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Interface for slave DMA channels serving a peripheral.
//!
//! A peripheral driver binds one channel per direction, configures the
//! device-side end of the channel once, and then submits host buffers by bus
//! address. Every submission returns a [`Cookie`]; the completion callback
//! carries the same cookie back so that the driver can tell a completion for
//! its current transfer from one that belongs to a transfer it has already
//! given up on.

use crate::ErrorCode;

/// Identifies a DMA channel within its controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelId(pub u32);

/// Token for one issued transfer. Cookies handed out by a channel are never
/// reused while the previous transfer with the same value may still complete.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cookie(pub u32);

/// Address of a buffer as seen from the DMA engine's side of the bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DmaAddress(pub usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Memory to peripheral
    MemToDev,
    /// Peripheral to memory
    DevToMem,
}

/// Width of a single bus access on the device side.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusWidth {
    Bits8 = 1,
    Bits16 = 2,
    Bits32 = 4,
}

/// Device-side configuration of a channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlaveConfig {
    pub direction: Direction,
    /// Bus address of the peripheral data register.
    pub device_addr: DmaAddress,
    pub addr_width: BusWidth,
    /// Maximum number of `addr_width` accesses per burst.
    pub max_burst: u32,
}

pub trait DmaChannel<'a> {
    fn set_client(&self, client: &'a dyn DmaClient);

    fn id(&self) -> ChannelId;

    /// Apply the device-side configuration. Must be called before `submit`.
    ///
    /// Valid `ErrorCode` values are:
    ///  - BUSY: a transfer is in flight on this channel.
    ///  - NOSUPPORT: the engine cannot do the requested width or burst.
    fn configure(&self, config: &SlaveConfig) -> Result<(), ErrorCode>;

    /// Translate a host buffer into the address the engine uses to reach it.
    fn map(&self, buffer: &[u8]) -> DmaAddress;

    /// Issue a transfer of `len` bytes at `addr`. Returns immediately; the
    /// result is reported through `DmaClient::transfer_done`.
    ///
    /// Valid `ErrorCode` values are:
    ///  - BUSY: a transfer is in flight on this channel.
    ///  - INVAL: the channel has not been configured.
    ///  - FAIL: the descriptor could not be prepared.
    fn submit(&self, addr: DmaAddress, len: usize) -> Result<Cookie, ErrorCode>;

    /// Stop whatever the channel is doing. A completion for a terminated
    /// transfer may still be delivered afterwards.
    fn terminate(&self) -> Result<(), ErrorCode>;

    /// Number of bytes of the transfer identified by `cookie` that have not
    /// been moved yet.
    fn residue(&self, cookie: Cookie) -> usize;
}

pub trait DmaClient {
    /// A transfer on `channel` finished. `result` is `Err(ErrorCode::FAIL)`
    /// if the engine reported a bus or descriptor error.
    fn transfer_done(&self, channel: ChannelId, cookie: Cookie, result: Result<(), ErrorCode>);
}
