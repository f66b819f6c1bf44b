// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! DMA channel bookkeeping for one port.
//!
//! The manager holds at most one channel per direction and at most one
//! outstanding transfer per channel. Each submission is identified by the
//! cookie the channel returned for it; a completion is only acted on if its
//! cookie is the one currently outstanding. Anything else (a completion that
//! raced a cancel, or one for a channel that has since been released) is a
//! late completion: it is logged and counted and changes nothing.
//!
//! TX transfers move the caller's buffer. RX transfers always land in one
//! persistent receive buffer that the manager keeps across transfers, so
//! nothing is allocated or mapped per receive.
//!
//! Channel ids are only unique within one DMA controller, so a completion is
//! attributed to a direction by the [`ChannelClient`] installed on that
//! direction's channel, never by its id alone.

use core::cell::Cell;
use core::fmt;

use kernel::hil::dma::{ChannelId, Cookie, DmaAddress, DmaChannel, DmaClient, SlaveConfig};
use kernel::utilities::cells::{NumericCellExt, OptionalCell, TakeCell};
use kernel::ErrorCode;
use log::{debug, error, warn};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Tx,
    Rx,
}

/// Failures specific to the transfer engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransferError {
    /// A transfer is already outstanding in this direction.
    ChannelBusy,
    /// No channel (or, for RX, no receive buffer) is bound.
    ChannelUnavailable,
    /// The receive ring overflowed and a byte was dropped.
    BufferFull,
    /// A completion arrived for a transfer that is no longer outstanding.
    LateCompletion,
}

impl From<TransferError> for ErrorCode {
    fn from(err: TransferError) -> ErrorCode {
        match err {
            TransferError::ChannelBusy => ErrorCode::BUSY,
            TransferError::ChannelUnavailable => ErrorCode::NODEVICE,
            TransferError::BufferFull => ErrorCode::NOMEM,
            TransferError::LateCompletion => ErrorCode::ALREADY,
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TransferError::ChannelBusy => "channel busy",
            TransferError::ChannelUnavailable => "channel unavailable",
            TransferError::BufferFull => "buffer full",
            TransferError::LateCompletion => "late completion",
        };
        f.write_str(s)
    }
}

/// A transfer that is no longer outstanding, either because the channel
/// reported completion or because it was cancelled.
pub struct Finished {
    pub direction: Direction,
    /// Bytes the engine moved.
    pub transferred: usize,
    /// The caller's buffer for TX. RX data stays in the persistent buffer,
    /// see [`DmaManager::map_rx_data`].
    pub buffer: Option<&'static mut [u8]>,
    /// `Err(CANCEL)` for a cancelled transfer, `Err(FAIL)` if the engine
    /// reported an error.
    pub result: Result<(), ErrorCode>,
}

/// Receives DMA completions already attributed to a direction.
pub trait TransferClient {
    fn transfer_done(
        &self,
        direction: Direction,
        channel: ChannelId,
        cookie: Cookie,
        result: Result<(), ErrorCode>,
    );
}

/// The `DmaClient` installed on one direction's channel. It tags every
/// completion with that direction before handing it on.
pub struct ChannelClient<'a> {
    direction: Direction,
    client: OptionalCell<&'a dyn TransferClient>,
}

impl<'a> ChannelClient<'a> {
    const fn new(direction: Direction) -> ChannelClient<'a> {
        ChannelClient {
            direction,
            client: OptionalCell::empty(),
        }
    }
}

impl DmaClient for ChannelClient<'_> {
    fn transfer_done(&self, channel: ChannelId, cookie: Cookie, result: Result<(), ErrorCode>) {
        self.client
            .map(|client| client.transfer_done(self.direction, channel, cookie, result));
    }
}

struct DirectionState<'a> {
    channel: OptionalCell<&'a dyn DmaChannel<'a>>,
    cookie: OptionalCell<Cookie>,
    buffer: TakeCell<'static, [u8]>,
    mapped: OptionalCell<DmaAddress>,
    bytes_requested: Cell<usize>,
}

impl<'a> DirectionState<'a> {
    const fn new() -> Self {
        DirectionState {
            channel: OptionalCell::empty(),
            cookie: OptionalCell::empty(),
            buffer: TakeCell::empty(),
            mapped: OptionalCell::empty(),
            bytes_requested: Cell::new(0),
        }
    }
}

pub struct DmaManager<'a> {
    tx: DirectionState<'a>,
    rx: DirectionState<'a>,
    tx_client: ChannelClient<'a>,
    rx_client: ChannelClient<'a>,
    rx_buffer_len: Cell<usize>,
    late_completions: Cell<usize>,
}

impl<'a> DmaManager<'a> {
    pub const fn new() -> DmaManager<'a> {
        DmaManager {
            tx: DirectionState::new(),
            rx: DirectionState::new(),
            tx_client: ChannelClient::new(Direction::Tx),
            rx_client: ChannelClient::new(Direction::Rx),
            rx_buffer_len: Cell::new(0),
            late_completions: Cell::new(0),
        }
    }

    /// Set the receiver of completions for both directions.
    pub fn set_client(&self, client: &'a dyn TransferClient) {
        self.tx_client.client.set(client);
        self.rx_client.client.set(client);
    }

    /// The `DmaClient` to install on the channel bound to `direction`.
    pub fn channel_client(&self, direction: Direction) -> &ChannelClient<'a> {
        match direction {
            Direction::Tx => &self.tx_client,
            Direction::Rx => &self.rx_client,
        }
    }

    fn state(&self, direction: Direction) -> &DirectionState<'a> {
        match direction {
            Direction::Tx => &self.tx,
            Direction::Rx => &self.rx,
        }
    }

    /// Bind `channel` to `direction` and apply `config` to it.
    ///
    /// A direction that is already bound must be released first.
    pub fn bind_channel(
        &self,
        direction: Direction,
        channel: &'a dyn DmaChannel<'a>,
        config: SlaveConfig,
    ) -> Result<(), ErrorCode> {
        let state = self.state(direction);
        if state.channel.is_some() {
            return Err(ErrorCode::ALREADY);
        }
        channel.configure(&config)?;
        state.channel.set(channel);
        debug!(
            "{:?} bound to DMA channel {}, device address {:#x}",
            direction,
            channel.id().0,
            config.device_addr.0
        );
        Ok(())
    }

    pub fn is_bound(&self, direction: Direction) -> bool {
        self.state(direction).channel.is_some()
    }

    /// Whether a transfer is outstanding in `direction`.
    pub fn in_flight(&self, direction: Direction) -> bool {
        self.state(direction).cookie.is_some()
    }

    pub fn cookie(&self, direction: Direction) -> Option<Cookie> {
        self.state(direction).cookie.get()
    }

    /// Hand over the persistent receive buffer. Returns the buffer that was
    /// installed before, if any.
    ///
    /// Fails with `BUSY`, returning `buffer`, while an RX transfer is
    /// outstanding.
    pub fn provide_rx_buffer(
        &self,
        buffer: &'static mut [u8],
    ) -> Result<Option<&'static mut [u8]>, (ErrorCode, &'static mut [u8])> {
        if self.rx.cookie.is_some() {
            return Err((ErrorCode::BUSY, buffer));
        }
        self.rx.mapped.clear();
        self.rx_buffer_len.set(buffer.len());
        Ok(self.rx.buffer.replace(buffer))
    }

    /// Size of the persistent receive buffer, 0 if there is none. Stays
    /// valid while the buffer is lent out through `map_rx_data`.
    pub fn rx_buffer_len(&self) -> usize {
        self.rx_buffer_len.get()
    }

    /// Issue a TX transfer of the first `len` bytes of `buffer`.
    pub fn submit_tx(
        &self,
        buffer: &'static mut [u8],
        len: usize,
    ) -> Result<Cookie, (TransferError, &'static mut [u8])> {
        if self.tx.cookie.is_some() {
            return Err((TransferError::ChannelBusy, buffer));
        }
        let channel = match self.tx.channel.get() {
            Some(channel) => channel,
            None => return Err((TransferError::ChannelUnavailable, buffer)),
        };

        let len = len.min(buffer.len());
        let addr = channel.map(&buffer[..len]);
        match channel.submit(addr, len) {
            Ok(cookie) => {
                self.tx.mapped.set(addr);
                self.tx.buffer.replace(buffer);
                self.tx.bytes_requested.set(len);
                self.tx.cookie.set(cookie);
                debug!("TX DMA {} bytes, cookie {}", len, cookie.0);
                Ok(cookie)
            }
            Err(e) => {
                error!("TX DMA submit failed: {:?}", e);
                Err((TransferError::ChannelUnavailable, buffer))
            }
        }
    }

    /// Issue an RX transfer of `len` bytes into the persistent receive
    /// buffer. `len` is capped at the buffer's size.
    pub fn submit_rx(&self, len: usize) -> Result<Cookie, TransferError> {
        if self.rx.cookie.is_some() {
            return Err(TransferError::ChannelBusy);
        }
        let channel = self
            .rx
            .channel
            .get()
            .ok_or(TransferError::ChannelUnavailable)?;
        let (addr, len) = self
            .rx
            .buffer
            .map(|buf| {
                let addr = match self.rx.mapped.get() {
                    Some(addr) => addr,
                    None => {
                        let addr = channel.map(buf);
                        self.rx.mapped.set(addr);
                        addr
                    }
                };
                (addr, len.min(buf.len()))
            })
            .ok_or(TransferError::ChannelUnavailable)?;

        match channel.submit(addr, len) {
            Ok(cookie) => {
                self.rx.bytes_requested.set(len);
                self.rx.cookie.set(cookie);
                debug!("RX DMA {} bytes, cookie {}", len, cookie.0);
                Ok(cookie)
            }
            Err(e) => {
                error!("RX DMA submit failed: {:?}", e);
                Err(TransferError::ChannelUnavailable)
            }
        }
    }

    /// Stop the outstanding transfer in `direction`.
    ///
    /// Returns `None` if nothing was outstanding. A completion for the
    /// cancelled cookie that arrives later is treated as late.
    pub fn cancel(&self, direction: Direction) -> Option<Finished> {
        let state = self.state(direction);
        let cookie = state.cookie.get()?;
        let channel = state.channel.get()?;

        if channel.terminate().is_err() {
            warn!("{:?} DMA channel {} did not stop", direction, channel.id().0);
        }
        let residue = channel.residue(cookie);
        let transferred = state.bytes_requested.get().saturating_sub(residue);
        state.cookie.clear();
        state.bytes_requested.set(0);
        debug!(
            "{:?} DMA cookie {} cancelled after {} bytes",
            direction, cookie.0, transferred
        );

        Some(Finished {
            direction,
            transferred,
            buffer: match direction {
                Direction::Tx => state.buffer.take(),
                Direction::Rx => None,
            },
            result: Err(ErrorCode::CANCEL),
        })
    }

    /// Drop the channel binding for `direction`, cancelling an outstanding
    /// transfer first. Returns the buffer the direction was holding: the
    /// in-flight TX buffer, or the persistent RX buffer. Releasing an unbound
    /// direction does nothing.
    pub fn release(&self, direction: Direction) -> Option<&'static mut [u8]> {
        let state = self.state(direction);
        let cancelled = self.cancel(direction).and_then(|f| f.buffer);
        if let Some(channel) = state.channel.take() {
            debug!("{:?} released DMA channel {}", direction, channel.id().0);
        }
        state.mapped.clear();
        if direction == Direction::Rx {
            self.rx_buffer_len.set(0);
        }
        cancelled.or_else(|| state.buffer.take())
    }

    /// Account for a completion reported by a channel.
    ///
    /// Returns the finished transfer if `channel` is the one bound to
    /// `direction` and `cookie` is the one outstanding on it; otherwise
    /// counts a late completion and leaves all state untouched.
    pub fn complete(
        &self,
        direction: Direction,
        channel: ChannelId,
        cookie: Cookie,
        result: Result<(), ErrorCode>,
    ) -> Result<Finished, TransferError> {
        let state = self.state(direction);
        if state.channel.map(|c| c.id()) != Some(channel) || !state.cookie.contains(&cookie) {
            return Err(self.late(channel, cookie));
        }
        state.cookie.clear();

        let requested = state.bytes_requested.replace(0);
        let transferred = match result {
            Ok(()) => requested,
            Err(e) => {
                error!("{:?} DMA cookie {} failed: {:?}", direction, cookie.0, e);
                let residue = state
                    .channel
                    .map(|c| c.residue(cookie))
                    .unwrap_or(requested);
                requested.saturating_sub(residue)
            }
        };

        Ok(Finished {
            direction,
            transferred,
            buffer: match direction {
                Direction::Tx => state.buffer.take(),
                Direction::Rx => None,
            },
            result: result.map_err(|_| ErrorCode::FAIL),
        })
    }

    fn late(&self, channel: ChannelId, cookie: Cookie) -> TransferError {
        warn!(
            "ignoring late DMA completion, channel {} cookie {}",
            channel.0, cookie.0
        );
        self.late_completions.increment();
        TransferError::LateCompletion
    }

    /// Run `f` over the first `len` bytes of the persistent receive buffer.
    pub fn map_rx_data<F, R>(&self, len: usize, f: F) -> Option<R>
    where
        F: FnOnce(&[u8]) -> R,
    {
        self.rx.buffer.map(|buf| {
            let len = len.min(buf.len());
            f(&buf[..len])
        })
    }

    /// Run `f` over the whole persistent receive buffer. Only meaningful
    /// while no RX transfer is outstanding.
    pub fn map_rx_buffer<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        if self.rx.cookie.is_some() {
            return None;
        }
        self.rx.buffer.map(|buf| f(buf))
    }

    pub fn late_completions(&self) -> usize {
        self.late_completions.get()
    }
}
