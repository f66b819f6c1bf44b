// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Hardware interface layer (HIL) traits for UART communication.
//!
//! The traits are split the way the serial layer above a driver uses them:
//! [`Configure`] for line settings, [`Transmit`] for outgoing buffers and
//! [`Receive`] for incoming bytes. Transmission is buffer oriented: the caller
//! lends a `&'static mut [u8]` and gets it back in
//! [`TransmitClient::transmitted_buffer`]. Reception is stream oriented: the
//! driver owns its receive storage and pushes bytes upward through
//! [`ReceiveClient::received_data`].

use crate::ErrorCode;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopBits {
    One = 1,
    Two = 2,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parity {
    None = 0,
    Odd = 1,
    Even = 2,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Width {
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Parameters {
    pub baud_rate: u32, // baud rate in bit/s
    pub width: Width,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub hw_flow_control: bool,
}

/// The type of line error encountered during reception.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// No error occurred and the command completed successfully
    None,

    /// Parity error during receive
    ParityError,

    /// Framing error during receive
    FramingError,

    /// Overrun error during receive
    OverrunError,

    /// Break condition detected on the line
    BreakError,

    /// Receive was stopped before the requested length arrived
    Aborted,
}

pub trait Configure {
    /// Returns Ok(()), or
    /// - OFF: The underlying hardware is currently not available, perhaps
    ///   because it has not been initialized.
    /// - BUSY: A transfer is in flight and the line cannot be reconfigured.
    /// - INVAL: Impossible parameters (e.g. a `baud_rate` of 0)
    /// - NOSUPPORT: The underlying UART cannot satisfy this configuration.
    fn configure(&self, params: Parameters) -> Result<(), ErrorCode>;
}

pub trait Transmit<'a> {
    /// Set the transmit client, which will be called when transmissions
    /// complete.
    fn set_transmit_client(&self, client: &'a dyn TransmitClient);

    /// Transmit a buffer of data. On completion, `transmitted_buffer` in the
    /// `TransmitClient` will be called. If the `Result<(), ErrorCode>`
    /// returned by `transmit` is an `Ok(())`, the struct will issue a
    /// `transmitted_buffer` callback in the future. If the value of the
    /// `Result<(), ErrorCode>` is `Err(), then the `tx_buffer` argument is
    /// returned in the `Err()`, along with the `ErrorCode`.
    ///
    /// Valid `ErrorCode` values are:
    ///  - OFF: The underlying hardware is not available, perhaps because it
    ///    has not been started.
    ///  - BUSY: the UART is already transmitting and has not made a
    ///    transmission callback yet.
    ///  - SIZE : `tx_len` is larger than the passed slice, or zero.
    ///  - FAIL: some other error.
    fn transmit_buffer(
        &self,
        tx_buffer: &'static mut [u8],
        tx_len: usize,
    ) -> Result<(), (ErrorCode, &'static mut [u8])>;

    /// Stop an outstanding transmission.
    ///
    /// The buffer is handed back directly, together with the number of bytes
    /// that left the device before the stop. No `transmitted_buffer` callback
    /// is issued for a stopped transmission. Returns `None` if nothing was
    /// being transmitted.
    fn transmit_abort(&self) -> Option<(&'static mut [u8], usize)>;
}

pub trait Receive<'a> {
    /// Set the receive client, which will be called when reads complete.
    fn set_receive_client(&self, client: &'a dyn ReceiveClient);

    /// Receive at least `rx_len` bytes. Everything received so far is
    /// delivered through `received_data` once `rx_len` bytes have arrived,
    /// or earlier if the line goes idle or reports an error.
    ///
    /// Valid `ErrorCode` values are:
    ///  - OFF: The underlying hardware is not available, perhaps because it
    ///    has not been started.
    ///  - BUSY: the UART is already receiving and has not yet delivered data.
    ///  - SIZE : `rx_len` is zero.
    fn receive(&self, rx_len: usize) -> Result<(), ErrorCode>;

    /// Stop an outstanding receive. Bytes that already arrived are
    /// discarded and no `received_data` callback follows.
    ///
    /// Returns `Err(ErrorCode::ALREADY)` if nothing was being received.
    fn receive_abort(&self) -> Result<(), ErrorCode>;
}

/// Trait implemented by a UART transmitter to receive callbacks when
/// operations complete.
pub trait TransmitClient {
    /// A call to `Transmit::transmit_buffer` completed. The `Result<(),
    /// ErrorCode>` indicates whether the buffer was successfully transmitted.
    /// A `tx_len` of zero indicates that no bytes were transmitted.
    ///
    /// Valid `ErrorCode` values are:
    ///  - FAIL: The DMA engine reported an error while moving the buffer.
    fn transmitted_buffer(
        &self,
        tx_buffer: &'static mut [u8],
        tx_len: usize,
        rval: Result<(), ErrorCode>,
    );
}

/// Trait implemented by a UART receiver to receive callbacks when data is
/// available.
pub trait ReceiveClient {
    /// Bytes arrived. `data` is only valid for the duration of the call.
    ///
    /// `rval` is `Err(ErrorCode::FAIL)` when the hardware reported a problem,
    /// in which case `error` says what kind; `data` then holds whatever
    /// arrived before the problem.
    fn received_data(&self, data: &[u8], rval: Result<(), ErrorCode>, error: Error);
}

/// A full-duplex UART: line configuration plus both directions.
pub trait Uart<'a>: Configure + Transmit<'a> + Receive<'a> {}
