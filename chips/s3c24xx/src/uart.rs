// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! One physical UART port.
//!
//! A `Port` implements the UART HIL on top of the register block, an
//! optional DMA channel per direction, the receive ring and the QoS
//! governor. Every transfer picks its mode when it starts: transfers shorter
//! than `min_dma_size`, or in a direction without a DMA channel, are moved
//! by the CPU from the FIFO interrupts; longer ones are handed to DMA.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let port = static_init!(
//!     Port<'static, VirtualMuxAlarm<'static, Mct>, Chip>,
//!     Port::new(UART0_BASE, &EXYNOS_INFO, PortConfig::DEFAULT, 100_000_000,
//!               chip, alarm, &mut RX_RING)
//! );
//! port.register();
//! port.set_tx_dma_channel(&pdma.channels[0])?;
//! port.startup()?;
//! ```

use core::cell::Cell;

use kernel::hil;
use kernel::hil::dma::{BusWidth, ChannelId, Cookie, DmaAddress, DmaChannel, SlaveConfig};
use kernel::hil::pm_qos::PmQos;
use kernel::hil::time::Alarm;
use kernel::platform::chip::Atomic;
use kernel::utilities::cells::{MapCell, NumericCellExt, OptionalCell, TakeCell};
use kernel::utilities::registers::interfaces::{Readable, Writeable};
use kernel::utilities::registers::LocalRegisterCopy;
use kernel::utilities::StaticRef;
use kernel::ErrorCode;
use log::{debug, warn};

use crate::buffer::{DiagnosticLog, LocalRingBuffer};
use crate::config::PortConfig;
use crate::dma::{Direction, DmaManager, Finished, TransferClient, TransferError};
use crate::info::UartInfo;
use crate::mode::{ModeController, TransferMode};
use crate::qos::QosGovernor;
use crate::regs::{RegisterAccess, UartRegisters, UCON, UERSTAT, UFCON, ULCON, UINT, UMCON, UTRSTAT};

/// Counters a port keeps for diagnosis.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PortStats {
    /// Received bytes lost because there was nowhere to put them.
    pub rx_dropped: usize,
    /// DMA completions that arrived for a transfer no longer outstanding.
    pub late_completions: usize,
    /// Line errors reported by the receiver.
    pub rx_errors: usize,
    pub qos_raises: usize,
    pub qos_relaxes: usize,
}

/// Buffers handed back by `shutdown`.
pub struct Reclaimed {
    /// The buffer of a transmission that was still running.
    pub tx_buffer: Option<&'static mut [u8]>,
    /// The persistent DMA receive buffer.
    pub rx_dma_buffer: Option<&'static mut [u8]>,
}

pub struct Port<'a, A: Alarm<'a>, M: Atomic> {
    info: &'static UartInfo,
    config: PortConfig,
    regs: RegisterAccess<'a, M>,
    src_clk_rate: u32,
    baudclk_rate: Cell<u32>,
    rx_claimed: Cell<bool>,
    tx_claimed: Cell<bool>,

    modes: ModeController,
    dma: DmaManager<'a>,
    qos: QosGovernor<'a, A>,
    rx_ring: MapCell<LocalRingBuffer>,
    rx_capacity: usize,
    log: MapCell<DiagnosticLog>,

    tx_client: OptionalCell<&'a dyn hil::uart::TransmitClient>,
    rx_client: OptionalCell<&'a dyn hil::uart::ReceiveClient>,

    tx_buffer: TakeCell<'static, [u8]>,
    tx_len: Cell<usize>,
    tx_position: Cell<usize>,
    rx_len: Cell<usize>,
    /// An RX DMA completion is being delivered to the client.
    rx_dma_delivering: Cell<bool>,
    /// A DMA receive was started from the client callback and is submitted
    /// once the persistent buffer is handed back.
    rx_dma_deferred: Cell<bool>,

    rx_overflow: Cell<usize>,
    rx_errors: Cell<usize>,
}

impl<'a, A: Alarm<'a>, M: Atomic> Port<'a, A, M> {
    pub fn new(
        registers: StaticRef<UartRegisters>,
        info: &'static UartInfo,
        config: PortConfig,
        src_clk_rate: u32,
        atomic: &'a M,
        alarm: &'a A,
        rx_storage: &'static mut [u8],
    ) -> Port<'a, A, M> {
        let rx_ring = LocalRingBuffer::new(rx_storage);
        Port {
            info,
            config,
            regs: RegisterAccess::new(registers, atomic),
            src_clk_rate,
            baudclk_rate: Cell::new(0),
            rx_claimed: Cell::new(false),
            tx_claimed: Cell::new(false),

            modes: ModeController::new(config.min_dma_size),
            dma: DmaManager::new(),
            qos: QosGovernor::new(alarm, config.qos),
            rx_capacity: rx_ring.capacity(),
            rx_ring: MapCell::new(rx_ring),
            log: MapCell::empty(),

            tx_client: OptionalCell::empty(),
            rx_client: OptionalCell::empty(),

            tx_buffer: TakeCell::empty(),
            tx_len: Cell::new(0),
            tx_position: Cell::new(0),
            rx_len: Cell::new(0),
            rx_dma_delivering: Cell::new(false),
            rx_dma_deferred: Cell::new(false),

            rx_overflow: Cell::new(0),
            rx_errors: Cell::new(0),
        }
    }

    /// Wire up the callbacks that need a `'a` reference to the port.
    pub fn register(&'a self) {
        self.qos.register();
    }

    pub fn set_pm_qos(&self, pm_qos: &'a dyn PmQos) {
        self.qos.set_pm_qos(pm_qos);
    }

    /// Keep a copy of recent traffic in `storage`. Returns `storage` if
    /// logging is not enabled in the port configuration.
    pub fn set_diagnostic_storage(
        &self,
        storage: &'static mut [u8],
    ) -> Option<&'static mut [u8]> {
        if self.config.uart_logging {
            self.log.put(DiagnosticLog::new(storage));
            None
        } else {
            Some(storage)
        }
    }

    /// Set the DMA channel for transferring data to this port.
    pub fn set_tx_dma_channel(&'a self, channel: &'a dyn DmaChannel<'a>) -> Result<(), ErrorCode> {
        self.dma.set_client(self);
        channel.set_client(self.dma.channel_client(Direction::Tx));
        self.dma.bind_channel(
            Direction::Tx,
            channel,
            SlaveConfig {
                direction: hil::dma::Direction::MemToDev,
                device_addr: DmaAddress(self.regs.tx_data_addr()),
                addr_width: BusWidth::Bits8,
                max_burst: 1,
            },
        )
    }

    /// Set the DMA channel used for receiving data from this port, and the
    /// buffer every DMA receive lands in.
    pub fn set_rx_dma_channel(
        &'a self,
        channel: &'a dyn DmaChannel<'a>,
        rx_buffer: &'static mut [u8],
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        self.dma.set_client(self);
        channel.set_client(self.dma.channel_client(Direction::Rx));
        if let Err(e) = self.dma.bind_channel(
            Direction::Rx,
            channel,
            SlaveConfig {
                direction: hil::dma::Direction::DevToMem,
                device_addr: DmaAddress(self.regs.rx_data_addr()),
                addr_width: BusWidth::Bits8,
                max_burst: 1,
            },
        ) {
            return Err((e, rx_buffer));
        }
        self.dma.provide_rx_buffer(rx_buffer).map(|_| ())
    }

    /// Stop using DMA for `direction`. Returns the buffer the direction was
    /// holding, if any.
    ///
    /// Fails with `BUSY` while a transfer is running in that direction.
    pub fn release_dma(&self, direction: Direction) -> Result<Option<&'static mut [u8]>, ErrorCode> {
        if self.modes.in_progress(direction) {
            return Err(ErrorCode::BUSY);
        }
        if self.modes.switch(direction, TransferMode::Interrupt)? {
            self.set_ucon_mode(direction, TransferMode::Interrupt);
        }
        Ok(self.dma.release(direction))
    }

    /// Bring the port up: reset the FIFOs, mask and clear every interrupt,
    /// put both directions in interrupt mode and claim them.
    pub fn startup(&self) -> Result<(), ErrorCode> {
        if self.tx_claimed.get() && self.rx_claimed.get() {
            return Err(ErrorCode::ALREADY);
        }
        let regs = self.regs.regs();

        self.regs.write(&regs.uintm, 0xf);
        self.regs.write(&regs.uintp, 0xf);

        regs.ufcon.write(
            UFCON::FIFO_EN::SET
                + UFCON::RX_FIFO_RESET::SET
                + UFCON::TX_FIFO_RESET::SET
                + UFCON::RX_TRIG.val(self.config.rx_fifo_trigger)
                + UFCON::TX_TRIG.val(self.config.tx_fifo_trigger),
        );
        self.regs.modify(
            &regs.ucon,
            UCON::RX_MODE::Interrupt
                + UCON::TX_MODE::Interrupt
                + UCON::RX_ERR_IRQ::SET
                + UCON::RX_TIMEOUT::SET
                + UCON::RX_TIMEOUT_INTERVAL.val(self.config.rx_timeout_interval)
                + UCON::CLK_SEL.val(self.info.def_clk_sel),
        );
        let _ = self.modes.switch(Direction::Tx, TransferMode::Interrupt);
        let _ = self.modes.switch(Direction::Rx, TransferMode::Interrupt);
        self.rx_ring.map(|ring| ring.empty());

        self.unmask(UINT::ERROR.shift);
        self.tx_claimed.set(true);
        self.rx_claimed.set(true);
        debug!("{} up, fifo {} bytes", self.info.name, self.info.fifo_size);
        Ok(())
    }

    /// Take the port down.
    ///
    /// Running transfers are stopped without a callback, DMA channels are
    /// released, and the QoS floors are dropped at once. Every buffer the
    /// port was holding is handed back.
    pub fn shutdown(&self) -> Reclaimed {
        let regs = self.regs.regs();
        self.regs.write(&regs.uintm, 0xf);
        self.regs.write(&regs.uintp, 0xf);

        let tx_buffer = self.stop_tx().map(|(buf, _)| buf);
        self.stop_rx();

        let tx_held = self.dma.release(Direction::Tx);
        let rx_dma_buffer = self.dma.release(Direction::Rx);
        let _ = self.modes.switch(Direction::Tx, TransferMode::Interrupt);
        let _ = self.modes.switch(Direction::Rx, TransferMode::Interrupt);
        self.regs.modify(
            &regs.ucon,
            UCON::RX_MODE::Disabled + UCON::TX_MODE::Disabled,
        );

        self.tx_claimed.set(false);
        self.rx_claimed.set(false);
        self.qos.force_relax();
        debug!("{} down", self.info.name);

        Reclaimed {
            tx_buffer: tx_buffer.or(tx_held),
            rx_dma_buffer,
        }
    }

    pub fn is_started(&self) -> bool {
        self.tx_claimed.get() && self.rx_claimed.get()
    }

    pub fn tx_in_progress(&self) -> bool {
        self.modes.in_progress(Direction::Tx)
    }

    pub fn rx_in_progress(&self) -> bool {
        self.modes.in_progress(Direction::Rx)
    }

    pub fn mode(&self, direction: Direction) -> TransferMode {
        self.modes.mode(direction)
    }

    /// Rate of the clock feeding the baud divider, as last programmed.
    pub fn baudclk_rate(&self) -> u32 {
        self.baudclk_rate.get()
    }

    pub fn stats(&self) -> PortStats {
        PortStats {
            rx_dropped: self.rx_ring.map_or(0, |ring| ring.dropped()) + self.rx_overflow.get(),
            late_completions: self.dma.late_completions(),
            rx_errors: self.rx_errors.get(),
            qos_raises: self.qos.raises(),
            qos_relaxes: self.qos.relaxes(),
        }
    }

    /// Read-only view of the diagnostic log, if logging is enabled.
    pub fn map_diagnostic_log<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&DiagnosticLog) -> R,
    {
        self.log.map(|log| f(log))
    }

    fn record(&self, bytes: &[u8]) {
        self.log.map(|log| log.record(bytes));
    }

    fn mask(&self, index: usize) {
        self.regs.set_bit(&self.regs.regs().uintm, index);
    }

    fn unmask(&self, index: usize) {
        self.regs.clear_bit(&self.regs.regs().uintm, index);
    }

    /// Program the UCON mode bits of `direction`: `01` for interrupt, `10`
    /// for DMA.
    fn set_ucon_mode(&self, direction: Direction, mode: TransferMode) {
        let base = match direction {
            Direction::Tx => UCON::TX_MODE.shift,
            Direction::Rx => UCON::RX_MODE.shift,
        };
        let ucon = &self.regs.regs().ucon;
        match mode {
            TransferMode::Interrupt => {
                self.regs.clear_bit(ucon, base + 1);
                self.regs.set_bit(ucon, base);
            }
            TransferMode::Dma => {
                self.regs.clear_bit(ucon, base);
                self.regs.set_bit(ucon, base + 1);
            }
        }
    }

    fn start_tx(&self, mode: TransferMode) -> Result<(), ErrorCode> {
        if self.modes.mode(Direction::Tx) != mode {
            self.set_ucon_mode(Direction::Tx, mode);
        }
        self.modes.begin(Direction::Tx, mode)
    }

    fn transmit_buffer_interrupt(
        &self,
        tx_buffer: &'static mut [u8],
        tx_len: usize,
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        if let Err(e) = self.start_tx(TransferMode::Interrupt) {
            return Err((e, tx_buffer));
        }
        self.tx_buffer.replace(tx_buffer);
        self.tx_len.set(tx_len);
        self.tx_position.set(0);
        self.qos.activity();
        self.unmask(UINT::TXD.shift);
        Ok(())
    }

    fn transmit_buffer_dma(
        &self,
        tx_buffer: &'static mut [u8],
        tx_len: usize,
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        if let Err(e) = self.start_tx(TransferMode::Dma) {
            return Err((e, tx_buffer));
        }
        match self.dma.submit_tx(tx_buffer, tx_len) {
            Ok(_cookie) => {
                self.tx_len.set(tx_len);
                self.qos.activity();
                Ok(())
            }
            Err((TransferError::ChannelUnavailable, tx_buffer)) => {
                self.modes.finish(Direction::Tx);
                debug!("TX DMA unavailable, using interrupts");
                self.transmit_buffer_interrupt(tx_buffer, tx_len)
            }
            Err((e, tx_buffer)) => {
                self.modes.finish(Direction::Tx);
                Err((e.into(), tx_buffer))
            }
        }
    }

    /// Stop the running transmission, handing back its buffer and the
    /// number of bytes that went out.
    fn stop_tx(&self) -> Option<(&'static mut [u8], usize)> {
        if !self.modes.in_progress(Direction::Tx) {
            return None;
        }
        let stopped = match self.modes.mode(Direction::Tx) {
            TransferMode::Dma => self
                .dma
                .cancel(Direction::Tx)
                .and_then(|f| f.buffer.map(|buf| (buf, f.transferred))),
            TransferMode::Interrupt => {
                self.mask(UINT::TXD.shift);
                self.tx_buffer
                    .take()
                    .map(|buf| (buf, self.tx_position.get()))
            }
        };
        self.modes.finish(Direction::Tx);
        stopped
    }

    fn stop_rx(&self) -> bool {
        if !self.modes.in_progress(Direction::Rx) {
            return false;
        }
        self.mask(UINT::RXD.shift);
        self.rx_dma_deferred.set(false);
        if self.modes.mode(Direction::Rx) == TransferMode::Dma {
            let _ = self.dma.cancel(Direction::Rx);
        }
        self.rx_ring.map(|ring| ring.empty());
        self.modes.finish(Direction::Rx);
        true
    }

    fn receive_interrupt(&self, rx_len: usize) -> Result<(), ErrorCode> {
        if rx_len > self.rx_capacity {
            return Err(ErrorCode::SIZE);
        }
        if self.modes.mode(Direction::Rx) != TransferMode::Interrupt {
            self.set_ucon_mode(Direction::Rx, TransferMode::Interrupt);
        }
        self.modes.begin(Direction::Rx, TransferMode::Interrupt)?;
        self.rx_len.set(rx_len);
        self.rx_ring.map(|ring| ring.empty());
        self.qos.activity();
        self.unmask(UINT::RXD.shift);
        Ok(())
    }

    fn receive_dma(&self, rx_len: usize) -> Result<(), ErrorCode> {
        if self.modes.mode(Direction::Rx) != TransferMode::Dma {
            self.set_ucon_mode(Direction::Rx, TransferMode::Dma);
        }
        self.modes.begin(Direction::Rx, TransferMode::Dma)?;
        if self.rx_dma_delivering.get() {
            // The persistent buffer is lent to the client right now.
            self.rx_len.set(rx_len);
            self.rx_dma_deferred.set(true);
            self.qos.activity();
            return Ok(());
        }
        self.submit_rx_dma(rx_len)
    }

    fn submit_rx_dma(&self, rx_len: usize) -> Result<(), ErrorCode> {
        match self.dma.submit_rx(rx_len) {
            Ok(_cookie) => {
                self.rx_len.set(rx_len);
                self.qos.activity();
                // In DMA mode the RX interrupt only fires on line timeout.
                self.unmask(UINT::RXD.shift);
                Ok(())
            }
            Err(TransferError::ChannelUnavailable) => {
                self.modes.finish(Direction::Rx);
                debug!("RX DMA unavailable, using interrupts");
                self.receive_interrupt(rx_len)
            }
            Err(e) => {
                self.modes.finish(Direction::Rx);
                Err(e.into())
            }
        }
    }

    /// Service the port's interrupt line.
    pub fn handle_interrupt(&self) {
        let regs = self.regs.regs();
        let pending = self.regs.read(&regs.uintp) & !self.regs.read(&regs.uintm);
        if pending == 0 {
            return;
        }
        self.regs.write(&regs.uintp, pending);
        let pending: LocalRegisterCopy<u32, UINT::Register> = LocalRegisterCopy::new(pending);

        if pending.is_set(UINT::ERROR) {
            self.handle_error_interrupt();
        }
        if pending.is_set(UINT::RXD) {
            self.handle_rx_interrupt();
        }
        if pending.is_set(UINT::TXD) {
            self.handle_tx_interrupt();
        }
    }

    fn handle_tx_interrupt(&self) {
        if !self.modes.in_progress(Direction::Tx)
            || self.modes.mode(Direction::Tx) != TransferMode::Interrupt
        {
            self.mask(UINT::TXD.shift);
            return;
        }
        let queued = self
            .info
            .tx_fifo_count(self.regs.read(&self.regs.regs().ufstat));
        if queued >= self.info.fifo_size {
            return;
        }

        let position = self.tx_position.get();
        let len = self.tx_len.get();
        let written = self.tx_buffer.map_or(false, |buf| {
            if position < len {
                self.regs.write_byte(buf[position]);
                true
            } else {
                false
            }
        });
        if written {
            self.tx_position.set(position + 1);
        }

        if self.tx_position.get() >= len {
            self.mask(UINT::TXD.shift);
            self.modes.finish(Direction::Tx);
            self.qos.activity();
            if let Some(buf) = self.tx_buffer.take() {
                self.record(&buf[..len]);
                self.tx_client.map(move |client| {
                    client.transmitted_buffer(buf, len, Ok(()));
                });
            }
        }
    }

    fn handle_rx_interrupt(&self) {
        if !self.modes.in_progress(Direction::Rx) {
            self.mask(UINT::RXD.shift);
            return;
        }
        let regs = self.regs.regs();
        let timed_out = regs.utrstat.is_set(UTRSTAT::RX_TIMEOUT);
        if timed_out {
            regs.utrstat.write(UTRSTAT::RX_TIMEOUT::SET);
        }

        match self.modes.mode(Direction::Rx) {
            TransferMode::Dma => {
                if !timed_out {
                    return;
                }
                // Fewer bytes than a DMA burst are left in the FIFO and the
                // line went quiet.
                if let Some(finished) = self.dma.cancel(Direction::Rx) {
                    let received = self.drain_fifo_into_dma_buffer(finished.transferred);
                    self.finish_rx_dma(received, Ok(()), hil::uart::Error::None);
                }
            }
            TransferMode::Interrupt => {
                self.drain_fifo_into_ring();
                let available = self.rx_ring.map_or(0, |ring| ring.available());
                if available >= self.rx_len.get() || (timed_out && available > 0) {
                    self.finish_rx_interrupt(Ok(()), hil::uart::Error::None);
                }
            }
        }
    }

    fn handle_error_interrupt(&self) {
        let status = self.regs.regs().uerstat.extract();
        let error = if status.is_set(UERSTAT::OVERRUN) {
            hil::uart::Error::OverrunError
        } else if status.is_set(UERSTAT::PARITY) {
            hil::uart::Error::ParityError
        } else if status.is_set(UERSTAT::FRAME) {
            hil::uart::Error::FramingError
        } else if status.is_set(UERSTAT::BREAK) {
            hil::uart::Error::BreakError
        } else {
            return;
        };
        self.rx_errors.increment();
        warn!("{}: {:?}", self.info.name, error);

        if !self.modes.in_progress(Direction::Rx) {
            return;
        }
        match self.modes.mode(Direction::Rx) {
            TransferMode::Dma => {
                if let Some(finished) = self.dma.cancel(Direction::Rx) {
                    let received = self.drain_fifo_into_dma_buffer(finished.transferred);
                    self.finish_rx_dma(received, Err(ErrorCode::FAIL), error);
                }
            }
            TransferMode::Interrupt => {
                self.drain_fifo_into_ring();
                self.finish_rx_interrupt(Err(ErrorCode::FAIL), error);
            }
        }
    }

    fn drain_fifo_into_ring(&self) {
        let count = self
            .info
            .rx_fifo_count(self.regs.read(&self.regs.regs().ufstat));
        self.rx_ring.map(|ring| {
            for _ in 0..count {
                if !ring.push(self.regs.read_byte()) {
                    warn!("RX ring full, byte dropped ({})", TransferError::BufferFull);
                }
            }
        });
    }

    /// Copy what is left in the RX FIFO after a cancelled DMA receive in
    /// behind the `transferred` bytes the channel moved. Returns the total.
    fn drain_fifo_into_dma_buffer(&self, transferred: usize) -> usize {
        let count = self
            .info
            .rx_fifo_count(self.regs.read(&self.regs.regs().ufstat));
        let requested = self.rx_len.get();
        self.dma
            .map_rx_buffer(|buf| {
                let limit = requested.min(buf.len());
                let mut received = transferred.min(limit);
                for _ in 0..count {
                    let byte = self.regs.read_byte();
                    if received < limit {
                        buf[received] = byte;
                        received += 1;
                    } else {
                        self.rx_overflow.increment();
                    }
                }
                received
            })
            .unwrap_or(0)
    }

    fn finish_rx_interrupt(&self, rval: Result<(), ErrorCode>, error: hil::uart::Error) {
        self.mask(UINT::RXD.shift);
        self.modes.finish(Direction::Rx);
        self.qos.activity();
        // A receive issued from the callback finds the ring taken; it is
        // emptied once the callback returns.
        self.rx_ring.map(|ring| {
            // The ring is emptied before every receive, so the data is one
            // contiguous run.
            let data = ring.as_slices().0.unwrap_or(&[]);
            self.record(data);
            self.rx_client
                .map(|client| client.received_data(data, rval, error));
            ring.empty();
        });
    }

    fn finish_rx_dma(&self, received: usize, rval: Result<(), ErrorCode>, error: hil::uart::Error) {
        self.mask(UINT::RXD.shift);
        self.modes.finish(Direction::Rx);
        self.qos.activity();
        self.rx_dma_delivering.set(true);
        self.dma.map_rx_data(received, |data| {
            self.record(data);
            self.rx_client
                .map(|client| client.received_data(data, rval, error));
        });
        self.rx_dma_delivering.set(false);

        if self.rx_dma_deferred.replace(false) {
            if let Err(e) = self.submit_rx_dma(self.rx_len.get()) {
                warn!("{}: chained RX DMA failed: {:?}", self.info.name, e);
                self.rx_client.map(|client| {
                    client.received_data(&[], Err(e), hil::uart::Error::Aborted)
                });
            }
        }
    }

    fn dma_finished(&self, finished: Finished) {
        match finished.direction {
            Direction::Tx => {
                self.modes.finish(Direction::Tx);
                self.qos.activity();
                if let Some(buf) = finished.buffer {
                    self.record(&buf[..finished.transferred.min(buf.len())]);
                    let rval = finished.result;
                    self.tx_client.map(move |client| {
                        client.transmitted_buffer(buf, finished.transferred, rval);
                    });
                }
            }
            Direction::Rx => match finished.result {
                Ok(()) => self.finish_rx_dma(
                    finished.transferred,
                    Ok(()),
                    hil::uart::Error::None,
                ),
                Err(e) => {
                    // Whatever the channel moved before failing is dropped.
                    self.finish_rx_dma(0, Err(e), hil::uart::Error::Aborted);
                }
            },
        }
    }
}

impl<'a, A: Alarm<'a>, M: Atomic> hil::uart::Configure for Port<'a, A, M> {
    fn configure(&self, params: hil::uart::Parameters) -> Result<(), ErrorCode> {
        if params.baud_rate == 0 {
            return Err(ErrorCode::INVAL);
        }
        if self.modes.in_progress(Direction::Tx) || self.modes.in_progress(Direction::Rx) {
            return Err(ErrorCode::BUSY);
        }

        let div = self.src_clk_rate / params.baud_rate;
        if div < 16 {
            return Err(ErrorCode::INVAL);
        }
        let regs = self.regs.regs();

        let width = match params.width {
            hil::uart::Width::Five => ULCON::WORD_LEN::Five,
            hil::uart::Width::Six => ULCON::WORD_LEN::Six,
            hil::uart::Width::Seven => ULCON::WORD_LEN::Seven,
            hil::uart::Width::Eight => ULCON::WORD_LEN::Eight,
        };
        let stop_bits = match params.stop_bits {
            hil::uart::StopBits::One => ULCON::STOP_BITS::One,
            hil::uart::StopBits::Two => ULCON::STOP_BITS::Two,
        };
        let parity = match params.parity {
            hil::uart::Parity::None => ULCON::PARITY::None,
            hil::uart::Parity::Odd => ULCON::PARITY::Odd,
            hil::uart::Parity::Even => ULCON::PARITY::Even,
        };
        regs.ulcon.write(width + stop_bits + parity);

        if params.hw_flow_control {
            self.regs.write(
                &regs.umcon,
                UMCON::AUTO_FLOW::SET.value
                    | (self.config.rts_trig_level << self.info.rts_trig_shift),
            );
        } else {
            regs.umcon.set(0);
        }

        if self.info.has_divslot {
            self.regs.write(&regs.ubrdiv, div / 16 - 1);
            self.regs.write(&regs.ufracval, div % 16);
        } else {
            self.regs.write(&regs.ubrdiv, (div + 8) / 16 - 1);
        }
        self.baudclk_rate.set(self.src_clk_rate);
        debug!(
            "{}: {} baud, divisor {}",
            self.info.name, params.baud_rate, div
        );
        Ok(())
    }
}

impl<'a, A: Alarm<'a>, M: Atomic> hil::uart::Transmit<'a> for Port<'a, A, M> {
    fn set_transmit_client(&self, client: &'a dyn hil::uart::TransmitClient) {
        self.tx_client.set(client);
    }

    fn transmit_buffer(
        &self,
        tx_buffer: &'static mut [u8],
        tx_len: usize,
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        if !self.tx_claimed.get() {
            return Err((ErrorCode::OFF, tx_buffer));
        } else if tx_len == 0 || tx_len > tx_buffer.len() {
            return Err((ErrorCode::SIZE, tx_buffer));
        } else if self.modes.in_progress(Direction::Tx) {
            return Err((ErrorCode::BUSY, tx_buffer));
        }

        match self.modes.select(tx_len, self.dma.is_bound(Direction::Tx)) {
            TransferMode::Dma => self.transmit_buffer_dma(tx_buffer, tx_len),
            TransferMode::Interrupt => self.transmit_buffer_interrupt(tx_buffer, tx_len),
        }
    }

    fn transmit_abort(&self) -> Option<(&'static mut [u8], usize)> {
        self.stop_tx()
    }
}

impl<'a, A: Alarm<'a>, M: Atomic> hil::uart::Receive<'a> for Port<'a, A, M> {
    fn set_receive_client(&self, client: &'a dyn hil::uart::ReceiveClient) {
        self.rx_client.set(client);
    }

    fn receive(&self, rx_len: usize) -> Result<(), ErrorCode> {
        if !self.rx_claimed.get() {
            return Err(ErrorCode::OFF);
        } else if rx_len == 0 {
            return Err(ErrorCode::SIZE);
        } else if self.modes.in_progress(Direction::Rx) {
            return Err(ErrorCode::BUSY);
        }

        let dma_ready = self.dma.is_bound(Direction::Rx) && rx_len <= self.dma.rx_buffer_len();
        match self.modes.select(rx_len, dma_ready) {
            TransferMode::Dma => self.receive_dma(rx_len),
            TransferMode::Interrupt => self.receive_interrupt(rx_len),
        }
    }

    fn receive_abort(&self) -> Result<(), ErrorCode> {
        if self.stop_rx() {
            Ok(())
        } else {
            Err(ErrorCode::ALREADY)
        }
    }
}

impl<'a, A: Alarm<'a>, M: Atomic> hil::uart::Uart<'a> for Port<'a, A, M> {}

impl<'a, A: Alarm<'a>, M: Atomic> TransferClient for Port<'a, A, M> {
    fn transfer_done(
        &self,
        direction: Direction,
        channel: ChannelId,
        cookie: Cookie,
        result: Result<(), ErrorCode>,
    ) {
        // Late completions are logged and counted by the manager.
        if let Ok(finished) = self.dma.complete(direction, channel, cookie, result) {
            self.dma_finished(finished);
        }
    }
}
