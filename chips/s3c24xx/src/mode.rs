// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Choice between interrupt-driven and DMA-driven transfers.
//!
//! Each direction has its own mode and its own in-progress flag. The mode
//! is chosen when a transfer starts and cannot change until that transfer
//! has finished.

use core::cell::Cell;

use kernel::ErrorCode;

use crate::dma::Direction;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransferMode {
    /// Bytes are moved by the CPU, one FIFO interrupt at a time.
    Interrupt,
    /// Bytes are moved by a DMA channel.
    Dma,
}

/// Mode for a transfer of `len` bytes.
pub fn select_mode(len: usize, min_dma_size: usize, channel_bound: bool) -> TransferMode {
    if channel_bound && len >= min_dma_size {
        TransferMode::Dma
    } else {
        TransferMode::Interrupt
    }
}

pub struct ModeController {
    min_dma_size: usize,
    tx_mode: Cell<TransferMode>,
    rx_mode: Cell<TransferMode>,
    tx_in_progress: Cell<bool>,
    rx_in_progress: Cell<bool>,
}

impl ModeController {
    pub const fn new(min_dma_size: usize) -> ModeController {
        ModeController {
            min_dma_size,
            tx_mode: Cell::new(TransferMode::Interrupt),
            rx_mode: Cell::new(TransferMode::Interrupt),
            tx_in_progress: Cell::new(false),
            rx_in_progress: Cell::new(false),
        }
    }

    fn cells(&self, direction: Direction) -> (&Cell<TransferMode>, &Cell<bool>) {
        match direction {
            Direction::Tx => (&self.tx_mode, &self.tx_in_progress),
            Direction::Rx => (&self.rx_mode, &self.rx_in_progress),
        }
    }

    pub fn mode(&self, direction: Direction) -> TransferMode {
        self.cells(direction).0.get()
    }

    pub fn in_progress(&self, direction: Direction) -> bool {
        self.cells(direction).1.get()
    }

    /// The mode a transfer of `len` bytes would use. Does not change state.
    pub fn select(&self, len: usize, channel_bound: bool) -> TransferMode {
        select_mode(len, self.min_dma_size, channel_bound)
    }

    /// Mark a transfer in `mode` as started.
    pub fn begin(&self, direction: Direction, mode: TransferMode) -> Result<(), ErrorCode> {
        let (current, busy) = self.cells(direction);
        if busy.get() {
            return Err(ErrorCode::BUSY);
        }
        current.set(mode);
        busy.set(true);
        Ok(())
    }

    /// Mark the transfer in `direction` as finished. The mode is kept.
    pub fn finish(&self, direction: Direction) {
        self.cells(direction).1.set(false);
    }

    /// Change the mode of an idle direction. Returns whether it changed.
    pub fn switch(&self, direction: Direction, mode: TransferMode) -> Result<bool, ErrorCode> {
        let (current, busy) = self.cells(direction);
        if busy.get() {
            return Err(ErrorCode::BUSY);
        }
        Ok(current.replace(mode) != mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_splits_modes() {
        for min in [1usize, 8, 64, 512] {
            for len in 0..(2 * min) {
                let expected = if len < min {
                    TransferMode::Interrupt
                } else {
                    TransferMode::Dma
                };
                assert_eq!(select_mode(len, min, true), expected);
                assert_eq!(select_mode(len, min, false), TransferMode::Interrupt);
            }
        }
    }

    #[test]
    fn begin_while_busy_is_rejected() {
        let modes = ModeController::new(8);
        modes.begin(Direction::Tx, TransferMode::Dma).unwrap();
        assert!(modes.in_progress(Direction::Tx));
        assert_eq!(
            modes.begin(Direction::Tx, TransferMode::Interrupt),
            Err(ErrorCode::BUSY)
        );
        // The running transfer keeps its mode.
        assert_eq!(modes.mode(Direction::Tx), TransferMode::Dma);

        // Directions are independent.
        assert!(modes.begin(Direction::Rx, TransferMode::Interrupt).is_ok());

        modes.finish(Direction::Tx);
        assert!(!modes.in_progress(Direction::Tx));
        assert_eq!(modes.mode(Direction::Tx), TransferMode::Dma);
    }

    #[test]
    fn switch_only_between_transfers() {
        let modes = ModeController::new(8);
        assert_eq!(modes.switch(Direction::Rx, TransferMode::Dma), Ok(true));
        assert_eq!(modes.switch(Direction::Rx, TransferMode::Dma), Ok(false));

        modes.begin(Direction::Rx, TransferMode::Dma).unwrap();
        assert_eq!(
            modes.switch(Direction::Rx, TransferMode::Interrupt),
            Err(ErrorCode::BUSY)
        );
        modes.finish(Direction::Rx);
        assert_eq!(modes.switch(Direction::Rx, TransferMode::Interrupt), Ok(true));
    }
}
