// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Per-variant description of the UART block.

/// Static facts about one generation of the UART block, shared by every port
/// of that generation.
#[derive(Debug)]
pub struct UartInfo {
    pub name: &'static str,
    /// Depth of each FIFO in bytes.
    pub fifo_size: usize,
    pub rx_fifo_mask: u32,
    pub rx_fifo_shift: u32,
    pub rx_fifo_full: u32,
    pub tx_fifo_mask: u32,
    pub tx_fifo_shift: u32,
    pub tx_fifo_full: u32,
    /// Position of the RTS trigger level field in UMCON.
    pub rts_trig_shift: u32,
    /// Clock source selected in UCON after reset.
    pub def_clk_sel: u32,
    /// UFRACVAL holds a 1/16 fractional divider.
    pub has_divslot: bool,
}

pub static S3C6400_INFO: UartInfo = UartInfo {
    name: "Samsung S3C6400 UART",
    fifo_size: 64,
    rx_fifo_mask: 0x3f,
    rx_fifo_shift: 0,
    rx_fifo_full: 1 << 6,
    tx_fifo_mask: 0x3f << 8,
    tx_fifo_shift: 8,
    tx_fifo_full: 1 << 14,
    rts_trig_shift: 5,
    def_clk_sel: 2,
    has_divslot: true,
};

pub static EXYNOS_INFO: UartInfo = UartInfo {
    name: "Samsung Exynos UART",
    fifo_size: 256,
    rx_fifo_mask: 0xff,
    rx_fifo_shift: 0,
    rx_fifo_full: 1 << 8,
    tx_fifo_mask: 0xff << 16,
    tx_fifo_shift: 16,
    tx_fifo_full: 1 << 24,
    rts_trig_shift: 5,
    def_clk_sel: 0,
    has_divslot: true,
};

impl UartInfo {
    /// Number of bytes waiting in the RX FIFO, decoded from a UFSTAT value.
    pub fn rx_fifo_count(&self, ufstat: u32) -> usize {
        if ufstat & self.rx_fifo_full != 0 {
            self.fifo_size
        } else {
            ((ufstat & self.rx_fifo_mask) >> self.rx_fifo_shift) as usize
        }
    }

    /// Number of bytes queued in the TX FIFO, decoded from a UFSTAT value.
    pub fn tx_fifo_count(&self, ufstat: u32) -> usize {
        if ufstat & self.tx_fifo_full != 0 {
            self.fifo_size
        } else {
            ((ufstat & self.tx_fifo_mask) >> self.tx_fifo_shift) as usize
        }
    }
}
