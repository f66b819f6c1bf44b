// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Board-supplied configuration of a port.

/// Clock floors held while a port is busy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QosConfig {
    /// CPU frequency floor in kHz, 0 for no request.
    pub cpu_qos_val: u32,
    /// Memory interconnect frequency floor in kHz, 0 for no request.
    pub mif_qos_val: u32,
    /// Quiet time after the last transfer before the floors are dropped.
    pub qos_timeout_ms: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PortConfig {
    /// Transfers shorter than this many bytes never use DMA.
    pub min_dma_size: usize,
    pub qos: QosConfig,
    /// Keep a copy of the most recent traffic in the diagnostic log.
    pub uart_logging: bool,
    /// RTS de-assert level when hardware flow control is on, in UMCON units.
    pub rts_trig_level: u32,
    /// RX FIFO trigger level, in UFCON units.
    pub rx_fifo_trigger: u32,
    /// TX FIFO trigger level, in UFCON units.
    pub tx_fifo_trigger: u32,
    /// RX timeout in frame times, in UCON units.
    pub rx_timeout_interval: u32,
}

impl PortConfig {
    pub const DEFAULT: PortConfig = PortConfig {
        min_dma_size: 128,
        qos: QosConfig {
            cpu_qos_val: 0,
            mif_qos_val: 0,
            qos_timeout_ms: 50,
        },
        uart_logging: false,
        rts_trig_level: 0,
        rx_fifo_trigger: 1,
        tx_fifo_trigger: 0,
        rx_timeout_interval: 3,
    };
}
