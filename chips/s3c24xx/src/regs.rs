// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Register block of the S3C24xx-family UART and masked access to it.

use kernel::platform::chip::Atomic;
use kernel::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use kernel::utilities::registers::{
    register_bitfields, register_structs, FieldValue, ReadOnly, ReadWrite, RegisterLongName,
    WriteOnly,
};
use kernel::utilities::StaticRef;

register_structs! {
    pub UartRegisters {
        /// Line control
        (0x00 => pub ulcon: ReadWrite<u32, ULCON::Register>),
        /// Control
        (0x04 => pub ucon: ReadWrite<u32, UCON::Register>),
        /// FIFO control
        (0x08 => pub ufcon: ReadWrite<u32, UFCON::Register>),
        /// Modem control
        (0x0c => pub umcon: ReadWrite<u32, UMCON::Register>),
        /// TX/RX status, write 1 to clear the RX timeout flag
        (0x10 => pub utrstat: ReadWrite<u32, UTRSTAT::Register>),
        /// RX error status, cleared on read
        (0x14 => pub uerstat: ReadOnly<u32, UERSTAT::Register>),
        /// FIFO status. The field layout depends on the FIFO depth of the
        /// variant, see `UartInfo`.
        (0x18 => pub ufstat: ReadOnly<u32>),
        /// Modem status
        (0x1c => pub umstat: ReadOnly<u32>),
        /// Transmit holding (one byte)
        (0x20 => pub utxh: WriteOnly<u8>),
        (0x21 => _reserved0),
        /// Receive holding (one byte)
        (0x24 => pub urxh: ReadOnly<u8>),
        (0x25 => _reserved1),
        /// Baud rate divisor
        (0x28 => pub ubrdiv: ReadWrite<u32>),
        /// Baud rate divisor fractional slot
        (0x2c => pub ufracval: ReadWrite<u32>),
        /// Interrupt pending, write 1 to clear
        (0x30 => pub uintp: ReadWrite<u32, UINT::Register>),
        /// Interrupt source pending
        (0x34 => pub uintsp: ReadWrite<u32, UINT::Register>),
        /// Interrupt mask, 1 masks the source
        (0x38 => pub uintm: ReadWrite<u32, UINT::Register>),
        (0x3c => @END),
    }
}

register_bitfields![u32,
    pub ULCON [
        WORD_LEN OFFSET(0) NUMBITS(2) [
            Five = 0,
            Six = 1,
            Seven = 2,
            Eight = 3
        ],
        STOP_BITS OFFSET(2) NUMBITS(1) [
            One = 0,
            Two = 1
        ],
        PARITY OFFSET(3) NUMBITS(3) [
            None = 0,
            Odd = 4,
            Even = 5
        ],
        INFRARED OFFSET(6) NUMBITS(1) []
    ],
    pub UCON [
        /// 01 = interrupt or polling, 10 = DMA
        RX_MODE OFFSET(0) NUMBITS(2) [
            Disabled = 0,
            Interrupt = 1,
            Dma = 2
        ],
        TX_MODE OFFSET(2) NUMBITS(2) [
            Disabled = 0,
            Interrupt = 1,
            Dma = 2
        ],
        SEND_BREAK OFFSET(4) NUMBITS(1) [],
        LOOPBACK OFFSET(5) NUMBITS(1) [],
        RX_ERR_IRQ OFFSET(6) NUMBITS(1) [],
        RX_TIMEOUT OFFSET(7) NUMBITS(1) [],
        RX_INT_LEVEL OFFSET(8) NUMBITS(1) [],
        TX_INT_LEVEL OFFSET(9) NUMBITS(1) [],
        CLK_SEL OFFSET(10) NUMBITS(2) [],
        RX_TIMEOUT_INTERVAL OFFSET(12) NUMBITS(4) []
    ],
    pub UFCON [
        FIFO_EN OFFSET(0) NUMBITS(1) [],
        RX_FIFO_RESET OFFSET(1) NUMBITS(1) [],
        TX_FIFO_RESET OFFSET(2) NUMBITS(1) [],
        RX_TRIG OFFSET(4) NUMBITS(3) [],
        TX_TRIG OFFSET(8) NUMBITS(3) []
    ],
    pub UMCON [
        RTS OFFSET(0) NUMBITS(1) [],
        AUTO_FLOW OFFSET(4) NUMBITS(1) [],
        RTS_TRIG OFFSET(5) NUMBITS(3) []
    ],
    pub UTRSTAT [
        RX_READY OFFSET(0) NUMBITS(1) [],
        TX_BUF_EMPTY OFFSET(1) NUMBITS(1) [],
        TX_EMPTY OFFSET(2) NUMBITS(1) [],
        RX_TIMEOUT OFFSET(3) NUMBITS(1) []
    ],
    pub UERSTAT [
        OVERRUN OFFSET(0) NUMBITS(1) [],
        PARITY OFFSET(1) NUMBITS(1) [],
        FRAME OFFSET(2) NUMBITS(1) [],
        BREAK OFFSET(3) NUMBITS(1) []
    ],
    pub UINT [
        RXD OFFSET(0) NUMBITS(1) [],
        ERROR OFFSET(1) NUMBITS(1) [],
        TXD OFFSET(2) NUMBITS(1) [],
        MODEM OFFSET(3) NUMBITS(1) []
    ]
];

/// Access to one port's registers.
///
/// Plain reads and writes go straight to the register. Single bit updates on
/// control and mask registers are read-modify-write sequences that an
/// interrupt top half may race with, so they run under the platform's
/// `Atomic` capability.
pub struct RegisterAccess<'a, M: Atomic> {
    registers: StaticRef<UartRegisters>,
    atomic: &'a M,
}

impl<'a, M: Atomic> RegisterAccess<'a, M> {
    pub const fn new(registers: StaticRef<UartRegisters>, atomic: &'a M) -> Self {
        RegisterAccess { registers, atomic }
    }

    /// The typed register block, for field-level access.
    pub fn regs(&self) -> &UartRegisters {
        &self.registers
    }

    pub fn read<T>(&self, reg: &T) -> u32
    where
        T: Readable<T = u32>,
    {
        reg.get()
    }

    pub fn write<T>(&self, reg: &T, value: u32)
    where
        T: Writeable<T = u32>,
    {
        reg.set(value);
    }

    pub fn set_bit<R: RegisterLongName>(&self, reg: &ReadWrite<u32, R>, index: usize) {
        self.atomic.atomic(|| {
            let val = reg.get();
            reg.set(val | (1 << index));
        });
    }

    pub fn clear_bit<R: RegisterLongName>(&self, reg: &ReadWrite<u32, R>, index: usize) {
        self.atomic.atomic(|| {
            let val = reg.get();
            reg.set(val & !(1 << index));
        });
    }

    /// Update the fields named in `field`, leaving the rest of `reg` alone.
    pub fn modify<R: RegisterLongName>(
        &self,
        reg: &ReadWrite<u32, R>,
        field: FieldValue<u32, R>,
    ) {
        self.atomic.atomic(|| reg.modify(field));
    }

    pub fn write_byte(&self, byte: u8) {
        self.registers.utxh.set(byte);
    }

    pub fn read_byte(&self) -> u8 {
        self.registers.urxh.get()
    }

    /// Address of UTXH, the device end of a TX DMA channel.
    pub fn tx_data_addr(&self) -> usize {
        &self.registers.utxh as *const WriteOnly<u8> as usize
    }

    /// Address of URXH, the device end of an RX DMA channel.
    pub fn rx_data_addr(&self) -> usize {
        &self.registers.urxh as *const ReadOnly<u8> as usize
    }
}
