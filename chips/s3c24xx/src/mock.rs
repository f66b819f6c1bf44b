// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Host-side stand-ins for the hardware a port talks to.

use core::cell::{Cell, RefCell};

use kernel::hil::dma::{ChannelId, Cookie, DmaAddress, DmaChannel, DmaClient, SlaveConfig};
use kernel::hil::pm_qos::{PmQos, QosClass};
use kernel::hil::time::{self, Alarm, AlarmClient, Ticks, Ticks32, Time};
use kernel::hil::uart;
use kernel::utilities::cells::{OptionalCell, TakeCell};
use kernel::utilities::StaticRef;
use kernel::ErrorCode;

use crate::regs::UartRegisters;

const UTRSTAT: usize = 0x10;
const UERSTAT: usize = 0x14;
const UFSTAT: usize = 0x18;
const UTXH: usize = 0x20;
const URXH: usize = 0x24;
const UINTP: usize = 0x30;

/// A zeroed register block in leaked host memory.
pub fn registers() -> StaticRef<UartRegisters> {
    let block: &'static mut [u32; 15] = Box::leak(Box::new([0u32; 15]));
    unsafe { StaticRef::new(block.as_mut_ptr() as *const UartRegisters) }
}

fn poke32(regs: StaticRef<UartRegisters>, offset: usize, value: u32) {
    unsafe { ((regs.addr() + offset) as *mut u32).write_volatile(value) }
}

fn poke8(regs: StaticRef<UartRegisters>, offset: usize, value: u8) {
    unsafe { ((regs.addr() + offset) as *mut u8).write_volatile(value) }
}

fn peek8(regs: StaticRef<UartRegisters>, offset: usize) -> u8 {
    unsafe { ((regs.addr() + offset) as *const u8).read_volatile() }
}

pub fn load_rx_byte(regs: StaticRef<UartRegisters>, byte: u8) {
    poke8(regs, URXH, byte);
}

pub fn last_tx_byte(regs: StaticRef<UartRegisters>) -> u8 {
    peek8(regs, UTXH)
}

pub fn set_ufstat(regs: StaticRef<UartRegisters>, value: u32) {
    poke32(regs, UFSTAT, value);
}

pub fn set_uerstat(regs: StaticRef<UartRegisters>, value: u32) {
    poke32(regs, UERSTAT, value);
}

pub fn set_utrstat(regs: StaticRef<UartRegisters>, value: u32) {
    poke32(regs, UTRSTAT, value);
}

/// Latch `bits` in UINTP, as the block does when a source fires.
pub fn raise(regs: StaticRef<UartRegisters>, bits: u32) {
    poke32(regs, UINTP, bits);
}

pub struct MockDmaChannel<'a> {
    id: u32,
    client: OptionalCell<&'a dyn DmaClient>,
    config: OptionalCell<SlaveConfig>,
    next_cookie: Cell<u32>,
    outstanding: OptionalCell<Cookie>,
    submissions: Cell<usize>,
    maps: Cell<usize>,
    last_len: OptionalCell<usize>,
    residue: Cell<usize>,
    terminated: Cell<bool>,
    fail_submit: Cell<bool>,
}

impl<'a> MockDmaChannel<'a> {
    pub fn new(id: u32) -> MockDmaChannel<'a> {
        MockDmaChannel {
            id,
            client: OptionalCell::empty(),
            config: OptionalCell::empty(),
            next_cookie: Cell::new(1),
            outstanding: OptionalCell::empty(),
            submissions: Cell::new(0),
            maps: Cell::new(0),
            last_len: OptionalCell::empty(),
            residue: Cell::new(0),
            terminated: Cell::new(false),
            fail_submit: Cell::new(false),
        }
    }

    pub fn submissions(&self) -> usize {
        self.submissions.get()
    }

    pub fn maps(&self) -> usize {
        self.maps.get()
    }

    pub fn last_len(&self) -> Option<usize> {
        self.last_len.get()
    }

    pub fn set_residue(&self, residue: usize) {
        self.residue.set(residue);
    }

    /// Make every submission fail, as a channel whose controller has
    /// gone away would.
    pub fn fail_submits(&self, fail: bool) {
        self.fail_submit.set(fail);
    }

    pub fn terminated(&self) -> bool {
        self.terminated.get()
    }

    pub fn configured(&self) -> Option<SlaveConfig> {
        self.config.get()
    }

    /// The cookie of the last submission, whether or not it was terminated.
    pub fn outstanding(&self) -> Option<Cookie> {
        self.outstanding.get()
    }

    /// Report the last submission as finished, even after `terminate`.
    pub fn complete(&self, result: Result<(), ErrorCode>) {
        if let Some(cookie) = self.outstanding.take() {
            self.complete_cookie(cookie, result);
        }
    }

    /// Report an arbitrary cookie as finished.
    pub fn complete_cookie(&self, cookie: Cookie, result: Result<(), ErrorCode>) {
        self.client
            .map(|client| client.transfer_done(ChannelId(self.id), cookie, result));
    }
}

impl<'a> DmaChannel<'a> for MockDmaChannel<'a> {
    fn set_client(&self, client: &'a dyn DmaClient) {
        self.client.set(client);
    }

    fn id(&self) -> ChannelId {
        ChannelId(self.id)
    }

    fn configure(&self, config: &SlaveConfig) -> Result<(), ErrorCode> {
        self.config.set(*config);
        Ok(())
    }

    fn map(&self, buffer: &[u8]) -> DmaAddress {
        self.maps.set(self.maps.get() + 1);
        DmaAddress(buffer.as_ptr() as usize)
    }

    fn submit(&self, _addr: DmaAddress, len: usize) -> Result<Cookie, ErrorCode> {
        if self.config.is_none() {
            return Err(ErrorCode::INVAL);
        }
        if self.fail_submit.get() {
            return Err(ErrorCode::FAIL);
        }
        let cookie = Cookie(self.next_cookie.get());
        self.next_cookie.set(cookie.0 + 1);
        self.outstanding.set(cookie);
        self.submissions.set(self.submissions.get() + 1);
        self.last_len.set(len);
        self.terminated.set(false);
        Ok(cookie)
    }

    fn terminate(&self) -> Result<(), ErrorCode> {
        self.terminated.set(true);
        Ok(())
    }

    fn residue(&self, _cookie: Cookie) -> usize {
        self.residue.get()
    }
}

/// One-shot alarm on a 1 kHz clock that only moves when told to.
pub struct MockAlarm<'a> {
    now: Cell<u32>,
    expiry: OptionalCell<u32>,
    client: OptionalCell<&'a dyn AlarmClient>,
}

impl<'a> MockAlarm<'a> {
    pub fn new() -> MockAlarm<'a> {
        MockAlarm {
            now: Cell::new(0),
            expiry: OptionalCell::empty(),
            client: OptionalCell::empty(),
        }
    }

    pub fn set_now(&self, now: u32) {
        self.now.set(now);
    }

    pub fn expiry(&self) -> Option<u32> {
        self.expiry.get()
    }

    /// Fire the alarm if it is armed and due. Returns whether it fired.
    pub fn fire_if_due(&self) -> bool {
        match self.expiry.get() {
            Some(at) if at <= self.now.get() => {
                self.expiry.clear();
                self.client.map(|client| client.alarm());
                true
            }
            _ => false,
        }
    }
}

impl Time for MockAlarm<'_> {
    type Frequency = time::Freq1KHz;
    type Ticks = Ticks32;

    fn now(&self) -> Ticks32 {
        Ticks32::from(self.now.get())
    }
}

impl<'a> Alarm<'a> for MockAlarm<'a> {
    fn set_alarm_client(&self, client: &'a dyn AlarmClient) {
        self.client.set(client);
    }

    fn set_alarm(&self, reference: Ticks32, dt: Ticks32) {
        self.expiry.set(reference.wrapping_add(dt).into_u32());
    }

    fn get_alarm(&self) -> Ticks32 {
        Ticks32::from(self.expiry.unwrap_or(0))
    }

    fn disarm(&self) -> Result<(), ErrorCode> {
        self.expiry.clear();
        Ok(())
    }

    fn is_armed(&self) -> bool {
        self.expiry.is_some()
    }

    fn minimum_dt(&self) -> Ticks32 {
        Ticks32::from(1)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QosEvent {
    Raise(QosClass, u32),
    Relax(QosClass),
}

pub struct QosRecorder {
    events: RefCell<Vec<QosEvent>>,
    fail: Cell<bool>,
}

impl QosRecorder {
    pub fn new() -> QosRecorder {
        QosRecorder {
            events: RefCell::new(Vec::new()),
            fail: Cell::new(false),
        }
    }

    pub fn events(&self) -> Vec<QosEvent> {
        self.events.borrow().clone()
    }

    pub fn relaxes(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, QosEvent::Relax(_)))
            .count()
    }

    /// Make every request fail after being recorded.
    pub fn fail_requests(&self, fail: bool) {
        self.fail.set(fail);
    }

    fn result(&self) -> Result<(), ErrorCode> {
        if self.fail.get() {
            Err(ErrorCode::FAIL)
        } else {
            Ok(())
        }
    }
}

impl PmQos for QosRecorder {
    fn raise_request(&self, class: QosClass, value: u32) -> Result<(), ErrorCode> {
        self.events.borrow_mut().push(QosEvent::Raise(class, value));
        self.result()
    }

    fn relax_request(&self, class: QosClass) -> Result<(), ErrorCode> {
        self.events.borrow_mut().push(QosEvent::Relax(class));
        self.result()
    }
}

/// Records `transmitted_buffer` calls and keeps the returned buffer.
pub struct TxRecorder {
    calls: RefCell<Vec<(usize, Result<(), ErrorCode>)>>,
    buffer: TakeCell<'static, [u8]>,
}

impl TxRecorder {
    pub fn new() -> TxRecorder {
        TxRecorder {
            calls: RefCell::new(Vec::new()),
            buffer: TakeCell::empty(),
        }
    }

    pub fn calls(&self) -> Vec<(usize, Result<(), ErrorCode>)> {
        self.calls.borrow().clone()
    }

    pub fn take_buffer(&self) -> Option<&'static mut [u8]> {
        self.buffer.take()
    }
}

impl uart::TransmitClient for TxRecorder {
    fn transmitted_buffer(
        &self,
        tx_buffer: &'static mut [u8],
        tx_len: usize,
        rval: Result<(), ErrorCode>,
    ) {
        self.calls.borrow_mut().push((tx_len, rval));
        self.buffer.replace(tx_buffer);
    }
}

/// Records `received_data` calls with a copy of the data.
pub struct RxRecorder {
    calls: RefCell<Vec<(Vec<u8>, Result<(), ErrorCode>, uart::Error)>>,
}

impl RxRecorder {
    pub fn new() -> RxRecorder {
        RxRecorder {
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(Vec<u8>, Result<(), ErrorCode>, uart::Error)> {
        self.calls.borrow().clone()
    }
}

impl uart::ReceiveClient for RxRecorder {
    fn received_data(&self, data: &[u8], rval: Result<(), ErrorCode>, error: uart::Error) {
        self.calls.borrow_mut().push((data.to_vec(), rval, error));
    }
}
