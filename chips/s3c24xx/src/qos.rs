// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Debounced clock floor requests.
//!
//! The first transfer after a quiet period raises the CPU and interconnect
//! floors. Every transfer re-arms a one-shot alarm `qos_timeout_ms` into the
//! future; when the alarm finally fires the floors are relaxed. Shutting the
//! port down relaxes at once.
//!
//! ```text
//!            activity                    alarm / force_relax
//!   Idle  ------------->  Raised  ----------------------------->  Idle
//!                          |  ^
//!                          +--+ activity (re-arm alarm)
//! ```

use core::cell::Cell;

use kernel::hil::pm_qos::{PmQos, QosClass};
use kernel::hil::time::{Alarm, AlarmClient, ConvertTicks};
use kernel::utilities::cells::{NumericCellExt, OptionalCell};
use log::{debug, warn};

use crate::config::QosConfig;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QosState {
    Idle,
    Raised,
}

pub struct QosGovernor<'a, A: Alarm<'a>> {
    alarm: &'a A,
    pm_qos: OptionalCell<&'a dyn PmQos>,
    config: QosConfig,
    state: Cell<QosState>,
    raises: Cell<usize>,
    relaxes: Cell<usize>,
}

impl<'a, A: Alarm<'a>> QosGovernor<'a, A> {
    pub fn new(alarm: &'a A, config: QosConfig) -> QosGovernor<'a, A> {
        QosGovernor {
            alarm,
            pm_qos: OptionalCell::empty(),
            config,
            state: Cell::new(QosState::Idle),
            raises: Cell::new(0),
            relaxes: Cell::new(0),
        }
    }

    /// Point the alarm's callback at this governor.
    pub fn register(&'a self) {
        self.alarm.set_alarm_client(self);
    }

    pub fn set_pm_qos(&self, pm_qos: &'a dyn PmQos) {
        self.pm_qos.set(pm_qos);
    }

    pub fn state(&self) -> QosState {
        self.state.get()
    }

    /// Number of Idle -> Raised transitions so far.
    pub fn raises(&self) -> usize {
        self.raises.get()
    }

    /// Number of Raised -> Idle transitions so far.
    pub fn relaxes(&self) -> usize {
        self.relaxes.get()
    }

    /// Record traffic on the port.
    pub fn activity(&self) {
        if self.state.get() == QosState::Idle {
            self.raise();
        }
        // Re-arming replaces any pending expiry.
        self.alarm.set_alarm(
            self.alarm.now(),
            self.alarm.ticks_from_ms(self.config.qos_timeout_ms),
        );
    }

    /// Relax immediately, regardless of the alarm.
    pub fn force_relax(&self) {
        if self.alarm.disarm().is_err() {
            debug!("QoS alarm already firing, relax handled here");
        }
        if self.state.get() == QosState::Raised {
            self.relax();
        }
    }

    fn raise(&self) {
        self.state.set(QosState::Raised);
        self.raises.increment();
        self.pm_qos.map(|pm| {
            for (class, value) in self.targets() {
                if value != 0 {
                    if let Err(e) = pm.raise_request(class, value) {
                        warn!("QoS raise {:?} to {} failed: {:?}", class, value, e);
                    }
                }
            }
        });
    }

    fn relax(&self) {
        self.state.set(QosState::Idle);
        self.relaxes.increment();
        self.pm_qos.map(|pm| {
            for (class, value) in self.targets() {
                if value != 0 {
                    if let Err(e) = pm.relax_request(class) {
                        warn!("QoS relax {:?} failed: {:?}", class, e);
                    }
                }
            }
        });
    }

    fn targets(&self) -> [(QosClass, u32); 2] {
        [
            (QosClass::CpuFrequency, self.config.cpu_qos_val),
            (QosClass::InterconnectFrequency, self.config.mif_qos_val),
        ]
    }
}

impl<'a, A: Alarm<'a>> AlarmClient for QosGovernor<'a, A> {
    fn alarm(&self) {
        // A forced relax may have beaten an expiry that was already queued.
        if self.state.get() == QosState::Raised {
            self.relax();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockAlarm, QosEvent, QosRecorder};

    fn config(timeout: u32) -> QosConfig {
        QosConfig {
            cpu_qos_val: 1_200_000,
            mif_qos_val: 800_000,
            qos_timeout_ms: timeout,
        }
    }

    fn governor(
        timeout: u32,
    ) -> (
        &'static MockAlarm<'static>,
        &'static QosRecorder,
        &'static QosGovernor<'static, MockAlarm<'static>>,
    ) {
        let alarm = Box::leak(Box::new(MockAlarm::new()));
        let recorder = Box::leak(Box::new(QosRecorder::new()));
        let qos = Box::leak(Box::new(QosGovernor::new(alarm, config(timeout))));
        qos.register();
        qos.set_pm_qos(recorder);
        (alarm, recorder, qos)
    }

    #[test]
    fn activity_debounces_relax() {
        let (alarm, recorder, qos) = governor(10);

        alarm.set_now(0);
        qos.activity();
        assert_eq!(qos.state(), QosState::Raised);
        assert_eq!(alarm.expiry(), Some(10));

        alarm.set_now(5);
        qos.activity();
        assert_eq!(alarm.expiry(), Some(15));
        assert_eq!(qos.raises(), 1);

        // Nothing happens at the first deadline.
        alarm.set_now(10);
        assert!(!alarm.fire_if_due());
        assert_eq!(qos.state(), QosState::Raised);

        alarm.set_now(15);
        assert!(alarm.fire_if_due());
        assert_eq!(qos.state(), QosState::Idle);
        assert_eq!(qos.relaxes(), 1);

        assert_eq!(
            recorder.events(),
            vec![
                QosEvent::Raise(QosClass::CpuFrequency, 1_200_000),
                QosEvent::Raise(QosClass::InterconnectFrequency, 800_000),
                QosEvent::Relax(QosClass::CpuFrequency),
                QosEvent::Relax(QosClass::InterconnectFrequency),
            ]
        );
    }

    #[test]
    fn force_relax_once() {
        let (alarm, recorder, qos) = governor(10);

        qos.activity();
        qos.force_relax();
        assert_eq!(qos.state(), QosState::Idle);
        assert!(!alarm.is_armed());

        // An expiry that was already in flight does not relax again.
        qos.alarm();
        qos.force_relax();
        assert_eq!(qos.raises(), 1);
        assert_eq!(qos.relaxes(), 1);
        assert_eq!(recorder.relaxes(), 2);
    }

    #[test]
    fn every_raise_has_one_relax() {
        let (alarm, _recorder, qos) = governor(3);

        for round in 0..5u32 {
            let start = round * 100;
            for t in 0..4 {
                alarm.set_now(start + t);
                qos.activity();
            }
            if round % 2 == 0 {
                alarm.set_now(start + 3 + 3);
                assert!(alarm.fire_if_due());
            } else {
                qos.force_relax();
            }
            assert_eq!(qos.raises(), qos.relaxes());
        }
        assert_eq!(qos.raises(), 5);
    }

    #[test]
    fn zero_target_is_not_requested() {
        let alarm = Box::leak(Box::new(MockAlarm::new()));
        let recorder = Box::leak(Box::new(QosRecorder::new()));
        let qos = Box::leak(Box::new(QosGovernor::new(
            alarm,
            QosConfig {
                cpu_qos_val: 0,
                mif_qos_val: 400_000,
                qos_timeout_ms: 1,
            },
        )));
        qos.set_pm_qos(recorder);

        qos.activity();
        qos.force_relax();
        assert_eq!(
            recorder.events(),
            vec![
                QosEvent::Raise(QosClass::InterconnectFrequency, 400_000),
                QosEvent::Relax(QosClass::InterconnectFrequency),
            ]
        );
    }

    #[test]
    fn pm_failure_does_not_stop_state_machine() {
        let (alarm, recorder, qos) = governor(10);
        recorder.fail_requests(true);

        qos.activity();
        assert_eq!(qos.state(), QosState::Raised);
        alarm.set_now(alarm.expiry().unwrap_or(0));
        assert!(alarm.fire_if_due());
        assert_eq!(qos.state(), QosState::Idle);
        assert_eq!(qos.relaxes(), 1);
    }
}
