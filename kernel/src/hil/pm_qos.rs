// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Interface to the power management quality-of-service requests.
//!
//! A driver raises a floor on a shared clock while it is busy and relaxes it
//! when it goes quiet. Each implementor tracks at most one outstanding
//! request per class for each user; raising again replaces the value.

use crate::ErrorCode;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QosClass {
    /// Minimum CPU frequency, in kHz.
    CpuFrequency,
    /// Minimum memory interconnect frequency, in kHz.
    InterconnectFrequency,
}

pub trait PmQos {
    /// Request that the clock of `class` does not drop below `value`.
    fn raise_request(&self, class: QosClass, value: u32) -> Result<(), ErrorCode>;

    /// Withdraw the request for `class`, returning it to "no constraint".
    fn relax_request(&self, class: QosClass) -> Result<(), ErrorCode>;
}
