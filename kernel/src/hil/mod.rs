// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Public traits for interfaces between serial drivers, the hardware they sit
//! on, and the layers above them.

pub mod dma;
pub mod pm_qos;
pub mod time;
pub mod uart;
