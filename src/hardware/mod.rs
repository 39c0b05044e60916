// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Pluggable hardware functionality
//!
//! This module provides traits for plugging in OS calls to specialized
//! hardware functions, such as non-volatile memory, the secure-domain update
//! registers, and the reset controller. `suitcase` never touches hardware
//! except through these traits.

pub mod flash;
pub mod sdfw;

/// Provides access to the device reset controller.
pub trait Reset {
    /// Requests a cold reboot of the whole device.
    ///
    /// On real hardware this function does not return. An implementation
    /// that does return is reporting that the reboot could not be performed;
    /// callers must treat that as an unrecoverable condition.
    fn request_cold_reboot(&mut self);
}
impl dyn Reset {} // Ensure object-safe.
