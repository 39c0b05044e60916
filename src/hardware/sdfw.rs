// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Secure-domain firmware update registers.
//!
//! The secure domain exposes a small block of non-volatile registers through
//! which the application domain requests an update of the secure-domain
//! firmware (SDFW). The request is consumed by the secure domain across a
//! cold reboot, after which the status register reports the outcome.

use zerocopy::AsBytes;
use zerocopy::FromBytes;

use crate::hardware::flash;

/// The length of the installed-firmware digest, which is a SHA-512 digest.
pub const DIGEST_LEN: usize = 64;

wire_enum! {
    /// A value of the update status register.
    ///
    /// Values not listed here are hardware error codes left behind by a
    /// previous update attempt.
    pub enum Status: u32 {
        /// No update is in progress.
        None = 0x0000_0000,
        /// A scheduled update was consumed by the secure domain.
        UrotActivated = 0x0000_0001,
        /// The secure domain verified an update without installing it.
        VerifyOk = 0x0000_0002,
        /// The secure domain booted its recovery image.
        RecoveryActivated = 0x0000_0003,
        /// The application-domain root of trust booted into recovery.
        ArotRecovery = 0x0000_0004,
    }
}

/// An update request, as laid out in the update-request registers.
///
/// Every address is an absolute, global address.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, AsBytes, FromBytes)]
#[repr(C)]
pub struct UpdateRequest {
    /// The address of the update manifest.
    pub manifest: u32,
    /// The address of the public key that signed the manifest.
    pub public_key: u32,
    /// The address of the manifest signature.
    pub signature: u32,
    /// The address of the firmware image.
    pub firmware: u32,
    /// The maximum size of the firmware image.
    pub max_size: u32,
}

impl UpdateRequest {
    /// Returns whether every field of this request has been cleared.
    pub fn is_clear(&self) -> bool {
        self.as_bytes().iter().all(|&b| b == 0)
    }
}

/// Access to the SDFW update registers.
pub trait Registers {
    /// Reads the raw update status register.
    fn status(&self) -> u32;

    /// Reads back the update-request registers.
    fn request(&self) -> UpdateRequest;

    /// Reads the digest of the currently installed secure-domain firmware.
    fn installed_digest(&self) -> [u8; DIGEST_LEN];

    /// Writes `request` into the update-request registers, for consumption
    /// by the secure domain on the next cold reboot.
    fn schedule(&mut self, request: &UpdateRequest) -> Result<(), flash::Error>;

    /// Erases the status and update-request registers.
    fn erase(&mut self) -> Result<(), flash::Error>;
}
impl dyn Registers {} // Ensure object-safe.

impl<R: Registers + ?Sized> Registers for &mut R {
    fn status(&self) -> u32 {
        R::status(self)
    }

    fn request(&self) -> UpdateRequest {
        R::request(self)
    }

    fn installed_digest(&self) -> [u8; DIGEST_LEN] {
        R::installed_digest(self)
    }

    fn schedule(&mut self, request: &UpdateRequest) -> Result<(), flash::Error> {
        R::schedule(self, request)
    }

    fn erase(&mut self) -> Result<(), flash::Error> {
        R::erase(self)
    }
}
