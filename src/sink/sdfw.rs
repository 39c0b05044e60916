// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! The secure-domain firmware (SDFW) update sink.
//!
//! Updating the secure domain is a handshake across a cold reboot. The sink
//! is given the whole update candidate in a single write, and consults the
//! update status register to find out which side of the reboot it is on:
//!
//! - [`Status::None`]: nothing is in flight. If the candidate's digest
//!   matches the installed firmware there is nothing to do; otherwise an
//!   update request is written to the registers and the write fails with
//!   [`Error::RebootRequired`]. The caller must then call
//!   [`reboot_to_continue()`].
//! - [`Status::UrotActivated`]: the secure domain consumed the request.
//!   The installed digest now has to match the candidate's.
//! - Anything else is an error.
//!
//! On every path except scheduling, the registers are cleared before the
//! write returns. Failing to clear them is reported as [`Error::Io`], even
//! if the update itself went through.

use core::convert::TryInto as _;

use crate::hardware::sdfw::Registers;
use crate::hardware::sdfw::Status;
use crate::hardware::sdfw::UpdateRequest;
use crate::hardware::sdfw::DIGEST_LEN;
use crate::hardware::Reset;
use crate::mem::Pool;
use crate::mem::Slot;
use crate::sink::Error;
use crate::sink::Sink;
use crate::wire::WireEnum as _;

/// The number of SDFW sinks that may exist at once.
pub const POOL_SIZE: usize = 1;

/// A pool of SDFW sink contexts.
pub type ContextPool = Pool<POOL_SIZE>;

/// The layout of an SDFW update candidate.
///
/// Every field except `max_size` is a byte offset from the start of the
/// candidate.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Layout {
    /// The offset of the update manifest.
    pub manifest: u32,
    /// The offset of the public key that signed the manifest.
    pub public_key: u32,
    /// The offset of the manifest signature.
    pub signature: u32,
    /// The offset of the SHA-512 digest of the firmware.
    pub digest: u32,
    /// The offset of the firmware image.
    pub firmware: u32,
    /// The largest firmware image the secure domain accepts.
    pub max_size: u32,
}

impl Layout {
    /// The default candidate layout.
    pub const DEFAULT: Self = Self {
        manifest: 0x0000,
        public_key: 0x0800,
        signature: 0x0820,
        digest: 0x0860,
        firmware: 0x1000,
        max_size: 0x0003_0000,
    };

    fn digest_of<'a>(&self, candidate: &'a [u8]) -> Option<&'a [u8; DIGEST_LEN]> {
        let start = self.digest as usize;
        candidate.get(start..start + DIGEST_LEN)?.try_into().ok()
    }

    fn request_for(&self, base: u32) -> Option<UpdateRequest> {
        Some(UpdateRequest {
            manifest: base.checked_add(self.manifest)?,
            public_key: base.checked_add(self.public_key)?,
            signature: base.checked_add(self.signature)?,
            firmware: base.checked_add(self.firmware)?,
            max_size: self.max_size,
        })
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A one-shot sink that installs secure-domain firmware.
pub struct SdfwSink<'pool, R> {
    regs: R,
    layout: Layout,
    candidate: u32,
    written: bool,
    used: usize,
    _slot: Slot<'pool>,
}

impl<'pool, R: Registers> SdfwSink<'pool, R> {
    /// Creates a new sink for the update candidate at the global address
    /// `candidate`, drawing a context from `pool`.
    pub fn new(
        pool: &'pool ContextPool,
        regs: R,
        layout: Layout,
        candidate: u32,
    ) -> Result<Self, Error> {
        let slot = pool.acquire().map_err(|e| fail!(Error::from(e)))?;
        Ok(Self {
            regs,
            layout,
            candidate,
            written: false,
            used: 0,
            _slot: slot,
        })
    }

    /// Erases the status and request registers, and checks that they read
    /// back as cleared.
    fn clear(&mut self) -> Result<(), Error> {
        self.regs.erase().map_err(|e| fail!(Error::Io, "erase: {:?}", e))?;
        check!(
            self.regs.status() == 0 && self.regs.request().is_clear(),
            Error::Io
        );
        trace!("sdfw registers cleared");
        Ok(())
    }

    fn schedule(&mut self) -> Result<(), Error> {
        let request = self
            .layout
            .request_for(self.candidate)
            .ok_or_else(|| fail!(Error::InvalidArgument))?;
        self.regs
            .schedule(&request)
            .map_err(|e| fail!(Error::Io, "schedule: {:?}", e))?;
        info!("sdfw update scheduled: {:x?}", request);
        Ok(())
    }
}

impl<R: Registers> Sink for SdfwSink<'_, R> {
    /// Processes the update candidate `buf`.
    ///
    /// May only be called once per sink.
    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        check!(!self.written, Error::IncorrectState);
        let digest = self
            .layout
            .digest_of(buf)
            .ok_or_else(|| fail!(Error::InvalidArgument))?;
        self.written = true;

        let raw = self.regs.status();
        let matches = self.regs.installed_digest() == *digest;
        let result = match Status::from_wire_value(raw) {
            Some(Status::None) => {
                info!("sdfw status: None, digest match: {}", matches);
                if matches {
                    self.used = buf.len();
                    return Ok(());
                }
                if let Err(e) = self.schedule() {
                    // A partial request must not reach the secure domain.
                    self.clear()?;
                    return Err(e);
                }
                return Err(Error::RebootRequired);
            }
            Some(Status::UrotActivated) => {
                info!("sdfw status: UrotActivated, digest match: {}", matches);
                if matches {
                    Ok(())
                } else {
                    Err(fail!(Error::Authentication, "sdfw digest mismatch"))
                }
            }
            Some(status) => Err(fail!(
                Error::IncorrectState,
                "unsupported sdfw status: {}",
                status
            )),
            None => Err(fail!(
                Error::Hardware(raw),
                "sdfw reported failure: {:#x}",
                raw
            )),
        };

        let cleared = self.clear();
        result.and(cleared)?;
        self.used = buf.len();
        Ok(())
    }

    fn used_storage(&self) -> usize {
        self.used
    }
}

/// Requests the cold reboot that hands a scheduled update to the secure
/// domain.
///
/// This is the continuation of a write that failed with
/// [`Error::RebootRequired`]. It does not return on real hardware; if the
/// reset controller does return, the result is always [`Error::Crash`].
pub fn reboot_to_continue<R: Reset + ?Sized>(reset: &mut R) -> Error {
    info!("requesting cold reboot to continue sdfw update");
    reset.request_cold_reboot();
    fail!(Error::Crash, "cold reboot request returned")
}
