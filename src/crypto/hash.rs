// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Cryptographic hashing.
//!
//! [`EngineExt`] adds helpers to [`Engine`] that would otherwise make it
//! object-unsafe.

/// A cryptographic hashing algorithm.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Algo {
    /// 256-bit SHA-2.
    Sha256,
    /// 384-bit SHA-2.
    Sha384,
    /// 512-bit SHA-2.
    Sha512,
}

impl Algo {
    /// The number of bits in a digest of this strength.
    #[inline]
    pub const fn bits(self) -> usize {
        match self {
            Self::Sha256 => 256,
            Self::Sha384 => 384,
            Self::Sha512 => 512,
        }
    }

    /// The number of bytes in a digest of this strength.
    #[inline]
    pub const fn bytes(self) -> usize {
        self.bits() / 8
    }
}

/// An error returned by a hashing function.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates that the wrong size of digest was provided to
    /// [`Engine::finish_raw()`].
    WrongSize,

    /// Indicates that the engine was idle, but a write or finish
    /// operation was requested.
    Idle,

    /// Indicates that the engine does not implement the requested
    /// algorithm.
    Unsupported,

    /// Indicates that a digest did not match the expected value.
    Mismatch,
}

/// A hashing engine, which maintains the state for one digest.
///
/// A digest is computed by one call to `start_raw()`, any number of calls to
/// `write_raw()`, and then one call to either `finish_raw()` or
/// `compare_raw()`.
pub trait Engine {
    /// Returns whether this engine supports the given algorithm.
    fn supports(&mut self, algo: Algo) -> bool;

    /// Begins a new hashing operation, discarding any previous state.
    fn start_raw(&mut self, algo: Algo) -> Result<(), Error>;

    /// Adds `data` to the hashing state.
    fn write_raw(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Completes the hashing operation.
    ///
    /// Calling this function multiple times will have an unspecified effect.
    fn finish_raw(&mut self, out: &mut [u8]) -> Result<(), Error>;

    /// Completes the hashing operation, and then compares it to `expected`
    /// in constant time.
    ///
    /// Returns `Ok(())` if the digests matched.
    fn compare_raw(&mut self, expected: &[u8]) -> Result<(), Error>;
}

/// Convenience helpers for [`Engine`].
#[extend::ext(name = EngineExt)]
pub impl<E: Engine + ?Sized> E {
    /// Hashes the contiguous memory region `buf` into `out`.
    #[inline]
    fn contiguous_hash(
        &mut self,
        algo: Algo,
        buf: &[u8],
        out: &mut [u8],
    ) -> Result<(), Error> {
        self.start_raw(algo)?;
        self.write_raw(buf)?;
        self.finish_raw(out)
    }
}

// Ensure Engine is object-safe.
impl dyn Engine {}

impl<E: Engine + ?Sized> Engine for &mut E {
    fn supports(&mut self, algo: Algo) -> bool {
        E::supports(self, algo)
    }

    fn start_raw(&mut self, algo: Algo) -> Result<(), Error> {
        E::start_raw(self, algo)
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), Error> {
        E::write_raw(self, data)
    }

    fn finish_raw(&mut self, out: &mut [u8]) -> Result<(), Error> {
        E::finish_raw(self, out)
    }

    fn compare_raw(&mut self, expected: &[u8]) -> Result<(), Error> {
        E::compare_raw(self, expected)
    }
}
