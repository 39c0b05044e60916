// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Digest sinks.

use crate::crypto::hash;
use crate::sink::Error;
use crate::sink::Sink;

impl From<hash::Error> for Error {
    fn from(e: hash::Error) -> Self {
        match e {
            hash::Error::Mismatch => Error::Authentication,
            hash::Error::Unsupported => Error::Unsupported,
            hash::Error::WrongSize => Error::InvalidArgument,
            hash::Error::Idle => Error::IncorrectState,
        }
    }
}

/// A sink that digests everything written to it, and checks the result
/// against an expected digest when flushed.
///
/// Flushing ends the hashing operation; further writes fail with
/// [`Error::IncorrectState`].
pub struct DigestSink<'a, E: ?Sized> {
    engine: &'a mut E,
    expected: &'a [u8],
    len: usize,
    done: bool,
}

impl<'a, E: hash::Engine + ?Sized> DigestSink<'a, E> {
    /// Creates a new sink that digests with `algo`, expecting `expected`.
    pub fn new(
        engine: &'a mut E,
        algo: hash::Algo,
        expected: &'a [u8],
    ) -> Result<Self, Error> {
        check!(engine.supports(algo), Error::Unsupported);
        check!(expected.len() == algo.bytes(), Error::InvalidArgument);
        engine.start_raw(algo)?;
        Ok(Self {
            engine,
            expected,
            len: 0,
            done: false,
        })
    }
}

impl<E: hash::Engine + ?Sized> Sink for DigestSink<'_, E> {
    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        check!(!self.done, Error::IncorrectState);
        self.engine.write_raw(buf)?;
        self.len += buf.len();
        Ok(())
    }

    /// Completes the digest and compares it to the expected value.
    fn flush(&mut self) -> Result<(), Error> {
        check!(!self.done, Error::IncorrectState);
        self.done = true;
        self.engine.compare_raw(self.expected).map_err(|e| {
            fail!(Error::from(e), "digest mismatch after {} bytes", self.len)
        })
    }

    fn used_storage(&self) -> usize {
        self.len
    }
}
