// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Streaming sinks.
//!
//! A [`Sink`] is a destination for a byte stream: firmware images are
//! streamed into one chunk at a time, without ever being held in memory in
//! full. Sinks compose: a filter, such as [`decrypt::Decrypt`] or
//! [`decompress::Decompress`], is itself a sink that transforms what it is
//! given and forwards the result to an inner sink.
//!
//! A typical installation pipeline looks like
//! ```text
//! Decrypt<Decompress<FlashSink<_>>>
//! ```
//! and is driven by repeated calls to [`Sink::write()`] followed by a single
//! [`Sink::flush()`]. If any step fails, filters roll back by erasing
//! their inner sink, so no partial image is left behind.

use crate::hardware::flash;
use crate::mem::Exhausted;

#[cfg(feature = "std")]
pub mod decompress;
pub mod decrypt;
pub mod digest;
pub mod flash_sink;
pub mod ram;
pub mod sdfw;

pub use flash_sink::FlashSink;
pub use ram::RamSink;

/// A sink error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates that a parameter was out of range.
    InvalidArgument,
    /// Indicates that the destination is too small for the stream.
    NoMemory,
    /// Indicates that the operation is not permitted in the sink's current
    /// state, such as a second write to a one-shot sink.
    IncorrectState,
    /// Indicates a digest, tag or key mismatch.
    Authentication,
    /// Indicates that backing storage could not be written or cleared.
    Io,
    /// Indicates that an invariant the caller relies on was violated, such
    /// as an incomplete stream being finalized.
    Crash,
    /// Indicates that no context was available to create the sink.
    NoResources,
    /// Indicates that the sink does not support the operation.
    Unsupported,
    /// Indicates that the operation was accepted, but can only complete
    /// after a cold reboot.
    ///
    /// This is not a failure: it transfers control to the next boot.
    RebootRequired,
    /// Indicates a failure code reported by hardware from an earlier
    /// operation.
    Hardware(u32),
}

impl From<flash::Error> for Error {
    fn from(e: flash::Error) -> Self {
        match e {
            flash::Error::OutOfRange => Error::NoMemory,
            flash::Error::Unaligned => Error::InvalidArgument,
            flash::Error::Locked | flash::Error::Unspecified => Error::Io,
        }
    }
}

impl From<Exhausted> for Error {
    fn from(_: Exhausted) -> Self {
        Error::NoResources
    }
}

/// A destination for a byte stream.
///
/// Only [`Sink::write()`] and [`Sink::used_storage()`] must be provided;
/// the remaining operations default to [`Error::Unsupported`] or to doing
/// nothing, as appropriate.
pub trait Sink {
    /// Writes `buf` at the current position, advancing it.
    fn write(&mut self, buf: &[u8]) -> Result<(), Error>;

    /// Moves the current position to `offset` bytes from the start of the
    /// sink.
    fn seek(&mut self, offset: usize) -> Result<(), Error> {
        let _ = offset;
        Err(Error::Unsupported)
    }

    /// Erases everything written to this sink so far.
    fn erase(&mut self) -> Result<(), Error> {
        Err(Error::Unsupported)
    }

    /// Signals the end of the stream, finalizing anything that was buffered.
    fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Returns the number of bytes this sink has produced.
    fn used_storage(&self) -> usize;

    /// Releases this sink and any resources it holds.
    ///
    /// Dropping a sink releases it as well; this function exists so that
    /// failures while releasing can be observed.
    fn release(self) -> Result<(), Error>
    where
        Self: Sized,
    {
        Ok(())
    }
}
impl dyn Sink {} // Ensure object-safe.

impl<S: Sink + ?Sized> Sink for &mut S {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        S::write(self, buf)
    }

    #[inline]
    fn seek(&mut self, offset: usize) -> Result<(), Error> {
        S::seek(self, offset)
    }

    #[inline]
    fn erase(&mut self) -> Result<(), Error> {
        S::erase(self)
    }

    #[inline]
    fn flush(&mut self) -> Result<(), Error> {
        S::flush(self)
    }

    #[inline]
    fn used_storage(&self) -> usize {
        S::used_storage(self)
    }
}

/// Erases `sink` after a failed stream, logging the rollback.
///
/// Sinks that cannot erase are left as they are.
pub(crate) fn roll_back(sink: &mut impl Sink) -> Result<(), Error> {
    warn!("rolling back partially written sink");
    match sink.erase() {
        Ok(()) | Err(Error::Unsupported) => Ok(()),
        Err(e) => Err(fail!(e, "rollback failed: {:?}", e)),
    }
}
