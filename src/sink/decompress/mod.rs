// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! The decompress filter.
//!
//! [`Decompress`] inflates a raw DEFLATE stream into an inner sink. Input
//! chunks need not line up with anything in the compressed stream, and
//! output is forwarded as soon as it is produced. Whether the stream is
//! complete and of the advertised size is only known when the filter is
//! flushed; if it is not, the inner sink is erased.

use flate2::FlushDecompress;
use flate2::Status;

use crate::sink::roll_back;
use crate::sink::Error;
use crate::sink::Sink;

pub mod bcj;

/// The algorithm id for raw DEFLATE.
pub const DEFLATE: i32 = 1;

/// How much output is inflated at a time.
const CHUNK_LEN: usize = 256;

/// Parameters for decompressing one payload.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct CompressionInfo {
    /// The compression algorithm; only [`DEFLATE`] is supported.
    pub algorithm: i32,
    /// Whether the payload was passed through the ARM Thumb branch
    /// converter before compression.
    pub arm_thumb_filter: bool,
    /// The exact size of the payload once decompressed.
    pub decompressed_size: usize,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum State {
    Streaming,
    // The compressed stream ended; nothing more may be written.
    Ended,
    // Flushed successfully.
    Done,
    Failed,
}

/// A sink that decompresses into an inner sink.
pub struct Decompress<S> {
    inner: S,
    inflater: flate2::Decompress,
    bcj: Option<bcj::Filter>,
    expected: usize,
    produced: usize,
    state: State,
}

impl<S: Sink> Decompress<S> {
    /// Creates a new decompress filter over `inner`.
    pub fn new(inner: S, info: &CompressionInfo) -> Result<Self, Error> {
        check!(info.algorithm == DEFLATE, Error::Unsupported);
        Ok(Self {
            inner,
            inflater: flate2::Decompress::new(false),
            bcj: if info.arm_thumb_filter {
                Some(bcj::Filter::new(bcj::Direction::Decode))
            } else {
                None
            },
            expected: info.decompressed_size,
            produced: 0,
            state: State::Streaming,
        })
    }

    /// Returns the inner sink.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn fail(&mut self, e: Error) -> Error {
        self.state = State::Failed;
        match roll_back(&mut self.inner) {
            Ok(()) => e,
            Err(rollback) => rollback,
        }
    }

    // Forwards freshly inflated bytes, through the branch converter if
    // there is one.
    fn forward(&mut self, out: &[u8]) -> Result<(), Error> {
        if self.produced + out.len() > self.expected {
            return Err(fail!(
                Error::Crash,
                "stream exceeds its size of {} bytes",
                self.expected
            ));
        }
        self.produced += out.len();

        match &mut self.bcj {
            None => self.inner.write(out),
            Some(filter) => {
                let mut work = [0; CHUNK_LEN + bcj::Filter::MAX_CARRY];
                let ready = filter
                    .process(out, &mut work)
                    .ok_or_else(|| fail!(Error::Crash))?;
                self.inner.write(ready)
            }
        }
    }

    fn inflate(&mut self, mut input: &[u8]) -> Result<(), Error> {
        let mut out = [0; CHUNK_LEN];
        loop {
            if self.state == State::Ended {
                check!(input.is_empty(), Error::Crash);
                return Ok(());
            }

            let in_before = self.inflater.total_in();
            let out_before = self.inflater.total_out();
            let status = self
                .inflater
                .decompress(input, &mut out, FlushDecompress::None)
                .map_err(|e| fail!(Error::Crash, "corrupt stream: {}", e))?;
            let consumed = (self.inflater.total_in() - in_before) as usize;
            let len = (self.inflater.total_out() - out_before) as usize;

            input = &input[consumed..];
            if len > 0 {
                self.forward(&out[..len])?;
            }
            if status == Status::StreamEnd {
                self.state = State::Ended;
                continue;
            }

            // A full output buffer may mean more output is pending.
            let stalled = consumed == 0 && len == 0;
            if stalled || (input.is_empty() && len < out.len()) {
                return Ok(());
            }
        }
    }
}

impl<S: Sink> Sink for Decompress<S> {
    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        check!(
            matches!(self.state, State::Streaming | State::Ended),
            Error::IncorrectState
        );
        if let Err(e) = self.inflate(buf) {
            return Err(self.fail(e));
        }
        Ok(())
    }

    /// Checks that the stream was complete and of the expected size, then
    /// flushes the inner sink.
    ///
    /// On failure, the inner sink is erased and `Crash` is returned.
    fn flush(&mut self) -> Result<(), Error> {
        match self.state {
            State::Ended => {}
            State::Streaming => {
                let e = fail!(
                    Error::Crash,
                    "stream incomplete after {} bytes",
                    self.produced
                );
                return Err(self.fail(e));
            }
            // The inner sink was already erased when the stream failed.
            State::Failed => return Err(fail!(Error::Crash)),
            State::Done => return Err(fail!(Error::IncorrectState)),
        }
        if self.produced != self.expected {
            let e = fail!(
                Error::Crash,
                "stream is {} bytes, expected {}",
                self.produced,
                self.expected
            );
            return Err(self.fail(e));
        }

        if let Some(filter) = &mut self.bcj {
            let tail = filter.finish();
            if let Err(e) = self.inner.write(&tail) {
                return Err(self.fail(e));
            }
        }
        if let Err(e) = self.inner.flush() {
            return Err(self.fail(e));
        }
        self.state = State::Done;
        Ok(())
    }

    fn erase(&mut self) -> Result<(), Error> {
        self.state = State::Failed;
        self.inner.erase()
    }

    /// Returns zero until the stream has been flushed successfully.
    fn used_storage(&self) -> usize {
        match self.state {
            State::Done => self.inner.used_storage(),
            _ => 0,
        }
    }

    fn release(self) -> Result<(), Error> {
        self.inner.release()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hardware::flash::Geometry;
    use crate::hardware::flash::RamMut;
    use crate::sink::FlashSink;
    use crate::sink::RamSink;
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use pretty_assertions::assert_eq;
    use std::io::Write as _;
    use testutil::data::firmware;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::best());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn info(len: usize) -> CompressionInfo {
        CompressionInfo {
            algorithm: DEFLATE,
            arm_thumb_filter: false,
            decompressed_size: len,
        }
    }

    const MRAM: Geometry = Geometry {
        write_block: 16,
        erase_block: 16,
        erased_value: 0xff,
    };

    #[test]
    fn chunked_input() {
        let image = firmware::image(5000, 2);
        let compressed = deflate(&image);
        assert!(compressed.len() < image.len());

        for &chunk in &[1, 7, 256, compressed.len()] {
            let mut out = vec![0; 8192];
            let mut sink =
                Decompress::new(RamSink::new(&mut out), &info(image.len()))
                    .unwrap();
            for piece in compressed.chunks(chunk) {
                sink.write(piece).unwrap();
                assert_eq!(sink.used_storage(), 0);
            }
            sink.flush().unwrap();
            assert_eq!(sink.used_storage(), image.len());
            assert_eq!(sink.into_inner().written(), &image[..]);
        }
    }

    #[test]
    fn truncated_stream_is_erased() {
        let image = firmware::image(4000, 4);
        let compressed = deflate(&image);
        assert!(compressed.len() > 500);

        let mut ram = vec![0xff; 4096];
        let flash = RamMut::with_geometry(&mut ram, MRAM);
        let mut sink = Decompress::new(
            FlashSink::new(flash).unwrap(),
            &info(image.len()),
        )
        .unwrap();
        sink.write(&compressed[..500]).unwrap();
        assert_eq!(sink.used_storage(), 0);
        assert_eq!(sink.flush(), Err(Error::Crash));
        assert_eq!(sink.used_storage(), 0);
        drop(sink);
        assert!(ram.iter().all(|&b| b == MRAM.erased_value));
    }

    #[test]
    fn corrupt_stream() {
        let mut out = vec![0; 64];
        let mut sink =
            Decompress::new(RamSink::new(&mut out), &info(64)).unwrap();
        // BTYPE = 3 is reserved.
        assert_eq!(sink.write(&[0xff, 0xff, 0xff]), Err(Error::Crash));
        assert_eq!(sink.write(&[0]), Err(Error::IncorrectState));
        assert_eq!(sink.flush(), Err(Error::Crash));
        assert_eq!(sink.used_storage(), 0);
    }

    #[test]
    fn size_mismatch() {
        let image = firmware::image(300, 8);
        let compressed = deflate(&image);

        let mut out = vec![0; 512];
        let mut sink =
            Decompress::new(RamSink::new(&mut out), &info(301)).unwrap();
        sink.write(&compressed).unwrap();
        assert_eq!(sink.flush(), Err(Error::Crash));
        assert_eq!(sink.used_storage(), 0);

        let mut out = vec![0; 512];
        let mut sink =
            Decompress::new(RamSink::new(&mut out), &info(299)).unwrap();
        assert_eq!(sink.write(&compressed), Err(Error::Crash));
    }

    #[test]
    fn trailing_garbage() {
        let mut compressed = deflate(b"hello");
        compressed.push(0);
        let mut out = vec![0; 16];
        let mut sink = Decompress::new(RamSink::new(&mut out), &info(5)).unwrap();
        assert_eq!(sink.write(&compressed), Err(Error::Crash));
    }

    #[test]
    fn thumb_filter() {
        let image = firmware::image(3000, 12);
        let mut filtered = image.clone();
        bcj::convert(&mut filtered, 0, bcj::Direction::Encode);
        let compressed = deflate(&filtered);

        let info = CompressionInfo {
            arm_thumb_filter: true,
            ..info(image.len())
        };
        let mut out = vec![0; 4096];
        let mut sink = Decompress::new(RamSink::new(&mut out), &info).unwrap();
        for piece in compressed.chunks(33) {
            sink.write(piece).unwrap();
        }
        sink.flush().unwrap();
        assert_eq!(sink.into_inner().written(), &image[..]);
    }

    #[test]
    fn unsupported_algorithm() {
        let mut out = [0; 4];
        let info = CompressionInfo {
            algorithm: 2,
            ..info(4)
        };
        assert_eq!(
            Decompress::new(RamSink::new(&mut out), &info).err(),
            Some(Error::Unsupported)
        );
    }
}
