// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! RAM sinks.

use crate::memmap::MemoryMap;
use crate::sink::Error;
use crate::sink::Sink;

/// A sink that writes into a fixed buffer of volatile memory.
///
/// Writes are sequential from the current position. A write that does not
/// fit in the buffer fails with [`Error::NoMemory`] and writes nothing; the
/// stream is never silently truncated.
pub struct RamSink<'a> {
    buf: &'a mut [u8],
    pos: usize,
    used: usize,
}

impl<'a> RamSink<'a> {
    /// Creates a new sink over `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            used: 0,
        }
    }

    /// Creates a new sink over the `size` bytes of volatile memory at the
    /// global `address`, where `host` holds the contents of the RAM area
    /// containing it.
    ///
    /// Fails with [`Error::InvalidArgument`] if the range is not entirely
    /// within a single RAM area of `map`.
    pub fn at(
        map: &MemoryMap,
        host: &'a mut [u8],
        address: u32,
        size: u32,
    ) -> Result<Self, Error> {
        let buf = map
            .remap_ram(host, address, size)
            .ok_or_else(|| fail!(Error::InvalidArgument))?;
        Ok(Self::new(buf))
    }

    /// Returns the bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.used]
    }

    /// Consumes this sink, returning the bytes written.
    pub fn into_written(self) -> &'a [u8] {
        let used = self.used;
        &self.buf[..used]
    }
}

impl Sink for RamSink<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        let end = self
            .pos
            .checked_add(buf.len())
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                fail!(
                    Error::NoMemory,
                    "ram sink overflow: {} + {} > {}",
                    self.pos,
                    buf.len(),
                    self.buf.len()
                )
            })?;
        self.buf[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        self.used = self.used.max(end);
        Ok(())
    }

    fn seek(&mut self, offset: usize) -> Result<(), Error> {
        check!(offset <= self.buf.len(), Error::InvalidArgument);
        self.pos = offset;
        Ok(())
    }

    fn used_storage(&self) -> usize {
        self.used
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memmap::RamArea;

    #[test]
    fn sequential_writes() {
        let mut buf = [0; 8];
        let mut sink = RamSink::new(&mut buf);
        sink.write(b"suit").unwrap();
        sink.write(b"ca").unwrap();
        assert_eq!(sink.used_storage(), 6);
        assert_eq!(sink.written(), b"suitca");

        assert_eq!(sink.write(b"sex"), Err(Error::NoMemory));
        assert_eq!(sink.used_storage(), 6);
        sink.write(b"se").unwrap();
        assert_eq!(sink.into_written(), b"suitcase");
    }

    #[test]
    fn seek_and_overwrite() {
        let mut buf = [0; 8];
        let mut sink = RamSink::new(&mut buf);
        sink.write(b"suitcase").unwrap();
        sink.seek(4).unwrap();
        sink.write(b"CA").unwrap();
        assert_eq!(sink.used_storage(), 8);
        assert_eq!(sink.written(), b"suitCAse");

        assert_eq!(sink.seek(9), Err(Error::InvalidArgument));
        sink.seek(8).unwrap();
        assert_eq!(sink.write(b"!"), Err(Error::NoMemory));
        assert_eq!(sink.erase(), Err(Error::Unsupported));
    }

    #[test]
    fn at_global_address() {
        const RAM: &[RamArea] = &[RamArea {
            start: 0x2000_0000,
            size: 0x100,
            device: None,
        }];
        let map = MemoryMap::new(&[], RAM);
        let mut host = [0u8; 0x100];

        let mut sink = RamSink::at(&map, &mut host, 0x2000_0080, 4).unwrap();
        sink.write(b"suit").unwrap();
        assert_eq!(sink.write(b"!"), Err(Error::NoMemory));
        drop(sink);
        assert_eq!(&host[0x80..0x84], b"suit");

        assert_eq!(
            RamSink::at(&map, &mut host, 0x2000_00f0, 0x20).err(),
            Some(Error::InvalidArgument)
        );
    }
}
