// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Flash sinks.

use arrayvec::ArrayVec;

use crate::hardware::flash::Flash;
use crate::hardware::flash::FlashExt as _;
use crate::hardware::flash::Ptr;
use crate::hardware::flash::MAX_WRITE_BLOCK;
use crate::sink::Error;
use crate::sink::Sink;

/// A sink that writes into a bounded region of non-volatile memory.
///
/// The region is the whole of `F`; use a
/// [`SubFlash`](crate::hardware::flash::SubFlash) to confine the sink to one
/// partition. Bytes are programmed in whole write blocks: a trailing partial
/// block is held back until the next write completes it, or until
/// [`Sink::flush()`] pads it with the erased value.
pub struct FlashSink<F> {
    flash: F,
    // The offset `pending` will be programmed at; always write-aligned.
    offset: u32,
    pending: ArrayVec<u8, MAX_WRITE_BLOCK>,
    used: usize,
}

impl<F: Flash> FlashSink<F> {
    /// Creates a new sink over `flash`, starting at offset zero.
    ///
    /// The region is not erased; callers that need a blank region should
    /// call [`Sink::erase()`] first.
    pub fn new(flash: F) -> Result<Self, Error> {
        let block = flash.geometry().write_block as usize;
        check!(block > 0 && block <= MAX_WRITE_BLOCK, Error::InvalidArgument);
        Ok(Self {
            flash,
            offset: 0,
            pending: ArrayVec::new(),
            used: 0,
        })
    }

    /// Returns the underlying flash device.
    pub fn into_inner(self) -> F {
        self.flash
    }

    fn block(&self) -> usize {
        self.flash.geometry().write_block as usize
    }

    fn program(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.flash.program(Ptr::new(self.offset), buf)?;
        self.offset += buf.len() as u32;
        Ok(())
    }
}

impl<F: Flash> Sink for FlashSink<F> {
    fn write(&mut self, mut buf: &[u8]) -> Result<(), Error> {
        let size = self.flash.size()? as usize;
        let end = self.offset as usize + self.pending.len() + buf.len();
        check!(end <= size, Error::NoMemory);
        let block = self.block();

        if !self.pending.is_empty() {
            let take = buf.len().min(block - self.pending.len());
            let (head, rest) = buf.split_at(take);
            self.pending
                .try_extend_from_slice(head)
                .map_err(|_| Error::Crash)?;
            buf = rest;
            if self.pending.len() == block {
                let pending = core::mem::take(&mut self.pending);
                self.program(&pending)?;
            }
        }

        let aligned = buf.len() - buf.len() % block;
        let (whole, tail) = buf.split_at(aligned);
        if !whole.is_empty() {
            self.program(whole)?;
        }
        self.pending
            .try_extend_from_slice(tail)
            .map_err(|_| Error::Crash)?;

        self.used = self.used.max(end);
        Ok(())
    }

    /// Moves to `offset`, which must be write-aligned.
    ///
    /// Any partial block held back is programmed first.
    fn seek(&mut self, offset: usize) -> Result<(), Error> {
        check!(
            offset <= self.flash.size()? as usize,
            Error::InvalidArgument
        );
        check!(
            self.flash.geometry().is_write_aligned(offset as u32, 0),
            Error::InvalidArgument
        );
        self.flush()?;
        self.offset = offset as u32;
        Ok(())
    }

    /// Erases the whole region.
    fn erase(&mut self) -> Result<(), Error> {
        self.pending.clear();
        self.flash.erase_all()?;
        self.offset = 0;
        self.used = 0;
        info!("flash sink erased");
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        if !self.pending.is_empty() {
            let pending = core::mem::take(&mut self.pending);
            self.flash.program_padded(Ptr::new(self.offset), &pending)?;
            self.offset += self.block() as u32;
        }
        self.flash.flush()?;
        Ok(())
    }

    fn used_storage(&self) -> usize {
        self.used
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hardware::flash::Geometry;
    use crate::hardware::flash::RamMut;
    use crate::hardware::flash::Region;
    use crate::hardware::flash::SubFlash;
    use pretty_assertions::assert_eq;

    const MRAM: Geometry = Geometry {
        write_block: 16,
        erase_block: 16,
        erased_value: 0xff,
    };

    #[test]
    fn unaligned_chunks() {
        let data = (0..100u8).collect::<Vec<_>>();
        for &chunk in &[1, 7, 16, 33, 100] {
            let mut ram = RamMut::with_geometry(vec![0xff; 128], MRAM);
            let mut sink = FlashSink::new(&mut ram).unwrap();
            for piece in data.chunks(chunk) {
                sink.write(piece).unwrap();
            }
            assert_eq!(sink.used_storage(), 100);
            sink.flush().unwrap();
            drop(sink);

            assert_eq!(&ram.as_bytes()[..100], &data[..]);
            assert_eq!(&ram.as_bytes()[100..], &[0xff; 28][..]);
        }
    }

    #[test]
    fn bounded_region() {
        let mut ram = RamMut::with_geometry(vec![0u8; 96], MRAM);
        let sub = SubFlash(&mut ram, Region::new(32, 32));
        let mut sink = FlashSink::new(sub).unwrap();
        sink.write(&[0xaa; 20]).unwrap();
        assert_eq!(sink.write(&[0xaa; 13]), Err(Error::NoMemory));
        sink.write(&[0xaa; 12]).unwrap();
        sink.flush().unwrap();
        drop(sink);

        assert_eq!(&ram.as_bytes()[..32], &[0; 32][..]);
        assert_eq!(&ram.as_bytes()[32..64], &[0xaa; 32][..]);
        assert_eq!(&ram.as_bytes()[64..], &[0; 32][..]);
    }

    #[test]
    fn erase_discards_everything() {
        let mut ram = RamMut::with_geometry(vec![0u8; 64], MRAM);
        let mut sink = FlashSink::new(&mut ram).unwrap();
        sink.write(&[0x11; 40]).unwrap();
        sink.erase().unwrap();
        assert_eq!(sink.used_storage(), 0);
        sink.flush().unwrap();
        drop(sink);
        assert!(ram.as_bytes().iter().all(|&b| b == 0xff));
    }

    #[test]
    fn seek() {
        let mut ram = RamMut::with_geometry(vec![0xff; 64], MRAM);
        let mut sink = FlashSink::new(&mut ram).unwrap();
        assert_eq!(sink.seek(8), Err(Error::InvalidArgument));
        assert_eq!(sink.seek(80), Err(Error::InvalidArgument));
        sink.seek(32).unwrap();
        sink.write(b"suitcase").unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.used_storage(), 40);
        drop(sink);
        assert_eq!(&ram.as_bytes()[32..40], b"suitcase");
        assert_eq!(&ram.as_bytes()[..32], &[0xff; 32][..]);
    }

    #[test]
    fn oversized_write_block() {
        let geometry = Geometry {
            write_block: 128,
            ..MRAM
        };
        let ram = RamMut::with_geometry(vec![0u8; 256], geometry);
        assert_eq!(FlashSink::new(ram).err(), Some(Error::InvalidArgument));
    }
}
