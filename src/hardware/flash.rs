// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Non-volatile memory abstraction.
//!
//! This module provides the [`Flash`] trait, which represents an *abstract
//! flash device*: a region of memory that can be read, programmed in
//! fixed-size blocks, and erased back to a known value. Such a "device" can
//! range from a simple Rust slice to an MRAM controller (or even a subregion
//! of one!).

use core::convert::TryInto;

use static_assertions::assert_obj_safe;

use zerocopy::AsBytes;
use zerocopy::FromBytes;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A [`Flash`] error.
///
/// All of these errors are non-retryable; a [`Flash`] implementation should
/// block until the operation succeeds.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates that an operation failed because the requested
    /// operation was outside of the device's address space.
    OutOfRange,

    /// Indicates that an operation was not aligned to the device's write or
    /// erase block size.
    Unaligned,

    /// Indicates that the device is locked in some manner and cannot
    /// be affected by the operation.
    Locked,

    /// Indicates that an unspecified error occured.
    Unspecified,
}

/// The largest write block [`FlashExt::program_padded()`] can pad to.
pub const MAX_WRITE_BLOCK: usize = 64;

/// The programming constraints of a [`Flash`] device.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Geometry {
    /// The granularity of `program()`, in bytes. Offsets and lengths of
    /// programming operations must be multiples of this value.
    pub write_block: u32,

    /// The granularity of `erase()`, in bytes.
    pub erase_block: u32,

    /// The value every byte reads as after being erased.
    pub erased_value: u8,
}

impl Geometry {
    /// Byte-addressable memory that erases to `0xff`.
    pub const BYTE: Self = Self {
        write_block: 1,
        erase_block: 1,
        erased_value: 0xff,
    };

    /// Returns whether `offset` and `len` are both multiples of the write
    /// block size.
    pub fn is_write_aligned(&self, offset: u32, len: usize) -> bool {
        let block = self.write_block.max(1) as usize;
        offset as usize % block == 0 && len % block == 0
    }

    /// Returns whether `region` starts and ends on erase block boundaries.
    pub fn is_erase_aligned(&self, region: Region) -> bool {
        let block = self.erase_block.max(1);
        region.ptr.address % block == 0 && region.len % block == 0
    }
}

/// Provides access to a flash-like storage device.
///
/// This trait provides abstract operations on a device, as if it were a
/// block of random-access memory with restricted write operations. It is the
/// implementation's responsibility to implement these operations efficiently
/// with respect to the underlying device.
pub trait Flash {
    /// Returns the size, in bytes, of this device.
    fn size(&self) -> Result<u32, Error>;

    /// Returns the programming constraints of this device.
    fn geometry(&self) -> Geometry {
        Geometry::BYTE
    }

    /// Attempts to read `out.len()` bytes starting at `offset`.
    fn read(&self, offset: Ptr, out: &mut [u8]) -> Result<(), Error>;

    /// Attempts to write `buf.len()` bytes starting at `offset`.
    ///
    /// Both `offset` and the length of `buf` must respect
    /// [`Geometry::write_block`].
    ///
    /// Note that this function is not guaranteed to succeed (and be
    /// reflected in the return value of `read`) until `flush()` is called.
    /// This is to permit a `Flash` implementation to buffer writes before
    /// sending them out.
    fn program(&mut self, offset: Ptr, buf: &[u8]) -> Result<(), Error>;

    /// Erases `region`, so that every byte in it reads back as
    /// [`Geometry::erased_value`].
    fn erase(&mut self, region: Region) -> Result<(), Error>;

    /// Flushes any pending `program()` operations.
    fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
assert_obj_safe!(Flash);

impl<F: Flash + ?Sized> Flash for &mut F {
    #[inline]
    fn size(&self) -> Result<u32, Error> {
        F::size(self)
    }

    #[inline]
    fn geometry(&self) -> Geometry {
        F::geometry(self)
    }

    #[inline]
    fn read(&self, offset: Ptr, out: &mut [u8]) -> Result<(), Error> {
        F::read(self, offset, out)
    }

    #[inline]
    fn program(&mut self, offset: Ptr, buf: &[u8]) -> Result<(), Error> {
        F::program(self, offset, buf)
    }

    #[inline]
    fn erase(&mut self, region: Region) -> Result<(), Error> {
        F::erase(self, region)
    }

    #[inline]
    fn flush(&mut self) -> Result<(), Error> {
        F::flush(self)
    }
}

/// Convenience functions for reading and writing whole objects.
#[extend::ext(name = FlashExt)]
pub impl<F: Flash + ?Sized> F {
    /// Reads a value of type `T` starting at `offset`.
    fn read_object<T: AsBytes + FromBytes>(
        &self,
        offset: Ptr,
    ) -> Result<T, Error> {
        let mut val = T::new_zeroed();
        self.read(offset, val.as_bytes_mut())?;
        Ok(val)
    }

    /// Programs `val` starting at `offset`.
    fn program_object<T: AsBytes>(
        &mut self,
        offset: Ptr,
        val: &T,
    ) -> Result<(), Error> {
        self.program(offset, val.as_bytes())
    }

    /// Programs `buf` starting at `offset`, padding a trailing partial write
    /// block with the erased value.
    ///
    /// `offset` must still be aligned, and the write block may be at most
    /// [`MAX_WRITE_BLOCK`] bytes.
    fn program_padded(&mut self, offset: Ptr, buf: &[u8]) -> Result<(), Error> {
        let geometry = self.geometry();
        let block = geometry.write_block.max(1) as usize;
        if block > MAX_WRITE_BLOCK {
            return Err(Error::Unaligned);
        }

        let aligned = buf.len() - buf.len() % block;
        let (head, tail) = buf.split_at(aligned);
        if !head.is_empty() {
            self.program(offset, head)?;
        }
        if tail.is_empty() {
            return Ok(());
        }

        let mut last = [geometry.erased_value; MAX_WRITE_BLOCK];
        last[..tail.len()].copy_from_slice(tail);
        let tail_offset = offset
            .address
            .checked_add(aligned as u32)
            .ok_or(Error::OutOfRange)?;
        self.program(Ptr::new(tail_offset), &last[..block])
    }

    /// Erases the whole device.
    fn erase_all(&mut self) -> Result<(), Error> {
        let len = self.size()?;
        self.erase(Region::new(0, len))
    }
}

/// Adapter for working with a sub-region of a [`Flash`] type.
///
/// Reads and writes on the device will be constrained to a given [`Region`].
/// This is especially useful for operating on one slot of a larger
/// partition.
///
/// There is no requirement that [`Region`] actually overlap with the address
/// space of `F`; the [`Flash`] implementation is still responsible for doing
/// bounds checks, after offsets are bounds-checked within `Region`.
#[derive(Copy, Clone)]
pub struct SubFlash<F>(pub F, pub Region);

impl<F: Flash> SubFlash<F> {
    /// Creates a new `SubFlash` representing the entirety of the given device.
    pub fn full(flash: F) -> Result<Self, Error> {
        let region = Region::new(0, flash.size()?);
        Ok(Self(flash, region))
    }

    /// Translates a region relative to this `SubFlash` into one relative to
    /// the underlying device, checking that it fits.
    fn translate(&self, offset: u32, len: usize) -> Result<u32, Error> {
        let len: u32 = len.try_into().map_err(|_| Error::OutOfRange)?;
        let end = offset.checked_add(len).ok_or(Error::OutOfRange)?;
        if end > self.1.len {
            return Err(Error::OutOfRange);
        }
        offset
            .checked_add(self.1.ptr.address)
            .ok_or(Error::OutOfRange)
    }
}

impl<F: Flash> Flash for SubFlash<F> {
    #[inline]
    fn size(&self) -> Result<u32, Error> {
        Ok(self.1.len)
    }

    #[inline]
    fn geometry(&self) -> Geometry {
        self.0.geometry()
    }

    #[inline]
    fn read(&self, offset: Ptr, out: &mut [u8]) -> Result<(), Error> {
        let offset = self.translate(offset.address, out.len())?;
        self.0.read(Ptr::new(offset), out)
    }

    #[inline]
    fn program(&mut self, offset: Ptr, buf: &[u8]) -> Result<(), Error> {
        let offset = self.translate(offset.address, buf.len())?;
        self.0.program(Ptr::new(offset), buf)
    }

    #[inline]
    fn erase(&mut self, region: Region) -> Result<(), Error> {
        let offset =
            self.translate(region.ptr.address, region.len as usize)?;
        self.0.erase(Region::new(offset, region.len))
    }

    #[inline]
    fn flush(&mut self) -> Result<(), Error> {
        self.0.flush()
    }
}

/// Adapter for converting mutable, RAM-backed storage into a [`Flash`].
///
/// For the purposes of this type, "RAM-backed" means that `AsRef<[u8]>`
/// and `AsMut<[u8]>` are implemented. The [`Geometry`] is enforced, which
/// makes this type suitable for simulating MRAM or RRAM in tests.
#[derive(Copy, Clone)]
pub struct RamMut<Bytes> {
    bytes: Bytes,
    geometry: Geometry,
}

impl<Bytes: AsRef<[u8]> + AsMut<[u8]>> RamMut<Bytes> {
    /// Wraps `bytes` as byte-addressable memory.
    pub fn new(bytes: Bytes) -> Self {
        Self::with_geometry(bytes, Geometry::BYTE)
    }

    /// Wraps `bytes` with the given programming constraints.
    pub fn with_geometry(bytes: Bytes, geometry: Geometry) -> Self {
        Self { bytes, geometry }
    }

    /// Returns the backing storage.
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_ref()
    }

    /// Unwraps this `RamMut`, returning the backing storage.
    pub fn into_inner(self) -> Bytes {
        self.bytes
    }

    fn range(&self, offset: u32, len: usize) -> Result<(usize, usize), Error> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(Error::OutOfRange)?;
        if end > self.bytes.as_ref().len() {
            return Err(Error::OutOfRange);
        }
        Ok((start, end))
    }
}

impl<Bytes: AsRef<[u8]> + AsMut<[u8]>> Flash for RamMut<Bytes> {
    fn size(&self) -> Result<u32, Error> {
        self.bytes
            .as_ref()
            .len()
            .try_into()
            .map_err(|_| Error::Unspecified)
    }

    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn read(&self, offset: Ptr, out: &mut [u8]) -> Result<(), Error> {
        let (start, end) = self.range(offset.address, out.len())?;
        out.copy_from_slice(&self.bytes.as_ref()[start..end]);
        Ok(())
    }

    fn program(&mut self, offset: Ptr, buf: &[u8]) -> Result<(), Error> {
        if !self.geometry.is_write_aligned(offset.address, buf.len()) {
            return Err(Error::Unaligned);
        }
        let (start, end) = self.range(offset.address, buf.len())?;
        self.bytes.as_mut()[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn erase(&mut self, region: Region) -> Result<(), Error> {
        if !self.geometry.is_erase_aligned(region) {
            return Err(Error::Unaligned);
        }
        let (start, end) = self.range(region.ptr.address, region.len as usize)?;
        let erased = self.geometry.erased_value;
        self.bytes.as_mut()[start..end]
            .iter_mut()
            .for_each(|b| *b = erased);
        Ok(())
    }
}

/// An abstract pointer into a [`Flash`] type.
///
/// A `Ptr` needs to be used in conjunction with a [`Flash`]
/// implementation to be read from or written to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, AsBytes, FromBytes)]
#[repr(transparent)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ptr {
    /// The abstract address of this pointer.
    pub address: u32,
}

impl Ptr {
    /// Convenience method for creating a `Ptr` without having to use
    /// a struct literal.
    pub const fn new(address: u32) -> Self {
        Self { address }
    }
}

/// An abstract region within a [`Flash`] type.
///
/// A `Region` needs to be used in conjunction with a [`Flash`]
/// implementation to be read from or written to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, AsBytes, FromBytes)]
#[repr(C)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    /// The base pointer for this region.
    pub ptr: Ptr,
    /// The length of the region.
    pub len: u32,
}

impl Region {
    /// Convenience method for creating a `Region` without having to use
    /// a struct literal.
    pub const fn new(ptr: u32, len: u32) -> Self {
        Self {
            ptr: Ptr::new(ptr),
            len,
        }
    }

    /// Returns the first address past the end of this region, if it does not
    /// overflow.
    pub fn end(self) -> Option<u32> {
        self.ptr.address.checked_add(self.len)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MRAM: Geometry = Geometry {
        write_block: 16,
        erase_block: 16,
        erased_value: 0xff,
    };

    #[test]
    fn sub_flash_bounds() {
        let mut ram = RamMut::new([0u8; 64]);
        let mut sub = SubFlash(&mut ram, Region::new(16, 32));

        sub.program(Ptr::new(0), b"suit").unwrap();
        assert_eq!(sub.program(Ptr::new(30), b"suit"), Err(Error::OutOfRange));

        let mut out = [0; 4];
        sub.read(Ptr::new(0), &mut out).unwrap();
        assert_eq!(&out, b"suit");
        assert_eq!(&ram.as_bytes()[16..20], b"suit");
    }

    #[test]
    fn geometry_enforced() {
        let mut ram = RamMut::with_geometry([0u8; 64], MRAM);
        assert_eq!(ram.program(Ptr::new(4), &[0; 16]), Err(Error::Unaligned));
        assert_eq!(ram.program(Ptr::new(0), &[0; 4]), Err(Error::Unaligned));
        ram.program(Ptr::new(16), &[0xaa; 16]).unwrap();

        assert_eq!(ram.erase(Region::new(0, 8)), Err(Error::Unaligned));
        ram.erase(Region::new(16, 16)).unwrap();
        assert!(ram.as_bytes()[16..32].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn objects() {
        let mut ram = RamMut::new([0u8; 16]);
        ram.program_object(Ptr::new(4), &Region::new(0x100, 0x20))
            .unwrap();
        let region: Region = ram.read_object(Ptr::new(4)).unwrap();
        assert_eq!(region, Region::new(0x100, 0x20));

        ram.erase_all().unwrap();
        assert!(ram.as_bytes().iter().all(|&b| b == 0xff));
    }

    #[test]
    fn padded_program() {
        let mut ram = RamMut::with_geometry([0u8; 48], MRAM);
        ram.program_padded(Ptr::new(16), &[0x5a; 20]).unwrap();
        assert_eq!(&ram.as_bytes()[..16], &[0; 16][..]);
        assert_eq!(&ram.as_bytes()[16..36], &[0x5a; 20][..]);
        assert_eq!(&ram.as_bytes()[36..48], &[0xff; 12][..]);

        assert_eq!(
            ram.program_padded(Ptr::new(8), &[0; 4]),
            Err(Error::Unaligned)
        );
    }
}
