// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Traits for converting integers to byte representations.
//!
//! CBOR encodes every multi-byte argument in network order, so only
//! big-endian output is provided.

use core::mem;

use byteorder::ByteOrder as _;

use crate::io;
use crate::io::Write;

/// A big-endian integer, which can be written.
pub trait BeInt: Sized + Copy {
    /// Writes a value of type `Self`, in big-endian order.
    fn write_to<W: Write>(self, w: W) -> Result<(), io::Error>;
}

impl BeInt for u8 {
    #[inline]
    fn write_to<W: Write>(self, mut w: W) -> Result<(), io::Error> {
        w.write_bytes(&[self])
    }
}

impl BeInt for u16 {
    #[inline]
    fn write_to<W: Write>(self, mut w: W) -> Result<(), io::Error> {
        let mut bytes = [0; mem::size_of::<Self>()];
        byteorder::BE::write_u16(&mut bytes, self);
        w.write_bytes(&bytes)
    }
}

impl BeInt for u32 {
    #[inline]
    fn write_to<W: Write>(self, mut w: W) -> Result<(), io::Error> {
        let mut bytes = [0; mem::size_of::<Self>()];
        byteorder::BE::write_u32(&mut bytes, self);
        w.write_bytes(&bytes)
    }
}
