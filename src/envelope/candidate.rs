// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Update candidate info.
//!
//! When an update is staged, the bootloader needs to know where its pieces
//! live: the candidate envelope and any payload caches. This is persisted as
//! a small fixed-layout record, in its own flash partition:
//! ```text
//! struct {
//!     magic: u32le,
//!     count: u32le,
//!     regions: [{ address: u32le, size: u32le }; MAX_REGIONS],
//! }
//! ```
//! By convention, the first region is the envelope itself.

use arrayvec::ArrayVec;

use zerocopy::byteorder::LittleEndian;
use zerocopy::byteorder::U32;
use zerocopy::AsBytes;
use zerocopy::FromBytes;

use crate::envelope::Error;
use crate::hardware::flash::Flash;
use crate::hardware::flash::FlashExt as _;
use crate::hardware::flash::Ptr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The largest number of regions a candidate may be split across.
pub const MAX_REGIONS: usize = 8;

/// The magic number marking a valid record ("SUIC").
pub const MAGIC: u32 = 0x4349_5553;

/// A region of the global address space holding part of an update
/// candidate.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpdateRegion {
    /// The global address of the region.
    pub address: u32,
    /// The size of the region, in bytes.
    pub size: u32,
}

#[derive(Copy, Clone, AsBytes, FromBytes)]
#[repr(C)]
struct RawRegion {
    address: U32<LittleEndian>,
    size: U32<LittleEndian>,
}

#[derive(Copy, Clone, AsBytes, FromBytes)]
#[repr(C)]
struct Record {
    magic: U32<LittleEndian>,
    count: U32<LittleEndian>,
    regions: [RawRegion; MAX_REGIONS],
}

/// The persisted update candidate info, stored at the start of `F`.
pub struct CandidateInfo<F> {
    flash: F,
}

impl<F: Flash> CandidateInfo<F> {
    /// Creates a new `CandidateInfo` over `flash`, which must be large enough
    /// to hold the record.
    pub fn new(flash: F) -> Result<Self, Error> {
        let len = core::mem::size_of::<Record>();
        check!(flash.size()? as usize >= len, Error::InvalidArgument);
        Ok(Self { flash })
    }

    /// Returns the underlying flash device.
    pub fn into_inner(self) -> F {
        self.flash
    }

    /// Records `regions` as the current update candidate, replacing any
    /// previous one.
    ///
    /// At least one region, the envelope, is required.
    pub fn set(&mut self, regions: &[UpdateRegion]) -> Result<(), Error> {
        check!(!regions.is_empty(), Error::InvalidArgument);
        check!(regions.len() <= MAX_REGIONS, Error::NoMemory);

        let mut record = Record::new_zeroed();
        record.magic.set(MAGIC);
        record.count.set(regions.len() as u32);
        for (raw, region) in record.regions.iter_mut().zip(regions) {
            raw.address.set(region.address);
            raw.size.set(region.size);
        }

        self.flash.erase_all()?;
        self.flash.program_padded(Ptr::new(0), record.as_bytes())?;
        self.flash.flush()?;
        info!("update candidate set: {} region(s)", regions.len());
        Ok(())
    }

    /// Returns the regions of the current update candidate.
    ///
    /// If no candidate has been recorded, returns [`Error::NotFound`].
    pub fn get(&self) -> Result<ArrayVec<UpdateRegion, MAX_REGIONS>, Error> {
        let record = self.flash.read_object::<Record>(Ptr::new(0))?;
        if record.magic.get() != MAGIC {
            return Err(Error::NotFound);
        }
        let count = record.count.get() as usize;
        if count == 0 || count > MAX_REGIONS {
            warn!("corrupt update candidate record: count = {}", count);
            return Err(Error::NotFound);
        }

        Ok(record.regions[..count]
            .iter()
            .map(|raw| UpdateRegion {
                address: raw.address.get(),
                size: raw.size.get(),
            })
            .collect())
    }

    /// Returns the region holding the candidate envelope.
    pub fn envelope(&self) -> Result<UpdateRegion, Error> {
        self.get()?.first().copied().ok_or(Error::NotFound)
    }

    /// Forgets the current update candidate.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.flash.erase_all()?;
        info!("update candidate cleared");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hardware::flash::Geometry;
    use crate::hardware::flash::RamMut;
    use pretty_assertions::assert_eq;

    const MRAM: Geometry = Geometry {
        write_block: 16,
        erase_block: 16,
        erased_value: 0xff,
    };

    fn info() -> CandidateInfo<RamMut<Vec<u8>>> {
        CandidateInfo::new(RamMut::with_geometry(vec![0xff; 128], MRAM))
            .unwrap()
    }

    const REGIONS: &[UpdateRegion] = &[
        UpdateRegion {
            address: 0x0e0a_0000,
            size: 0x1234,
        },
        UpdateRegion {
            address: 0x6000_0000,
            size: 0x4_0000,
        },
    ];

    #[test]
    fn set_and_get() {
        let mut info = info();
        assert_eq!(info.get().unwrap_err(), Error::NotFound);

        info.set(REGIONS).unwrap();
        assert_eq!(&info.get().unwrap()[..], REGIONS);
        assert_eq!(info.envelope().unwrap(), REGIONS[0]);

        let flash = info.into_inner();
        assert_eq!(&flash.as_bytes()[..8], &[0x53, 0x55, 0x49, 0x43, 2, 0, 0, 0]);
        assert_eq!(&flash.as_bytes()[8..12], &[0x00, 0x00, 0x0a, 0x0e]);
    }

    #[test]
    fn replace_and_clear() {
        let mut info = info();
        info.set(REGIONS).unwrap();
        info.set(&REGIONS[1..]).unwrap();
        assert_eq!(&info.get().unwrap()[..], &REGIONS[1..]);

        info.clear().unwrap();
        assert_eq!(info.get().unwrap_err(), Error::NotFound);
        assert_eq!(info.envelope().unwrap_err(), Error::NotFound);
    }

    #[test]
    fn bad_region_lists() {
        let mut info = info();
        assert_eq!(info.set(&[]), Err(Error::InvalidArgument));

        let many = [REGIONS[0]; MAX_REGIONS + 1];
        assert_eq!(info.set(&many), Err(Error::NoMemory));
        info.set(&many[..MAX_REGIONS]).unwrap();
        assert_eq!(info.get().unwrap().len(), MAX_REGIONS);
    }

    #[test]
    fn corrupt_count() {
        let mut bytes = vec![0xff; 128];
        bytes[..8].copy_from_slice(&[0x53, 0x55, 0x49, 0x43, 9, 0, 0, 0]);
        let info = CandidateInfo::new(RamMut::with_geometry(bytes, MRAM))
            .unwrap();
        assert_eq!(info.get().unwrap_err(), Error::NotFound);
    }

    #[test]
    fn too_small() {
        let flash = RamMut::with_geometry(vec![0xff; 64], MRAM);
        assert!(CandidateInfo::new(flash).is_err());
    }
}
