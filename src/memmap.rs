// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Global address translation.
//!
//! Manifests refer to components by their address in a single, flat global
//! address space. A [`MemoryMap`] describes how that space is carved up
//! into non-volatile and volatile areas, and answers which area, if any, an
//! address or range belongs to.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifies the driver backing a non-volatile memory area.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceId(pub u8);

/// A non-volatile memory area.
///
/// An area with a backing device is internal storage, written through that
/// device's driver. An area without one is external memory.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NvmArea {
    /// The first global address of the area.
    pub start: u32,
    /// The size of the area, in bytes.
    pub size: u32,
    /// The device that backs this area, if it is internal.
    pub device: Option<DeviceId>,
}

/// A volatile memory area.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RamArea {
    /// The first global address of the area.
    pub start: u32,
    /// The size of the area, in bytes.
    pub size: u32,
    /// The device that backs this area, if any.
    pub device: Option<DeviceId>,
}

/// A kind of memory, used for containment queries.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Kind {
    /// Internal non-volatile memory.
    Nvm,
    /// Volatile memory.
    Ram,
    /// External non-volatile memory.
    External,
}

/// The result of classifying a global address.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Location {
    /// The address is in internal non-volatile memory, at `offset` bytes into
    /// the area backed by `device`.
    Nvm {
        /// The backing device.
        device: DeviceId,
        /// The offset from the start of the area.
        offset: u32,
    },
    /// The address is in volatile memory.
    Ram {
        /// The offset from the start of the area.
        offset: u32,
    },
    /// The address is in external non-volatile memory.
    External {
        /// The offset from the start of the area.
        offset: u32,
    },
    /// The address is not in any known area.
    Unknown,
}

impl Location {
    /// Returns the [`Kind`] of memory this location is in, if it is known.
    pub fn kind(self) -> Option<Kind> {
        match self {
            Location::Nvm { .. } => Some(Kind::Nvm),
            Location::Ram { .. } => Some(Kind::Ram),
            Location::External { .. } => Some(Kind::External),
            Location::Unknown => None,
        }
    }
}

// Identifies a single area across both tables.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum AreaIndex {
    Nvm(usize),
    Ram(usize),
}

/// A platform memory map.
///
/// The tables are fixed when the map is built and never change afterwards.
/// Areas are expected not to overlap; if they do, non-volatile areas take
/// precedence, and earlier entries take precedence over later ones.
#[derive(Copy, Clone, Debug)]
pub struct MemoryMap<'a> {
    nvm: &'a [NvmArea],
    ram: &'a [RamArea],
}

impl<'a> MemoryMap<'a> {
    /// Creates a new memory map out of the given area tables.
    pub const fn new(nvm: &'a [NvmArea], ram: &'a [RamArea]) -> Self {
        Self { nvm, ram }
    }

    /// Returns the non-volatile areas in this map.
    pub fn nvm_areas(&self) -> &'a [NvmArea] {
        self.nvm
    }

    /// Returns the volatile areas in this map.
    pub fn ram_areas(&self) -> &'a [RamArea] {
        self.ram
    }

    fn find(&self, address: u32) -> Option<(AreaIndex, Location)> {
        fn offset_in(start: u32, size: u32, address: u32) -> Option<u32> {
            let offset = address.checked_sub(start)?;
            if offset < size {
                Some(offset)
            } else {
                None
            }
        }

        for (i, area) in self.nvm.iter().enumerate() {
            if let Some(offset) = offset_in(area.start, area.size, address) {
                let location = match area.device {
                    Some(device) => Location::Nvm { device, offset },
                    None => Location::External { offset },
                };
                return Some((AreaIndex::Nvm(i), location));
            }
        }

        for (i, area) in self.ram.iter().enumerate() {
            if let Some(offset) = offset_in(area.start, area.size, address) {
                return Some((AreaIndex::Ram(i), Location::Ram { offset }));
            }
        }

        None
    }

    /// Classifies a single global address.
    pub fn classify(&self, address: u32) -> Location {
        self.find(address)
            .map(|(_, location)| location)
            .unwrap_or(Location::Unknown)
    }

    /// Returns whether the range `[address, address + size)` lies entirely
    /// within a single area of the given kind.
    ///
    /// A zero-sized range is treated as a single byte. A range that straddles
    /// two areas is not contained in either, even if they are adjacent and of
    /// the same kind.
    pub fn range_is_in(&self, kind: Kind, address: u32, size: u32) -> bool {
        let last = match address.checked_add(size.max(1) - 1) {
            Some(last) => last,
            None => return false,
        };

        match (self.find(address), self.find(last)) {
            (Some((first_area, first)), Some((last_area, _))) => {
                first_area == last_area && first.kind() == Some(kind)
            }
            _ => false,
        }
    }

    /// Resolves a range of volatile memory to the corresponding bytes of
    /// `host`, which stands in for the RAM area containing `address`.
    ///
    /// This is used when volatile memory is simulated by an ordinary buffer:
    /// callers keep working with global addresses, and only this boundary
    /// knows where the bytes really live.
    pub fn remap_ram<'h>(
        &self,
        host: &'h mut [u8],
        address: u32,
        size: u32,
    ) -> Option<&'h mut [u8]> {
        if !self.range_is_in(Kind::Ram, address, size) {
            return None;
        }
        let offset = match self.classify(address) {
            Location::Ram { offset } => offset as usize,
            _ => return None,
        };
        let end = offset.checked_add(size as usize)?;
        host.get_mut(offset..end)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MRAM: DeviceId = DeviceId(0);

    const NVM: &[NvmArea] = &[
        NvmArea {
            start: 0x0e00_0000,
            size: 0x0010_0000,
            device: Some(MRAM),
        },
        // Adjacent to the area above, but a different area.
        NvmArea {
            start: 0x0e10_0000,
            size: 0x0010_0000,
            device: Some(MRAM),
        },
        NvmArea {
            start: 0x6000_0000,
            size: 0x0100_0000,
            device: None,
        },
    ];

    const RAM: &[RamArea] = &[RamArea {
        start: 0x2000_0000,
        size: 0x0004_0000,
        device: None,
    }];

    const MAP: MemoryMap<'static> = MemoryMap::new(NVM, RAM);

    #[test]
    fn classify() {
        assert_eq!(
            MAP.classify(0x0e00_1000),
            Location::Nvm {
                device: MRAM,
                offset: 0x1000
            }
        );
        assert_eq!(
            MAP.classify(0x0e10_0000),
            Location::Nvm {
                device: MRAM,
                offset: 0
            }
        );
        assert_eq!(
            MAP.classify(0x2003_ffff),
            Location::Ram { offset: 0x3_ffff }
        );
        assert_eq!(
            MAP.classify(0x6000_0010),
            Location::External { offset: 0x10 }
        );
        assert_eq!(MAP.classify(0x2004_0000), Location::Unknown);
        assert_eq!(MAP.classify(0), Location::Unknown);
    }

    #[test]
    fn classification_is_a_partition() {
        let kinds = [Kind::Nvm, Kind::Ram, Kind::External];
        let probes = NVM
            .iter()
            .flat_map(|a| vec![a.start, a.start + a.size - 1, a.start + a.size])
            .chain(RAM.iter().flat_map(|a| vec![a.start, a.start + a.size]))
            .chain(vec![0, u32::MAX]);

        for addr in probes {
            let hits = kinds
                .iter()
                .filter(|&&k| MAP.range_is_in(k, addr, 1))
                .count();
            let unknown = MAP.classify(addr) == Location::Unknown;
            assert_eq!(hits + unknown as usize, 1, "address {:#x}", addr);
        }
    }

    #[test]
    fn straddling_ranges() {
        assert!(MAP.range_is_in(Kind::Nvm, 0x0e0f_f000, 0x1000));
        assert!(!MAP.range_is_in(Kind::Nvm, 0x0e0f_f000, 0x1001));
        assert!(!MAP.range_is_in(Kind::Ram, 0x2003_ff00, 0x200));
        assert!(!MAP.range_is_in(Kind::Ram, 0x0e00_0000, 0x10));
    }

    #[test]
    fn zero_sized_ranges() {
        assert!(MAP.range_is_in(Kind::Ram, 0x2000_0000, 0));
        assert!(!MAP.range_is_in(Kind::Ram, 0x2004_0000, 0));
        assert!(!MAP.range_is_in(Kind::Ram, u32::MAX, 2));
    }

    #[test]
    fn remap() {
        let mut host = vec![0u8; 0x4_0000];
        let bytes = MAP.remap_ram(&mut host, 0x2000_0010, 4).unwrap();
        bytes.copy_from_slice(b"suit");
        assert_eq!(&host[0x10..0x14], b"suit");

        assert!(MAP.remap_ram(&mut host, 0x0e00_0000, 4).is_none());
        let mut short = vec![0u8; 8];
        assert!(MAP.remap_ram(&mut short, 0x2000_0010, 4).is_none());
    }
}
