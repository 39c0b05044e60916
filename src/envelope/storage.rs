// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Persistent envelope storage.
//!
//! Installed envelopes live in fixed-size slots of a non-volatile partition.
//! Each slot holds a single envelope-header record (see [`super`]) whose
//! envelope is the severed form of the installed candidate: only the
//! authentication wrapper and the manifest are kept.
//!
//! Slots are rewritten as a whole; there is no partial update of a slot.

use crate::envelope;
use crate::envelope::Error;
use crate::envelope::Header;
use crate::envelope::CLASS_ID_LEN;
use crate::hardware::flash::Flash;
use crate::hardware::flash::FlashExt as _;
use crate::hardware::flash::Region;
use crate::io::Cursor;

/// The slot layout of an envelope storage partition.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Layout {
    /// The size of each slot, in bytes.
    pub slot_size: u32,
    /// The number of slots.
    pub slots: u32,
}

impl Layout {
    /// The default layout: eight 2 KiB slots.
    pub const DEFAULT: Self = Self {
        slot_size: 0x800,
        slots: 8,
    };
}

impl Default for Layout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Envelope storage over a [`Flash`] partition.
pub struct Storage<F> {
    flash: F,
    layout: Layout,
}

impl<F: Flash> Storage<F> {
    /// Creates a new `Storage` with the given `layout` over `flash`.
    ///
    /// Fails with [`Error::InvalidArgument`] if the slots do not fit in
    /// `flash`, or are not aligned to its erase blocks.
    pub fn new(flash: F, layout: Layout) -> Result<Self, Error> {
        let total = layout
            .slot_size
            .checked_mul(layout.slots)
            .ok_or(Error::InvalidArgument)?;
        check!(total <= flash.size()?, Error::InvalidArgument);
        check!(
            flash
                .geometry()
                .is_erase_aligned(Region::new(0, layout.slot_size)),
            Error::InvalidArgument
        );
        Ok(Self { flash, layout })
    }

    /// Returns the layout of this storage.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Returns the underlying flash device.
    pub fn into_inner(self) -> F {
        self.flash
    }

    fn slot_region(&self, slot: u32) -> Result<Region, Error> {
        check!(slot < self.layout.slots, Error::InvalidArgument);
        Ok(Region::new(
            slot * self.layout.slot_size,
            self.layout.slot_size,
        ))
    }

    /// Installs the envelope `candidate` into `slot`, replacing whatever was
    /// stored there.
    ///
    /// `candidate` must be a complete, tagged envelope whose manifest carries
    /// an installed-manifest component id. `scratch` is used to assemble the
    /// record before it is written.
    pub fn install(
        &mut self,
        slot: u32,
        candidate: &[u8],
        scratch: &mut [u8],
    ) -> Result<(), Error> {
        let region = self.slot_region(slot)?;

        let severed = envelope::decode_severed_envelope(candidate)?;
        let class_id =
            envelope::decode_manifest_class_id(severed.manifest_component_id)?;
        let class_id_offset = severed.manifest_offset()?
            + envelope::offset_within(severed.manifest, class_id)
                .ok_or(Error::CborDecoding)?;

        let envelope_len = severed.encoded_len()?;
        let header_len = header_len(class_id_offset, envelope_len)?;
        let total = header_len + envelope_len;
        check!(total <= region.len as usize, Error::NoMemory);
        check!(total <= scratch.len(), Error::NoMemory);

        let (head, tail) = scratch[..total].split_at_mut(header_len);
        envelope::encode_severed(&severed, Cursor::new(tail))?;
        let header = Header::new(class_id_offset, tail);
        envelope::encode_header(&header, Cursor::new(head))?;

        self.flash.erase(region)?;
        self.flash.program_padded(region.ptr, &scratch[..total])?;
        self.flash.flush()?;
        info!(
            "installed envelope in slot {}: {} bytes, class id {:02x?}",
            slot, total, class_id
        );
        Ok(())
    }

    /// Reads and decodes the envelope header stored in `slot`.
    ///
    /// `buf` must hold at least a whole slot, or this fails with
    /// [`Error::NoMemory`]; the returned header points into it. An empty slot
    /// is [`Error::NotFound`].
    pub fn installed<'b>(
        &self,
        slot: u32,
        buf: &'b mut [u8],
    ) -> Result<Header<'b>, Error> {
        let region = self.slot_region(slot)?;
        let buf = buf
            .get_mut(..region.len as usize)
            .ok_or_else(|| fail!(Error::NoMemory))?;
        self.flash.read(region.ptr, buf)?;

        let erased = self.flash.geometry().erased_value;
        if buf.first().map_or(true, |&b| b == erased) {
            return Err(Error::NotFound);
        }
        envelope::decode_header(buf)
    }

    /// Finds the slot holding the envelope for the manifest class
    /// `class_id`, returning its index and header.
    ///
    /// `buf` must hold at least a whole slot, or this fails with
    /// [`Error::NoMemory`] before any slot is read. Slots that are empty are
    /// skipped, as are slots holding a corrupt record, which are logged; a
    /// corrupt slot cannot hold the class being looked for, and must not
    /// hide the slots after it.
    pub fn find<'b>(
        &self,
        class_id: &[u8; CLASS_ID_LEN],
        buf: &'b mut [u8],
    ) -> Result<(u32, Header<'b>), Error> {
        check!(
            buf.len() >= self.layout.slot_size as usize,
            Error::NoMemory
        );
        for slot in 0..self.layout.slots {
            let matches = match self.installed(slot, buf) {
                Ok(header) => header.class_id() == Some(class_id),
                Err(Error::NotFound) => false,
                Err(Error::CborDecoding) => {
                    warn!("skipping corrupt envelope slot {}", slot);
                    false
                }
                Err(e) => return Err(e),
            };
            if matches {
                return self.installed(slot, buf).map(|h| (slot, h));
            }
        }
        Err(Error::NotFound)
    }

    /// Erases `slot`.
    pub fn clear(&mut self, slot: u32) -> Result<(), Error> {
        let region = self.slot_region(slot)?;
        self.flash.erase(region)?;
        info!("cleared envelope slot {}", slot);
        Ok(())
    }
}

/// Computes the encoded length of an envelope header, without the envelope.
fn header_len(
    class_id_offset: usize,
    envelope_len: usize,
) -> Result<usize, Error> {
    // Only the lengths of the fields matter here, not their contents.
    let placeholder = Header {
        version: envelope::VERSION,
        class_id_offset,
        envelope: &[],
    };
    let map_len = placeholder.encoded_len()?;
    let envelope_hdr = crate::cbor::header_len(envelope_len)
        .map_err(|_| fail!(Error::NoMemory))?;
    Ok(map_len - 1 + envelope_hdr)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::envelope::test::sample_envelope;
    use crate::hardware::flash::Geometry;
    use crate::hardware::flash::RamMut;
    use testutil::data::class_id;

    const MRAM: Geometry = Geometry {
        write_block: 16,
        erase_block: 16,
        erased_value: 0xff,
    };

    const LAYOUT: Layout = Layout {
        slot_size: 0x200,
        slots: 4,
    };

    fn storage() -> Storage<RamMut<Vec<u8>>> {
        let flash = RamMut::with_geometry(vec![0xff; 0x800], MRAM);
        Storage::new(flash, LAYOUT).unwrap()
    }

    #[test]
    fn install_and_find() {
        let mut storage = storage();
        let mut scratch = [0; 0x200];
        let root = sample_envelope(&class_id::APP_ROOT);
        let local = sample_envelope(&class_id::APP_LOCAL_1);
        storage.install(0, &root, &mut scratch).unwrap();
        storage.install(2, &local, &mut scratch).unwrap();

        let mut buf = [0; 0x200];
        let header = storage.installed(2, &mut buf).unwrap();
        assert_eq!(header.class_id(), Some(&class_id::APP_LOCAL_1));
        let severed = envelope::decode_severed_envelope(header.envelope).unwrap();
        let original = envelope::decode_severed_envelope(&local).unwrap();
        assert_eq!(severed.manifest, original.manifest);
        assert_eq!(
            severed.authentication_wrapper,
            original.authentication_wrapper
        );

        let (slot, header) = storage.find(&class_id::APP_LOCAL_1, &mut buf).unwrap();
        assert_eq!(slot, 2);
        assert_eq!(header.class_id(), Some(&class_id::APP_LOCAL_1));
        let (slot, _) = storage.find(&class_id::APP_ROOT, &mut buf).unwrap();
        assert_eq!(slot, 0);
        assert_eq!(
            storage.find(&class_id::UNKNOWN, &mut buf).unwrap_err(),
            Error::NotFound
        );
    }

    #[test]
    fn short_buffers() {
        let mut storage = storage();
        let mut scratch = [0; 0x200];
        let local = sample_envelope(&class_id::APP_LOCAL_1);
        storage.install(0, &local, &mut scratch).unwrap();

        let mut buf = [0; 0x1ff];
        assert_eq!(
            storage.find(&class_id::APP_LOCAL_1, &mut buf).unwrap_err(),
            Error::NoMemory
        );
        assert_eq!(storage.installed(0, &mut buf), Err(Error::NoMemory));

        // A buffer larger than a slot is fine.
        let mut buf = [0; 0x300];
        let (slot, _) = storage.find(&class_id::APP_LOCAL_1, &mut buf).unwrap();
        assert_eq!(slot, 0);
    }

    #[test]
    fn corrupt_slot_is_skipped() {
        let mut storage = storage();
        let mut scratch = [0; 0x200];
        let local = sample_envelope(&class_id::APP_LOCAL_1);
        storage.install(2, &local, &mut scratch).unwrap();

        // An empty map where slot 0's record should be.
        let mut bytes = storage.into_inner().into_inner();
        bytes[0] = 0xa0;
        let storage =
            Storage::new(RamMut::with_geometry(bytes, MRAM), LAYOUT).unwrap();

        let mut buf = [0; 0x200];
        assert_eq!(storage.installed(0, &mut buf), Err(Error::CborDecoding));
        let (slot, _) = storage.find(&class_id::APP_LOCAL_1, &mut buf).unwrap();
        assert_eq!(slot, 2);
    }

    #[test]
    fn empty_and_cleared_slots() {
        let mut storage = storage();
        let mut scratch = [0; 0x200];
        let mut buf = [0; 0x200];
        assert_eq!(storage.installed(1, &mut buf), Err(Error::NotFound));

        let root = sample_envelope(&class_id::APP_ROOT);
        storage.install(1, &root, &mut scratch).unwrap();
        assert!(storage.installed(1, &mut buf).is_ok());
        storage.clear(1).unwrap();
        assert_eq!(storage.installed(1, &mut buf), Err(Error::NotFound));

        let flash = storage.into_inner();
        assert!(flash.as_bytes().iter().all(|&b| b == 0xff));
    }

    #[test]
    fn reinstall_replaces() {
        let mut storage = storage();
        let mut scratch = [0; 0x200];
        let mut buf = [0; 0x200];
        storage
            .install(3, &sample_envelope(&class_id::APP_ROOT), &mut scratch)
            .unwrap();
        storage
            .install(3, &sample_envelope(&class_id::RAD_LOCAL_1), &mut scratch)
            .unwrap();
        let header = storage.installed(3, &mut buf).unwrap();
        assert_eq!(header.class_id(), Some(&class_id::RAD_LOCAL_1));
        assert_eq!(
            storage.find(&class_id::APP_ROOT, &mut buf).unwrap_err(),
            Error::NotFound
        );
    }

    #[test]
    fn install_errors() {
        let mut storage = storage();
        let root = sample_envelope(&class_id::APP_ROOT);

        let mut scratch = [0; 0x200];
        assert_eq!(
            storage.install(4, &root, &mut scratch),
            Err(Error::InvalidArgument)
        );

        let mut small = [0; 16];
        assert_eq!(
            storage.install(0, &root, &mut small),
            Err(Error::NoMemory)
        );

        assert_eq!(
            storage.install(0, &root[..root.len() - 2], &mut scratch),
            Err(Error::CborDecoding)
        );

        // Nothing was written by the failed attempts.
        let mut buf = [0; 0x200];
        assert_eq!(storage.installed(0, &mut buf), Err(Error::NotFound));
    }

    #[test]
    fn bad_layout() {
        let flash = RamMut::with_geometry(vec![0xff; 0x800], MRAM);
        let layout = Layout {
            slot_size: 0x108,
            slots: 2,
        };
        assert!(Storage::new(flash, layout).is_err());

        let flash = RamMut::with_geometry(vec![0xff; 0x800], MRAM);
        let layout = Layout {
            slot_size: 0x400,
            slots: 3,
        };
        assert!(Storage::new(flash, layout).is_err());
    }
}
