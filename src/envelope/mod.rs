// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! SUIT envelope encoding, as persisted by the storage layer.
//!
//! A stored envelope is a CBOR map with three integer keys, in this order:
//! ```text
//! {
//!   0: 1,                ; version
//!   1: class_id_offset,  ; where the manifest class id sits in `envelope`
//!   2: bstr envelope,    ; a severed envelope, #6.107({2: auth, 3: manifest})
//! }
//! ```
//! Only the header of this record is ever encoded by [`encode_header()`];
//! the envelope bytes are appended right after it, so they never need to be
//! copied into a staging buffer twice.
//!
//! All lengths in stored records are limited to 16 bits.

use core::convert::TryInto as _;

use crate::cbor;
use crate::io::Write;

pub mod candidate;
pub mod storage;

/// The only supported envelope-header version.
pub const VERSION: u32 = 1;

/// The CBOR tag introducing a SUIT envelope.
pub const ENVELOPE_TAG: u32 = 107;

/// The length of a manifest class id.
pub const CLASS_ID_LEN: usize = 16;

/// The first element of the component id of an installed manifest.
pub const INSTALLED_MANIFEST_PREFIX: &[u8] = b"INSTLD_MFST";

/// Envelope map keys.
mod key {
    pub const AUTHENTICATION_WRAPPER: u32 = 2;
    pub const MANIFEST: u32 = 3;
}

/// Manifest map keys.
mod manifest_key {
    pub const COMPONENT_ID: u32 = 5;
}

/// Envelope-header map keys.
mod header_key {
    pub const VERSION: u32 = 0;
    pub const CLASS_ID_OFFSET: u32 = 1;
    pub const ENVELOPE: u32 = 2;
}

/// An envelope encoding error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates that a parameter was out of range.
    InvalidArgument,
    /// Indicates that an output buffer was too small, or that a length did
    /// not fit in 16 bits.
    NoMemory,
    /// Indicates malformed CBOR, or CBOR that does not have the expected
    /// shape.
    CborDecoding,
    /// Indicates that nothing was stored where a record was expected.
    NotFound,
    /// Indicates that the backing storage failed.
    Io,
}

impl From<cbor::Error> for Error {
    fn from(e: cbor::Error) -> Self {
        match e {
            cbor::Error::BadEncoding => Error::CborDecoding,
            cbor::Error::BufferTooSmall => Error::NoMemory,
            cbor::Error::OutOfRange => Error::InvalidArgument,
        }
    }
}

impl From<crate::io::Error> for Error {
    fn from(_: crate::io::Error) -> Self {
        Error::NoMemory
    }
}

impl From<crate::hardware::flash::Error> for Error {
    fn from(_: crate::hardware::flash::Error) -> Self {
        Error::Io
    }
}

/// A decoded envelope header.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Header<'a> {
    /// The header version; always [`VERSION`].
    pub version: u32,
    /// The offset of the manifest class id within `envelope`.
    pub class_id_offset: usize,
    /// The embedded envelope.
    pub envelope: &'a [u8],
}

impl<'a> Header<'a> {
    /// Creates a header for `envelope`.
    pub fn new(class_id_offset: usize, envelope: &'a [u8]) -> Self {
        Self {
            version: VERSION,
            class_id_offset,
            envelope,
        }
    }

    /// Returns the class id this header points at, if the envelope is long
    /// enough to hold one there.
    pub fn class_id(&self) -> Option<&'a [u8; CLASS_ID_LEN]> {
        let end = self.class_id_offset.checked_add(CLASS_ID_LEN)?;
        self.envelope.get(self.class_id_offset..end)?.try_into().ok()
    }

    /// Returns the number of bytes [`encode_header()`] writes for this
    /// header, not counting the envelope itself.
    pub fn encoded_len(&self) -> Result<usize, Error> {
        let len = 1
            + cbor::header_len(header_key::VERSION as usize)?
            + cbor::header_len(self.version as usize)?
            + cbor::header_len(header_key::CLASS_ID_OFFSET as usize)?
            + cbor::header_len(self.class_id_offset)?
            + cbor::header_len(header_key::ENVELOPE as usize)?
            + cbor::header_len(self.envelope.len())?;
        Ok(len)
    }
}

/// Encodes the envelope header `header` into `w`, returning the number of
/// bytes written.
///
/// The bytes of `header.envelope` must be written immediately after. The
/// envelope's own "tag 107, map(2)" preamble is not written here; it is the
/// first thing [`encode_severed()`] writes, so a record is this header
/// followed by the output of [`encode_severed()`].
pub fn encode_header(header: &Header, mut w: impl Write) -> Result<usize, Error> {
    check!(header.version == VERSION, Error::InvalidArgument);
    check!(
        header.class_id_offset >= 1
            && header.class_id_offset <= header.envelope.len(),
        Error::InvalidArgument
    );
    // Lengths that do not fit the record format are a capacity problem.
    let map_err = |e: cbor::Error| match e {
        cbor::Error::OutOfRange => fail!(Error::NoMemory),
        e => Error::from(e),
    };

    let mut len = cbor::encode_header(cbor::MAJOR_MAP, 3, &mut w)
        .map_err(map_err)?;
    len += cbor::encode_uint(header_key::VERSION as usize, &mut w)
        .map_err(map_err)?;
    len +=
        cbor::encode_uint(header.version as usize, &mut w).map_err(map_err)?;
    len += cbor::encode_uint(header_key::CLASS_ID_OFFSET as usize, &mut w)
        .map_err(map_err)?;
    len += cbor::encode_uint(header.class_id_offset, &mut w)
        .map_err(map_err)?;
    len += cbor::encode_kv_header(
        header_key::ENVELOPE as usize,
        header.envelope.len(),
        &mut w,
    )
    .map_err(map_err)?;
    Ok(len)
}

/// Decodes an envelope header from the start of `buf`.
///
/// Decoding is strict: the map must contain exactly the three header keys,
/// in order, with the supported version. Bytes after the record are
/// ignored, since records usually sit at the start of a larger slot.
pub fn decode_header(buf: &[u8]) -> Result<Header<'_>, Error> {
    fn strict_u16(item: cbor::Item) -> Result<usize, cbor::Error> {
        match item.into_u32()? {
            n if n <= u16::MAX as u32 => Ok(n as usize),
            _ => Err(cbor::Error::BadEncoding),
        }
    }

    let mut r = untrusted::Reader::new(untrusted::Input::from(buf));
    let map = cbor::Item::parse(&mut r)?.into_map()?;
    check!(map.len() == 3, Error::CborDecoding);

    let header = map.walk(|m| {
        if !m.next_is(header_key::VERSION)? {
            return Err(cbor::Error::BadEncoding);
        }
        let version = m.must_get(header_key::VERSION)?.into_u32()?;

        if !m.next_is(header_key::CLASS_ID_OFFSET)? {
            return Err(cbor::Error::BadEncoding);
        }
        let class_id_offset =
            strict_u16(m.must_get(header_key::CLASS_ID_OFFSET)?)?;

        if !m.next_is(header_key::ENVELOPE)? {
            return Err(cbor::Error::BadEncoding);
        }
        let envelope = m.must_get(header_key::ENVELOPE)?.into_bytes()?;

        Ok(Header {
            version,
            class_id_offset,
            envelope,
        })
    })?;

    check!(header.version == VERSION, Error::CborDecoding);
    check!(header.envelope.len() <= u16::MAX as usize, Error::CborDecoding);
    check!(
        header.class_id_offset >= 1
            && header.class_id_offset <= header.envelope.len(),
        Error::CborDecoding
    );
    Ok(header)
}

/// Encodes a key/value record header: an unsigned integer `key`, followed by
/// a byte-string length prefix for `value_len` bytes.
///
/// This is the writer paired with [`decode_header()`]. Lengths above 65535
/// fail with [`Error::InvalidArgument`].
pub fn encode_kv_header(
    key: u32,
    value_len: usize,
    w: impl Write,
) -> Result<usize, Error> {
    Ok(cbor::encode_kv_header(key as usize, value_len, w)?)
}

/// The parts of a severed envelope that the storage layer keeps.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Severed<'a> {
    /// The encoded authentication wrapper.
    pub authentication_wrapper: &'a [u8],
    /// The encoded manifest.
    pub manifest: &'a [u8],
    /// The encoded manifest component id, a sub-slice of `manifest`; empty if
    /// the manifest has none.
    pub manifest_component_id: &'a [u8],
}

impl<'a> Severed<'a> {
    /// Returns the number of bytes [`encode_severed()`] will write.
    pub fn encoded_len(&self) -> Result<usize, Error> {
        let len = cbor::header_len(ENVELOPE_TAG as usize)?
            + cbor::header_len(2)?
            + cbor::header_len(key::AUTHENTICATION_WRAPPER as usize)?
            + cbor::header_len(self.authentication_wrapper.len())?
            + self.authentication_wrapper.len()
            + cbor::header_len(key::MANIFEST as usize)?
            + cbor::header_len(self.manifest.len())?
            + self.manifest.len();
        Ok(len)
    }

    /// Returns the offset of the manifest within the output of
    /// [`encode_severed()`].
    pub fn manifest_offset(&self) -> Result<usize, Error> {
        Ok(self.encoded_len()? - self.manifest.len())
    }
}

/// Decodes a tagged SUIT envelope, keeping the authentication wrapper and the
/// manifest.
///
/// Other envelope members, such as severable command sequences and
/// integrated payloads, are skipped. The manifest component id is located
/// without decoding the rest of the manifest.
pub fn decode_severed_envelope(buf: &[u8]) -> Result<Severed<'_>, Error> {
    let mut r = untrusted::Reader::new(untrusted::Input::from(buf));
    let (authentication_wrapper, manifest) = cbor::Item::parse(&mut r)?
        .into_tagged(ENVELOPE_TAG)?
        .into_item()?
        .into_map()?
        .walk(|m| {
            let auth = m.must_get(key::AUTHENTICATION_WRAPPER)?.into_bytes()?;
            let manifest = m.must_get(key::MANIFEST)?.into_bytes()?;
            Ok((auth, manifest))
        })?;

    let manifest_component_id = untrusted::Input::from(manifest)
        .read_all(cbor::Error::BadEncoding, |r| {
            cbor::Item::parse(r)?.into_map()?.walk(|m| {
                Ok(m.get_raw(manifest_key::COMPONENT_ID)?.unwrap_or(&[]))
            })
        })?;
    if manifest_component_id.is_empty() {
        warn!("manifest has no component id");
    }

    Ok(Severed {
        authentication_wrapper,
        manifest,
        manifest_component_id,
    })
}

/// Encodes `severed` as a minimal tagged envelope holding only its
/// authentication wrapper and manifest, returning the number of bytes
/// written.
pub fn encode_severed(severed: &Severed, mut w: impl Write) -> Result<usize, Error> {
    let mut len =
        cbor::encode_header(cbor::MAJOR_TAG, ENVELOPE_TAG as usize, &mut w)?;
    len += cbor::encode_header(cbor::MAJOR_MAP, 2, &mut w)?;

    len += encode_kv_header(
        key::AUTHENTICATION_WRAPPER,
        severed.authentication_wrapper.len(),
        &mut w,
    )?;
    w.write_bytes(severed.authentication_wrapper)?;
    len += severed.authentication_wrapper.len();

    len += encode_kv_header(key::MANIFEST, severed.manifest.len(), &mut w)?;
    w.write_bytes(severed.manifest)?;
    len += severed.manifest.len();
    Ok(len)
}

/// Extracts the manifest class id from the component id of an installed
/// manifest, `[bstr "INSTLD_MFST", bstr class_id]`.
///
/// The returned class id is a sub-slice of `component_id`.
pub fn decode_manifest_class_id(
    component_id: &[u8],
) -> Result<&[u8; CLASS_ID_LEN], Error> {
    let class_id = untrusted::Input::from(component_id).read_all(
        cbor::Error::BadEncoding,
        |r| {
            let array = cbor::Item::parse(r)?.into_array()?;
            if array.len() != 2 {
                return Err(cbor::Error::BadEncoding);
            }

            let mut prefix_ok = false;
            let mut class_id = None;
            array.with(|item| {
                let bytes = item.into_bytes()?;
                if !prefix_ok {
                    prefix_ok = bytes == INSTALLED_MANIFEST_PREFIX;
                    if !prefix_ok {
                        return Err(cbor::Error::BadEncoding);
                    }
                } else {
                    class_id = Some(bytes);
                }
                Ok(())
            })?;
            class_id.ok_or(cbor::Error::BadEncoding)
        },
    )?;

    class_id.try_into().map_err(|_| fail!(Error::CborDecoding))
}

/// Returns the offset of `inner` within `outer`, if `inner` is a sub-slice
/// of it.
pub(crate) fn offset_within(outer: &[u8], inner: &[u8]) -> Option<usize> {
    let outer = outer.as_ptr_range();
    let inner_range = inner.as_ptr_range();
    if inner_range.start < outer.start || inner_range.end > outer.end {
        return None;
    }
    Some(inner_range.start as usize - outer.start as usize)
}
