// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! CBOR parsing and header encoding.
//!
//! This is not a complete CBOR parser, since we do not parse any CBOR not
//! needed for SUIT envelopes and the records `suitcase` persists. We also
//! reject all CBOR that is not encoded according to S4.2.1 "Core
//! Deterministic Encoding Requirements". Concisely:
//! - No floats, bools, null, or undefined. Tags are permitted.
//! - All map keys are strings or ints.
//! - All map keys are ordered lexicographically.
//!
//! Currently, this parser rejects 64-bit integers, since there is no reason
//! to encounter them in our regime, and helps cut down on code size.
//!
//! The writer half of this module only emits the handful of headers the
//! storage layer needs; arguments above 16 bits are refused.
//!
//! See: https://datatracker.ietf.org/doc/html/rfc8949

use core::cmp::Ord;
use core::cmp::Ordering;
use core::cmp::PartialOrd;
use core::convert::TryInto as _;

use crate::io;
use crate::io::Write;

#[cfg(test)]
#[macro_use]
mod macros;

#[cfg(test)]
mod test;

/// A CBOR error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates that the input was not CBOR we are willing to accept,
    /// including truncated input.
    BadEncoding,
    /// Indicates that the output buffer was too small to hold an encoding.
    BufferTooSmall,
    /// Indicates that a value could not be encoded in 16 bits.
    OutOfRange,
}

impl From<untrusted::EndOfInput> for Error {
    fn from(_: untrusted::EndOfInput) -> Self {
        Error::BadEncoding
    }
}

impl From<io::Error> for Error {
    fn from(_: io::Error) -> Self {
        Error::BufferTooSmall
    }
}

/// Major type 0, an unsigned integer.
pub const MAJOR_UINT: u8 = 0b000_00000;
/// Major type 2, a byte string.
pub const MAJOR_BSTR: u8 = 0b010_00000;
/// Major type 4, an array.
pub const MAJOR_ARRAY: u8 = 0b100_00000;
/// Major type 5, a map.
pub const MAJOR_MAP: u8 = 0b101_00000;
/// Major type 6, a tag.
pub const MAJOR_TAG: u8 = 0b110_00000;

/// The maximum nesting depth [`Item::ignore()`] will descend into.
const MAX_DEPTH: usize = 16;

// NOTE: the orderings of fields in `Int` and `Scalar` are significant, because
// they ensure that the generated derive(Ord) implementation is consistent with
// bytewise lexicographic ordering. This is enforced by a test.

/// A CBOR 33-bit integer.
///
/// CBOR integers are a weird sign-and-magnitude thing where they map onto
/// N+1-bit integers.
// When the bool part is `false`, the value is just the `u32` part; when it's
// `true`, the value is `-n-1`, where n is the `u32` part.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Int(bool, u32);

impl Int {
    /// Creates a non-negative `Int`.
    pub const fn from_u32(n: u32) -> Self {
        Int(false, n)
    }

    /// Creates an `Int` of either sign.
    pub const fn from_i32(n: i32) -> Self {
        if n >= 0 {
            Int(false, n as u32)
        } else {
            Int(true, -(n + 1) as u32)
        }
    }

    /// Returns the value of this `Int`, if it is non-negative.
    pub fn as_u32(self) -> Option<u32> {
        match self {
            Int(false, n) => Some(n),
            Int(true, _) => None,
        }
    }
}

impl From<u32> for Int {
    fn from(n: u32) -> Self {
        Int::from_u32(n)
    }
}

impl From<i32> for Int {
    fn from(n: i32) -> Self {
        Int::from_i32(n)
    }
}

/// A scalar value, e.g., once which does not require recursing into the
/// parser.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Scalar<'input> {
    /// An integer.
    Int(Int),
    /// A byte string.
    Bytes(&'input [u8]),
    /// A text string.
    Utf8(&'input str),
}

impl PartialOrd for Scalar<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// NOTE: This needs to be implemented manually, since Rust defines slice
// equality such that "aa" > "z", even though "z" < "aa" in deterministic
// CBOR.
impl Ord for Scalar<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        use Scalar::*;
        match (self, other) {
            (Int(a), Int(b)) => Ord::cmp(a, b),
            (Int(_), _) => Ordering::Less,
            (_, Int(_)) => Ordering::Greater,

            (Utf8(a), Utf8(b)) => {
                Ord::cmp(&a.len(), &b.len()).then_with(|| Ord::cmp(a, b))
            }
            (Utf8(_), _) => Ordering::Less,
            (_, Utf8(_)) => Ordering::Greater,

            (Bytes(a), Bytes(b)) => {
                Ord::cmp(&a.len(), &b.len()).then_with(|| Ord::cmp(a, b))
            }
        }
    }
}

impl From<Int> for Scalar<'_> {
    fn from(i: Int) -> Self {
        Self::Int(i)
    }
}

impl From<u32> for Scalar<'_> {
    fn from(n: u32) -> Self {
        Self::Int(n.into())
    }
}

/// A CBOR item, which can be a [`Scalar`], an [`Array`], a [`Map`] or a
/// [`Tagged`] item.
#[must_use = "parsing will not be driven to completion without consuming \
this value"]
pub enum Item<'input, 'reader> {
    /// A scalar.
    Scalar(Scalar<'input>),
    /// An array, whose elements have not been parsed yet.
    Array(Array<'input, 'reader>),
    /// A map, whose entries have not been parsed yet.
    Map(Map<'input, 'reader>),
    /// A tag, whose content has not been parsed yet.
    Tagged(Tagged<'input, 'reader>),
}

impl<'i, 'r> Item<'i, 'r> {
    /// Parses a single CBOR item.
    pub fn parse(buf: &'r mut untrusted::Reader<'i>) -> Result<Self, Error> {
        let initial = buf.read_byte()?;

        // Pull out the "argument", which is at most four following bytes.
        // For determinism, we *require* that the minimal encoding is used.
        let argument = match initial & 0b00011111 {
            b @ 0..=23 => b as u32,

            24 => {
                let n = buf.read_byte()?;
                if n < 24 {
                    return Err(Error::BadEncoding);
                }

                n as u32
            }

            25 => {
                let slice = buf.read_bytes(2)?.as_slice_less_safe();
                let bytes: [u8; 2] =
                    slice.try_into().map_err(|_| Error::BadEncoding)?;

                let n = u16::from_be_bytes(bytes);
                if n <= u8::MAX as u16 {
                    return Err(Error::BadEncoding);
                }

                n as u32
            }

            26 => {
                let slice = buf.read_bytes(4)?.as_slice_less_safe();
                let bytes: [u8; 4] =
                    slice.try_into().map_err(|_| Error::BadEncoding)?;

                let n = u32::from_be_bytes(bytes);
                if n <= u16::MAX as u32 {
                    return Err(Error::BadEncoding);
                }

                n
            }

            // 27 is 64-bit integers, which we don't handle currently;
            // 28-30 are reserved;
            // 31 is indefinite-length encoding, which is banned.
            _ => return Err(Error::BadEncoding),
        };

        match initial >> 5 {
            sign @ 0..=1 => {
                Ok(Item::Scalar(Scalar::Int(Int(sign == 1, argument))))
            }
            2 => Ok(Item::Scalar(Scalar::Bytes(
                buf.read_bytes(argument as usize)?.as_slice_less_safe(),
            ))),
            3 => {
                let bytes =
                    buf.read_bytes(argument as usize)?.as_slice_less_safe();
                Ok(Item::Scalar(Scalar::Utf8(
                    core::str::from_utf8(bytes)
                        .map_err(|_| Error::BadEncoding)?,
                )))
            }
            4 => Ok(Item::Array(Array { buf, len: argument })),
            5 => Ok(Item::Map(Map {
                buf,
                len: argument,
                prev_key: None,
                current_key: None,
            })),
            6 => Ok(Item::Tagged(Tagged { buf, tag: argument })),
            _ => Err(Error::BadEncoding),
        }
    }

    /// Folds this item into an [`Int`].
    pub fn into_int(self) -> Result<Int, Error> {
        match self {
            Item::Scalar(Scalar::Int(i)) => Ok(i),
            _ => Err(Error::BadEncoding),
        }
    }

    /// Folds this item into a non-negative integer.
    pub fn into_u32(self) -> Result<u32, Error> {
        self.into_int()?.as_u32().ok_or(Error::BadEncoding)
    }

    /// Folds this item into a UTF-8 string.
    pub fn into_utf8(self) -> Result<&'i str, Error> {
        match self {
            Item::Scalar(Scalar::Utf8(b)) => Ok(b),
            _ => Err(Error::BadEncoding),
        }
    }

    /// Folds this item into a byte string.
    pub fn into_bytes(self) -> Result<&'i [u8], Error> {
        match self {
            Item::Scalar(Scalar::Bytes(b)) => Ok(b),
            _ => Err(Error::BadEncoding),
        }
    }

    /// Folds this item into a byte string and recurses into it for reading
    /// more CBOR.
    ///
    /// The byte string must be consumed completely by `f`.
    pub fn read_all<R>(
        self,
        f: impl FnOnce(&mut untrusted::Reader<'i>) -> Result<R, Error>,
    ) -> Result<R, Error> {
        untrusted::Input::from(self.into_bytes()?)
            .read_all(Error::BadEncoding, f)
    }

    /// Folds this item into an [`Array`].
    pub fn into_array(self) -> Result<Array<'i, 'r>, Error> {
        match self {
            Item::Array(a) => Ok(a),
            _ => Err(Error::BadEncoding),
        }
    }

    /// Folds this item into a [`Map`].
    pub fn into_map(self) -> Result<Map<'i, 'r>, Error> {
        match self {
            Item::Map(m) => Ok(m),
            _ => Err(Error::BadEncoding),
        }
    }

    /// Folds this item into a [`Tagged`] item, checking that it carries
    /// `tag`.
    pub fn into_tagged(self, tag: u32) -> Result<Tagged<'i, 'r>, Error> {
        match self {
            Item::Tagged(t) if t.tag == tag => Ok(t),
            _ => Err(Error::BadEncoding),
        }
    }

    /// Ignores this element, driving its internal state to completion.
    pub fn ignore(self) -> Result<(), Error> {
        self.ignore_at(0)
    }

    fn ignore_at(self, depth: usize) -> Result<(), Error> {
        if depth > MAX_DEPTH {
            return Err(Error::BadEncoding);
        }
        match self {
            Item::Array(a) => a.with(|e| e.ignore_at(depth + 1)),
            Item::Map(m) => {
                let mut walker = MapWalker {
                    map: m,
                    last_get: None,
                };
                walker.with(|(_, v)| v.ignore_at(depth + 1))
            }
            Item::Tagged(t) => t.into_item()?.ignore_at(depth + 1),
            Item::Scalar(_) => Ok(()),
        }
    }
}

/// Skips over exactly one item in `buf`, returning its complete encoding.
///
/// This is the basis of the skip-based scans used to locate an entry
/// without decoding everything around it.
pub fn skip<'i>(buf: &mut untrusted::Reader<'i>) -> Result<&'i [u8], Error> {
    let (raw, ()) = buf.read_partial(|r| Item::parse(r)?.ignore())?;
    Ok(raw.as_slice_less_safe())
}

// NOTE: Array and Map cannot be iterators, because the result value needs to
// capture the &mut self lifetime.

/// A CBOR array.
///
/// The `with()` function should be used to drive parsing forward.
#[must_use = "parsing will not be driven to completion without calling `with()`"]
pub struct Array<'input, 'reader> {
    buf: &'reader mut untrusted::Reader<'input>,
    len: u32,
}

impl<'i, 'r> Array<'i, 'r> {
    /// Returns the number of elements in this array.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Returns whether this array is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Runs `body` on each item in the array until completion or parse failure.
    pub fn with(
        self,
        mut body: impl FnMut(Item<'i, '_>) -> Result<(), Error>,
    ) -> Result<(), Error> {
        for _ in 0..self.len {
            body(Item::parse(&mut *self.buf)?)?
        }
        Ok(())
    }
}

/// A CBOR tag, such as the tag that introduces a SUIT envelope.
#[must_use = "parsing will not be driven to completion without calling \
`into_item()`"]
pub struct Tagged<'input, 'reader> {
    buf: &'reader mut untrusted::Reader<'input>,
    tag: u32,
}

impl<'i, 'r> Tagged<'i, 'r> {
    /// Returns the tag number.
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Parses the item this tag applies to.
    pub fn into_item(self) -> Result<Item<'i, 'r>, Error> {
        Item::parse(self.buf)
    }
}

/// A CBOR map.
///
/// Because maps are not random-access, they need to be *walked* using the
/// `walk()` function, which returns a sort of iterator that can be used to
/// retrieve mappings.
///
/// Because CBOR maps' keys are ordered, it is possible to request keys
/// one-by-one in lexicographic order, making parsing much closer to something
/// like DER.
#[must_use = "parsing will not be driven to completion without calling `walk()`"]
pub struct Map<'input, 'reader> {
    buf: &'reader mut untrusted::Reader<'input>,
    len: u32,
    prev_key: Option<Scalar<'input>>,
    current_key: Option<Scalar<'input>>,
}

impl<'i, 'r> Map<'i, 'r> {
    /// Returns the number of entries left in this map.
    pub fn len(&self) -> u32 {
        self.len + self.current_key.is_some() as u32
    }

    /// Returns whether there are no entries left in this map.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn peek(&mut self) -> Result<Option<Scalar<'i>>, Error> {
        if let Some(key) = self.current_key {
            return Ok(Some(key));
        }

        if self.len == 0 {
            return Ok(None);
        }
        self.len -= 1;

        let k = match Item::parse(&mut *self.buf) {
            Ok(Item::Scalar(i @ Scalar::Int { .. })) => i,
            Ok(Item::Scalar(s @ Scalar::Utf8(..))) => s,
            _ => return Err(Error::BadEncoding),
        };

        // Map key encodings must be in lexicographic order, and duplicate keys
        // are not permitted.
        if let Some(prev) = self.prev_key {
            if prev >= k {
                return Err(Error::BadEncoding);
            }
        }

        self.current_key = Some(k);
        Ok(Some(k))
    }

    /// Drive forward the parse by peeling off the next pair in the map.
    fn next(&mut self) -> Result<Option<(Scalar<'i>, Item<'i, '_>)>, Error> {
        self.peek()?;
        let k = match self.current_key.take() {
            Some(k) => k,
            None => return Ok(None),
        };

        self.prev_key = Some(k);
        Item::parse(&mut *self.buf).map(move |v| Some((k, v)))
    }

    /// Like `next()`, but skips over the value and returns its encoding.
    fn next_raw(&mut self) -> Result<Option<(Scalar<'i>, &'i [u8])>, Error> {
        self.peek()?;
        let k = match self.current_key.take() {
            Some(k) => k,
            None => return Ok(None),
        };

        self.prev_key = Some(k);
        skip(&mut *self.buf).map(move |v| Some((k, v)))
    }

    /// Starts a walk through `self`.
    pub fn walk<R>(
        self,
        mut body: impl FnMut(&mut MapWalker<'i, '_>) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let mut walker = MapWalker {
            map: self,
            last_get: None,
        };
        let val = body(&mut walker)?;
        walker.with(|(_, v)| v.ignore())?;
        Ok(val)
    }
}

/// A walker for a [`Map`].
pub struct MapWalker<'input, 'reader> {
    map: Map<'input, 'reader>,
    last_get: Option<Scalar<'input>>,
}

impl<'i, 'r> MapWalker<'i, 'r> {
    /// Steps through the [`Map`] until `key` is reached.
    ///
    /// Note that this function should not be called with a key less than the
    /// previous one.
    pub fn get(
        &mut self,
        key: impl Into<Scalar<'i>>,
    ) -> Result<Option<Item<'i, '_>>, Error> {
        if !self.seek(key.into())? {
            return Ok(None);
        }
        Ok(self.map.next()?.map(|(_, v)| v))
    }

    /// Like `get()`, but returns the complete encoding of the value instead
    /// of parsing it.
    pub fn get_raw(
        &mut self,
        key: impl Into<Scalar<'i>>,
    ) -> Result<Option<&'i [u8]>, Error> {
        if !self.seek(key.into())? {
            return Ok(None);
        }
        Ok(self.map.next_raw()?.map(|(_, v)| v))
    }

    /// Like `get()`, but failure is an encoding error.
    pub fn must_get(
        &mut self,
        key: impl Into<Scalar<'i>>,
    ) -> Result<Item<'i, '_>, Error> {
        self.get(key)?.ok_or(Error::BadEncoding)
    }

    /// Returns whether the next key in the map is exactly `key`, without
    /// skipping anything.
    ///
    /// This is used for strict decoding, where no other keys may appear
    /// before `key`.
    pub fn next_is(&mut self, key: impl Into<Scalar<'i>>) -> Result<bool, Error> {
        Ok(self.map.peek()? == Some(key.into()))
    }

    /// Advances the underlying map until the next key is `key`. Returns
    /// `false` if the key is not present.
    fn seek(&mut self, key: Scalar<'i>) -> Result<bool, Error> {
        if let Some(last) = self.last_get {
            debug_assert!(last < key, "bad key order: {:?} >= {:?}", last, key);
        }
        self.last_get = Some(key);

        while let Some(next) = self.map.peek()? {
            match Ord::cmp(&next, &key) {
                // We're still in front of `key`, keep searching.
                Ordering::Less => {
                    self.map.next()?.map(|(_, v)| v.ignore()).transpose()?;
                }
                // We found it!
                Ordering::Equal => return Ok(true),
                // We missed it, so we give up.
                Ordering::Greater => break,
            }
        }
        Ok(false)
    }

    /// Runs `body` on remaining key-value pair in the map until completion or parse
    /// failure.
    pub fn with(
        &mut self,
        mut body: impl FnMut((Scalar<'i>, Item<'i, '_>)) -> Result<(), Error>,
    ) -> Result<(), Error> {
        while let Some(pair) = self.map.next()? {
            body(pair)?
        }
        Ok(())
    }
}

/// Returns the number of bytes needed to encode a header with argument
/// `value`.
pub fn header_len(value: usize) -> Result<usize, Error> {
    match value {
        0..=23 => Ok(1),
        24..=0xff => Ok(2),
        0x100..=0xffff => Ok(3),
        _ => Err(Error::OutOfRange),
    }
}

/// Encodes a header of major type `major` with argument `value`, returning
/// the number of bytes written.
///
/// Values below 24 use one byte, values below 256 use two bytes, and values
/// up to 65535 use three bytes, with the argument in big-endian order.
/// Larger values are refused with [`Error::OutOfRange`].
pub fn encode_header(
    major: u8,
    value: usize,
    mut w: impl Write,
) -> Result<usize, Error> {
    let len = header_len(value)?;
    match len {
        1 => w.write_be(major | value as u8)?,
        2 => {
            w.write_be(major | 24)?;
            w.write_be(value as u8)?;
        }
        _ => {
            w.write_be(major | 25)?;
            w.write_be(value as u16)?;
        }
    }
    Ok(len)
}

/// Encodes an unsigned integer.
pub fn encode_uint(value: usize, w: impl Write) -> Result<usize, Error> {
    encode_header(MAJOR_UINT, value, w)
}

/// Encodes the length prefix of a byte string; the contents are expected to
/// be written immediately after.
pub fn encode_bstr_header(len: usize, w: impl Write) -> Result<usize, Error> {
    encode_header(MAJOR_BSTR, len, w)
}

/// Encodes a key/value record header: an unsigned integer key, followed by
/// the length prefix of a byte-string value.
///
/// This is the paired writer for records read back with [`MapWalker`]; it
/// returns the total number of header bytes written.
pub fn encode_kv_header(
    key: usize,
    value_len: usize,
    mut w: impl Write,
) -> Result<usize, Error> {
    let key_len = encode_uint(key, &mut w)?;
    let len_len = encode_bstr_header(value_len, &mut w)?;
    Ok(key_len + len_len)
}
