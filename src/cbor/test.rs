// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

use pretty_assertions::assert_eq;

use super::*;
use crate::io::Cursor;

fn parse_with<'i, R>(
    bytes: &'i [u8],
    f: impl FnOnce(Item<'i, '_>) -> Result<R, Error>,
) -> Result<R, Error> {
    untrusted::Input::from(bytes)
        .read_all(Error::BadEncoding, |r| f(Item::parse(r)?))
}

#[test]
fn scalar_ordering() {
    let mut scalars = [
        Scalar::Utf8("aa"),
        Scalar::Utf8("z"),
        Scalar::Int(Int::from_i32(-1)),
        Scalar::Int(Int::from_u32(24)),
        Scalar::Int(Int::from_u32(1)),
    ];
    scalars.sort();

    // Map keys are only ever ints or text; compare against the bytewise
    // ordering of their encodings.
    let mut encoded = scalars
        .iter()
        .map(|s| match s {
            Scalar::Int(i) => match i.as_u32() {
                Some(n) => raw_cbor!(0:(n as u64)),
                None => raw_cbor!(1:0),
            },
            Scalar::Utf8(s) => raw_cbor!(3 { s }),
            Scalar::Bytes(_) => unreachable!(),
        })
        .collect::<Vec<_>>();
    let sorted = encoded.clone();
    encoded.sort();
    assert_eq!(encoded, sorted);
}

#[test]
fn reject_non_minimal() {
    for bytes in &[
        raw_cbor!(0@1:5),
        raw_cbor!(0@2:200),
        raw_cbor!(0@4:0xffff),
        raw_cbor!(2@1:0),
    ] {
        assert_eq!(
            parse_with(bytes, |i| i.ignore()),
            Err(Error::BadEncoding),
            "{:x?}",
            bytes
        );
    }
}

#[test]
fn reject_floats_and_indefinite() {
    // 1.0f16, `true` and an indefinite-length array.
    for bytes in &[vec![0xf9, 0x3c, 0x00], vec![0xf5], vec![0x9f, 0xff]] {
        assert_eq!(
            parse_with(bytes, |i| i.ignore()),
            Err(Error::BadEncoding)
        );
    }
}

#[test]
fn reject_unordered_keys() {
    let bytes = raw_cbor!(5[0:2 0:0, 0:1 0:0,]);
    let result = parse_with(&bytes, |i| i.into_map()?.walk(|_| Ok(())));
    assert_eq!(result, Err(Error::BadEncoding));

    let dup = raw_cbor!(5[0:1 0:0, 0:1 0:0,]);
    let result = parse_with(&dup, |i| i.into_map()?.walk(|_| Ok(())));
    assert_eq!(result, Err(Error::BadEncoding));
}

#[test]
fn walk_map() {
    let bytes = raw_cbor!(5[
        0:1 0:7,
        0:3 2{ "abc" },
        0:5 4[ 0:1, 0:2, ],
        3{ "x" } 0:9,
    ]);

    let (a, b, raw) = parse_with(&bytes, |i| {
        i.into_map()?.walk(|m| {
            let a = m.must_get(1)?.into_u32()?;
            // Key 2 is absent; this must not consume key 3.
            assert!(m.get(2)?.is_none());
            let b = m.must_get(3)?.into_bytes()?;
            let raw = m.get_raw(5)?;
            Ok((a, b, raw))
        })
    })
    .unwrap();

    assert_eq!(a, 7);
    assert_eq!(b, b"abc");
    assert_eq!(raw, Some(&raw_cbor!(4[0:1, 0:2,])[..]));
}

#[test]
fn tagged() {
    let bytes = raw_cbor!(6:107 4[0:1,]);
    parse_with(&bytes, |i| {
        let t = i.into_tagged(107)?;
        assert_eq!(t.tag(), 107);
        t.into_item()?.into_array()?.with(|e| {
            assert_eq!(e.into_u32()?, 1);
            Ok(())
        })
    })
    .unwrap();

    assert!(parse_with(&bytes, |i| i.into_tagged(18).map(|_| ())).is_err());
}

#[test]
fn skip_returns_encoding() {
    let bytes = raw_cbor!(4[2{ "ab" }, 6:24 0:3,] 0:1);
    untrusted::Input::from(&bytes)
        .read_all(Error::BadEncoding, |r| {
            let raw = skip(r)?;
            assert_eq!(raw, &bytes[..bytes.len() - 1]);
            assert_eq!(Item::parse(r)?.into_u32()?, 1);
            Ok(())
        })
        .unwrap();
}

#[test]
fn deep_nesting() {
    let mut bytes = vec![0x81; 64];
    bytes.push(0x00);
    assert_eq!(parse_with(&bytes, |i| i.ignore()), Err(Error::BadEncoding));
}

#[test]
fn truncated() {
    let bytes = raw_cbor!(2{ "abcdef" });
    assert_eq!(
        parse_with(&bytes[..4], |i| i.into_bytes().map(|_| ())),
        Err(Error::BadEncoding)
    );
}

#[test]
fn kv_header_sizes() {
    let cases: &[(usize, &[u8])] = &[
        (0, &[0x02, 0x40]),
        (1, &[0x02, 0x41]),
        (22, &[0x02, 0x56]),
        (23, &[0x02, 0x57]),
        (24, &[0x02, 0x58, 24]),
        (25, &[0x02, 0x58, 25]),
        (254, &[0x02, 0x58, 0xfe]),
        (255, &[0x02, 0x58, 0xff]),
        (256, &[0x02, 0x59, 0x01, 0x00]),
        (65534, &[0x02, 0x59, 0xff, 0xfe]),
        (65535, &[0x02, 0x59, 0xff, 0xff]),
    ];

    for &(len, expected) in cases {
        let mut buf = [0; 8];
        let mut cursor = Cursor::new(&mut buf);
        let size = encode_kv_header(2, len, &mut cursor).unwrap();
        assert_eq!(size, expected.len(), "len = {}", len);
        assert_eq!(cursor.take_consumed_bytes(), expected, "len = {}", len);
    }
}

#[test]
fn kv_header_too_long() {
    let mut buf = [0; 8];
    let mut cursor = Cursor::new(&mut buf);
    assert_eq!(
        encode_kv_header(2, 65536, &mut cursor),
        Err(Error::OutOfRange)
    );
}

#[test]
fn kv_header_no_room() {
    let mut buf = [0; 2];
    let mut cursor = Cursor::new(&mut buf);
    assert_eq!(
        encode_kv_header(2, 300, &mut cursor),
        Err(Error::BufferTooSmall)
    );
}

#[test]
fn written_headers_parse_back() {
    let mut buf = [0; 8];
    let mut cursor = Cursor::new(&mut buf);
    encode_uint(1000, &mut cursor).unwrap();
    let bytes = cursor.take_consumed_bytes();
    assert_eq!(parse_with(bytes, |i| i.into_u32()), Ok(1000));
}
