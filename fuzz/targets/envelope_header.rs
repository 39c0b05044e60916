// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Fuzz tests for the envelope storage header decoder.

#![no_main]

use libfuzzer_sys::fuzz_target;

use suitcase::envelope;
use suitcase::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let header = match envelope::decode_header(data) {
        Ok(header) => header,
        Err(_) => return,
    };

    // Anything that decodes must re-encode to a record that decodes the
    // same way.
    let mut buf = vec![0; data.len() + 16];
    let mut cursor = Cursor::new(&mut buf);
    let len = envelope::encode_header(&header, &mut cursor)
        .expect("decoded header failed to encode");
    let _ = cursor.consume(header.envelope.len()).map(|out| {
        out.copy_from_slice(header.envelope);
    });
    let reencoded = &buf[..len + header.envelope.len()];
    assert_eq!(envelope::decode_header(reencoded).unwrap(), header);
});
