// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Fuzz tests for the envelope decoder used when installing a candidate.

#![no_main]

use libfuzzer_sys::fuzz_target;

use suitcase::envelope;
use suitcase::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let severed = match envelope::decode_severed_envelope(data) {
        Ok(severed) => severed,
        Err(_) => return,
    };
    let _ = envelope::decode_manifest_class_id(severed.manifest_component_id);

    let mut buf = vec![0; data.len() + 16];
    let mut cursor = Cursor::new(&mut buf);

    // Stored records carry 16-bit lengths; longer parts must be refused.
    let limit = u16::MAX as usize;
    if severed.authentication_wrapper.len() > limit
        || severed.manifest.len() > limit
    {
        assert!(envelope::encode_severed(&severed, &mut cursor).is_err());
        return;
    }

    // Re-encoding must decode to the same parts.
    let len = envelope::encode_severed(&severed, &mut cursor)
        .expect("decoded envelope failed to re-encode");
    let decoded = envelope::decode_severed_envelope(&buf[..len]).unwrap();
    assert_eq!(decoded.authentication_wrapper, severed.authentication_wrapper);
    assert_eq!(decoded.manifest, severed.manifest);
});
