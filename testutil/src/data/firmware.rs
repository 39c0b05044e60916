// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Synthetic firmware images.

/// Generates `len` bytes of deterministic, moderately compressible data
/// that looks somewhat like Thumb code.
///
/// The same `seed` always yields the same image.
pub fn image(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed | 1;
    let mut next = move || {
        // xorshift32
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };

    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let r = next();
        match r % 4 {
            // A BL instruction with a small, positive offset.
            0 => {
                let offset = (r >> 8) & 0x7ff;
                out.extend_from_slice(&[
                    0x00,
                    0xf0,
                    offset as u8,
                    0xf8 | ((offset >> 8) as u8 & 0x07),
                ]);
            }
            // A run of zeroes, as found in padding and tables.
            1 => out.extend_from_slice(&[0; 8]),
            // Some repetitive text.
            2 => out.extend_from_slice(b"suit-fw "),
            _ => out.extend_from_slice(&r.to_le_bytes()),
        }
    }
    out.truncate(len);
    out
}
