// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! ARM Thumb branch conversion.
//!
//! Thumb `BL` instructions encode a PC-relative target. Rewriting them to
//! absolute targets before compression makes calls to the same function
//! look identical, which compresses much better. This module converts in
//! both directions; decompression only ever needs [`Direction::Decode`].

use arrayvec::ArrayVec;

/// Which way to convert branch targets.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Direction {
    /// Relative to absolute.
    Encode,
    /// Absolute to relative.
    Decode,
}

/// Converts every complete `BL` instruction in `buf`, which begins at
/// stream offset `pos`.
///
/// Returns how many bytes of `buf` were fully processed; the remaining
/// (at most three) bytes might begin an instruction that continues past the
/// end of `buf`, and should be presented again with more data.
pub fn convert(buf: &mut [u8], pos: u32, dir: Direction) -> usize {
    if buf.len() < 4 {
        return 0;
    }

    let mut i = 0;
    while i <= buf.len() - 4 {
        if buf[i + 1] & 0xf8 != 0xf0 || buf[i + 3] & 0xf8 != 0xf8 {
            i += 2;
            continue;
        }

        let src = (((buf[i + 1] as u32 & 0x7) << 19)
            | ((buf[i] as u32) << 11)
            | ((buf[i + 3] as u32 & 0x7) << 8)
            | buf[i + 2] as u32)
            << 1;
        let here = pos.wrapping_add(i as u32 + 4);
        let dest = match dir {
            Direction::Encode => here.wrapping_add(src),
            Direction::Decode => src.wrapping_sub(here),
        } >> 1;

        buf[i + 1] = 0xf0 | ((dest >> 19) & 0x7) as u8;
        buf[i] = (dest >> 11) as u8;
        buf[i + 3] = 0xf8 | ((dest >> 8) & 0x7) as u8;
        buf[i + 2] = dest as u8;
        i += 4;
    }
    i
}

/// A streaming [`convert()`], which carries incomplete instructions over
/// from one chunk to the next.
#[derive(Clone, Debug)]
pub struct Filter {
    dir: Direction,
    pos: u32,
    carry: ArrayVec<u8, 3>,
}

impl Filter {
    /// The most bytes a [`Filter`] ever holds back.
    pub const MAX_CARRY: usize = 3;

    /// Creates a filter for a stream starting at offset zero.
    pub fn new(dir: Direction) -> Self {
        Self {
            dir,
            pos: 0,
            carry: ArrayVec::new(),
        }
    }

    /// Returns the number of bytes currently held back.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// Converts `chunk`, prefixed with whatever was held back, in `work`,
    /// returning the converted bytes that are ready.
    ///
    /// `work` must have room for `chunk` plus [`Filter::MAX_CARRY`] bytes.
    pub fn process<'w>(
        &mut self,
        chunk: &[u8],
        work: &'w mut [u8],
    ) -> Option<&'w [u8]> {
        let len = self.carry.len() + chunk.len();
        let work = work.get_mut(..len)?;
        let (head, tail) = work.split_at_mut(self.carry.len());
        head.copy_from_slice(&self.carry);
        tail.copy_from_slice(chunk);

        let done = convert(work, self.pos, self.dir);
        self.pos = self.pos.wrapping_add(done as u32);
        self.carry.clear();
        // `convert()` stops less than four bytes from the end.
        self.carry.extend(work[done..].iter().copied());

        Some(&work[..done])
    }

    /// Ends the stream, returning the bytes still held back, which are
    /// never part of a complete instruction.
    pub fn finish(&mut self) -> ArrayVec<u8, 3> {
        self.pos = self.pos.wrapping_add(self.carry.len() as u32);
        core::mem::take(&mut self.carry)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use testutil::data::firmware;

    #[test]
    fn absolute_targets() {
        // Calls to 0x100 from 0x10 and from 0x20.
        let mut code = vec![0u8; 0x30];
        code[0x10..0x14].copy_from_slice(&[0x00, 0xf0, 0x76, 0xf8]);
        code[0x20..0x24].copy_from_slice(&[0x00, 0xf0, 0x6e, 0xf8]);
        let original = code.clone();

        assert_eq!(convert(&mut code, 0, Direction::Encode), 0x2e);
        assert_eq!(&code[0x10..0x14], &code[0x20..0x24]);

        convert(&mut code, 0, Direction::Decode);
        assert_eq!(code, original);
    }

    #[test]
    fn short_buffers() {
        let mut buf = [0x00, 0xf0, 0x00];
        assert_eq!(convert(&mut buf, 0, Direction::Decode), 0);
        assert_eq!(buf, [0x00, 0xf0, 0x00]);
    }

    #[test]
    fn chunked_matches_whole() {
        let image = firmware::image(2000, 11);
        let mut whole = image.clone();
        let done = convert(&mut whole, 0, Direction::Encode);
        assert!(done + Filter::MAX_CARRY >= whole.len());

        for &chunk in &[1, 3, 5, 64] {
            let mut filter = Filter::new(Direction::Encode);
            let mut work = vec![0; chunk + Filter::MAX_CARRY];
            let mut out = Vec::new();
            for piece in image.chunks(chunk) {
                let ready = filter.process(piece, &mut work).unwrap();
                out.extend_from_slice(ready);
            }
            assert!(filter.pending() <= Filter::MAX_CARRY);
            out.extend_from_slice(&filter.finish());
            assert_eq!(out, whole, "chunk = {}", chunk);
        }
    }

    #[test]
    fn work_too_small() {
        let mut filter = Filter::new(Direction::Decode);
        let mut work = [0; 2];
        assert!(filter.process(&[1, 2, 3], &mut work).is_none());
    }
}
