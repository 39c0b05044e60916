// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Implementations of [`crypto::hash`] based on `ring`.

use core::mem;

use ring::digest;

use crate::crypto::hash;

#[cfg(doc)]
use crate::crypto;

/// A `ring`-based [`hash::Engine`].
pub struct Engine {
    inner: Option<digest::Context>,
}

impl Engine {
    /// Creates a new `Engine`.
    pub fn new() -> Self {
        Self { inner: None }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl hash::Engine for Engine {
    fn supports(&mut self, _: hash::Algo) -> bool {
        true
    }

    fn start_raw(&mut self, algo: hash::Algo) -> Result<(), hash::Error> {
        self.inner = Some(digest::Context::new(match algo {
            hash::Algo::Sha256 => &digest::SHA256,
            hash::Algo::Sha384 => &digest::SHA384,
            hash::Algo::Sha512 => &digest::SHA512,
        }));
        Ok(())
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), hash::Error> {
        match &mut self.inner {
            None => return Err(fail!(hash::Error::Idle)),
            Some(c) => c.update(data),
        }
        Ok(())
    }

    fn finish_raw(&mut self, out: &mut [u8]) -> Result<(), hash::Error> {
        let c = mem::take(&mut self.inner)
            .ok_or_else(|| fail!(hash::Error::Idle))?;
        check!(
            out.len() == c.algorithm().output_len,
            hash::Error::WrongSize
        );
        out.copy_from_slice(c.finish().as_ref());
        Ok(())
    }

    fn compare_raw(&mut self, expected: &[u8]) -> Result<(), hash::Error> {
        let c = mem::take(&mut self.inner)
            .ok_or_else(|| fail!(hash::Error::Idle))?;
        check!(
            expected.len() == c.algorithm().output_len,
            hash::Error::WrongSize
        );
        ring::constant_time::verify_slices_are_equal(
            c.finish().as_ref(),
            expected,
        )
        .map_err(|_| fail!(hash::Error::Mismatch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::Algo;
    use crate::crypto::hash::EngineExt as _;

    const ABC_SHA256: [u8; 32] = [
        0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde,
        0x5d, 0xae, 0x22, 0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c,
        0xb4, 0x10, 0xff, 0x61, 0xf2, 0x00, 0x15, 0xad,
    ];

    const ABC_SHA512: [u8; 64] = [
        0xdd, 0xaf, 0x35, 0xa1, 0x93, 0x61, 0x7a, 0xba, 0xcc, 0x41, 0x73, 0x49,
        0xae, 0x20, 0x41, 0x31, 0x12, 0xe6, 0xfa, 0x4e, 0x89, 0xa9, 0x7e, 0xa2,
        0x0a, 0x9e, 0xee, 0xe6, 0x4b, 0x55, 0xd3, 0x9a, 0x21, 0x92, 0x99, 0x2a,
        0x27, 0x4f, 0xc1, 0xa8, 0x36, 0xba, 0x3c, 0x23, 0xa3, 0xfe, 0xeb, 0xbd,
        0x45, 0x4d, 0x44, 0x23, 0x64, 0x3c, 0xe8, 0x0e, 0x2a, 0x9a, 0xc9, 0x4f,
        0xa5, 0x4c, 0xa4, 0x9f,
    ];

    #[test]
    #[cfg_attr(miri, ignore)]
    fn sha256() {
        let mut e = Engine::new();
        let mut digest = [0; Algo::Sha256.bytes()];
        e.contiguous_hash(Algo::Sha256, b"abc", &mut digest).unwrap();
        assert_eq!(digest, ABC_SHA256);

        hash::Engine::start_raw(&mut e, Algo::Sha256).unwrap();
        hash::Engine::write_raw(&mut e, b"a").unwrap();
        hash::Engine::write_raw(&mut e, b"bc").unwrap();
        hash::Engine::compare_raw(&mut e, &ABC_SHA256).unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn sha512() {
        let mut e = Engine::new();
        hash::Engine::start_raw(&mut e, Algo::Sha512).unwrap();
        hash::Engine::write_raw(&mut e, b"abc").unwrap();
        hash::Engine::compare_raw(&mut e, &ABC_SHA512).unwrap();

        hash::Engine::start_raw(&mut e, Algo::Sha512).unwrap();
        hash::Engine::write_raw(&mut e, b"abd").unwrap();
        assert_eq!(
            hash::Engine::compare_raw(&mut e, &ABC_SHA512),
            Err(hash::Error::Mismatch)
        );
    }

    #[test]
    fn misuse() {
        let mut e = Engine::new();
        assert_eq!(
            hash::Engine::write_raw(&mut e, b"abc"),
            Err(hash::Error::Idle)
        );
        let mut short = [0; 16];
        assert_eq!(
            e.contiguous_hash(Algo::Sha256, b"abc", &mut short),
            Err(hash::Error::WrongSize)
        );
    }
}
