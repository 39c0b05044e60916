// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Streaming authenticated decryption and AES key unwrapping.
//!
//! Firmware images are far too large to decrypt in one piece, so
//! [`GcmDecryptor`] implements AES-256-GCM incrementally, out of the AES
//! block cipher and the GHASH universal hash. Following COSE, the
//! authentication tag is the last 16 bytes of the ciphertext stream; the
//! decryptor always holds back the most recent 16 bytes, since they might
//! turn out to be the tag.
//!
//! Plaintext is released before the tag is checked. Callers must treat it
//! as untrusted until [`GcmDecryptor::finish()`] succeeds, and discard it
//! otherwise.

use aes_gcm::aes::cipher::BlockDecrypt as _;
use aes_gcm::aes::cipher::BlockEncrypt as _;
use aes_gcm::aes::cipher::KeyInit as _;
use aes_gcm::aes::Aes256;
use aes_gcm::aes::Block;

use ghash::universal_hash::UniversalHash as _;
use ghash::GHash;

use subtle::ConstantTimeEq as _;
use zeroize::Zeroize;

/// The length of an AES-256 key.
pub const KEY_LEN: usize = 32;

/// The length of a GCM nonce.
pub const IV_LEN: usize = 12;

/// The length of a GCM authentication tag.
pub const TAG_LEN: usize = 16;

const BLOCK_LEN: usize = 16;

/// The RFC 3394 default initial value.
const KEY_WRAP_IV: u64 = 0xa6a6_a6a6_a6a6_a6a6;

/// An AEAD error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates that a key or nonce had the wrong length.
    InvalidKey,
    /// Indicates that an input or output buffer had an unsupported length.
    InvalidLength,
    /// Indicates that the ciphertext or wrapped key failed authentication.
    Authentication,
}

/// An incremental AES-256-GCM decryption.
pub struct GcmDecryptor {
    cipher: Aes256,
    ghash: GHash,
    iv: [u8; IV_LEN],
    counter: u32,
    keystream: [u8; BLOCK_LEN],
    keystream_used: usize,
    // Ciphertext not yet absorbed by GHASH.
    block: [u8; BLOCK_LEN],
    block_len: usize,
    // The last `TAG_LEN` bytes seen, which may be the tag.
    tail: [u8; TAG_LEN],
    tail_len: usize,
    aad_len: u64,
    ct_len: u64,
}

impl GcmDecryptor {
    /// Starts decrypting a stream encrypted with `key`, `iv` and the
    /// additional authenticated data `aad`.
    pub fn new(key: &[u8], iv: &[u8], aad: &[u8]) -> Result<Self, Error> {
        let cipher =
            Aes256::new_from_slice(key).map_err(|_| fail!(Error::InvalidKey))?;
        let mut iv_bytes = [0; IV_LEN];
        check!(iv.len() == IV_LEN, Error::InvalidKey);
        iv_bytes.copy_from_slice(iv);

        let mut h = Block::default();
        cipher.encrypt_block(&mut h);
        let mut ghash = GHash::new(&h);
        ghash.update_padded(aad);

        Ok(Self {
            cipher,
            ghash,
            iv: iv_bytes,
            // Counter 1 is reserved for the tag.
            counter: 2,
            keystream: [0; BLOCK_LEN],
            keystream_used: BLOCK_LEN,
            block: [0; BLOCK_LEN],
            block_len: 0,
            tail: [0; TAG_LEN],
            tail_len: 0,
            aad_len: aad.len() as u64,
            ct_len: 0,
        })
    }

    fn counter_block(&self, counter: u32) -> Block {
        let mut block = Block::default();
        block[..IV_LEN].copy_from_slice(&self.iv);
        block[IV_LEN..].copy_from_slice(&counter.to_be_bytes());
        self.cipher.encrypt_block(&mut block);
        block
    }

    fn absorb(&mut self, mut ct: &[u8]) {
        self.ct_len += ct.len() as u64;
        while !ct.is_empty() {
            let take = ct.len().min(BLOCK_LEN - self.block_len);
            self.block[self.block_len..self.block_len + take]
                .copy_from_slice(&ct[..take]);
            self.block_len += take;
            ct = &ct[take..];
            if self.block_len == BLOCK_LEN {
                self.ghash.update(&[Block::from(self.block)]);
                self.block_len = 0;
            }
        }
    }

    fn keystream_xor(&mut self, buf: &mut [u8]) {
        for b in buf {
            if self.keystream_used == BLOCK_LEN {
                let block = self.counter_block(self.counter);
                self.keystream.copy_from_slice(&block);
                self.counter = self.counter.wrapping_add(1);
                self.keystream_used = 0;
            }
            *b ^= self.keystream[self.keystream_used];
            self.keystream_used += 1;
        }
    }

    // Decrypts ciphertext known not to be part of the tag.
    fn decrypt_body<E>(
        &mut self,
        ct: &[u8],
        emit: &mut impl FnMut(&[u8]) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut buf = [0; 64];
        for chunk in ct.chunks(buf.len()) {
            self.absorb(chunk);
            let out = &mut buf[..chunk.len()];
            out.copy_from_slice(chunk);
            self.keystream_xor(out);
            emit(out)?;
        }
        Ok(())
    }

    /// Decrypts the next piece of the stream, passing plaintext to `emit` as
    /// it becomes available.
    ///
    /// The final 16 bytes of the stream are never passed to `emit`.
    pub fn update<E>(
        &mut self,
        input: &[u8],
        mut emit: impl FnMut(&[u8]) -> Result<(), E>,
    ) -> Result<(), E> {
        let total = self.tail_len + input.len();
        if total <= TAG_LEN {
            self.tail[self.tail_len..total].copy_from_slice(input);
            self.tail_len = total;
            return Ok(());
        }

        let release = total - TAG_LEN;
        let from_tail = release.min(self.tail_len);
        if from_tail > 0 {
            let tail = self.tail;
            self.decrypt_body(&tail[..from_tail], &mut emit)?;
            self.tail.copy_within(from_tail..self.tail_len, 0);
            self.tail_len -= from_tail;
        }

        let (body, rest) = input.split_at(release - from_tail);
        self.decrypt_body(body, &mut emit)?;
        self.tail[self.tail_len..self.tail_len + rest.len()]
            .copy_from_slice(rest);
        self.tail_len += rest.len();
        Ok(())
    }

    /// Returns the number of ciphertext bytes decrypted so far.
    pub fn decrypted_len(&self) -> u64 {
        self.ct_len
    }

    /// Ends the stream, checking the authentication tag.
    pub fn finish(mut self) -> Result<(), Error> {
        check!(self.tail_len == TAG_LEN, Error::Authentication);
        if self.block_len > 0 {
            let block_len = self.block_len;
            self.ghash.update_padded(&self.block[..block_len]);
        }

        let mut lengths = Block::default();
        lengths[..8].copy_from_slice(&(self.aad_len * 8).to_be_bytes());
        lengths[8..].copy_from_slice(&(self.ct_len * 8).to_be_bytes());
        self.ghash.update(&[lengths]);

        let mut expected = self.counter_block(1);
        let s = self.ghash.clone().finalize();
        expected
            .iter_mut()
            .zip(s.iter())
            .for_each(|(e, s)| *e ^= s);

        let tag_ok: bool = expected.as_slice().ct_eq(&self.tail).into();
        expected.as_mut_slice().zeroize();
        check!(tag_ok, Error::Authentication);
        Ok(())
    }
}

impl Drop for GcmDecryptor {
    fn drop(&mut self) {
        self.keystream.zeroize();
        self.block.zeroize();
        self.tail.zeroize();
    }
}

/// Unwraps `wrapped` with the key-encryption key `kek`, as specified in
/// RFC 3394, writing the key to `out` and returning its length.
///
/// On failure, `out` is zeroed. Intermediate blocks are wiped either way.
pub fn unwrap_key(
    kek: &[u8],
    wrapped: &[u8],
    out: &mut [u8],
) -> Result<usize, Error> {
    let cipher =
        Aes256::new_from_slice(kek).map_err(|_| fail!(Error::InvalidKey))?;
    check!(
        wrapped.len() >= 24 && wrapped.len() % 8 == 0,
        Error::InvalidLength
    );
    let key_len = wrapped.len() - 8;
    check!(out.len() >= key_len, Error::InvalidLength);
    let n = key_len / 8;

    let mut a = [0; 8];
    a.copy_from_slice(&wrapped[..8]);
    let out = &mut out[..key_len];
    out.copy_from_slice(&wrapped[8..]);

    for j in (0..6).rev() {
        for i in (0..n).rev() {
            let t = (n * j + i + 1) as u64;
            let mut block = Block::default();
            block[..8].copy_from_slice(&(u64::from_be_bytes(a) ^ t).to_be_bytes());
            block[8..].copy_from_slice(&out[i * 8..(i + 1) * 8]);
            cipher.decrypt_block(&mut block);
            a.copy_from_slice(&block[..8]);
            out[i * 8..(i + 1) * 8].copy_from_slice(&block[8..]);
            block.as_mut_slice().zeroize();
        }
    }

    let iv_ok: bool = a[..].ct_eq(&KEY_WRAP_IV.to_be_bytes()).into();
    a.zeroize();
    if !iv_ok {
        out.zeroize();
        return Err(fail!(Error::Authentication, "key unwrap integrity check"));
    }
    Ok(key_len)
}
