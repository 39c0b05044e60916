// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! The decrypt filter.
//!
//! [`Decrypt`] wraps an inner sink and decrypts an AES-256-GCM ciphertext
//! stream into it. The content-encryption key is either provisioned
//! directly, or carried in the manifest wrapped under a provisioned
//! key-encryption key; either way, the provisioned key must be one the
//! [`Mci`] allows for the manifest's class.
//!
//! Plaintext reaches the inner sink before the tag is checked. If the tag
//! turns out to be wrong, the inner sink is erased.

use zeroize::Zeroizing;

use crate::crypto::aead;
use crate::crypto::aead::GcmDecryptor;
use crate::crypto::aead::KEY_LEN;
use crate::crypto::keys::KeyId;
use crate::crypto::keys::KeyStore;
use crate::mci::ClassId;
use crate::mci::Mci;
use crate::sink::roll_back;
use crate::sink::Error;
use crate::sink::Sink;

/// The COSE algorithm id for AES-256-GCM.
pub const A256GCM: i32 = 3;

/// The COSE algorithm id for AES-256 key wrap.
pub const A256KW: i32 = -5;

/// The COSE algorithm id for direct use of a content-encryption key.
pub const DIRECT: i32 = -6;

impl From<aead::Error> for Error {
    fn from(e: aead::Error) -> Self {
        match e {
            aead::Error::InvalidKey | aead::Error::InvalidLength => {
                Error::InvalidArgument
            }
            aead::Error::Authentication => Error::Authentication,
        }
    }
}

/// Where the content-encryption key comes from.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum KeyMaterial<'a> {
    /// The content-encryption key is provisioned under `cek_key_id`.
    Direct {
        /// The id of the content-encryption key.
        cek_key_id: KeyId,
    },
    /// The content-encryption key is `wrapped_cek`, wrapped under the
    /// key-encryption key provisioned as `kek_key_id`.
    Wrapped {
        /// The id of the key-encryption key.
        kek_key_id: KeyId,
        /// The RFC 3394-wrapped content-encryption key.
        wrapped_cek: &'a [u8],
    },
}

/// Parameters for decrypting one payload.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct EncryptionInfo<'a> {
    /// The content-encryption algorithm; only [`A256GCM`] is supported.
    pub algorithm: i32,
    /// The GCM nonce.
    pub iv: &'a [u8],
    /// Additional authenticated data.
    pub aad: &'a [u8],
    /// The key-wrap algorithm: [`A256KW`] or [`DIRECT`].
    pub key_wrap: i32,
    /// The key material.
    pub key: KeyMaterial<'a>,
}

/// A sink that decrypts into an inner sink.
pub struct Decrypt<S> {
    inner: S,
    // `None` once the stream has been finished or abandoned.
    gcm: Option<GcmDecryptor>,
}

impl<S: Sink> Decrypt<S> {
    /// Creates a new decrypt filter over `inner`.
    ///
    /// `class_id` is the class of the manifest the payload belongs to; the
    /// provisioned key named by `info` must be permitted for it by `mci`.
    pub fn new(
        inner: S,
        info: &EncryptionInfo,
        class_id: &ClassId,
        mci: &Mci,
        keys: &(impl KeyStore + ?Sized),
    ) -> Result<Self, Error> {
        check!(info.algorithm == A256GCM, Error::Unsupported);

        let key_id = match (info.key_wrap, info.key) {
            (DIRECT, KeyMaterial::Direct { cek_key_id }) => cek_key_id,
            (A256KW, KeyMaterial::Wrapped { kek_key_id, .. }) => kek_key_id,
            (wrap, _) => {
                return Err(fail!(
                    Error::InvalidArgument,
                    "key material does not match key wrap {}",
                    wrap
                ))
            }
        };
        mci.fw_encryption_key_id_validate(class_id, key_id)
            .map_err(|e| {
                fail!(Error::Authentication, "key {:#x} denied: {:?}", key_id, e)
            })?;
        let key = keys.aes256_key(key_id).map_err(|e| {
            fail!(Error::Authentication, "key {:#x} unavailable: {:?}", key_id, e)
        })?;

        let gcm = match info.key {
            KeyMaterial::Direct { .. } => {
                GcmDecryptor::new(&key[..], info.iv, info.aad)?
            }
            KeyMaterial::Wrapped { wrapped_cek, .. } => {
                let mut cek = Zeroizing::new([0; KEY_LEN]);
                let len = aead::unwrap_key(&key[..], wrapped_cek, &mut cek[..])
                    .map_err(|e| {
                        fail!(Error::Authentication, "cek unwrap: {:?}", e)
                    })?;
                check!(len == KEY_LEN, Error::Authentication);
                GcmDecryptor::new(&cek[..], info.iv, info.aad)?
            }
        };

        Ok(Self {
            inner,
            gcm: Some(gcm),
        })
    }

    /// Returns the inner sink.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Sink> Sink for Decrypt<S> {
    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        let Self { inner, gcm } = self;
        let gcm = gcm.as_mut().ok_or_else(|| fail!(Error::IncorrectState))?;
        if let Err(e) = gcm.update(buf, |pt| inner.write(pt)) {
            self.gcm = None;
            roll_back(&mut self.inner)?;
            return Err(e);
        }
        Ok(())
    }

    /// Checks the authentication tag, then flushes the inner sink.
    fn flush(&mut self) -> Result<(), Error> {
        let gcm = self.gcm.take().ok_or_else(|| fail!(Error::IncorrectState))?;
        let len = gcm.decrypted_len();
        if let Err(e) = gcm.finish() {
            roll_back(&mut self.inner)?;
            return Err(fail!(
                Error::from(e),
                "decryption failed after {} bytes",
                len
            ));
        }
        self.inner.flush()
    }

    fn erase(&mut self) -> Result<(), Error> {
        self.gcm = None;
        self.inner.erase()
    }

    fn used_storage(&self) -> usize {
        self.inner.used_storage()
    }

    fn release(self) -> Result<(), Error> {
        self.inner.release()
    }
}
