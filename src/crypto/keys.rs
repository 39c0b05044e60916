// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Key storage.
//!
//! Symmetric keys never appear in manifests; manifests refer to them by a
//! 32-bit key id, which a [`KeyStore`] resolves to key material held by the
//! platform.
//!
//! Keys handed out by a [`KeyStore`] are wrapped in [`Zeroizing`], so every
//! copy is wiped when the caller drops it.

use zeroize::Zeroizing;

use crate::crypto::aead::KEY_LEN;

/// An AES-256 key, wiped on drop.
pub type Aes256Key = Zeroizing<[u8; KEY_LEN]>;

/// A key identifier.
pub type KeyId = u32;

/// An error returned by a [`KeyStore`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates that no key with the requested id exists.
    NotFound,
    /// Indicates that the key exists, but may not be used this way.
    Denied,
}

/// Provides access to provisioned AES-256 keys.
pub trait KeyStore {
    /// Returns the AES-256 key with the given id.
    fn aes256_key(&self, id: KeyId) -> Result<Aes256Key, Error>;
}
impl dyn KeyStore {} // Ensure object-safe.

impl<K: KeyStore + ?Sized> KeyStore for &K {
    fn aes256_key(&self, id: KeyId) -> Result<Aes256Key, Error> {
        K::aes256_key(self, id)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    /// A fake `KeyStore` over a fixed list of keys.
    pub struct KeyStore {
        pub keys: Vec<(KeyId, [u8; KEY_LEN])>,
    }

    impl KeyStore {
        /// Returns a store holding the test CEK and KEK.
        pub fn with_test_keys() -> Self {
            use testutil::data::keys;
            Self {
                keys: vec![(keys::CEK_ID, keys::CEK), (keys::KEK_ID, keys::KEK)],
            }
        }
    }

    impl super::KeyStore for KeyStore {
        fn aes256_key(&self, id: KeyId) -> Result<Aes256Key, Error> {
            self.keys
                .iter()
                .find(|(k, _)| *k == id)
                .map(|(_, key)| Zeroizing::new(*key))
                .ok_or(Error::NotFound)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use testutil::data::keys;
    use zeroize::Zeroize as _;

    #[test]
    fn keys_by_id() {
        let store = fake::KeyStore::with_test_keys();
        assert_eq!(*store.aes256_key(keys::CEK_ID).unwrap(), keys::CEK);
        assert_eq!(*(&store).aes256_key(keys::KEK_ID).unwrap(), keys::KEK);
        assert_eq!(store.aes256_key(0x1234).err(), Some(Error::NotFound));
    }

    #[test]
    fn handed_out_keys_wipe() {
        let store = fake::KeyStore::with_test_keys();
        let mut key = store.aes256_key(keys::CEK_ID).unwrap();
        key.zeroize();
        assert_eq!(*key, [0; KEY_LEN]);
        // The stored copy is untouched.
        assert_eq!(*store.aes256_key(keys::CEK_ID).unwrap(), keys::CEK);
    }
}
