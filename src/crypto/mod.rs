// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Pluggable cryptograpy.
//!
//! `suitcase` needs a digest engine, AES-256-GCM and AES key unwrapping to
//! install encrypted firmware. Digests are abstracted behind object-safe
//! traits, since most devices have a hashing accelerator; the symmetric
//! primitives are implemented here in software.
//!
//! It is recommended to not import the items in this module directly, since
//! a lot of them have the same name. Instead, use imports like
//! `use suitcase::crypto::hash;` and partially-qualified names like
//! `hash::Engine`.
//!
//! Software implementations of the digest traits are provided under the
//! [`ring` module], based on the [`ring`] crate. Their presence is controlled
//! by the `ring` feature flag.
//!
//! [`ring` module]: ring/index.html

pub mod aead;
pub mod hash;
pub mod keys;

#[cfg(feature = "ring")]
pub mod ring;
