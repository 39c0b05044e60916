// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! `suitcase` provides the primitives a [SUIT] manifest processor needs to
//! install firmware safely: persisted envelope storage, a composable chain of
//! streaming sinks, and a policy engine describing which manifests may do
//! what.
//!
//! `suitcase` does not interpret manifests itself. The command sequences a
//! manifest describes are executed by some other component, which is
//! expected to:
//! 1. Ask the [`mci`] policy engine whether an operation is permitted.
//! 2. Resolve component addresses with the [`memmap`] translator.
//! 3. Assemble a [`sink`] chain, such as a decrypt filter feeding a
//!    decompress filter feeding a flash sink, and stream the payload through
//!    it.
//! 4. Persist the accepted envelope with [`envelope::storage`], which is
//!    read back at boot to locate the active manifests.
//!
//! Hardware, such as flash controllers, secure-domain registers and the
//! reset controller, is plugged in through the traits in [`hardware`]; key
//! material is plugged in through [`crypto::keys`].
//!
//! [SUIT]: https://datatracker.ietf.org/wg/suit/about/

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

// Pull in the `log` crate under a name that will not collide with the
// redactable logging macros.
#[cfg(feature = "log")]
extern crate log as __raw_log;

#[macro_use]
mod debug;

#[macro_use]
pub mod wire;

#[macro_use]
pub mod cbor;
pub mod crypto;
pub mod download;
pub mod envelope;
pub mod hardware;
pub mod io;
pub mod mci;
pub mod mem;
pub mod memmap;
pub mod sink;
