// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Test-only utilities for `suitcase`.

#![deny(missing_docs)]

pub mod data;
