// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Test data of all kinds, ranging from class ids, to keys, to firmware.

pub mod class_id;
pub mod firmware;
pub mod keys;
