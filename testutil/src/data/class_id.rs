// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Vendor and manifest class ids.
//!
//! These are name-based (version 5) UUIDs: each class id is derived from the
//! vendor id and the class name.

/// The vendor id.
pub const VENDOR: [u8; 16] = [
    0x07, 0x5a, 0xc9, 0x81, 0xa7, 0xd2, 0x5c, 0x4b, //
    0xb3, 0x3e, 0x11, 0xa1, 0x21, 0x96, 0x12, 0x57,
];

/// The class id of the top-level secure-domain manifest.
pub const SEC_TOP: [u8; 16] = [
    0x9f, 0x46, 0x37, 0xf0, 0xed, 0x9e, 0x5f, 0x01, //
    0x83, 0x72, 0x0e, 0xe1, 0xef, 0x6c, 0xfe, 0x36,
];

/// The class id of the secure-domain firmware manifest.
pub const SEC_SDFW: [u8; 16] = [
    0xf0, 0xe4, 0x50, 0x9d, 0x8e, 0xed, 0x5e, 0xc6, //
    0x87, 0x57, 0xf0, 0xf2, 0xa3, 0xa4, 0xc0, 0x6c,
];

/// The class id of the system-controller manifest.
pub const SEC_SYSCTRL: [u8; 16] = [
    0xf5, 0x42, 0xb5, 0x84, 0xe9, 0x04, 0x52, 0xf4, //
    0xa9, 0x4e, 0x3f, 0x92, 0x56, 0x8e, 0x18, 0xf9,
];

/// The class id of the application root manifest.
pub const APP_ROOT: [u8; 16] = [
    0x2f, 0x29, 0xd4, 0x84, 0x1f, 0x16, 0x50, 0x25, //
    0xaa, 0x62, 0xb2, 0x63, 0xf7, 0xe9, 0x9d, 0x14,
];

/// The class id of the application recovery manifest.
pub const APP_RECOVERY: [u8; 16] = [
    0xc0, 0x78, 0xcb, 0xd4, 0xb2, 0x8b, 0x56, 0xd4, //
    0x93, 0xf2, 0xbc, 0xcc, 0x8a, 0xa7, 0x42, 0xdc,
];

/// The class id of the first local application manifest.
pub const APP_LOCAL_1: [u8; 16] = [
    0x8a, 0x17, 0x91, 0xae, 0xf9, 0x22, 0x52, 0x3f, //
    0xaf, 0x9f, 0x3c, 0x97, 0x75, 0x50, 0x45, 0x85,
];

/// The class id of the second local application manifest.
pub const APP_LOCAL_2: [u8; 16] = [
    0x0b, 0x01, 0x9a, 0xcd, 0xdf, 0x8e, 0x51, 0x07, //
    0x8b, 0xc9, 0xf9, 0xfd, 0x9d, 0x8b, 0x8c, 0x77,
];

/// The class id of the radio recovery manifest.
pub const RAD_RECOVERY: [u8; 16] = [
    0x0b, 0x00, 0x8b, 0x9f, 0x84, 0x29, 0x55, 0x79, //
    0xaf, 0x63, 0x86, 0x5b, 0xb2, 0x87, 0x64, 0x5b,
];

/// The class id of the first local radio manifest.
pub const RAD_LOCAL_1: [u8; 16] = [
    0x1c, 0xa9, 0x61, 0xa8, 0x29, 0x47, 0x5f, 0xca, //
    0x85, 0x9a, 0x3d, 0xbc, 0x58, 0x74, 0x6a, 0xe9,
];

/// A class id that no table knows about.
pub const UNKNOWN: [u8; 16] = [0x5a; 16];
