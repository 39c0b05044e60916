// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! The built-in class table.
//!
//! Class ids are version 5 UUIDs derived from [`VENDOR_ID`] and the class
//! name.

use crate::crypto::keys::KeyId;
use crate::mci::Access;
use crate::mci::ClassId;
use crate::mci::ClassInfo;
use crate::mci::DowngradePrevention;
use crate::mci::IndependentUpdate;
use crate::mci::Invoke;
use crate::mci::MemoryRange;
use crate::mci::Role;
use crate::mci::SignatureVerification;

/// The vendor id shared by every built-in class.
pub const VENDOR_ID: ClassId = [
    0x07, 0x5a, 0xc9, 0x81, 0xa7, 0xd2, 0x5c, 0x4b, //
    0xb3, 0x3e, 0x11, 0xa1, 0x21, 0x96, 0x12, 0x57,
];

/// Class ids of the built-in classes.
#[allow(missing_docs)]
pub mod class_id {
    use crate::mci::ClassId;

    pub const SEC_TOP: ClassId = [
        0x9f, 0x46, 0x37, 0xf0, 0xed, 0x9e, 0x5f, 0x01, //
        0x83, 0x72, 0x0e, 0xe1, 0xef, 0x6c, 0xfe, 0x36,
    ];
    pub const SEC_SDFW: ClassId = [
        0xf0, 0xe4, 0x50, 0x9d, 0x8e, 0xed, 0x5e, 0xc6, //
        0x87, 0x57, 0xf0, 0xf2, 0xa3, 0xa4, 0xc0, 0x6c,
    ];
    pub const SEC_SYSCTRL: ClassId = [
        0xf5, 0x42, 0xb5, 0x84, 0xe9, 0x04, 0x52, 0xf4, //
        0xa9, 0x4e, 0x3f, 0x92, 0x56, 0x8e, 0x18, 0xf9,
    ];
    pub const APP_ROOT: ClassId = [
        0x2f, 0x29, 0xd4, 0x84, 0x1f, 0x16, 0x50, 0x25, //
        0xaa, 0x62, 0xb2, 0x63, 0xf7, 0xe9, 0x9d, 0x14,
    ];
    pub const APP_RECOVERY: ClassId = [
        0xc0, 0x78, 0xcb, 0xd4, 0xb2, 0x8b, 0x56, 0xd4, //
        0x93, 0xf2, 0xbc, 0xcc, 0x8a, 0xa7, 0x42, 0xdc,
    ];
    pub const APP_LOCAL_1: ClassId = [
        0x8a, 0x17, 0x91, 0xae, 0xf9, 0x22, 0x52, 0x3f, //
        0xaf, 0x9f, 0x3c, 0x97, 0x75, 0x50, 0x45, 0x85,
    ];
    pub const APP_LOCAL_2: ClassId = [
        0x0b, 0x01, 0x9a, 0xcd, 0xdf, 0x8e, 0x51, 0x07, //
        0x8b, 0xc9, 0xf9, 0xfd, 0x9d, 0x8b, 0x8c, 0x77,
    ];
    pub const RAD_RECOVERY: ClassId = [
        0x0b, 0x00, 0x8b, 0x9f, 0x84, 0x29, 0x55, 0x79, //
        0xaf, 0x63, 0x86, 0x5b, 0xb2, 0x87, 0x64, 0x5b,
    ];
    pub const RAD_LOCAL_1: ClassId = [
        0x1c, 0xa9, 0x61, 0xa8, 0x29, 0x47, 0x5f, 0xca, //
        0x85, 0x9a, 0x3d, 0xbc, 0x58, 0x74, 0x6a, 0xe9,
    ];
}

/// Key ids referenced by the built-in classes.
#[allow(missing_docs)]
pub mod key_id {
    use crate::crypto::keys::KeyId;

    pub const APP_FWENC: KeyId = 0x4000_0000;
    pub const APP_FWENC_WRAP: KeyId = 0x4000_0010;
    pub const RAD_FWENC: KeyId = 0x4000_0080;
    pub const APP_MANIFEST: KeyId = 0x4000_0100;
    pub const RAD_MANIFEST: KeyId = 0x4000_0200;
    pub const SEC_MANIFEST: KeyId = 0x4000_1000;
    pub const SEC_FWENC: KeyId = 0x4000_1080;
}

/// Processor ids.
#[allow(missing_docs)]
pub mod processor {
    pub const APPLICATION: u32 = 0x02;
    pub const RADIO: u32 = 0x03;
    pub const SYSCTRL: u32 = 0x0d;
}

/// Platform-specific component numbers.
#[allow(missing_docs)]
pub mod platform {
    pub const SDFW_UPDATE: u32 = 0x01;
    pub const SDFW_RECOVERY: u32 = 0x02;
    pub const CANDIDATE_INFO: u32 = 0x10;
}

use self::key_id::*;

const fn mram(start: u32, size: u32) -> MemoryRange {
    MemoryRange {
        start,
        size,
        access: &[Access::Read, Access::Write, Access::Execute],
    }
}

const fn ram(start: u32, size: u32) -> MemoryRange {
    MemoryRange {
        start,
        size,
        access: &[Access::Read, Access::Write],
    }
}

const NO_KEYS: &[KeyId] = &[];

/// The classes known to a stock device.
pub const DEFAULT_CLASSES: &[ClassInfo] = &[
    ClassInfo {
        role: Role::SecTop,
        vendor_id: VENDOR_ID,
        class_id: class_id::SEC_TOP,
        downgrade_prevention: DowngradePrevention::Enabled,
        independent_update: IndependentUpdate::Allowed,
        signature_verification: SignatureVerification::OnUpdateAndBoot,
        invoke: Invoke::Always,
        signing_keys: &[SEC_MANIFEST],
        encryption_keys: NO_KEYS,
        memory: &[],
        processors: &[],
        platform_components: &[],
        children: &[Role::SecSdfw, Role::SecSysctrl],
        dependencies: &[Role::SecSdfw, Role::SecSysctrl],
    },
    ClassInfo {
        role: Role::SecSdfw,
        vendor_id: VENDOR_ID,
        class_id: class_id::SEC_SDFW,
        downgrade_prevention: DowngradePrevention::Enabled,
        independent_update: IndependentUpdate::Denied,
        signature_verification: SignatureVerification::OnUpdateAndBoot,
        invoke: Invoke::Never,
        signing_keys: &[SEC_MANIFEST],
        encryption_keys: &[SEC_FWENC],
        memory: &[mram(0x0e00_0000, 0x0003_0000)],
        processors: &[],
        platform_components: &[platform::SDFW_UPDATE, platform::SDFW_RECOVERY],
        children: &[],
        dependencies: &[],
    },
    ClassInfo {
        role: Role::SecSysctrl,
        vendor_id: VENDOR_ID,
        class_id: class_id::SEC_SYSCTRL,
        downgrade_prevention: DowngradePrevention::Enabled,
        independent_update: IndependentUpdate::Denied,
        signature_verification: SignatureVerification::OnUpdate,
        invoke: Invoke::Never,
        signing_keys: &[SEC_MANIFEST],
        encryption_keys: &[SEC_FWENC],
        memory: &[mram(0x0e03_0000, 0x0001_0000)],
        processors: &[processor::SYSCTRL],
        platform_components: &[],
        children: &[],
        dependencies: &[],
    },
    ClassInfo {
        role: Role::AppRoot,
        vendor_id: VENDOR_ID,
        class_id: class_id::APP_ROOT,
        downgrade_prevention: DowngradePrevention::Disabled,
        independent_update: IndependentUpdate::Allowed,
        signature_verification: SignatureVerification::OnUpdateAndBoot,
        invoke: Invoke::Normal,
        signing_keys: &[APP_MANIFEST],
        encryption_keys: NO_KEYS,
        memory: &[],
        processors: &[],
        platform_components: &[platform::CANDIDATE_INFO],
        children: &[Role::AppLocal1, Role::AppLocal2, Role::RadLocal1],
        dependencies: &[
            Role::SecTop,
            Role::AppLocal1,
            Role::AppLocal2,
            Role::RadLocal1,
        ],
    },
    ClassInfo {
        role: Role::AppRecovery,
        vendor_id: VENDOR_ID,
        class_id: class_id::APP_RECOVERY,
        downgrade_prevention: DowngradePrevention::Disabled,
        independent_update: IndependentUpdate::Allowed,
        signature_verification: SignatureVerification::OnUpdateAndBoot,
        invoke: Invoke::Recovery,
        signing_keys: &[APP_MANIFEST],
        encryption_keys: &[APP_FWENC],
        memory: &[mram(0x0e16_0000, 0x0002_0000)],
        processors: &[processor::APPLICATION],
        platform_components: &[],
        children: &[Role::RadRecovery],
        dependencies: &[Role::RadRecovery],
    },
    ClassInfo {
        role: Role::AppLocal1,
        vendor_id: VENDOR_ID,
        class_id: class_id::APP_LOCAL_1,
        downgrade_prevention: DowngradePrevention::Disabled,
        independent_update: IndependentUpdate::Denied,
        signature_verification: SignatureVerification::OnUpdate,
        invoke: Invoke::Never,
        signing_keys: &[APP_MANIFEST],
        encryption_keys: &[APP_FWENC, APP_FWENC_WRAP],
        memory: &[
            mram(0x0e0a_0000, 0x0008_0000),
            ram(0x2000_0000, 0x0004_0000),
        ],
        processors: &[processor::APPLICATION],
        platform_components: &[],
        children: &[],
        dependencies: &[],
    },
    ClassInfo {
        role: Role::AppLocal2,
        vendor_id: VENDOR_ID,
        class_id: class_id::APP_LOCAL_2,
        downgrade_prevention: DowngradePrevention::Disabled,
        independent_update: IndependentUpdate::Denied,
        signature_verification: SignatureVerification::Skip,
        invoke: Invoke::Never,
        signing_keys: NO_KEYS,
        encryption_keys: NO_KEYS,
        memory: &[mram(0x0e12_0000, 0x0004_0000)],
        processors: &[],
        platform_components: &[],
        children: &[],
        dependencies: &[],
    },
    ClassInfo {
        role: Role::RadRecovery,
        vendor_id: VENDOR_ID,
        class_id: class_id::RAD_RECOVERY,
        downgrade_prevention: DowngradePrevention::Disabled,
        independent_update: IndependentUpdate::Denied,
        signature_verification: SignatureVerification::OnUpdateAndBoot,
        invoke: Invoke::Never,
        signing_keys: &[RAD_MANIFEST],
        encryption_keys: &[RAD_FWENC],
        memory: &[mram(0x0e18_0000, 0x0002_0000)],
        processors: &[processor::RADIO],
        platform_components: &[],
        children: &[],
        dependencies: &[],
    },
    ClassInfo {
        role: Role::RadLocal1,
        vendor_id: VENDOR_ID,
        class_id: class_id::RAD_LOCAL_1,
        downgrade_prevention: DowngradePrevention::Disabled,
        independent_update: IndependentUpdate::Denied,
        signature_verification: SignatureVerification::OnUpdate,
        invoke: Invoke::Never,
        signing_keys: &[RAD_MANIFEST],
        encryption_keys: &[RAD_FWENC],
        memory: &[mram(0x0e05_4000, 0x0004_c000)],
        processors: &[processor::RADIO],
        platform_components: &[],
        children: &[],
        dependencies: &[],
    },
];
