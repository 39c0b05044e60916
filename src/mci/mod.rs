// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Manifest Component Info (MCI): the update policy engine.
//!
//! Every manifest belongs to a *class*, identified by a 16-byte class id.
//! The set of classes a device accepts is fixed at build time (see
//! [`table`]), along with what each class may do: which keys may sign or
//! encrypt for it, which memory it may write, which processors it may
//! start, and which other manifests it may declare or depend on.
//!
//! [`Mci`] answers these questions. It never defaults: a class id that is
//! not in the table fails every query with [`Error::NotFound`], and callers
//! must treat that as a hard stop.

use enumflags2::bitflags;
use enumflags2::BitFlags;

use crate::crypto::keys::KeyId;

pub mod table;

/// A manifest class id, or a vendor id.
pub type ClassId = [u8; 16];

/// An MCI query error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates that a class id is not in the table.
    NotFound,
    /// Indicates that a parameter was malformed.
    InvalidArgument,
    /// Indicates that an output buffer was too small.
    Size,
    /// Indicates that the class may not perform the operation at all.
    NotAuthorized,
    /// Indicates that the class may perform the operation, but not with the
    /// given key.
    WrongKeyId,
    /// Indicates that the query is meaningless in the current execution
    /// mode.
    IncorrectState,
}

wire_enum! {
    /// The role a manifest class plays in the update hierarchy.
    pub enum Role: u8 {
        /// The top-level secure-domain manifest.
        SecTop = 0x10,
        /// The secure-domain firmware manifest.
        SecSdfw = 0x11,
        /// The system-controller manifest.
        SecSysctrl = 0x12,
        /// The application root manifest.
        AppRoot = 0x20,
        /// The application recovery manifest.
        AppRecovery = 0x21,
        /// A local application manifest.
        AppLocal1 = 0x22,
        /// Another local application manifest.
        AppLocal2 = 0x23,
        /// The radio recovery manifest.
        RadRecovery = 0x30,
        /// A local radio manifest.
        RadLocal1 = 0x31,
    }
}

wire_enum! {
    /// Whether a class may be rolled back to an older sequence number.
    pub enum DowngradePrevention: u8 {
        /// Any sequence number is accepted.
        Disabled = 0x00,
        /// Only sequence numbers greater than the installed one are
        /// accepted.
        Enabled = 0x01,
    }
}

wire_enum! {
    /// Whether a class may be updated on its own, rather than only through
    /// its parent.
    pub enum IndependentUpdate: u8 {
        /// The class can only be updated through its parent.
        Denied = 0x00,
        /// The class can be the root of an update.
        Allowed = 0x01,
    }
}

wire_enum! {
    /// When manifests of a class have their signature checked.
    pub enum SignatureVerification: u8 {
        /// Never; the manifest is trusted through its parent.
        Skip = 0x00,
        /// When the manifest is installed.
        OnUpdate = 0x01,
        /// When the manifest is installed, and on every boot.
        OnUpdateAndBoot = 0x02,
    }
}

/// The execution modes of the manifest processor.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ExecutionMode {
    /// Manifests are being enumerated at boot.
    Boot,
    /// An update is being installed.
    Update,
    /// Installed manifests are being invoked.
    Invoke,
    /// Recovery manifests are being invoked.
    InvokeRecovery,
}

/// When a class is invoked at boot.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Invoke {
    /// The class is only ever invoked by its parent.
    Never,
    /// In normal boots.
    Normal,
    /// In recovery boots.
    Recovery,
    /// In every boot.
    Always,
}

/// A kind of memory access.
#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Access {
    /// The class may read the memory.
    Read = 0b001,
    /// The class may write the memory.
    Write = 0b010,
    /// The class may execute from the memory.
    Execute = 0b100,
}

/// A range of the global address space a class may access.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct MemoryRange {
    /// The first address of the range.
    pub start: u32,
    /// The size of the range, in bytes.
    pub size: u32,
    /// The accesses permitted to the range.
    pub access: &'static [Access],
}

impl MemoryRange {
    /// Returns the accesses permitted to the range, as a set.
    pub fn rights(&self) -> BitFlags<Access> {
        self.access.iter().copied().collect()
    }

    fn contains(&self, address: u32, size: u32) -> bool {
        let last = match address.checked_add(size.max(1) - 1) {
            Some(last) => last,
            None => return false,
        };
        address >= self.start && last - self.start < self.size
    }
}

/// Everything the policy engine knows about a manifest class.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ClassInfo {
    /// The class's role.
    pub role: Role,
    /// The vendor id.
    pub vendor_id: ClassId,
    /// The class id.
    pub class_id: ClassId,
    /// The downgrade-prevention policy.
    pub downgrade_prevention: DowngradePrevention,
    /// The independent-update policy.
    pub independent_update: IndependentUpdate,
    /// The signature-verification policy.
    pub signature_verification: SignatureVerification,
    /// When the class is invoked at boot.
    pub invoke: Invoke,
    /// Key ids that may sign manifests of this class.
    pub signing_keys: &'static [KeyId],
    /// Key ids that may encrypt firmware for this class.
    pub encryption_keys: &'static [KeyId],
    /// Memory this class may access.
    pub memory: &'static [MemoryRange],
    /// Processors this class may start.
    pub processors: &'static [u32],
    /// Platform-specific components this class may control.
    pub platform_components: &'static [u32],
    /// Roles of the manifests this class may declare as children.
    pub children: &'static [Role],
    /// Roles of the manifests this class may process as dependencies.
    pub dependencies: &'static [Role],
}

/// The policy engine.
#[derive(Copy, Clone, Debug)]
pub struct Mci<'a> {
    classes: &'a [ClassInfo],
    mode: ExecutionMode,
}

impl<'a> Mci<'a> {
    /// Creates a policy engine over `classes`, starting in
    /// [`ExecutionMode::Boot`].
    pub const fn new(classes: &'a [ClassInfo]) -> Self {
        Self {
            classes,
            mode: ExecutionMode::Boot,
        }
    }

    /// Returns the current execution mode.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Switches to a new execution mode.
    pub fn set_mode(&mut self, mode: ExecutionMode) {
        trace!("mci mode: {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
    }

    /// Looks up everything known about `class_id`.
    pub fn manifest_class_info_get(
        &self,
        class_id: &ClassId,
    ) -> Result<&'a ClassInfo, Error> {
        self.classes
            .iter()
            .find(|c| &c.class_id == class_id)
            .ok_or_else(|| fail!(Error::NotFound, "unknown class id"))
    }

    /// Looks up the class that plays `role`.
    pub fn class_for_role(&self, role: Role) -> Result<&'a ClassInfo, Error> {
        self.classes
            .iter()
            .find(|c| c.role == role)
            .ok_or_else(|| fail!(Error::NotFound, "no class for role {}", role))
    }

    /// Writes the ids of every supported class into `out`, returning how
    /// many were written.
    ///
    /// If `out` is too small, fails with [`Error::Size`] and leaves `out`
    /// untouched.
    pub fn supported_manifest_class_ids(
        &self,
        out: &mut [ClassId],
    ) -> Result<usize, Error> {
        check!(out.len() >= self.classes.len(), Error::Size);
        for (slot, class) in out.iter_mut().zip(self.classes) {
            *slot = class.class_id;
        }
        Ok(self.classes.len())
    }

    /// Writes the ids of the classes to invoke, in order, into `out`,
    /// returning how many were written.
    ///
    /// Only meaningful in one of the invoke modes; otherwise fails with
    /// [`Error::IncorrectState`]. If `out` is too small, fails with
    /// [`Error::Size`] and leaves `out` untouched.
    pub fn invoke_order(&self, out: &mut [ClassId]) -> Result<usize, Error> {
        let wanted = match self.mode {
            ExecutionMode::Invoke => Invoke::Normal,
            ExecutionMode::InvokeRecovery => Invoke::Recovery,
            mode => {
                return Err(fail!(
                    Error::IncorrectState,
                    "invoke order queried in {:?} mode",
                    mode
                ))
            }
        };
        let invoked = || {
            self.classes
                .iter()
                .filter(move |c| c.invoke == wanted || c.invoke == Invoke::Always)
        };

        check!(out.len() >= invoked().count(), Error::Size);
        let mut len = 0;
        for (slot, class) in out.iter_mut().zip(invoked()) {
            *slot = class.class_id;
            len += 1;
        }
        Ok(len)
    }

    /// Returns the downgrade-prevention policy of `class_id`.
    pub fn downgrade_prevention_policy_get(
        &self,
        class_id: &ClassId,
    ) -> Result<DowngradePrevention, Error> {
        Ok(self.manifest_class_info_get(class_id)?.downgrade_prevention)
    }

    /// Returns the independent-update policy of `class_id`.
    pub fn independent_update_policy_get(
        &self,
        class_id: &ClassId,
    ) -> Result<IndependentUpdate, Error> {
        Ok(self.manifest_class_info_get(class_id)?.independent_update)
    }

    /// Returns the signature-verification policy of `class_id`.
    pub fn signature_verification_policy_get(
        &self,
        class_id: &ClassId,
    ) -> Result<SignatureVerification, Error> {
        Ok(self.manifest_class_info_get(class_id)?.signature_verification)
    }

    /// Returns the role of `class_id`.
    pub fn manifest_role_get(&self, class_id: &ClassId) -> Result<Role, Error> {
        Ok(self.manifest_class_info_get(class_id)?.role)
    }

    /// Checks that `class_id` is supported.
    pub fn manifest_class_id_validate(
        &self,
        class_id: &ClassId,
    ) -> Result<(), Error> {
        self.manifest_class_info_get(class_id).map(|_| ())
    }

    /// Returns the vendor id of `class_id`.
    pub fn vendor_id_for_manifest_class_id_get(
        &self,
        class_id: &ClassId,
    ) -> Result<&'a ClassId, Error> {
        Ok(&self.manifest_class_info_get(class_id)?.vendor_id)
    }

    /// Checks that `key_id` may sign manifests of `class_id`.
    ///
    /// Fails with [`Error::NotAuthorized`] if the class accepts no signing
    /// keys, and with [`Error::WrongKeyId`] if it accepts others. A class
    /// whose signatures are never verified accepts the null key id.
    pub fn signing_key_id_validate(
        &self,
        class_id: &ClassId,
        key_id: KeyId,
    ) -> Result<(), Error> {
        let class = self.manifest_class_info_get(class_id)?;
        if class.signature_verification == SignatureVerification::Skip
            && key_id == 0
        {
            return Ok(());
        }
        validate_key(class.signing_keys, key_id, "signing", class.role)
    }

    /// Checks that `key_id` may be used to decrypt firmware for
    /// `class_id`.
    pub fn fw_encryption_key_id_validate(
        &self,
        class_id: &ClassId,
        key_id: KeyId,
    ) -> Result<(), Error> {
        let class = self.manifest_class_info_get(class_id)?;
        validate_key(class.encryption_keys, key_id, "encryption", class.role)
    }

    /// Checks that `class_id` may start `processor`.
    pub fn processor_start_rights_validate(
        &self,
        class_id: &ClassId,
        processor: u32,
    ) -> Result<(), Error> {
        let class = self.manifest_class_info_get(class_id)?;
        check!(class.processors.contains(&processor), Error::NotAuthorized);
        Ok(())
    }

    /// Checks that `class_id` may perform every access in `access` on
    /// `[address, address + size)`.
    ///
    /// The range must be contained in a single range of the class; a
    /// zero-sized range is treated as a single byte.
    pub fn memory_access_rights_validate(
        &self,
        class_id: &ClassId,
        address: u32,
        size: u32,
        access: BitFlags<Access>,
    ) -> Result<(), Error> {
        let class = self.manifest_class_info_get(class_id)?;
        let allowed = class
            .memory
            .iter()
            .any(|r| r.contains(address, size) && r.rights().contains(access));
        if !allowed {
            return Err(fail!(
                Error::NotAuthorized,
                "{} may not access {:#x}+{:#x}",
                class.role,
                address,
                size
            ));
        }
        Ok(())
    }

    /// Checks that `class_id` may control the platform-specific component
    /// `number`.
    pub fn platform_specific_component_rights_validate(
        &self,
        class_id: &ClassId,
        number: u32,
    ) -> Result<(), Error> {
        let class = self.manifest_class_info_get(class_id)?;
        check!(
            class.platform_components.contains(&number),
            Error::NotAuthorized
        );
        Ok(())
    }

    /// Checks that `parent` may declare `child` as a child manifest.
    pub fn manifest_parent_child_declaration_validate(
        &self,
        parent: &ClassId,
        child: &ClassId,
    ) -> Result<(), Error> {
        let parent = self.manifest_class_info_get(parent)?;
        let child = self.manifest_class_info_get(child)?;
        check!(parent.children.contains(&child.role), Error::NotAuthorized);
        Ok(())
    }

    /// Checks that `parent` may process `child` as a dependency.
    pub fn manifest_process_dependency_validate(
        &self,
        parent: &ClassId,
        child: &ClassId,
    ) -> Result<(), Error> {
        let parent = self.manifest_class_info_get(parent)?;
        let child = self.manifest_class_info_get(child)?;
        check!(
            parent.dependencies.contains(&child.role),
            Error::NotAuthorized
        );
        Ok(())
    }
}

fn validate_key(
    allowed: &[KeyId],
    key_id: KeyId,
    kind: &str,
    role: Role,
) -> Result<(), Error> {
    if allowed.is_empty() {
        return Err(fail!(
            Error::NotAuthorized,
            "{} accepts no {} keys",
            role,
            kind
        ));
    }
    if !allowed.contains(&key_id) {
        return Err(fail!(
            Error::WrongKeyId,
            "{} key {:#x} not accepted by {}",
            kind,
            key_id,
            role
        ));
    }
    Ok(())
}
