// SPDX-License-Identifier: GPL-3.0-only

//! One-time migration from the flat legacy configuration
//!
//! Older appliances kept their storage layout as loose `filesystem.*` keys.
//! [`migrate`] derives the layered `storage` section from those, and
//! [`ensure_storage_section`] writes it once at startup when missing.

use storage_types::{
    DEFAULT_LUKS_DEVICE, DEFAULT_LV, DEFAULT_LVM_DEVICE, DEFAULT_VG, Encryption, LayerType,
    Logical, Model, Physical,
};
use tracing::{debug, info};

use super::keys;
use super::store::ConfigStore;
use crate::error::Result;
use crate::settings::HardwareClass;

/// Provider marking a first generation appliance with a fixed layout
pub const LEGACY_PROVIDER: &str = "OpenProducts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LvmSection {
    pub device: String,
    pub lv: String,
    pub vg: String,
}

/// Contents of a freshly synthesized `storage` scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSection {
    pub model: Model,
    pub physical: Physical,
    pub block_devices: Option<Vec<String>>,
    pub logical: Logical,
    pub lvm: Option<LvmSection>,
    pub encryption: Encryption,
    pub luks_device: Option<String>,
}

impl StorageSection {
    /// Placeholder for machines without a predetermined layout
    pub fn undefined() -> Self {
        Self {
            model: Model::Dynamic,
            physical: Physical::Undefined,
            block_devices: None,
            logical: Logical::Undefined,
            lvm: None,
            encryption: Encryption::Undefined,
            luks_device: None,
        }
    }

    pub fn write_to(&self, store: &mut dyn ConfigStore) -> Result<()> {
        store.put_string(keys::SCOPE, keys::MODEL, self.model.name())?;
        store.put_string(keys::SCOPE, keys::PHYSICAL, self.physical.name())?;
        if let Some(devices) = &self.block_devices {
            store.put_list(keys::SCOPE, keys::BLOCK_DEVICES, devices)?;
        }

        store.put_string(keys::SCOPE, keys::LOGICAL, self.logical.name())?;
        if let Some(lvm) = &self.lvm {
            store.put_string(keys::SCOPE, keys::LVM_DEVICE, &lvm.device)?;
            store.put_string(keys::SCOPE, keys::LVM_LV, &lvm.lv)?;
            store.put_string(keys::SCOPE, keys::LVM_VG, &lvm.vg)?;
        }

        store.put_string(keys::SCOPE, keys::ENCRYPTION, self.encryption.name())?;
        if let Some(device) = &self.luks_device {
            store.put_string(keys::SCOPE, keys::LUKS_DEVICE, device)?;
        }
        Ok(())
    }
}

fn legacy_key(store: &dyn ConfigStore, key: &str, default: &str) -> String {
    store
        .get_string("filesystem", key)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Derive the `storage` section from the legacy flat configuration.
///
/// Reads `store`, never writes it.
pub fn migrate(
    store: &dyn ConfigStore,
    hardware: HardwareClass,
    legacy_device: &str,
) -> StorageSection {
    let legacy = store.get_string("dns", "provider").as_deref() == Some(LEGACY_PROVIDER);
    if !legacy {
        debug!("No legacy storage layout, creating dynamic placeholder");
        return StorageSection::undefined();
    }

    debug!("Migrating legacy appliance storage on {}", legacy_device);

    let (logical, lvm) = if hardware == HardwareClass::SingleDisk {
        (Logical::None, None)
    } else {
        (
            Logical::Lvm,
            Some(LvmSection {
                device: legacy_key(store, "lvmdevice", DEFAULT_LVM_DEVICE),
                lv: legacy_key(store, "lvmlv", DEFAULT_LV),
                vg: legacy_key(store, "lvmvg", DEFAULT_VG),
            }),
        )
    };

    StorageSection {
        model: Model::Static,
        physical: Physical::Block,
        block_devices: Some(vec![legacy_device.to_string()]),
        logical,
        lvm,
        encryption: Encryption::Luks,
        luks_device: Some(legacy_key(store, "luksdevice", DEFAULT_LUKS_DEVICE)),
    }
}

/// Create the `storage` scope from the legacy keys unless it already exists.
/// Returns whether anything was written.
pub fn ensure_storage_section(
    store: &mut dyn ConfigStore,
    hardware: HardwareClass,
    legacy_device: &str,
) -> Result<bool> {
    if store.has_scope(keys::SCOPE) {
        return Ok(false);
    }

    info!("Migrating configuration to a storage section");
    let section = migrate(store, hardware, legacy_device);
    section.write_to(store)?;
    info!(
        "Migration completed: {}|{}|{} ({})",
        section.physical, section.logical, section.encryption, section.model
    );
    Ok(true)
}
