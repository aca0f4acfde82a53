// SPDX-License-Identifier: GPL-3.0-only

//! Persisted storage layout
//!
//! [`StorageConfig`] owns the `storage` scope of the appliance configuration:
//! one selection per layer plus the devices implementing each selected layer.
//! Every setter persists before returning and drops the keys that no longer
//! apply to the new selection.

pub mod migrate;
pub mod store;

use storage_types::{
    DEFAULT_LUKS_DEVICE, DEFAULT_LUKS_NAME, DEFAULT_LV, DEFAULT_LVM_DEVICE, DEFAULT_VG, Encryption,
    LayerType, Logical, Model, Physical, StorageType, device_name, partition_path,
};
use tracing::{debug, error, info, warn};

use crate::error::{ProvisionError, Result};
use crate::settings::HardwareClass;
use store::ConfigStore;

pub use migrate::{StorageSection, ensure_storage_section, migrate};
pub use store::{ConfigValue, JsonConfigStore, MemoryConfigStore};

/// Keys of the `storage` scope
pub mod keys {
    pub const SCOPE: &str = "storage";

    pub const MODEL: &str = "model";
    pub const PHYSICAL: &str = "physical";
    pub const PARTITION_PATH: &str = "partition_path";
    pub const BLOCK_DEVICES: &str = "block_devices";
    pub const LOGICAL: &str = "logical";
    pub const LVM_DEVICE: &str = "lvm_device";
    pub const LVM_LV: &str = "lvm_lv";
    pub const LVM_VG: &str = "lvm_vg";
    pub const ENCRYPTION: &str = "encryption";
    pub const LUKS_DEVICE: &str = "luks_device";
}

pub struct StorageConfig {
    store: Box<dyn ConfigStore>,
    hardware: HardwareClass,
    model: Model,
    physical: Physical,
    logical: Logical,
    encryption: Encryption,
}

fn load_type<T: LayerType>(store: &dyn ConfigStore, key: &str) -> Result<T>
where
    T: Default,
{
    match store.get_string(keys::SCOPE, key) {
        Some(name) => Ok(T::from_name(&name)?),
        None => Ok(T::default()),
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("hardware", &self.hardware)
            .field("model", &self.model)
            .field("physical", &self.physical)
            .field("logical", &self.logical)
            .field("encryption", &self.encryption)
            .finish()
    }
}

impl StorageConfig {
    /// Read the current selection from `store`.
    ///
    /// Missing selections load as `Undefined`; a name that is not a known
    /// type is an error.
    pub fn load(store: Box<dyn ConfigStore>, hardware: HardwareClass) -> Result<Self> {
        let model = load_type(store.as_ref(), keys::MODEL)?;
        let physical = load_type(store.as_ref(), keys::PHYSICAL)?;
        let logical = load_type(store.as_ref(), keys::LOGICAL)?;
        let encryption = load_type(store.as_ref(), keys::ENCRYPTION)?;

        debug!(
            "Loaded storage config: model {} physical {} logical {} encryption {}",
            model, physical, logical, encryption
        );

        Ok(Self {
            store,
            hardware,
            model,
            physical,
            logical,
            encryption,
        })
    }

    pub fn store(&self) -> &dyn ConfigStore {
        self.store.as_ref()
    }

    pub fn hardware(&self) -> HardwareClass {
        self.hardware
    }

    pub fn model(&self) -> Model {
        self.model
    }

    /// Hardware with a predetermined, non configurable layout
    pub fn is_static(&self) -> bool {
        self.model == Model::Static
    }

    /// Whether the persisted selection is complete and consistent.
    ///
    /// Static layouts are always valid. Otherwise checks encryption, which in
    /// turn checks logical, which checks physical.
    pub fn is_valid(&self) -> bool {
        if self.is_static() {
            return true;
        }
        self.encryption_valid()
    }

    fn has_key(&self, key: &str) -> bool {
        self.store.has_key(keys::SCOPE, key)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.store.get_string(keys::SCOPE, key)
    }

    fn encryption_valid(&self) -> bool {
        match self.encryption {
            Encryption::None => self.logical_valid(),
            Encryption::Luks => {
                self.has_key(keys::LUKS_DEVICE)
                    && self.physical.is_block_backed()
                    && self.logical_valid()
            }
            Encryption::Undefined | Encryption::Unknown => false,
        }
    }

    fn logical_valid(&self) -> bool {
        match self.logical {
            Logical::None => {
                if self.physical == Physical::Block && self.block_devices().len() != 1 {
                    debug!("Block storage without LVM needs exactly one device");
                    return false;
                }
                self.physical_valid()
            }
            Logical::Lvm => {
                self.has_key(keys::LVM_DEVICE)
                    && self.has_key(keys::LVM_LV)
                    && self.has_key(keys::LVM_VG)
                    && self.physical.is_block_backed()
                    && self.physical_valid()
            }
            Logical::Undefined | Logical::Unknown => false,
        }
    }

    fn physical_valid(&self) -> bool {
        let partition = self.has_key(keys::PARTITION_PATH);
        let block = self.has_key(keys::BLOCK_DEVICES);

        match self.physical {
            Physical::None => !partition && !block,
            Physical::Partition => partition && !block,
            Physical::Block => !partition && block,
            Physical::Undefined | Physical::Unknown => false,
        }
    }

    /// Persist `next` under `key`, then let `update` fix up the layer's
    /// device keys. If that fails the previous type name is written back.
    fn select<T: LayerType + std::fmt::Display>(
        &mut self,
        key: &str,
        previous: T,
        next: T,
        update: impl FnOnce(&mut dyn ConfigStore) -> Result<()>,
    ) -> Result<()> {
        self.store.put_string(keys::SCOPE, key, next.name())?;

        if let Err(e) = update(self.store.as_mut()) {
            error!(
                "Failed to switch {} from {} to {}: {}",
                key, previous, next, e
            );
            if let Err(restore) = self.store.put_string(keys::SCOPE, key, previous.name()) {
                warn!("Unable to restore {} {}: {}", key, previous, restore);
            }
            return Err(e);
        }
        Ok(())
    }

    pub fn storage_type(&self) -> StorageType {
        StorageType::new(self.physical, self.logical, self.encryption)
    }

    // Physical layer

    /// Physical layers possible on this hardware
    pub fn query_physical_storage(&self) -> Vec<Physical> {
        if self.hardware.is_appliance() {
            return vec![Physical::Block];
        }
        vec![Physical::None, Physical::Partition, Physical::Block]
    }

    pub fn physical_storage(&self) -> Physical {
        self.physical
    }

    pub fn set_physical_storage(&mut self, physical: Physical) -> Result<()> {
        info!("Selecting physical storage {}", physical);
        self.select(keys::PHYSICAL, self.physical, physical, |store| {
            match physical {
                Physical::Undefined | Physical::Unknown | Physical::None => {
                    store.remove_key(keys::SCOPE, keys::PARTITION_PATH)?;
                    store.remove_key(keys::SCOPE, keys::BLOCK_DEVICES)
                }
                Physical::Partition => store.remove_key(keys::SCOPE, keys::BLOCK_DEVICES),
                Physical::Block => store.remove_key(keys::SCOPE, keys::PARTITION_PATH),
            }
        })?;

        self.physical = physical;
        Ok(())
    }

    pub fn use_physical_storage(&self, physical: Physical) -> bool {
        self.physical == physical
    }

    fn block_devices(&self) -> Vec<String> {
        self.store
            .get_list(keys::SCOPE, keys::BLOCK_DEVICES)
            .unwrap_or_default()
    }

    /// The partition path, or the block devices, of the current selection
    pub fn physical_devices(&self) -> Vec<String> {
        match self.physical {
            Physical::Partition => self.get(keys::PARTITION_PATH).into_iter().collect(),
            Physical::Block => self.block_devices(),
            _ => Vec::new(),
        }
    }

    fn require_physical(&self, expected: Physical, what: &'static str) -> Result<()> {
        if self.physical != expected {
            error!(
                "Refusing to set {} with physical storage {}",
                what, self.physical
            );
            return Err(ProvisionError::TypeMismatch {
                what,
                layer: Physical::KIND,
                current: self.physical.name(),
            });
        }
        Ok(())
    }

    /// Use an existing partition. Requires physical storage `partition`.
    pub fn set_partition(&mut self, partition: &str) -> Result<()> {
        self.require_physical(Physical::Partition, "partition path")?;
        self.store
            .put_string(keys::SCOPE, keys::PARTITION_PATH, partition)?;
        self.store.remove_key(keys::SCOPE, keys::BLOCK_DEVICES)?;
        Ok(())
    }

    /// Use whole block devices. Requires physical storage `block`.
    pub fn set_block_devices(&mut self, devices: &[String]) -> Result<()> {
        self.require_physical(Physical::Block, "block devices")?;
        if devices.is_empty() {
            return Err(ProvisionError::DeviceCount {
                what: "block devices",
                expected: 1,
                got: 0,
            });
        }
        self.store
            .put_list(keys::SCOPE, keys::BLOCK_DEVICES, devices)?;
        self.store.remove_key(keys::SCOPE, keys::PARTITION_PATH)?;
        Ok(())
    }

    // Logical layer

    /// Logical layers possible on top of `physical`
    pub fn query_logical_storage(&self, physical: Physical) -> Vec<Logical> {
        match self.hardware {
            HardwareClass::SingleDisk => vec![Logical::None],
            HardwareClass::MultiDisk => vec![Logical::Lvm],
            HardwareClass::Generic if physical.is_block_backed() => {
                vec![Logical::None, Logical::Lvm]
            }
            HardwareClass::Generic => Vec::new(),
        }
    }

    pub fn logical_storage(&self) -> Logical {
        self.logical
    }

    /// Select `logical`. Selecting LVM writes the default volume names.
    pub fn set_logical_storage(&mut self, logical: Logical) -> Result<()> {
        info!("Selecting logical storage {}", logical);
        self.select(keys::LOGICAL, self.logical, logical, |store| {
            match logical {
                Logical::Undefined | Logical::Unknown | Logical::None => {
                    store.remove_key(keys::SCOPE, keys::LVM_DEVICE)?;
                    store.remove_key(keys::SCOPE, keys::LVM_LV)?;
                    store.remove_key(keys::SCOPE, keys::LVM_VG)
                }
                Logical::Lvm => {
                    store.put_string(keys::SCOPE, keys::LVM_DEVICE, DEFAULT_LVM_DEVICE)?;
                    store.put_string(keys::SCOPE, keys::LVM_LV, DEFAULT_LV)?;
                    store.put_string(keys::SCOPE, keys::LVM_VG, DEFAULT_VG)
                }
            }
        })?;

        self.logical = logical;
        Ok(())
    }

    pub fn use_logical_storage(&self, logical: Logical) -> bool {
        self.logical == logical
    }

    pub fn logical_devices(&self) -> Vec<String> {
        match self.logical {
            Logical::Lvm => self.get(keys::LVM_DEVICE).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Set the LVM device. Requires LVM and exactly one device.
    pub fn set_logical_devices(&mut self, devices: &[String]) -> Result<()> {
        if self.logical != Logical::Lvm {
            return Err(ProvisionError::TypeMismatch {
                what: "logical devices",
                layer: Logical::KIND,
                current: self.logical.name(),
            });
        }
        let [device] = devices else {
            return Err(ProvisionError::DeviceCount {
                what: "logical devices",
                expected: 1,
                got: devices.len(),
            });
        };
        self.store.put_string(keys::SCOPE, keys::LVM_DEVICE, device)
    }

    pub fn logical_defaults(&mut self) -> Result<()> {
        self.set_logical_storage(Logical::Lvm)
    }

    pub fn lvm_volume_group(&self) -> String {
        self.get(keys::LVM_VG)
            .unwrap_or_else(|| DEFAULT_VG.to_string())
    }

    pub fn lvm_logical_volume(&self) -> String {
        self.get(keys::LVM_LV)
            .unwrap_or_else(|| DEFAULT_LV.to_string())
    }

    // Encryption layer

    /// Encryption possible on top of `physical` and `logical`
    pub fn query_encryption_storage(
        &self,
        physical: Physical,
        logical: Logical,
    ) -> Vec<Encryption> {
        if self.hardware.is_appliance() {
            return vec![Encryption::Luks];
        }
        if !physical.is_block_backed() {
            return vec![Encryption::None];
        }
        if matches!(logical, Logical::Undefined | Logical::Unknown) {
            return vec![Encryption::None];
        }
        vec![Encryption::None, Encryption::Luks]
    }

    pub fn encryption_storage(&self) -> Encryption {
        self.encryption
    }

    /// Select `encryption`. Selecting LUKS writes the default mapped device.
    pub fn set_encryption_storage(&mut self, encryption: Encryption) -> Result<()> {
        info!("Selecting encryption {}", encryption);
        self.select(keys::ENCRYPTION, self.encryption, encryption, |store| {
            match encryption {
                Encryption::Undefined | Encryption::Unknown | Encryption::None => {
                    store.remove_key(keys::SCOPE, keys::LUKS_DEVICE)
                }
                Encryption::Luks => {
                    store.put_string(keys::SCOPE, keys::LUKS_DEVICE, DEFAULT_LUKS_DEVICE)
                }
            }
        })?;

        self.encryption = encryption;
        Ok(())
    }

    pub fn use_encryption(&self, encryption: Encryption) -> bool {
        self.encryption == encryption
    }

    pub fn encryption_devices(&self) -> Vec<String> {
        match self.encryption {
            Encryption::Luks => self.get(keys::LUKS_DEVICE).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Set the mapped LUKS device. Requires LUKS and exactly one device.
    pub fn set_encryption_devices(&mut self, devices: &[String]) -> Result<()> {
        if self.encryption != Encryption::Luks {
            return Err(ProvisionError::TypeMismatch {
                what: "encryption devices",
                layer: Encryption::KIND,
                current: self.encryption.name(),
            });
        }
        let [device] = devices else {
            return Err(ProvisionError::DeviceCount {
                what: "encryption devices",
                expected: 1,
                got: devices.len(),
            });
        };
        self.store.put_string(keys::SCOPE, keys::LUKS_DEVICE, device)
    }

    pub fn encryption_defaults(&mut self) -> Result<()> {
        self.set_encryption_storage(Encryption::Luks)
    }

    /// Mapper name the LUKS container is opened under
    pub fn luks_mapper_name(&self) -> String {
        self.get(keys::LUKS_DEVICE)
            .map(|device| device_name(&device).to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_LUKS_NAME.to_string())
    }

    /// The device carrying the LUKS header: the LVM volume when LVM is used,
    /// otherwise the partition on the physical layer.
    pub fn luks_backing_device(&self) -> Option<String> {
        if self.logical == Logical::Lvm {
            return self.get(keys::LVM_DEVICE);
        }
        self.physical_top_device()
    }

    fn physical_top_device(&self) -> Option<String> {
        match self.physical {
            Physical::Block => match self.block_devices().as_slice() {
                [device] => Some(partition_path(device)),
                devices => {
                    error!(
                        "Unable to determine storage device, got {} disks",
                        devices.len()
                    );
                    None
                }
            },
            Physical::Partition => self.get(keys::PARTITION_PATH),
            _ => None,
        }
    }

    /// The device that finally gets mounted.
    ///
    /// Encryption wins over LVM, which wins over the physical layer. Block
    /// storage resolves to the first partition of its single device.
    pub fn storage_device(&self) -> Option<String> {
        if self.encryption == Encryption::Luks {
            return self.get(keys::LUKS_DEVICE);
        }
        if self.logical == Logical::Lvm {
            return self.get(keys::LVM_DEVICE);
        }
        if self.physical.is_block_backed() {
            return self.physical_top_device();
        }

        warn!("Unable to determine final storage device path");
        None
    }
}
