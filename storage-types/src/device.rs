//! Block device descriptors
//!
//! A [`StorageDevice`] is a point-in-time snapshot of one block device as seen
//! by the disk-operations layer. It is never updated in place; query again to
//! get a fresh view.

use serde::{Deserialize, Serialize};

use crate::common::SECTOR_SIZE;

/// Mount points that mark the system/boot device
const BOOT_MOUNT_POINTS: &[&str] = &["/", "/boot", "/boot/efi"];

/// Kind of device-mapper target backing a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapperKind {
    Lvm,
    Luks,
    Other,
}

/// Queryable device characteristics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Characteristic {
    /// Device is mounted
    Mounted,
    /// Device is a partition
    Partition,
    /// Device is a physical disk
    Physical,
    /// Device is read only
    ReadOnly,
    /// Device is removable
    Removable,
    /// Device holds the root filesystem
    RootDevice,
    /// Device is, or contains, the system/boot filesystem
    BootDevice,
    /// Device is a device-mapper node
    DeviceMapper,
    /// Device is an LVM logical volume
    LvmDevice,
    /// Device is an opened LUKS mapping
    LuksDevice,
}

/// Snapshot of a single block device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDevice {
    // === Identity ===
    /// Short kernel name (e.g., "sda", "dm-0")
    pub name: String,

    /// Path under /sys/class/block
    pub sys_path: String,

    /// Device node (e.g., "/dev/sda")
    pub device_path: String,

    /// Mapped path (e.g., "/dev/mapper/pool-data") for device-mapper nodes
    pub mapper_path: Option<String>,

    /// Human readable model name
    pub model: String,

    // === State ===
    pub mount_points: Vec<String>,

    /// Size in bytes
    pub size: u64,

    pub is_partition: bool,
    pub is_physical: bool,
    pub read_only: bool,
    pub removable: bool,

    /// Device-mapper target kind, None for plain devices
    pub mapper_kind: Option<MapperKind>,

    /// Child partitions (only populated for whole disks)
    pub partitions: Vec<StorageDevice>,
}

impl StorageDevice {
    /// Size in 512 byte blocks
    pub fn blocks(&self) -> u64 {
        self.size / SECTOR_SIZE
    }

    pub fn is_mounted(&self) -> bool {
        !self.mount_points.is_empty()
    }

    /// LVM device path, if this is a logical volume
    pub fn lvm_path(&self) -> Option<&str> {
        match self.mapper_kind {
            Some(MapperKind::Lvm) => self.mapper_path.as_deref(),
            _ => None,
        }
    }

    /// Mapper path, if this is an opened LUKS device
    pub fn luks_path(&self) -> Option<&str> {
        match self.mapper_kind {
            Some(MapperKind::Luks) => self.mapper_path.as_deref(),
            _ => None,
        }
    }

    pub fn is(&self, characteristic: Characteristic) -> bool {
        match characteristic {
            Characteristic::Mounted => self.is_mounted(),
            Characteristic::Partition => self.is_partition,
            Characteristic::Physical => self.is_physical,
            Characteristic::ReadOnly => self.read_only,
            Characteristic::Removable => self.removable,
            Characteristic::RootDevice => self.mount_points.iter().any(|mp| mp == "/"),
            Characteristic::BootDevice => self.holds_boot_filesystem(),
            Characteristic::DeviceMapper => self.mapper_kind.is_some(),
            Characteristic::LvmDevice => self.mapper_kind == Some(MapperKind::Lvm),
            Characteristic::LuksDevice => self.mapper_kind == Some(MapperKind::Luks),
        }
    }

    fn holds_boot_filesystem(&self) -> bool {
        self.mount_points
            .iter()
            .any(|mp| BOOT_MOUNT_POINTS.contains(&mp.as_str()))
            || self.partitions.iter().any(StorageDevice::holds_boot_filesystem)
    }

    /// Get a human-readable display name for the device
    pub fn display_name(&self) -> String {
        if !self.model.is_empty() {
            format!("{} ({})", self.model, self.name)
        } else {
            self.name.clone()
        }
    }
}
