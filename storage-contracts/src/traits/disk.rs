// SPDX-License-Identifier: GPL-3.0-only

use storage_types::StorageDevice;

use crate::StorageError;

pub trait DiskQueryAdapter: Send + Sync {
    /// Whether a block device node exists at `device`
    fn device_exists(&self, device: &str) -> Result<bool, StorageError>;

    /// Size of the block device in bytes, 0 when no media is present
    fn device_size(&self, device: &str) -> Result<u64, StorageError>;

    /// Resolve symlinks such as /dev/disk/by-path entries to the device node
    fn resolve_device_path(&self, device: &str) -> Result<String, StorageError>;

    fn list_storage_devices(&self) -> Result<Vec<StorageDevice>, StorageError>;

    /// Look up one device by short name ("sda") or path ("/dev/sda")
    fn get_storage_device(&self, device: &str) -> Result<StorageDevice, StorageError>;
}
