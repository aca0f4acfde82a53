// SPDX-License-Identifier: GPL-3.0-only

use storage_types::{LogicalVolumeInfo, VolumeGroupInfo};

use crate::StorageError;

pub trait LvmOpsAdapter: Send + Sync {
    fn create_physical_volume(&self, device: &str) -> Result<(), StorageError>;

    fn create_volume_group(&self, vg_name: &str, devices: &[String]) -> Result<(), StorageError>;

    /// Create a logical volume using all free space of the volume group.
    /// Returns the device path of the new volume.
    fn create_logical_volume(&self, vg_name: &str, lv_name: &str) -> Result<String, StorageError>;

    fn list_volume_groups(&self) -> Result<Vec<VolumeGroupInfo>, StorageError>;

    fn list_logical_volumes(&self) -> Result<Vec<LogicalVolumeInfo>, StorageError>;

    fn remove_logical_volume(&self, lv_path: &str) -> Result<(), StorageError>;

    fn remove_volume_group(&self, vg_name: &str) -> Result<(), StorageError>;
}
