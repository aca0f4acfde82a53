// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;
use std::sync::Arc;

use storage_contracts::traits::{
    DiskOps, DiskQueryAdapter, FilesystemOpsAdapter, LuksOpsAdapter, LvmOpsAdapter,
    PartitionOpsAdapter,
};
use storage_contracts::StorageError;
use storage_sys::{disk, filesystem, logical::lvm_tools, luks, partition};
use storage_types::{LogicalVolumeInfo, StorageDevice, VolumeGroupInfo};

/// Disk operations backed by the system storage tools
#[derive(Debug, Clone, Default)]
pub struct SystemDisks;

impl SystemDisks {
    pub fn new() -> Self {
        Self
    }
}

pub fn build_default_adapter() -> Arc<dyn DiskOps> {
    Arc::new(SystemDisks::new())
}

fn context(action: &str, target: &str) -> impl FnOnce(storage_sys::SysError) -> StorageError {
    let prefix = format!("Failed to {action} {target}");
    move |e| {
        let err = StorageError::from(e);
        StorageError::new(err.kind, format!("{prefix}: {}", err.message))
    }
}

impl DiskQueryAdapter for SystemDisks {
    fn device_exists(&self, device: &str) -> Result<bool, StorageError> {
        disk::device_exists(device)
            .map_err(context("probe", device))
    }

    fn device_size(&self, device: &str) -> Result<u64, StorageError> {
        disk::device_size(device)
            .map_err(context("read size of", device))
    }

    fn resolve_device_path(&self, device: &str) -> Result<String, StorageError> {
        disk::resolve_device_path(device)
            .map(|path| path.to_string_lossy().to_string())
            .map_err(context("resolve", device))
    }

    fn list_storage_devices(&self) -> Result<Vec<StorageDevice>, StorageError> {
        disk::list_storage_devices()
            .map_err(context("enumerate", "block devices"))
    }

    fn get_storage_device(&self, device: &str) -> Result<StorageDevice, StorageError> {
        disk::get_storage_device(device)
            .map_err(context("look up", device))
    }
}

impl PartitionOpsAdapter for SystemDisks {
    fn partition_device(&self, device: &str) -> Result<(), StorageError> {
        partition::partition_device(device)
            .map_err(context("partition", device))
    }
}

impl FilesystemOpsAdapter for SystemDisks {
    fn format_filesystem(
        &self,
        device: &str,
        fs_type: &str,
        label: &str,
    ) -> Result<(), StorageError> {
        filesystem::format_filesystem(device, fs_type, label)
            .map_err(context("format", device))
    }

    fn get_filesystem_label(&self, device: &str) -> Result<Option<String>, StorageError> {
        filesystem::get_filesystem_label(device)
            .map_err(context("read label of", device))
    }

    fn mount_filesystem(&self, device: &str, mount_point: &Path) -> Result<(), StorageError> {
        filesystem::mount_filesystem(device, mount_point)
            .map_err(context("mount", device))
    }

    fn unmount_filesystem(&self, device_or_mount: &str) -> Result<(), StorageError> {
        filesystem::unmount_filesystem(device_or_mount)
            .map_err(context("unmount", device_or_mount))
    }

    fn get_mount_point(&self, device: &str) -> Result<Option<String>, StorageError> {
        filesystem::get_mount_point(device)
            .map_err(context("look up mounts of", device))
    }

    fn sync_paths(&self, source: &Path, destination: &Path) -> Result<(), StorageError> {
        filesystem::sync_paths(source, destination)
            .map_err(context("copy", &source.display().to_string()))
    }
}

impl LvmOpsAdapter for SystemDisks {
    fn create_physical_volume(&self, device: &str) -> Result<(), StorageError> {
        lvm_tools::create_physical_volume(device)
            .map_err(context("create physical volume on", device))
    }

    fn create_volume_group(&self, vg_name: &str, devices: &[String]) -> Result<(), StorageError> {
        lvm_tools::create_volume_group(vg_name, devices)
            .map_err(context("create volume group", vg_name))
    }

    fn create_logical_volume(&self, vg_name: &str, lv_name: &str) -> Result<String, StorageError> {
        let volume = format!("{vg_name}/{lv_name}");
        lvm_tools::create_logical_volume(vg_name, lv_name)
            .map_err(context("create logical volume", &volume))
    }

    fn list_volume_groups(&self) -> Result<Vec<VolumeGroupInfo>, StorageError> {
        lvm_tools::list_volume_groups()
            .map_err(context("list", "volume groups"))
    }

    fn list_logical_volumes(&self) -> Result<Vec<LogicalVolumeInfo>, StorageError> {
        lvm_tools::list_logical_volumes()
            .map_err(context("list", "logical volumes"))
    }

    fn remove_logical_volume(&self, lv_path: &str) -> Result<(), StorageError> {
        lvm_tools::remove_logical_volume(lv_path)
            .map_err(context("remove", lv_path))
    }

    fn remove_volume_group(&self, vg_name: &str) -> Result<(), StorageError> {
        lvm_tools::remove_volume_group(vg_name)
            .map_err(context("remove volume group", vg_name))
    }
}

impl LuksOpsAdapter for SystemDisks {
    fn is_luks(&self, device: &str) -> Result<bool, StorageError> {
        luks::is_luks(device)
            .map_err(context("probe LUKS header on", device))
    }

    fn format_luks(&self, device: &str, passphrase: &str) -> Result<(), StorageError> {
        luks::format_luks(device, passphrase)
            .map_err(context("format LUKS on", device))
    }

    fn open_luks(
        &self,
        device: &str,
        name: &str,
        passphrase: &str,
    ) -> Result<String, StorageError> {
        luks::open_luks(device, name, passphrase)
            .map_err(context("unlock", device))
    }

    fn close_luks(&self, name: &str) -> Result<(), StorageError> {
        luks::close_luks(name).map_err(context("lock", name))
    }

    fn is_luks_active(&self, name: &str) -> Result<bool, StorageError> {
        luks::is_luks_active(name)
            .map_err(context("query LUKS mapping", name))
    }
}
