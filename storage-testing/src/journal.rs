// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

/// One call made against [`FakeDisks`](crate::FakeDisks)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    DeviceExists { device: String },
    DeviceSize { device: String },
    ResolveDevicePath { device: String },
    ListStorageDevices,
    GetStorageDevice { device: String },

    PartitionDevice { device: String },

    FormatFilesystem {
        device: String,
        fs_type: String,
        label: String,
    },
    GetFilesystemLabel { device: String },
    MountFilesystem { device: String, mount_point: String },
    UnmountFilesystem { target: String },
    GetMountPoint { device: String },
    SyncPaths { source: String, destination: String },

    CreatePhysicalVolume { device: String },
    CreateVolumeGroup { vg: String, devices: Vec<String> },
    CreateLogicalVolume { vg: String, lv: String },
    ListVolumeGroups,
    ListLogicalVolumes,
    RemoveLogicalVolume { lv_path: String },
    RemoveVolumeGroup { vg: String },

    IsLuks { device: String },
    FormatLuks { device: String },
    OpenLuks { device: String, name: String },
    CloseLuks { name: String },
    IsLuksActive { name: String },
}

impl Op {
    /// Operation name as used for failure injection, e.g. "create_volume_group"
    pub fn name(&self) -> &'static str {
        match self {
            Op::DeviceExists { .. } => "device_exists",
            Op::DeviceSize { .. } => "device_size",
            Op::ResolveDevicePath { .. } => "resolve_device_path",
            Op::ListStorageDevices => "list_storage_devices",
            Op::GetStorageDevice { .. } => "get_storage_device",
            Op::PartitionDevice { .. } => "partition_device",
            Op::FormatFilesystem { .. } => "format_filesystem",
            Op::GetFilesystemLabel { .. } => "get_filesystem_label",
            Op::MountFilesystem { .. } => "mount_filesystem",
            Op::UnmountFilesystem { .. } => "unmount_filesystem",
            Op::GetMountPoint { .. } => "get_mount_point",
            Op::SyncPaths { .. } => "sync_paths",
            Op::CreatePhysicalVolume { .. } => "create_physical_volume",
            Op::CreateVolumeGroup { .. } => "create_volume_group",
            Op::CreateLogicalVolume { .. } => "create_logical_volume",
            Op::ListVolumeGroups => "list_volume_groups",
            Op::ListLogicalVolumes => "list_logical_volumes",
            Op::RemoveLogicalVolume { .. } => "remove_logical_volume",
            Op::RemoveVolumeGroup { .. } => "remove_volume_group",
            Op::IsLuks { .. } => "is_luks",
            Op::FormatLuks { .. } => "format_luks",
            Op::OpenLuks { .. } => "open_luks",
            Op::CloseLuks { .. } => "close_luks",
            Op::IsLuksActive { .. } => "is_luks_active",
        }
    }

    /// Whether the call changes disk or mount state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Op::PartitionDevice { .. }
                | Op::FormatFilesystem { .. }
                | Op::MountFilesystem { .. }
                | Op::UnmountFilesystem { .. }
                | Op::SyncPaths { .. }
                | Op::CreatePhysicalVolume { .. }
                | Op::CreateVolumeGroup { .. }
                | Op::CreateLogicalVolume { .. }
                | Op::RemoveLogicalVolume { .. }
                | Op::RemoveVolumeGroup { .. }
                | Op::FormatLuks { .. }
                | Op::OpenLuks { .. }
                | Op::CloseLuks { .. }
        )
    }
}
