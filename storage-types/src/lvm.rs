//! LVM (Logical Volume Manager) types
//!
//! Snapshots of the volume groups and logical volumes reported by the LVM tools.

use serde::{Deserialize, Serialize};

/// Volume group information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeGroupInfo {
    /// Volume group name
    pub name: String,

    /// Total size in bytes
    pub size: u64,

    /// Free space in bytes
    pub free: u64,

    /// Number of physical volumes
    pub pv_count: u32,

    /// Number of logical volumes
    pub lv_count: u32,
}

/// Logical volume information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalVolumeInfo {
    /// Logical volume name
    pub name: String,

    /// Parent volume group name
    pub vg_name: String,

    /// Size in bytes
    pub size: u64,

    /// Device path (e.g., "/dev/pool/data")
    pub device_path: String,

    /// Whether the logical volume is active
    pub active: bool,
}

impl LogicalVolumeInfo {
    /// Whether this is `lv_name` in `vg_name`
    pub fn is(&self, vg_name: &str, lv_name: &str) -> bool {
        self.vg_name == vg_name && self.name == lv_name
    }
}
