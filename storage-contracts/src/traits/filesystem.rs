// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use crate::StorageError;

pub trait FilesystemOpsAdapter: Send + Sync {
    fn format_filesystem(&self, device: &str, fs_type: &str, label: &str)
    -> Result<(), StorageError>;

    /// Label of the filesystem on `device`, None when it carries no filesystem
    fn get_filesystem_label(&self, device: &str) -> Result<Option<String>, StorageError>;

    fn mount_filesystem(&self, device: &str, mount_point: &Path) -> Result<(), StorageError>;

    fn unmount_filesystem(&self, device_or_mount: &str) -> Result<(), StorageError>;

    /// Where `device` is currently mounted, if anywhere
    fn get_mount_point(&self, device: &str) -> Result<Option<String>, StorageError>;

    /// Copy the contents of `source` into `destination`, preserving ownership
    /// and permissions
    fn sync_paths(&self, source: &Path, destination: &Path) -> Result<(), StorageError>;
}
