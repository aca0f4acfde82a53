// SPDX-License-Identifier: GPL-3.0-only

//! Low-level system operations for appliance storage
//!
//! Thin wrappers over the system storage tools:
//! - Block device discovery (`lsblk`, sysfs)
//! - Partition tables (`sfdisk`)
//! - Filesystems and mounts (`mkfs.*`, `blkid`, `mount`, `umount`, `rsync`)
//! - LVM (`pvcreate`, `vgcreate`, `lvcreate`, `vgs`, `lvs`, ...)
//! - LUKS (`cryptsetup`)
//!
//! These operations require elevated privileges and should only be called
//! from the privileged storage service.

pub mod cmd;
pub mod disk;
pub mod error;
pub mod filesystem;
pub mod logical;
pub mod luks;
pub mod partition;

pub use error::{Result, SysError};
