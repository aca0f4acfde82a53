// SPDX-License-Identifier: GPL-3.0-only

//! Contracts between the provisioning engine and the disk-operations library.
//!
//! The engine only sequences calls; every partition, filesystem, LVM and LUKS
//! primitive lives behind the traits in [`traits`]. All calls are blocking.

pub mod protocol;
pub mod traits;

pub use protocol::{StorageError, StorageErrorKind};
pub use traits::{
    DiskOps, DiskQueryAdapter, FilesystemOpsAdapter, LuksOpsAdapter, LvmOpsAdapter,
    PartitionOpsAdapter,
};
