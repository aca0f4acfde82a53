// SPDX-License-Identifier: GPL-3.0-only

pub mod disk;
pub mod filesystem;
pub mod luks;
pub mod lvm;
pub mod partition;

pub use disk::DiskQueryAdapter;
pub use filesystem::FilesystemOpsAdapter;
pub use luks::LuksOpsAdapter;
pub use lvm::LvmOpsAdapter;
pub use partition::PartitionOpsAdapter;

/// Everything the provisioning engine needs from the disk-operations library.
pub trait DiskOps:
    DiskQueryAdapter + PartitionOpsAdapter + FilesystemOpsAdapter + LvmOpsAdapter + LuksOpsAdapter
{
}

impl<T> DiskOps for T where
    T: DiskQueryAdapter
        + PartitionOpsAdapter
        + FilesystemOpsAdapter
        + LvmOpsAdapter
        + LuksOpsAdapter
{
}
