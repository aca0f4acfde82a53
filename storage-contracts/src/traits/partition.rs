// SPDX-License-Identifier: GPL-3.0-only

use crate::StorageError;

pub trait PartitionOpsAdapter: Send + Sync {
    /// Write a fresh partition table holding one partition that spans the
    /// whole device. The partition node appears asynchronously.
    fn partition_device(&self, device: &str) -> Result<(), StorageError>;
}
