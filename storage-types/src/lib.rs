// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for appliance storage provisioning
//!
//! These types are shared by every layer of the stack:
//!
//! - **storage-contracts**: the disk-operations traits speak in these types
//! - **storage-sys**: builds [`StorageDevice`] snapshots from the running system
//! - **storage-service**: persists layer selections and drives provisioning
//!
//! ## Layer model
//!
//! A storage stack is `Physical` → optional `Logical` → optional `Encryption`,
//! with a `Model` telling whether the layout is fixed by the hardware.

pub mod common;
pub mod defaults;
pub mod device;
pub mod layer;
pub mod lvm;

pub use common::{SECTOR_SIZE, bytes_to_pretty, device_name, partition_path};
pub use defaults::*;
pub use device::{Characteristic, MapperKind, StorageDevice};
pub use layer::{
    Encryption, LayerType, Logical, Model, Physical, StorageType, TypeEntry, UnknownTypeName,
};
pub use lvm::{LogicalVolumeInfo, VolumeGroupInfo};
