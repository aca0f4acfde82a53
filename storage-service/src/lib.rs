// SPDX-License-Identifier: GPL-3.0-only

//! Appliance storage service
//!
//! Keeps the layered storage configuration of the appliance and provisions
//! the storage area it describes:
//!
//! - [`config`]: the persisted `storage` section and the legacy migration
//! - [`manager`]: partitioning, LVM, LUKS, filesystem creation and mounting
//! - [`adapters`]: the system-tool backed disk operations used in production
//!
//! Disk access always goes through [`storage_contracts::DiskOps`], injected
//! into [`StorageManager`] at construction.

pub mod adapters;
pub mod config;
pub mod error;
pub mod manager;
pub mod settings;

pub use config::store::ConfigStore;
pub use config::{
    JsonConfigStore, MemoryConfigStore, StorageConfig, ensure_storage_section, migrate,
};
pub use error::{ProvisionError, Result};
pub use manager::{Scenario, StorageManager};
pub use settings::{HardwareClass, ServiceSettings, SettlePolicy};
