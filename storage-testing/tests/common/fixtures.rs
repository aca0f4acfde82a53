// SPDX-License-Identifier: GPL-3.0-only

use std::sync::Arc;

use serde_json::{Value, json};
use storage_service::{
    HardwareClass, MemoryConfigStore, ServiceSettings, SettlePolicy, StorageConfig,
    StorageManager,
};
use storage_testing::FakeDisks;

pub const GIB: u64 = 1024 * 1024 * 1024;

pub const PASSWORD: &str = "correct horse";

pub const STORAGE_MOUNT: &str = "/var/opi";

pub const STAGING_MOUNT: &str = "/mnt/tmp";

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("storage_service=debug,storage_testing=debug")
        .with_test_writer()
        .try_init();
}

/// Default settings without any settle delays, one probe per check
pub fn settings() -> ServiceSettings {
    ServiceSettings {
        storage_mount: STORAGE_MOUNT.into(),
        staging_mount: STAGING_MOUNT.into(),
        settle: SettlePolicy {
            probe_attempts: 1,
            ..SettlePolicy::immediate()
        },
        ..ServiceSettings::default()
    }
}

/// Two empty data disks plus an OS disk with a spare partition
pub fn machine() -> Arc<FakeDisks> {
    Arc::new(
        FakeDisks::new()
            .with_disk("/dev/sda", 32 * GIB)
            .with_partition("/dev/sda", "/dev/sda3", 16 * GIB)
            .with_disk("/dev/sdb", 8 * GIB)
            .with_disk("/dev/sdc", 8 * GIB)
            .with_link("/dev/disk/by-path/platform-ata-2", "/dev/sdb"),
    )
}

pub fn lvm_keys(storage: &mut Value) {
    storage["logical"] = json!("lvm");
    storage["lvm_device"] = json!("/dev/pool/data");
    storage["lvm_lv"] = json!("data");
    storage["lvm_vg"] = json!("pool");
}

pub fn luks_keys(storage: &mut Value) {
    storage["encryption"] = json!("luks");
    storage["luks_device"] = json!("/dev/mapper/opi");
}

/// Dynamic block storage on `devices`, optionally with LVM and LUKS
pub fn block_layout(devices: &[&str], lvm: bool, luks: bool) -> Value {
    let mut storage = json!({
        "model": "dynamic",
        "physical": "block",
        "block_devices": devices,
        "logical": "none",
        "encryption": "none",
    });
    if lvm {
        lvm_keys(&mut storage);
    }
    if luks {
        luks_keys(&mut storage);
    }
    storage
}

/// Dynamic storage on an existing partition
pub fn partition_layout(partition: &str, lvm: bool, luks: bool) -> Value {
    let mut storage = json!({
        "model": "dynamic",
        "physical": "partition",
        "partition_path": partition,
        "logical": "none",
        "encryption": "none",
    });
    if lvm {
        lvm_keys(&mut storage);
    }
    if luks {
        luks_keys(&mut storage);
    }
    storage
}

pub fn config(storage: &Value) -> StorageConfig {
    let document = json!({ "storage": storage }).to_string();
    let store = MemoryConfigStore::from_json(&document)
        .expect("valid test config");
    StorageConfig::load(Box::new(store), HardwareClass::Generic)
        .expect("load test config")
}

/// A manager as constructed on a fresh boot of `disks`
pub fn manager(disks: &Arc<FakeDisks>, storage: &Value) -> StorageManager {
    init_logging();
    StorageManager::new(config(storage), disks.clone(), settings())
}
