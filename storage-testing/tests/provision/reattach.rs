// SPDX-License-Identifier: GPL-3.0-only

use storage_service::{
    HardwareClass, MemoryConfigStore, ProvisionError, StorageConfig, StorageManager,
    ensure_storage_section,
};
use storage_types::{Encryption, Logical, Model, Physical};

use crate::common::assertions::{DESTRUCTIVE, assert_not_called};
use crate::common::fixtures::{self, PASSWORD, STORAGE_MOUNT, block_layout};

#[test]
fn existing_storage_is_reattached_after_reboot() {
    let disks = fixtures::machine();
    let layout = block_layout(&["/dev/sdb"], true, true);
    fixtures::manager(&disks, &layout)
        .initialize(PASSWORD)
        .expect("first boot");

    disks.reboot();
    disks.clear_journal();
    let mut manager = fixtures::manager(&disks, &layout);
    assert!(manager.storage_area_exists());
    assert!(manager.is_locked());

    manager.initialize(PASSWORD).expect("second boot");

    assert_not_called(&disks, DESTRUCTIVE);
    assert_not_called(&disks, &["sync_paths"]);
    assert!(disks.is_mapped("opi"));
    assert_eq!(
        disks.mount_point_of("/dev/mapper/opi").as_deref(),
        Some(STORAGE_MOUNT)
    );
}

#[test]
fn wrong_password_on_boot_leaves_data_alone() {
    let disks = fixtures::machine();
    let layout = block_layout(&["/dev/sdb"], true, true);
    fixtures::manager(&disks, &layout)
        .initialize(PASSWORD)
        .expect("first boot");

    disks.reboot();
    disks.clear_journal();
    let mut manager = fixtures::manager(&disks, &layout);
    let err = manager.initialize("not the password").unwrap_err();

    assert!(matches!(err, ProvisionError::WrongPassword));
    assert!(!manager.is_initialized());
    assert_not_called(&disks, DESTRUCTIVE);
    assert!(disks.mount_point_of("/dev/mapper/opi").is_none());
}

#[test]
fn plain_partition_with_label_is_reused() {
    let disks = fixtures::machine();
    let layout = block_layout(&["/dev/sdb"], false, false);
    fixtures::manager(&disks, &layout)
        .initialize(PASSWORD)
        .expect("first boot");

    disks.reboot();
    disks.clear_journal();
    fixtures::manager(&disks, &layout)
        .initialize(PASSWORD)
        .expect("second boot");

    assert_not_called(&disks, DESTRUCTIVE);
    assert_eq!(
        disks.mount_point_of("/dev/sdb1").as_deref(),
        Some(STORAGE_MOUNT)
    );
}

#[test]
fn legacy_appliance_is_migrated_and_provisioned() {
    let disks = fixtures::machine();
    let mut store = MemoryConfigStore::from_json(
        r#"{"dns": {"provider": "OpenProducts"},
            "filesystem": {"lvmvg": "legacy", "lvmlv": "vol", "lvmdevice": "/dev/legacy/vol"}}"#,
    )
    .expect("legacy config");
    assert!(
        ensure_storage_section(&mut store, HardwareClass::MultiDisk, "/dev/sdb")
            .expect("migrate")
    );

    let config = StorageConfig::load(Box::new(store), HardwareClass::MultiDisk)
        .expect("load");
    assert_eq!(config.model(), Model::Static);
    assert!(config.use_physical_storage(Physical::Block));
    assert!(config.use_logical_storage(Logical::Lvm));
    assert!(config.use_encryption(Encryption::Luks));

    let mut manager = StorageManager::new(config, disks.clone(), fixtures::settings());
    manager
        .initialize(PASSWORD)
        .expect("initialize migrated storage");

    assert!(disks.has_volume_group("legacy"));
    assert!(disks.has_node("/dev/legacy/vol"));
    assert_eq!(
        disks.mount_point_of("/dev/mapper/opi").as_deref(),
        Some(STORAGE_MOUNT)
    );
}

#[test]
fn unreadable_label_stops_initialize_before_formatting() {
    let disks = fixtures::machine();
    let layout = block_layout(&["/dev/sdb"], true, true);
    fixtures::manager(&disks, &layout)
        .initialize(PASSWORD)
        .expect("first boot");

    disks.reboot();
    disks.clear_journal();
    disks.fail_on("get_filesystem_label");
    let mut manager = fixtures::manager(&disks, &layout);

    let err = manager.initialize(PASSWORD).unwrap_err();

    assert!(matches!(err, ProvisionError::Storage(_)));
    assert!(!manager.is_initialized());
    assert!(disks.called("get_filesystem_label"));
    assert_not_called(&disks, DESTRUCTIVE);
    assert_not_called(&disks, &["sync_paths", "mount_filesystem"]);
    assert_eq!(disks.label_of("/dev/mapper/opi").as_deref(), Some("KGP"));
}
