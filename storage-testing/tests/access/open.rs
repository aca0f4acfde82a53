// SPDX-License-Identifier: GPL-3.0-only

use storage_service::ProvisionError;

use crate::common::fixtures::{self, PASSWORD, block_layout};

fn locked_machine() -> (
    std::sync::Arc<storage_testing::FakeDisks>,
    storage_service::StorageManager,
) {
    let disks = fixtures::machine();
    let layout = block_layout(&["/dev/sdb"], true, true);
    fixtures::manager(&disks, &layout)
        .initialize(PASSWORD)
        .expect("provision storage");

    disks.reboot();
    disks.clear_journal();
    let manager = fixtures::manager(&disks, &layout);
    (disks, manager)
}

#[test]
fn wrong_password_is_reported_and_storage_stays_unmounted() {
    let (disks, mut manager) = locked_machine();
    assert!(manager.storage_area_exists());
    assert!(manager.is_locked());

    let err = manager.open("hunter2").unwrap_err();

    assert!(matches!(err, ProvisionError::WrongPassword));
    assert!(err.to_string().contains("wrong password"));
    assert!(!err.is_configuration());
    assert!(manager.is_locked());
    assert!(disks.mount_point_of("/dev/mapper/opi").is_none());
    assert!(!disks.called("mount_filesystem"));
}

#[test]
fn open_unlocks_without_mounting() {
    let (disks, mut manager) = locked_machine();

    manager.open(PASSWORD).expect("open storage");

    assert!(!manager.is_locked());
    assert!(disks.is_mapped("opi"));
    assert!(disks.mount_point_of("/dev/mapper/opi").is_none());
    assert!(!manager.is_initialized());
}

#[test]
fn open_is_idempotent() {
    let (disks, mut manager) = locked_machine();
    manager.open(PASSWORD).expect("first open");

    disks.clear_journal();
    manager.open(PASSWORD).expect("second open");

    assert!(!disks.called("open_luks"));
    assert!(disks.called("is_luks_active"));
}

#[test]
fn open_without_encryption_does_nothing() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], true, false));

    manager.open(PASSWORD).expect("open unencrypted storage");

    assert!(!manager.use_locking());
    assert!(!manager.is_locked());
    assert!(disks.journal().is_empty());
}
