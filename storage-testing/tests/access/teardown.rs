// SPDX-License-Identifier: GPL-3.0-only

use crate::common::fixtures::{self, PASSWORD, STORAGE_MOUNT, block_layout};

#[test]
fn teardown_removes_the_stack() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], true, true));
    manager.initialize(PASSWORD).expect("initialize storage");

    manager.teardown().expect("teardown");

    assert!(!manager.is_initialized());
    assert!(disks.mount_point_of("/dev/mapper/opi").is_none());
    assert!(!disks.is_mapped("opi"));
    assert!(!disks.has_node("/dev/pool/data"));
    assert!(!disks.has_volume_group("pool"));
    assert!(disks.has_node("/dev/sdb1"));
    assert!(!manager.storage_area_exists());
}

#[test]
fn storage_can_be_rebuilt_after_teardown() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], true, false));
    manager.initialize(PASSWORD).expect("initialize storage");
    manager.teardown().expect("teardown");

    manager.initialize(PASSWORD).expect("initialize again");

    assert!(disks.has_volume_group("pool"));
    assert_eq!(
        disks.mount_point_of("/dev/pool/data").as_deref(),
        Some(STORAGE_MOUNT)
    );
}

#[test]
fn teardown_of_nothing_is_harmless() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], true, true));

    manager.teardown().expect("teardown without storage");

    assert!(disks.mutations().is_empty());
}
