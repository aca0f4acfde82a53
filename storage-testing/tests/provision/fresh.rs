// SPDX-License-Identifier: GPL-3.0-only

use storage_testing::Op;

use crate::common::assertions::{DESTRUCTIVE, assert_not_called, op_names};
use crate::common::fixtures::{
    self, PASSWORD, STAGING_MOUNT, STORAGE_MOUNT, block_layout, partition_layout,
};

#[test]
fn block_lvm_luks_is_built_and_mounted() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], true, true));
    assert!(!manager.storage_area_exists());

    manager.initialize(PASSWORD).expect("initialize storage");

    assert!(manager.is_initialized());
    assert!(disks.has_node("/dev/sdb1"));
    assert!(disks.has_volume_group("pool"));
    assert!(disks.is_mapped("opi"));
    assert_eq!(disks.label_of("/dev/mapper/opi").as_deref(), Some("KGP"));
    assert_eq!(
        disks.mount_point_of("/dev/mapper/opi").as_deref(),
        Some(STORAGE_MOUNT)
    );
    assert!(manager.storage_area_exists());
    assert!(!manager.is_locked());

    assert!(disks.mutations().contains(&Op::CreateVolumeGroup {
        vg: "pool".to_string(),
        devices: vec!["/dev/sdb1".to_string()],
    }));
    assert!(disks.mutations().contains(&Op::OpenLuks {
        device: "/dev/pool/data".to_string(),
        name: "opi".to_string(),
    }));
}

#[test]
fn layers_are_built_bottom_up_then_synced() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], true, true));

    manager.initialize(PASSWORD).expect("initialize storage");

    assert_eq!(
        op_names(&disks.mutations()),
        vec![
            "partition_device",
            "create_physical_volume",
            "create_volume_group",
            "create_logical_volume",
            "format_luks",
            "open_luks",
            "format_filesystem",
            "mount_filesystem",
            "sync_paths",
            "unmount_filesystem",
            "mount_filesystem",
        ]
    );
    assert!(disks.mutations().contains(&Op::SyncPaths {
        source: STORAGE_MOUNT.to_string(),
        destination: STAGING_MOUNT.to_string(),
    }));
}

#[test]
fn second_initialize_only_remounts() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], false, false));
    manager.initialize(PASSWORD).expect("first initialize");

    disks.clear_journal();
    manager.initialize(PASSWORD).expect("second initialize");

    assert_not_called(&disks, DESTRUCTIVE);
    assert_not_called(&disks, &["sync_paths"]);
    assert_eq!(
        disks.mount_point_of("/dev/sdb1").as_deref(),
        Some(STORAGE_MOUNT)
    );
}

#[test]
fn plain_block_device_gets_a_single_partition() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], false, false));

    manager.initialize(PASSWORD).expect("initialize storage");

    assert_eq!(manager.device_path().as_deref(), Some("/dev/sdb1"));
    assert_eq!(disks.label_of("/dev/sdb1").as_deref(), Some("KGP"));
    assert_eq!(
        disks.mount_point_of("/dev/sdb1").as_deref(),
        Some(STORAGE_MOUNT)
    );
    assert_not_called(&disks, &["create_volume_group", "format_luks"]);
}

#[test]
fn symlinked_block_device_is_resolved_before_partitioning() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(
        &disks,
        &block_layout(&["/dev/disk/by-path/platform-ata-2"], true, false),
    );

    manager.initialize(PASSWORD).expect("initialize storage");

    assert!(disks.mutations().contains(&Op::PartitionDevice {
        device: "/dev/sdb".to_string(),
    }));
    assert!(disks.has_node("/dev/sdb1"));
    assert_eq!(
        disks.mount_point_of("/dev/pool/data").as_deref(),
        Some(STORAGE_MOUNT)
    );
}

#[test]
fn multi_disk_lvm_spans_all_devices() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(
        &disks,
        &block_layout(&["/dev/sdb", "/dev/sdc"], true, false),
    );

    manager.initialize(PASSWORD).expect("initialize storage");

    assert!(disks.mutations().contains(&Op::CreateVolumeGroup {
        vg: "pool".to_string(),
        devices: vec!["/dev/sdb1".to_string(), "/dev/sdc1".to_string()],
    }));
    assert_eq!(manager.size().expect("size"), 16 * fixtures::GIB);
    assert_eq!(
        disks.mount_point_of("/dev/pool/data").as_deref(),
        Some(STORAGE_MOUNT)
    );
}

#[test]
fn existing_partition_is_encrypted_in_place() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(&disks, &partition_layout("/dev/sda3", false, true));

    manager.initialize(PASSWORD).expect("initialize storage");

    assert_not_called(&disks, &["partition_device", "create_volume_group"]);
    assert!(disks.mutations().contains(&Op::FormatLuks {
        device: "/dev/sda3".to_string(),
    }));
    assert_eq!(
        disks.mount_point_of("/dev/mapper/opi").as_deref(),
        Some(STORAGE_MOUNT)
    );
}

#[test]
fn no_physical_storage_touches_no_disks() {
    let disks = fixtures::machine();
    let storage = serde_json::json!({
        "model": "dynamic",
        "physical": "none",
        "logical": "none",
        "encryption": "none",
    });
    let mut manager = fixtures::manager(&disks, &storage);

    manager
        .initialize(PASSWORD)
        .expect("initialize without storage");

    assert!(disks.journal().is_empty());
    assert!(manager.device_path().is_none());
}

#[test]
fn flapping_partition_node_settles() {
    let disks = fixtures::machine();
    disks.script_probe("/dev/sdb1", &[true, false, true]);
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], true, false));

    manager.initialize(PASSWORD).expect("initialize storage");

    assert!(disks.has_volume_group("pool"));
    assert_eq!(
        disks.mount_point_of("/dev/pool/data").as_deref(),
        Some(STORAGE_MOUNT)
    );
}
