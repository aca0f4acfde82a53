// SPDX-License-Identifier: GPL-3.0-only

use storage_contracts::StorageErrorKind;
use storage_service::ProvisionError;

use crate::common::assertions::{DESTRUCTIVE, assert_not_called};
use crate::common::fixtures::{self, PASSWORD, STORAGE_MOUNT, block_layout};

#[test]
fn first_failing_step_stops_provisioning() {
    let disks = fixtures::machine();
    disks.fail_on("create_volume_group");
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], true, true));

    let err = manager.initialize(PASSWORD).unwrap_err();

    match err {
        ProvisionError::Storage(inner) => assert!(inner.is(StorageErrorKind::Internal)),
        other => panic!("expected a storage error, got {other:?}"),
    }
    assert!(!manager.is_initialized());
    assert!(disks.called("partition_device"));
    assert_not_called(
        &disks,
        &[
            "create_logical_volume",
            "format_luks",
            "format_filesystem",
            "mount_filesystem",
        ],
    );
}

#[test]
fn half_built_stack_is_completed_on_retry() {
    let disks = fixtures::machine();
    disks.fail_on("format_filesystem");
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], true, true));
    assert!(manager.initialize(PASSWORD).is_err());
    assert!(disks.is_mapped("opi"));

    disks.heal();
    disks.clear_journal();
    manager.initialize(PASSWORD).expect("retry initialize");

    assert_not_called(
        &disks,
        &[
            "partition_device",
            "create_physical_volume",
            "create_volume_group",
            "create_logical_volume",
            "format_luks",
            "open_luks",
        ],
    );
    assert!(disks.called("format_filesystem"));
    assert!(disks.called("sync_paths"));
    assert_eq!(
        disks.mount_point_of("/dev/mapper/opi").as_deref(),
        Some(STORAGE_MOUNT)
    );
}

#[test]
fn multi_disk_block_without_lvm_is_rejected() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(
        &disks,
        &block_layout(&["/dev/sdb", "/dev/sdc"], false, false),
    );
    assert!(!manager.config().is_valid());

    let err = manager.initialize(PASSWORD).unwrap_err();

    assert!(matches!(
        err,
        ProvisionError::DeviceCount {
            expected: 1,
            got: 2,
            ..
        }
    ));
    assert!(err.is_configuration());
    assert!(disks.mutations().is_empty());
}

#[test]
fn undefined_layer_has_no_scenario() {
    let disks = fixtures::machine();
    let mut storage = block_layout(&["/dev/sdb"], false, false);
    storage["logical"] = serde_json::json!("undefined");
    let mut manager = fixtures::manager(&disks, &storage);

    let err = manager.initialize(PASSWORD).unwrap_err();

    assert!(matches!(err, ProvisionError::UnsupportedLayout(_)));
    assert_eq!(
        err.to_string(),
        "Unsupported storage layout: block|undefined|none"
    );
    assert!(disks.journal().is_empty());
}

#[test]
fn incomplete_configuration_is_not_provisioned() {
    let disks = fixtures::machine();
    let mut storage = block_layout(&["/dev/sdb"], true, false);
    storage
        .as_object_mut()
        .expect("storage object")
        .remove("lvm_vg");
    let mut manager = fixtures::manager(&disks, &storage);

    let err = manager.initialize(PASSWORD).unwrap_err();

    assert!(matches!(err, ProvisionError::InvalidConfiguration(_)));
    assert!(disks.mutations().is_empty());
}

#[test]
fn partition_that_never_appears_is_unavailable() {
    let disks = fixtures::machine();
    disks.script_probe("/dev/sdb1", &[false, false, false]);
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], true, false));

    let err = manager.initialize(PASSWORD).unwrap_err();

    match err {
        ProvisionError::DeviceUnavailable(device) => assert_eq!(device, "/dev/sdb1"),
        other => panic!("expected an unavailable device, got {other:?}"),
    }
    assert!(!wrote_beyond_partition_table(&disks));
}

/// Whether anything beyond the partition table was written
fn wrote_beyond_partition_table(disks: &storage_testing::FakeDisks) -> bool {
    DESTRUCTIVE
        .iter()
        .filter(|name| **name != "partition_device")
        .any(|name| disks.called(name))
}
