// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use serde_json::json;
use storage_service::{
    HardwareClass, MemoryConfigStore, ProvisionError, StorageConfig, StorageManager,
};

use storage_types::{Characteristic, MapperKind};

use crate::common::fixtures::{self, PASSWORD, STORAGE_MOUNT, block_layout};

#[test]
fn mount_device_moves_storage_to_destination() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], false, false));
    manager.initialize(PASSWORD).expect("initialize storage");

    manager
        .mount_device(Path::new("/mnt/restore"))
        .expect("mount at restore point");

    assert_eq!(
        disks.mount_point_of("/dev/sdb1").as_deref(),
        Some("/mnt/restore")
    );

    manager.umount_device().expect("unmount");
    assert!(disks.mount_point_of("/dev/sdb1").is_none());
}

#[test]
fn lost_child_after_successful_mount_is_tolerated() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], true, false));
    manager.initialize(PASSWORD).expect("initialize storage");
    manager.umount_device().expect("unmount");

    disks.lose_child_on_mount();
    manager
        .mount_device(Path::new(STORAGE_MOUNT))
        .expect("mount despite lost child");

    assert_eq!(
        disks.mount_point_of("/dev/pool/data").as_deref(),
        Some(STORAGE_MOUNT)
    );
}

#[test]
fn mount_failure_is_reported() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], false, false));
    manager.initialize(PASSWORD).expect("initialize storage");

    disks.fail_on("mount_filesystem");
    let err = manager
        .mount_device(Path::new("/mnt/restore"))
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Storage(_)));
    assert!(disks.mount_point_of("/dev/sdb1").is_none());
}

#[test]
fn nothing_to_mount_without_physical_storage() {
    let disks = fixtures::machine();
    let storage = json!({
        "model": "dynamic",
        "physical": "none",
        "logical": "none",
        "encryption": "none",
    });
    let manager = fixtures::manager(&disks, &storage);

    let err = manager.mount_device(Path::new("/mnt/restore")).unwrap_err();

    assert!(matches!(err, ProvisionError::InvalidConfiguration(_)));
    assert!(disks.journal().is_empty());
}

#[test]
fn storage_mount_comes_from_appliance_config() {
    let disks = fixtures::machine();
    let document = json!({
        "filesystem": { "storagemount": "/srv/appliance" },
        "storage": block_layout(&["/dev/sdb"], false, false),
    });
    let store = MemoryConfigStore::from_json(&document.to_string())
        .expect("config");
    let config = StorageConfig::load(Box::new(store), HardwareClass::Generic)
        .expect("load");
    let mut manager = StorageManager::new(config, disks.clone(), fixtures::settings());

    manager.initialize(PASSWORD).expect("initialize storage");

    assert_eq!(manager.mount_point(), Path::new("/srv/appliance"));
    assert_eq!(
        disks.mount_point_of("/dev/sdb1").as_deref(),
        Some("/srv/appliance")
    );
}

#[test]
fn device_probes_follow_configuration() {
    let disks = fixtures::machine();
    let manager = fixtures::manager(
        &disks,
        &block_layout(
            &["/dev/disk/by-path/platform-ata-2", "/dev/sdc"],
            true,
            false,
        ),
    );

    assert!(manager.device_exists());
    assert_eq!(manager.size().expect("size"), 16 * fixtures::GIB);
    assert_eq!(manager.device_path().as_deref(), Some("/dev/pool/data"));

    let missing = fixtures::manager(&disks, &block_layout(&["/dev/sdx"], false, false));
    assert!(!missing.device_exists());
    assert!(!missing.storage_area_exists());
}

#[test]
fn devices_reflect_the_built_stack() {
    let disks = fixtures::machine();
    let mut manager = fixtures::manager(&disks, &block_layout(&["/dev/sdb"], true, true));
    manager.initialize(PASSWORD).expect("initialize storage");

    let devices = manager.storage_devices().expect("list devices");
    let sdb = devices
        .iter()
        .find(|device| device.device_path == "/dev/sdb")
        .expect("sdb listed");
    assert!(sdb.is(Characteristic::Physical));
    assert_eq!(sdb.partitions.len(), 1);
    assert_eq!(sdb.partitions[0].device_path, "/dev/sdb1");

    let luks = devices
        .iter()
        .find(|device| device.mapper_kind == Some(MapperKind::Luks))
        .expect("opened container listed");
    assert_eq!(luks.mount_points, vec![STORAGE_MOUNT.to_string()]);
    assert!(
        devices.iter().any(|device| device.mapper_kind == Some(MapperKind::Lvm))
    );

    let by_path = manager
        .storage_device("/dev/disk/by-path/platform-ata-2")
        .expect("resolve symlinked disk");
    assert_eq!(by_path.device_path, "/dev/sdb");
    assert!(manager.storage_device("/dev/sdx").is_err());
}
