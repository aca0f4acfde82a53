// SPDX-License-Identifier: GPL-3.0-only

use storage_testing::{FakeDisks, Op};

pub fn op_names(ops: &[Op]) -> Vec<&'static str> {
    ops.iter().map(Op::name).collect()
}

pub fn assert_not_called(disks: &FakeDisks, names: &[&str]) {
    for name in names {
        assert!(
            !disks.called(name),
            "{name} should not have been called, journal: {}",
            disks.journal_json().unwrap_or_default()
        );
    }
}

/// Operations that destroy or create data on a device
pub const DESTRUCTIVE: &[&str] = &[
    "partition_device",
    "create_physical_volume",
    "create_volume_group",
    "create_logical_volume",
    "format_luks",
    "format_filesystem",
];
