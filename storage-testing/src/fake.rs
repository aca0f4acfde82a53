// SPDX-License-Identifier: GPL-3.0-only

//! In-memory disk operations
//!
//! [`FakeDisks`] keeps just enough state to behave like a small machine:
//! device nodes and symlinks, partition tables, LVM volumes, LUKS headers and
//! mappings, filesystems and mounts. Every call is appended to a journal.
//! Filesystems on opened LUKS mappings are stored against the backing device,
//! so they survive a [`FakeDisks::reboot`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use storage_contracts::{
    DiskQueryAdapter, FilesystemOpsAdapter, LuksOpsAdapter, LvmOpsAdapter, PartitionOpsAdapter,
    StorageError, StorageErrorKind,
};
use storage_types::{
    LogicalVolumeInfo, MapperKind, StorageDevice, VolumeGroupInfo, device_name, partition_path,
};
use tracing::debug;

use crate::journal::Op;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
struct Filesystem {
    fs_type: String,
    label: String,
}

#[derive(Debug, Clone)]
struct Volume {
    vg: String,
    lv: String,
}

#[derive(Debug, Default)]
struct State {
    disks: BTreeSet<String>,
    partitions: BTreeMap<String, Vec<String>>,
    nodes: BTreeMap<String, u64>,
    links: BTreeMap<String, String>,
    physical_volumes: BTreeSet<String>,
    volume_groups: BTreeMap<String, Vec<String>>,
    logical_volumes: BTreeMap<String, Volume>,
    luks_headers: BTreeMap<String, String>,
    mappings: BTreeMap<String, String>,
    filesystems: BTreeMap<String, Filesystem>,
    mounts: BTreeMap<String, String>,
    probes: BTreeMap<String, VecDeque<bool>>,
    failures: BTreeSet<&'static str>,
    child_lost_on_mount: bool,
    journal: Vec<Op>,
}

fn mapper_path(name: &str) -> String {
    format!("/dev/mapper/{name}")
}

fn busy(message: impl Into<String>) -> StorageError {
    StorageError::new(StorageErrorKind::Busy, message)
}

fn invalid(message: impl Into<String>) -> StorageError {
    StorageError::new(StorageErrorKind::InvalidInput, message)
}

impl State {
    fn follow(&self, device: &str) -> String {
        let mut current = device.to_string();
        for _ in 0..8 {
            match self.links.get(&current) {
                Some(target) => current = target.clone(),
                None => break,
            }
        }
        current
    }

    fn require(&self, device: &str) -> Result<String, StorageError> {
        let path = self.follow(device);
        if self.nodes.contains_key(&path) {
            Ok(path)
        } else {
            Err(StorageError::not_found(format!("{device}: no such device")))
        }
    }

    /// Where the filesystem on `path` lives
    fn fs_key(&self, path: &str) -> String {
        let backing = path
            .strip_prefix("/dev/mapper/")
            .and_then(|name| self.mappings.get(name));
        match backing {
            Some(backing) => format!("{backing}#luks"),
            None => path.to_string(),
        }
    }

    fn is_mounted(&self, path: &str) -> bool {
        self.mounts.contains_key(path)
    }

    fn is_mapped_backing(&self, path: &str) -> bool {
        self.mappings.values().any(|backing| backing == path)
    }

    fn wipe(&mut self, path: &str) {
        self.filesystems.remove(path);
        self.filesystems.remove(&format!("{path}#luks"));
        self.luks_headers.remove(path);
        self.physical_volumes.remove(path);
    }

    fn describe(&self, path: &str) -> StorageDevice {
        let name = device_name(path).to_string();
        StorageDevice {
            sys_path: format!("/sys/class/block/{name}"),
            name,
            device_path: path.to_string(),
            mapper_path: None,
            model: String::new(),
            mount_points: self.mounts.get(path).cloned().into_iter().collect(),
            size: self.nodes.get(path).copied().unwrap_or(0),
            is_partition: !self.disks.contains(path),
            is_physical: self.disks.contains(path),
            read_only: false,
            removable: false,
            mapper_kind: None,
            partitions: Vec::new(),
        }
    }

    fn devices(&self) -> Vec<StorageDevice> {
        let mut devices = Vec::new();

        for disk in &self.disks {
            let mut device = self.describe(disk);
            device.partitions = self
                .partitions
                .get(disk)
                .into_iter()
                .flatten()
                .filter(|partition| self.nodes.contains_key(*partition))
                .map(|partition| self.describe(partition))
                .collect();
            devices.push(device);
        }

        for (path, volume) in &self.logical_volumes {
            let mut device = self.describe(path);
            device.is_partition = false;
            device.mapper_kind = Some(MapperKind::Lvm);
            device.mapper_path = Some(mapper_path(&format!("{}-{}", volume.vg, volume.lv)));
            devices.push(device);
        }

        for name in self.mappings.keys() {
            let mut device = self.describe(&mapper_path(name));
            device.is_partition = false;
            device.mapper_kind = Some(MapperKind::Luks);
            device.mapper_path = Some(mapper_path(name));
            devices.push(device);
        }

        devices
    }
}

/// In-memory stand-in for the system disk operations
#[derive(Debug, Default)]
pub struct FakeDisks {
    state: Mutex<State>,
}

impl FakeDisks {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_mut(&mut self) -> &mut State {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Journal `op` and fail it if a failure was injected for it
    fn record(&self, op: Op) -> Result<MutexGuard<'_, State>, StorageError> {
        let mut state = self.state();
        let name = op.name();
        debug!("fake disks: {:?}", op);
        state.journal.push(op);
        if state.failures.contains(name) {
            let message = format!("injected failure in {name}");
            return Err(StorageError::internal(message));
        }
        Ok(state)
    }

    /// Add a whole disk of `size` bytes
    pub fn with_disk(mut self, path: &str, size: u64) -> Self {
        let state = self.state_mut();
        state.disks.insert(path.to_string());
        state.nodes.insert(path.to_string(), size);
        self
    }

    /// Add an existing partition of `disk`
    pub fn with_partition(mut self, disk: &str, path: &str, size: u64) -> Self {
        let state = self.state_mut();
        state
            .partitions
            .entry(disk.to_string())
            .or_default()
            .push(path.to_string());
        state.nodes.insert(path.to_string(), size);
        self
    }

    /// Add a symlink such as a /dev/disk/by-path entry
    pub fn with_link(mut self, link: &str, target: &str) -> Self {
        self.state_mut()
            .links
            .insert(link.to_string(), target.to_string());
        self
    }

    /// Make every call of operation `name` fail
    pub fn fail_on(&self, name: &'static str) {
        self.state().failures.insert(name);
    }

    /// Drop all injected failures
    pub fn heal(&self) {
        self.state().failures.clear();
    }

    /// The next mount succeeds but reports a lost child process
    pub fn lose_child_on_mount(&self) {
        self.state().child_lost_on_mount = true;
    }

    /// Answer the next existence probes of `device` from `states`, then fall
    /// back to the real state
    pub fn script_probe(&self, device: &str, states: &[bool]) {
        self.state()
            .probes
            .insert(device.to_string(), states.to_vec().into());
    }

    /// Drop everything that does not survive a restart: mounts, LUKS mappings
    /// and probe scripts
    pub fn reboot(&self) {
        let mut state = self.state();
        state.mounts.clear();
        let names: Vec<String> = state.mappings.keys().cloned().collect();
        for name in names {
            state.nodes.remove(&mapper_path(&name));
        }
        state.mappings.clear();
        state.probes.clear();
    }

    pub fn journal(&self) -> Vec<Op> {
        self.state().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state().journal.clear();
    }

    /// Journal entries that changed disk or mount state
    pub fn mutations(&self) -> Vec<Op> {
        self.state()
            .journal
            .iter()
            .filter(|op| op.is_mutation())
            .cloned()
            .collect()
    }

    /// Whether operation `name` was called since the journal was last cleared
    pub fn called(&self, name: &str) -> bool {
        self.state().journal.iter().any(|op| op.name() == name)
    }

    pub fn journal_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.state().journal)
    }

    pub fn has_node(&self, path: &str) -> bool {
        let state = self.state();
        state.nodes.contains_key(&state.follow(path))
    }

    pub fn mount_point_of(&self, device: &str) -> Option<String> {
        let state = self.state();
        state.mounts.get(&state.follow(device)).cloned()
    }

    pub fn is_mapped(&self, name: &str) -> bool {
        self.state().mappings.contains_key(name)
    }

    pub fn label_of(&self, device: &str) -> Option<String> {
        let state = self.state();
        let key = state.fs_key(&state.follow(device));
        state.filesystems.get(&key).map(|fs| fs.label.clone())
    }

    pub fn has_volume_group(&self, vg: &str) -> bool {
        self.state().volume_groups.contains_key(vg)
    }
}

impl DiskQueryAdapter for FakeDisks {
    fn device_exists(&self, device: &str) -> Result<bool, StorageError> {
        let mut state = self.record(Op::DeviceExists {
            device: device.to_string(),
        })?;
        let path = state.follow(device);
        if let Some(seen) = state.probes.get_mut(&path).and_then(VecDeque::pop_front) {
            return Ok(seen);
        }
        Ok(state.nodes.contains_key(&path))
    }

    fn device_size(&self, device: &str) -> Result<u64, StorageError> {
        let state = self.record(Op::DeviceSize {
            device: device.to_string(),
        })?;
        let path = state.require(device)?;
        Ok(state.nodes.get(&path).copied().unwrap_or(0))
    }

    fn resolve_device_path(&self, device: &str) -> Result<String, StorageError> {
        let state = self.record(Op::ResolveDevicePath {
            device: device.to_string(),
        })?;
        let path = state.follow(device);
        if state.probes.contains_key(&path) {
            return Ok(path);
        }
        state.require(device)
    }

    fn list_storage_devices(&self) -> Result<Vec<StorageDevice>, StorageError> {
        let state = self.record(Op::ListStorageDevices)?;
        Ok(state.devices())
    }

    fn get_storage_device(&self, device: &str) -> Result<StorageDevice, StorageError> {
        let state = self.record(Op::GetStorageDevice {
            device: device.to_string(),
        })?;
        let path = state.follow(device);

        let mut candidates = state.devices();
        while let Some(candidate) = candidates.pop() {
            if candidate.name == device || candidate.device_path == path {
                return Ok(candidate);
            }
            candidates.extend(candidate.partitions);
        }
        Err(StorageError::not_found(format!("{device}: no such device")))
    }
}

impl PartitionOpsAdapter for FakeDisks {
    fn partition_device(&self, device: &str) -> Result<(), StorageError> {
        let mut state = self.record(Op::PartitionDevice {
            device: device.to_string(),
        })?;
        let disk = state.require(device)?;
        if !state.disks.contains(&disk) {
            return Err(invalid(format!("{disk} is not a whole disk")));
        }

        let old = state.partitions.remove(&disk).unwrap_or_default();
        if let Some(mounted) = old.iter().find(|partition| state.is_mounted(partition)) {
            let mounted = mounted.clone();
            state.partitions.insert(disk, old);
            return Err(busy(format!("{mounted} is mounted")));
        }
        for partition in &old {
            state.nodes.remove(partition);
            state.wipe(partition);
        }
        state.wipe(&disk);

        let size = state.nodes.get(&disk).copied().unwrap_or(0);
        let partition = partition_path(&disk);
        state.nodes.insert(partition.clone(), size.saturating_sub(MIB));

        let aliases: Vec<String> = state
            .links
            .iter()
            .filter(|(link, target)| **target == disk && link.starts_with("/dev/disk/by-"))
            .map(|(link, _)| link.clone())
            .collect();
        for alias in aliases {
            state.links.insert(partition_path(&alias), partition.clone());
        }
        state.partitions.insert(disk, vec![partition]);
        Ok(())
    }
}

impl FilesystemOpsAdapter for FakeDisks {
    fn format_filesystem(
        &self,
        device: &str,
        fs_type: &str,
        label: &str,
    ) -> Result<(), StorageError> {
        let mut state = self.record(Op::FormatFilesystem {
            device: device.to_string(),
            fs_type: fs_type.to_string(),
            label: label.to_string(),
        })?;
        let path = state.require(device)?;
        if state.is_mounted(&path) {
            return Err(busy(format!("{path} is mounted")));
        }

        let key = state.fs_key(&path);
        if key == path {
            state.luks_headers.remove(&path);
        }
        state.filesystems.insert(
            key,
            Filesystem {
                fs_type: fs_type.to_string(),
                label: label.to_string(),
            },
        );
        Ok(())
    }

    fn get_filesystem_label(&self, device: &str) -> Result<Option<String>, StorageError> {
        let state = self.record(Op::GetFilesystemLabel {
            device: device.to_string(),
        })?;
        let path = state.require(device)?;
        Ok(state
            .filesystems
            .get(&state.fs_key(&path))
            .map(|fs| fs.label.clone()))
    }

    fn mount_filesystem(&self, device: &str, mount_point: &Path) -> Result<(), StorageError> {
        let target = mount_point.display().to_string();
        let mut state = self.record(Op::MountFilesystem {
            device: device.to_string(),
            mount_point: target.clone(),
        })?;
        let path = state.require(device)?;

        let Some(fs) = state.filesystems.get(&state.fs_key(&path)) else {
            return Err(StorageError::internal(format!(
                "mount: {target}: wrong fs type, bad option, bad superblock on {path}"
            )));
        };
        debug!(
            "fake disks: mounting {} ({}) at {}",
            path, fs.fs_type, target
        );

        if state.is_mounted(&path) {
            return Err(busy(format!("{path} already mounted")));
        }
        if state.mounts.values().any(|mounted| *mounted == target) {
            return Err(busy(format!("{target} is in use")));
        }
        state.mounts.insert(path, target);

        if std::mem::take(&mut state.child_lost_on_mount) {
            return Err(StorageError::new(
                StorageErrorKind::ChildLost,
                "waitpid: No child processes",
            ));
        }
        Ok(())
    }

    fn unmount_filesystem(&self, device_or_mount: &str) -> Result<(), StorageError> {
        let mut state = self.record(Op::UnmountFilesystem {
            target: device_or_mount.to_string(),
        })?;
        let path = state.follow(device_or_mount);
        let device = state
            .mounts
            .iter()
            .find(|(device, mount)| **device == path || *mount == device_or_mount)
            .map(|(device, _)| device.clone());

        match device {
            Some(device) => {
                state.mounts.remove(&device);
                Ok(())
            }
            None => Err(invalid(format!("umount: {device_or_mount}: not mounted"))),
        }
    }

    fn get_mount_point(&self, device: &str) -> Result<Option<String>, StorageError> {
        let state = self.record(Op::GetMountPoint {
            device: device.to_string(),
        })?;
        Ok(state.mounts.get(&state.follow(device)).cloned())
    }

    fn sync_paths(&self, source: &Path, destination: &Path) -> Result<(), StorageError> {
        let destination = destination.display().to_string();
        let state = self.record(Op::SyncPaths {
            source: source.display().to_string(),
            destination: destination.clone(),
        })?;
        if !state.mounts.values().any(|mount| *mount == destination) {
            return Err(invalid(format!("{destination} is not a mount point")));
        }
        Ok(())
    }
}

impl LvmOpsAdapter for FakeDisks {
    fn create_physical_volume(&self, device: &str) -> Result<(), StorageError> {
        let mut state = self.record(Op::CreatePhysicalVolume {
            device: device.to_string(),
        })?;
        let path = state.require(device)?;
        if state.is_mounted(&path) {
            return Err(busy(format!("{path} is mounted")));
        }
        state.wipe(&path);
        state.physical_volumes.insert(path);
        Ok(())
    }

    fn create_volume_group(&self, vg_name: &str, devices: &[String]) -> Result<(), StorageError> {
        let mut state = self.record(Op::CreateVolumeGroup {
            vg: vg_name.to_string(),
            devices: devices.to_vec(),
        })?;
        if state.volume_groups.contains_key(vg_name) {
            return Err(StorageError::new(
                StorageErrorKind::Conflict,
                format!("volume group {vg_name} already exists"),
            ));
        }
        if devices.is_empty() {
            return Err(invalid("no physical volumes given"));
        }

        let mut members = Vec::new();
        for device in devices {
            let path = state.require(device)?;
            if !state.physical_volumes.contains(&path) {
                return Err(invalid(format!("{path} is not a physical volume")));
            }
            members.push(path);
        }
        state.volume_groups.insert(vg_name.to_string(), members);
        Ok(())
    }

    fn create_logical_volume(&self, vg_name: &str, lv_name: &str) -> Result<String, StorageError> {
        let mut state = self.record(Op::CreateLogicalVolume {
            vg: vg_name.to_string(),
            lv: lv_name.to_string(),
        })?;
        let Some(members) = state.volume_groups.get(vg_name) else {
            return Err(StorageError::not_found(format!(
                "volume group {vg_name} not found"
            )));
        };
        let size = members
            .iter()
            .map(|member| state.nodes.get(member).copied().unwrap_or(0))
            .sum::<u64>()
            .saturating_sub(4 * MIB * members.len() as u64);

        let path = format!("/dev/{vg_name}/{lv_name}");
        if state.logical_volumes.contains_key(&path) {
            return Err(StorageError::new(
                StorageErrorKind::Conflict,
                format!("logical volume {vg_name}/{lv_name} already exists"),
            ));
        }

        state.nodes.insert(path.clone(), size);
        state.links.insert(
            mapper_path(&format!("{vg_name}-{lv_name}")),
            path.clone(),
        );
        state.logical_volumes.insert(
            path.clone(),
            Volume {
                vg: vg_name.to_string(),
                lv: lv_name.to_string(),
            },
        );
        Ok(path)
    }

    fn list_volume_groups(&self) -> Result<Vec<VolumeGroupInfo>, StorageError> {
        let state = self.record(Op::ListVolumeGroups)?;
        Ok(state
            .volume_groups
            .iter()
            .map(|(name, members)| {
                let size = members
                    .iter()
                    .map(|member| state.nodes.get(member).copied().unwrap_or(0))
                    .sum::<u64>();
                let lv_count = state
                    .logical_volumes
                    .values()
                    .filter(|volume| volume.vg == *name)
                    .count() as u32;
                VolumeGroupInfo {
                    name: name.clone(),
                    size,
                    free: if lv_count == 0 { size } else { 0 },
                    pv_count: members.len() as u32,
                    lv_count,
                }
            })
            .collect())
    }

    fn list_logical_volumes(&self) -> Result<Vec<LogicalVolumeInfo>, StorageError> {
        let state = self.record(Op::ListLogicalVolumes)?;
        Ok(state
            .logical_volumes
            .iter()
            .map(|(path, volume)| LogicalVolumeInfo {
                name: volume.lv.clone(),
                vg_name: volume.vg.clone(),
                size: state.nodes.get(path).copied().unwrap_or(0),
                device_path: path.clone(),
                active: true,
            })
            .collect())
    }

    fn remove_logical_volume(&self, lv_path: &str) -> Result<(), StorageError> {
        let mut state = self.record(Op::RemoveLogicalVolume {
            lv_path: lv_path.to_string(),
        })?;
        let path = state.follow(lv_path);
        let Some(volume) = state.logical_volumes.get(&path).cloned() else {
            return Err(StorageError::not_found(format!(
                "logical volume {lv_path} not found"
            )));
        };
        if state.is_mounted(&path) || state.is_mapped_backing(&path) {
            return Err(busy(format!("logical volume {lv_path} is in use")));
        }

        state.logical_volumes.remove(&path);
        state.nodes.remove(&path);
        state
            .links
            .remove(&mapper_path(&format!("{}-{}", volume.vg, volume.lv)));
        state.wipe(&path);
        Ok(())
    }

    fn remove_volume_group(&self, vg_name: &str) -> Result<(), StorageError> {
        let mut state = self.record(Op::RemoveVolumeGroup {
            vg: vg_name.to_string(),
        })?;
        if !state.volume_groups.contains_key(vg_name) {
            return Err(StorageError::not_found(format!(
                "volume group {vg_name} not found"
            )));
        }
        if state.logical_volumes.values().any(|lv| lv.vg == vg_name) {
            let message = format!("volume group {vg_name} still has logical volumes");
            return Err(busy(message));
        }
        state.volume_groups.remove(vg_name);
        Ok(())
    }
}

impl LuksOpsAdapter for FakeDisks {
    fn is_luks(&self, device: &str) -> Result<bool, StorageError> {
        let state = self.record(Op::IsLuks {
            device: device.to_string(),
        })?;
        let path = state.require(device)?;
        Ok(state.luks_headers.contains_key(&path))
    }

    fn format_luks(&self, device: &str, passphrase: &str) -> Result<(), StorageError> {
        let mut state = self.record(Op::FormatLuks {
            device: device.to_string(),
        })?;
        let path = state.require(device)?;
        if state.is_mounted(&path) || state.is_mapped_backing(&path) {
            return Err(busy(format!("{path} is in use")));
        }
        state.wipe(&path);
        state.luks_headers.insert(path, passphrase.to_string());
        Ok(())
    }

    fn open_luks(
        &self,
        device: &str,
        name: &str,
        passphrase: &str,
    ) -> Result<String, StorageError> {
        let mut state = self.record(Op::OpenLuks {
            device: device.to_string(),
            name: name.to_string(),
        })?;
        let path = state.require(device)?;
        let Some(expected) = state.luks_headers.get(&path) else {
            return Err(invalid(format!("{path} is not a valid LUKS device")));
        };
        if expected != passphrase {
            return Err(StorageError::new(
                StorageErrorKind::InvalidPassphrase,
                "No key available with this passphrase.",
            ));
        }
        if state.mappings.contains_key(name) {
            return Err(busy(format!("device {name} already exists")));
        }

        let size = state
            .nodes
            .get(&path)
            .copied()
            .unwrap_or(0)
            .saturating_sub(16 * MIB);
        let mapped = mapper_path(name);
        state.mappings.insert(name.to_string(), path);
        state.nodes.insert(mapped.clone(), size);
        Ok(mapped)
    }

    fn close_luks(&self, name: &str) -> Result<(), StorageError> {
        let mut state = self.record(Op::CloseLuks {
            name: name.to_string(),
        })?;
        if !state.mappings.contains_key(name) {
            let message = format!("device {name} is not active");
            return Err(StorageError::not_found(message));
        }
        let mapped = mapper_path(name);
        if state.is_mounted(&mapped) {
            return Err(busy(format!("{mapped} is mounted")));
        }
        state.mappings.remove(name);
        state.nodes.remove(&mapped);
        Ok(())
    }

    fn is_luks_active(&self, name: &str) -> Result<bool, StorageError> {
        let state = self.record(Op::IsLuksActive {
            name: name.to_string(),
        })?;
        Ok(state.mappings.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * MIB;

    #[test]
    fn partitioning_replaces_old_partitions() {
        let disks = FakeDisks::new()
            .with_disk("/dev/sdb", 8 * GIB)
            .with_partition("/dev/sdb", "/dev/sdb3", GIB);

        disks.partition_device("/dev/sdb").expect("partition");

        assert!(disks.has_node("/dev/sdb1"));
        assert!(!disks.has_node("/dev/sdb3"));
        let sdb = disks.get_storage_device("sdb").expect("lookup disk");
        assert_eq!(sdb.partitions.len(), 1);
        assert_eq!(sdb.partitions[0].device_path, "/dev/sdb1");
    }

    #[test]
    fn symlinks_resolve_to_nodes() {
        let disks = FakeDisks::new()
            .with_disk("/dev/sda", GIB)
            .with_link("/dev/disk/by-path/platform-ata-1", "/dev/sda");

        assert_eq!(
            disks
                .resolve_device_path("/dev/disk/by-path/platform-ata-1")
                .expect("resolve"),
            "/dev/sda"
        );
        let missing = disks.resolve_device_path("/dev/sdz").unwrap_err();
        assert!(missing.is(StorageErrorKind::NotFound));
    }

    #[test]
    fn luks_rejects_wrong_passphrase() {
        let disks = FakeDisks::new().with_disk("/dev/sdb", GIB);
        disks.format_luks("/dev/sdb", "secret").expect("format");

        let err = disks.open_luks("/dev/sdb", "opi", "guess").unwrap_err();
        assert!(err.is(StorageErrorKind::InvalidPassphrase));
        assert!(!disks.is_mapped("opi"));

        let mapped = disks.open_luks("/dev/sdb", "opi", "secret").expect("open");
        assert_eq!(mapped, "/dev/mapper/opi");
        assert!(disks.is_luks_active("opi").expect("status"));
    }

    #[test]
    fn filesystem_on_mapping_survives_reboot() {
        let disks = FakeDisks::new().with_disk("/dev/sdb", GIB);
        disks.format_luks("/dev/sdb", "secret").unwrap();
        disks.open_luks("/dev/sdb", "opi", "secret").unwrap();
        disks
            .format_filesystem("/dev/mapper/opi", "ext4", "KGP")
            .unwrap();

        disks.reboot();
        assert!(!disks.has_node("/dev/mapper/opi"));

        disks.open_luks("/dev/sdb", "opi", "secret").unwrap();
        assert_eq!(disks.label_of("/dev/mapper/opi").as_deref(), Some("KGP"));
    }

    #[test]
    fn injected_failures_are_journaled() {
        let disks = FakeDisks::new().with_disk("/dev/sdb", GIB);
        disks.fail_on("partition_device");

        assert!(disks.partition_device("/dev/sdb").is_err());
        assert!(disks.called("partition_device"));
        assert!(!disks.has_node("/dev/sdb1"));
    }

    #[test]
    fn probe_scripts_run_out() {
        let disks = FakeDisks::new().with_disk("/dev/sdb", GIB);
        disks.script_probe("/dev/sdb", &[false, true]);

        assert!(!disks.device_exists("/dev/sdb").unwrap());
        assert!(disks.device_exists("/dev/sdb").unwrap());
        assert!(disks.device_exists("/dev/sdb").unwrap());
    }

    #[test]
    fn busy_volumes_are_not_removed() {
        let disks = FakeDisks::new().with_disk("/dev/sdb", GIB);
        disks.create_physical_volume("/dev/sdb").unwrap();
        disks
            .create_volume_group("pool", &["/dev/sdb".to_string()])
            .unwrap();
        let lv = disks.create_logical_volume("pool", "data").unwrap();

        let err = disks.remove_volume_group("pool").unwrap_err();
        assert!(err.is(StorageErrorKind::Busy));

        disks.remove_logical_volume(&lv).unwrap();
        disks.remove_volume_group("pool").unwrap();
        assert!(!disks.has_volume_group("pool"));
    }
}
