// SPDX-License-Identifier: GPL-3.0-only

//! Storage provisioning engine
//!
//! [`StorageManager`] turns the persisted [`StorageConfig`] into a mounted
//! storage area: partitions raw disks, builds the LVM volume, sets up LUKS,
//! creates the filesystem and mounts it. Nothing is rolled back on failure;
//! a half-built stack is picked up again by the next [`initialize`] call.
//!
//! [`initialize`]: StorageManager::initialize

pub mod scenario;
pub mod settle;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use storage_contracts::{DiskOps, StorageErrorKind};
use storage_types::{
    Encryption, Logical, Physical, STORAGE_FILESYSTEM, StorageDevice, VOLUME_LABEL,
    partition_path,
};
use tracing::{debug, error, info, warn};

use crate::config::StorageConfig;
use crate::error::{ProvisionError, Result};
use crate::settings::ServiceSettings;
pub use scenario::{Scenario, Step};

pub struct StorageManager {
    config: StorageConfig,
    disks: Arc<dyn DiskOps>,
    settings: ServiceSettings,
    initialized: bool,
    sync_pending: bool,
}

impl StorageManager {
    pub fn new(config: StorageConfig, disks: Arc<dyn DiskOps>, settings: ServiceSettings) -> Self {
        Self {
            config,
            disks,
            settings,
            initialized: false,
            sync_pending: false,
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut StorageConfig {
        &mut self.config
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Canonical mount point of the storage area
    pub fn mount_point(&self) -> PathBuf {
        self.config
            .store()
            .get_string("filesystem", "storagemount")
            .filter(|mount| !mount.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.settings.storage_mount.clone())
    }

    /// Bring the storage area up and mount it.
    ///
    /// Without separate physical storage this does nothing. On first call it
    /// either reattaches to an existing storage area or builds the stack for
    /// the configured layout; later calls only remount.
    pub fn initialize(&mut self, password: &str) -> Result<()> {
        if self.config.use_physical_storage(Physical::None) {
            info!("No separate physical storage, skipping storage initialization");
            return Ok(());
        }

        if !self.initialized {
            let layout = self.config.storage_type();
            debug!("Initializing storage, layout {}", layout);

            let scenario = Scenario::for_layout(layout).inspect_err(|_| {
                error!("No setup scenario for storage layout {}", layout);
            })?;
            self.check_device_count(scenario)?;
            if !self.config.is_valid() {
                return Err(ProvisionError::InvalidConfiguration(format!(
                    "incomplete {} storage configuration",
                    layout
                )));
            }

            let existing = self.storage_area_exists();
            if existing && self.reattach(password)? {
                info!("Reattached to existing storage area");
            } else {
                self.run_scenario(scenario, password, existing)
                    .inspect_err(|e| error!("Failed to set up {} storage: {}", scenario, e))?;
                self.sync_pending = true;
            }

            self.initialized = true;
        }

        self.setup_storage_area()
    }

    /// Unlock the storage area without touching anything else
    pub fn open(&mut self, password: &str) -> Result<()> {
        if !self.use_locking() {
            return Ok(());
        }
        self.unlock(password)
    }

    pub fn use_locking(&self) -> bool {
        self.config.use_encryption(Encryption::Luks)
    }

    pub fn use_logical_storage(&self) -> bool {
        self.config.use_logical_storage(Logical::Lvm)
    }

    /// Whether the storage is encrypted and not currently unlocked
    pub fn is_locked(&self) -> bool {
        if !self.use_locking() {
            return false;
        }

        let name = self.config.luks_mapper_name();
        match self.disks.is_luks_active(&name) {
            Ok(active) => !active,
            Err(e) => {
                warn!("Unable to query LUKS mapping {}: {}", name, e);
                true
            }
        }
    }

    /// The device that gets mounted, see [`StorageConfig::storage_device`]
    pub fn device_path(&self) -> Option<String> {
        self.config.storage_device()
    }

    fn require_device_path(&self) -> Result<String> {
        self.device_path().ok_or_else(|| {
            ProvisionError::InvalidConfiguration("unable to determine storage device".to_string())
        })
    }

    /// Mount the storage device at `destination`, e.g. for a backup restore
    pub fn mount_device(&self, destination: &Path) -> Result<()> {
        if self.config.use_physical_storage(Physical::None) {
            error!("Device doesn't use separate storage, not mounting");
            return Err(ProvisionError::InvalidConfiguration(
                "no separate storage device to mount".to_string(),
            ));
        }

        let source = self.require_device_path()?;
        debug!("Mount {} at {}", source, destination.display());

        if self.disks.get_mount_point(&source)?.is_some() {
            self.disks.unmount_filesystem(&source)?;
        }

        match self.disks.mount_filesystem(&source, destination) {
            Ok(()) => Ok(()),
            // The mount helper was reaped before we could wait on it; the mount
            // itself has normally gone through.
            Err(e) if e.is(StorageErrorKind::ChildLost) => {
                if self.disks.get_mount_point(&source)?.is_some() {
                    warn!("Storage is mounted, ignoring: {}", e);
                    Ok(())
                } else {
                    Err(e.into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn umount_device(&self) -> Result<()> {
        let device = self.require_device_path()?;
        self.disks.unmount_filesystem(&device)?;
        Ok(())
    }

    /// Whether every configured layer is already present on disk.
    ///
    /// Read only; used to decide between building and reattaching.
    pub fn storage_area_exists(&self) -> bool {
        match self.probe_storage_area() {
            Ok(exists) => exists,
            Err(e) => {
                info!("Failed to check storage area: {}", e);
                false
            }
        }
    }

    fn probe_storage_area(&self) -> Result<bool> {
        let physical = self.config.physical_devices();
        if physical.is_empty() {
            error!("Missing physical devices in config");
            return Ok(false);
        }

        for device in &physical {
            if !self.disks.device_exists(device)? {
                info!("Device {} doesn't exist", device);
                return Ok(false);
            }
            if self.disks.device_size(device)? == 0 {
                info!("Device {} has no space", device);
                return Ok(false);
            }
        }

        if self.use_logical_storage() {
            let logical = self.config.logical_devices();
            if logical.is_empty() {
                error!("Logical storage selected but no device specified");
                return Ok(false);
            }
            for device in &logical {
                if !self.disks.device_exists(device)? {
                    debug!("Logical device {} not created", device);
                    return Ok(false);
                }
            }
        }

        if self.use_locking() {
            for device in self.luks_devices() {
                if !self.disks.device_exists(&device)? || !self.disks.is_luks(&device)? {
                    debug!("No LUKS on device {}", device);
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }

    fn luks_devices(&self) -> Vec<String> {
        if self.use_logical_storage() {
            return self.config.logical_devices();
        }
        match self.config.physical_storage() {
            Physical::Block => self
                .config
                .physical_devices()
                .iter()
                .map(|device| partition_path(device))
                .collect(),
            _ => self.config.physical_devices(),
        }
    }

    /// Whether every configured physical device is present with media
    pub fn device_exists(&self) -> bool {
        let devices = self.config.physical_devices();
        if devices.is_empty() {
            return false;
        }

        for device in &devices {
            debug!("Checking device {}", device);
            let present = self
                .disks
                .resolve_device_path(device)
                .and_then(|path| {
                    let exists = self.disks.device_exists(&path)?;
                    Ok(exists && self.disks.device_size(&path)? > 0)
                });
            match present {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => {
                    info!("Failed to check device {}: {}", device, e);
                    return false;
                }
            }
        }
        true
    }

    /// Combined size in bytes of the physical devices
    pub fn size(&self) -> Result<u64> {
        let mut total = 0;
        for device in self.config.physical_devices() {
            total += self.disks.device_size(&device)?;
        }
        Ok(total)
    }

    /// Every block device on the system, disks with their partitions nested
    pub fn storage_devices(&self) -> Result<Vec<StorageDevice>> {
        Ok(self.disks.list_storage_devices()?)
    }

    pub fn storage_device(&self, device: &str) -> Result<StorageDevice> {
        Ok(self.disks.get_storage_device(device)?)
    }

    /// Dismantle the storage stack: unmount, lock, remove the LVM volume.
    ///
    /// Partitions and data on the physical devices are left alone.
    pub fn teardown(&mut self) -> Result<()> {
        info!("Tearing down storage stack");

        if let Some(device) = self.device_path()
            && self.disks.get_mount_point(&device)?.is_some()
        {
            self.disks.unmount_filesystem(&device)?;
        }

        if self.use_locking() {
            let name = self.config.luks_mapper_name();
            if self.disks.is_luks_active(&name)? {
                self.disks.close_luks(&name)?;
            }
        }

        if self.use_logical_storage() {
            let vg = self.config.lvm_volume_group();
            let lv = self.config.lvm_logical_volume();

            if let Some(volume) = self
                .disks
                .list_logical_volumes()?
                .into_iter()
                .find(|volume| volume.is(&vg, &lv))
            {
                self.disks.remove_logical_volume(&volume.device_path)?;
            }
            if self
                .disks
                .list_volume_groups()?
                .iter()
                .any(|group| group.name == vg)
            {
                self.disks.remove_volume_group(&vg)?;
            }
        }

        self.initialized = false;
        Ok(())
    }

    /// Wait for `path` to settle, see [`settle::wait_for_device`]
    pub fn check_device(&self, path: &str) -> bool {
        debug!("Check device {}", path);
        let present = settle::wait_for_device(&self.settings.settle, || {
            match self
                .disks
                .resolve_device_path(path)
                .and_then(|real| self.disks.device_exists(&real))
            {
                Ok(exists) => exists,
                Err(e) => {
                    debug!("Unable to probe device: {}", e);
                    false
                }
            }
        });
        debug!(
            "Device {} {}",
            path,
            if present { "available" } else { "not available" }
        );
        present
    }

    fn check_device_count(&self, scenario: Scenario) -> Result<()> {
        let devices = self.config.physical_devices();
        if devices.is_empty() {
            return Err(ProvisionError::InvalidConfiguration(
                "no physical devices configured".to_string(),
            ));
        }
        if !scenario.uses_lvm() && devices.len() != 1 {
            return Err(ProvisionError::DeviceCount {
                what: "physical devices without LVM",
                expected: 1,
                got: devices.len(),
            });
        }
        Ok(())
    }

    /// Unlock LUKS if used and check that the top device carries our
    /// filesystem. Returns false when the stack still needs to be finished.
    ///
    /// A label that cannot be read is an error: the device may hold data,
    /// and finishing the stack would format it.
    fn reattach(&self, password: &str) -> Result<bool> {
        if self.use_locking() {
            self.unlock(password)?;
        }

        let device = self.require_device_path()?;
        if !self.disks.device_exists(&device)? {
            info!(
                "Storage device {} not created yet, completing setup",
                device
            );
            return Ok(false);
        }

        let label = match self.disks.get_filesystem_label(&device) {
            Ok(label) => label,
            Err(e) => {
                error!("Unable to read filesystem label of {}: {}", device, e);
                return Err(e.into());
            }
        };
        if label.as_deref() == Some(VOLUME_LABEL) {
            return Ok(true);
        }

        info!(
            "Storage area exists but {} has no {} filesystem, completing setup",
            device, VOLUME_LABEL
        );
        Ok(false)
    }

    fn run_scenario(&self, scenario: Scenario, password: &str, existing: bool) -> Result<()> {
        info!("Init {}", scenario);

        for step in scenario.steps() {
            debug!("Step {:?}", step);
            match step {
                Step::PartitionDisks if existing && self.partitions_present() => {
                    debug!("Partitions already present, not repartitioning");
                }
                Step::PartitionDisks => self.partition_disks()?,
                Step::CreateLvm => self.create_lvm(scenario)?,
                Step::SetupLuks => self.setup_luks(password)?,
                Step::FormatFilesystem => self.format_filesystem()?,
            }
        }

        info!("Init {} done", scenario);
        Ok(())
    }

    fn partition_disks(&self) -> Result<()> {
        let devices = self.config.physical_devices();

        for device in &devices {
            if !self.disks.device_exists(device)? {
                error!("Device doesn't exist: {}", device);
                return Err(ProvisionError::DeviceUnavailable(device.clone()));
            }
            let real = self.disks.resolve_device_path(device)?;
            debug!("Partition {}", real);
            self.disks.partition_device(&real)?;
        }

        for device in &devices {
            let partition = partition_path(device);
            if !self.check_device(&partition) {
                error!("Device partition {} missing", partition);
                return Err(ProvisionError::DeviceUnavailable(partition));
            }
        }

        Ok(())
    }

    fn partitions_present(&self) -> bool {
        self.config.physical_devices().iter().all(|device| {
            self.disks
                .device_exists(&partition_path(device))
                .unwrap_or(false)
        })
    }

    fn lvm_members(&self, scenario: Scenario) -> Vec<String> {
        let devices = self.config.physical_devices();
        match scenario.physical() {
            Physical::Block => devices.iter().map(|device| partition_path(device)).collect(),
            _ => devices,
        }
    }

    fn create_lvm(&self, scenario: Scenario) -> Result<()> {
        let vg = self.config.lvm_volume_group();
        let lv = self.config.lvm_logical_volume();

        let vg_exists = self
            .disks
            .list_volume_groups()?
            .iter()
            .any(|group| group.name == vg);

        if vg_exists {
            info!("Reusing volume group {}", vg);
        } else {
            let mut members = Vec::new();
            for device in self.lvm_members(scenario) {
                let real = self.disks.resolve_device_path(&device)?;
                debug!("Adding {} to volume group", real);
                self.disks.create_physical_volume(&real)?;
                members.push(real);
            }
            self.disks.create_volume_group(&vg, &members)?;
        }

        let lv_exists = self
            .disks
            .list_logical_volumes()?
            .iter()
            .any(|volume| volume.is(&vg, &lv));

        if lv_exists {
            info!("Reusing logical volume {}/{}", vg, lv);
        } else {
            let path = self.disks.create_logical_volume(&vg, &lv)?;
            debug!("Created logical volume {}", path);
        }

        for device in self.config.logical_devices() {
            if !self.check_device(&device) {
                return Err(ProvisionError::DeviceUnavailable(device));
            }
        }
        Ok(())
    }

    fn setup_luks(&self, password: &str) -> Result<()> {
        let device = self.luks_backing_device()?;
        debug!("Initialize LUKS on device {}", device);

        if !self.disks.is_luks(&device)? {
            self.disks.format_luks(&device, password)?;
        }
        self.unlock(password)
    }

    fn luks_backing_device(&self) -> Result<String> {
        let device = self.config.luks_backing_device().ok_or_else(|| {
            ProvisionError::InvalidConfiguration("no device to hold LUKS".to_string())
        })?;
        Ok(self.disks.resolve_device_path(&device)?)
    }

    fn unlock(&self, password: &str) -> Result<()> {
        let name = self.config.luks_mapper_name();
        if self.disks.is_luks_active(&name)? {
            debug!("LUKS volume {} already active", name);
            return Ok(());
        }

        let device = self.luks_backing_device()?;
        debug!("Activating LUKS volume {} on {}", name, device);
        self.disks
            .open_luks(&device, &name, password)
            .inspect_err(|e| info!("Failed to open LUKS volume on {}: {}", device, e))?;
        Ok(())
    }

    fn format_filesystem(&self) -> Result<()> {
        let device = self.require_device_path()?;
        self.disks
            .format_filesystem(&device, STORAGE_FILESYSTEM, VOLUME_LABEL)?;
        Ok(())
    }

    /// Unmount strays, copy template data into fresh storage, mount for good
    fn setup_storage_area(&mut self) -> Result<()> {
        let device = self.require_device_path()?;
        let mount_point = self.mount_point();
        debug!("Setting up storage area on {}", device);

        if self.disks.get_mount_point(&device)?.is_some() {
            self.disks.unmount_filesystem(&device)?;
        }

        if self.sync_pending {
            let staging = &self.settings.staging_mount;
            info!("Copying template data to {}", device);
            self.disks.mount_filesystem(&device, staging)?;
            self.disks.sync_paths(&mount_point, staging)?;
            self.disks.unmount_filesystem(&device)?;
            self.sync_pending = false;
        }

        self.disks.mount_filesystem(&device, &mount_point)?;
        info!("Storage mounted at {}", mount_point.display());
        Ok(())
    }
}
