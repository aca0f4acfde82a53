// SPDX-License-Identifier: GPL-3.0-only

//! Service settings, read from a TOML file
//!
//! Every field has a default so an absent or partial file is fine:
//!
//! ```toml
//! sysconfig = "/etc/appliance-storage/sysconfig.json"
//! storage_mount = "/var/opi"
//! hardware = "multi-disk"
//! legacy_device = "/dev/disk/by-path/platform-f10a8000.sata-ata-1"
//!
//! [settle]
//! check_interval_ms = 333
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

pub const DEFAULT_SETTINGS_PATH: &str = "/etc/appliance-storage/config.toml";

/// Storage capabilities of the hardware the service runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HardwareClass {
    /// General purpose machine, the user picks the layout
    #[default]
    Generic,
    /// Appliance with exactly one data disk
    SingleDisk,
    /// Appliance with a multi-bay data enclosure
    MultiDisk,
}

impl HardwareClass {
    /// Appliance hardware has a fixed storage layout
    pub fn is_appliance(self) -> bool {
        !matches!(self, HardwareClass::Generic)
    }
}

/// Timing of the device settle check run after partitioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlePolicy {
    /// Checks per round; present means seen on every one of them
    pub checks_per_round: u32,
    pub check_interval_ms: u64,
    /// Rounds before an inconclusive result counts as failure
    pub max_rounds: u32,
    /// Probes within a single check, stopping at the first hit
    pub probe_attempts: u32,
    pub probe_delay_ms: u64,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            checks_per_round: 3,
            check_interval_ms: 333,
            max_rounds: 3,
            probe_attempts: 50,
            probe_delay_ms: 5,
        }
    }
}

impl SettlePolicy {
    /// Same shape as the default policy without any sleeping
    pub fn immediate() -> Self {
        Self {
            check_interval_ms: 0,
            probe_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn probe_delay(&self) -> Duration {
        Duration::from_millis(self.probe_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Appliance configuration holding the `storage` section
    pub sysconfig: PathBuf,
    /// Used when the appliance configuration has no `filesystem.storagemount`
    pub storage_mount: PathBuf,
    /// Fresh storage is mounted here while the template data is copied
    pub staging_mount: PathBuf,
    pub hardware: HardwareClass,
    /// Data disk of appliances migrated from the flat configuration
    pub legacy_device: String,
    pub settle: SettlePolicy,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            sysconfig: PathBuf::from("/etc/appliance-storage/sysconfig.json"),
            storage_mount: PathBuf::from("/var/opi"),
            staging_mount: PathBuf::from("/mnt/tmp"),
            hardware: HardwareClass::Generic,
            legacy_device: "/dev/sda".to_string(),
            settle: SettlePolicy::default(),
        }
    }
}

impl ServiceSettings {
    /// Load settings from `path`, falling back to defaults when it is absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        debug!("Reading settings from {}", path.display());
        let raw = fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}
