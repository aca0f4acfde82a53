// SPDX-License-Identifier: GPL-3.0-only

//! appliance-storage - configure and provision the appliance storage area

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use storage_types::{
    Characteristic, Encryption, LayerType, Logical, Physical, StorageDevice, bytes_to_pretty,
};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

use storage_service::adapters::build_default_adapter;
use storage_service::settings::DEFAULT_SETTINGS_PATH;
use storage_service::{
    JsonConfigStore, ServiceSettings, StorageConfig, StorageManager, ensure_storage_section,
};

#[derive(Debug, Parser)]
#[command(name = "appliance-storage", version, about = "Appliance storage provisioning")]
struct Cli {
    /// Service settings file
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    config: PathBuf,

    /// Read the storage password from this file
    #[arg(long, global = true)]
    password_file: Option<PathBuf>,

    /// Storage password
    #[arg(long, global = true, env = "APPLIANCE_STORAGE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the configured layout and the state of the storage area
    Status,
    /// List block devices
    Devices,
    /// Create the storage section from legacy settings if missing
    Migrate,
    /// Provision (or reattach) and mount the storage area
    Init,
    /// Unlock encrypted storage without mounting
    Open,
    /// Mount the storage device at DEST
    Mount { dest: PathBuf },
    /// Unmount the storage device
    Umount,
    /// Unmount, lock and remove the logical volume
    Teardown,
    /// Select the physical layer
    SetPhysical {
        physical: Physical,
        /// Partition path (partition) or block devices (block)
        #[arg(long = "device")]
        devices: Vec<String>,
    },
    /// Select the logical layer
    SetLogical {
        logical: Logical,
        #[arg(long = "device")]
        devices: Vec<String>,
    },
    /// Select the encryption layer
    SetEncryption {
        encryption: Encryption,
        #[arg(long = "device")]
        devices: Vec<String>,
    },
    /// Show the choices for each layer given the current selection
    Query,
}

impl Command {
    fn needs_root(&self) -> bool {
        matches!(
            self,
            Command::Init
                | Command::Open
                | Command::Mount { .. }
                | Command::Umount
                | Command::Teardown
        )
    }
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storage_service=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.command.needs_root() && unsafe { libc::geteuid() } != 0 {
        tracing::error!("Storage operations must run as root");
        bail!("this command requires root privileges");
    }

    let settings = ServiceSettings::load(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    debug!(
        "Using appliance configuration {}",
        settings.sysconfig.display()
    );

    let mut store = JsonConfigStore::open(&settings.sysconfig)
        .with_context(|| format!("opening {}", settings.sysconfig.display()))?;
    let migrated = ensure_storage_section(&mut store, settings.hardware, &settings.legacy_device)?;

    let config = StorageConfig::load(Box::new(store), settings.hardware)?;
    let disks = build_default_adapter();
    let password = read_password(&cli)?;
    let mut manager = StorageManager::new(config, disks, settings);

    match cli.command {
        Command::Status => print_status(&manager),
        Command::Devices => {
            for device in manager.storage_devices()? {
                print_device(&device, 0);
            }
        }
        Command::Migrate => {
            if migrated {
                println!("storage section created");
            } else {
                println!("storage section already present");
            }
        }
        Command::Init => {
            manager.initialize(&password.unwrap_or_default())?;
            info!("Storage ready at {}", manager.mount_point().display());
        }
        Command::Open => {
            if manager.use_locking() && password.is_none() {
                bail!("encrypted storage needs a password");
            }
            manager.open(&password.unwrap_or_default())?;
        }
        Command::Mount { dest } => manager.mount_device(&dest)?,
        Command::Umount => manager.umount_device()?,
        Command::Teardown => manager.teardown()?,
        Command::SetPhysical { physical, devices } => {
            let config = manager.config_mut();
            config.set_physical_storage(physical)?;
            match physical {
                Physical::Partition if !devices.is_empty() => {
                    let [partition] = devices.as_slice() else {
                        bail!("partition storage takes exactly one device");
                    };
                    config.set_partition(partition)?;
                }
                Physical::Block if !devices.is_empty() => config.set_block_devices(&devices)?,
                _ => {}
            }
        }
        Command::SetLogical { logical, devices } => {
            let config = manager.config_mut();
            config.set_logical_storage(logical)?;
            if !devices.is_empty() {
                config.set_logical_devices(&devices)?;
            }
        }
        Command::SetEncryption {
            encryption,
            devices,
        } => {
            let config = manager.config_mut();
            config.set_encryption_storage(encryption)?;
            if !devices.is_empty() {
                config.set_encryption_devices(&devices)?;
            }
        }
        Command::Query => print_choices(manager.config()),
    }

    Ok(())
}

fn read_password(cli: &Cli) -> Result<Option<String>> {
    if let Some(path) = &cli.password_file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading password file {}", path.display()))?;
        return Ok(Some(raw.trim_end_matches(['\r', '\n']).to_string()));
    }
    Ok(cli.password.clone())
}

fn names<T: LayerType>(types: &[T]) -> String {
    types
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_status(manager: &StorageManager) {
    let config = manager.config();
    println!("model:       {}", config.model());
    println!("layout:      {}", config.storage_type());
    println!("valid:       {}", config.is_valid());
    println!(
        "device:      {}",
        manager.device_path().as_deref().unwrap_or("-")
    );
    println!("mount point: {}", manager.mount_point().display());

    if config.use_physical_storage(Physical::None) {
        return;
    }

    println!("present:     {}", manager.device_exists());
    println!("exists:      {}", manager.storage_area_exists());
    println!("locked:      {}", manager.is_locked());
    match manager.size() {
        Ok(size) => println!("size:        {}", bytes_to_pretty(size, true)),
        Err(e) => println!("size:        unknown ({e})"),
    }
}

fn print_device(device: &StorageDevice, depth: usize) {
    let mut flags = Vec::new();
    for (characteristic, flag) in [
        (Characteristic::RootDevice, "root"),
        (Characteristic::BootDevice, "boot"),
        (Characteristic::Removable, "removable"),
        (Characteristic::ReadOnly, "ro"),
        (Characteristic::LvmDevice, "lvm"),
        (Characteristic::LuksDevice, "luks"),
    ] {
        if device.is(characteristic) {
            flags.push(flag);
        }
    }

    println!(
        "{:indent$}{:<12} {:>12} {:<24} {}",
        "",
        device.name,
        bytes_to_pretty(device.size, false),
        device.mount_points.join(","),
        flags.join(" "),
        indent = depth * 2
    );
    for partition in &device.partitions {
        print_device(partition, depth + 1);
    }
}

fn print_choices(config: &StorageConfig) {
    let physical = config.physical_storage();
    let logical = config.logical_storage();
    println!("physical:   {}", names(&config.query_physical_storage()));
    println!(
        "logical:    {}",
        names(&config.query_logical_storage(physical))
    );
    println!(
        "encryption: {}",
        names(&config.query_encryption_storage(physical, logical))
    );
}
