// SPDX-License-Identifier: GPL-3.0-only

//! Block device discovery
//!
//! Device snapshots are built from `lsblk --json`; existence and size checks
//! go straight to the device node and sysfs so they stay cheap enough for the
//! settle polling done by the provisioning engine.

use std::fs;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use storage_types::{MapperKind, SECTOR_SIZE, StorageDevice, device_name};
use tracing::debug;

use crate::cmd;
use crate::error::{Result, SysError};

const SYS_BLOCK: &str = "/sys/class/block";

/// Resolve symlinks (e.g. /dev/disk/by-path/...) to the real device node
pub fn resolve_device_path(device: &str) -> Result<PathBuf> {
    fs::canonicalize(device).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SysError::DeviceNotFound(device.to_string())
        } else {
            SysError::Io(e)
        }
    })
}

pub fn device_exists(device: &str) -> Result<bool> {
    let path = match resolve_device_path(device) {
        Ok(path) => path,
        Err(SysError::DeviceNotFound(_)) => return Ok(false),
        Err(e) => return Err(e),
    };

    match fs::metadata(&path) {
        Ok(metadata) => Ok(metadata.file_type().is_block_device()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(SysError::Io(e)),
    }
}

/// Device size in bytes as reported by sysfs
pub fn device_size(device: &str) -> Result<u64> {
    let path = resolve_device_path(device)?;
    let name = kernel_name(&path)?;
    let size_file = Path::new(SYS_BLOCK).join(&name).join("size");

    let raw = fs::read_to_string(&size_file).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SysError::DeviceNotFound(device.to_string())
        } else {
            SysError::Io(e)
        }
    })?;

    let sectors: u64 = raw
        .trim()
        .parse()
        .map_err(|e| SysError::Parse(format!("{}: {e}", size_file.display())))?;

    Ok(sectors * SECTOR_SIZE)
}

fn kernel_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| SysError::DeviceNotFound(path.display().to_string()))
}

/// All block devices: whole disks with their partitions, plus device-mapper
/// nodes (LVM volumes, opened LUKS containers) wherever they sit in the tree.
pub fn list_storage_devices() -> Result<Vec<StorageDevice>> {
    cmd::require_tool("lsblk")?;
    let outcome = cmd::run("lsblk", &["--json", "--bytes", "--output-all"])?;
    parse_lsblk(&outcome.stdout)
}

/// Look up one device by short kernel name or by (possibly symlinked) path
pub fn get_storage_device(device: &str) -> Result<StorageDevice> {
    let name = if Path::new(SYS_BLOCK).join(device).exists() {
        device.to_string()
    } else {
        kernel_name(&resolve_device_path(device)?)?
    };

    find_device(list_storage_devices()?, &name)
        .ok_or_else(|| SysError::DeviceNotFound(device.to_string()))
}

fn find_device(devices: Vec<StorageDevice>, name: &str) -> Option<StorageDevice> {
    for device in devices {
        if device.name == name || device_name(&device.device_path) == name {
            return Some(device);
        }
        if let Some(part) = device.partitions.into_iter().find(|p| p.name == name) {
            return Some(part);
        }
    }
    None
}

pub(crate) fn parse_lsblk(json: &str) -> Result<Vec<StorageDevice>> {
    let root: Value = serde_json::from_str(json)
        .map_err(|e| SysError::Parse(format!("lsblk output: {e}")))?;
    let entries = root
        .get("blockdevices")
        .and_then(Value::as_array)
        .ok_or_else(|| SysError::Parse("lsblk output has no blockdevices".to_string()))?;

    let mut devices = Vec::new();
    let mut mapped = Vec::new();

    for entry in entries {
        collect_mapped(entry, &mut mapped);
        devices.push(device_from_entry(entry));
    }

    for dm in mapped {
        if !devices.iter().any(|d| d.name == dm.name) {
            devices.push(dm);
        }
    }

    debug!("Found {} block devices", devices.len());
    Ok(devices)
}

fn children(entry: &Value) -> impl Iterator<Item = &Value> {
    entry
        .get("children")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn collect_mapped(entry: &Value, out: &mut Vec<StorageDevice>) {
    for child in children(entry) {
        if mapper_kind(child).is_some() && !out.iter().any(|d| d.name == text(child, "kname")) {
            out.push(device_from_entry(child));
        }
        collect_mapped(child, out);
    }
}

fn device_from_entry(entry: &Value) -> StorageDevice {
    let dev_type = text(entry, "type");
    let is_partition = dev_type == "part";
    let kname = first_non_empty(&[text(entry, "kname"), text(entry, "name")]);
    let name = text(entry, "name");
    let mapper_kind = mapper_kind(entry);

    let partitions = if is_partition {
        Vec::new()
    } else {
        children(entry)
            .filter(|child| text(child, "type") == "part")
            .map(device_from_entry)
            .collect()
    };

    StorageDevice {
        sys_path: format!("{SYS_BLOCK}/{kname}"),
        device_path: first_non_empty(&[text(entry, "path"), format!("/dev/{kname}")]),
        mapper_path: mapper_kind.map(|_| format!("/dev/mapper/{name}")),
        name: kname,
        model: text(entry, "model").trim().to_string(),
        mount_points: mount_points(entry),
        size: number(entry, "size"),
        is_partition,
        is_physical: dev_type == "disk",
        read_only: flag(entry, "ro"),
        removable: flag(entry, "rm"),
        mapper_kind,
        partitions,
    }
}

fn mapper_kind(entry: &Value) -> Option<MapperKind> {
    match text(entry, "type").as_str() {
        "lvm" => Some(MapperKind::Lvm),
        "crypt" => Some(MapperKind::Luks),
        "dm" | "mpath" => Some(MapperKind::Other),
        _ => None,
    }
}

fn first_non_empty(values: &[String]) -> String {
    values
        .iter()
        .find(|value| !value.is_empty())
        .cloned()
        .unwrap_or_default()
}

fn text(entry: &Value, key: &str) -> String {
    entry
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// lsblk releases disagree on whether numbers and flags are JSON numbers,
// booleans or strings.
fn number(entry: &Value, key: &str) -> u64 {
    match entry.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn flag(entry: &Value, key: &str) -> bool {
    match entry.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_u64() == Some(1),
        Some(Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn mount_points(entry: &Value) -> Vec<String> {
    if let Some(list) = entry.get("mountpoints").and_then(Value::as_array) {
        return list
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }

    entry
        .get("mountpoint")
        .and_then(Value::as_str)
        .map(|mp| vec![mp.to_string()])
        .unwrap_or_default()
}
