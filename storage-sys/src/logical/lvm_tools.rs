// SPDX-License-Identifier: GPL-3.0-only

use storage_types::{LogicalVolumeInfo, VolumeGroupInfo};
use tracing::info;

use crate::cmd;
use crate::{Result, SysError};

const REPORT_ARGS: [&str; 6] = [
    "--noheadings",
    "--units",
    "b",
    "--nosuffix",
    "--separator",
    "\t",
];

fn parse_tabbed_line(line: &str) -> Vec<String> {
    line.split('\t')
        .map(|part| part.trim().to_string())
        .collect()
}

fn parse_vgs(output: &str) -> Vec<VolumeGroupInfo> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let cols = parse_tabbed_line(line);
            if cols.len() < 5 {
                return None;
            }
            Some(VolumeGroupInfo {
                name: cols[0].clone(),
                size: cols[1].parse().ok()?,
                free: cols[2].parse().ok()?,
                pv_count: cols[3].parse().ok()?,
                lv_count: cols[4].parse().ok()?,
            })
        })
        .collect()
}

fn parse_lvs(output: &str) -> Vec<LogicalVolumeInfo> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let cols = parse_tabbed_line(line);
            if cols.len() < 5 {
                return None;
            }

            Some(LogicalVolumeInfo {
                vg_name: cols[0].clone(),
                name: cols[1].clone(),
                device_path: cols[2].clone(),
                size: cols[3].parse().ok()?,
                active: cols[4].eq_ignore_ascii_case("active") || cols[4] == "y",
            })
        })
        .collect()
}

fn require_lvm(tool: &str) -> Result<()> {
    if !cfg!(feature = "lvm-tools") {
        let disabled = format!("{tool} (lvm-tools disabled)");
        return Err(SysError::ToolMissing(disabled));
    }
    cmd::require_tool(tool)
}

fn report(tool: &str, fields: &str) -> Result<String> {
    require_lvm(tool)?;
    let mut args: Vec<&str> = REPORT_ARGS.to_vec();
    args.extend(["-o", fields]);
    Ok(cmd::run(tool, &args)?.stdout)
}

pub fn list_volume_groups() -> Result<Vec<VolumeGroupInfo>> {
    let output = report("vgs", "vg_name,vg_size,vg_free,pv_count,lv_count")?;
    Ok(parse_vgs(&output))
}

pub fn list_logical_volumes() -> Result<Vec<LogicalVolumeInfo>> {
    let output = report("lvs", "vg_name,lv_name,lv_path,lv_size,lv_active")?;
    Ok(parse_lvs(&output))
}

pub fn create_physical_volume(device: &str) -> Result<()> {
    require_lvm("pvcreate")?;
    info!("Creating physical volume on {}", device);
    cmd::run("pvcreate", &["-ff", "-y", device])?;
    Ok(())
}

pub fn create_volume_group(vg_name: &str, devices: &[String]) -> Result<()> {
    if devices.is_empty() {
        return Err(SysError::OperationFailed(format!(
            "volume group {vg_name} needs at least one physical volume"
        )));
    }
    require_lvm("vgcreate")?;
    info!(
        "Creating volume group {} on {}",
        vg_name, devices.join(", ")
    );

    let mut args = vec![vg_name];
    args.extend(devices.iter().map(String::as_str));
    cmd::run("vgcreate", &args)?;
    Ok(())
}

/// Create `lv_name` spanning all free extents of `vg_name`, returning its path
pub fn create_logical_volume(vg_name: &str, lv_name: &str) -> Result<String> {
    require_lvm("lvcreate")?;
    info!("Creating logical volume {}/{}", vg_name, lv_name);
    cmd::run(
        "lvcreate",
        &["-y", "-l", "100%FREE", "-n", lv_name, vg_name],
    )?;

    list_logical_volumes()?
        .into_iter()
        .find(|lv| lv.is(vg_name, lv_name))
        .map(|lv| lv.device_path)
        .ok_or_else(|| SysError::DeviceNotFound(format!("/dev/{vg_name}/{lv_name}")))
}

pub fn remove_logical_volume(lv_path: &str) -> Result<()> {
    require_lvm("lvremove")?;
    info!("Removing logical volume {}", lv_path);
    cmd::run("lvremove", &["-f", lv_path])?;
    Ok(())
}

pub fn remove_volume_group(vg_name: &str) -> Result<()> {
    require_lvm("vgremove")?;
    info!("Removing volume group {}", vg_name);
    cmd::run("vgremove", &["-f", vg_name])?;
    Ok(())
}
